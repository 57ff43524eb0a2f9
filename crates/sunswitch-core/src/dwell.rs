// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of SunSwitch.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Stability-duration and minimum-ON-time bookkeeping
//!
//! Both timers are anchored on timestamps supplied by the caller's clock.
//! When the clock steps backwards, every anchor is shifted back by the same
//! amount so that credit already earned is neither lost nor inflated.

use chrono::{DateTime, TimeDelta, Utc};
use sunswitch_types::{CandidateState, SocketState, Thresholds};
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct DwellTimer {
    candidates: CandidateState,

    /// Start of the current ON period, `None` while OFF
    on_since: Option<DateTime<Utc>>,

    /// Latest timestamp handed to the timer
    last_seen: Option<DateTime<Utc>>,
}

impl DwellTimer {
    /// Timer for a socket already in `socket` state
    pub fn new(socket: &SocketState) -> Self {
        Self {
            candidates: CandidateState::default(),
            on_since: socket.is_on.then_some(socket.since),
            last_seen: None,
        }
    }

    pub fn candidates(&self) -> CandidateState {
        self.candidates
    }

    /// Update the candidate runs with this cycle's rolling average
    ///
    /// A run starts on the first qualifying cycle and is dropped the moment
    /// the condition stops holding.
    pub fn observe(&mut self, now: DateTime<Utc>, avg_watts: f64, thresholds: &Thresholds) {
        self.rebase(now);

        if avg_watts >= thresholds.on_watts {
            self.candidates.above_on_threshold_since.get_or_insert(now);
        } else {
            self.candidates.above_on_threshold_since = None;
        }

        if avg_watts <= thresholds.off_watts {
            self.candidates.below_off_threshold_since.get_or_insert(now);
        } else {
            self.candidates.below_off_threshold_since = None;
        }
    }

    /// Average has stayed at or above the ON threshold for `stable_on`
    pub fn can_turn_on(&mut self, now: DateTime<Utc>, stable_on: TimeDelta) -> bool {
        self.rebase(now);
        self.candidates
            .above_on_threshold_since
            .is_some_and(|since| elapsed(since, now) >= stable_on)
    }

    /// Average has stayed at or below the OFF threshold for `stable_off`
    /// and the socket has been ON for at least `min_on`
    pub fn can_turn_off(&mut self, now: DateTime<Utc>, stable_off: TimeDelta, min_on: TimeDelta) -> bool {
        self.rebase(now);
        let stable = self
            .candidates
            .below_off_threshold_since
            .is_some_and(|since| elapsed(since, now) >= stable_off);

        stable && self.min_on_elapsed(now, min_on)
    }

    pub fn min_on_elapsed(&self, now: DateTime<Utc>, min_on: TimeDelta) -> bool {
        self.on_since
            .is_none_or(|since| elapsed(since, now) >= min_on)
    }

    /// Time spent ON so far, zero while OFF
    pub fn on_duration(&self, now: DateTime<Utc>) -> TimeDelta {
        self.on_since
            .map_or(TimeDelta::zero(), |since| elapsed(since, now))
    }

    /// Restart both timers after a confirmed transition
    pub fn reset_on_transition(&mut self, now: DateTime<Utc>, is_on: bool) {
        self.candidates.clear();
        self.on_since = is_on.then_some(now);
        self.last_seen = Some(now);
    }

    fn rebase(&mut self, now: DateTime<Utc>) {
        if let Some(last_seen) = self.last_seen {
            if now < last_seen {
                let shift = last_seen - now;
                warn!(
                    "⏪ Clock moved backwards by {}s, rebasing dwell timers",
                    shift.num_seconds()
                );

                for anchor in [
                    &mut self.candidates.above_on_threshold_since,
                    &mut self.candidates.below_off_threshold_since,
                    &mut self.on_since,
                ] {
                    if let Some(at) = anchor.as_mut() {
                        *at -= shift;
                    }
                }
            }
        }
        self.last_seen = Some(now);
    }
}

/// Elapsed time, never negative
fn elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> TimeDelta {
    (now - since).max(TimeDelta::zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLDS: Thresholds = Thresholds {
        on_watts: 1000.0,
        off_watts: 800.0,
    };

    fn secs(s: i64) -> TimeDelta {
        TimeDelta::seconds(s)
    }

    #[test]
    fn test_stability_needs_unbroken_run() {
        let t0 = Utc::now();
        let mut timer = DwellTimer::default();

        timer.observe(t0, 1200.0, &THRESHOLDS);
        assert!(!timer.can_turn_on(t0, secs(120)));

        timer.observe(t0 + secs(60), 1200.0, &THRESHOLDS);
        assert!(!timer.can_turn_on(t0 + secs(60), secs(120)));

        timer.observe(t0 + secs(120), 1200.0, &THRESHOLDS);
        assert!(timer.can_turn_on(t0 + secs(120), secs(120)));
    }

    #[test]
    fn test_interruption_resets_run() {
        let t0 = Utc::now();
        let mut timer = DwellTimer::default();

        timer.observe(t0, 1200.0, &THRESHOLDS);
        timer.observe(t0 + secs(60), 900.0, &THRESHOLDS);
        assert!(timer.candidates().above_on_threshold_since.is_none());

        timer.observe(t0 + secs(120), 1200.0, &THRESHOLDS);
        assert_eq!(
            timer.candidates().above_on_threshold_since,
            Some(t0 + secs(120))
        );
        assert!(!timer.can_turn_on(t0 + secs(180), secs(120)));
    }

    #[test]
    fn test_band_clears_both_candidates() {
        let t0 = Utc::now();
        let mut timer = DwellTimer::default();

        timer.observe(t0, 900.0, &THRESHOLDS);
        assert_eq!(timer.candidates(), CandidateState::default());
    }

    #[test]
    fn test_min_on_time_blocks_off() {
        let t0 = Utc::now();
        let mut timer = DwellTimer::default();
        timer.reset_on_transition(t0, true);

        timer.observe(t0 + secs(10), 0.0, &THRESHOLDS);
        // Stability satisfied immediately, minimum ON not yet
        assert!(!timer.can_turn_off(t0 + secs(10), secs(0), secs(300)));
        assert!(!timer.can_turn_off(t0 + secs(299), secs(0), secs(300)));
        assert!(timer.can_turn_off(t0 + secs(300), secs(0), secs(300)));
    }

    #[test]
    fn test_seeded_on_state_uses_since() {
        let t0 = Utc::now();
        let timer = DwellTimer::new(&SocketState::on(t0 - secs(600)));
        assert!(timer.min_on_elapsed(t0, secs(300)));
        assert_eq!(timer.on_duration(t0), secs(600));

        let timer = DwellTimer::new(&SocketState::off(t0));
        assert_eq!(timer.on_duration(t0), TimeDelta::zero());
    }

    #[test]
    fn test_transition_resets_candidates() {
        let t0 = Utc::now();
        let mut timer = DwellTimer::default();
        timer.observe(t0, 1200.0, &THRESHOLDS);

        timer.reset_on_transition(t0 + secs(60), true);
        assert_eq!(timer.candidates(), CandidateState::default());
        assert!(!timer.min_on_elapsed(t0 + secs(61), secs(300)));
    }

    #[test]
    fn test_backward_clock_keeps_earned_credit() {
        let t0 = Utc::now();
        let mut timer = DwellTimer::default();

        timer.observe(t0, 1200.0, &THRESHOLDS);
        timer.observe(t0 + secs(90), 1200.0, &THRESHOLDS);

        // Clock jumps back an hour; 90 s of credit must survive
        let jumped = t0 + secs(90) - secs(3600);
        timer.observe(jumped, 1200.0, &THRESHOLDS);
        assert!(!timer.can_turn_on(jumped, secs(120)));
        assert!(timer.can_turn_on(jumped + secs(30), secs(120)));
    }

    #[test]
    fn test_backward_clock_never_shortens_min_on() {
        let t0 = Utc::now();
        let mut timer = DwellTimer::default();
        timer.reset_on_transition(t0, true);

        let jumped = t0 - secs(3600);
        timer.observe(jumped, 0.0, &THRESHOLDS);
        assert!(!timer.can_turn_off(jumped, secs(0), secs(300)));
        assert_eq!(timer.on_duration(jumped), TimeDelta::zero());
    }
}

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

//! Per-cycle ON/OFF state machine
//!
//! One call to [`DecisionEngine::run_cycle`] reads a sample, updates the
//! rolling statistics, decides, commands the actuator if needed and emits an
//! observation. The engine is the only owner of [`SocketState`]; it changes
//! only after the actuator confirms a command.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use sunswitch_types::{
    CandidateState, ConfigSnapshot, ControlState, EngineStatus, Observation, Sample, SocketState,
    Statistics, Thresholds,
};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::dwell::DwellTimer;
use crate::error::{SwitchError, SwitchResult};
use crate::night_mode::NightModeGate;
use crate::thresholds::ThresholdCalculator;
use crate::traits::{ObservationSink, PowerSource, SwitchActuator};
use crate::window::RollingWindow;

/// Why a cycle left the socket alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldReason {
    /// Manual target already matches the socket
    Manual,
    NightMode,

    /// Window not yet filled (or empty)
    WarmingUp,

    /// No valid thresholds have ever been computed
    NoThresholds,

    /// Thresholds or dwell requirements not met
    Steady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Hold(HoldReason),
    Switch(bool),
}

/// What happened in one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleResult {
    /// Power source failed or timed out; nothing was decided
    SensorFailed,
    Held(HoldReason),

    /// Actuator confirmed the new state
    Switched { on: bool },

    /// Actuator failed; socket state unchanged, retried next cycle
    ActuatorFailed { target: bool },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleOutcome {
    pub result: CycleResult,
    pub observation: Observation,
}

impl CycleOutcome {
    pub fn switched(&self) -> bool {
        matches!(self.result, CycleResult::Switched { .. })
    }
}

pub struct DecisionEngine {
    clock: Arc<dyn Clock>,
    window: RollingWindow,
    socket: SocketState,
    dwell: DwellTimer,

    /// Set once the window has been full at least once
    warmed_up: bool,

    consecutive_actuator_failures: u32,

    /// Last thresholds computed from a valid configuration
    thresholds: Option<Thresholds>,

    statistics: Option<Statistics>,
    night_active: bool,
    control: ControlState,
    last_observation: Option<Observation>,
    last_error: Option<String>,
    cycles: u64,
    updated_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("socket", &self.socket)
            .field("window_len", &self.window.len())
            .field("candidates", &self.dwell.candidates())
            .field("consecutive_actuator_failures", &self.consecutive_actuator_failures)
            .field("cycles", &self.cycles)
            .finish_non_exhaustive()
    }
}

impl DecisionEngine {
    /// Engine for a socket currently in `initial` state
    pub fn new(initial: SocketState, snapshot: &ConfigSnapshot, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            window: RollingWindow::new(snapshot.sampling.window_size()),
            socket: initial,
            dwell: DwellTimer::new(&initial),
            warmed_up: false,
            consecutive_actuator_failures: 0,
            thresholds: ThresholdCalculator::compute(&snapshot.electrical).ok(),
            statistics: None,
            night_active: false,
            control: snapshot.control,
            last_observation: None,
            last_error: None,
            cycles: 0,
            updated_at: None,
        }
    }

    pub fn socket(&self) -> SocketState {
        self.socket
    }

    pub fn candidates(&self) -> CandidateState {
        self.dwell.candidates()
    }

    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    pub fn consecutive_actuator_failures(&self) -> u32 {
        self.consecutive_actuator_failures
    }

    /// Read-only view for control surfaces
    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            socket: self.socket,
            statistics: self.statistics,
            thresholds: self.thresholds,
            night_active: self.night_active,
            control: self.control,
            consecutive_actuator_failures: self.consecutive_actuator_failures,
            window_len: self.window.len(),
            last_observation: self.last_observation,
            last_error: self.last_error.clone(),
            cycles: self.cycles,
            updated_at: self.updated_at,
        }
    }

    /// Run one complete cycle against a configuration snapshot
    ///
    /// Never fails: collaborator errors are logged, counted and reflected
    /// in the returned outcome and in [`Self::status`].
    pub async fn run_cycle(
        &mut self,
        snapshot: &ConfigSnapshot,
        power: &dyn PowerSource,
        actuator: &dyn SwitchActuator,
        sink: &dyn ObservationSink,
    ) -> CycleOutcome {
        let now = self.clock.now();
        self.cycles += 1;
        self.updated_at = Some(now);
        self.control = snapshot.control;
        self.last_error = None;

        self.apply_snapshot(snapshot, now);

        let watts = match read_power(power, snapshot.sampling.power_timeout()).await {
            Ok(watts) => watts,
            Err(e) => {
                warn!("⚠️ [{}] No power reading this cycle: {}", power.name(), e);
                self.last_error = Some(e.to_string());
                return self.emit(
                    sink,
                    CycleResult::SensorFailed,
                    Observation::degraded(now, self.socket.is_on, snapshot.control.auto_mode),
                );
            }
        };

        let sample = Sample::new(now, watts);
        self.window.push(sample);
        if self.window.is_full() {
            self.warmed_up = true;
        }
        self.statistics = self.window.statistics().ok();

        let evaluate = !snapshot.sampling.warmup_full_window || self.warmed_up;
        if evaluate
            && let (Some(stats), Some(thresholds)) = (self.statistics, self.thresholds)
        {
            self.dwell.observe(now, stats.mean_watts, &thresholds);
        }

        let decision = self.decide(snapshot, now, evaluate);
        debug!(
            "🔄 Cycle {}: power={:.0}W avg={:?} median={:?} socket={} decision={:?}",
            self.cycles,
            watts,
            self.statistics.map(|s| s.mean_watts.round()),
            self.statistics.map(|s| s.median_watts.round()),
            self.socket.label(),
            decision
        );

        let result = match decision {
            Decision::Hold(reason) => CycleResult::Held(reason),
            Decision::Switch(target) => {
                self.switch(actuator, target, snapshot.sampling.actuator_timeout(), now)
                    .await
            }
        };

        let observation = Observation::from_sample(
            &sample,
            self.statistics,
            self.socket.is_on,
            snapshot.control.auto_mode,
        );
        self.emit(sink, result, observation)
    }

    /// Adopt per-cycle configuration changes without touching dwell timers
    fn apply_snapshot(&mut self, snapshot: &ConfigSnapshot, now: DateTime<Utc>) {
        let window_size = snapshot.sampling.window_size();
        if window_size != self.window.capacity() {
            info!(
                "📏 Window size changed {} -> {} samples",
                self.window.capacity(),
                window_size
            );
            self.window.resize(window_size);
        }

        match ThresholdCalculator::compute(&snapshot.electrical) {
            Ok(thresholds) => self.thresholds = Some(thresholds),
            Err(e) => warn!("⚠️ Keeping last good thresholds: {}", e),
        }

        let tz = snapshot.night_mode.tz().unwrap_or_else(|e| {
            warn!("⚠️ {}, using local time", e);
            None
        });
        self.night_active = NightModeGate::is_suppressed_at(now, tz, &snapshot.night_mode);
    }

    fn decide(&mut self, snapshot: &ConfigSnapshot, now: DateTime<Utc>, evaluate: bool) -> Decision {
        if !snapshot.control.auto_mode {
            let target = snapshot.control.manual_socket_state;
            return if target == self.socket.is_on {
                Decision::Hold(HoldReason::Manual)
            } else {
                Decision::Switch(target)
            };
        }

        if self.night_active {
            return Decision::Hold(HoldReason::NightMode);
        }

        let Some(stats) = self.statistics.filter(|_| evaluate) else {
            return Decision::Hold(HoldReason::WarmingUp);
        };
        let Some(thresholds) = self.thresholds else {
            return Decision::Hold(HoldReason::NoThresholds);
        };

        let avg = stats.mean_watts;
        let sampling = &snapshot.sampling;

        if self.socket.is_on {
            if avg <= thresholds.off_watts
                && self
                    .dwell
                    .can_turn_off(now, sampling.stable_off(), sampling.min_on_time())
            {
                return Decision::Switch(false);
            }
        } else if avg >= thresholds.on_watts && self.dwell.can_turn_on(now, sampling.stable_on()) {
            return Decision::Switch(true);
        }

        Decision::Hold(HoldReason::Steady)
    }

    async fn switch(
        &mut self,
        actuator: &dyn SwitchActuator,
        target: bool,
        timeout: Duration,
        now: DateTime<Utc>,
    ) -> CycleResult {
        let label = if target { "ON" } else { "OFF" };

        let result = tokio::time::timeout(timeout, actuator.set_state(target))
            .await
            .unwrap_or(Err(SwitchError::ActuatorTimeout));

        match result {
            Ok(()) => {
                info!(
                    "✅ [{}] Socket {} -> {} after {}s",
                    actuator.name(),
                    self.socket.label(),
                    label,
                    (now - self.socket.since).num_seconds().max(0)
                );
                self.socket = SocketState {
                    is_on: target,
                    since: now,
                };
                self.dwell.reset_on_transition(now, target);
                self.consecutive_actuator_failures = 0;
                CycleResult::Switched { on: target }
            }
            Err(e) => {
                self.consecutive_actuator_failures =
                    self.consecutive_actuator_failures.saturating_add(1);
                error!(
                    "❌ [{}] Failed to switch socket {}: {} ({} consecutive failures)",
                    actuator.name(),
                    label,
                    e,
                    self.consecutive_actuator_failures
                );
                self.last_error = Some(e.to_string());
                CycleResult::ActuatorFailed { target }
            }
        }
    }

    fn emit(
        &mut self,
        sink: &dyn ObservationSink,
        result: CycleResult,
        observation: Observation,
    ) -> CycleOutcome {
        sink.record(observation);
        self.last_observation = Some(observation);
        CycleOutcome { result, observation }
    }
}

async fn read_power(power: &dyn PowerSource, timeout: Duration) -> SwitchResult<f64> {
    let watts = tokio::time::timeout(timeout, power.read_current_power())
        .await
        .unwrap_or(Err(SwitchError::SensorTimeout))?;

    if !watts.is_finite() {
        return Err(SwitchError::SensorUnavailable(format!(
            "non-finite reading {watts}"
        )));
    }
    Ok(watts)
}

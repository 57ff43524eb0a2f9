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

use chrono::{DateTime, Local, NaiveTime, Utc};
use chrono_tz::Tz;
use sunswitch_types::NightModeConfig;

/// Blackout window during which automatic switching is suppressed
#[derive(Debug, Clone, Copy, Default)]
pub struct NightModeGate;

impl NightModeGate {
    /// True when `time_of_day` falls inside `[start, end)`
    ///
    /// A window with `start > end` spans midnight. `start == end` is empty.
    pub fn is_suppressed(time_of_day: NaiveTime, config: &NightModeConfig) -> bool {
        if !config.enabled {
            return false;
        }

        let (start, end) = (config.start, config.end);
        if start <= end {
            time_of_day >= start && time_of_day < end
        } else {
            time_of_day >= start || time_of_day < end
        }
    }

    /// Evaluate the gate for an instant, in `tz` or the host's local time
    pub fn is_suppressed_at(now: DateTime<Utc>, tz: Option<Tz>, config: &NightModeConfig) -> bool {
        Self::is_suppressed(local_time_of_day(now, tz), config)
    }
}

/// Wall-clock time of day for `now`
pub fn local_time_of_day(now: DateTime<Utc>, tz: Option<Tz>) -> NaiveTime {
    match tz {
        Some(tz) => now.with_timezone(&tz).time(),
        None => now.with_timezone(&Local).time(),
    }
}

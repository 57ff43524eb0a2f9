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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single PV power reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the reading was taken
    pub timestamp: DateTime<Utc>,

    /// Instantaneous PV output (W)
    pub power_watts: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, power_watts: f64) -> Self {
        Self {
            timestamp,
            power_watts,
        }
    }
}

/// Rolling statistics over the current sample window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Arithmetic mean (W)
    pub mean_watts: f64,

    /// Median (W), average of the two middle samples on even count
    pub median_watts: f64,
}

/// ON/OFF power levels derived from the electrical configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Rolling average at or above which the socket may turn ON (W)
    pub on_watts: f64,

    /// Rolling average at or below which the socket may turn OFF (W)
    pub off_watts: f64,
}

impl Thresholds {
    /// Width of the hysteresis band (W)
    pub fn band_watts(&self) -> f64 {
        self.on_watts - self.off_watts
    }

    /// False when the thresholds have collapsed onto one setpoint
    pub fn is_hysteretic(&self) -> bool {
        self.off_watts < self.on_watts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_width() {
        let thresholds = Thresholds {
            on_watts: 1518.0,
            off_watts: 1366.2,
        };
        assert!((thresholds.band_watts() - 151.8).abs() < 1e-9);
        assert!(thresholds.is_hysteretic());
    }

    #[test]
    fn test_collapsed_band() {
        let thresholds = Thresholds {
            on_watts: 1000.0,
            off_watts: 1000.0,
        };
        assert!(!thresholds.is_hysteretic());
        assert!(thresholds.band_watts().abs() < f64::EPSILON);
    }
}

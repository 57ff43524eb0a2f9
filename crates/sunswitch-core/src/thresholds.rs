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

use crate::error::SwitchResult;
use sunswitch_types::{ElectricalConfig, Thresholds};

/// Derives the ON/OFF power levels from the electrical rating
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdCalculator;

impl ThresholdCalculator {
    /// Power the appliance draws at full rating (W)
    pub fn required_power(config: &ElectricalConfig) -> f64 {
        config.voltage_v * config.max_current_a
    }

    /// Compute thresholds for a configuration
    ///
    /// `on = V * I * (1 + margin)`, `off = on * (1 - hysteresis)`.
    /// A zero hysteresis collapses both onto one setpoint; that is accepted.
    ///
    /// # Errors
    /// `InvalidConfig` for negative or non-finite values, or `hysteresis >= 1`
    pub fn compute(config: &ElectricalConfig) -> SwitchResult<Thresholds> {
        config.validate()?;

        let on_watts = Self::required_power(config) * (1.0 + config.safety_margin);
        let off_watts = on_watts * (1.0 - config.hysteresis);

        Ok(Thresholds {
            on_watts,
            off_watts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SwitchError;

    fn electrical(voltage_v: f64, max_current_a: f64, margin: f64, hysteresis: f64) -> ElectricalConfig {
        ElectricalConfig {
            voltage_v,
            max_current_a,
            safety_margin: margin,
            hysteresis,
        }
    }

    #[test]
    fn test_default_rating() {
        // 230 V * 6 A = 1380 W, +10% margin, -10% band
        let thresholds = ThresholdCalculator::compute(&ElectricalConfig::default()).unwrap();
        assert!((thresholds.on_watts - 1518.0).abs() < 1e-9);
        assert!((thresholds.off_watts - 1366.2).abs() < 1e-9);
    }

    #[test]
    fn test_on_above_off_with_hysteresis() {
        for voltage in [110.0, 230.0, 400.0] {
            for current in [1.0, 6.0, 16.0, 32.0] {
                for hysteresis in [0.01, 0.1, 0.5, 0.99] {
                    let t = ThresholdCalculator::compute(&electrical(voltage, current, 0.1, hysteresis))
                        .unwrap();
                    assert!(
                        t.on_watts > t.off_watts,
                        "{voltage} V {current} A h={hysteresis}: {t:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_zero_hysteresis_collapses() {
        let t = ThresholdCalculator::compute(&electrical(230.0, 6.0, 0.0, 0.0)).unwrap();
        assert!((t.on_watts - t.off_watts).abs() < f64::EPSILON);
        assert!(!t.is_hysteretic());
    }

    #[test]
    fn test_negative_current_rejected() {
        let result = ThresholdCalculator::compute(&electrical(230.0, -6.0, 0.1, 0.1));
        assert!(matches!(result, Err(SwitchError::InvalidConfig(_))));
    }

    #[test]
    fn test_full_hysteresis_rejected() {
        let result = ThresholdCalculator::compute(&electrical(230.0, 6.0, 0.1, 1.0));
        assert!(matches!(result, Err(SwitchError::InvalidConfig(_))));
    }

    #[test]
    fn test_debug_output() {
        assert_eq!(format!("{:?}", ThresholdCalculator), "ThresholdCalculator");
    }
}

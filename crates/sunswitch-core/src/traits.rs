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

use async_trait::async_trait;
use sunswitch_types::{ConfigSnapshot, Observation};

use crate::error::SwitchResult;

/// Source of instantaneous PV output
/// The engine uses this trait, never knows about SolarEdge/HTTP details
#[async_trait]
pub trait PowerSource: Send + Sync {
    /// Read current PV power (W)
    ///
    /// # Errors
    /// `SensorUnavailable` or `SensorTimeout`
    async fn read_current_power(&self) -> SwitchResult<f64>;

    /// Get data source name for logging
    fn name(&self) -> &str;
}

/// Smart socket the appliance is plugged into
#[async_trait]
pub trait SwitchActuator: Send + Sync {
    /// Command the socket ON or OFF; `Ok` means the device confirmed it
    ///
    /// # Errors
    /// `ActuatorFailure`, `ActuatorTimeout` or `ActuatorRejected`
    async fn set_state(&self, on: bool) -> SwitchResult<()>;

    /// Current device state, if the device can report it
    async fn read_state(&self) -> SwitchResult<Option<bool>> {
        Ok(None)
    }

    /// Get actuator name for logging
    fn name(&self) -> &str;
}

/// Supplies one consistent configuration snapshot per cycle
pub trait ConfigProvider: Send + Sync {
    fn current_snapshot(&self) -> ConfigSnapshot;
}

/// Destination for per-cycle observations
///
/// Must not block; implementations log and swallow their own failures.
pub trait ObservationSink: Send + Sync {
    fn record(&self, observation: Observation);
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ObservationSink for NullSink {
    fn record(&self, _observation: Observation) {}
}

/// Fixed snapshot provider, for tests and one-shot tools
impl ConfigProvider for ConfigSnapshot {
    fn current_snapshot(&self) -> ConfigSnapshot {
        self.clone()
    }
}

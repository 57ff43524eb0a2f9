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

//! Error taxonomy of the decision core
//!
//! None of these is fatal to the decision loop: each one either skips the
//! current cycle's decision or rejects a configuration update.

use sunswitch_types::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwitchError {
    #[error("power source unavailable: {0}")]
    SensorUnavailable(String),

    #[error("power source timed out")]
    SensorTimeout,

    #[error("actuator unreachable: {0}")]
    ActuatorFailure(String),

    #[error("actuator timed out")]
    ActuatorTimeout,

    #[error("actuator rejected command: {0}")]
    ActuatorRejected(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("rolling window is empty")]
    EmptyWindow,

    #[error("config persistence error: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("config serialization error: {0}")]
    Serialization(String),
}

impl SwitchError {
    /// True for failures of the power source collaborator
    pub fn is_sensor(&self) -> bool {
        matches!(self, Self::SensorUnavailable(_) | Self::SensorTimeout)
    }

    /// True for failures of the switch actuator collaborator
    pub fn is_actuator(&self) -> bool {
        matches!(
            self,
            Self::ActuatorFailure(_) | Self::ActuatorTimeout | Self::ActuatorRejected(_)
        )
    }
}

impl From<serde_json::Error> for SwitchError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<toml::ser::Error> for SwitchError {
    fn from(e: toml::ser::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for SwitchError {
    fn from(e: toml::de::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

pub type SwitchResult<T> = Result<T, SwitchError>;

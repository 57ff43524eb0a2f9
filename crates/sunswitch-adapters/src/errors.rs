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

use sunswitch_core::SwitchError;
use thiserror::Error;

/// Collaborator (HTTP / file) error types
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned error status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Device rejected command: {0}")]
    Rejected(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type AdapterResult<T> = Result<T, AdapterError>;

impl AdapterError {
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Http(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Map into the core taxonomy for a failed power reading
    pub fn into_sensor_error(self) -> SwitchError {
        if self.is_timeout() {
            SwitchError::SensorTimeout
        } else {
            SwitchError::SensorUnavailable(self.to_string())
        }
    }

    /// Map into the core taxonomy for a failed socket command
    ///
    /// Client errors (4xx) mean the device understood and refused the
    /// command; everything else is treated as unreachable.
    pub fn into_actuator_error(self) -> SwitchError {
        if self.is_timeout() {
            return SwitchError::ActuatorTimeout;
        }

        let refused = match &self {
            Self::Api { status, .. } => (400..500).contains(status),
            Self::AuthenticationFailed | Self::Rejected(_) => true,
            _ => false,
        };
        if refused {
            SwitchError::ActuatorRejected(self.to_string())
        } else {
            SwitchError::ActuatorFailure(self.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_mapping() {
        assert!(matches!(
            AdapterError::Timeout.into_sensor_error(),
            SwitchError::SensorTimeout
        ));
        assert!(matches!(
            AdapterError::InvalidResponse("no power".into()).into_sensor_error(),
            SwitchError::SensorUnavailable(_)
        ));
    }

    #[test]
    fn test_actuator_mapping() {
        let rejected = AdapterError::Api {
            status: 404,
            message: "unknown resource".into(),
        };
        assert!(matches!(
            rejected.into_actuator_error(),
            SwitchError::ActuatorRejected(_)
        ));

        let server = AdapterError::Api {
            status: 503,
            message: "bridge busy".into(),
        };
        assert!(matches!(
            server.into_actuator_error(),
            SwitchError::ActuatorFailure(_)
        ));

        assert!(matches!(
            AdapterError::AuthenticationFailed.into_actuator_error(),
            SwitchError::ActuatorRejected(_)
        ));
        assert!(matches!(
            AdapterError::Timeout.into_actuator_error(),
            SwitchError::ActuatorTimeout
        ));
    }
}

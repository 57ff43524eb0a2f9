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

use crate::config::ControlState;
use crate::power::{Statistics, Thresholds};
use crate::socket::{Observation, SocketState};

/// Read-only view of the decision engine published after every cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub socket: SocketState,
    pub statistics: Option<Statistics>,
    pub thresholds: Option<Thresholds>,
    pub night_active: bool,
    pub control: ControlState,

    /// Actuator failures since the last confirmed command
    pub consecutive_actuator_failures: u32,

    pub window_len: usize,
    pub last_observation: Option<Observation>,
    pub last_error: Option<String>,
    pub cycles: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl EngineStatus {
    /// Status before the first cycle has run
    pub fn initial(socket: SocketState, control: ControlState) -> Self {
        Self {
            socket,
            statistics: None,
            thresholds: None,
            night_active: false,
            control,
            consecutive_actuator_failures: 0,
            window_len: 0,
            last_observation: None,
            last_error: None,
            cycles: 0,
            updated_at: None,
        }
    }

    pub fn has_actuator_trouble(&self) -> bool {
        self.consecutive_actuator_failures > 0
    }
}

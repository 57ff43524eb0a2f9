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

use crate::power::{Sample, Statistics};

/// Last commanded socket state, as confirmed by the actuator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketState {
    pub is_on: bool,

    /// When the current state began
    pub since: DateTime<Utc>,
}

impl SocketState {
    pub fn off(since: DateTime<Utc>) -> Self {
        Self {
            is_on: false,
            since,
        }
    }

    pub fn on(since: DateTime<Utc>) -> Self {
        Self { is_on: true, since }
    }

    pub fn label(&self) -> &'static str {
        if self.is_on { "ON" } else { "OFF" }
    }
}

/// Bookkeeping for the stability-duration requirement
///
/// Each timestamp marks the first cycle of an unbroken run in which the
/// qualifying condition held. Cleared as soon as the run breaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateState {
    pub above_on_threshold_since: Option<DateTime<Utc>>,
    pub below_off_threshold_since: Option<DateTime<Utc>>,
}

impl CandidateState {
    pub fn clear(&mut self) {
        self.above_on_threshold_since = None;
        self.below_off_threshold_since = None;
    }
}

/// Per-cycle output record
///
/// Power fields are `None` when the cycle could not read the power source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub power_watts: Option<f64>,
    pub avg_watts: Option<f64>,
    pub median_watts: Option<f64>,
    pub socket_on: bool,
    pub auto_mode: bool,
}

impl Observation {
    /// Record for a cycle that ingested a sample
    pub fn from_sample(
        sample: &Sample,
        statistics: Option<Statistics>,
        socket_on: bool,
        auto_mode: bool,
    ) -> Self {
        Self {
            timestamp: sample.timestamp,
            power_watts: Some(sample.power_watts),
            avg_watts: statistics.map(|s| s.mean_watts),
            median_watts: statistics.map(|s| s.median_watts),
            socket_on,
            auto_mode,
        }
    }

    /// Record for a cycle whose power reading failed
    pub fn degraded(timestamp: DateTime<Utc>, socket_on: bool, auto_mode: bool) -> Self {
        Self {
            timestamp,
            power_watts: None,
            avg_watts: None,
            median_watts: None,
            socket_on,
            auto_mode,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.power_watts.is_none()
    }
}

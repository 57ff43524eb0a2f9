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

//! In-memory collaborators for deterministic tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use sunswitch_types::Observation;

use crate::error::{SwitchError, SwitchResult};
use crate::traits::{ObservationSink, PowerSource, SwitchActuator};

/// One scripted power source response
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Watts(f64),
    Unavailable,

    /// Never answers; only a timeout gets the caller out
    Hang,
}

/// Power source replaying a script, then repeating `fallback`
#[derive(Debug, Clone)]
pub struct ScriptedPowerSource {
    script: Arc<Mutex<VecDeque<Reading>>>,
    fallback: Reading,
}

impl ScriptedPowerSource {
    pub fn new(script: impl IntoIterator<Item = Reading>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            fallback: Reading::Unavailable,
        }
    }

    /// Source that always reports `watts`
    pub fn constant(watts: f64) -> Self {
        Self::new([]).with_fallback(Reading::Watts(watts))
    }

    pub fn with_fallback(mut self, fallback: Reading) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn push(&self, reading: Reading) {
        self.script.lock().push_back(reading);
    }

    pub fn extend(&self, watts: impl IntoIterator<Item = f64>) {
        self.script
            .lock()
            .extend(watts.into_iter().map(Reading::Watts));
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl PowerSource for ScriptedPowerSource {
    async fn read_current_power(&self) -> SwitchResult<f64> {
        let next = self.script.lock().pop_front().unwrap_or(self.fallback);
        match next {
            Reading::Watts(watts) => Ok(watts),
            Reading::Unavailable => Err(SwitchError::SensorUnavailable("scripted outage".into())),
            Reading::Hang => std::future::pending().await,
        }
    }

    fn name(&self) -> &str {
        "Scripted"
    }
}

/// How the recording actuator answers commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorBehavior {
    Accept,
    Fail,
    Reject,
    Hang,
}

#[derive(Debug)]
struct ActuatorInner {
    behavior: ActuatorBehavior,
    commands: Vec<bool>,
    device_state: Option<bool>,
}

/// Actuator recording every command it receives; clones share state
#[derive(Debug, Clone)]
pub struct RecordingActuator {
    inner: Arc<Mutex<ActuatorInner>>,
}

impl Default for RecordingActuator {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ActuatorInner {
                behavior: ActuatorBehavior::Accept,
                commands: Vec::new(),
                device_state: None,
            })),
        }
    }

    /// Actuator whose device reports `on` before any command
    pub fn with_device_state(on: bool) -> Self {
        let actuator = Self::new();
        actuator.inner.lock().device_state = Some(on);
        actuator
    }

    pub fn set_behavior(&self, behavior: ActuatorBehavior) {
        self.inner.lock().behavior = behavior;
    }

    /// Every command received, failed ones included
    pub fn commands(&self) -> Vec<bool> {
        self.inner.lock().commands.clone()
    }

    /// State the device is physically in
    pub fn device_state(&self) -> Option<bool> {
        self.inner.lock().device_state
    }
}

#[async_trait]
impl SwitchActuator for RecordingActuator {
    async fn set_state(&self, on: bool) -> SwitchResult<()> {
        let behavior = {
            let mut inner = self.inner.lock();
            inner.commands.push(on);
            if inner.behavior == ActuatorBehavior::Accept {
                inner.device_state = Some(on);
            }
            inner.behavior
        };

        match behavior {
            ActuatorBehavior::Accept => Ok(()),
            ActuatorBehavior::Fail => Err(SwitchError::ActuatorFailure("scripted failure".into())),
            ActuatorBehavior::Reject => Err(SwitchError::ActuatorRejected("scripted rejection".into())),
            ActuatorBehavior::Hang => std::future::pending().await,
        }
    }

    async fn read_state(&self) -> SwitchResult<Option<bool>> {
        Ok(self.inner.lock().device_state)
    }

    fn name(&self) -> &str {
        "Recording"
    }
}

/// Sink keeping observations in memory; clones share the buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    observations: Arc<Mutex<Vec<Observation>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observations(&self) -> Vec<Observation> {
        self.observations.lock().clone()
    }

    pub fn last(&self) -> Option<Observation> {
        self.observations.lock().last().copied()
    }

    pub fn len(&self) -> usize {
        self.observations.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.lock().is_empty()
    }
}

impl ObservationSink for MemorySink {
    fn record(&self, observation: Observation) {
        self.observations.lock().push(observation);
    }
}

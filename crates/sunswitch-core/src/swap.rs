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

//! Collaborators that can be rebuilt while the decision loop runs
//!
//! The loop holds an `Arc<Swappable<C>>` as its collaborator; a
//! reconfiguration task replaces the inner client when its settings change. A call already
//! in flight finishes on the client it started with.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::error::SwitchResult;
use crate::traits::{PowerSource, SwitchActuator};

pub struct Swappable<T: ?Sized> {
    current: RwLock<Arc<T>>,

    /// Name of the first client, kept for log lines
    name: String,
}

impl<T: ?Sized> std::fmt::Debug for Swappable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Swappable")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<T: ?Sized> Swappable<T> {
    pub fn current(&self) -> Arc<T> {
        self.current.read().clone()
    }

    /// Route every later call to `next`
    pub fn replace(&self, next: Arc<T>) {
        *self.current.write() = next;
    }
}

impl<T: PowerSource + ?Sized> Swappable<T> {
    pub fn power_source(inner: Arc<T>) -> Self {
        Self {
            name: inner.name().to_owned(),
            current: RwLock::new(inner),
        }
    }
}

impl<T: SwitchActuator + ?Sized> Swappable<T> {
    pub fn actuator(inner: Arc<T>) -> Self {
        Self {
            name: inner.name().to_owned(),
            current: RwLock::new(inner),
        }
    }
}

#[async_trait]
impl<T: PowerSource + ?Sized> PowerSource for Swappable<T> {
    async fn read_current_power(&self) -> SwitchResult<f64> {
        let inner = self.current();
        inner.read_current_power().await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl<T: SwitchActuator + ?Sized> SwitchActuator for Swappable<T> {
    async fn set_state(&self, on: bool) -> SwitchResult<()> {
        let inner = self.current();
        inner.set_state(on).await
    }

    async fn read_state(&self) -> SwitchResult<Option<bool>> {
        let inner = self.current();
        inner.read_state().await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{RecordingActuator, ScriptedPowerSource};

    #[tokio::test]
    async fn test_replace_routes_later_reads() {
        let power = Swappable::power_source(Arc::new(ScriptedPowerSource::constant(100.0)));
        assert!((power.read_current_power().await.unwrap() - 100.0).abs() < 1e-9);

        power.replace(Arc::new(ScriptedPowerSource::constant(2500.0)));

        assert!((power.read_current_power().await.unwrap() - 2500.0).abs() < 1e-9);
        assert_eq!(power.name(), "Scripted");
    }

    #[tokio::test]
    async fn test_replace_routes_later_commands() {
        let first = RecordingActuator::new();
        let second = RecordingActuator::with_device_state(true);
        let actuator = Swappable::actuator(Arc::new(first.clone()));

        actuator.set_state(true).await.unwrap();
        actuator.replace(Arc::new(second.clone()));
        actuator.set_state(false).await.unwrap();

        assert_eq!(first.commands(), vec![true]);
        assert_eq!(second.commands(), vec![false]);
        assert_eq!(actuator.read_state().await.unwrap(), Some(false));
    }
}

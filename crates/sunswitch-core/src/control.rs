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

//! Shared handle between the decision loop and control surfaces
//!
//! Control surfaces never touch engine state. They read the last published
//! [`EngineStatus`] and submit configuration or override changes, which are
//! validated and swapped in whole so the next cycle sees either the old or
//! the new snapshot.

use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;
use sunswitch_types::{AppConfig, ConfigError, ConfigSnapshot, ControlState, EngineStatus, SocketState};
use tokio::sync::watch;
use tracing::{error, info};

use crate::config_store::ConfigStore;
use crate::error::SwitchResult;
use crate::traits::ConfigProvider;

#[derive(Clone)]
pub struct ControlHandle {
    config: Arc<RwLock<AppConfig>>,
    status: Arc<RwLock<EngineStatus>>,
    store: Option<ConfigStore>,

    /// Every accepted configuration, for tasks that rebuild collaborators
    changes: Arc<watch::Sender<AppConfig>>,
}

impl std::fmt::Debug for ControlHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlHandle")
            .field("config", &"<RwLock>")
            .field("status", &"<RwLock>")
            .field("store", &self.store.as_ref().map(ConfigStore::path))
            .finish_non_exhaustive()
    }
}

impl ControlHandle {
    pub fn new(config: AppConfig, socket: SocketState) -> Self {
        let status = EngineStatus::initial(socket, config.control);
        let (changes, _) = watch::channel(config.clone());
        Self {
            config: Arc::new(RwLock::new(config)),
            status: Arc::new(RwLock::new(status)),
            store: None,
            changes: Arc::new(changes),
        }
    }

    /// Persist every accepted change to `store`
    pub fn with_store(mut self, store: ConfigStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> AppConfig {
        self.config.read().clone()
    }

    pub fn control(&self) -> ControlState {
        self.config.read().control
    }

    pub fn status(&self) -> EngineStatus {
        self.status.read().clone()
    }

    /// Called by the decision loop after every cycle
    pub fn publish_status(&self, status: EngineStatus) {
        *self.status.write() = status;
    }

    /// Receiver that sees each configuration once it is in effect
    pub fn subscribe(&self) -> watch::Receiver<AppConfig> {
        self.changes.subscribe()
    }

    /// Replace the whole configuration
    ///
    /// # Errors
    /// `InvalidConfig` leaves the current configuration in effect, as does a
    /// failure to persist it.
    pub fn update_config(&self, config: AppConfig) -> SwitchResult<()> {
        self.commit(|current| {
            *current = config;
            Ok(())
        })?;
        Ok(())
    }

    /// Apply `{"section.field": value}` updates on top of the current config
    pub fn apply_dotted_updates(&self, updates: &Map<String, Value>) -> SwitchResult<AppConfig> {
        self.commit(|current| {
            let mut tree = serde_json::to_value(&*current)?;
            for (key, value) in updates {
                set_dotted(&mut tree, key, value.clone())?;
            }

            *current = serde_json::from_value(tree)
                .map_err(|e| ConfigError::new("updates", e.to_string()))?;
            Ok(())
        })
    }

    pub fn set_control(&self, control: ControlState) -> SwitchResult<()> {
        self.commit(|current| {
            current.control = control;
            Ok(())
        })?;
        Ok(())
    }

    /// Switch to manual mode with the socket forced to `on`
    pub fn set_manual(&self, on: bool) -> SwitchResult<ControlState> {
        let control = ControlState {
            auto_mode: false,
            manual_socket_state: on,
        };
        self.set_control(control)?;
        info!("🖐️ Manual override: socket {}", if on { "ON" } else { "OFF" });
        Ok(control)
    }

    /// Toggle automatic control
    ///
    /// Leaving auto mode pins the socket at its current state, so the switch
    /// to manual never toggles it.
    pub fn set_auto_mode(&self, enabled: bool) -> SwitchResult<ControlState> {
        let config = self.commit(|current| {
            current.control.auto_mode = enabled;
            if !enabled {
                current.control.manual_socket_state = self.status.read().socket.is_on;
            }
            Ok(())
        })?;
        info!("🤖 Auto mode {}", if enabled { "enabled" } else { "disabled" });
        Ok(config.control)
    }

    /// Edit, validate, persist and swap the configuration under one write lock
    ///
    /// Concurrent updates are serialized, so none of them can write back a
    /// stale copy of a section another one just changed. The stored file
    /// always matches the configuration in effect.
    fn commit(
        &self,
        edit: impl FnOnce(&mut AppConfig) -> SwitchResult<()>,
    ) -> SwitchResult<AppConfig> {
        let mut current = self.config.write();

        let mut next = current.clone();
        edit(&mut next)?;
        next.validate()?;
        if next.web != current.web {
            return Err(
                ConfigError::new("web", "web server settings apply only after a restart").into(),
            );
        }

        if let Some(store) = &self.store {
            store.save(&next).inspect_err(|e| {
                error!("❌ Configuration not applied, save failed: {}", e);
            })?;
        }

        *current = next.clone();
        self.changes.send_replace(next.clone());
        info!("🔄 Configuration updated");
        Ok(next)
    }
}

impl ConfigProvider for ControlHandle {
    fn current_snapshot(&self) -> ConfigSnapshot {
        self.config.read().snapshot()
    }
}

fn set_dotted(tree: &mut Value, key: &str, value: Value) -> Result<(), ConfigError> {
    let unknown = || ConfigError::new(key, "unknown setting");

    let mut node = tree;
    let mut parts = key.split('.').peekable();
    while let Some(part) = parts.next() {
        let object = node.as_object_mut().ok_or_else(unknown)?;
        if parts.peek().is_none() {
            // Optional fields are skipped when unset, so allow them at leaf level
            if !object.contains_key(part) && !is_optional_leaf(key) {
                return Err(unknown());
            }
            object.insert(part.to_owned(), value);
            return Ok(());
        }
        node = object.get_mut(part).ok_or_else(unknown)?;
    }
    Err(unknown())
}

fn is_optional_leaf(key: &str) -> bool {
    key == "night_mode.timezone"
}

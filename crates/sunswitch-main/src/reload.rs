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

//! Applies accepted configuration changes to the running adapters
//!
//! The decision engine reads its own sections every cycle. The HTTP clients
//! and the CSV log are built once, so they are rebuilt here whenever the
//! settings they were built from change.

use std::sync::Arc;
use sunswitch_adapters::{CsvObservationLog, HueSocket, SolarEdgeClient};
use sunswitch_core::Swappable;
use sunswitch_types::AppConfig;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Adapters that follow configuration changes
#[derive(Debug, Clone)]
pub struct LiveAdapters {
    pub power: Arc<Swappable<SolarEdgeClient>>,
    pub actuator: Arc<Swappable<HueSocket>>,
    pub log: CsvObservationLog,
}

impl LiveAdapters {
    /// Bring every adapter in line with `next`, given it was built from `previous`
    pub fn apply(&self, previous: &AppConfig, next: &AppConfig) {
        if next.solaredge != previous.solaredge
            || next.sampling.power_timeout_secs != previous.sampling.power_timeout_secs
        {
            match SolarEdgeClient::new(&next.solaredge, next.sampling.power_timeout()) {
                Ok(client) => {
                    self.power.replace(Arc::new(client));
                    info!("☀️ SolarEdge client rebuilt for {}", next.solaredge.url);
                }
                Err(e) => error!("❌ Keeping previous SolarEdge client: {}", e),
            }
        }

        if next.hue != previous.hue
            || next.sampling.actuator_timeout_secs != previous.sampling.actuator_timeout_secs
        {
            match HueSocket::new(&next.hue, next.sampling.actuator_timeout()) {
                Ok(socket) => {
                    self.actuator.replace(Arc::new(socket));
                    info!("💡 Hue client rebuilt for {}", next.hue.url);
                }
                Err(e) => error!("❌ Keeping previous Hue client: {}", e),
            }
        }

        if next.logging.csv_log_file != previous.logging.csv_log_file {
            self.log.set_path(&next.logging.csv_log_file);
        }
    }

    /// Follow `changes` until the control handle goes away
    pub async fn follow(self, mut changes: watch::Receiver<AppConfig>) {
        let mut current = changes.borrow_and_update().clone();

        while changes.changed().await.is_ok() {
            let next = changes.borrow_and_update().clone();
            self.apply(&current, &next);
            current = next;
        }
        debug!("Configuration watcher stopped");
    }
}

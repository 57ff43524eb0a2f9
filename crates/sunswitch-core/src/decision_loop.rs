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

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::control::ControlHandle;
use crate::engine::{CycleOutcome, DecisionEngine};
use crate::traits::{ConfigProvider, ObservationSink, PowerSource, SwitchActuator};

/// Drives the engine on the configured sampling interval
pub struct DecisionLoop {
    engine: DecisionEngine,
    control: ControlHandle,
    power: Arc<dyn PowerSource>,
    actuator: Arc<dyn SwitchActuator>,
    sink: Arc<dyn ObservationSink>,
}

impl DecisionLoop {
    pub fn new(
        engine: DecisionEngine,
        control: ControlHandle,
        power: Arc<dyn PowerSource>,
        actuator: Arc<dyn SwitchActuator>,
        sink: Arc<dyn ObservationSink>,
    ) -> Self {
        Self {
            engine,
            control,
            power,
            actuator,
            sink,
        }
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    /// Run a single cycle on a fresh snapshot and publish the result
    pub async fn run_once(&mut self) -> CycleOutcome {
        let snapshot = self.control.current_snapshot();
        let outcome = self
            .engine
            .run_cycle(
                &snapshot,
                self.power.as_ref(),
                self.actuator.as_ref(),
                self.sink.as_ref(),
            )
            .await;
        self.control.publish_status(self.engine.status());
        outcome
    }

    /// Loop until `shutdown` is notified
    ///
    /// A cycle still waiting on I/O at shutdown is dropped, so no transition
    /// is committed without the actuator's confirmation.
    pub async fn run(mut self, shutdown: Arc<Notify>) {
        let shutdown = shutdown.notified();
        tokio::pin!(shutdown);

        let mut period = self.control.current_snapshot().sampling.sample_interval();
        let mut interval = new_interval(period, Instant::now());
        info!(
            "🔁 Decision loop started ({}s interval, {} / {})",
            period.as_secs(),
            self.power.name(),
            self.actuator.name()
        );

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                _ = interval.tick() => {}
            }

            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("🛑 Shutdown during cycle, abandoning in-flight I/O");
                    self.control.publish_status(self.engine.status());
                    return;
                }
                outcome = self.run_once() => {
                    debug!("Cycle result: {:?}", outcome.result);
                }
            }

            let wanted = self.control.current_snapshot().sampling.sample_interval();
            if wanted != period {
                info!(
                    "⏱️ Sample interval changed {}s -> {}s",
                    period.as_secs(),
                    wanted.as_secs()
                );
                period = wanted;
                let now = Instant::now();
                interval = new_interval(period, now.checked_add(period).unwrap_or(now));
            }
        }

        info!("🛑 Decision loop stopped");
    }
}

fn new_interval(period: Duration, start: Instant) -> Interval {
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

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

mod config;
mod reload;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use sunswitch_adapters::{CsvObservationLog, CsvSink, HueSocket, SolarEdgeClient};
use sunswitch_core::{
    ConfigStore, ControlHandle, DecisionEngine, DecisionLoop, SwitchActuator, Swappable,
    SystemClock, ThresholdCalculator,
};
use sunswitch_types::{AppConfig, SocketState};
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Pending observations the CSV writer may fall behind by
const SINK_CAPACITY: usize = 256;

#[derive(Parser)]
#[command(name = "sunswitch")]
#[command(author, version, about = "SunSwitch - solar surplus EV charger socket control")]
struct Args {
    /// Configuration file (.toml or .json); overrides SUNSWITCH_CONFIG
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Do not start the HTTP control surface
    #[arg(long)]
    no_web: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, store) = config::load_config(args.config)?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    info!("☀️ SunSwitch v{} starting...", env!("CARGO_PKG_VERSION"));
    log_summary(&config, &store);

    let solaredge = SolarEdgeClient::new(&config.solaredge, config.sampling.power_timeout())
        .context("Failed to build SolarEdge client")?;
    let hue = HueSocket::new(&config.hue, config.sampling.actuator_timeout())
        .context("Failed to build Hue client")?;

    let initial = initial_socket_state(&hue, &config).await;
    info!("🔌 Initial socket state: {}", initial.label());

    let control = ControlHandle::new(config.clone(), initial).with_store(store);

    let log = CsvObservationLog::new(&config.logging.csv_log_file);
    let (sink, writer) = CsvSink::spawn(log.clone(), SINK_CAPACITY);

    let live = reload::LiveAdapters {
        power: Arc::new(Swappable::power_source(Arc::new(solaredge))),
        actuator: Arc::new(Swappable::actuator(Arc::new(hue))),
        log: log.clone(),
    };
    tokio::spawn(live.clone().follow(control.subscribe()));

    if config.web.enabled && !args.no_web {
        let web_control = control.clone();
        let bind = config.web.bind.clone();
        let port = config.web.port;
        tokio::spawn(async move {
            if let Err(e) =
                sunswitch_web::start_web_server(web_control, Some(log), &bind, port).await
            {
                error!("❌ Web server failed: {}", e);
            }
        });
    } else {
        info!("🌐 Web server disabled");
    }

    let engine = DecisionEngine::new(initial, &config.snapshot(), Arc::new(SystemClock));
    let decision_loop = DecisionLoop::new(
        engine,
        control,
        live.power,
        live.actuator,
        Arc::new(sink),
    );

    let shutdown = Arc::new(Notify::new());
    tokio::spawn(wait_for_shutdown(shutdown.clone()));

    info!("✅ Starting main loop...");
    decision_loop.run(shutdown).await;

    // The loop owned the last sender; the writer drains and exits
    if let Err(e) = writer.await {
        warn!("⚠️ CSV writer task ended abnormally: {}", e);
    }

    info!("👋 SunSwitch stopped");
    Ok(())
}

fn log_summary(config: &AppConfig, store: &ConfigStore) {
    info!("📋 Configuration ({}):", store.path().display());
    info!(
        "   ⚡ Appliance: {} V x {} A (margin {:.0}%, hysteresis {:.0}%)",
        config.electrical.voltage_v,
        config.electrical.max_current_a,
        config.electrical.safety_margin * 100.0,
        config.electrical.hysteresis * 100.0
    );
    match ThresholdCalculator::compute(&config.electrical) {
        Ok(t) => info!(
            "   🎚️ Thresholds: ON at {:.1} W, OFF below {:.1} W",
            t.on_watts, t.off_watts
        ),
        Err(e) => warn!("   ⚠️ Thresholds unavailable: {}", e),
    }
    info!(
        "   ⏱️ Sampling every {}s, window {} samples, stable ON/OFF {}s/{}s, min ON {}s",
        config.sampling.sample_interval_secs,
        config.sampling.window_size(),
        config.sampling.require_stable_on_secs,
        config.sampling.require_stable_off_secs,
        config.sampling.min_on_time_secs
    );
    if config.night_mode.enabled {
        info!(
            "   🌙 Night mode {}-{} ({})",
            config.night_mode.start.format("%H:%M"),
            config.night_mode.end.format("%H:%M"),
            config.night_mode.timezone.as_deref().unwrap_or("local time")
        );
    } else {
        info!("   🌙 Night mode disabled");
    }
    info!(
        "   🎛️ Auto mode: {}, manual target: {}",
        config.control.auto_mode,
        if config.control.manual_socket_state { "ON" } else { "OFF" }
    );
    info!("   📝 CSV log: {}", config.logging.csv_log_file);
}

/// Ask the bridge for the socket's current state, assuming OFF if it cannot answer
async fn initial_socket_state(hue: &HueSocket, config: &AppConfig) -> SocketState {
    let now = chrono::Utc::now();
    match tokio::time::timeout(config.sampling.actuator_timeout(), hue.read_state()).await {
        Ok(Ok(Some(true))) => SocketState::on(now),
        Ok(Ok(Some(false) | None)) => SocketState::off(now),
        Ok(Err(e)) => {
            warn!("⚠️ Could not read socket state, assuming OFF: {}", e);
            SocketState::off(now)
        }
        Err(_) => {
            warn!("⚠️ Socket state query timed out, assuming OFF");
            SocketState::off(now)
        }
    }
}

async fn wait_for_shutdown(shutdown: Arc<Notify>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("🛑 Received Ctrl+C"),
                    _ = sigterm.recv() => info!("🛑 Received SIGTERM"),
                }
            }
            Err(e) => {
                warn!("⚠️ Cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                info!("🛑 Received Ctrl+C");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("🛑 Received Ctrl+C");
    }

    // A stored permit covers a signal that arrives before the loop waits
    shutdown.notify_one();
}

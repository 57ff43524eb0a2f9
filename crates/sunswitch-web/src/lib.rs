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

//! HTTP control surface
//!
//! Reads the engine's published status and submits configuration and manual
//! override changes through the [`ControlHandle`]. Never touches the socket
//! directly.

mod api;

pub use api::ApiState;

use axum::{
    Router,
    routing::{get, post},
};
use sunswitch_adapters::CsvObservationLog;
use sunswitch_core::ControlHandle;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Build the API router
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(api::health_handler))
        .route("/api/status", get(api::status_handler))
        .route(
            "/api/config",
            get(api::get_config_handler).post(api::update_config_handler),
        )
        .route("/api/socket", post(api::socket_handler))
        .route("/api/auto_mode", post(api::auto_mode_handler))
        .route("/api/logs", get(api::logs_handler))
        .route("/api/logs/cleanup", post(api::cleanup_logs_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the control API until the process exits
///
/// # Errors
/// Returns error if server fails to bind or serve
pub async fn start_web_server(
    control: ControlHandle,
    log: Option<CsvObservationLog>,
    bind: &str,
    port: u16,
) -> std::io::Result<()> {
    let app = router(ApiState::new(control, log));

    let addr = format!("{bind}:{port}");
    info!("🌐 Starting web server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await
}

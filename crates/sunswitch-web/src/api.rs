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

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use sunswitch_adapters::CsvObservationLog;
use sunswitch_core::{ControlHandle, NightModeGate, SwitchError, ThresholdCalculator};
use sunswitch_types::{EngineStatus, Thresholds};
use tracing::{error, info, warn};

/// Shared state for the control API
#[derive(Clone)]
pub struct ApiState {
    pub control: ControlHandle,

    /// Observation log, when CSV logging is enabled
    pub log: Option<CsvObservationLog>,
}

impl std::fmt::Debug for ApiState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiState")
            .field("control", &self.control)
            .field("log", &self.log.as_ref().map(CsvObservationLog::path))
            .finish()
    }
}

impl ApiState {
    pub fn new(control: ControlHandle, log: Option<CsvObservationLog>) -> Self {
        Self { control, log }
    }
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "success": false, "error": message.into() })),
    )
        .into_response()
}

fn config_failure(e: &SwitchError) -> Response {
    match e {
        SwitchError::InvalidConfig(_) | SwitchError::Serialization(_) => {
            warn!("⚠️ [API] Rejected config update: {}", e);
            failure(StatusCode::BAD_REQUEST, e.to_string())
        }
        _ => {
            error!("❌ [API] Config update failed: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /health
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Response for GET /api/status
#[derive(Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub status: EngineStatus,

    /// Thresholds for the configuration currently in effect
    pub thresholds: Option<Thresholds>,
    pub night_active: bool,
    pub required_power_w: f64,
}

/// GET /api/status
pub async fn status_handler(State(state): State<ApiState>) -> Json<StatusResponse> {
    let config = state.control.config();
    let thresholds = ThresholdCalculator::compute(&config.electrical).ok();
    let tz = config.night_mode.tz().ok().flatten();

    Json(StatusResponse {
        success: true,
        status: state.control.status(),
        thresholds,
        night_active: NightModeGate::is_suppressed_at(Utc::now(), tz, &config.night_mode),
        required_power_w: ThresholdCalculator::required_power(&config.electrical),
    })
}

/// GET /api/config
pub async fn get_config_handler(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({ "success": true, "config": state.control.config() }))
}

/// Request body for POST /api/config
#[derive(Deserialize)]
pub struct UpdateConfigRequest {
    /// Dotted keys, e.g. `"sampling.min_on_time_secs": 600`
    pub updates: Option<Map<String, Value>>,
}

/// POST /api/config
pub async fn update_config_handler(
    State(state): State<ApiState>,
    Json(request): Json<UpdateConfigRequest>,
) -> Response {
    let Some(updates) = request.updates else {
        return failure(StatusCode::BAD_REQUEST, "Missing 'updates' in request body");
    };

    match state.control.apply_dotted_updates(&updates) {
        Ok(config) => {
            info!("✅ [API] Applied {} config update(s)", updates.len());
            Json(json!({ "success": true, "config": config })).into_response()
        }
        Err(e) => config_failure(&e),
    }
}

/// Request body for POST /api/socket
#[derive(Deserialize)]
pub struct SocketRequest {
    pub state: Option<bool>,
}

/// POST /api/socket - manual control, applied by the engine on its next cycle
pub async fn socket_handler(
    State(state): State<ApiState>,
    Json(request): Json<SocketRequest>,
) -> Response {
    let Some(on) = request.state else {
        return failure(StatusCode::BAD_REQUEST, "Missing 'state' in request body");
    };

    match state.control.set_manual(on) {
        Ok(control) => Json(json!({
            "success": true,
            "socket_on": on,
            "control": control,
        }))
        .into_response(),
        Err(e) => config_failure(&e),
    }
}

/// Request body for POST /api/auto_mode
#[derive(Deserialize)]
pub struct AutoModeRequest {
    pub enabled: Option<bool>,
}

/// POST /api/auto_mode
pub async fn auto_mode_handler(
    State(state): State<ApiState>,
    Json(request): Json<AutoModeRequest>,
) -> Response {
    let Some(enabled) = request.enabled else {
        return failure(StatusCode::BAD_REQUEST, "Missing 'enabled' in request body");
    };

    match state.control.set_auto_mode(enabled) {
        Ok(control) => Json(json!({
            "success": true,
            "auto_mode": control.auto_mode,
            "manual_socket_state": control.manual_socket_state,
        }))
        .into_response(),
        Err(e) => config_failure(&e),
    }
}

#[derive(Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
}

/// GET /api/logs?limit=N
pub async fn logs_handler(State(state): State<ApiState>, Query(query): Query<LogsQuery>) -> Response {
    let limit = query.limit.unwrap_or(100);
    let Some(log) = state.log else {
        return Json(json!({ "success": true, "logs": [], "count": 0 })).into_response();
    };

    match tokio::task::spawn_blocking(move || log.recent(limit)).await {
        Ok(Ok(entries)) => Json(json!({
            "success": true,
            "count": entries.len(),
            "logs": entries,
        }))
        .into_response(),
        Ok(Err(e)) => {
            error!("❌ [API] Failed to read logs: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// POST /api/logs/cleanup
pub async fn cleanup_logs_handler(State(state): State<ApiState>) -> Response {
    let Some(log) = state.log else {
        return failure(StatusCode::NOT_FOUND, "CSV logging is not enabled");
    };
    let retention_days = state.control.config().logging.retention_days;

    match tokio::task::spawn_blocking(move || log.cleanup(retention_days, Utc::now())).await {
        Ok(Ok(removed)) => Json(json!({
            "success": true,
            "removed_count": removed,
            "message": format!("Cleaned up {removed} old log entries"),
        }))
        .into_response(),
        Ok(Err(e)) => {
            error!("❌ [API] Log cleanup failed: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

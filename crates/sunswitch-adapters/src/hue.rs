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

//! Philips Hue v2 (CLIP API) smart plug

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use sunswitch_core::{SwitchActuator, SwitchResult};
use sunswitch_types::HueConfig;
use tracing::{debug, error, info, trace, warn};

use crate::errors::{AdapterError, AdapterResult};

const APP_KEY_HEADER: &str = "hue-application-key";

#[derive(Debug, Deserialize)]
struct ResourceResponse {
    #[serde(default)]
    errors: Vec<HueApiError>,
    #[serde(default)]
    data: Vec<LightResource>,
}

#[derive(Debug, Deserialize)]
struct HueApiError {
    description: String,
}

#[derive(Debug, Deserialize)]
struct LightResource {
    on: Option<OnState>,
}

#[derive(Debug, Deserialize)]
struct OnState {
    on: bool,
}

/// Smart plug exposed as a light resource on a Hue bridge
#[derive(Clone)]
pub struct HueSocket {
    url: String,
    app_key: String,
    client: Client,
}

impl std::fmt::Debug for HueSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HueSocket")
            .field("url", &self.url)
            .field("app_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl HueSocket {
    pub fn new(config: &HueConfig, timeout: Duration) -> AdapterResult<Self> {
        if !config.verify_tls {
            info!("🔓 Hue bridge TLS verification disabled (self-signed certificate)");
        }

        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| AdapterError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: config.url.clone(),
            app_key: config.app_key.clone(),
            client,
        })
    }

    /// Switch the plug
    pub async fn set_on(&self, on: bool) -> AdapterResult<()> {
        debug!("📞 [HUE] PUT on={} -> {}", on, self.url);

        let response = self
            .client
            .put(&self.url)
            .header(APP_KEY_HEADER, &self.app_key)
            .json(&json!({ "on": { "on": on } }))
            .send()
            .await?;

        let body = check_status(response).await?;
        trace!("   Body: {}", body);

        // The bridge may answer 200 and still list errors
        if let Ok(parsed) = serde_json::from_str::<ResourceResponse>(&body)
            && let Some(first) = parsed.errors.first()
        {
            warn!("⚠️ [HUE] Bridge reported: {}", first.description);
            return Err(AdapterError::Rejected(first.description.clone()));
        }
        Ok(())
    }

    /// Read the plug's current on/off state
    pub async fn is_on(&self) -> AdapterResult<bool> {
        debug!("🔍 [HUE] GET {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .header(APP_KEY_HEADER, &self.app_key)
            .send()
            .await?;

        let body = check_status(response).await?;
        let parsed: ResourceResponse = serde_json::from_str(&body)?;
        parsed
            .data
            .first()
            .and_then(|resource| resource.on.as_ref())
            .map(|state| state.on)
            .ok_or_else(|| AdapterError::InvalidResponse("data[0].on.on missing".into()))
    }
}

async fn check_status(response: reqwest::Response) -> AdapterResult<String> {
    match response.status() {
        status if status.is_success() => Ok(response.text().await?),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            error!("❌ [HUE ERROR] Application key rejected");
            Err(AdapterError::AuthenticationFailed)
        }
        status => {
            let error_text = response.text().await.unwrap_or_default();
            error!("❌ [HUE ERROR] Status {}: {}", status, error_text);
            Err(AdapterError::Api {
                status: status.as_u16(),
                message: error_text,
            })
        }
    }
}

#[async_trait]
impl SwitchActuator for HueSocket {
    async fn set_state(&self, on: bool) -> SwitchResult<()> {
        self.set_on(on)
            .await
            .map_err(AdapterError::into_actuator_error)
    }

    async fn read_state(&self) -> SwitchResult<Option<bool>> {
        self.is_on()
            .await
            .map(Some)
            .map_err(AdapterError::into_actuator_error)
    }

    fn name(&self) -> &str {
        "Hue"
    }
}

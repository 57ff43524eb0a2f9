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

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use sunswitch_core::{PowerSource, SwitchResult};
use sunswitch_types::SolarEdgeConfig;
use tracing::{debug, error, trace, warn};

use crate::errors::{AdapterError, AdapterResult};

/// Site overview as returned by the SolarEdge monitoring API
#[derive(Debug, Deserialize)]
struct OverviewResponse {
    overview: Overview,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Overview {
    current_power: Option<CurrentPower>,
    last_update_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CurrentPower {
    power: Option<f64>,
}

/// Current PV output plus the inverter's own update time
#[derive(Debug, Clone, PartialEq)]
pub struct PowerReading {
    pub watts: f64,

    /// Site-local time string, as reported by SolarEdge
    pub last_update_time: Option<String>,
}

/// SolarEdge monitoring API client
#[derive(Clone)]
pub struct SolarEdgeClient {
    url: String,
    api_key: String,
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl std::fmt::Debug for SolarEdgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolarEdgeClient")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl SolarEdgeClient {
    pub fn new(config: &SolarEdgeConfig, timeout: Duration) -> AdapterResult<Self> {
        if config.api_key.is_empty() {
            warn!("⚠️ SolarEdge API key is empty, requests will be refused");
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdapterError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            client,
            max_retries: 2,
            retry_delay: Duration::from_millis(500),
        })
    }

    /// Set custom retry configuration
    pub fn with_retry_config(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Fetch the site overview and extract the current power
    pub async fn fetch_power(&self) -> AdapterResult<PowerReading> {
        debug!("🔍 [SOLAREDGE] Reading current power");

        let response = self.retry_request().await?;

        match response.status() {
            StatusCode::OK => {
                let body = response.text().await?;
                trace!("   Body: {}", body);
                parse_overview(&body)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                error!("❌ [SOLAREDGE ERROR] API key rejected");
                Err(AdapterError::AuthenticationFailed)
            }
            status => {
                let error_text = response.text().await.unwrap_or_default();
                error!("❌ [SOLAREDGE ERROR] Status {}: {}", status, error_text);
                Err(AdapterError::Api {
                    status: status.as_u16(),
                    message: error_text,
                })
            }
        }
    }

    async fn retry_request(&self) -> AdapterResult<reqwest::Response> {
        let mut attempts = 0;
        let mut delay = self.retry_delay;

        loop {
            attempts += 1;
            let result = self
                .client
                .get(&self.url)
                .query(&[("api_key", self.api_key.as_str())])
                .send()
                .await;

            match result {
                Ok(response) => return Ok(response),
                Err(e) if attempts >= self.max_retries || e.is_timeout() => {
                    error!("Request failed after {} attempts: {}", attempts, e);
                    return Err(AdapterError::Http(e));
                }
                Err(e) => {
                    warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {:?}",
                        attempts, self.max_retries, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
}

fn parse_overview(body: &str) -> AdapterResult<PowerReading> {
    let response: OverviewResponse = serde_json::from_str(body)?;
    let watts = response
        .overview
        .current_power
        .and_then(|p| p.power)
        .ok_or_else(|| AdapterError::InvalidResponse("overview.currentPower.power missing".into()))?;

    debug!(
        "✅ [SOLAREDGE] {:.0} W (updated {})",
        watts,
        response.overview.last_update_time.as_deref().unwrap_or("?")
    );
    Ok(PowerReading {
        watts,
        last_update_time: response.overview.last_update_time,
    })
}

#[async_trait]
impl PowerSource for SolarEdgeClient {
    async fn read_current_power(&self) -> SwitchResult<f64> {
        self.fetch_power()
            .await
            .map(|reading| reading.watts)
            .map_err(AdapterError::into_sensor_error)
    }

    fn name(&self) -> &str {
        "SolarEdge"
    }
}

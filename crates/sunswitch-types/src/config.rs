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

use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// A configuration value that failed validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ConfigError {
    /// Dotted path of the offending field (e.g., "electrical.hysteresis")
    pub field: String,
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Appliance electrical rating used to derive power thresholds
    #[serde(default)]
    pub electrical: ElectricalConfig,

    /// Sampling cadence, window and dwell durations
    #[serde(default)]
    pub sampling: SamplingConfig,

    /// Night blackout window
    #[serde(default)]
    pub night_mode: NightModeConfig,

    /// Automatic/manual control
    #[serde(default)]
    pub control: ControlState,

    /// Log level and observation log
    #[serde(default)]
    pub logging: LoggingConfig,

    /// SolarEdge monitoring API
    #[serde(default)]
    pub solaredge: SolarEdgeConfig,

    /// Philips Hue bridge (smart socket)
    #[serde(default)]
    pub hue: HueConfig,

    /// Control surface
    #[serde(default)]
    pub web: WebConfig,
}

/// Electrical rating of the appliance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElectricalConfig {
    /// Grid voltage (V)
    #[serde(default = "default_voltage")]
    pub voltage_v: f64,

    /// Maximum charging current drawn by the appliance (A)
    #[serde(default = "default_max_current")]
    pub max_current_a: f64,

    /// Extra headroom above the nominal draw, as a fraction (0.1 = 10%)
    #[serde(default = "default_fraction")]
    pub safety_margin: f64,

    /// Width of the hysteresis band below the ON threshold, as a fraction
    #[serde(default = "default_fraction")]
    pub hysteresis: f64,
}

fn default_voltage() -> f64 {
    230.0
}

fn default_max_current() -> f64 {
    6.0 // Lowest charging current most EV chargers accept
}

fn default_fraction() -> f64 {
    0.1
}

impl Default for ElectricalConfig {
    fn default() -> Self {
        Self {
            voltage_v: default_voltage(),
            max_current_a: default_max_current(),
            safety_margin: default_fraction(),
            hysteresis: default_fraction(),
        }
    }
}

impl ElectricalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("electrical.voltage_v", self.voltage_v),
            ("electrical.max_current_a", self.max_current_a),
            ("electrical.safety_margin", self.safety_margin),
            ("electrical.hysteresis", self.hysteresis),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(ConfigError::new(field, "must be a finite number"));
            }
            if value < 0.0 {
                return Err(ConfigError::new(field, "must not be negative"));
            }
        }
        if self.hysteresis >= 1.0 {
            return Err(ConfigError::new(
                "electrical.hysteresis",
                "must be less than 1.0 (OFF threshold would not be positive)",
            ));
        }
        Ok(())
    }
}

/// Longest accepted cycle interval and rolling window (one day)
pub const MAX_SAMPLE_INTERVAL_SECS: u64 = 86_400;
pub const MAX_WINDOW_SECS: u64 = 86_400;

/// Upper bound on samples held by the rolling window
pub const MAX_WINDOW_SAMPLES: usize = 10_000;

/// Longest accepted stability or minimum-on duration (one week)
pub const MAX_DWELL_SECS: u64 = 604_800;

pub const MAX_IO_TIMEOUT_SECS: u64 = 300;

/// Sampling cadence and dwell durations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Seconds between decision cycles
    #[serde(default = "default_sample_interval")]
    pub sample_interval_secs: u64,

    /// Length of the rolling window (seconds)
    #[serde(default = "default_window")]
    pub window_secs: u64,

    /// Average must stay at or above the ON threshold this long before switching ON
    #[serde(default = "default_stable")]
    pub require_stable_on_secs: u64,

    /// Average must stay at or below the OFF threshold this long before switching OFF
    #[serde(default = "default_stable")]
    pub require_stable_off_secs: u64,

    /// Minimum continuous ON time before an OFF transition is allowed
    #[serde(default = "default_min_on_time")]
    pub min_on_time_secs: u64,

    /// Timeout for a single power reading
    #[serde(default = "default_io_timeout")]
    pub power_timeout_secs: u64,

    /// Timeout for a single actuator command
    #[serde(default = "default_io_timeout")]
    pub actuator_timeout_secs: u64,

    /// Hold state until the window has filled once
    #[serde(default = "default_true")]
    pub warmup_full_window: bool,
}

fn default_sample_interval() -> u64 {
    60
}

fn default_window() -> u64 {
    600
}

fn default_stable() -> u64 {
    120
}

fn default_min_on_time() -> u64 {
    300 // 5 minutes
}

fn default_io_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: default_sample_interval(),
            window_secs: default_window(),
            require_stable_on_secs: default_stable(),
            require_stable_off_secs: default_stable(),
            min_on_time_secs: default_min_on_time(),
            power_timeout_secs: default_io_timeout(),
            actuator_timeout_secs: default_io_timeout(),
            warmup_full_window: true,
        }
    }
}

impl SamplingConfig {
    /// Number of samples held by the rolling window, in `1..=MAX_WINDOW_SAMPLES`
    pub fn window_size(&self) -> usize {
        let samples = self
            .window_secs
            .checked_div(self.sample_interval_secs)
            .unwrap_or(1)
            .max(1);
        usize::try_from(samples)
            .unwrap_or(MAX_WINDOW_SAMPLES)
            .min(MAX_WINDOW_SAMPLES)
    }

    /// Cycle period, clamped to `1..=MAX_SAMPLE_INTERVAL_SECS` seconds
    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_secs.clamp(1, MAX_SAMPLE_INTERVAL_SECS))
    }

    pub fn power_timeout(&self) -> Duration {
        Duration::from_secs(self.power_timeout_secs)
    }

    pub fn actuator_timeout(&self) -> Duration {
        Duration::from_secs(self.actuator_timeout_secs)
    }

    pub fn stable_on(&self) -> TimeDelta {
        secs_to_delta(self.require_stable_on_secs)
    }

    pub fn stable_off(&self) -> TimeDelta {
        secs_to_delta(self.require_stable_off_secs)
    }

    pub fn min_on_time(&self) -> TimeDelta {
        secs_to_delta(self.min_on_time_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "sampling.sample_interval_secs",
            self.sample_interval_secs,
            1,
            MAX_SAMPLE_INTERVAL_SECS,
        )?;
        check_range("sampling.window_secs", self.window_secs, 0, MAX_WINDOW_SECS)?;
        check_range(
            "sampling.power_timeout_secs",
            self.power_timeout_secs,
            1,
            MAX_IO_TIMEOUT_SECS,
        )?;
        check_range(
            "sampling.actuator_timeout_secs",
            self.actuator_timeout_secs,
            1,
            MAX_IO_TIMEOUT_SECS,
        )?;

        for (field, secs) in [
            ("sampling.require_stable_on_secs", self.require_stable_on_secs),
            ("sampling.require_stable_off_secs", self.require_stable_off_secs),
            ("sampling.min_on_time_secs", self.min_on_time_secs),
        ] {
            check_range(field, secs, 0, MAX_DWELL_SECS)?;
        }

        let samples = self
            .window_secs
            .checked_div(self.sample_interval_secs)
            .unwrap_or(0);
        if samples > MAX_WINDOW_SAMPLES as u64 {
            return Err(ConfigError::new(
                "sampling.window_secs",
                format!(
                    "window would hold {samples} samples, at most {MAX_WINDOW_SAMPLES} allowed"
                ),
            ));
        }
        Ok(())
    }
}

fn check_range(field: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min {
        return Err(ConfigError::new(field, format!("must be at least {min} second(s)")));
    }
    if value > max {
        return Err(ConfigError::new(field, format!("must be at most {max} seconds")));
    }
    Ok(())
}

fn secs_to_delta(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

/// Night blackout window
///
/// `start > end` wraps past midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightModeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(with = "hhmm", default = "default_night_start")]
    pub start: NaiveTime,

    #[serde(with = "hhmm", default = "default_night_end")]
    pub end: NaiveTime,

    /// IANA timezone for evaluating the window; local time when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

fn default_night_start() -> NaiveTime {
    NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn default_night_end() -> NaiveTime {
    NaiveTime::from_hms_opt(6, 0, 0).unwrap_or(NaiveTime::MIN)
}

impl Default for NightModeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start: default_night_start(),
            end: default_night_end(),
            timezone: None,
        }
    }
}

impl NightModeConfig {
    /// Parsed timezone, if one is configured
    pub fn tz(&self) -> Result<Option<chrono_tz::Tz>, ConfigError> {
        self.timezone
            .as_deref()
            .map(|name| {
                name.parse::<chrono_tz::Tz>().map_err(|_| {
                    ConfigError::new(
                        "night_mode.timezone",
                        format!("unknown timezone '{name}'"),
                    )
                })
            })
            .transpose()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tz().map(|_| ())
    }
}

/// Automatic vs. manual control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    #[serde(default = "default_true")]
    pub auto_mode: bool,

    /// Target socket state while `auto_mode` is off
    #[serde(default)]
    pub manual_socket_state: bool,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            auto_mode: true,
            manual_socket_state: false,
        }
    }
}

/// Log level and observation log location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_csv_log_file")]
    pub csv_log_file: String,

    /// Observation rows older than this are removed by log cleanup
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_csv_log_file() -> String {
    "solar_log.csv".to_owned()
}

fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            csv_log_file: default_csv_log_file(),
            retention_days: default_retention_days(),
        }
    }
}

/// SolarEdge monitoring API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolarEdgeConfig {
    /// Site overview endpoint
    #[serde(default = "default_solaredge_url")]
    pub url: String,

    #[serde(default)]
    pub api_key: String,
}

fn default_solaredge_url() -> String {
    "https://monitoringapi.solaredge.com/site/0/overview".to_owned()
}

impl Default for SolarEdgeConfig {
    fn default() -> Self {
        Self {
            url: default_solaredge_url(),
            api_key: String::new(),
        }
    }
}

/// Philips Hue v2 smart plug resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HueConfig {
    /// Light/plug resource URL on the bridge
    #[serde(default = "default_hue_url")]
    pub url: String,

    #[serde(default)]
    pub app_key: String,

    /// Bridges ship self-signed certificates
    #[serde(default)]
    pub verify_tls: bool,
}

fn default_hue_url() -> String {
    "https://192.168.1.2/clip/v2/resource/light/00000000-0000-0000-0000-000000000000".to_owned()
}

impl Default for HueConfig {
    fn default() -> Self {
        Self {
            url: default_hue_url(),
            app_key: String::new(),
            verify_tls: false,
        }
    }
}

/// Control surface listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    5050
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            electrical: ElectricalConfig::default(),
            sampling: SamplingConfig::default(),
            night_mode: NightModeConfig::default(),
            control: ControlState::default(),
            logging: LoggingConfig::default(),
            solaredge: SolarEdgeConfig::default(),
            hue: HueConfig::default(),
            web: WebConfig::default(),
        }
    }
}

impl AppConfig {
    /// Validate every section, reporting the first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.electrical.validate()?;
        self.sampling.validate()?;
        self.night_mode.validate()?;

        if self.logging.retention_days == 0 {
            return Err(ConfigError::new(
                "logging.retention_days",
                "must be at least 1 day",
            ));
        }
        if self.solaredge.url.is_empty() {
            return Err(ConfigError::new("solaredge.url", "cannot be empty"));
        }
        if self.hue.url.is_empty() {
            return Err(ConfigError::new("hue.url", "cannot be empty"));
        }
        Ok(())
    }

    /// The parts of the configuration the decision engine consumes
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            electrical: self.electrical,
            night_mode: self.night_mode.clone(),
            control: self.control,
            sampling: self.sampling,
        }
    }
}

/// Immutable configuration view read once per decision cycle
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot {
    pub electrical: ElectricalConfig,
    pub night_mode: NightModeConfig,
    pub control: ControlState,
    pub sampling: SamplingConfig,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        AppConfig::default().snapshot()
    }
}

/// `HH:MM` (de)serialization for times of day
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(|_| serde::de::Error::custom(format!("invalid time '{raw}', expected HH:MM")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.sampling.sample_interval_secs, 60);
        assert_eq!(config.sampling.min_on_time_secs, 300);
        assert!(config.control.auto_mode);
        assert!(config.night_mode.enabled);

        // Validation should pass on default
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_window_size() {
        let mut sampling = SamplingConfig::default();
        assert_eq!(sampling.window_size(), 10);

        sampling.window_secs = 30;
        sampling.sample_interval_secs = 60;
        assert_eq!(sampling.window_size(), 1);

        sampling.window_secs = 300;
        sampling.sample_interval_secs = 60;
        assert_eq!(sampling.window_size(), 5);
    }

    #[test]
    fn test_validate_negative_electrical() {
        let mut config = AppConfig::default();
        config.electrical.voltage_v = -230.0;

        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "electrical.voltage_v");
    }

    #[test]
    fn test_validate_hysteresis_too_wide() {
        let mut config = AppConfig::default();
        config.electrical.hysteresis = 1.0;

        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "electrical.hysteresis");
    }

    #[test]
    fn test_validate_nan_margin() {
        let mut config = AppConfig::default();
        config.electrical.safety_margin = f64::NAN;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_hysteresis_is_valid() {
        let mut config = AppConfig::default();
        config.electrical.hysteresis = 0.0;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_interval() {
        let mut config = AppConfig::default();
        config.sampling.sample_interval_secs = 0;

        assert!(
            config
                .validate()
                .unwrap_err()
                .to_string()
                .contains("sample_interval_secs")
        );
    }

    #[test]
    fn test_validate_rejects_oversized_sampling() {
        let oversized = [
            ("sampling.sample_interval_secs", SamplingConfig {
                sample_interval_secs: u64::MAX,
                ..SamplingConfig::default()
            }),
            ("sampling.window_secs", SamplingConfig {
                window_secs: u64::MAX,
                ..SamplingConfig::default()
            }),
            ("sampling.power_timeout_secs", SamplingConfig {
                power_timeout_secs: MAX_IO_TIMEOUT_SECS + 1,
                ..SamplingConfig::default()
            }),
            ("sampling.actuator_timeout_secs", SamplingConfig {
                actuator_timeout_secs: u64::MAX,
                ..SamplingConfig::default()
            }),
            ("sampling.min_on_time_secs", SamplingConfig {
                min_on_time_secs: u64::MAX,
                ..SamplingConfig::default()
            }),
            // One-second samples over a full day is too many to hold
            ("sampling.window_secs", SamplingConfig {
                sample_interval_secs: 1,
                window_secs: MAX_WINDOW_SECS,
                ..SamplingConfig::default()
            }),
        ];

        for (field, sampling) in oversized {
            let err = sampling.validate().unwrap_err();
            assert_eq!(err.field, field, "{sampling:?}");
        }
    }

    #[test]
    fn test_accessors_clamp_unvalidated_values() {
        let sampling = SamplingConfig {
            sample_interval_secs: u64::MAX,
            window_secs: u64::MAX,
            ..SamplingConfig::default()
        };
        assert_eq!(
            sampling.sample_interval(),
            Duration::from_secs(MAX_SAMPLE_INTERVAL_SECS)
        );

        let sampling = SamplingConfig {
            sample_interval_secs: 1,
            window_secs: u64::MAX,
            ..SamplingConfig::default()
        };
        assert_eq!(sampling.window_size(), MAX_WINDOW_SAMPLES);

        let sampling = SamplingConfig {
            sample_interval_secs: 0,
            ..SamplingConfig::default()
        };
        assert_eq!(sampling.sample_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_validate_unknown_timezone() {
        let mut config = AppConfig::default();
        config.night_mode.timezone = Some("Mars/Olympus_Mons".to_owned());
        assert!(config.validate().is_err());

        config.night_mode.timezone = Some("Europe/Prague".to_owned());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_night_times_parse_hhmm() {
        let json = r#"{ "enabled": true, "start": "21:30", "end": "05:45" }"#;
        let night: NightModeConfig = serde_json::from_str(json).unwrap();

        assert_eq!(night.start, NaiveTime::from_hms_opt(21, 30, 0).unwrap());
        assert_eq!(night.end, NaiveTime::from_hms_opt(5, 45, 0).unwrap());

        let out = serde_json::to_value(&night).unwrap();
        assert_eq!(out["start"], "21:30");
    }

    #[test]
    fn test_night_time_rejects_garbage() {
        let json = r#"{ "enabled": true, "start": "late", "end": "05:45" }"#;
        assert!(serde_json::from_str::<NightModeConfig>(json).is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
            [electrical]
            voltage_v = 240.0
            max_current_a = 10.0

            [sampling]
            sample_interval_secs = 30
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();

        assert!((config.electrical.voltage_v - 240.0).abs() < f64::EPSILON);
        assert!((config.electrical.hysteresis - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.sampling.sample_interval_secs, 30);
        assert_eq!(config.sampling.window_secs, 600);
        assert_eq!(config.web.port, 5050);
    }

    #[test]
    fn test_toml_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();

        let deserialized: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_snapshot_copies_engine_sections() {
        let mut config = AppConfig::default();
        config.control.auto_mode = false;
        config.sampling.min_on_time_secs = 900;

        let snapshot = config.snapshot();
        assert!(!snapshot.control.auto_mode);
        assert_eq!(snapshot.sampling.min_on_time(), TimeDelta::seconds(900));
    }
}

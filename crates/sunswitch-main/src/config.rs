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

//! Startup configuration loading
//!
//! Looks for an explicit path (`--config` or `SUNSWITCH_CONFIG`), then
//! `config.toml`, then `config.json` in the working directory. Without any
//! file the defaults are used with environment overrides applied.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use sunswitch_core::ConfigStore;
use sunswitch_types::AppConfig;
use tracing::{info, warn};

const CANDIDATES: [&str; 2] = ["config.toml", "config.json"];

/// Where a fresh configuration is written when none was found on disk
const DEFAULT_STORE: &str = "config.json";

/// Load the application configuration and the store it should be saved to
pub fn load_config(explicit: Option<PathBuf>) -> Result<(AppConfig, ConfigStore)> {
    let explicit = explicit.or_else(|| std::env::var_os("SUNSWITCH_CONFIG").map(PathBuf::from));
    load_from(explicit.as_deref(), Path::new("."), |key| std::env::var(key).ok())
}

fn load_from(
    explicit: Option<&Path>,
    dir: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(AppConfig, ConfigStore)> {
    if let Some(path) = explicit {
        if !path.exists() {
            bail!("Configuration file {} does not exist", path.display());
        }
        let store = ConfigStore::new(path);
        let config = store
            .load()
            .with_context(|| format!("Failed to load {}", path.display()))?;
        info!("✅ Loaded configuration from {}", path.display());
        return Ok((config, store));
    }

    for name in CANDIDATES {
        let store = ConfigStore::new(dir.join(name));
        if store.exists() {
            let config = store
                .load()
                .with_context(|| format!("Failed to load {name}"))?;
            info!("✅ Loaded configuration from {}", name);
            return Ok((config, store));
        }
    }

    warn!("No configuration file found, using defaults with environment overrides");
    let mut config = AppConfig::default();
    apply_env_overrides(&mut config, env);
    config
        .validate()
        .context("Invalid configuration from environment")?;
    Ok((config, ConfigStore::new(dir.join(DEFAULT_STORE))))
}

fn apply_env_overrides(config: &mut AppConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(key) = env("SOLAREDGE_API_KEY") {
        config.solaredge.api_key = key;
    }
    if let Some(url) = env("SOLAREDGE_URL") {
        config.solaredge.url = url;
    }

    if let Some(url) = env("HUE_URL") {
        config.hue.url = url;
    }
    if let Some(key) = env("HUE_APP_KEY") {
        config.hue.app_key = key;
    }

    if let Some(interval) = env("SAMPLE_INTERVAL_SECS")
        && let Ok(secs) = interval.parse::<u64>()
    {
        config.sampling.sample_interval_secs = secs;
    }

    if let Some(port) = env("WEB_PORT")
        && let Ok(port) = port.parse::<u16>()
    {
        config.web.port = port;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_when_no_file() {
        let dir = TempDir::new().unwrap();
        let (config, store) = load_from(None, dir.path(), no_env).unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(store.path(), dir.path().join("config.json"));
    }

    #[test]
    fn test_env_overrides_apply_to_defaults() {
        let dir = TempDir::new().unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("SOLAREDGE_API_KEY", "secret"),
            ("HUE_URL", "https://bridge.local/clip/v2/resource/light/1"),
            ("SAMPLE_INTERVAL_SECS", "30"),
            ("WEB_PORT", "not-a-port"),
        ]);

        let (config, _) = load_from(None, dir.path(), |k| env.get(k).map(|v| (*v).to_owned()))
            .unwrap();

        assert_eq!(config.solaredge.api_key, "secret");
        assert_eq!(config.hue.url, "https://bridge.local/clip/v2/resource/light/1");
        assert_eq!(config.sampling.sample_interval_secs, 30);
        // Unparseable values leave the default in place
        assert_eq!(config.web.port, AppConfig::default().web.port);
    }

    #[test]
    fn test_toml_preferred_over_json() {
        let dir = TempDir::new().unwrap();
        let mut toml_config = AppConfig::default();
        toml_config.sampling.min_on_time_secs = 900;
        ConfigStore::new(dir.path().join("config.toml"))
            .save(&toml_config)
            .unwrap();
        ConfigStore::new(dir.path().join("config.json"))
            .save(&AppConfig::default())
            .unwrap();

        let (config, store) = load_from(None, dir.path(), no_env).unwrap();

        assert_eq!(config.sampling.min_on_time_secs, 900);
        assert_eq!(store.path(), dir.path().join("config.toml"));
    }

    #[test]
    fn test_explicit_path_wins_and_ignores_env() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.json");
        let mut custom = AppConfig::default();
        custom.electrical.max_current_a = 10.0;
        ConfigStore::new(&path).save(&custom).unwrap();

        let (config, _) =
            load_from(Some(&path), dir.path(), |_| Some("999".to_owned())).unwrap();

        assert!((config.electrical.max_current_a - 10.0).abs() < f64::EPSILON);
        assert_eq!(config.sampling.sample_interval_secs, 60);
    }

    #[test]
    fn test_missing_explicit_path_fails() {
        let dir = TempDir::new().unwrap();
        let result = load_from(Some(&dir.path().join("absent.toml")), dir.path(), no_env);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_file_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"electrical": {"voltage_v": -5.0}}"#,
        )
        .unwrap();

        assert!(load_from(None, dir.path(), no_env).is_err());
    }
}

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

use std::path::{Path, PathBuf};
use sunswitch_types::AppConfig;
use tracing::{debug, info};

use crate::error::SwitchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

/// On-disk home of the application configuration
///
/// The format follows the file extension: `.toml` is TOML, anything else JSON.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    format: Format,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Format::Toml,
            _ => Format::Json,
        };
        Self { path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".backup");
        PathBuf::from(name)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read and validate the stored configuration
    pub fn load(&self) -> SwitchResult<AppConfig> {
        let content = std::fs::read_to_string(&self.path)?;
        let config: AppConfig = match self.format {
            Format::Toml => toml::from_str(&content)?,
            Format::Json => serde_json::from_str(&content)?,
        };
        config.validate()?;

        debug!("Loaded configuration from {}", self.path.display());
        Ok(config)
    }

    /// Persist `config`, keeping the previous file as `<path>.backup`
    pub fn save(&self, config: &AppConfig) -> SwitchResult<()> {
        let content = match self.format {
            Format::Toml => toml::to_string_pretty(config)?,
            Format::Json => serde_json::to_string_pretty(config)?,
        };

        if self.path.exists() {
            std::fs::copy(&self.path, self.backup_path())?;
        }

        // Atomic write
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, content)?;
        std::fs::rename(&temp_path, &self.path)?;

        info!("💾 Configuration saved to {}", self.path.display());
        Ok(())
    }
}

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

//! CSV observation log
//!
//! One row per decision cycle with the header
//! `timestamp,power_w,avg_w,median_w,socket_on,auto_mode`. Cycles without a
//! power reading leave the three power columns empty.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;
use sunswitch_core::ObservationSink;
use sunswitch_types::Observation;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::errors::AdapterResult;

/// One CSV row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub power_w: Option<f64>,
    pub avg_w: Option<f64>,
    pub median_w: Option<f64>,
    #[serde(deserialize_with = "flexible_bool")]
    pub socket_on: bool,
    #[serde(deserialize_with = "flexible_bool")]
    pub auto_mode: bool,
}

impl From<Observation> for LogEntry {
    fn from(observation: Observation) -> Self {
        Self {
            timestamp: observation.timestamp,
            power_w: observation.power_watts,
            avg_w: observation.avg_watts,
            median_w: observation.median_watts,
            socket_on: observation.socket_on,
            auto_mode: observation.auto_mode,
        }
    }
}

/// Accept `true`/`True`/`1` as written by older loggers
fn flexible_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid bool '{other}'"))),
    }
}

/// File-backed log
///
/// Clones share the path behind one lock, so appends, rewrites and path
/// changes never interleave.
#[derive(Debug, Clone)]
pub struct CsvObservationLog {
    path: Arc<Mutex<PathBuf>>,
}

impl CsvObservationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(Mutex::new(path.into())),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.path.lock().clone()
    }

    /// Point every clone at a different file; later writes go there
    pub fn set_path(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let mut current = self.path.lock();
        if *current != path {
            info!(
                "📝 CSV observation log moved {} -> {}",
                current.display(),
                path.display()
            );
            *current = path;
        }
    }

    /// Append one row, writing the header first if the file is new
    pub fn append(&self, entry: &LogEntry) -> AdapterResult<()> {
        let path = self.path.lock();

        let needs_header = !std::fs::metadata(&*path).is_ok_and(|m| m.len() > 0);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&*path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(entry)?;
        writer.flush()?;
        Ok(())
    }

    /// Last `limit` rows, oldest first; a missing file is an empty log
    pub fn recent(&self, limit: usize) -> AdapterResult<Vec<LogEntry>> {
        let mut entries = self.read_all()?;
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.split_off(skip))
    }

    /// Drop rows older than `retention_days`, returning how many were removed
    ///
    /// Rows whose timestamp cannot be parsed are kept.
    pub fn cleanup(&self, retention_days: u32, now: DateTime<Utc>) -> AdapterResult<usize> {
        let path = self.path.lock();

        if !path.exists() {
            return Ok(0);
        }

        let cutoff = now - TimeDelta::days(i64::from(retention_days));
        let mut reader = csv::Reader::from_path(&*path)?;
        let headers = reader.headers()?.clone();

        let mut kept = Vec::new();
        let mut removed = 0;
        for record in reader.records() {
            let record = record?;
            let expired = record
                .get(0)
                .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                .is_some_and(|ts| ts.with_timezone(&Utc) < cutoff);
            if expired {
                removed += 1;
            } else {
                kept.push(record);
            }
        }

        if removed == 0 {
            return Ok(0);
        }

        let temp_path = path.with_extension("tmp");
        {
            let mut writer = csv::Writer::from_path(&temp_path)?;
            writer.write_record(&headers)?;
            for record in &kept {
                writer.write_record(record)?;
            }
            writer.flush()?;
        }
        std::fs::rename(&temp_path, &*path)?;

        info!(
            "🧹 Removed {} log rows older than {} days ({} kept)",
            removed,
            retention_days,
            kept.len()
        );
        Ok(removed)
    }

    fn read_all(&self) -> AdapterResult<Vec<LogEntry>> {
        let path = self.path.lock();

        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&*path)?;
        let mut entries = Vec::new();
        for (line, row) in reader.deserialize::<LogEntry>().enumerate() {
            match row {
                Ok(entry) => entries.push(entry),
                Err(e) => debug!("Skipping unreadable log row {}: {}", line + 2, e),
            }
        }
        Ok(entries)
    }
}

/// Non-blocking [`ObservationSink`] feeding a background CSV writer
#[derive(Debug, Clone)]
pub struct CsvSink {
    sender: mpsc::Sender<Observation>,
}

impl CsvSink {
    /// Start the writer; it runs until every `CsvSink` clone is dropped
    pub fn spawn(log: CsvObservationLog, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<Observation>(capacity.max(1));

        let handle = tokio::task::spawn_blocking(move || {
            info!("📝 CSV observation log: {}", log.path().display());
            while let Some(observation) = receiver.blocking_recv() {
                if let Err(e) = log.append(&LogEntry::from(observation)) {
                    error!("❌ Failed to write observation to {}: {}", log.path().display(), e);
                }
            }
            debug!("CSV writer stopped");
        });

        (Self { sender }, handle)
    }
}

impl ObservationSink for CsvSink {
    fn record(&self, observation: Observation) {
        match self.sender.try_send(observation) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("⚠️ CSV writer backlog full, dropping observation");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!("❌ CSV writer stopped, dropping observation");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn entry(timestamp: DateTime<Utc>, power: Option<f64>) -> LogEntry {
        LogEntry {
            timestamp,
            power_w: power,
            avg_w: power,
            median_w: power,
            socket_on: true,
            auto_mode: true,
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_header_written_once() {
        let dir = TempDir::new().unwrap();
        let log = CsvObservationLog::new(dir.path().join("log.csv"));

        log.append(&entry(day(1), Some(100.0))).unwrap();
        log.append(&entry(day(2), Some(200.0))).unwrap();

        let raw = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines[0], "timestamp,power_w,avg_w,median_w,socket_on,auto_mode");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_degraded_row_has_empty_power() {
        let dir = TempDir::new().unwrap();
        let log = CsvObservationLog::new(dir.path().join("log.csv"));
        let observation = Observation::degraded(day(1), false, true);

        log.append(&LogEntry::from(observation)).unwrap();

        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert!(raw.lines().nth(1).unwrap().ends_with(",,,,false,true"));
        let entries = log.recent(10).unwrap();
        assert_eq!(entries[0].power_w, None);
    }

    #[test]
    fn test_recent_returns_tail() {
        let dir = TempDir::new().unwrap();
        let log = CsvObservationLog::new(dir.path().join("log.csv"));
        for d in 1..=5 {
            log.append(&entry(day(d), Some(f64::from(d)))).unwrap();
        }

        let entries = log.recent(2).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].timestamp, day(4));
        assert_eq!(entries[1].timestamp, day(5));

        assert_eq!(log.recent(100).unwrap().len(), 5);
    }

    #[test]
    fn test_set_path_redirects_every_clone() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        let log = CsvObservationLog::new(&first);
        let writer = log.clone();

        writer.append(&entry(day(1), Some(100.0))).unwrap();
        log.set_path(&second);
        writer.append(&entry(day(2), Some(200.0))).unwrap();

        assert_eq!(writer.path(), second);
        assert_eq!(CsvObservationLog::new(&first).recent(10).unwrap().len(), 1);
        let moved = log.recent(10).unwrap();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].power_w, Some(200.0));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let log = CsvObservationLog::new(dir.path().join("absent.csv"));
        assert!(log.recent(10).unwrap().is_empty());
        assert_eq!(log.cleanup(30, day(1)).unwrap(), 0);
    }

    #[test]
    fn test_reads_legacy_python_booleans() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.csv");
        std::fs::write(
            &path,
            "timestamp,power_w,avg_w,median_w,socket_on,auto_mode\n\
             2025-06-01T12:00:00+00:00,1500.0,1400.0,1450.0,True,False\n",
        )
        .unwrap();

        let entries = CsvObservationLog::new(&path).recent(10).unwrap();
        assert!(entries[0].socket_on);
        assert!(!entries[0].auto_mode);
    }

    #[test]
    fn test_cleanup_removes_old_rows() {
        let dir = TempDir::new().unwrap();
        let log = CsvObservationLog::new(dir.path().join("log.csv"));
        for d in 1..=10 {
            log.append(&entry(day(d), Some(100.0))).unwrap();
        }

        let removed = log.cleanup(3, day(10)).unwrap();

        assert_eq!(removed, 6);
        let remaining = log.recent(100).unwrap();
        assert_eq!(remaining.len(), 4);
        assert_eq!(remaining[0].timestamp, day(7));

        // Appending after a rewrite must not duplicate the header
        log.append(&entry(day(11), None)).unwrap();
        assert_eq!(log.recent(100).unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_sink_writes_in_background() {
        let dir = TempDir::new().unwrap();
        let log = CsvObservationLog::new(dir.path().join("log.csv"));
        let (sink, handle) = CsvSink::spawn(log.clone(), 16);

        sink.record(Observation::degraded(day(1), false, true));
        sink.record(Observation::degraded(day(2), true, false));
        drop(sink);
        handle.await.unwrap();

        let entries = log.recent(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[1].socket_on);
    }
}

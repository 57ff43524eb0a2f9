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

//! Collaborators for the SunSwitch decision core: SolarEdge power source,
//! Hue smart plug actuator and the CSV observation log

pub mod csv_log;
pub mod errors;
pub mod hue;
pub mod solaredge;

pub use csv_log::{CsvObservationLog, CsvSink, LogEntry};
pub use errors::{AdapterError, AdapterResult};
pub use hue::HueSocket;
pub use solaredge::{PowerReading, SolarEdgeClient};

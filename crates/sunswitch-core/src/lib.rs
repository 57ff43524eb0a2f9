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

//! SunSwitch decision core
//!
//! Decides once per sampling interval whether the EV charger socket should be
//! ON or OFF, from a smoothed solar power signal, a hysteresis band, dwell
//! timers and a night blackout window.

pub mod clock;
pub mod config_store;
pub mod control;
pub mod decision_loop;
pub mod dwell;
pub mod engine;
pub mod error;
pub mod mock;
pub mod night_mode;
pub mod swap;
pub mod thresholds;
pub mod traits;
pub mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config_store::ConfigStore;
pub use control::ControlHandle;
pub use decision_loop::DecisionLoop;
pub use dwell::DwellTimer;
pub use engine::{CycleOutcome, CycleResult, Decision, DecisionEngine, HoldReason};
pub use error::{SwitchError, SwitchResult};
pub use night_mode::NightModeGate;
pub use swap::Swappable;
pub use thresholds::ThresholdCalculator;
pub use traits::{ConfigProvider, NullSink, ObservationSink, PowerSource, SwitchActuator};
pub use window::RollingWindow;

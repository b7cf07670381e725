#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Real-time targeting and event-debounce core of the sentry turret
//! (hardware-agnostic).
//!
//! All hardware goes through the traits in `turret_traits`: frames come from a
//! `FrameSource`, detections from a `Detector`, servos are driven through a
//! `ServoBank` and the door and motion sensors are read from `DigitalInputs`.
//!
//! ## Architecture
//!
//! - **Latches**: self-reverting trigger windows (`latch`)
//! - **Aiming**: fixed-step dead-band servo correction (`axis`)
//! - **Fire gate**: pure firing authorization (`fire_gate`)
//! - **Alerts**: capture, retention and dispatch off the control thread
//!   (`pipeline`, `retention`)
//! - **Control loop**: `TurretController::step` and the paced `runner`
//! - **Configuration**: runtime config structs (`config`) and their mapping
//!   from the TOML schema (`conversions`)

pub mod axis;
pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod fire_gate;
pub mod fps;
pub mod hw_error;
pub mod latch;
pub mod mocks;
pub mod pipeline;
pub mod retention;
pub mod runner;
pub mod status;
pub mod util;
pub mod vision;

pub use axis::{AimReport, AxisController, AxisState, Correction, DeadBand, TargetCenter};
pub use builder::{Missing, Set, TurretBuilder};
pub use config::{
    AimCfg, AxisCfg, CaptureCfg, FireCfg, LatchCfg, PinMap, Timeouts, TurretSettings, VisionCfg,
};
pub use controller::TurretController;
pub use error::{BuildError, Result, TurretError};
pub use fire_gate::{FireInputs, fire_gate};
pub use latch::DebounceLatch;
pub use pipeline::{
    AlertDispatch, CaptureEvent, CaptureJob, CapturePipeline, PipelineMode, PipelineSnapshot,
    PipelineWorker,
};
pub use runner::{LoopStats, RunParams, RunSummary, run};
pub use status::{ControllerState, ShutdownReason, StepReport};

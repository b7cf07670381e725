//! Controller state and the per-iteration report.

use std::fmt;

use turret_traits::EventKind;

use crate::axis::{AimReport, TargetCenter};

/// Lifecycle of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Running,
    /// Servos parked and released; no further steps are accepted.
    ShuttingDown,
}

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Operator interrupt (Ctrl-C).
    Interrupt,
    /// Configured iteration cap reached.
    IterationLimit,
    /// Unrecoverable fault; the message describes it.
    Fatal(String),
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Interrupt => f.write_str("operator interrupt"),
            ShutdownReason::IterationLimit => f.write_str("iteration limit reached"),
            ShutdownReason::Fatal(msg) => write!(f, "fatal: {msg}"),
        }
    }
}

/// What happened during one `TurretController::step`.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub iteration: u64,
    /// False when the frame read timed out and the iteration was skipped.
    pub frame_acquired: bool,
    /// True when the detector ran on this iteration's frame.
    pub sampled: bool,
    pub target: Option<TargetCenter>,
    pub aim: AimReport,
    pub fire: bool,
    pub door_active: bool,
    pub motion_active: bool,
    pub person_active: bool,
    /// Latches that went active on this iteration; one capture job each.
    pub rising_edges: Vec<EventKind>,
    pub fps: Option<f32>,
}

impl StepReport {
    /// An iteration without a frame. `latches` is door, motion, person.
    pub(crate) fn skipped(iteration: u64, fps: Option<f32>, latches: [bool; 3]) -> Self {
        let [door_active, motion_active, person_active] = latches;
        Self {
            iteration,
            frame_acquired: false,
            sampled: false,
            target: None,
            aim: AimReport::idle(),
            fire: false,
            door_active,
            motion_active,
            person_active,
            rising_edges: Vec::new(),
            fps,
        }
    }
}

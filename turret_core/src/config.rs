//! Runtime configuration for the turret controller.
//!
//! These are the structs `TurretController` is built from. They are separate
//! from the TOML-deserialized schema in `turret_config`; see `conversions`.

use std::path::PathBuf;
use std::time::Duration;

/// BCM pins of the servos and sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinMap {
    pub pan: u8,
    pub tilt: u8,
    pub fire: u8,
    pub door: u8,
    pub motion: u8,
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            pan: 24,
            tilt: 23,
            fire: 25,
            door: 17,
            motion: 18,
        }
    }
}

/// Geometry of the aiming problem and the vision sampling cadence.
#[derive(Debug, Clone)]
pub struct AimCfg {
    pub frame_width: u32,
    pub frame_height: u32,
    /// Dead-band half-width on the pan axis (px).
    pub leeway_x: u32,
    /// Dead-band half-width on the tilt axis (px).
    pub leeway_y: u32,
    /// Aim point offset below the vertical centre (px); compensates projectile drop.
    pub tilt_bias_px: i32,
    /// Detector runs on every Nth iteration.
    pub sample_stride: u32,
    /// Iterations per frame-rate estimate.
    pub fps_window: u32,
}

impl Default for AimCfg {
    fn default() -> Self {
        Self {
            frame_width: 640,
            frame_height: 480,
            leeway_x: 20,
            leeway_y: 20,
            tilt_bias_px: 0,
            sample_stride: 5,
            fps_window: 10,
        }
    }
}

/// One positional aiming servo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisCfg {
    pub min_us: u16,
    pub max_us: u16,
    pub step_us: u16,
    /// Initial position, also used to park the axis on shutdown.
    pub start_us: u16,
    pub invert: bool,
}

impl Default for AxisCfg {
    fn default() -> Self {
        Self {
            min_us: 500,
            max_us: 2500,
            step_us: 10,
            start_us: 1500,
            invert: false,
        }
    }
}

/// Trigger servo and the master arm switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireCfg {
    pub enabled: bool,
    pub stop_us: u16,
    pub fire_us: u16,
}

impl Default for FireCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            stop_us: 1500,
            fire_us: 2000,
        }
    }
}

/// Hold windows of the three trigger latches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatchCfg {
    pub door_hold: Duration,
    pub motion_hold: Duration,
    pub person_hold: Duration,
}

impl Default for LatchCfg {
    fn default() -> Self {
        Self {
            door_hold: Duration::from_secs(300),
            motion_hold: Duration::from_secs(60),
            person_hold: Duration::from_secs(60),
        }
    }
}

/// Deadlines on the blocking collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Max wait for one camera frame (ms).
    pub frame_ms: u64,
    /// Frame timeouts tolerated in a row before the loop aborts.
    pub max_consecutive_frame_timeouts: u32,
    /// Detector calls slower than this are discarded (ms).
    pub vision_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            frame_ms: 500,
            max_consecutive_frame_timeouts: 3,
            vision_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisionCfg {
    pub enabled: bool,
    pub score_threshold: f32,
    pub max_results: usize,
}

impl Default for VisionCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            score_threshold: 0.5,
            max_results: 3,
        }
    }
}

/// Where captures go and how many are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureCfg {
    pub dir: PathBuf,
    pub extension: String,
    pub max_files: usize,
}

impl Default for CaptureCfg {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("captures"),
            extension: "png".into(),
            max_files: 20,
        }
    }
}

/// Every runtime setting of the controller in one place.
#[derive(Debug, Clone, Default)]
pub struct TurretSettings {
    pub pins: PinMap,
    pub aim: AimCfg,
    pub pan: AxisCfg,
    pub tilt: AxisCfg,
    pub fire: FireCfg,
    pub latches: LatchCfg,
    pub timeouts: Timeouts,
    pub vision: VisionCfg,
    pub capture: CaptureCfg,
}

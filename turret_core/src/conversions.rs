//! `From` implementations bridging `turret_config` types to `turret_core` types.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::{
    AimCfg, AxisCfg, CaptureCfg, FireCfg, LatchCfg, PinMap, Timeouts, TurretSettings, VisionCfg,
};

// ── PinMap ───────────────────────────────────────────────────────────────────

impl From<&turret_config::Pins> for PinMap {
    fn from(p: &turret_config::Pins) -> Self {
        Self {
            pan: p.pan_servo,
            tilt: p.tilt_servo,
            fire: p.fire_servo,
            door: p.door_sensor,
            motion: p.motion_sensor,
        }
    }
}

// ── AimCfg ───────────────────────────────────────────────────────────────────

/// Frame geometry lives under `[camera]`, the rest under `[aim]`.
impl From<&turret_config::Config> for AimCfg {
    fn from(c: &turret_config::Config) -> Self {
        Self {
            frame_width: c.camera.width,
            frame_height: c.camera.height,
            leeway_x: c.aim.leeway_x,
            leeway_y: c.aim.leeway_y,
            tilt_bias_px: c.aim.tilt_bias_px,
            sample_stride: c.aim.sample_stride,
            fps_window: c.aim.fps_window,
        }
    }
}

// ── Servos ───────────────────────────────────────────────────────────────────

impl From<&turret_config::AxisServo> for AxisCfg {
    fn from(a: &turret_config::AxisServo) -> Self {
        Self {
            min_us: a.min_us,
            max_us: a.max_us,
            step_us: a.step_us,
            start_us: a.start_us,
            invert: a.invert,
        }
    }
}

impl From<&turret_config::Config> for FireCfg {
    fn from(c: &turret_config::Config) -> Self {
        Self {
            enabled: c.turret.enabled,
            stop_us: c.servo.fire.stop_us,
            fire_us: c.servo.fire.fire_us,
        }
    }
}

// ── LatchCfg ─────────────────────────────────────────────────────────────────

impl From<&turret_config::Latches> for LatchCfg {
    fn from(l: &turret_config::Latches) -> Self {
        Self {
            door_hold: Duration::from_secs(l.door_hold_s),
            motion_hold: Duration::from_secs(l.motion_hold_s),
            person_hold: Duration::from_secs(l.person_hold_s),
        }
    }
}

// ── Timeouts ─────────────────────────────────────────────────────────────────

impl From<&turret_config::Config> for Timeouts {
    fn from(c: &turret_config::Config) -> Self {
        Self {
            frame_ms: c.camera.frame_timeout_ms,
            max_consecutive_frame_timeouts: c.camera.max_consecutive_timeouts,
            vision_ms: c.vision.timeout_ms,
        }
    }
}

// ── VisionCfg / CaptureCfg ───────────────────────────────────────────────────

impl From<&turret_config::Vision> for VisionCfg {
    fn from(v: &turret_config::Vision) -> Self {
        Self {
            enabled: v.enabled,
            score_threshold: v.score_threshold,
            max_results: v.max_results,
        }
    }
}

impl From<&turret_config::Capture> for CaptureCfg {
    fn from(c: &turret_config::Capture) -> Self {
        Self {
            dir: PathBuf::from(&c.dir),
            extension: c.extension.trim_start_matches('.').to_string(),
            max_files: c.max_files,
        }
    }
}

// ── TurretSettings ───────────────────────────────────────────────────────────

impl From<&turret_config::Config> for TurretSettings {
    fn from(c: &turret_config::Config) -> Self {
        Self {
            pins: PinMap::from(&c.pins),
            aim: AimCfg::from(c),
            pan: AxisCfg::from(&c.servo.pan),
            tilt: AxisCfg::from(&c.servo.tilt),
            fire: FireCfg::from(c),
            latches: LatchCfg::from(&c.latches),
            timeouts: Timeouts::from(c),
            vision: VisionCfg::from(&c.vision),
            capture: CaptureCfg::from(&c.capture),
        }
    }
}

//! Hardware and simulated backends for the turret collaborator traits.
//!
//! The simulated types are what the CLI runs without the `hardware` feature
//! and what the integration tests drive. Each one hands out a cloneable
//! handle so a test can script inputs or inspect commands while the
//! controller owns the backend itself.
pub mod camera;
pub mod capture;
pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;
pub mod util;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod v4l2;

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use turret_traits::{
    AlertSink, BoundingBox, BoxError, Detection, Detections, Detector, DigitalInputs, EventKind,
    Frame, FrameSource, ServoBank, TargetClass,
};

pub use capture::PngCaptureWriter;
use error::HwError;

/// Camera stand-in producing blank frames of a fixed size.
pub struct SimulatedCamera {
    width: u32,
    height: u32,
    frames: u64,
    fail_after: Option<u64>,
    paused: Arc<AtomicBool>,
}

impl SimulatedCamera {
    pub fn new(width: u32, height: u32) -> Self {
        SimulatedCamera {
            width,
            height,
            frames: 0,
            fail_after: None,
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Fail every read after `n` frames have been delivered.
    pub fn fail_after(mut self, n: u64) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// While set, reads block until their timeout expires.
    pub fn pause_handle(&self) -> Arc<AtomicBool> {
        self.paused.clone()
    }
}

impl FrameSource for SimulatedCamera {
    fn read_frame(&mut self, timeout: Duration) -> Result<Frame, BoxError> {
        if self.fail_after.is_some_and(|n| self.frames >= n) {
            return Err(Box::new(HwError::Camera(
                "simulated capture device disconnected".into(),
            )));
        }
        let paused = self.paused.clone();
        util::wait_until_ready_with_timeout(
            || !paused.load(Ordering::Relaxed),
            timeout,
            Duration::from_millis(1),
        )?;
        self.frames += 1;
        Ok(Frame::blank(self.width, self.height))
    }
}

/// Detector reporting one person sweeping horizontally across the frame.
///
/// The box moves `speed_px` per call and bounces off the frame edges, which
/// exercises both correction directions of the pan axis.
pub struct SimulatedDetector {
    x: i32,
    dx: i32,
    y: i32,
    box_w: i32,
    box_h: i32,
}

impl SimulatedDetector {
    pub fn new(speed_px: i32) -> Self {
        SimulatedDetector {
            x: 0,
            dx: speed_px,
            y: 0,
            box_w: 80,
            box_h: 200,
        }
    }
}

impl Detector for SimulatedDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Detections, BoxError> {
        let w = i32::try_from(frame.width()).unwrap_or(i32::MAX);
        let h = i32::try_from(frame.height()).unwrap_or(i32::MAX);
        let max_x = (w - self.box_w).max(0);
        self.y = ((h - self.box_h) / 2).max(0);

        let next = self.x + self.dx;
        if next < 0 || next > max_x {
            self.dx = -self.dx;
        }
        self.x = (self.x + self.dx).clamp(0, max_x);

        Ok(Detections::new(vec![Detection {
            class: TargetClass::Person,
            score: 0.9,
            bbox: BoundingBox {
                origin_x: self.x,
                origin_y: self.y,
                width: self.box_w,
                height: self.box_h,
            },
        }]))
    }
}

#[derive(Debug, Default)]
struct ServoRecord {
    commands: Vec<(u8, u16)>,
    released: bool,
}

/// Inspection handle for a `SimulatedServoBank`.
#[derive(Debug, Clone, Default)]
pub struct ServoLog {
    inner: Arc<Mutex<ServoRecord>>,
}

impl ServoLog {
    /// All commands in the order they were issued.
    pub fn commands(&self) -> Vec<(u8, u16)> {
        self.inner
            .lock()
            .map(|r| r.commands.clone())
            .unwrap_or_default()
    }

    /// Commands issued to `pin`, oldest first.
    pub fn commands_for(&self, pin: u8) -> Vec<u16> {
        self.commands()
            .into_iter()
            .filter(|(p, _)| *p == pin)
            .map(|(_, us)| us)
            .collect()
    }

    pub fn last(&self, pin: u8) -> Option<u16> {
        self.commands_for(pin).last().copied()
    }

    pub fn released(&self) -> bool {
        self.inner.lock().map(|r| r.released).unwrap_or(false)
    }

    pub fn clear(&self) {
        if let Ok(mut r) = self.inner.lock() {
            r.commands.clear();
        }
    }
}

/// Servo bank that records every command instead of driving pins.
#[derive(Debug, Default)]
pub struct SimulatedServoBank {
    log: ServoLog,
}

impl SimulatedServoBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> ServoLog {
        self.log.clone()
    }
}

impl ServoBank for SimulatedServoBank {
    fn set_pulse_width(&mut self, pin: u8, micros: u16) -> Result<(), BoxError> {
        tracing::trace!(pin, micros, "servo (simulated)");
        if let Ok(mut r) = self.log.inner.lock() {
            if r.released {
                return Err(Box::new(HwError::Gpio(format!(
                    "servo pin {pin} used after release"
                ))));
            }
            r.commands.push((pin, micros));
        }
        Ok(())
    }

    fn release(&mut self) -> Result<(), BoxError> {
        if let Ok(mut r) = self.log.inner.lock() {
            r.released = true;
        }
        Ok(())
    }
}

/// Scriptable digital inputs; unknown pins read low.
#[derive(Debug, Clone, Default)]
pub struct SimulatedInputs {
    levels: Arc<Mutex<HashMap<u8, bool>>>,
}

impl SimulatedInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive `pin` to `level`. Clones share the same levels.
    pub fn set(&self, pin: u8, level: bool) {
        if let Ok(mut l) = self.levels.lock() {
            l.insert(pin, level);
        }
    }
}

impl DigitalInputs for SimulatedInputs {
    fn read(&mut self, pin: u8) -> Result<bool, BoxError> {
        Ok(self
            .levels
            .lock()
            .map(|l| l.get(&pin).copied().unwrap_or(false))
            .unwrap_or(false))
    }
}

/// Alert sink that only records the alert in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn send(
        &mut self,
        kind: EventKind,
        timestamp: chrono::DateTime<chrono::Local>,
        image_path: &Path,
    ) -> Result<(), BoxError> {
        tracing::info!(
            kind = kind.as_str(),
            timestamp = %timestamp.format("%Y-%m-%d %H:%M:%S"),
            image = %image_path.display(),
            "alert"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_camera_fails_after_budget() {
        let mut cam = SimulatedCamera::new(4, 4).fail_after(2);
        assert!(cam.read_frame(Duration::from_millis(5)).is_ok());
        assert!(cam.read_frame(Duration::from_millis(5)).is_ok());
        let err = cam.read_frame(Duration::from_millis(5)).unwrap_err();
        assert!(err.to_string().contains("camera"));
    }

    #[test]
    fn paused_camera_times_out() {
        let mut cam = SimulatedCamera::new(4, 4);
        cam.pause_handle().store(true, Ordering::Relaxed);
        let err = cam.read_frame(Duration::from_millis(3)).unwrap_err();
        assert!(matches!(err.downcast_ref::<HwError>(), Some(HwError::Timeout)));
    }

    #[test]
    fn simulated_detector_stays_inside_frame() {
        let frame = Frame::blank(200, 300);
        let mut det = SimulatedDetector::new(50);
        for _ in 0..20 {
            let d = det.detect(&frame).unwrap();
            let p = d.primary(&TargetClass::Person).unwrap();
            assert!(p.bbox.origin_x >= 0);
            assert!(p.bbox.origin_x + p.bbox.width <= 200);
        }
    }

    #[test]
    fn servo_bank_records_and_rejects_after_release() {
        let mut bank = SimulatedServoBank::new();
        let log = bank.log();
        bank.set_pulse_width(24, 1500).unwrap();
        bank.set_pulse_width(25, 1000).unwrap();
        assert_eq!(log.last(24), Some(1500));
        assert_eq!(log.commands().len(), 2);
        bank.release().unwrap();
        assert!(log.released());
        assert!(bank.set_pulse_width(24, 1600).is_err());
    }

    #[test]
    fn inputs_default_low_and_scriptable() {
        let inputs = SimulatedInputs::new();
        let mut reader = inputs.clone();
        assert!(!reader.read(17).unwrap());
        inputs.set(17, true);
        assert!(reader.read(17).unwrap());
    }
}

//! Collaborator seams for the turret controller.
//!
//! Everything the control loop touches outside of its own state goes through
//! one of these traits: the camera, the vision detector, the servo bank, the
//! digital sensor inputs, the capture writer and the alert sink. Hardware and
//! simulated backends live in `turret_hardware`; tests substitute their own.
pub mod clock;
pub mod frame;

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local};

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use frame::Frame;

/// Error type used across trait boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Camera or any other producer of RGB frames.
pub trait FrameSource {
    /// Block for at most `timeout` waiting for the next frame.
    fn read_frame(&mut self, timeout: Duration) -> Result<Frame, BoxError>;
}

/// Object-detection backend.
pub trait Detector {
    fn detect(&mut self, frame: &Frame) -> Result<Detections, BoxError>;
}

/// PWM servo outputs addressed by pin.
pub trait ServoBank {
    fn set_pulse_width(&mut self, pin: u8, micros: u16) -> Result<(), BoxError>;
    /// Stop driving every output and hand the pins back to the OS.
    fn release(&mut self) -> Result<(), BoxError>;
}

/// Digital inputs (door contact, PIR motion sensor) addressed by pin.
pub trait DigitalInputs {
    fn read(&mut self, pin: u8) -> Result<bool, BoxError>;
}

/// Persists a captured frame to disk.
pub trait CaptureWriter {
    fn write(&mut self, frame: &Frame, path: &Path) -> Result<(), BoxError>;
}

/// Delivers an alert (email, push, log line) for a captured event.
pub trait AlertSink {
    fn send(
        &mut self,
        kind: EventKind,
        timestamp: DateTime<Local>,
        image_path: &Path,
    ) -> Result<(), BoxError>;
}

/// What raised a capture event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DoorOpened,
    MotionDetected,
    PersonDetected,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::DoorOpened,
        EventKind::MotionDetected,
        EventKind::PersonDetected,
    ];

    /// Stable lowercase name used in file names and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::DoorOpened => "door",
            EventKind::MotionDetected => "motion",
            EventKind::PersonDetected => "person",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Class of a detected object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetClass {
    Person,
    Other(String),
}

impl TargetClass {
    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("person") {
            TargetClass::Person
        } else {
            TargetClass::Other(label.to_string())
        }
    }
}

/// Axis-aligned box in pixel coordinates, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub origin_x: i32,
    pub origin_y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn centre_x(&self) -> i32 {
        self.origin_x + self.width / 2
    }

    pub fn centre_y(&self) -> i32 {
        self.origin_y + self.height / 2
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class: TargetClass,
    /// Confidence in [0.0, 1.0].
    pub score: f32,
    pub bbox: BoundingBox,
}

/// Detections reported for one sampled frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detections {
    items: Vec<Detection>,
}

impl Detections {
    pub fn new(items: Vec<Detection>) -> Self {
        Self { items }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.items.iter()
    }

    /// Highest-scoring detection of `class`, ties broken by larger area.
    pub fn primary(&self, class: &TargetClass) -> Option<&Detection> {
        self.items
            .iter()
            .filter(|d| &d.class == class)
            .max_by(|a, b| {
                a.score.total_cmp(&b.score).then_with(|| {
                    let area_a = i64::from(a.bbox.width) * i64::from(a.bbox.height);
                    let area_b = i64::from(b.bbox.width) * i64::from(b.bbox.height);
                    area_a.cmp(&area_b)
                })
            })
    }
}

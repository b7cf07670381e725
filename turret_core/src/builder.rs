//! Type-state builder for `TurretController`.
//!
//! The builder enforces at compile time that the camera, the servo bank and
//! the sensor inputs are provided before `build()` is available. `try_build()`
//! is always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use turret_traits::clock::{Clock, MonotonicClock};
use turret_traits::{
    AlertSink, CaptureWriter, Detections, Detector, DigitalInputs, FrameSource, ServoBank,
};

use crate::axis::AxisController;
use crate::config::*;
use crate::controller::TurretController;
use crate::error::{BuildError, Result};
use crate::fps::FrameRateEstimator;
use crate::latch::DebounceLatch;
use crate::mocks::NoDetector;
use crate::pipeline::{AlertDispatch, CapturePipeline, PipelineMode};
use crate::status::ControllerState;
use crate::vision::VisionWorker;

impl TurretController {
    /// Start building a controller.
    pub fn builder() -> TurretBuilder<Missing, Missing, Missing> {
        TurretBuilder::default()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

type AlertParts = (Box<dyn CaptureWriter + Send>, Box<dyn AlertSink + Send>);

/// Builder for `TurretController`. All settings are validated on `build()`.
pub struct TurretBuilder<C, S, I> {
    camera: Option<Box<dyn FrameSource>>,
    servos: Option<Box<dyn ServoBank>>,
    inputs: Option<Box<dyn DigitalInputs>>,
    detector: Option<Box<dyn Detector + Send>>,
    alerts: Option<AlertParts>,
    pipeline_mode: PipelineMode,
    settings: TurretSettings,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _c: PhantomData<C>,
    _s: PhantomData<S>,
    _i: PhantomData<I>,
}

impl Default for TurretBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            camera: None,
            servos: None,
            inputs: None,
            detector: None,
            alerts: None,
            pipeline_mode: PipelineMode::default(),
            settings: TurretSettings::default(),
            clock: None,
            _c: PhantomData,
            _s: PhantomData,
            _i: PhantomData,
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate_axis(a: &AxisCfg) -> Result<()> {
    if a.min_us >= a.max_us {
        return Err(invalid("axis min_us must be < max_us"));
    }
    if a.step_us == 0 {
        return Err(invalid("axis step_us must be >= 1"));
    }
    if !(a.min_us..=a.max_us).contains(&a.start_us) {
        return Err(invalid("axis start_us must be within [min_us, max_us]"));
    }
    Ok(())
}

fn validate(s: &TurretSettings) -> Result<()> {
    if s.aim.frame_width == 0 || s.aim.frame_height == 0 {
        return Err(invalid("frame dimensions must be > 0"));
    }
    if s.aim.sample_stride == 0 {
        return Err(invalid("sample_stride must be >= 1"));
    }
    if s.aim.fps_window == 0 {
        return Err(invalid("fps_window must be >= 1"));
    }
    validate_axis(&s.pan)?;
    validate_axis(&s.tilt)?;
    if s.timeouts.frame_ms == 0 {
        return Err(invalid("frame timeout must be >= 1 ms"));
    }
    if s.timeouts.vision_ms == 0 {
        return Err(invalid("vision timeout must be >= 1 ms"));
    }
    if !(0.0..=1.0).contains(&s.vision.score_threshold) {
        return Err(invalid("score_threshold must be in [0.0, 1.0]"));
    }
    if s.capture.max_files == 0 {
        return Err(invalid("capture max_files must be >= 1"));
    }
    let p = &s.pins;
    let pins = [p.pan, p.tilt, p.fire, p.door, p.motion];
    if pins.iter().enumerate().any(|(i, a)| pins[i + 1..].contains(a)) {
        return Err(invalid("pin assigned more than once"));
    }
    Ok(())
}

impl<C, S, I> TurretBuilder<C, S, I> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<TurretController> {
        let camera = self
            .camera
            .ok_or_else(|| eyre::Report::new(BuildError::MissingCamera))?;
        let servos = self
            .servos
            .ok_or_else(|| eyre::Report::new(BuildError::MissingServos))?;
        let inputs = self
            .inputs
            .ok_or_else(|| eyre::Report::new(BuildError::MissingInputs))?;

        let s = self.settings;
        validate(&s)?;

        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(b) => Arc::from(b),
            None => Arc::new(MonotonicClock::new()),
        };

        let alerts = match self.alerts {
            Some((writer, sink)) => AlertDispatch::new(
                CapturePipeline::new(writer, sink, s.capture.clone()),
                self.pipeline_mode,
            )?,
            None => AlertDispatch::Disabled,
        };

        let vision_worker =
            VisionWorker::spawn(self.detector.unwrap_or_else(|| Box::new(NoDetector)))?;

        Ok(TurretController {
            camera,
            vision_worker,
            servos,
            inputs,
            alerts,
            pins: s.pins,
            axes: AxisController::new(&s.aim, &s.pan, &s.tilt),
            pan_park_us: s.pan.start_us,
            tilt_park_us: s.tilt.start_us,
            fire: s.fire,
            vision: s.vision,
            timeouts: s.timeouts,
            sample_stride: s.aim.sample_stride,
            door: DebounceLatch::new(s.latches.door_hold),
            motion: DebounceLatch::new(s.latches.motion_hold),
            person: DebounceLatch::new(s.latches.person_hold),
            detections: Detections::empty(),
            iteration: 0,
            consecutive_timeouts: 0,
            fps: FrameRateEstimator::new(s.aim.fps_window, clock.now()),
            clock,
            state: ControllerState::Running,
            started: false,
        })
    }
}

/// Chainable setters that do not affect type-state.
impl<C, S, I> TurretBuilder<C, S, I> {
    /// The detector runs on its own thread so a slow call can be abandoned at the vision deadline.
    pub fn with_detector(mut self, detector: impl Detector + Send + 'static) -> Self {
        self.detector = Some(Box::new(detector));
        self
    }
    /// Enable capture and alerting. Without this, latch edges are only logged.
    pub fn with_alerts(
        mut self,
        writer: impl CaptureWriter + Send + 'static,
        sink: impl AlertSink + Send + 'static,
    ) -> Self {
        self.alerts = Some((Box::new(writer), Box::new(sink)));
        self
    }
    pub fn with_pipeline_mode(mut self, mode: PipelineMode) -> Self {
        self.pipeline_mode = mode;
        self
    }
    /// Replace every setting at once.
    pub fn with_settings(mut self, settings: TurretSettings) -> Self {
        self.settings = settings;
        self
    }
    pub fn with_aim(mut self, aim: AimCfg) -> Self {
        self.settings.aim = aim;
        self
    }
    pub fn with_pan(mut self, pan: AxisCfg) -> Self {
        self.settings.pan = pan;
        self
    }
    pub fn with_tilt(mut self, tilt: AxisCfg) -> Self {
        self.settings.tilt = tilt;
        self
    }
    pub fn with_fire(mut self, fire: FireCfg) -> Self {
        self.settings.fire = fire;
        self
    }
    pub fn with_latches(mut self, latches: LatchCfg) -> Self {
        self.settings.latches = latches;
        self
    }
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.settings.timeouts = timeouts;
        self
    }
    pub fn with_vision(mut self, vision: VisionCfg) -> Self {
        self.settings.vision = vision;
        self
    }
    pub fn with_capture(mut self, capture: CaptureCfg) -> Self {
        self.settings.capture = capture;
        self
    }
    pub fn with_pins(mut self, pins: PinMap) -> Self {
        self.settings.pins = pins;
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<S, I> TurretBuilder<Missing, S, I> {
    pub fn with_camera(self, camera: impl FrameSource + 'static) -> TurretBuilder<Set, S, I> {
        TurretBuilder {
            camera: Some(Box::new(camera)),
            servos: self.servos,
            inputs: self.inputs,
            detector: self.detector,
            alerts: self.alerts,
            pipeline_mode: self.pipeline_mode,
            settings: self.settings,
            clock: self.clock,
            _c: PhantomData,
            _s: PhantomData,
            _i: PhantomData,
        }
    }
}

impl<C, I> TurretBuilder<C, Missing, I> {
    pub fn with_servos(self, servos: impl ServoBank + 'static) -> TurretBuilder<C, Set, I> {
        TurretBuilder {
            camera: self.camera,
            servos: Some(Box::new(servos)),
            inputs: self.inputs,
            detector: self.detector,
            alerts: self.alerts,
            pipeline_mode: self.pipeline_mode,
            settings: self.settings,
            clock: self.clock,
            _c: PhantomData,
            _s: PhantomData,
            _i: PhantomData,
        }
    }
}

impl<C, S> TurretBuilder<C, S, Missing> {
    pub fn with_inputs(self, inputs: impl DigitalInputs + 'static) -> TurretBuilder<C, S, Set> {
        TurretBuilder {
            camera: self.camera,
            servos: self.servos,
            inputs: Some(Box::new(inputs)),
            detector: self.detector,
            alerts: self.alerts,
            pipeline_mode: self.pipeline_mode,
            settings: self.settings,
            clock: self.clock,
            _c: PhantomData,
            _s: PhantomData,
            _i: PhantomData,
        }
    }
}

impl TurretBuilder<Set, Set, Set> {
    /// Validate and build. Only available when camera, servos and inputs are set.
    pub fn build(self) -> Result<TurretController> {
        self.try_build()
    }
}

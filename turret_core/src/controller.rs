//! The per-iteration control loop body.
//!
//! `TurretController` owns every collaborator and all loop state. One call to
//! `step` acquires a frame, samples the detector on its stride, updates the
//! trigger latches, nudges the aiming servos and commands the fire servo.
//! Any fatal fault parks the servos before the error is returned.

use std::sync::Arc;
use std::time::{Duration, Instant};

use turret_traits::clock::Clock;
use turret_traits::{
    DigitalInputs, Detections, EventKind, Frame, FrameSource, ServoBank, TargetClass,
};

use crate::axis::{AxisController, TargetCenter};
use crate::config::{FireCfg, PinMap, Timeouts, VisionCfg};
use crate::error::{Report, Result, TurretError};
use crate::fire_gate::{FireInputs, fire_gate};
use crate::fps::FrameRateEstimator;
use crate::hw_error::map_hw_error;
use crate::latch::DebounceLatch;
use crate::pipeline::{AlertDispatch, CaptureJob, PipelineSnapshot};
use crate::status::{ControllerState, ShutdownReason, StepReport};
use crate::vision::{Sample, VisionWorker};

pub struct TurretController {
    pub(crate) camera: Box<dyn FrameSource>,
    pub(crate) vision_worker: VisionWorker,
    pub(crate) servos: Box<dyn ServoBank>,
    pub(crate) inputs: Box<dyn DigitalInputs>,
    pub(crate) alerts: AlertDispatch,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) pins: PinMap,
    pub(crate) axes: AxisController,
    pub(crate) pan_park_us: u16,
    pub(crate) tilt_park_us: u16,
    pub(crate) fire: FireCfg,
    pub(crate) vision: VisionCfg,
    pub(crate) timeouts: Timeouts,
    pub(crate) sample_stride: u32,
    pub(crate) door: DebounceLatch,
    pub(crate) motion: DebounceLatch,
    pub(crate) person: DebounceLatch,
    pub(crate) detections: Detections,
    pub(crate) iteration: u64,
    pub(crate) consecutive_timeouts: u32,
    pub(crate) fps: FrameRateEstimator,
    pub(crate) state: ControllerState,
    pub(crate) started: bool,
}

impl core::fmt::Debug for TurretController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TurretController")
            .field("state", &self.state)
            .field("iteration", &self.iteration)
            .field("pan_us", &self.axes.pan().pulse_us())
            .field("tilt_us", &self.axes.tilt().pulse_us())
            .field("turret_enabled", &self.fire.enabled)
            .finish_non_exhaustive()
    }
}

impl TurretController {
    /// Command the start positions and make sure the trigger is stopped.
    pub fn begin(&mut self) -> Result<()> {
        if self.state != ControllerState::Running {
            return Err(Report::new(TurretError::State(
                "controller has been shut down".into(),
            )));
        }
        let commands = [
            (self.pins.pan, self.axes.pan().pulse_us()),
            (self.pins.tilt, self.axes.tilt().pulse_us()),
            (self.pins.fire, self.fire.stop_us),
        ];
        for (pin, us) in commands {
            if let Err(e) = self.drive(pin, us) {
                return Err(self.fail(e));
            }
        }
        self.fps = FrameRateEstimator::new(self.fps_window(), self.clock.now());
        self.started = true;
        tracing::info!(
            pan_us = self.axes.pan().pulse_us(),
            tilt_us = self.axes.tilt().pulse_us(),
            armed = self.fire.enabled,
            stride = self.sample_stride,
            "turret start"
        );
        Ok(())
    }

    /// One iteration of the control loop.
    pub fn step(&mut self) -> Result<StepReport> {
        if self.state != ControllerState::Running {
            return Err(Report::new(TurretError::State(
                "controller has been shut down".into(),
            )));
        }
        if !self.started {
            self.begin()?;
        }
        let now = self.clock.now();
        let iteration = self.iteration;
        self.iteration += 1;

        // 1. Frame
        let frame = match self
            .camera
            .read_frame(Duration::from_millis(self.timeouts.frame_ms))
        {
            Ok(f) => {
                self.consecutive_timeouts = 0;
                f
            }
            Err(e) => return self.frame_failed(iteration, now, map_hw_error(&*e)),
        };

        // 2. Vision, on stride
        let sampled =
            self.vision.enabled && iteration % u64::from(self.sample_stride.max(1)) == 0;
        if sampled {
            self.detections = self.sample(&frame);
        }
        let target = self
            .detections
            .primary(&TargetClass::Person)
            .map(|d| TargetCenter::from_bbox(&d.bbox));

        // 3. Triggers and latches
        let door_high = self.read_input(self.pins.door, "door");
        let motion_high = self.read_input(self.pins.motion, "motion");
        let mut rising_edges = Vec::new();
        for (kind, asserted) in [
            (EventKind::DoorOpened, door_high),
            (EventKind::MotionDetected, motion_high),
            (EventKind::PersonDetected, target.is_some()),
        ] {
            if !asserted {
                continue;
            }
            let latch = self.latch_mut(kind);
            let hold = latch.hold();
            if latch.trigger(now) {
                tracing::info!(kind = kind.as_str(), hold_s = hold.as_secs(), "trigger latched");
                rising_edges.push(kind);
                self.alerts.submit(CaptureJob {
                    kind,
                    timestamp: self.clock.wall(),
                    frame: frame.clone(),
                });
            }
        }
        let door_active = self.door.evaluate(now);
        let motion_active = self.motion.evaluate(now);
        let person_active = self.person.evaluate(now);

        // 4. Aim
        let aim = self.axes.update(target);
        for (pin, cmd) in [
            (self.pins.pan, aim.pan_command),
            (self.pins.tilt, aim.tilt_command),
        ] {
            if let Some(us) = cmd
                && let Err(e) = self.drive(pin, us)
            {
                return Err(self.fail(e));
            }
        }

        // 5. Fire
        let fire = fire_gate(&FireInputs {
            turret_enabled: self.fire.enabled,
            x_in_range: aim.x_in_range,
            y_in_range: aim.y_in_range,
            door_active,
            motion_active,
            person_active,
        });
        let fire_us = if fire {
            self.fire.fire_us
        } else {
            self.fire.stop_us
        };
        if let Err(e) = self.drive(self.pins.fire, fire_us) {
            return Err(self.fail(e));
        }
        if fire {
            tracing::debug!(iteration, "firing");
        }

        // 6. Frame rate
        self.fps.tick(self.clock.now());
        let fps = self.fps.fps();

        tracing::trace!(
            iteration,
            sampled,
            x_in_range = aim.x_in_range,
            y_in_range = aim.y_in_range,
            pan_us = self.axes.pan().pulse_us(),
            tilt_us = self.axes.tilt().pulse_us(),
            fire,
            "step"
        );

        Ok(StepReport {
            iteration,
            frame_acquired: true,
            sampled,
            target,
            aim,
            fire,
            door_active,
            motion_active,
            person_active,
            rising_edges,
            fps,
        })
    }

    /// Park the servos, release them and flush the alert pipeline.
    /// Calling it again after the first time does nothing.
    pub fn shutdown(&mut self, reason: &ShutdownReason) {
        if self.state == ControllerState::ShuttingDown {
            return;
        }
        self.state = ControllerState::ShuttingDown;
        self.safe_stop();
        self.alerts.close();
        match reason {
            ShutdownReason::Fatal(_) => tracing::error!(%reason, "turret shutdown"),
            _ => tracing::info!(%reason, "turret shutdown"),
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn pan_us(&self) -> u16 {
        self.axes.pan().pulse_us()
    }

    pub fn tilt_us(&self) -> u16 {
        self.axes.tilt().pulse_us()
    }

    pub fn fps(&self) -> Option<f32> {
        self.fps.fps()
    }

    pub fn clock(&self) -> Arc<dyn Clock + Send + Sync> {
        self.clock.clone()
    }

    pub fn alert_stats(&self) -> PipelineSnapshot {
        self.alerts.snapshot()
    }

    /// Detections the current iteration is working from.
    pub fn detections(&self) -> &Detections {
        &self.detections
    }

    fn fps_window(&self) -> u32 {
        self.fps.window()
    }

    fn latch_mut(&mut self, kind: EventKind) -> &mut DebounceLatch {
        match kind {
            EventKind::DoorOpened => &mut self.door,
            EventKind::MotionDetected => &mut self.motion,
            EventKind::PersonDetected => &mut self.person,
        }
    }

    fn drive(&mut self, pin: u8, us: u16) -> std::result::Result<(), TurretError> {
        self.servos
            .set_pulse_width(pin, us)
            .map_err(|e| map_hw_error(&*e))
    }

    fn read_input(&mut self, pin: u8, name: &'static str) -> bool {
        match self.inputs.read(pin) {
            Ok(level) => level,
            Err(e) => {
                tracing::warn!(sensor = name, pin, error = %e, "input read failed; treating as low");
                false
            }
        }
    }

    /// Run the detector, keeping only confident detections, best first.
    fn sample(&mut self, frame: &Frame) -> Detections {
        let limit = Duration::from_millis(self.timeouts.vision_ms);
        let started = self.clock.now();
        let result = match self.vision_worker.detect(frame.clone(), limit) {
            Sample::Done(r) => r,
            Sample::Late => {
                tracing::warn!(
                    limit_ms = self.timeouts.vision_ms,
                    "detector missed its deadline; sample dropped"
                );
                return Detections::empty();
            }
            Sample::Busy => {
                tracing::debug!("detector still busy with a late sample; sample skipped");
                return Detections::empty();
            }
            Sample::Gone => {
                tracing::error!("detector thread exited; no detections");
                return Detections::empty();
            }
        };
        // Also judged on the controller clock, which may not be wall time.
        let elapsed = self.clock.now().saturating_duration_since(started);
        match result {
            Ok(_) if elapsed > limit => {
                tracing::warn!(
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    limit_ms = self.timeouts.vision_ms,
                    "detector too slow; detections discarded"
                );
                Detections::empty()
            }
            Ok(d) => {
                let mut kept: Vec<_> = d
                    .iter()
                    .filter(|det| det.score >= self.vision.score_threshold)
                    .cloned()
                    .collect();
                kept.sort_by(|a, b| b.score.total_cmp(&a.score));
                kept.truncate(self.vision.max_results);
                Detections::new(kept)
            }
            Err(e) => {
                tracing::warn!(error = %e, "detector failed; no detections this sample");
                Detections::empty()
            }
        }
    }

    /// Latches still expire on a skipped iteration, but new triggers wait for a
    /// frame to capture.
    fn frame_failed(&mut self, iteration: u64, now: Instant, err: TurretError) -> Result<StepReport> {
        if err != TurretError::FrameTimeout {
            return Err(self.fail(err));
        }
        self.consecutive_timeouts += 1;
        if self.consecutive_timeouts > self.timeouts.max_consecutive_frame_timeouts {
            tracing::error!(count = self.consecutive_timeouts, "camera stopped delivering frames");
            return Err(self.fail(err));
        }
        tracing::warn!(
            iteration,
            count = self.consecutive_timeouts,
            "frame timeout; iteration skipped"
        );
        // No fresh frame means no aim confirmation.
        if let Err(e) = self.drive(self.pins.fire, self.fire.stop_us) {
            return Err(self.fail(e));
        }
        Ok(StepReport::skipped(
            iteration,
            self.fps.fps(),
            [
                self.door.evaluate(now),
                self.motion.evaluate(now),
                self.person.evaluate(now),
            ],
        ))
    }

    /// Safe-stop on a fatal fault and hand the error back for propagation.
    fn fail(&mut self, err: TurretError) -> Report {
        self.shutdown(&ShutdownReason::Fatal(err.to_string()));
        Report::new(err)
    }

    /// Best effort: every command is attempted even if an earlier one fails.
    fn safe_stop(&mut self) {
        for (pin, us, what) in [
            (self.pins.fire, self.fire.stop_us, "fire"),
            (self.pins.pan, self.pan_park_us, "pan"),
            (self.pins.tilt, self.tilt_park_us, "tilt"),
        ] {
            if let Err(e) = self.drive(pin, us) {
                tracing::warn!(servo = what, error = %e, "park command failed");
            }
        }
        if let Err(e) = self.servos.release() {
            tracing::warn!(error = %e, "servo release failed");
        }
    }
}

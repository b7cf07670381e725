//! Bang-bang servo aiming.
//!
//! Each axis compares the target centre against a dead-band around its aim
//! point. Outside the band the servo moves by one fixed step toward the
//! target; inside it holds. There is no proportional term: a target far off
//! centre takes more iterations to reach, never a larger step.

use crate::config::{AimCfg, AxisCfg};

/// Inclusive pixel interval in which an axis is considered on target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadBand {
    pub low: i32,
    pub high: i32,
}

impl DeadBand {
    /// Pixels strictly closer than `half_width` to `centre`.
    pub fn centred(centre: i32, half_width: u32) -> Self {
        let hw = i32::try_from(half_width).unwrap_or(i32::MAX);
        Self {
            low: centre.saturating_sub(hw).saturating_add(1),
            high: centre.saturating_add(hw).saturating_sub(1),
        }
    }

    /// Pan and tilt bands for a frame. The tilt aim point sits `tilt_bias`
    /// pixels below the vertical centre.
    pub fn for_frame(
        frame_w: u32,
        frame_h: u32,
        leeway_x: u32,
        leeway_y: u32,
        tilt_bias: i32,
    ) -> (DeadBand, DeadBand) {
        let cx = i32::try_from(frame_w / 2).unwrap_or(i32::MAX);
        let cy = i32::try_from(frame_h / 2).unwrap_or(i32::MAX);
        (
            DeadBand::centred(cx, leeway_x),
            DeadBand::centred(cy.saturating_add(tilt_bias), leeway_y),
        )
    }

    pub fn contains(&self, px: i32) -> bool {
        (self.low..=self.high).contains(&px)
    }
}

/// Direction of a single correction, in pulse-width terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    Hold,
    Increase,
    Decrease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisDecision {
    pub correction: Correction,
    pub pulse_us: u16,
}

impl AxisDecision {
    pub fn in_range(&self) -> bool {
        self.correction == Correction::Hold
    }
}

/// Commanded position of one positional servo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisState {
    pulse_us: u16,
    step_us: u16,
    min_us: u16,
    max_us: u16,
    invert: bool,
}

impl AxisState {
    pub fn new(cfg: &AxisCfg) -> Self {
        let (min_us, max_us) = if cfg.min_us <= cfg.max_us {
            (cfg.min_us, cfg.max_us)
        } else {
            (cfg.max_us, cfg.min_us)
        };
        Self {
            pulse_us: cfg.start_us.clamp(min_us, max_us),
            step_us: cfg.step_us,
            min_us,
            max_us,
            invert: cfg.invert,
        }
    }

    pub fn pulse_us(&self) -> u16 {
        self.pulse_us
    }

    pub fn bounds(&self) -> (u16, u16) {
        (self.min_us, self.max_us)
    }

    /// Which way the servo should move for a target at `target` px.
    ///
    /// A target below the band (left of it, or above it on screen) needs a
    /// larger pulse on a normally mounted servo.
    pub fn decide(&self, target: i32, band: &DeadBand) -> Correction {
        let raw = if target < band.low {
            Correction::Increase
        } else if target > band.high {
            Correction::Decrease
        } else {
            Correction::Hold
        };
        match (raw, self.invert) {
            (Correction::Increase, true) => Correction::Decrease,
            (Correction::Decrease, true) => Correction::Increase,
            (c, _) => c,
        }
    }

    /// Move one step in the given direction, clamped to the servo bounds.
    pub fn apply(&mut self, correction: Correction) -> u16 {
        let next = match correction {
            Correction::Hold => self.pulse_us,
            Correction::Increase => self.pulse_us.saturating_add(self.step_us),
            Correction::Decrease => self.pulse_us.saturating_sub(self.step_us),
        };
        self.pulse_us = next.clamp(self.min_us, self.max_us);
        self.pulse_us
    }

    pub fn correct(&mut self, target: i32, band: &DeadBand) -> AxisDecision {
        let correction = self.decide(target, band);
        let pulse_us = self.apply(correction);
        AxisDecision {
            correction,
            pulse_us,
        }
    }
}

/// Centre of the tracked target in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetCenter {
    pub x: i32,
    pub y: i32,
    pub width: i32,
}

impl TargetCenter {
    pub fn from_bbox(b: &turret_traits::BoundingBox) -> Self {
        Self {
            x: b.centre_x(),
            y: b.centre_y(),
            width: b.width,
        }
    }
}

/// Outcome of one aiming update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AimReport {
    pub x_in_range: bool,
    pub y_in_range: bool,
    pub pan: Correction,
    pub tilt: Correction,
    /// Pulse to send to the pan servo, present only when it moved.
    pub pan_command: Option<u16>,
    pub tilt_command: Option<u16>,
}

impl AimReport {
    /// Nothing to track: both axes hold and neither is in range.
    pub fn idle() -> Self {
        Self {
            x_in_range: false,
            y_in_range: false,
            pan: Correction::Hold,
            tilt: Correction::Hold,
            pan_command: None,
            tilt_command: None,
        }
    }

    pub fn on_target(&self) -> bool {
        self.x_in_range && self.y_in_range
    }
}

/// Pan and tilt axes with their precomputed dead-bands.
#[derive(Debug, Clone)]
pub struct AxisController {
    pan: AxisState,
    tilt: AxisState,
    pan_band: DeadBand,
    tilt_band: DeadBand,
}

impl AxisController {
    pub fn new(aim: &AimCfg, pan: &AxisCfg, tilt: &AxisCfg) -> Self {
        let (pan_band, tilt_band) = DeadBand::for_frame(
            aim.frame_width,
            aim.frame_height,
            aim.leeway_x,
            aim.leeway_y,
            aim.tilt_bias_px,
        );
        Self {
            pan: AxisState::new(pan),
            tilt: AxisState::new(tilt),
            pan_band,
            tilt_band,
        }
    }

    /// Step both axes toward `target`. Without a target nothing moves and
    /// neither axis counts as in range.
    pub fn update(&mut self, target: Option<TargetCenter>) -> AimReport {
        let Some(t) = target else {
            return AimReport::idle();
        };
        let pan = self.pan.correct(t.x, &self.pan_band);
        let tilt = self.tilt.correct(t.y, &self.tilt_band);
        AimReport {
            x_in_range: pan.in_range(),
            y_in_range: tilt.in_range(),
            pan: pan.correction,
            tilt: tilt.correction,
            pan_command: (!pan.in_range()).then_some(pan.pulse_us),
            tilt_command: (!tilt.in_range()).then_some(tilt.pulse_us),
        }
    }

    pub fn pan(&self) -> &AxisState {
        &self.pan
    }

    pub fn tilt(&self) -> &AxisState {
        &self.tilt
    }

    pub fn pan_band(&self) -> DeadBand {
        self.pan_band
    }

    pub fn tilt_band(&self) -> DeadBand {
        self.tilt_band
    }
}

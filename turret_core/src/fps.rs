//! Rolling frame-rate estimate, recomputed once per window of iterations.

use std::time::Instant;

#[derive(Debug, Clone)]
pub struct FrameRateEstimator {
    window: u32,
    count: u32,
    window_start: Instant,
    fps: Option<f32>,
}

impl FrameRateEstimator {
    pub fn new(window: u32, start: Instant) -> Self {
        Self {
            window: window.max(1),
            count: 0,
            window_start: start,
            fps: None,
        }
    }

    /// Count one iteration. Returns the new estimate when a window closes.
    pub fn tick(&mut self, now: Instant) -> Option<f32> {
        self.count += 1;
        if self.count < self.window {
            return None;
        }
        let elapsed = now.saturating_duration_since(self.window_start).as_secs_f32();
        if elapsed > 0.0 {
            #[allow(clippy::cast_precision_loss)]
            let fps = self.count as f32 / elapsed;
            self.fps = Some(fps);
        }
        self.count = 0;
        self.window_start = now;
        self.fps
    }

    pub fn window(&self) -> u32 {
        self.window
    }

    /// Last completed estimate.
    pub fn fps(&self) -> Option<f32> {
        self.fps
    }
}

//! Paced driver around `TurretController::step`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::controller::TurretController;
use crate::error::Result;
use crate::pipeline::PipelineSnapshot;
use crate::status::{ShutdownReason, StepReport};

/// How long and how fast to run.
#[derive(Debug, Clone)]
pub struct RunParams {
    pub target_fps: u32,
    /// Stop after this many iterations; `None` runs until interrupted.
    pub max_iterations: Option<u64>,
    /// Set by the interrupt handler; checked between iterations only.
    pub shutdown: Arc<AtomicBool>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            target_fps: 30,
            max_iterations: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Loop timing and event counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoopStats {
    pub iterations: u64,
    pub skipped_frames: u64,
    pub missed_deadlines: u64,
    pub worst_latency: Duration,
    pub fire_iterations: u64,
    pub rising_edges: u64,
    pub last_fps: Option<f32>,
}

impl LoopStats {
    fn record(&mut self, report: &StepReport, latency: Duration) {
        self.iterations += 1;
        if !report.frame_acquired {
            self.skipped_frames += 1;
        }
        if report.fire {
            self.fire_iterations += 1;
        }
        self.rising_edges += report.rising_edges.len() as u64;
        if report.fps.is_some() {
            self.last_fps = report.fps;
        }
        self.worst_latency = self.worst_latency.max(latency);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub reason: ShutdownReason,
    pub stats: LoopStats,
    pub alerts: PipelineSnapshot,
}

/// Run the controller until interrupted, capped, or a fatal fault.
///
/// The controller is always shut down on return. On a fatal fault it has
/// already parked itself and the error is returned.
pub fn run(ctrl: &mut TurretController, params: &RunParams) -> Result<RunSummary> {
    let clock = ctrl.clock();
    let period = Duration::from_micros(crate::util::period_us(params.target_fps));
    ctrl.begin()?;
    tracing::info!(
        period_us = u64::try_from(period.as_micros()).unwrap_or(u64::MAX),
        max_iterations = ?params.max_iterations,
        "run start"
    );

    let mut stats = LoopStats::default();
    let reason = loop {
        if params.shutdown.load(Ordering::Relaxed) {
            break ShutdownReason::Interrupt;
        }
        if params
            .max_iterations
            .is_some_and(|max| stats.iterations >= max)
        {
            break ShutdownReason::IterationLimit;
        }

        let started = clock.now();
        let report = match ctrl.step() {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, iterations = stats.iterations, "run aborted");
                return Err(e);
            }
        };
        let latency = clock.now().saturating_duration_since(started);
        stats.record(&report, latency);

        if latency > period {
            stats.missed_deadlines += 1;
            tracing::debug!(
                iteration = report.iteration,
                latency_us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX),
                "loop deadline missed"
            );
        } else {
            clock.sleep(period - latency);
        }
    };

    ctrl.shutdown(&reason);
    let summary = RunSummary {
        reason,
        stats,
        alerts: ctrl.alert_stats(),
    };
    tracing::info!(
        iterations = summary.stats.iterations,
        skipped = summary.stats.skipped_frames,
        missed = summary.stats.missed_deadlines,
        alerts = summary.alerts.dispatched,
        "run complete"
    );
    Ok(summary)
}

//! Capture-and-alert pipeline.
//!
//! A latch rising edge becomes a `CaptureJob`. Processing a job writes the
//! frame to the capture directory, trims the directory to its retention cap
//! and hands the saved path to the alert sink. Failures are logged and
//! counted; they never reach the control loop.
//!
//! `PipelineWorker` runs jobs on a dedicated thread fed by an unbounded
//! channel so disk and network latency stay off the control path. The
//! worker drains every queued job before it exits.
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local};
use crossbeam_channel as xch;
use turret_traits::{AlertSink, CaptureWriter, EventKind, Frame};

use crate::config::CaptureCfg;
use crate::error::{Result, TurretError};
use crate::retention;
use crate::util::file_stamp;

/// Work item submitted on a latch rising edge.
#[derive(Debug, Clone)]
pub struct CaptureJob {
    pub kind: EventKind,
    pub timestamp: DateTime<Local>,
    pub frame: Frame,
}

/// A capture that was written and handed to the alert sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureEvent {
    pub kind: EventKind,
    pub timestamp: DateTime<Local>,
    pub image_path: PathBuf,
}

#[derive(Debug, Default)]
pub struct PipelineStats {
    submitted: AtomicU64,
    dispatched: AtomicU64,
    capture_failures: AtomicU64,
    dispatch_failures: AtomicU64,
}

/// Point-in-time copy of `PipelineStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSnapshot {
    pub submitted: u64,
    pub dispatched: u64,
    pub capture_failures: u64,
    pub dispatch_failures: u64,
}

impl PipelineStats {
    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            capture_failures: self.capture_failures.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
        }
    }
}

/// Synchronous job processor.
pub struct CapturePipeline {
    writer: Box<dyn CaptureWriter + Send>,
    sink: Box<dyn AlertSink + Send>,
    cfg: CaptureCfg,
    stats: Arc<PipelineStats>,
}

impl CapturePipeline {
    pub fn new(
        writer: Box<dyn CaptureWriter + Send>,
        sink: Box<dyn AlertSink + Send>,
        cfg: CaptureCfg,
    ) -> Self {
        Self {
            writer,
            sink,
            cfg,
            stats: Arc::new(PipelineStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<PipelineStats> {
        self.stats.clone()
    }

    /// `<dir>/<kind>_<YYYY-mm-dd-HHMMSS>.<ext>`, with `_N` appended when a
    /// capture of the same kind already exists for that second.
    pub fn capture_path(&self, kind: EventKind, timestamp: &DateTime<Local>) -> PathBuf {
        let stem = format!("{}_{}", kind.as_str(), file_stamp(timestamp));
        let ext = self.cfg.extension.trim_start_matches('.');
        let mut path = self.cfg.dir.join(format!("{stem}.{ext}"));
        let mut n = 1u32;
        while path.exists() {
            path = self.cfg.dir.join(format!("{stem}_{n}.{ext}"));
            n += 1;
        }
        path
    }

    /// Write, evict, dispatch. The capture is written before eviction so the
    /// directory never holds more than `max_files` captures afterwards.
    pub fn process(&mut self, job: &CaptureJob) -> Result<CaptureEvent> {
        std::fs::create_dir_all(&self.cfg.dir)
            .map_err(|e| TurretError::Capture(format!("create {:?}: {e}", self.cfg.dir)))?;
        let path = self.capture_path(job.kind, &job.timestamp);
        self.writer
            .write(&job.frame, &path)
            .map_err(|e| TurretError::Capture(format!("{}: {e}", path.display())))?;

        match retention::evict_oldest(&self.cfg.dir, &self.cfg.extension, self.cfg.max_files) {
            Ok(removed) if !removed.is_empty() => {
                tracing::debug!(count = removed.len(), "old captures removed");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "capture retention failed"),
        }

        self.sink
            .send(job.kind, job.timestamp, &path)
            .map_err(|e| TurretError::Dispatch(e.to_string()))?;

        Ok(CaptureEvent {
            kind: job.kind,
            timestamp: job.timestamp,
            image_path: path,
        })
    }

    /// `process` with failures logged and counted instead of returned.
    pub fn handle(&mut self, job: &CaptureJob) -> Option<CaptureEvent> {
        match self.process(job) {
            Ok(ev) => {
                self.stats.dispatched.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    kind = ev.kind.as_str(),
                    image = %ev.image_path.display(),
                    "alert dispatched"
                );
                Some(ev)
            }
            Err(e) => {
                let counter = match e.downcast_ref::<TurretError>() {
                    Some(TurretError::Dispatch(_)) => &self.stats.dispatch_failures,
                    _ => &self.stats.capture_failures,
                };
                counter.fetch_add(1, Ordering::Relaxed);
                tracing::error!(kind = job.kind.as_str(), error = %e, "alert pipeline failed");
                None
            }
        }
    }
}

/// Background thread owning a `CapturePipeline`.
pub struct PipelineWorker {
    tx: Option<xch::Sender<CaptureJob>>,
    stats: Arc<PipelineStats>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl PipelineWorker {
    pub fn spawn(mut pipeline: CapturePipeline) -> std::io::Result<Self> {
        let (tx, rx) = xch::unbounded::<CaptureJob>();
        let stats = pipeline.stats();
        let join_handle = std::thread::Builder::new()
            .name("turret-alerts".into())
            .spawn(move || {
                // Ends once every sender is dropped and the queue is empty.
                for job in rx.iter() {
                    pipeline.handle(&job);
                }
                tracing::trace!("alert worker exiting cleanly");
            })?;
        Ok(Self {
            tx: Some(tx),
            stats,
            join_handle: Some(join_handle),
        })
    }

    /// Queue a job. Never blocks.
    pub fn submit(&self, job: CaptureJob) -> Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| TurretError::State("alert worker already closed".into()))?;
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        tx.send(job)
            .map_err(|_| TurretError::State("alert worker disconnected".into()))?;
        Ok(())
    }

    pub fn stats(&self) -> Arc<PipelineStats> {
        self.stats.clone()
    }

    /// Stop accepting jobs, finish the queued ones and join the thread.
    pub fn close(&mut self) {
        self.tx.take();
        if let Some(handle) = self.join_handle.take()
            && let Err(e) = handle.join()
        {
            tracing::warn!(?e, "alert worker panicked");
        }
    }
}

impl Drop for PipelineWorker {
    fn drop(&mut self) {
        self.close();
    }
}

/// How the controller should run the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineMode {
    /// On the worker thread.
    #[default]
    Background,
    /// On the control thread; deterministic, used by tests.
    Inline,
}

/// The controller's handle on the alert pipeline.
pub enum AlertDispatch {
    Disabled,
    Inline(CapturePipeline),
    Background(PipelineWorker),
}

impl AlertDispatch {
    pub fn new(pipeline: CapturePipeline, mode: PipelineMode) -> Result<Self> {
        Ok(match mode {
            PipelineMode::Inline => AlertDispatch::Inline(pipeline),
            PipelineMode::Background => AlertDispatch::Background(
                PipelineWorker::spawn(pipeline)
                    .map_err(|e| TurretError::Io(format!("spawn alert worker: {e}")))?,
            ),
        })
    }

    pub fn submit(&mut self, job: CaptureJob) {
        match self {
            AlertDispatch::Disabled => {
                tracing::debug!(kind = job.kind.as_str(), "alerts disabled; capture skipped");
            }
            AlertDispatch::Inline(p) => {
                p.stats.submitted.fetch_add(1, Ordering::Relaxed);
                p.handle(&job);
            }
            AlertDispatch::Background(w) => {
                if let Err(e) = w.submit(job) {
                    tracing::error!(error = %e, "alert job dropped");
                }
            }
        }
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        match self {
            AlertDispatch::Disabled => PipelineSnapshot::default(),
            AlertDispatch::Inline(p) => p.stats.snapshot(),
            AlertDispatch::Background(w) => w.stats.snapshot(),
        }
    }

    /// Flush pending work. Idempotent.
    pub fn close(&mut self) {
        if let AlertDispatch::Background(w) = self {
            w.close();
        }
    }
}

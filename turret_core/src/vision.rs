//! Detector thread with a per-sample deadline.
//!
//! The controller hands each sampled frame to `VisionWorker::detect` and
//! waits at most the vision timeout. A detector that overruns keeps running
//! on its thread; its late result is thrown away on the next sample so a
//! stale box is never aimed at.

use std::time::Duration;

use crossbeam_channel as xch;
use turret_traits::{BoxError, Detections, Detector, Frame};

/// Outcome of one sample request.
#[derive(Debug)]
pub enum Sample {
    /// The detector answered within the deadline.
    Done(Result<Detections, BoxError>),
    /// The deadline passed first.
    Late,
    /// A previous late sample is still running; nothing was submitted.
    Busy,
    /// The detector thread is gone (it panicked).
    Gone,
}

pub struct VisionWorker {
    tx: Option<xch::Sender<Frame>>,
    rx: xch::Receiver<Result<Detections, BoxError>>,
    in_flight: bool,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl VisionWorker {
    pub fn spawn(mut detector: Box<dyn Detector + Send>) -> std::io::Result<Self> {
        let (tx, frames) = xch::bounded::<Frame>(1);
        let (results, rx) = xch::bounded::<Result<Detections, BoxError>>(1);
        let join_handle = std::thread::Builder::new()
            .name("turret-vision".into())
            .spawn(move || {
                for frame in frames.iter() {
                    if results.send(detector.detect(&frame)).is_err() {
                        break;
                    }
                }
                tracing::trace!("vision worker exiting cleanly");
            })?;
        Ok(Self {
            tx: Some(tx),
            rx,
            in_flight: false,
            join_handle: Some(join_handle),
        })
    }

    /// Run the detector on `frame`, waiting at most `deadline`.
    pub fn detect(&mut self, frame: Frame, deadline: Duration) -> Sample {
        if self.in_flight {
            match self.rx.try_recv() {
                Ok(_) => {
                    tracing::debug!("late detection discarded");
                    self.in_flight = false;
                }
                Err(xch::TryRecvError::Empty) => return Sample::Busy,
                Err(xch::TryRecvError::Disconnected) => return Sample::Gone,
            }
        }
        let Some(tx) = self.tx.as_ref() else {
            return Sample::Gone;
        };
        if tx.send(frame).is_err() {
            return Sample::Gone;
        }
        self.in_flight = true;
        match self.rx.recv_timeout(deadline) {
            Ok(result) => {
                self.in_flight = false;
                Sample::Done(result)
            }
            Err(xch::RecvTimeoutError::Timeout) => Sample::Late,
            Err(xch::RecvTimeoutError::Disconnected) => Sample::Gone,
        }
    }
}

impl Drop for VisionWorker {
    fn drop(&mut self) {
        self.tx.take();
        // A hung detector would block the join forever; leave that thread detached.
        if self.in_flight {
            tracing::warn!("detector still running at shutdown; thread detached");
            return;
        }
        if let Some(handle) = self.join_handle.take() {
            if handle.join().is_err() {
                tracing::warn!("vision worker panicked");
            }
        }
    }
}

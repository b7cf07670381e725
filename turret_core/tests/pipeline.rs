use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, TimeZone};
use turret_core::{CaptureCfg, CaptureJob, CapturePipeline, PipelineWorker};
use turret_traits::{AlertSink, BoxError, CaptureWriter, EventKind, Frame};

type Sent = Arc<Mutex<Vec<(EventKind, PathBuf)>>>;

#[derive(Default, Clone)]
struct RecordingSink {
    sent: Sent,
    fail: bool,
}

impl AlertSink for RecordingSink {
    fn send(
        &mut self,
        kind: EventKind,
        _timestamp: DateTime<Local>,
        image_path: &Path,
    ) -> Result<(), BoxError> {
        if self.fail {
            return Err("smtp unreachable".into());
        }
        self.sent
            .lock()
            .unwrap()
            .push((kind, image_path.to_path_buf()));
        Ok(())
    }
}

/// Writes the raw frame bytes; enough for retention and dispatch tests.
struct RawWriter;

impl CaptureWriter for RawWriter {
    fn write(&mut self, frame: &Frame, path: &Path) -> Result<(), BoxError> {
        std::fs::write(path, frame.as_rgb())?;
        Ok(())
    }
}

struct BrokenWriter;

impl CaptureWriter for BrokenWriter {
    fn write(&mut self, _frame: &Frame, _path: &Path) -> Result<(), BoxError> {
        Err("disk full".into())
    }
}

fn ts(sec: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2026, 5, 1, 12, 0, sec).single().unwrap()
}

fn job(kind: EventKind, sec: u32) -> CaptureJob {
    CaptureJob {
        kind,
        timestamp: ts(sec),
        frame: Frame::blank(4, 4),
    }
}

fn cfg(dir: &Path, max_files: usize) -> CaptureCfg {
    CaptureCfg {
        dir: dir.to_path_buf(),
        extension: "png".into(),
        max_files,
    }
}

#[test]
fn process_writes_then_dispatches_named_capture() {
    let dir = tempfile::tempdir().unwrap();
    let sink = RecordingSink::default();
    let sent = sink.sent.clone();
    let mut p = CapturePipeline::new(Box::new(RawWriter), Box::new(sink), cfg(dir.path(), 20));

    let ev = p.process(&job(EventKind::DoorOpened, 7)).unwrap();
    assert_eq!(
        ev.image_path,
        dir.path().join("door_2026-05-01-120007.png")
    );
    assert!(ev.image_path.exists());
    assert_eq!(sent.lock().unwrap().as_slice(), &[(EventKind::DoorOpened, ev.image_path.clone())]);
}

#[test]
fn same_second_captures_get_distinct_names() {
    let dir = tempfile::tempdir().unwrap();
    let mut p = CapturePipeline::new(
        Box::new(RawWriter),
        Box::new(RecordingSink::default()),
        cfg(dir.path(), 20),
    );
    let a = p.process(&job(EventKind::MotionDetected, 1)).unwrap();
    let b = p.process(&job(EventKind::MotionDetected, 1)).unwrap();
    assert_ne!(a.image_path, b.image_path);
    assert_eq!(
        b.image_path.file_name().unwrap(),
        "motion_2026-05-01-120001_1.png"
    );
}

#[test]
fn write_failure_skips_dispatch_and_is_counted() {
    let dir = tempfile::tempdir().unwrap();
    let sink = RecordingSink::default();
    let sent = sink.sent.clone();
    let mut p = CapturePipeline::new(Box::new(BrokenWriter), Box::new(sink), cfg(dir.path(), 20));
    assert!(p.handle(&job(EventKind::PersonDetected, 0)).is_none());
    assert!(sent.lock().unwrap().is_empty());
    let s = p.stats().snapshot();
    assert_eq!(s.capture_failures, 1);
    assert_eq!(s.dispatch_failures, 0);
}

#[test]
fn dispatch_failure_keeps_the_capture() {
    let dir = tempfile::tempdir().unwrap();
    let sink = RecordingSink {
        fail: true,
        ..RecordingSink::default()
    };
    let mut p = CapturePipeline::new(Box::new(RawWriter), Box::new(sink), cfg(dir.path(), 20));
    assert!(p.handle(&job(EventKind::DoorOpened, 3)).is_none());
    assert!(dir.path().join("door_2026-05-01-120003.png").exists());
    assert_eq!(p.stats().snapshot().dispatch_failures, 1);
}

#[test]
fn directory_never_exceeds_cap() {
    let dir = tempfile::tempdir().unwrap();
    let mut p = CapturePipeline::new(
        Box::new(RawWriter),
        Box::new(RecordingSink::default()),
        cfg(dir.path(), 3),
    );
    for sec in 0..6 {
        p.process(&job(EventKind::DoorOpened, sec)).unwrap();
        let n = std::fs::read_dir(dir.path()).unwrap().count();
        assert!(n <= 3, "{n} captures on disk");
    }
}

#[test]
fn worker_drains_queue_on_close() {
    let dir = tempfile::tempdir().unwrap();
    let sink = RecordingSink::default();
    let sent = sink.sent.clone();
    let mut worker = PipelineWorker::spawn(CapturePipeline::new(
        Box::new(RawWriter),
        Box::new(sink),
        cfg(dir.path(), 50),
    ))
    .unwrap();
    for sec in 0..10 {
        worker.submit(job(EventKind::MotionDetected, sec)).unwrap();
    }
    worker.close();
    assert_eq!(sent.lock().unwrap().len(), 10);
    let s = worker.stats().snapshot();
    assert_eq!(s.submitted, 10);
    assert_eq!(s.dispatched, 10);
    assert!(worker.submit(job(EventKind::DoorOpened, 59)).is_err());
}

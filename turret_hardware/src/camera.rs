//! Buffer and error handling shared by device camera backends.

use std::io;
use std::time::Duration;

use turret_traits::Frame;

use crate::error::{HwError, Result};

/// Wrap a dequeued RGB24 buffer as a frame.
///
/// Drivers may hand back a buffer padded past `width * height * 3`; the
/// tail is dropped. A short buffer means the device is not producing the
/// negotiated format.
pub fn frame_from_rgb24(width: u32, height: u32, buf: &[u8]) -> Result<Frame> {
    let expected = (width as usize) * (height as usize) * 3;
    let data = buf.get(..expected).ok_or_else(|| {
        HwError::Camera(format!(
            "short frame: {} bytes for {width}x{height} RGB24 ({expected} expected)",
            buf.len()
        ))
    })?;
    Frame::from_rgb(width, height, data.to_vec())
        .ok_or_else(|| HwError::Camera(format!("bad frame size {width}x{height}")))
}

/// Classify a failed dequeue. Timeouts are recoverable; anything else is a device fault.
pub fn dequeue_error(e: io::Error) -> HwError {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => HwError::Timeout,
        _ => HwError::Camera(format!("dequeue frame: {e}")),
    }
}

/// A frame that arrives after its deadline counts as a timeout.
pub fn check_deadline(elapsed: Duration, timeout: Duration) -> Result<()> {
    if elapsed > timeout {
        Err(HwError::Timeout)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_buffer_becomes_frame() {
        let f = frame_from_rgb24(4, 2, &[7; 24]).unwrap();
        assert_eq!((f.width(), f.height()), (4, 2));
        assert_eq!(f.as_rgb(), &[7; 24][..]);
    }

    #[test]
    fn padded_buffer_is_trimmed() {
        let f = frame_from_rgb24(2, 2, &[1; 16]).unwrap();
        assert_eq!(f.as_rgb().len(), 12);
    }

    #[test]
    fn short_buffer_is_camera_error() {
        // YUYV is 2 bytes per pixel: what a device that ignored RGB3 hands back.
        let err = frame_from_rgb24(4, 4, &[0; 32]).unwrap_err();
        assert!(matches!(err, HwError::Camera(ref m) if m.contains("short frame")));
    }

    #[test]
    fn dequeue_timeout_maps_to_timeout() {
        let e = io::Error::new(io::ErrorKind::TimedOut, "VIDIOC_DQBUF");
        assert!(matches!(dequeue_error(e), HwError::Timeout));
    }

    #[test]
    fn other_dequeue_errors_are_camera_faults() {
        let e = io::Error::from_raw_os_error(19); // ENODEV
        assert!(matches!(dequeue_error(e), HwError::Camera(_)));
    }

    #[test]
    fn late_frame_is_timeout() {
        let t = Duration::from_millis(100);
        assert!(check_deadline(Duration::from_millis(99), t).is_ok());
        assert!(matches!(
            check_deadline(Duration::from_millis(101), t),
            Err(HwError::Timeout)
        ));
    }
}

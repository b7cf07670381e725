//! USB/CSI camera capture through Video4Linux2.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use turret_traits::{BoxError, Frame, FrameSource};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;

use crate::camera::{check_deadline, dequeue_error, frame_from_rgb24};
use crate::error::{HwError, Result};

const RGB24: &[u8; 4] = b"RGB3";
const BUFFER_COUNT: u32 = 4;

/// Memory-mapped RGB24 capture from `/dev/video{index}`.
pub struct V4l2Camera {
    // The stream shares the device handle, so it may outlive the borrow it was built from.
    stream: MmapStream<'static>,
    _device: v4l::Device,
    width: u32,
    height: u32,
    timeout: Option<Duration>,
}

impl V4l2Camera {
    /// Open the device and negotiate RGB24 at the requested size and rate.
    ///
    /// The driver may pick a different size; frames are reported at whatever
    /// it settled on.
    pub fn open(index: u32, width: u32, height: u32, fps: u32) -> Result<Self> {
        let path = format!("/dev/video{index}");
        let device = v4l::Device::with_path(&path)
            .map_err(|e| HwError::Camera(format!("open {path}: {e}")))?;

        let mut format = device
            .format()
            .map_err(|e| HwError::Camera(format!("query format on {path}: {e}")))?;
        format.width = width;
        format.height = height;
        format.fourcc = v4l::FourCC::new(RGB24);
        let format = match device.set_format(&format) {
            Ok(f) => f,
            Err(e) => {
                warn!(path = %path, error = %e, "set_format failed; using current format");
                device
                    .format()
                    .map_err(|e| HwError::Camera(format!("query format on {path}: {e}")))?
            }
        };
        if format.fourcc != v4l::FourCC::new(RGB24) {
            return Err(HwError::Camera(format!(
                "{path} does not deliver RGB24 (driver chose {})",
                format.fourcc
            )));
        }
        if fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(fps);
            if let Err(e) = device.set_params(&params) {
                warn!(path = %path, fps, error = %e, "set_params failed; using driver rate");
            }
        }

        let stream = MmapStream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|e| HwError::Camera(format!("map buffers on {path}: {e}")))?;
        info!(
            path = %path,
            width = format.width,
            height = format.height,
            "camera opened"
        );
        Ok(Self {
            stream,
            _device: device,
            width: format.width,
            height: format.height,
            timeout: None,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl FrameSource for V4l2Camera {
    fn read_frame(&mut self, timeout: Duration) -> std::result::Result<Frame, BoxError> {
        if self.timeout != Some(timeout) {
            self.stream.set_timeout(timeout);
            self.timeout = Some(timeout);
        }
        let start = Instant::now();
        let (buf, meta) = self.stream.next().map_err(dequeue_error)?;
        check_deadline(start.elapsed(), timeout)?;
        let used = (meta.bytesused as usize).min(buf.len());
        let used = if used == 0 { buf.len() } else { used };
        debug!(seq = meta.sequence, bytes = used, "frame dequeued");
        Ok(frame_from_rgb24(self.width, self.height, &buf[..used])?)
    }
}

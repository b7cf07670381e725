//! PNG capture writer.

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, RgbImage};
use turret_traits::{BoxError, CaptureWriter, Frame};

use crate::error::{HwError, Result};
use crate::util::write_atomic;

/// Encodes frames as PNG and writes them atomically.
#[derive(Debug, Default, Clone, Copy)]
pub struct PngCaptureWriter;

impl PngCaptureWriter {
    pub fn new() -> Self {
        Self
    }

    /// Encode `frame` into an in-memory PNG.
    pub fn encode(frame: &Frame) -> Result<Vec<u8>> {
        let img = RgbImage::from_raw(frame.width(), frame.height(), frame.as_rgb().to_vec())
            .ok_or_else(|| HwError::Encode("frame buffer does not match dimensions".into()))?;
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png)
            .map_err(|e| HwError::Encode(e.to_string()))?;
        Ok(out.into_inner())
    }
}

impl CaptureWriter for PngCaptureWriter {
    fn write(&mut self, frame: &Frame, path: &Path) -> std::result::Result<(), BoxError> {
        let bytes = Self::encode(frame)?;
        write_atomic(path, &bytes).map_err(HwError::from)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "capture written");
        Ok(())
    }
}

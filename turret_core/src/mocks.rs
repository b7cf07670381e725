//! Stand-in collaborators for turret_core.

use turret_traits::{BoxError, Detections, Detector, Frame};

/// Detector that never reports anything. Used when no detector is supplied
/// or vision is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDetector;

impl Detector for NoDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<Detections, BoxError> {
        Ok(Detections::empty())
    }
}

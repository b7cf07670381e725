//! Maps `Box<dyn Error>` from trait boundaries to typed `TurretError`.
//!
//! The traits in `turret_traits` use `Box<dyn Error + Send + Sync>` so any
//! backend can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `turret_hardware::HwError`.

use crate::error::TurretError;

/// Map a trait-boundary error to a typed `TurretError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> TurretError {
    #[cfg(feature = "hardware-errors")]
    {
        use turret_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout => TurretError::FrameTimeout,
                HwError::Camera(msg) => TurretError::Camera(msg.clone()),
                HwError::Io(io) => TurretError::Io(io.to_string()),
                other => TurretError::HardwareFault(other.to_string()),
            };
        }
    }

    if let Some(te) = e.downcast_ref::<TurretError>() {
        return te.clone();
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") || s.to_lowercase().contains("timed out") {
        TurretError::FrameTimeout
    } else {
        TurretError::Hardware(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_fallback_detects_timeouts() {
        let e = std::io::Error::other("read timed out");
        assert_eq!(map_hw_error(&e), TurretError::FrameTimeout);
        let e = std::io::Error::other("bus exploded");
        assert_eq!(map_hw_error(&e), TurretError::Hardware("bus exploded".into()));
    }

    #[test]
    fn typed_errors_pass_through() {
        let e = TurretError::Camera("unplugged".into());
        assert_eq!(map_hw_error(&e), e);
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hw_errors_are_downcast() {
        use turret_hardware::error::HwError;
        assert_eq!(map_hw_error(&HwError::Timeout), TurretError::FrameTimeout);
        assert_eq!(
            map_hw_error(&HwError::Camera("gone".into())),
            TurretError::Camera("gone".into())
        );
        assert!(matches!(
            map_hw_error(&HwError::Gpio("pin 4 busy".into())),
            TurretError::HardwareFault(_)
        ));
    }
}

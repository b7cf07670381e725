//! Raspberry Pi backends (BCM numbering) built on `rppal`.

use std::collections::HashMap;
use std::time::Duration;

use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::{debug, warn};
use turret_traits::{BoxError, DigitalInputs, ServoBank};

use crate::error::{HwError, Result};

/// Standard hobby-servo frame period (50 Hz).
const SERVO_PERIOD: Duration = Duration::from_millis(20);

/// Software-PWM servo outputs.
pub struct GpioServoBank {
    pins: HashMap<u8, OutputPin>,
}

impl GpioServoBank {
    /// Claim every pin in `pins` as an output, driven low until first command.
    pub fn new(pins: &[u8]) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(format!("open gpio: {e}")))?;
        let mut out = HashMap::with_capacity(pins.len());
        for &pin in pins {
            let mut p = gpio
                .get(pin)
                .map_err(|e| HwError::Gpio(format!("open servo pin {pin}: {e}")))?
                .into_output();
            p.set_low();
            out.insert(pin, p);
        }
        debug!(?pins, "servo pins claimed");
        Ok(Self { pins: out })
    }
}

impl ServoBank for GpioServoBank {
    fn set_pulse_width(&mut self, pin: u8, micros: u16) -> std::result::Result<(), BoxError> {
        let p = self
            .pins
            .get_mut(&pin)
            .ok_or_else(|| HwError::Gpio(format!("servo pin {pin} not configured")))?;
        p.set_pwm(SERVO_PERIOD, Duration::from_micros(u64::from(micros)))
            .map_err(|e| HwError::Gpio(format!("pwm on pin {pin}: {e}")))?;
        Ok(())
    }

    fn release(&mut self) -> std::result::Result<(), BoxError> {
        for (pin, p) in self.pins.iter_mut() {
            if let Err(e) = p.clear_pwm() {
                warn!(pin, error = %e, "clear_pwm failed");
            }
            p.set_low();
        }
        // Dropping the OutputPins resets them to their original mode.
        self.pins.clear();
        Ok(())
    }
}

/// Pull-down digital inputs.
pub struct GpioInputs {
    pins: HashMap<u8, InputPin>,
}

impl GpioInputs {
    pub fn new(pins: &[u8]) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(format!("open gpio: {e}")))?;
        let mut out = HashMap::with_capacity(pins.len());
        for &pin in pins {
            let p = gpio
                .get(pin)
                .map_err(|e| HwError::Gpio(format!("open input pin {pin}: {e}")))?
                .into_input_pulldown();
            out.insert(pin, p);
        }
        Ok(Self { pins: out })
    }
}

impl DigitalInputs for GpioInputs {
    fn read(&mut self, pin: u8) -> std::result::Result<bool, BoxError> {
        let p = self
            .pins
            .get(&pin)
            .ok_or_else(|| HwError::Gpio(format!("input pin {pin} not configured")))?;
        Ok(p.is_high())
    }
}

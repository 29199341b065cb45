//! Perceptual duty mapping.
//!
//! Converts logical (linear-feeling) brightness into the LEDC duty value
//! actually written to the timer.  The curve is quadratic:
//!
//! ```text
//! duty = clamp(b² / scale, 0, duty_max)      scale = b_max² / duty_max
//! ```
//!
//! All arithmetic is done in `u64`, so no input in the `i32` range can
//! overflow or wrap.

/// Hardware "off" duty.
pub const DUTY_OFF: u16 = 0;

/// Brightness → duty curve for one output domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyCurve {
    brightness_max: u16,
    duty_max: u16,
}

impl DutyCurve {
    /// Build a curve.  A zero `brightness_max` is treated as 1.
    pub const fn new(brightness_max: u16, duty_max: u16) -> Self {
        Self {
            brightness_max: if brightness_max == 0 { 1 } else { brightness_max },
            duty_max,
        }
    }

    pub const fn brightness_max(&self) -> u16 {
        self.brightness_max
    }

    pub const fn duty_max(&self) -> u16 {
        self.duty_max
    }

    /// Clamp an arbitrary signed value into the logical brightness domain.
    pub fn clamp_brightness(&self, value: i32) -> u16 {
        value.clamp(0, i32::from(self.brightness_max)) as u16
    }

    /// Clamp a raw duty request into the hardware duty domain.
    pub fn clamp_duty(&self, value: i32) -> u16 {
        value.clamp(0, i32::from(self.duty_max)) as u16
    }

    /// Map `brightness` to a hardware duty.
    ///
    /// `power == false` always yields [`DUTY_OFF`].  Brightness at or above
    /// the top of the domain yields exactly `duty_max`, so integer rounding
    /// can never leave the output short of full scale.
    pub fn map(&self, brightness: i32, power: bool) -> u16 {
        if !power || brightness <= 0 {
            return DUTY_OFF;
        }
        let b_max = u64::from(self.brightness_max);
        let b = (brightness as u64).min(b_max);
        if b == b_max {
            return self.duty_max;
        }

        // b² · duty_max / b_max²  ==  b² / scale, without losing the
        // fractional part of `scale`.
        let duty = b * b * u64::from(self.duty_max) / (b_max * b_max);
        duty.min(u64::from(self.duty_max)) as u16
    }
}

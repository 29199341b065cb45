//! PWM output adapter: bridges LEDC channels to [`OutputPort`].
//!
//! Generic over [`embedded_hal::pwm::SetDutyCycle`], so the firmware hands
//! it esp-idf-hal `LedcDriver`s while host tests hand it plain mocks.
//! This is the only module in the system that writes duty registers.

use embedded_hal::pwm::SetDutyCycle;
use heapless::Vec;
use log::error;

use crate::app::ports::OutputPort;
use crate::channel::MAX_CHANNELS;
use crate::error::ActuatorError;

/// One PWM pin per dimmer channel, in channel order.
pub struct PwmOutputs<P: SetDutyCycle> {
    pins: Vec<P, MAX_CHANNELS>,
}

impl<P: SetDutyCycle> PwmOutputs<P> {
    /// Extra pins beyond [`MAX_CHANNELS`] are dropped.
    pub fn new(pins: impl IntoIterator<Item = P>) -> Self {
        let mut v = Vec::new();
        for pin in pins {
            if v.push(pin).is_err() {
                break;
            }
        }
        Self { pins: v }
    }

    pub fn pin(&self, channel: usize) -> Option<&P> {
        self.pins.get(channel)
    }
}

impl<P: SetDutyCycle> OutputPort for PwmOutputs<P> {
    fn apply(&mut self, channel: usize, duty: u16) -> Result<(), ActuatorError> {
        let ch = channel as u8;
        let pin = self
            .pins
            .get_mut(channel)
            .ok_or(ActuatorError::NoSuchOutput { channel: ch })?;
        let duty = duty.min(pin.max_duty_cycle());
        pin.set_duty_cycle(duty).map_err(|e| {
            error!("PWM ch={} duty={} write failed: {:?}", channel, duty, e);
            ActuatorError::PwmWriteFailed { channel: ch }
        })
    }

    fn channel_count(&self) -> usize {
        self.pins.len()
    }
}

//! Per-output channel state.
//!
//! One [`Channel`] per physical dimmer output, held in a fixed-capacity
//! [`ChannelBank`] sized once at boot.  Only `power` and `brightness` are
//! ever persisted; ramp progress lives in RAM only, so a reboot mid-ramp
//! comes back idle at the last persisted value.

use heapless::Vec;

use crate::duty::DutyCurve;
use crate::ramp::Ramp;

/// Hardware limit: the board routes four LEDC outputs.
pub const MAX_CHANNELS: usize = 4;

/// Result of [`Channel::begin_ramp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampStart {
    /// A ramp is now in progress.
    Armed,
    /// Zero duration or already at target: applied as a direct set.
    Immediate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    brightness: u16,
    power: bool,
    ramp: Ramp,
}

impl Default for Channel {
    fn default() -> Self {
        Self::new(false, 0)
    }
}

impl Channel {
    /// An idle channel at `brightness`.
    pub const fn new(power: bool, brightness: u16) -> Self {
        Self {
            brightness,
            power,
            ramp: Ramp::idle(brightness),
        }
    }

    pub fn brightness(&self) -> u16 {
        self.brightness
    }

    pub fn power(&self) -> bool {
        self.power
    }

    pub fn ramp(&self) -> &Ramp {
        &self.ramp
    }

    pub fn is_ramping(&self) -> bool {
        self.ramp.is_active()
    }

    /// Duty this channel should currently drive.
    pub fn duty(&self, curve: &DutyCurve) -> u16 {
        curve.map(i32::from(self.brightness), self.power)
    }

    /// Switch the output on or off.  Cancels any ramp in progress,
    /// leaving the channel idle at its current brightness.
    pub fn set_power(&mut self, on: bool) {
        self.power = on;
        self.ramp = Ramp::idle(self.brightness);
    }

    /// Jump straight to `brightness`, cancelling any ramp.
    pub fn set_brightness(&mut self, brightness: u16) {
        self.brightness = brightness;
        self.ramp = Ramp::idle(brightness);
    }

    /// Start moving toward `target` over `duration_ticks` ticks.
    pub fn begin_ramp(&mut self, target: u16, duration_ticks: u32) -> RampStart {
        match Ramp::arm(self.brightness, target, duration_ticks) {
            Some(ramp) => {
                self.ramp = ramp;
                RampStart::Armed
            }
            None => {
                self.set_brightness(target);
                RampStart::Immediate
            }
        }
    }

    /// Advance the ramp by one tick.  Returns `true` if brightness moved.
    pub fn advance_ramp(&mut self) -> bool {
        self.ramp.advance(&mut self.brightness)
    }
}

/// Fixed-size table of channels indexed by channel id.
#[derive(Debug, Clone)]
pub struct ChannelBank {
    channels: Vec<Channel, MAX_CHANNELS>,
}

impl ChannelBank {
    /// `count` is clamped to `1..=MAX_CHANNELS`.
    pub fn new(count: usize) -> Self {
        let count = count.clamp(1, MAX_CHANNELS);
        let mut channels = Vec::new();
        for _ in 0..count {
            let _ = channels.push(Channel::default());
        }
        Self { channels }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Channel> {
        self.channels.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut Channel> {
        self.channels.get_mut(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Channel> {
        self.channels.iter_mut()
    }
}

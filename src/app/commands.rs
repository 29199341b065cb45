//! Inbound commands to the application core.
//!
//! Produced by [`topic::parse`](crate::topic::parse) from MQTT messages and
//! interpreted by the [`DimmerService`](super::service::DimmerService) or,
//! for the non-channel verbs, by the main loop.

/// What to do to one channel.
///
/// Numeric values are carried exactly as received; range clamping happens
/// at dispatch, where the configured domain is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAction {
    /// Switch the output on/off.
    SetPower(bool),
    /// Jump to a logical brightness.
    SetBrightness(i32),
    /// Write a raw duty, bypassing the brightness model (diagnostic).
    SetDuty(i32),
    /// Move to `target` over `seconds`.
    Ramp { target: i32, seconds: u16 },
}

/// A [`ChannelAction`] addressed to a channel index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCommand {
    pub channel: u8,
    pub action: ChannelAction,
}

/// Every command the control topic tree can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Dimmer channel control.
    Channel(ChannelCommand),
    /// Pull a new firmware image and reboot into it.
    FirmwareUpdate,
    /// Sample the tank thermometer once and publish the result.
    SampleTemperature,
}

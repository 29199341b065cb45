//! Outbound application events.
//!
//! The [`DimmerService`](super::service::DimmerService) and the main loop
//! emit these through the [`EventSink`](super::ports::EventSink) port.
//! Adapters on the other side decide what to do with them: log to
//! serial, publish over MQTT.

use crate::report::ChannelStatus;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Scheduled or requested status snapshot of one channel.
    Status(ChannelStatus),

    /// Result of a one-shot thermometer read.  `None`: no sensor answered.
    Temperature(Option<f32>),

    /// The service applied its restored state to the outputs.
    Started { channels: u8 },

    /// A firmware update finished and the device is about to restart.
    UpdateReady,
}

//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events to the
//! ESP-IDF logger (UART in production).  The MQTT adapter implements the
//! same trait for the network side.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Status(s) => {
                info!(
                    "status dimmer={} power={} brightness={}",
                    s.channel,
                    s.power_str(),
                    s.brightness
                );
            }
            AppEvent::Temperature(Some(c)) => info!("TEMP | {:.2}\u{00b0}C", c),
            AppEvent::Temperature(None) => warn!("TEMP | no sensor"),
            AppEvent::Started { channels } => info!("START | channels={}", channels),
            AppEvent::UpdateReady => info!("OTA | image ready, restarting"),
        }
    }
}

/// Fan one event out to two sinks.
pub struct Tee<'a, A: EventSink, B: EventSink>(pub &'a mut A, pub &'a mut B);

impl<A: EventSink, B: EventSink> EventSink for Tee<'_, A, B> {
    fn emit(&mut self, event: &AppEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

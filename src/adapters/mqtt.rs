//! MQTT adapter: inbound commands and outbound status.
//!
//! ```text
//!  broker ──▶ client callback ──▶ events::push_event ──▶ main loop
//!  main loop ──▶ EventSink::emit ──▶ publish ──▶ broker
//! ```
//!
//! The client callback runs on the ESP-IDF MQTT task.  It never touches
//! application state; it only copies the message into the event queue.
//! Publishing happens from the main loop through [`EventSink`].
//!
//! The link state is also mirrored in an atomic flag.  A `Connected` event
//! lost to a full queue would otherwise leave the session unsubscribed;
//! the main loop reconciles against the flag with
//! [`MqttAdapter::sync_link`].

use core::fmt::Write;
use core::sync::atomic::{AtomicBool, Ordering};

use heapless::{String, Vec};
use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::error::CommsError;
use crate::topic::{self, StatusField, TopicString};

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EspMqttEvent, EventPayload, MqttClientConfiguration, QoS,
};

#[cfg(target_os = "espidf")]
use crate::events::{push_event, Event, InboundMessage};

/// Published when the thermometer does not answer.
pub const NO_SENSOR_READING: &str = "-271";

pub type PayloadString = String<16>;

/// Broker session state as last reported by the client task.
static LINK_UP: AtomicBool = AtomicBool::new(false);

/// Record a session change.  Called from the client callback.
pub fn note_link(up: bool) {
    LINK_UP.store(up, Ordering::Release);
}

/// Topic/payload pairs an event turns into.  At most two per event.
pub fn render(prefix: &str, event: &AppEvent) -> Vec<(TopicString, PayloadString), 2> {
    let mut out = Vec::new();
    match event {
        AppEvent::Status(s) => {
            let mut bri = PayloadString::new();
            let _ = write!(bri, "{}", s.brightness);
            let mut pow = PayloadString::new();
            let _ = pow.push_str(s.power_str());
            let _ = out.push((topic::status_topic(prefix, s.channel, StatusField::Power), pow));
            let _ = out.push((topic::status_topic(prefix, s.channel, StatusField::Brightness), bri));
        }
        AppEvent::Temperature(reading) => {
            let mut p = PayloadString::new();
            match reading {
                Some(c) => {
                    let _ = write!(p, "{:.2}", c);
                }
                None => {
                    let _ = p.push_str(NO_SENSOR_READING);
                }
            }
            let _ = out.push((topic::temperature_topic(prefix), p));
        }
        AppEvent::Started { .. } | AppEvent::UpdateReady => {}
    }
    out
}

pub struct MqttAdapter {
    prefix: String<32>,
    connected: bool,
    #[cfg(target_os = "espidf")]
    client: EspMqttClient<'static>,
    /// Simulation: everything that would have gone to the broker.
    #[cfg(not(target_os = "espidf"))]
    published: std::vec::Vec<(TopicString, PayloadString)>,
    #[cfg(not(target_os = "espidf"))]
    subscribed: std::vec::Vec<TopicString>,
}

#[cfg(target_os = "espidf")]
fn on_mqtt_event(event: EspMqttEvent<'_>) {
    let queued = match event.payload() {
        EventPayload::Connected(_) => {
            note_link(true);
            push_event(Event::Connected)
        }
        EventPayload::Disconnected => {
            note_link(false);
            push_event(Event::Disconnected)
        }
        EventPayload::Received {
            topic: Some(topic),
            data,
            details: Details::Complete,
            ..
        } => match InboundMessage::new(topic, data) {
            Some(msg) => push_event(Event::Inbound(msg)),
            None => {
                debug!("mqtt: topic {} too long, dropped", topic);
                true
            }
        },
        _ => true,
    };
    if !queued {
        warn!("mqtt: event queue full, event dropped");
    }
}

impl MqttAdapter {
    /// Create the client.  Connection proceeds in the background; the
    /// callback pushes [`Event::Connected`] once the session is up.
    #[cfg(target_os = "espidf")]
    pub fn new(broker_url: &str, client_id: &str, prefix: &str) -> Result<Self, CommsError> {
        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            ..Default::default()
        };
        let client = EspMqttClient::new_cb(broker_url, &conf, on_mqtt_event).map_err(|e| {
            warn!("mqtt: client init failed: {}", e);
            CommsError::MqttInitFailed
        })?;
        info!("mqtt: client '{}' → {}", client_id, broker_url);
        Ok(Self {
            prefix: Self::bounded_prefix(prefix),
            connected: false,
            client,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(broker_url: &str, client_id: &str, prefix: &str) -> Result<Self, CommsError> {
        info!("mqtt(sim): client '{}' → {}", client_id, broker_url);
        Ok(Self {
            prefix: Self::bounded_prefix(prefix),
            connected: false,
            published: std::vec::Vec::new(),
            subscribed: std::vec::Vec::new(),
        })
    }

    fn bounded_prefix(prefix: &str) -> String<32> {
        let mut p = String::new();
        if p.push_str(prefix).is_err() {
            warn!("mqtt: prefix '{}' too long, truncated", prefix);
            for c in prefix.chars() {
                if p.push(c).is_err() {
                    break;
                }
            }
        }
        p
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Catch up with the link flag.  Returns the new state when it differs
    /// from what the loop last saw, `None` when nothing changed.
    pub fn sync_link(&mut self) -> Option<bool> {
        let up = LINK_UP.load(Ordering::Acquire);
        if up == self.connected {
            return None;
        }
        self.connected = up;
        Some(up)
    }

    /// Subscribe to every command topic for `channel_count` channels.
    pub fn subscribe_all(&mut self, channel_count: usize) -> Result<(), CommsError> {
        let prefix = self.prefix.clone();
        for t in topic::subscriptions(&prefix, channel_count) {
            self.subscribe(&t)?;
        }
        info!("mqtt: subscribed under {}", prefix);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn subscribe(&mut self, t: &str) -> Result<(), CommsError> {
        self.client.subscribe(t, QoS::AtMostOnce).map_err(|e| {
            warn!("mqtt: subscribe {} failed: {}", t, e);
            CommsError::MqttSubscribeFailed
        })?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn subscribe(&mut self, t: &TopicString) -> Result<(), CommsError> {
        self.subscribed.push(t.clone());
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn publish(&mut self, t: &str, payload: &str) -> Result<(), CommsError> {
        self.client
            .publish(t, QoS::AtMostOnce, false, payload.as_bytes())
            .map_err(|_| CommsError::MqttPublishFailed)?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn publish(&mut self, t: &TopicString, payload: &PayloadString) -> Result<(), CommsError> {
        self.published.push((t.clone(), payload.clone()));
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn published(&self) -> &[(TopicString, PayloadString)] {
        &self.published
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn subscribed(&self) -> &[TopicString] {
        &self.subscribed
    }
}

impl EventSink for MqttAdapter {
    fn emit(&mut self, event: &AppEvent) {
        let messages = render(&self.prefix, event);
        if messages.is_empty() {
            return;
        }
        if !self.connected {
            debug!("mqtt: offline, {} message(s) not published", messages.len());
            return;
        }
        for (t, payload) in &messages {
            if let Err(e) = self.publish(t, payload) {
                warn!("mqtt: publish {} failed: {}", t, e);
            }
        }
    }
}

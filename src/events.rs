//! Process-wide event queue.
//!
//! Events are produced by:
//! - the periodic tick timer callback
//! - the MQTT client callback (connect, disconnect, inbound message)
//!
//! and consumed by the main loop, which is the only code that touches
//! channel state.  Funnelling both sources through one queue is what
//! serialises ticks against commands.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Tick timer  │────▶│  Event Queue │────▶│  Main Loop   │
//! │ MQTT client │────▶│  (bounded)   │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

use crate::topic::{MAX_TOPIC_LEN, TopicString};

/// Maximum number of pending events.
const EVENT_QUEUE_CAP: usize = 32;

/// Longest command payload accepted; the biggest legal one is
/// `"8191 65535"`.
pub const MAX_PAYLOAD_LEN: usize = 31;

/// An MQTT publish received on one of our subscriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: TopicString,
    pub payload: Vec<u8, MAX_PAYLOAD_LEN>,
}

impl InboundMessage {
    /// `None` when the topic does not fit.  Payloads longer than
    /// [`MAX_PAYLOAD_LEN`] are cut to that length.
    pub fn new(topic: &str, payload: &[u8]) -> Option<Self> {
        if topic.len() > MAX_TOPIC_LEN {
            return None;
        }
        let mut t = TopicString::new();
        t.push_str(topic).ok()?;
        Some(Self {
            topic: t,
            payload: Vec::from_slice(&payload[..payload.len().min(MAX_PAYLOAD_LEN)]).ok()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Ramp engine tick timer fired.
    Tick,
    /// MQTT session established (or re-established).
    Connected,
    /// MQTT session lost.
    Disconnected,
    /// Incoming publish.
    Inbound(InboundMessage),
}

static EVENTS: Channel<CriticalSectionRawMutex, Event, EVENT_QUEUE_CAP> = Channel::new();

/// Push an event into the queue.  Never blocks; safe from timer and
/// MQTT callback context.  Returns `false` if the queue is full (event
/// dropped).
pub fn push_event(event: Event) -> bool {
    EVENTS.try_send(event).is_ok()
}

/// Pop the next event, if any.
pub fn pop_event() -> Option<Event> {
    EVENTS.try_receive().ok()
}

/// Drain all pending events into a callback, FIFO.  Stops at the first
/// handler error and returns it; later events stay queued.
pub fn drain_events<E>(mut handler: impl FnMut(Event) -> Result<(), E>) -> Result<(), E> {
    while let Some(event) = pop_event() {
        handler(event)?;
    }
    Ok(())
}

pub fn queue_is_empty() -> bool {
    EVENTS.is_empty()
}

/// Number of pending events.
pub fn queue_len() -> usize {
    EVENTS.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_message_bounds() {
        assert!(InboundMessage::new("/fishtank/set/0/power", b"ON").is_some());
        let long = "x".repeat(MAX_TOPIC_LEN + 1);
        assert!(InboundMessage::new(&long, b"").is_none());
    }

    #[test]
    fn oversize_payload_is_truncated() {
        let mut padded = b"100".to_vec();
        padded.resize(40, b' ');
        let msg = InboundMessage::new("/fishtank/set/0/brightness", &padded).unwrap();
        assert_eq!(msg.payload.len(), MAX_PAYLOAD_LEN);
        assert_eq!(&msg.payload[..3], b"100");
        assert_eq!(
            crate::topic::parse("/fishtank", &msg.topic, &msg.payload),
            Some(crate::app::commands::AppCommand::Channel(crate::app::commands::ChannelCommand {
                channel: 0,
                action: crate::app::commands::ChannelAction::SetBrightness(100),
            }))
        );
    }

    // The queue is a process-wide static, so everything touching it lives
    // in one test.
    #[test]
    fn queue_is_fifo_and_bounded() {
        while pop_event().is_some() {}

        assert!(push_event(Event::Connected));
        assert!(push_event(Event::Tick));
        assert_eq!(queue_len(), 2);

        let mut seen = std::vec::Vec::new();
        let r: Result<(), ()> = drain_events(|e| {
            seen.push(e);
            Ok(())
        });
        assert!(r.is_ok());
        assert_eq!(seen, [Event::Connected, Event::Tick]);
        assert!(queue_is_empty());

        for _ in 0..EVENT_QUEUE_CAP {
            assert!(push_event(Event::Tick));
        }
        assert!(!push_event(Event::Disconnected));

        let mut handled = 0;
        let r = drain_events(|_| {
            handled += 1;
            if handled == 3 { Err("stop") } else { Ok(()) }
        });
        assert_eq!(r, Err("stop"));
        assert_eq!(queue_len(), EVENT_QUEUE_CAP - 3);
        while pop_event().is_some() {}
    }
}

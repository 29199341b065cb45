//! MQTT topic tree: inbound parsing and outbound topic construction.
//!
//! ```text
//! <prefix>/set/<ch>/power        "ON" | "OFF"
//! <prefix>/set/<ch>/brightness   decimal
//! <prefix>/set/<ch>/duty         decimal (raw hardware duty)
//! <prefix>/set/<ch>/ramp         "<target> <seconds>"
//! <prefix>/ota                   (any payload)
//! <prefix>/get/temp              (any payload)
//!
//! <prefix>/status/<ch>/power       published "ON" | "OFF"
//! <prefix>/status/<ch>/brightness  published decimal
//! <prefix>/temp                    published decimal °C, "-271" = no sensor
//! ```
//!
//! Anything that does not match exactly parses to `None`; the caller
//! drops it without complaint so older and newer controllers can share a
//! broker.

use core::fmt::Write;

use heapless::String;

use crate::app::commands::{AppCommand, ChannelAction, ChannelCommand};

/// Upper bound on any topic this firmware builds or accepts.
pub const MAX_TOPIC_LEN: usize = 96;

pub type TopicString = String<MAX_TOPIC_LEN>;

/// Channel verbs, in subscription order.
pub const CHANNEL_VERBS: [&str; 4] = ["power", "brightness", "duty", "ramp"];

/// Published status fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusField {
    Power,
    Brightness,
}

impl StatusField {
    fn as_str(self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Brightness => "brightness",
        }
    }
}

/// Parse one inbound message.  `None` means "not ours / malformed".
pub fn parse(prefix: &str, topic: &str, payload: &[u8]) -> Option<AppCommand> {
    let rest = topic.strip_prefix(prefix)?;
    match rest {
        "/ota" => return Some(AppCommand::FirmwareUpdate),
        "/get/temp" => return Some(AppCommand::SampleTemperature),
        _ => {}
    }

    let rest = rest.strip_prefix("/set/")?;
    let (index, verb) = rest.split_once('/')?;
    let channel = parse_index(index)?;
    let payload = core::str::from_utf8(payload).ok()?.trim();

    let action = match verb {
        "power" => ChannelAction::SetPower(parse_power(payload)?),
        "brightness" => ChannelAction::SetBrightness(payload.parse().ok()?),
        "duty" => ChannelAction::SetDuty(payload.parse().ok()?),
        "ramp" => {
            let (target, seconds) = payload.split_once(' ')?;
            ChannelAction::Ramp {
                target: target.trim().parse().ok()?,
                seconds: seconds.trim().parse().ok()?,
            }
        }
        _ => return None,
    };
    Some(AppCommand::Channel(ChannelCommand { channel, action }))
}

fn parse_index(s: &str) -> Option<u8> {
    // `u8::from_str` accepts a leading '+'.
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_power(s: &str) -> Option<bool> {
    match s {
        "ON" => Some(true),
        "OFF" => Some(false),
        _ => None,
    }
}

/// `<prefix>/set/<channel>/<verb>`
pub fn command_topic(prefix: &str, channel: u8, verb: &str) -> TopicString {
    let mut t = TopicString::new();
    let _ = write!(t, "{}/set/{}/{}", prefix, channel, verb);
    t
}

/// `<prefix>/status/<channel>/<field>`
pub fn status_topic(prefix: &str, channel: u8, field: StatusField) -> TopicString {
    let mut t = TopicString::new();
    let _ = write!(t, "{}/status/{}/{}", prefix, channel, field.as_str());
    t
}

/// `<prefix>/temp`
pub fn temperature_topic(prefix: &str) -> TopicString {
    let mut t = TopicString::new();
    let _ = write!(t, "{}/temp", prefix);
    t
}

/// Every topic the firmware subscribes to on connect.
pub fn subscriptions(prefix: &str, channel_count: usize) -> impl Iterator<Item = TopicString> + '_ {
    let per_channel = (0..channel_count).flat_map(move |ch| {
        CHANNEL_VERBS
            .iter()
            .map(move |verb| command_topic(prefix, ch as u8, verb))
    });
    let global = ["/ota", "/get/temp"].into_iter().map(move |suffix| {
        let mut t = TopicString::new();
        let _ = write!(t, "{}{}", prefix, suffix);
        t
    });
    per_channel.chain(global)
}

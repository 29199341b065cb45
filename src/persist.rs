//! Channel state persistence.
//!
//! Two `i16` keys per channel: `bri/<n>` and `pow/<n>`.  Reads that fail
//! or find nothing fall back to 0 (off, dark).  Writes are best-effort:
//! failures are logged and dropped, and the in-memory state stays
//! authoritative.

use core::fmt::Write;

use heapless::String;
use log::warn;

use crate::app::ports::KvStore;
use crate::channel::{Channel, ChannelBank};
use crate::duty::DutyCurve;

/// `bri/255` is the longest key we build.
type Key = String<8>;

fn key(field: &str, channel: usize) -> Key {
    let mut k = Key::new();
    let _ = write!(k, "{}/{}", field, channel);
    k
}

pub fn brightness_key(channel: usize) -> Key {
    key("bri", channel)
}

pub fn power_key(channel: usize) -> Key {
    key("pow", channel)
}

fn read_or_zero(store: &impl KvStore, key: &str) -> i16 {
    match store.get_i16(key) {
        Ok(Some(v)) => v,
        Ok(None) => 0,
        Err(e) => {
            warn!("persist: read {} failed: {}", key, e);
            0
        }
    }
}

/// Populate `bank` from `store`.  Every channel comes back idle.
pub fn load(store: &impl KvStore, bank: &mut ChannelBank, curve: &DutyCurve) {
    for (idx, ch) in bank.iter_mut().enumerate() {
        let brightness = curve.clamp_brightness(i32::from(read_or_zero(store, &brightness_key(idx))));
        let power = read_or_zero(store, &power_key(idx)) != 0;
        *ch = Channel::new(power, brightness);
    }
}

/// Persist `power` and `brightness` for one channel, then commit.
///
/// `brightness` is passed explicitly so a ramp can record its target
/// rather than the value it is currently passing through.
pub fn save_channel(store: &mut impl KvStore, channel: usize, power: bool, brightness: u16) {
    let bri = i16::try_from(brightness).unwrap_or(i16::MAX);
    let writes = [
        (brightness_key(channel), bri),
        (power_key(channel), i16::from(power)),
    ];
    for (k, v) in &writes {
        if let Err(e) = store.set_i16(k, *v) {
            warn!("persist: write {}={} failed: {}", k, v, e);
        }
    }
    if let Err(e) = store.commit() {
        warn!("persist: commit failed: {}", e);
    }
}

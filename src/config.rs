//! System configuration parameters
//!
//! All tunable parameters for the dimmer.  Defaults are compiled in;
//! network credentials may be supplied at build time through environment
//! variables.  A persisted copy in NVS overrides the defaults.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::channel::MAX_CHANNELS;
use crate::pins::{PWM_DUTY_MAX, PWM_FREQ_HZ};

pub type PrefixString = String<32>;
pub type UrlString = String<128>;
pub type SsidString = String<32>;
pub type PassString = String<64>;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Network ---
    /// MQTT topic prefix, e.g. `/fishtank`
    pub topic_prefix: PrefixString,
    /// MQTT broker URL (`mqtt://` or `mqtts://`)
    pub broker_url: UrlString,
    pub wifi_ssid: SsidString,
    pub wifi_password: PassString,
    /// Firmware image URL fetched on an OTA request.  Empty disables OTA.
    pub ota_url: UrlString,

    // --- Outputs ---
    /// Number of dimmer channels wired (1-4)
    pub channel_count: u8,
    /// Top of the logical brightness domain
    pub brightness_max: u16,
    /// Top of the hardware duty domain (13-bit LEDC → 8191)
    pub duty_max: u16,
    /// LEDC timer frequency in Hz
    pub pwm_frequency_hz: u32,

    // --- Timing ---
    /// Ramp engine tick interval (milliseconds)
    pub tick_interval_ms: u32,
    /// Status report interval (ticks)
    pub report_interval_ticks: u32,
}

/// Copy `s` into a fixed buffer, truncating at capacity.
fn bounded<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            topic_prefix: bounded("/fishtank"),
            broker_url: bounded(option_env!("FISHTANK_BROKER_URL").unwrap_or("mqtt://192.168.1.10:1883")),
            wifi_ssid: bounded(option_env!("FISHTANK_WIFI_SSID").unwrap_or("")),
            wifi_password: bounded(option_env!("FISHTANK_WIFI_PASS").unwrap_or("")),
            ota_url: bounded(option_env!("FISHTANK_OTA_URL").unwrap_or("")),

            channel_count: MAX_CHANNELS as u8,
            brightness_max: PWM_DUTY_MAX,
            duty_max: PWM_DUTY_MAX,
            pwm_frequency_hz: PWM_FREQ_HZ,

            tick_interval_ms: 100,       // 10 Hz
            report_interval_ticks: 600,  // 1/min
        }
    }
}

impl SystemConfig {
    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = self.topic_prefix.as_str();
        if !prefix.starts_with('/') || prefix.len() < 2 {
            return Err(ConfigError::ValidationFailed("topic_prefix must start with '/'"));
        }
        if prefix.ends_with('/') || prefix.contains(['+', '#']) {
            return Err(ConfigError::ValidationFailed("topic_prefix has trailing '/' or wildcard"));
        }
        let url = self.broker_url.as_str();
        if !(url.starts_with("mqtt://") || url.starts_with("mqtts://")) {
            return Err(ConfigError::ValidationFailed("broker_url must be mqtt:// or mqtts://"));
        }
        if self.channel_count == 0 || usize::from(self.channel_count) > MAX_CHANNELS {
            return Err(ConfigError::ValidationFailed("channel_count must be 1-4"));
        }
        // Brightness is persisted as i16.
        if self.brightness_max == 0 || self.brightness_max > i16::MAX as u16 {
            return Err(ConfigError::ValidationFailed("brightness_max must be 1-32767"));
        }
        if self.duty_max == 0 || self.duty_max > PWM_DUTY_MAX {
            return Err(ConfigError::ValidationFailed("duty_max must be 1-8191"));
        }
        if !(100..=40_000).contains(&self.pwm_frequency_hz) {
            return Err(ConfigError::ValidationFailed("pwm_frequency_hz must be 100-40000"));
        }
        if !(10..=1000).contains(&self.tick_interval_ms) {
            return Err(ConfigError::ValidationFailed("tick_interval_ms must be 10-1000"));
        }
        if self.report_interval_ticks == 0 {
            return Err(ConfigError::ValidationFailed("report_interval_ticks must be > 0"));
        }
        Ok(())
    }

    /// Ramp engine ticks per second.
    pub fn ticks_per_second(&self) -> u32 {
        (1000 / self.tick_interval_ms.max(1)).max(1)
    }
}

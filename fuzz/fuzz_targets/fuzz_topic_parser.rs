//! Fuzz target: MQTT topic/payload parser and command dispatch
//!
//! Splits the input into a topic and a payload, parses it, and runs any
//! resulting channel command through a `DimmerService`.  Checks:
//! - No panics under arbitrary bytes
//! - Brightness never leaves the logical domain
//! - Duties written to the outputs never exceed `duty_max`
//!
//! cargo fuzz run fuzz_topic_parser

#![no_main]

use std::collections::HashMap;

use fishtank::app::commands::AppCommand;
use fishtank::app::ports::{KvStore, OutputPort, StorageError};
use fishtank::app::service::DimmerService;
use fishtank::config::SystemConfig;
use fishtank::error::ActuatorError;
use fishtank::topic;
use libfuzzer_sys::fuzz_target;

struct Outputs(u16);

impl OutputPort for Outputs {
    fn apply(&mut self, _channel: usize, duty: u16) -> Result<(), ActuatorError> {
        assert!(duty <= self.0, "duty {} above max {}", duty, self.0);
        Ok(())
    }

    fn channel_count(&self) -> usize {
        4
    }
}

#[derive(Default)]
struct Store(HashMap<String, i16>);

impl KvStore for Store {
    fn get_i16(&self, key: &str) -> Result<Option<i16>, StorageError> {
        Ok(self.0.get(key).copied())
    }

    fn set_i16(&mut self, key: &str, value: i16) -> Result<(), StorageError> {
        self.0.insert(key.to_string(), value);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    // First 0x00 separates topic from payload.
    let split = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    let Ok(t) = core::str::from_utf8(&data[..split]) else {
        return;
    };
    let payload = data.get(split + 1..).unwrap_or(&[]);

    let config = SystemConfig::default();
    let mut svc = DimmerService::new(&config);
    let mut out = Outputs(config.duty_max);
    let mut store = Store::default();

    if let Some(AppCommand::Channel(cmd)) = topic::parse(&config.topic_prefix, t, payload) {
        let _ = svc.handle_command(cmd, &mut out, &mut store);
        let mut sink = fishtank::adapters::log_sink::LogEventSink::new();
        for _ in 0..4 {
            let _ = svc.tick(&mut out, &mut sink);
        }
        for status in svc.snapshot() {
            assert!(status.brightness <= config.brightness_max);
        }
    }
});

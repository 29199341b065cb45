//! Mock hardware adapters for integration tests.
//!
//! Records every output write and every stored value so tests can assert
//! on the full history without touching LEDC registers or flash.

use std::collections::HashMap;

use fishtank::app::events::AppEvent;
use fishtank::app::ports::{EventSink, KvStore, OutputPort, StorageError};
use fishtank::error::ActuatorError;

// ── MockOutputs ───────────────────────────────────────────────

pub struct MockOutputs {
    pub writes: Vec<(usize, u16)>,
    pub duty: [u16; 4],
    pub count: usize,
    /// Fail every write once set.
    pub broken: bool,
}

#[allow(dead_code)]
impl MockOutputs {
    pub fn new(count: usize) -> Self {
        Self {
            writes: Vec::new(),
            duty: [0; 4],
            count,
            broken: false,
        }
    }

    /// Duties written to one channel, oldest first.
    pub fn history(&self, channel: usize) -> Vec<u16> {
        self.writes
            .iter()
            .filter(|(ch, _)| *ch == channel)
            .map(|(_, d)| *d)
            .collect()
    }
}

impl OutputPort for MockOutputs {
    fn apply(&mut self, channel: usize, duty: u16) -> Result<(), ActuatorError> {
        if self.broken {
            return Err(ActuatorError::PwmWriteFailed { channel: channel as u8 });
        }
        if channel >= self.count {
            return Err(ActuatorError::NoSuchOutput { channel: channel as u8 });
        }
        self.duty[channel] = duty;
        self.writes.push((channel, duty));
        Ok(())
    }

    fn channel_count(&self) -> usize {
        self.count
    }
}

// ── MockStore ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockStore {
    pub values: HashMap<String, i16>,
    pub commits: u32,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

#[allow(dead_code)]
impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<i16> {
        self.values.get(key).copied()
    }
}

impl KvStore for MockStore {
    fn get_i16(&self, key: &str) -> Result<Option<i16>, StorageError> {
        if self.fail_reads {
            return Err(StorageError::IoError);
        }
        Ok(self.values.get(key).copied())
    }

    fn set_i16(&mut self, key: &str, value: i16) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Full);
        }
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::IoError);
        }
        self.commits += 1;
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::Status(_)))
            .count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

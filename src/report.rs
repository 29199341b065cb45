//! Status report cadence.
//!
//! A single process-wide countdown, decremented once per tick.  When it
//! hits zero every channel is reported and the countdown rearms.  Any
//! committed command calls [`StatusReporter::request_now`], so the fresh
//! state goes out on the very next tick.

use serde::Serialize;

/// Snapshot of one channel as published on the status topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelStatus {
    pub channel: u8,
    pub power: bool,
    pub brightness: u16,
}

impl ChannelStatus {
    /// Wire form of the power flag.
    pub fn power_str(&self) -> &'static str {
        if self.power { "ON" } else { "OFF" }
    }
}

#[derive(Debug, Clone)]
pub struct StatusReporter {
    countdown: u32,
    interval_ticks: u32,
}

impl StatusReporter {
    /// Starts due, so the first tick after boot reports.
    pub fn new(interval_ticks: u32) -> Self {
        Self {
            countdown: 0,
            interval_ticks: interval_ticks.max(1),
        }
    }

    /// Called once per tick.  Returns `true` when a report is due.
    pub fn tick(&mut self) -> bool {
        if self.countdown > 0 {
            self.countdown -= 1;
            return false;
        }
        self.countdown = self.interval_ticks - 1;
        true
    }

    /// Skip the rest of the interval and report on the next tick.
    pub fn request_now(&mut self) {
        self.countdown = 0;
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }
}

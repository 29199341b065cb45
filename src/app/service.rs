//! Application service: the hexagonal core.
//!
//! [`DimmerService`] owns the channel table, the duty curve and the status
//! countdown.  It is the only thing that mutates channel state, and it is
//! driven from a single dispatch loop, so no locking is needed.  All I/O
//! flows through port traits injected at call sites.
//!
//! ```text
//!  ChannelCommand ──▶ ┌──────────────────────────┐ ──▶ OutputPort
//!                     │      DimmerService       │
//!            Tick ──▶ │ Channels · Ramps · Report│ ──▶ EventSink
//!                     └──────────────────────────┘ ──▶ KvStore
//! ```

use log::{debug, info};

use crate::channel::{Channel, ChannelBank, RampStart};
use crate::config::SystemConfig;
use crate::duty::DutyCurve;
use crate::error::{Error, Result};
use crate::persist;
use crate::ramp;
use crate::report::{ChannelStatus, StatusReporter};

use super::commands::{ChannelAction, ChannelCommand};
use super::events::AppEvent;
use super::ports::{EventSink, KvStore, OutputPort};

// ───────────────────────────────────────────────────────────────
// DimmerService
// ───────────────────────────────────────────────────────────────

pub struct DimmerService {
    bank: ChannelBank,
    curve: DutyCurve,
    reporter: StatusReporter,
    ticks_per_second: u32,
    tick_count: u64,
}

impl DimmerService {
    /// Construct the service from configuration.  All channels start off
    /// and dark; call [`restore`](Self::restore) then
    /// [`start`](Self::start) next.
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            bank: ChannelBank::new(usize::from(config.channel_count)),
            curve: DutyCurve::new(config.brightness_max, config.duty_max),
            reporter: StatusReporter::new(config.report_interval_ticks),
            ticks_per_second: config.ticks_per_second(),
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load persisted power/brightness for every channel.
    pub fn restore(&mut self, store: &impl KvStore) {
        persist::load(store, &mut self.bank, &self.curve);
        for (idx, ch) in self.bank.iter().enumerate() {
            info!(
                "restore ch={} power={} brightness={}",
                idx,
                ch.power(),
                ch.brightness()
            );
        }
    }

    /// Drive every output to match the restored state.  Fails if the
    /// output bank is smaller than the channel table.
    pub fn start(&mut self, out: &mut impl OutputPort, sink: &mut impl EventSink) -> Result<()> {
        if out.channel_count() < self.bank.len() {
            return Err(Error::Init("fewer outputs than channels"));
        }
        self.apply_all(out)?;
        self.reporter.request_now();
        sink.emit(&AppEvent::Started {
            channels: self.bank.len() as u8,
        });
        info!("DimmerService started with {} channels", self.bank.len());
        Ok(())
    }

    /// The transport (re)connected: outputs are re-asserted and a fresh
    /// report goes out on the next tick.
    pub fn on_connected(&mut self, out: &mut impl OutputPort) -> Result<()> {
        self.apply_all(out)?;
        self.reporter.request_now();
        Ok(())
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// One engine tick: advance ramps → apply changed duties → report
    /// if the countdown expired.
    pub fn tick(&mut self, out: &mut impl OutputPort, sink: &mut impl EventSink) -> Result<()> {
        self.tick_count += 1;

        for idx in ramp::advance_all(&mut self.bank) {
            self.apply(idx, out)?;
        }

        if self.reporter.tick() {
            for status in self.snapshot() {
                sink.emit(&AppEvent::Status(status));
            }
        }
        Ok(())
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply one channel command.
    ///
    /// Returns `Ok(false)` when the command addressed a channel that does
    /// not exist; such commands are ignored.
    pub fn handle_command(
        &mut self,
        cmd: ChannelCommand,
        out: &mut impl OutputPort,
        store: &mut impl KvStore,
    ) -> Result<bool> {
        let idx = usize::from(cmd.channel);
        let curve = self.curve;
        let ticks_per_second = self.ticks_per_second;
        let Some(ch) = self.bank.get_mut(idx) else {
            debug!("ignoring {:?} for unknown channel {}", cmd.action, cmd.channel);
            return Ok(false);
        };

        match cmd.action {
            ChannelAction::SetPower(on) => {
                ch.set_power(on);
                info!("power ch={} {}", idx, if on { "ON" } else { "OFF" });
                Self::commit(idx, ch, ch.brightness(), store);
                self.reporter.request_now();
                self.apply(idx, out)?;
            }
            ChannelAction::SetBrightness(value) => {
                let b = curve.clamp_brightness(value);
                ch.set_brightness(b);
                info!("brightness ch={} {}", idx, b);
                Self::commit(idx, ch, b, store);
                self.reporter.request_now();
                self.apply(idx, out)?;
            }
            ChannelAction::SetDuty(raw) => {
                let duty = curve.clamp_duty(raw);
                info!("duty ch={} raw={}", idx, duty);
                out.apply(idx, duty)?;
            }
            ChannelAction::Ramp { target, seconds } => {
                let target = curve.clamp_brightness(target);
                let ticks = u32::from(seconds) * ticks_per_second;
                let started = ch.begin_ramp(target, ticks);
                info!("ramp ch={} tgt={} ticks={} {:?}", idx, target, ticks, started);
                Self::commit(idx, ch, target, store);
                self.reporter.request_now();
                if started == RampStart::Immediate {
                    self.apply(idx, out)?;
                }
            }
        }
        Ok(true)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn channel(&self, idx: usize) -> Option<&Channel> {
        self.bank.get(idx)
    }

    pub fn channel_count(&self) -> usize {
        self.bank.len()
    }

    /// Current power/brightness of every channel.
    pub fn snapshot(&self) -> impl Iterator<Item = ChannelStatus> + '_ {
        self.bank.iter().enumerate().map(|(idx, ch)| ChannelStatus {
            channel: idx as u8,
            power: ch.power(),
            brightness: ch.brightness(),
        })
    }

    /// Mapped duty a channel should currently drive.
    pub fn duty(&self, idx: usize) -> Option<u16> {
        self.bank.get(idx).map(|ch| ch.duty(&self.curve))
    }

    pub fn curve(&self) -> &DutyCurve {
        &self.curve
    }

    pub fn ticks_per_second(&self) -> u32 {
        self.ticks_per_second
    }

    /// Ticks left before the next scheduled report.
    pub fn report_countdown(&self) -> u32 {
        self.reporter.countdown()
    }

    /// Total engine ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Internal ──────────────────────────────────────────────

    fn commit(idx: usize, ch: &Channel, brightness: u16, store: &mut impl KvStore) {
        persist::save_channel(store, idx, ch.power(), brightness);
    }

    fn apply(&self, idx: usize, out: &mut impl OutputPort) -> Result<()> {
        if let Some(duty) = self.duty(idx) {
            out.apply(idx, duty)?;
        }
        Ok(())
    }

    fn apply_all(&self, out: &mut impl OutputPort) -> Result<()> {
        for idx in 0..self.bank.len() {
            self.apply(idx, out)?;
        }
        Ok(())
    }
}

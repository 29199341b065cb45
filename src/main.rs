//! Fishtank Dimmer Firmware: Main Entry Point
//!
//! Hexagonal architecture with a single event-driven dispatch loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  PwmOutputs      NvsAdapter       MqttAdapter    LogEventSink  │
//! │  (OutputPort)    (KvStore+Config) (EventSink)    (EventSink)   │
//! │  HttpOta         Ds18b20          WifiAdapter                  │
//! │  (OtaPort)       (Temperature)                                 │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            DimmerService (pure logic)                  │    │
//! │  │  Channels · Ramps · Duty curve · Status cadence        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Event queue ◀── tick timer, MQTT callback                     │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{debug, info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_svc::hal::onewire::OWDriver;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use fishtank::adapters::device_id;
use fishtank::adapters::log_sink::{LogEventSink, Tee};
use fishtank::adapters::mqtt::MqttAdapter;
use fishtank::adapters::nvs::NvsAdapter;
use fishtank::adapters::ota::{self, HttpOta};
use fishtank::adapters::outputs::PwmOutputs;
use fishtank::adapters::wifi::WifiAdapter;
use fishtank::app::commands::AppCommand;
use fishtank::app::events::AppEvent;
use fishtank::app::ports::{ConfigPort, EventSink, OtaPort, OutputPort, TemperaturePort};
use fishtank::app::service::DimmerService;
use fishtank::config::SystemConfig;
use fishtank::drivers::{hw_timer, reset, watchdog::Watchdog};
use fishtank::events::{self, Event};
use fishtank::pins;
use fishtank::sensors::temperature::{self, Ds18b20, RmtOneWire};
use fishtank::topic;

/// Idle wait between queue drains.  Well under one tick.
const LOOP_IDLE_MS: u32 = 5;

// ── Main ──────────────────────────────────────────────────────

/// Act on a change of the broker session.  A new session needs the
/// subscriptions again and the outputs re-asserted.
fn sync_link(
    mqtt: &mut MqttAdapter,
    service: &mut DimmerService,
    outputs: &mut impl OutputPort,
) -> fishtank::error::Result<()> {
    match mqtt.sync_link() {
        Some(true) => {
            info!("MQTT: connected");
            if let Err(e) = mqtt.subscribe_all(service.channel_count()) {
                warn!("MQTT: {}", e);
            }
            service.on_connected(outputs)
        }
        Some(false) => {
            info!("MQTT: disconnected");
            Ok(())
        }
        None => Ok(()),
    }
}

/// Boot errors return `Err`.  Once the loop runs, an output write failure
/// is fatal: it is logged and the chip restarts through
/// [`reset::fatal`].
fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Fishtank dimmer v{}                 ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    ota::check_rollback();

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;
    let watchdog = Watchdog::default();

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let mut nvs = NvsAdapter::new(nvs_partition.clone())?;
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };
    let prefix = config.topic_prefix.as_str();
    let channel_count = usize::from(config.channel_count);

    // ── 3. PWM outputs ────────────────────────────────────────
    let timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::default()
            .frequency(config.pwm_frequency_hz.Hz())
            .resolution(Resolution::Bits13),
    )?;
    let drivers = [
        LedcDriver::new(peripherals.ledc.channel0, &timer, peripherals.pins.gpio12)?,
        LedcDriver::new(peripherals.ledc.channel1, &timer, peripherals.pins.gpio13)?,
        LedcDriver::new(peripherals.ledc.channel2, &timer, peripherals.pins.gpio15)?,
        LedcDriver::new(peripherals.ledc.channel3, &timer, peripherals.pins.gpio23)?,
    ];
    let mut outputs = PwmOutputs::new(drivers.into_iter().take(channel_count));
    info!(
        "LEDC: {} outputs on GPIO {:?} @ {} Hz, {}-bit",
        channel_count,
        &pins::DIMMER_GPIOS[..channel_count],
        config.pwm_frequency_hz,
        pins::PWM_RESOLUTION_BITS
    );

    let onewire = OWDriver::new(peripherals.pins.gpio21, peripherals.rmt.channel0)?;
    let mut thermometer = Ds18b20::new(RmtOneWire(onewire));
    info!("1-Wire thermometer on GPIO {}", pins::ONEWIRE_GPIO);

    // ── 4. Restore channel state and drive the outputs ────────
    let mut log_sink = LogEventSink::new();
    let mut service = DimmerService::new(&config);
    service.restore(&nvs);
    service.start(&mut outputs, &mut log_sink)?;

    // ── 5. Network ────────────────────────────────────────────
    let mut wifi = WifiAdapter::new(peripherals.modem, sysloop, Some(nvs_partition))?;
    if let Err(e) = wifi.set_credentials(&config.wifi_ssid, &config.wifi_password) {
        warn!("WiFi: {}", e);
    } else if let Err(e) = wifi.connect() {
        warn!("WiFi: {}", e);
    }

    let client_id = device_id::client_id(&device_id::read_mac());
    let mut mqtt = MqttAdapter::new(&config.broker_url, &client_id, prefix)?;
    let mut ota = HttpOta::new();

    // ── 6. Tick source ────────────────────────────────────────
    hw_timer::start_tick_timer(config.tick_interval_ms)?;
    let ticks_per_second = u64::from(service.ticks_per_second());

    info!("System ready. Entering event loop.");

    // ── 7. Event loop ─────────────────────────────────────────
    loop {
        let result = events::drain_events(|event| -> fishtank::error::Result<()> {
            match event {
                Event::Tick => {
                    service.tick(&mut outputs, &mut Tee(&mut log_sink, &mut mqtt))?;
                    if service.tick_count() % ticks_per_second == 0 {
                        wifi.poll();
                    }
                }

                Event::Connected | Event::Disconnected => {
                    sync_link(&mut mqtt, &mut service, &mut outputs)?;
                }

                Event::Inbound(msg) => match topic::parse(prefix, &msg.topic, &msg.payload) {
                    Some(AppCommand::Channel(cmd)) => {
                        service.handle_command(cmd, &mut outputs, &mut nvs)?;
                    }
                    Some(AppCommand::SampleTemperature) => {
                        if let Some(ev) = temperature::reading_event(thermometer.sample()) {
                            Tee(&mut log_sink, &mut mqtt).emit(&ev);
                        }
                    }
                    Some(AppCommand::FirmwareUpdate) => {
                        // The download outlasts the watchdog timeout.
                        match ota.update(&config.ota_url, &mut || watchdog.feed()) {
                            Ok(()) => {
                                log_sink.emit(&AppEvent::UpdateReady);
                                reset::restart();
                            }
                            Err(e) => warn!("OTA: update failed: {}", e),
                        }
                    }
                    None => debug!("ignored message on {}", msg.topic),
                },
            }
            Ok(())
        });

        // A lost Connected/Disconnected event still shows up in the flag.
        let result = result.and_then(|()| sync_link(&mut mqtt, &mut service, &mut outputs));
        if let Err(e) = result {
            reset::fatal(&e);
        }

        watchdog.feed();
        FreeRtos::delay_ms(LOOP_IDLE_MS);
    }
}

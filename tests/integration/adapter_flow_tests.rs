//! Wire-level flow: topic strings in through the parser, the service in
//! the middle, the simulated NVS and MQTT adapters on the edges.

use fishtank::adapters::log_sink::{LogEventSink, Tee};
use fishtank::adapters::mqtt::MqttAdapter;
use fishtank::adapters::nvs::NvsAdapter;
use fishtank::app::commands::AppCommand;
use fishtank::app::ports::{ConfigError, ConfigPort, KvStore};
use fishtank::app::service::DimmerService;
use fishtank::config::SystemConfig;
use fishtank::topic;

use crate::mock_hw::MockOutputs;

const PREFIX: &str = "/fishtank";

fn deliver(
    svc: &mut DimmerService,
    out: &mut MockOutputs,
    nvs: &mut NvsAdapter,
    t: &str,
    payload: &str,
) -> bool {
    match topic::parse(PREFIX, t, payload.as_bytes()) {
        Some(AppCommand::Channel(cmd)) => svc.handle_command(cmd, out, nvs).unwrap(),
        _ => false,
    }
}

#[test]
fn mqtt_commands_reach_outputs_and_nvs() {
    let mut svc = DimmerService::new(&SystemConfig::default());
    let mut out = MockOutputs::new(4);
    let mut nvs = NvsAdapter::new();

    assert!(deliver(&mut svc, &mut out, &mut nvs, "/fishtank/set/2/power", "ON"));
    assert!(deliver(&mut svc, &mut out, &mut nvs, "/fishtank/set/2/brightness", "8191"));
    assert_eq!(out.duty[2], 8191);
    assert_eq!(nvs.get_i16("bri/2"), Ok(Some(8191)));
    assert_eq!(nvs.get_i16("pow/2"), Ok(Some(1)));

    assert!(!deliver(&mut svc, &mut out, &mut nvs, "/fishtank/set/2/power", "on"));
    assert!(!deliver(&mut svc, &mut out, &mut nvs, "/other/set/2/power", "OFF"));
    assert_eq!(out.duty[2], 8191);
}

#[test]
fn state_survives_restart_through_nvs() {
    let mut nvs = NvsAdapter::new();
    {
        let mut svc = DimmerService::new(&SystemConfig::default());
        let mut out = MockOutputs::new(4);
        deliver(&mut svc, &mut out, &mut nvs, "/fishtank/set/0/power", "ON");
        deliver(&mut svc, &mut out, &mut nvs, "/fishtank/set/0/ramp", "2000 30");
    }

    let mut svc = DimmerService::new(&SystemConfig::default());
    svc.restore(&nvs);
    let ch = svc.channel(0).unwrap();
    assert!(ch.power());
    assert_eq!(ch.brightness(), 2000);
    assert!(!ch.is_ramping());
}

#[test]
fn config_round_trips_through_nvs() {
    let mut nvs = NvsAdapter::new();
    assert_eq!(nvs.load(), Ok(SystemConfig::default()));

    let cfg = SystemConfig {
        channel_count: 2,
        report_interval_ticks: 50,
        ..Default::default()
    };
    nvs.save(&cfg).unwrap();
    assert_eq!(nvs.load(), Ok(cfg));
}

#[test]
fn invalid_config_is_refused() {
    let mut nvs = NvsAdapter::new();
    let cfg = SystemConfig {
        channel_count: 9,
        ..Default::default()
    };
    assert!(matches!(nvs.save(&cfg), Err(ConfigError::ValidationFailed(_))));
}

#[test]
fn tick_reports_go_out_over_mqtt() {
    let mut svc = DimmerService::new(&SystemConfig::default());
    let mut out = MockOutputs::new(4);
    let mut log = LogEventSink::new();
    let mut mqtt = MqttAdapter::new("mqtt://sim", "fishtank-test", PREFIX).unwrap();
    svc.start(&mut out, &mut Tee(&mut log, &mut mqtt)).unwrap();
    mqtt.set_connected(true);

    svc.tick(&mut out, &mut Tee(&mut log, &mut mqtt)).unwrap();

    let published = mqtt.published();
    assert_eq!(published.len(), 8);
    assert!(published
        .iter()
        .any(|(t, p)| t.as_str() == "/fishtank/status/3/power" && p.as_str() == "OFF"));
    assert!(published
        .iter()
        .any(|(t, p)| t.as_str() == "/fishtank/status/0/brightness" && p.as_str() == "0"));
}

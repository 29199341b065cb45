//! DimmerService against the recording mocks: commands in, duties and
//! status events out.

use crate::mock_hw::{MockOutputs, MockStore, RecordingSink};

use fishtank::app::commands::{ChannelAction, ChannelCommand};
use fishtank::app::events::AppEvent;
use fishtank::app::service::DimmerService;
use fishtank::config::SystemConfig;
use fishtank::error::{ActuatorError, Error};
use fishtank::report::ChannelStatus;

fn make_service() -> (DimmerService, MockOutputs, MockStore, RecordingSink) {
    let config = SystemConfig::default();
    let mut svc = DimmerService::new(&config);
    let mut out = MockOutputs::new(usize::from(config.channel_count));
    let store = MockStore::new();
    let mut sink = RecordingSink::new();
    svc.restore(&store);
    svc.start(&mut out, &mut sink).unwrap();
    (svc, out, store, sink)
}

fn run(
    svc: &mut DimmerService,
    out: &mut MockOutputs,
    store: &mut MockStore,
    channel: u8,
    action: ChannelAction,
) -> bool {
    svc.handle_command(ChannelCommand { channel, action }, out, store)
        .unwrap()
}

#[test]
fn start_drives_every_output_and_announces() {
    let (_svc, out, _store, sink) = make_service();
    assert_eq!(out.writes, vec![(0, 0), (1, 0), (2, 0), (3, 0)]);
    assert_eq!(sink.events, vec![AppEvent::Started { channels: 4 }]);
}

#[test]
fn ramp_up_moves_every_tick_and_lands_on_target() {
    let (mut svc, mut out, mut store, mut sink) = make_service();
    run(&mut svc, &mut out, &mut store, 0, ChannelAction::SetPower(true));
    run(
        &mut svc,
        &mut out,
        &mut store,
        0,
        ChannelAction::Ramp { target: 8191, seconds: 2 },
    );
    out.writes.clear();

    for _ in 0..20 {
        svc.tick(&mut out, &mut sink).unwrap();
    }

    let history = out.history(0);
    assert_eq!(history.len(), 20, "brightness moves every tick");
    assert!(history.windows(2).all(|w| w[0] <= w[1]), "duty never decreases");
    assert_eq!(*history.last().unwrap(), 8191);
    assert!(!svc.channel(0).unwrap().is_ramping());
}

#[test]
fn ramp_down_to_zero_turns_output_dark() {
    let (mut svc, mut out, mut store, mut sink) = make_service();
    run(&mut svc, &mut out, &mut store, 2, ChannelAction::SetPower(true));
    run(&mut svc, &mut out, &mut store, 2, ChannelAction::SetBrightness(4000));
    run(
        &mut svc,
        &mut out,
        &mut store,
        2,
        ChannelAction::Ramp { target: 0, seconds: 1 },
    );
    for _ in 0..10 {
        svc.tick(&mut out, &mut sink).unwrap();
    }
    assert_eq!(out.duty[2], 0);
    assert_eq!(svc.channel(2).unwrap().brightness(), 0);
}

#[test]
fn zero_second_ramp_is_an_immediate_set() {
    let (mut svc, mut out, mut store, _sink) = make_service();
    run(&mut svc, &mut out, &mut store, 1, ChannelAction::SetPower(true));
    run(
        &mut svc,
        &mut out,
        &mut store,
        1,
        ChannelAction::Ramp { target: 8191, seconds: 0 },
    );
    assert_eq!(out.duty[1], 8191);
    assert!(!svc.channel(1).unwrap().is_ramping());
}

#[test]
fn power_off_cancels_ramp_and_keeps_brightness() {
    let (mut svc, mut out, mut store, mut sink) = make_service();
    run(&mut svc, &mut out, &mut store, 3, ChannelAction::SetPower(true));
    run(
        &mut svc,
        &mut out,
        &mut store,
        3,
        ChannelAction::Ramp { target: 1000, seconds: 10 },
    );
    for _ in 0..5 {
        svc.tick(&mut out, &mut sink).unwrap();
    }
    let mid = svc.channel(3).unwrap().brightness();
    assert!(mid > 0 && mid < 1000);

    run(&mut svc, &mut out, &mut store, 3, ChannelAction::SetPower(false));
    assert_eq!(out.duty[3], 0);
    assert!(!svc.channel(3).unwrap().is_ramping());

    for _ in 0..5 {
        svc.tick(&mut out, &mut sink).unwrap();
    }
    assert_eq!(svc.channel(3).unwrap().brightness(), mid);
}

#[test]
fn status_events_mirror_channel_state() {
    let (mut svc, mut out, mut store, mut sink) = make_service();
    run(&mut svc, &mut out, &mut store, 1, ChannelAction::SetPower(true));
    run(&mut svc, &mut out, &mut store, 1, ChannelAction::SetBrightness(321));
    sink.clear();

    svc.tick(&mut out, &mut sink).unwrap();

    assert!(sink.events.contains(&AppEvent::Status(ChannelStatus {
        channel: 1,
        power: true,
        brightness: 321,
    })));
    assert_eq!(sink.status_count(), 4);
}

#[test]
fn periodic_report_follows_interval() {
    let config = SystemConfig {
        report_interval_ticks: 5,
        ..Default::default()
    };
    let mut svc = DimmerService::new(&config);
    let mut out = MockOutputs::new(4);
    let mut sink = RecordingSink::new();
    svc.start(&mut out, &mut sink).unwrap();
    sink.clear();

    let mut report_ticks = Vec::new();
    for t in 1..=16 {
        let before = sink.status_count();
        svc.tick(&mut out, &mut sink).unwrap();
        if sink.status_count() > before {
            report_ticks.push(t);
        }
    }
    assert_eq!(report_ticks, vec![1, 6, 11, 16]);
}

#[test]
fn persistence_failure_does_not_block_command() {
    let (mut svc, mut out, mut store, _sink) = make_service();
    store.fail_writes = true;
    assert!(run(&mut svc, &mut out, &mut store, 0, ChannelAction::SetPower(true)));
    run(&mut svc, &mut out, &mut store, 0, ChannelAction::SetBrightness(8191));
    assert_eq!(out.duty[0], 8191);
    assert!(store.values.is_empty());
}

#[test]
fn unreadable_store_restores_dark_channels() {
    let mut store = MockStore::new();
    store.values.insert("bri/0".into(), 500);
    store.values.insert("pow/0".into(), 1);
    store.fail_reads = true;

    let mut svc = DimmerService::new(&SystemConfig::default());
    svc.restore(&store);
    assert_eq!(svc.channel(0).unwrap().brightness(), 0);
    assert!(!svc.channel(0).unwrap().power());
}

#[test]
fn stored_values_out_of_range_are_clamped() {
    let mut store = MockStore::new();
    store.values.insert("bri/1".into(), 30_000);
    store.values.insert("bri/2".into(), -40);
    store.values.insert("pow/2".into(), 7);

    let mut svc = DimmerService::new(&SystemConfig::default());
    svc.restore(&store);
    assert_eq!(svc.channel(1).unwrap().brightness(), 8191);
    assert_eq!(svc.channel(2).unwrap().brightness(), 0);
    assert!(svc.channel(2).unwrap().power());
}

#[test]
fn output_failure_is_fatal() {
    let (mut svc, mut out, mut store, mut sink) = make_service();
    run(&mut svc, &mut out, &mut store, 0, ChannelAction::SetPower(true));
    run(
        &mut svc,
        &mut out,
        &mut store,
        0,
        ChannelAction::Ramp { target: 100, seconds: 1 },
    );
    out.broken = true;
    let err = svc.tick(&mut out, &mut sink).unwrap_err();
    assert_eq!(err, Error::Actuator(ActuatorError::PwmWriteFailed { channel: 0 }));
}

#[test]
fn reconnect_reasserts_outputs_and_reports() {
    let (mut svc, mut out, mut store, mut sink) = make_service();
    run(&mut svc, &mut out, &mut store, 0, ChannelAction::SetPower(true));
    run(&mut svc, &mut out, &mut store, 0, ChannelAction::SetBrightness(8191));
    svc.tick(&mut out, &mut sink).unwrap();
    svc.tick(&mut out, &mut sink).unwrap();
    out.writes.clear();
    sink.clear();

    svc.on_connected(&mut out).unwrap();
    assert_eq!(out.writes.len(), 4);
    assert_eq!(svc.report_countdown(), 0);
    svc.tick(&mut out, &mut sink).unwrap();
    assert_eq!(sink.status_count(), 4);
}

/// Boot, let the boot-time report go out, and leave the sink empty.
fn settled_service() -> (DimmerService, MockOutputs, MockStore, RecordingSink) {
    let (mut svc, mut out, store, mut sink) = make_service();
    svc.tick(&mut out, &mut sink).unwrap();
    svc.tick(&mut out, &mut sink).unwrap();
    assert_eq!(sink.status_count(), 4, "boot report only");
    sink.clear();
    (svc, out, store, sink)
}

fn status_of(sink: &RecordingSink, channel: u8) -> Option<ChannelStatus> {
    sink.events.iter().rev().find_map(|e| match e {
        AppEvent::Status(s) if s.channel == channel => Some(*s),
        _ => None,
    })
}

#[test]
fn brightness_alone_is_reported_on_next_tick() {
    let (mut svc, mut out, mut store, mut sink) = settled_service();
    run(&mut svc, &mut out, &mut store, 2, ChannelAction::SetBrightness(777));
    svc.tick(&mut out, &mut sink).unwrap();
    assert_eq!(
        status_of(&sink, 2),
        Some(ChannelStatus { channel: 2, power: false, brightness: 777 })
    );
}

#[test]
fn power_change_is_reported_on_next_tick() {
    let (mut svc, mut out, mut store, mut sink) = settled_service();
    run(&mut svc, &mut out, &mut store, 0, ChannelAction::SetPower(true));
    svc.tick(&mut out, &mut sink).unwrap();
    assert_eq!(
        status_of(&sink, 0),
        Some(ChannelStatus { channel: 0, power: true, brightness: 0 })
    );
}

#[test]
fn armed_ramp_is_reported_on_next_tick() {
    let (mut svc, mut out, mut store, mut sink) = settled_service();
    run(&mut svc, &mut out, &mut store, 1, ChannelAction::SetPower(true));
    svc.tick(&mut out, &mut sink).unwrap();
    sink.clear();

    run(
        &mut svc,
        &mut out,
        &mut store,
        1,
        ChannelAction::Ramp { target: 1000, seconds: 10 },
    );
    svc.tick(&mut out, &mut sink).unwrap();
    let reported = status_of(&sink, 1).expect("status after ramp command");
    assert_eq!(reported.brightness, svc.channel(1).unwrap().brightness());
    assert!(reported.power);
    assert!(reported.brightness > 0 && reported.brightness < 1000);
}

#[test]
fn start_refuses_short_output_bank() {
    let mut svc = DimmerService::new(&SystemConfig::default());
    let mut out = MockOutputs::new(2);
    let mut sink = RecordingSink::new();
    assert!(matches!(svc.start(&mut out, &mut sink), Err(Error::Init(_))));
    assert!(out.writes.is_empty());
    assert!(sink.events.is_empty());
}

//! End-to-end: the controller driving the wire-level virtual device

use tpg26x_core::core::state_machine::ExchangeState;
use tpg26x_core::{
    Channels, Command, Gauge, GaugeController, GaugeId, MeasurementStatus, PressureGauge,
    PressureUnit, ProtocolError, SimulatorConfig, Transport, VirtualDevice,
};

fn controller(device: VirtualDevice) -> GaugeController<VirtualDevice> {
    let mut controller = GaugeController::new(device, Channels::Dual);
    controller.open().unwrap();
    controller
}

fn seeded() -> VirtualDevice {
    VirtualDevice::with_seed(SimulatorConfig::default(), 7)
}

#[test]
fn full_command_set() {
    let mut ctl = controller(seeded());

    assert_eq!(ctl.program_number().unwrap(), "SIM-262");

    let (first, second) = ctl.identify().unwrap();
    assert_eq!(first.code, GaugeId::Tpr);
    assert_eq!(second.code, GaugeId::Ikr9);

    assert_eq!(ctl.unit().unwrap(), PressureUnit::Mbar);

    let reading = ctl.read_gauge(1).unwrap();
    assert!(reading.is_okay());
    assert!(reading.value > 0.0);

    let dual = ctl.read_both().unwrap();
    assert!(dual.gauge1.is_okay() && dual.gauge2.is_okay());

    assert_eq!(
        ctl.transport().received(),
        &[
            Command::ProgramNumber,
            Command::GaugeIdentification,
            Command::PressureUnit,
            Command::Pressure(Gauge::ONE),
            Command::PressureBoth,
        ]
    );
    assert_eq!(ctl.exchange_state(), ExchangeState::Idle);
}

#[test]
fn readings_follow_pump_down() {
    let mut ctl = controller(seeded());
    let first = ctl.read_gauge(1).unwrap().value;
    for _ in 0..30 {
        ctl.read_gauge(1).unwrap();
    }
    let later = ctl.read_gauge(1).unwrap().value;
    assert!(later < first);
}

#[test]
fn forced_status_and_settings() {
    let mut device = seeded();
    device.set_gauge_status(Gauge::TWO, MeasurementStatus::NoSensor);
    device.set_unit(PressureUnit::Torr);
    device.set_gauge_ids(GaugeId::Pkr, GaugeId::NoSensor);
    let mut ctl = controller(device);

    let reading = ctl.read_gauge(2).unwrap();
    assert_eq!(reading.status, MeasurementStatus::NoSensor);
    assert!((reading.value - 2.0e-2).abs() < 1e-12);

    assert_eq!(ctl.unit().unwrap(), PressureUnit::Torr);
    assert_eq!(ctl.identify().unwrap().1.code, GaugeId::NoSensor);
}

#[test]
fn loopback_passes_and_leaves_test_mode() {
    let mut ctl = controller(seeded());
    assert!(ctl.loopback_test().unwrap());
    assert!(!ctl.transport().in_test_mode());
    assert_eq!(
        ctl.transport().received(),
        &[Command::CommunicationTest, Command::EndOfText]
    );

    // normal operation resumes afterwards
    assert_eq!(ctl.unit().unwrap(), PressureUnit::Mbar);
}

#[test]
fn unresponsive_device_times_out() {
    let mut device = seeded();
    device.set_responsive(false);
    let mut ctl = controller(device);

    match ctl.unit() {
        Err(ProtocolError::UnexpectedResponse(raw)) => assert!(raw.is_empty()),
        other => panic!("expected empty response, got {other:?}"),
    }
    assert!(ctl.is_open());
    assert!(ctl.transport().stats().timeouts >= 1);
}

#[test]
fn close_and_reopen() {
    let mut ctl = controller(seeded());
    ctl.read_gauge(1).unwrap();
    ctl.close().unwrap();
    assert!(!ctl.transport().is_open());
    assert!(ctl.read_gauge(1).is_err());

    ctl.open().unwrap();
    assert!(ctl.read_gauge(1).unwrap().is_okay());
}

#[test]
fn single_channel_controller_guards_gauge_two() {
    let mut ctl = GaugeController::new(seeded(), Channels::Single);
    ctl.open().unwrap();
    assert!(matches!(ctl.read_gauge(2), Err(ProtocolError::InvalidArgument(_))));
    assert!(matches!(ctl.read_both(), Err(ProtocolError::InvalidArgument(_))));
    assert!(ctl.transport().received().is_empty());
    assert!(ctl.read_gauge(1).is_ok());
}

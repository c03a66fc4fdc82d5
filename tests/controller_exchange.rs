//! Command-set exchanges against a scripted device

use tpg26x_core::core::protocol::{Command, Gauge, ACK, ENQ, NAK};
use tpg26x_core::core::state_machine::{ExchangeState, HandleState};
use tpg26x_core::core::transport::ScriptedTransport;
use tpg26x_core::{
    Channels, GaugeController, GaugeId, MeasurementStatus, PressureGauge, PressureUnit,
    ProtocolError,
};

/// Queue an ACK plus data line for each reply
fn scripted(replies: &[&[u8]]) -> ScriptedTransport {
    let mut transport = ScriptedTransport::new();
    for data in replies {
        transport.push_line(&[ACK]);
        transport.push_line(data);
    }
    transport
}

fn open(transport: ScriptedTransport, channels: Channels) -> GaugeController<ScriptedTransport> {
    let mut controller = GaugeController::new(transport, channels);
    controller.open().unwrap();
    controller
}

#[test]
fn each_command_writes_one_frame_then_enq() {
    let mut ctl = open(
        scripted(&[
            b"BG805950-A",
            b"0,1.0000E-05",
            b"0,2.0000E-03",
            b"0,1.0000E-05,0,2.0000E-03",
            b"TPR,IKR9",
            b"0",
        ]),
        Channels::Dual,
    );

    ctl.program_number().unwrap();
    ctl.read_gauge(1).unwrap();
    ctl.read_gauge(2).unwrap();
    ctl.read_both().unwrap();
    ctl.identify().unwrap();
    ctl.unit().unwrap();

    let expected: Vec<Vec<u8>> = [
        Command::ProgramNumber,
        Command::Pressure(Gauge::ONE),
        Command::Pressure(Gauge::TWO),
        Command::PressureBoth,
        Command::GaugeIdentification,
        Command::PressureUnit,
    ]
    .iter()
    .flat_map(|command| [command.encode(), vec![ENQ]])
    .collect();
    assert_eq!(ctl.transport().written(), expected.as_slice());
    assert_eq!(ctl.exchange_state(), ExchangeState::Idle);
}

#[test]
fn decodes_every_reply_type() {
    let mut ctl = open(
        scripted(&[
            b"0,1.0000E-05",
            b"5,2.0000E-02,2,1.1000E+03",
            b"CMR,noid",
            b"2",
        ]),
        Channels::Dual,
    );

    let reading = ctl.read_gauge(1).unwrap();
    assert_eq!(reading.status, MeasurementStatus::Okay);
    assert!((reading.value - 1.0e-5).abs() < 1e-15);

    let dual = ctl.read_both().unwrap();
    assert_eq!(dual.gauge1.status, MeasurementStatus::NoSensor);
    assert_eq!(dual.gauge2.status, MeasurementStatus::Overrange);
    assert!((dual.gauge2.value - 1100.0).abs() < 1e-9);

    let (first, second) = ctl.identify().unwrap();
    assert_eq!(first.code, GaugeId::Cmr);
    assert_eq!(second.code, GaugeId::NoId);

    assert_eq!(ctl.unit().unwrap(), PressureUnit::Pascal);
}

#[test]
fn invalid_gauge_rejected_without_io() {
    let mut ctl = open(ScriptedTransport::new(), Channels::Dual);
    for which in [0u8, 3, 9] {
        assert!(matches!(
            ctl.read_gauge(which),
            Err(ProtocolError::InvalidArgument(_))
        ));
    }
    assert!(ctl.transport().written().is_empty());
}

#[test]
fn nak_is_reported_and_handle_survives() {
    let mut transport = ScriptedTransport::new();
    transport.push_line(&[NAK]);
    transport.push_line(&[ACK]);
    transport.push_line(b"0");
    let mut ctl = open(transport, Channels::Dual);

    assert!(matches!(ctl.unit(), Err(ProtocolError::NegativeAcknowledge)));
    assert_eq!(ctl.state(), HandleState::Open);
    assert_eq!(ctl.unit().unwrap(), PressureUnit::Mbar);
}

#[test]
fn silent_device_is_unexpected_empty_response() {
    let mut ctl = open(ScriptedTransport::new(), Channels::Dual);
    match ctl.read_gauge(1) {
        Err(ProtocolError::UnexpectedResponse(raw)) => assert!(raw.is_empty()),
        other => panic!("expected empty response, got {other:?}"),
    }
    assert_eq!(ctl.exchange_state(), ExchangeState::Idle);
}

#[test]
fn garbage_acknowledge_is_unexpected() {
    let mut transport = ScriptedTransport::new();
    transport.push_line(b"?!");
    let mut ctl = open(transport, Channels::Dual);

    match ctl.program_number() {
        Err(ProtocolError::UnexpectedResponse(raw)) => assert_eq!(raw, b"?!\r\n"),
        other => panic!("expected garbage to be reported, got {other:?}"),
    }
}

#[test]
fn empty_data_line_is_no_data() {
    let mut ctl = open(scripted(&[b""]), Channels::Dual);
    assert!(matches!(ctl.read_gauge(1), Err(ProtocolError::NoData)));
}

#[test]
fn non_utf8_payload_is_malformed() {
    let mut transport = ScriptedTransport::new();
    transport.push_line(&[ACK]);
    transport.push_bytes(b"\xff\xfe\r\n");
    let mut ctl = open(transport, Channels::Dual);

    ctl.send_command(Command::ProgramNumber).unwrap();
    match ctl.poll_data() {
        Err(ProtocolError::MalformedPayload(raw)) => assert_eq!(raw, [0xff, 0xfe]),
        other => panic!("expected MalformedPayload, got {other:?}"),
    }
    assert_eq!(ctl.exchange_state(), ExchangeState::Idle);
}

#[test]
fn read_both_is_all_or_nothing() {
    let mut ctl = open(scripted(&[b"0,1.0000E-05,0"]), Channels::Dual);
    assert!(matches!(
        ctl.read_both(),
        Err(ProtocolError::MalformedPayload(_))
    ));
}

#[test]
fn unknown_status_code_is_reported() {
    let mut ctl = open(scripted(&[b"7,1.0000E-05"]), Channels::Dual);
    assert!(matches!(
        ctl.read_gauge(1),
        Err(ProtocolError::UnknownCode { .. })
    ));
}

#[test]
fn terminator_stripped_before_decoding() {
    let mut transport = ScriptedTransport::new();
    transport.push_line(&[ACK]);
    transport.push_bytes(b"1\n\r");
    let mut ctl = open(transport, Channels::Dual);
    assert_eq!(ctl.unit().unwrap(), PressureUnit::Torr);
}

#[test]
fn raw_send_and_poll() {
    let mut ctl = open(scripted(&[b"BG805950-A"]), Channels::Dual);
    ctl.send_command(Command::ProgramNumber).unwrap();
    assert_eq!(ctl.exchange_state(), ExchangeState::AwaitingData);
    assert_eq!(ctl.poll_data().unwrap(), "BG805950-A");

    assert!(matches!(
        ctl.poll_data(),
        Err(ProtocolError::OutOfSequence { .. })
    ));
    assert_eq!(ctl.transport().written().len(), 2);
}

#[test]
fn closed_handle_or_missing_port() {
    let mut missing = GaugeController::new(ScriptedTransport::unavailable(), Channels::Dual);
    assert!(matches!(missing.open(), Err(ProtocolError::Transport(_))));
    assert!(!missing.is_open());
    assert!(matches!(missing.read_gauge(1), Err(ProtocolError::Transport(_))));
}

mod common;

use chrono::NaiveDate;
use common::{frame, init_tracing, MockTransport};
use gqgmc_core::protocol::{commands, Decoder, ProtocolError, Response, Session, Verifier};
use pretty_assertions::assert_eq;

fn session_with_reply(reply: &[u8]) -> (Session, MockTransport) {
    init_tracing();
    let mock = MockTransport::with_reply(reply);
    (Session::new(mock.clone()), mock)
}

#[test]
fn test_get_version() {
    let (session, mock) = session_with_reply(b"GMC-300Re 4.20");
    assert_eq!(session.get_version().unwrap(), "GMC-300Re 4.20");
    assert_eq!(mock.written(), b"<GETVER>>".to_vec());
}

#[test]
fn test_get_counts_per_minute_is_big_endian() {
    let (session, _mock) = session_with_reply(&[0x01, 0x1C]);
    assert_eq!(session.get_counts_per_minute().unwrap(), 0x011C);
}

#[test]
fn test_short_reply_is_an_error() {
    let (session, _mock) = session_with_reply(&[0x01]);
    assert!(matches!(
        session.get_counts_per_minute(),
        Err(ProtocolError::IoError(_))
    ));
}

#[test]
fn test_get_voltage_and_serial() {
    let (session, mock) = session_with_reply(&[42]);
    assert_eq!(session.get_voltage().unwrap(), 42);

    mock.push_reply(b"F488E42");
    assert_eq!(session.get_serial().unwrap(), "F488E42");
    assert_eq!(mock.written(), [frame("GETVOLT", &[]), frame("GETSERIAL", &[])].concat());
}

#[test]
fn test_history_read_frame_and_block() {
    let (session, mock) = session_with_reply(&[9, 8, 7, 6]);
    let data = session.get_history_data(0x010203, 4).unwrap();
    assert_eq!(data, vec![9, 8, 7, 6]);
    assert_eq!(mock.written(), frame("SPIR", &[0x01, 0x02, 0x03, 0x00, 0x04]));
}

#[test]
fn test_spir_descriptor_frame() {
    assert_eq!(
        commands::SPIR.encode(&[0x010203, 0x0A0B]).unwrap(),
        frame("SPIR", &[0x01, 0x02, 0x03, 0x0A, 0x0B])
    );
    assert!(matches!(
        commands::SPIR.encode(&[0x100_0000, 1]),
        Err(ProtocolError::Validation { parameter: "address", .. })
    ));
    assert!(matches!(
        commands::SPIR.encode(&[0, 0x1_0000]),
        Err(ProtocolError::Validation { parameter: "length", .. })
    ));
}

#[test]
fn test_history_address_out_of_range_sends_nothing() {
    let (session, mock) = session_with_reply(&[]);
    assert!(matches!(
        session.get_history_data(0x100_0000, 1),
        Err(ProtocolError::Validation { .. })
    ));
    assert!(mock.written().is_empty());
}

#[test]
fn test_get_configuration_reads_full_block() {
    let block: Vec<u8> = (0..=255).collect();
    let (session, mock) = session_with_reply(&block);
    assert_eq!(session.get_configuration().unwrap(), block);
    assert_eq!(mock.pending(), 0);
}

#[test]
fn test_get_temperature() {
    let (session, _mock) = session_with_reply(&[5, 2, 1, 0xAA]);
    assert_eq!(session.get_temperature().unwrap(), -5.5);
}

#[test]
fn test_get_datetime() {
    let (session, _mock) = session_with_reply(&[23, 6, 15, 10, 30, 0, 0xAA]);
    let expected = NaiveDate::from_ymd_opt(2023, 6, 15)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap();
    assert_eq!(session.get_datetime().unwrap(), expected);

    let (session, _mock) = session_with_reply(&[23, 6, 15, 10, 30, 0, 0x00]);
    assert!(matches!(
        session.get_datetime(),
        Err(ProtocolError::Verification { actual: 0x00, expected: 0xAA, .. })
    ));
}

#[test]
fn test_get_gyro() {
    let (session, _mock) = session_with_reply(&[0, 1, 0, 2, 0, 3, 0, 0xAA]);
    assert_eq!(session.get_gyro().unwrap(), (1, 2, 3));
}

fn valid_params(cmd: &gqgmc_core::protocol::CommandDescriptor) -> Vec<i64> {
    match cmd.verifier() {
        Verifier::Range { min, .. } => vec![min; cmd.encoder().arity()],
        Verifier::CalendarDate => vec![23, 6, 15, 10, 30, 0],
        Verifier::Any => vec![0; cmd.encoder().arity()],
    }
}

#[test]
fn test_every_ack_command_checks_ack_byte() {
    let ack_commands: Vec<_> = commands::ALL_COMMANDS
        .iter()
        .filter(|c| c.decoder() == Some(Decoder::Ack))
        .collect();
    assert_eq!(ack_commands.len(), 11);

    for cmd in ack_commands {
        let params = valid_params(cmd);

        let (session, _mock) = session_with_reply(&[0xAA]);
        assert_eq!(
            session.invoke(cmd, &params).unwrap(),
            Response::None,
            "{} with ack",
            cmd.name()
        );

        let (session, _mock) = session_with_reply(&[0x55]);
        match session.invoke(cmd, &params) {
            Err(ProtocolError::Verification {
                command,
                actual,
                expected,
            }) => {
                assert_eq!(command, cmd.name());
                assert_eq!(actual, 0x55);
                assert_eq!(expected, 0xAA);
            }
            other => panic!("{}: unexpected {:?}", cmd.name(), other),
        }
    }
}

#[test]
fn test_clock_setters_use_their_own_commands() {
    let (session, mock) = session_with_reply(&[0xAA; 6]);
    session.set_year(23).unwrap();
    session.set_month(6).unwrap();
    session.set_day(15).unwrap();
    session.set_hour(10).unwrap();
    session.set_minute(30).unwrap();
    session.set_second(0).unwrap();

    let expected = [
        frame("SETDATEYY", &[23]),
        frame("SETDATEMM", &[6]),
        frame("SETDATEDD", &[15]),
        frame("SETTIMEHH", &[10]),
        frame("SETTIMEMM", &[30]),
        frame("SETTIMESS", &[0]),
    ]
    .concat();
    assert_eq!(mock.written(), expected);
}

#[test]
fn test_rejected_setter_values_send_nothing() {
    let (session, mock) = session_with_reply(&[]);
    assert!(matches!(session.set_month(0), Err(ProtocolError::Validation { .. })));
    assert!(matches!(session.set_month(13), Err(ProtocolError::Validation { .. })));
    assert!(matches!(session.set_day(32), Err(ProtocolError::Validation { .. })));
    assert!(matches!(session.set_hour(24), Err(ProtocolError::Validation { .. })));
    assert!(matches!(session.set_minute(60), Err(ProtocolError::Validation { .. })));
    assert!(matches!(session.set_second(60), Err(ProtocolError::Validation { .. })));
    assert!(matches!(session.send_key(4), Err(ProtocolError::Validation { .. })));
    assert!(mock.written().is_empty());
}

#[test]
fn test_set_datetime() {
    let (session, mock) = session_with_reply(&[0xAA]);
    let dt = NaiveDate::from_ymd_opt(2023, 6, 15)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap();
    session.set_datetime(dt).unwrap();
    assert_eq!(mock.written(), frame("SETDATETIME", &[23, 6, 15, 10, 30, 0]));

    let old = NaiveDate::from_ymd_opt(1999, 12, 31)
        .unwrap()
        .and_hms_opt(23, 59, 59)
        .unwrap();
    assert!(matches!(
        session.set_datetime(old),
        Err(ProtocolError::Validation { parameter: "year", .. })
    ));
}

#[test]
fn test_set_datetime_rejects_impossible_dates() {
    let (session, mock) = session_with_reply(&[]);
    assert!(matches!(
        session.invoke(&commands::SETDATETIME, &[23, 2, 30, 0, 0, 0]),
        Err(ProtocolError::InvalidDate(_))
    ));
    assert!(mock.written().is_empty());
}

#[test]
fn test_write_configuration_frame() {
    let (session, mock) = session_with_reply(&[0xAA, 0xAA]);
    session.write_configuration(0x08, 0x01).unwrap();
    session.update_configuration().unwrap();
    assert_eq!(
        mock.written(),
        [frame("WCFG", &[0x08, 0x01]), frame("CFGUPDATE", &[])].concat()
    );
}

#[test]
fn test_fire_and_forget_commands_do_not_read() {
    let (session, mock) = session_with_reply(&[0x01]);
    session.power_off().unwrap();
    session.power_on().unwrap();
    session.reboot().unwrap();
    session.send_key(2).unwrap();
    assert_eq!(mock.pending(), 1);
    assert_eq!(
        mock.written(),
        [
            frame("POWEROFF", &[]),
            frame("POWERON", &[]),
            frame("REBOOT", &[]),
            frame("SENDKEY", &[2]),
        ]
        .concat()
    );
}

#[test]
fn test_write_failure_propagates() {
    let (session, mock) = session_with_reply(&[]);
    mock.fail_writes();
    assert!(matches!(session.reboot(), Err(ProtocolError::IoError(_))));
}

#[test]
fn test_wrong_parameter_count() {
    let (session, mock) = session_with_reply(&[]);
    assert!(matches!(
        session.invoke(&commands::WCFG, &[1]),
        Err(ProtocolError::ParameterCount {
            command: "WCFG",
            expected: 2,
            actual: 1
        })
    ));
    assert!(mock.written().is_empty());
}

//! Command registry
//!
//! Every operation of the GQ-RFC1201 protocol supported by GMC-280/300/320
//! units, as immutable descriptors.

use super::codec::{Decoder, Encoder, Verifier};
use super::descriptor::CommandDescriptor;
use super::{CONFIGURATION_LEN, SERIAL_NUMBER_LEN, VERSION_LEN};

const FW_GMC_2_0: &str = "GMC-280, GMC-300 Re.2.0x, Re.2.10 or later";
const FW_GMC_2_10: &str = "GMC-280, GMC-300 Re.2.10 or later";
const FW_GMC_2_11: &str = "GMC-280, GMC-300 Re.2.11 or later";
const FW_GMC_2_23: &str = "GMC-280, GMC-300 Re.2.23 or later";
const FW_GMC_3_00: &str = "GMC-280, GMC-300 Re.3.00 or later";
const FW_GMC_320: &str = "GMC-320 Re.3.01 or later";

const fn field_setter(
    name: &'static str,
    description: &'static str,
    parameter: &'static str,
    min: i64,
    max: i64,
) -> CommandDescriptor {
    CommandDescriptor::new(name, description, FW_GMC_2_23)
        .with_encoder(Encoder::Field)
        .with_decoder(Decoder::Ack)
        .with_verifier(Verifier::Range {
            parameter,
            min,
            max,
        })
}

/// Hardware model and version, 14 ASCII bytes
pub const GETVER: CommandDescriptor =
    CommandDescriptor::new("GETVER", "Get hardware model and version.", FW_GMC_2_0)
        .with_decoder(Decoder::Text(VERSION_LEN));

/// Current counts per minute
pub const GETCPM: CommandDescriptor =
    CommandDescriptor::new("GETCPM", "Get current CPM value.", FW_GMC_2_0)
        .with_decoder(Decoder::UInt16);

/// Start sending one CPS reading per second
pub const HEARTBEAT_ON: CommandDescriptor = CommandDescriptor::new(
    "HEARTBEAT1",
    "Turn on the heartbeat: one count-per-second reading every second.",
    FW_GMC_2_0,
);

/// Stop the heartbeat stream
pub const HEARTBEAT_OFF: CommandDescriptor =
    CommandDescriptor::new("HEARTBEAT0", "Turn off the heartbeat.", FW_GMC_2_0);

/// Battery voltage in tenths of a volt
pub const GETVOLT: CommandDescriptor = CommandDescriptor::new(
    "GETVOLT",
    "One byte voltage value of battery (x 10V).",
    FW_GMC_2_0,
)
.with_decoder(Decoder::Byte);

/// Read `length` bytes of history data starting at a 24-bit address
pub const SPIR: CommandDescriptor = CommandDescriptor::new(
    "SPIR",
    "Read history data: three address bytes (MSB first) followed by a 16-bit length.",
    "GMC-300 Re.2.0x, Re.2.10 or later",
)
.with_encoder(Encoder::Spir)
.with_decoder(Decoder::RequestedBlock);

/// Full 256-byte configuration block
pub const GETCFG: CommandDescriptor = CommandDescriptor::new(
    "GETCFG",
    "The configuration data. Total 256 bytes will be returned.",
    FW_GMC_2_10,
)
.with_decoder(Decoder::Block(CONFIGURATION_LEN));

/// Erase all configuration data
pub const ECFG: CommandDescriptor =
    CommandDescriptor::new("ECFG", "Erase all configuration data.", FW_GMC_2_10)
        .with_decoder(Decoder::Ack);

/// Write one configuration byte
pub const WCFG: CommandDescriptor = CommandDescriptor::new(
    "WCFG",
    "Write configuration byte: one address byte followed by one data byte.",
    FW_GMC_2_10,
)
.with_encoder(Encoder::ConfigWrite)
.with_decoder(Decoder::Ack);

/// Serial number, 7 ASCII bytes
pub const GETSERIAL: CommandDescriptor =
    CommandDescriptor::new("GETSERIAL", "Serial number in 7 bytes.", FW_GMC_2_11)
        .with_decoder(Decoder::Text(SERIAL_NUMBER_LEN));

/// Power the unit off
pub const POWEROFF: CommandDescriptor =
    CommandDescriptor::new("POWEROFF", "Power off.", FW_GMC_2_11);

/// Reload configuration from written data
pub const CFGUPDATE: CommandDescriptor = CommandDescriptor::new(
    "CFGUPDATE",
    "Reload/Update/Refresh configuration.",
    "GMC-280, GMC-300 Re.2.20 or later",
)
.with_decoder(Decoder::Ack);

/// Reset the unit to factory defaults
pub const FACTORYRESET: CommandDescriptor =
    CommandDescriptor::new("FACTORYRESET", "Reset unit to factory default.", FW_GMC_3_00)
        .with_decoder(Decoder::Ack);

/// Reboot the unit
pub const REBOOT: CommandDescriptor = CommandDescriptor::new("REBOOT", "Reboot unit.", FW_GMC_3_00);

/// Real time clock reading
pub const GETDATETIME: CommandDescriptor =
    CommandDescriptor::new("GETDATETIME", "Get year, date and time.", FW_GMC_3_00)
        .with_decoder(Decoder::DateTime);

/// Internal temperature
pub const GETTEMP: CommandDescriptor =
    CommandDescriptor::new("GETTEMP", "Get temperature.", FW_GMC_320)
        .with_decoder(Decoder::Temperature);

/// Power the unit on
pub const POWERON: CommandDescriptor = CommandDescriptor::new(
    "POWERON",
    "Power on.",
    "GMC-280, GMC-300, GMC-320 Re.3.10 or later",
);

/// Gyroscope x, y, z
pub const GETGYRO: CommandDescriptor =
    CommandDescriptor::new("GETGYRO", "Get gyroscope data.", FW_GMC_320)
        .with_decoder(Decoder::Gyro);

/// Simulate a press of soft key 0..=3
pub const SENDKEY: CommandDescriptor = CommandDescriptor::new(
    "SENDKEY",
    "Send a key press to the unit.",
    "GMC-300 Re.2.0x, Re.2.10 or later",
)
.with_encoder(Encoder::Key);

/// Set clock year (offset from 2000)
pub const SETDATEYY: CommandDescriptor =
    field_setter("SETDATEYY", "Set realtime clock year.", "year", 0, 255);

/// Set clock month
pub const SETDATEMM: CommandDescriptor =
    field_setter("SETDATEMM", "Set realtime clock month.", "month", 1, 12);

/// Set clock day
pub const SETDATEDD: CommandDescriptor =
    field_setter("SETDATEDD", "Set realtime clock day.", "day", 1, 31);

/// Set clock hour
pub const SETTIMEHH: CommandDescriptor =
    field_setter("SETTIMEHH", "Set realtime clock hour.", "hour", 0, 23);

/// Set clock minute
pub const SETTIMEMM: CommandDescriptor =
    field_setter("SETTIMEMM", "Set realtime clock minute.", "minute", 0, 59);

/// Set clock second
pub const SETTIMESS: CommandDescriptor =
    field_setter("SETTIMESS", "Set realtime clock second.", "second", 0, 59);

/// Set the whole clock at once
pub const SETDATETIME: CommandDescriptor =
    CommandDescriptor::new("SETDATETIME", "Set year, date and time.", FW_GMC_3_00)
        .with_encoder(Encoder::DateTime)
        .with_decoder(Decoder::Ack)
        .with_verifier(Verifier::CalendarDate);

/// Every known command
pub static ALL_COMMANDS: &[CommandDescriptor] = &[
    GETVER,
    GETCPM,
    HEARTBEAT_ON,
    HEARTBEAT_OFF,
    GETVOLT,
    SPIR,
    GETCFG,
    ECFG,
    WCFG,
    GETSERIAL,
    POWEROFF,
    CFGUPDATE,
    FACTORYRESET,
    REBOOT,
    GETDATETIME,
    GETTEMP,
    POWERON,
    GETGYRO,
    SENDKEY,
    SETDATEYY,
    SETDATEMM,
    SETDATEDD,
    SETTIMEHH,
    SETTIMEMM,
    SETTIMESS,
    SETDATETIME,
];

/// Look up a command by its wire name
pub fn find(name: &str) -> Option<&'static CommandDescriptor> {
    ALL_COMMANDS.iter().find(|c| c.name() == name)
}

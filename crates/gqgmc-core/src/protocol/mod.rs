//! Serial Protocol Communication
//!
//! Implements the GQ-RFC1201 command protocol spoken by GQ GMC Geiger
//! counters. Requests are framed as `<NAME[params]>>`; write-type commands
//! are acknowledged with a single `0xAA` byte.

pub mod codec;
pub mod commands;
mod config;
mod descriptor;
mod error;
mod heartbeat;
pub mod probe;
pub mod serial;
mod session;
mod transport;

pub use codec::{Decoder, Encoder, Response, Verifier};
pub use config::SessionConfig;
pub use descriptor::CommandDescriptor;
pub use error::ProtocolError;
pub use probe::detect_baud_rate;
pub use serial::{list_ports, open_port, PortInfo, SerialTransport};
pub use session::{Session, SessionState};
pub use transport::Transport;

/// Acknowledgement byte returned by write-type commands
pub const ACK_BYTE: u8 = 0xAA;

/// Length of the GETVER reply
pub const VERSION_LEN: usize = 14;

/// Length of the GETSERIAL reply
pub const SERIAL_NUMBER_LEN: usize = 7;

/// Length of the GETCFG reply
pub const CONFIGURATION_LEN: usize = 256;

/// Heartbeat readings carry the count in the low 14 bits
pub const HEARTBEAT_MASK: u16 = 0x3FFF;

/// Supported baud rates, in probing order (fastest first)
pub const BAUD_RATES: &[u32] = &[
    115200, 57600, 38400, 28800, 19200, 14400, 9600, 4800, 2400, 1200,
];

/// Default delay before reading the GETVER reply while probing
pub const DEFAULT_PROBE_DELAY_MS: u64 = 100;

/// Wait after HEARTBEAT0 for a reading already on the wire before the input
/// buffer is cleared
pub const HEARTBEAT_DRAIN_MS: u64 = 50;

/// Serial read poll interval; reads themselves never time out
pub const POLL_TIMEOUT_MS: u64 = 100;

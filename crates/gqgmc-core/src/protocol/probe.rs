//! Baud-rate detection
//!
//! Tries each supported rate from fastest to slowest, sends GETVER and accepts
//! the first rate at which a complete version string comes back.

use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::commands::GETVER;
use super::{ProtocolError, Transport, BAUD_RATES, VERSION_LEN};

/// Find the baud rate the unit is configured for.
///
/// `open` is called once per candidate rate; a failure to open at one rate is
/// logged and the next rate is tried.
pub fn detect_baud_rate<T, F>(mut open: F, reply_delay: Duration) -> Result<u32, ProtocolError>
where
    T: Transport,
    F: FnMut(u32) -> Result<T, ProtocolError>,
{
    let request = GETVER.encode(&[])?;

    for &rate in BAUD_RATES {
        let mut transport = match open(rate) {
            Ok(t) => t,
            Err(e) => {
                warn!(rate, error = %e, "could not open transport");
                continue;
            }
        };

        if let Err(e) = transport.write_all(&request) {
            warn!(rate, error = %e, "GETVER write failed");
            continue;
        }
        thread::sleep(reply_delay);

        match transport.read_available() {
            Ok(reply) if reply.len() == VERSION_LEN => {
                info!(rate, version = %String::from_utf8_lossy(&reply), "baud rate detected");
                return Ok(rate);
            }
            Ok(reply) => debug!(rate, received = reply.len(), "no version reply"),
            Err(e) => warn!(rate, error = %e, "read failed"),
        }
    }

    Err(ProtocolError::BaudRateNotDetected)
}

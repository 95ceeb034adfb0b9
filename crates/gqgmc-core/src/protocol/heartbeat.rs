//! Heartbeat streaming
//!
//! With HEARTBEAT1 active the unit sends one 16-bit reading per second. A
//! dedicated thread decodes them and hands each to a user callback until the
//! shared run flag is cleared.
//!
//! Stopping is cooperative: the flag is only checked between reads, so the
//! thread exits after the next frame arrives (or the transport fails). A stop
//! request therefore lags by up to one heartbeat interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use super::codec::{Decoder, Response};
use super::commands::HEARTBEAT_ON;
use super::{ProtocolError, Transport, HEARTBEAT_MASK};

/// Transport shared between the session and its heartbeat thread
pub(crate) type SharedTransport = Arc<Mutex<Box<dyn Transport>>>;

/// A running heartbeat thread
pub(crate) struct Heartbeat {
    keep_running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Heartbeat {
    /// Spawn the reader thread. HEARTBEAT1 must already have been sent.
    pub(crate) fn spawn<F>(transport: SharedTransport, callback: F) -> Result<Self, ProtocolError>
    where
        F: FnMut(u16) + Send + 'static,
    {
        let keep_running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&keep_running);
        let handle = thread::Builder::new()
            .name("gmc-heartbeat".to_string())
            .spawn(move || run(&transport, &flag, callback))?;

        Ok(Self {
            keep_running,
            handle,
        })
    }

    /// True once the thread has exited on its own (transport error)
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Clear the run flag and wait for the thread to exit
    pub(crate) fn stop(self) {
        self.keep_running.store(false, Ordering::Release);
        if self.handle.join().is_err() {
            warn!("heartbeat thread panicked");
        }
    }
}

fn run<F>(transport: &Mutex<Box<dyn Transport>>, keep_running: &AtomicBool, mut callback: F)
where
    F: FnMut(u16),
{
    while keep_running.load(Ordering::Acquire) {
        // Release the transport before running the callback.
        let reading = match transport.lock() {
            Ok(mut guard) => Decoder::UInt16.decode(HEARTBEAT_ON.name(), &mut *guard, &[]),
            Err(e) => Err(ProtocolError::TransportPoisoned(e.to_string())),
        };

        match reading {
            Ok(Response::UInt16(value)) => {
                let value = value & HEARTBEAT_MASK;
                debug!(value, "heartbeat");
                callback(value);
            }
            Ok(other) => {
                warn!(response = ?other, "unexpected heartbeat reply");
                break;
            }
            Err(e) => {
                warn!(error = %e, "heartbeat stream ended");
                break;
            }
        }
    }
}

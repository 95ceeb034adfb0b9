//! Scripted transport shared by the integration tests

#![allow(dead_code)]

use gqgmc_core::protocol::{ProtocolError, Transport};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Default)]
pub struct MockState {
    /// Everything written by the session
    pub written: Vec<u8>,
    /// Bytes the "device" has queued for reading
    pub replies: VecDeque<u8>,
    /// Served on every read once `replies` is empty, after a short delay
    pub endless: Option<Vec<u8>>,
    /// Delay before each `endless` frame
    pub frame_interval: Duration,
    /// Bytes that land in `replies` some time after the next write
    pub in_flight: Option<(Duration, Vec<u8>)>,
    pub fail_on_write: bool,
    pub clears: usize,
}

/// Mock transport; clones share state so tests can inspect it after handing
/// one copy to a session
#[derive(Clone, Default)]
pub struct MockTransport {
    pub state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(reply: &[u8]) -> Self {
        let mock = Self::new();
        mock.push_reply(reply);
        mock
    }

    /// Device that keeps emitting `frame` roughly every few milliseconds
    pub fn streaming(frame: &[u8]) -> Self {
        Self::streaming_every(frame, Duration::from_millis(5))
    }

    /// Device that emits `frame` once per `interval`
    pub fn streaming_every(frame: &[u8], interval: Duration) -> Self {
        let mock = Self::new();
        {
            let mut state = mock.state.lock().unwrap();
            state.endless = Some(frame.to_vec());
            state.frame_interval = interval;
        }
        mock
    }

    /// After the next write, `bytes` arrive once `delay` has passed
    pub fn deliver_after_next_write(&self, delay: Duration, bytes: &[u8]) {
        self.state.lock().unwrap().in_flight = Some((delay, bytes.to_vec()));
    }

    pub fn push_reply(&self, reply: &[u8]) {
        self.state.lock().unwrap().replies.extend(reply.iter().copied());
    }

    pub fn written(&self) -> Vec<u8> {
        self.state.lock().unwrap().written.clone()
    }

    pub fn pending(&self) -> usize {
        self.state.lock().unwrap().replies.len()
    }

    pub fn fail_writes(&self) {
        self.state.lock().unwrap().fail_on_write = true;
    }
}

impl Transport for MockTransport {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on_write {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "Serial write failed").into());
        }
        state.written.extend_from_slice(bytes);
        if let Some((delay, late)) = state.in_flight.take() {
            let shared = Arc::clone(&self.state);
            thread::spawn(move || {
                thread::sleep(delay);
                shared.lock().unwrap().replies.extend(late);
            });
        }
        Ok(())
    }

    fn read_exact(&mut self, len: usize) -> Result<Vec<u8>, ProtocolError> {
        let (endless, interval) = {
            let mut state = self.state.lock().unwrap();
            if state.replies.len() >= len {
                return Ok(state.replies.drain(..len).collect());
            }
            (state.endless.clone(), state.frame_interval)
        };

        match endless {
            Some(frame) if frame.len() == len => {
                thread::sleep(interval);
                Ok(frame)
            }
            _ => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "EOF").into()),
        }
    }

    fn read_available(&mut self) -> Result<Vec<u8>, ProtocolError> {
        Ok(self.state.lock().unwrap().replies.drain(..).collect())
    }

    fn clear_input(&mut self) -> Result<(), ProtocolError> {
        let mut state = self.state.lock().unwrap();
        state.replies.clear();
        state.clears += 1;
        Ok(())
    }
}

/// Request frame as the device would see it
pub fn frame(name: &str, payload: &[u8]) -> Vec<u8> {
    let mut bytes = format!("<{}", name).into_bytes();
    bytes.extend_from_slice(payload);
    bytes.extend_from_slice(b">>");
    bytes
}

/// Route library logs to the test harness; RUST_LOG controls verbosity
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

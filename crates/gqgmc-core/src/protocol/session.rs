//! Device session
//!
//! A [`Session`] owns the transport to one unit and serializes access to it.
//! Ordinary commands are short request/reply exchanges and only check that
//! the session is not locked. Heartbeat streaming locks the session for as
//! long as its background thread runs.

use chrono::{Datelike, NaiveDateTime, Timelike};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::codec::Response;
use super::commands;
use super::descriptor::CommandDescriptor;
use super::heartbeat::{Heartbeat, SharedTransport};
use super::probe::detect_baud_rate;
use super::serial::SerialTransport;
use super::{ProtocolError, SessionConfig, Transport, HEARTBEAT_DRAIN_MS};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Ready for commands
    Idle,
    /// Heartbeat streaming owns the transport
    Locked,
}

/// Handle to one GQ GMC unit
pub struct Session {
    transport: SharedTransport,
    locked: AtomicBool,
    heartbeat: Mutex<Option<Heartbeat>>,
}

impl Session {
    /// Wrap an open transport
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        let transport: Box<dyn Transport> = Box::new(transport);
        Self {
            transport: Arc::new(Mutex::new(transport)),
            locked: AtomicBool::new(false),
            heartbeat: Mutex::new(None),
        }
    }

    /// Open the configured serial port, probing the baud rate if none is set
    pub fn open(config: &SessionConfig) -> Result<Self, ProtocolError> {
        let baud_rate = match config.baud_rate {
            Some(rate) => rate,
            None => detect_baud_rate(
                |rate| SerialTransport::open(&config.port_name, rate),
                Duration::from_millis(config.probe_delay_ms),
            )?,
        };

        let transport = SerialTransport::open(&config.port_name, baud_rate)?;
        let baud_rate = transport.baud_rate()?;
        info!(port = %config.port_name, baud_rate, "session opened");
        Ok(Self::new(transport))
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        if self.is_locked() {
            SessionState::Locked
        } else {
            SessionState::Idle
        }
    }

    /// True while heartbeat streaming holds the session
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// True if a heartbeat thread is held, even if it already exited after a
    /// transport error
    pub fn has_heartbeat(&self) -> bool {
        self.heartbeat
            .lock()
            .map(|h| h.is_some())
            .unwrap_or(false)
    }

    /// True if the heartbeat thread exited on its own and is waiting to be
    /// collected by [`Session::disable_heartbeat`]
    pub fn heartbeat_ended(&self) -> bool {
        self.heartbeat
            .lock()
            .map(|h| h.as_ref().map(Heartbeat::is_finished).unwrap_or(false))
            .unwrap_or(false)
    }

    /// Run any command against the unit
    pub fn invoke(
        &self,
        command: &CommandDescriptor,
        params: &[i64],
    ) -> Result<Response, ProtocolError> {
        if self.is_locked() {
            return Err(ProtocolError::Locked);
        }
        let mut transport = self
            .transport
            .lock()
            .map_err(|e| ProtocolError::TransportPoisoned(e.to_string()))?;
        command.execute(&mut *transport, params).inspect_err(|e| {
            if e.is_rejected_before_io() {
                debug!(command = command.name(), error = %e, "command rejected");
            } else {
                warn!(command = command.name(), error = %e, "command failed");
            }
        })
    }

    fn invoke_expecting<R>(
        &self,
        command: &CommandDescriptor,
        params: &[i64],
        extract: impl FnOnce(Response) -> Option<R>,
    ) -> Result<R, ProtocolError> {
        let response = self.invoke(command, params)?;
        let kind = response.kind();
        extract(response).ok_or_else(|| ProtocolError::MalformedResponse {
            command: command.name(),
            reason: format!("unexpected {} response", kind),
        })
    }

    fn invoke_unit(&self, command: &CommandDescriptor, params: &[i64]) -> Result<(), ProtocolError> {
        self.invoke(command, params).map(|_| ())
    }

    /// Hardware model and firmware version
    pub fn get_version(&self) -> Result<String, ProtocolError> {
        self.invoke_expecting(&commands::GETVER, &[], Response::into_text)
    }

    /// Current counts per minute
    pub fn get_counts_per_minute(&self) -> Result<u16, ProtocolError> {
        self.invoke_expecting(&commands::GETCPM, &[], |r| r.as_u16())
    }

    /// Raw battery voltage in tenths of a volt
    pub fn get_voltage(&self) -> Result<u8, ProtocolError> {
        self.invoke_expecting(&commands::GETVOLT, &[], |r| r.as_byte())
    }

    /// 256-byte configuration block
    pub fn get_configuration(&self) -> Result<Vec<u8>, ProtocolError> {
        self.invoke_expecting(&commands::GETCFG, &[], Response::into_block)
    }

    /// Device clock
    pub fn get_datetime(&self) -> Result<NaiveDateTime, ProtocolError> {
        self.invoke_expecting(&commands::GETDATETIME, &[], |r| r.as_timestamp())
    }

    /// Serial number
    pub fn get_serial(&self) -> Result<String, ProtocolError> {
        self.invoke_expecting(&commands::GETSERIAL, &[], Response::into_text)
    }

    /// Temperature in degrees Celsius
    pub fn get_temperature(&self) -> Result<f64, ProtocolError> {
        self.invoke_expecting(&commands::GETTEMP, &[], |r| r.as_float())
    }

    /// Gyroscope (x, y, z)
    pub fn get_gyro(&self) -> Result<(u16, u16, u16), ProtocolError> {
        self.invoke_expecting(&commands::GETGYRO, &[], |r| r.as_triple())
    }

    /// Read `length` bytes of history data from a 24-bit address
    pub fn get_history_data(&self, address: u32, length: u16) -> Result<Vec<u8>, ProtocolError> {
        self.invoke_expecting(
            &commands::SPIR,
            &[address as i64, length as i64],
            Response::into_block,
        )
    }

    /// Erase all configuration data
    pub fn erase_configuration(&self) -> Result<(), ProtocolError> {
        self.invoke_unit(&commands::ECFG, &[])
    }

    /// Write one configuration byte. Call [`Session::update_configuration`]
    /// afterwards to make the unit apply it.
    pub fn write_configuration(&self, address: u8, value: u8) -> Result<(), ProtocolError> {
        self.invoke_unit(&commands::WCFG, &[address as i64, value as i64])
    }

    /// Reload configuration
    pub fn update_configuration(&self) -> Result<(), ProtocolError> {
        self.invoke_unit(&commands::CFGUPDATE, &[])
    }

    /// Reset to factory defaults
    pub fn factory_reset(&self) -> Result<(), ProtocolError> {
        self.invoke_unit(&commands::FACTORYRESET, &[])
    }

    /// Power off
    pub fn power_off(&self) -> Result<(), ProtocolError> {
        self.invoke_unit(&commands::POWEROFF, &[])
    }

    /// Power on
    pub fn power_on(&self) -> Result<(), ProtocolError> {
        self.invoke_unit(&commands::POWERON, &[])
    }

    /// Reboot
    pub fn reboot(&self) -> Result<(), ProtocolError> {
        self.invoke_unit(&commands::REBOOT, &[])
    }

    /// Press soft key 0..=3
    pub fn send_key(&self, key: u8) -> Result<(), ProtocolError> {
        self.invoke_unit(&commands::SENDKEY, &[key as i64])
    }

    /// Set clock year as an offset from 2000
    pub fn set_year(&self, year: u8) -> Result<(), ProtocolError> {
        self.invoke_unit(&commands::SETDATEYY, &[year as i64])
    }

    /// Set clock month (1-12)
    pub fn set_month(&self, month: u8) -> Result<(), ProtocolError> {
        self.invoke_unit(&commands::SETDATEMM, &[month as i64])
    }

    /// Set clock day (1-31)
    pub fn set_day(&self, day: u8) -> Result<(), ProtocolError> {
        self.invoke_unit(&commands::SETDATEDD, &[day as i64])
    }

    /// Set clock hour (0-23)
    pub fn set_hour(&self, hour: u8) -> Result<(), ProtocolError> {
        self.invoke_unit(&commands::SETTIMEHH, &[hour as i64])
    }

    /// Set clock minute (0-59)
    pub fn set_minute(&self, minute: u8) -> Result<(), ProtocolError> {
        self.invoke_unit(&commands::SETTIMEMM, &[minute as i64])
    }

    /// Set clock second (0-59)
    pub fn set_second(&self, second: u8) -> Result<(), ProtocolError> {
        self.invoke_unit(&commands::SETTIMESS, &[second as i64])
    }

    /// Set the whole clock. The unit stores years 2000..=2255.
    pub fn set_datetime(&self, datetime: NaiveDateTime) -> Result<(), ProtocolError> {
        let year = datetime.year() as i64;
        if !(2000..=2255).contains(&year) {
            return Err(ProtocolError::Validation {
                parameter: "year",
                value: year,
                min: 2000,
                max: 2255,
            });
        }
        self.invoke_unit(
            &commands::SETDATETIME,
            &[
                year - 2000,
                datetime.month() as i64,
                datetime.day() as i64,
                datetime.hour() as i64,
                datetime.minute() as i64,
                datetime.second() as i64,
            ],
        )
    }

    /// Start heartbeat streaming and lock the session.
    ///
    /// `callback` runs on a background thread with each reading (low 14
    /// bits of the counter). Fails with [`ProtocolError::Locked`] if a
    /// heartbeat is already active.
    pub fn enable_heartbeat<F>(&self, callback: F) -> Result<(), ProtocolError>
    where
        F: FnMut(u16) + Send + 'static,
    {
        if self
            .locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ProtocolError::Locked);
        }

        match self.start_heartbeat(callback) {
            Ok(()) => {
                info!("heartbeat enabled");
                Ok(())
            }
            Err(e) => {
                self.locked.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    fn start_heartbeat<F>(&self, callback: F) -> Result<(), ProtocolError>
    where
        F: FnMut(u16) + Send + 'static,
    {
        let mut slot = self
            .heartbeat
            .lock()
            .map_err(|e| ProtocolError::TransportPoisoned(e.to_string()))?;
        {
            let mut transport = self
                .transport
                .lock()
                .map_err(|e| ProtocolError::TransportPoisoned(e.to_string()))?;
            commands::HEARTBEAT_ON.execute(&mut *transport, &[])?;
        }
        match Heartbeat::spawn(Arc::clone(&self.transport), callback) {
            Ok(heartbeat) => {
                *slot = Some(heartbeat);
                Ok(())
            }
            Err(e) => Err(self.abort_start(e)),
        }
    }

    /// HEARTBEAT1 went out but no reader thread exists; silence the unit
    /// before handing back `error`
    fn abort_start(&self, error: ProtocolError) -> ProtocolError {
        if let Err(e) = self.stop_streaming() {
            warn!(error = %e, "failed to stop streaming after aborted start");
        }
        error
    }

    /// Send HEARTBEAT0, let any reading still in flight arrive, then drop
    /// everything buffered
    fn stop_streaming(&self) -> Result<(), ProtocolError> {
        let mut transport = self
            .transport
            .lock()
            .map_err(|e| ProtocolError::TransportPoisoned(e.to_string()))?;
        commands::HEARTBEAT_OFF.execute(&mut *transport, &[])?;
        thread::sleep(Duration::from_millis(HEARTBEAT_DRAIN_MS));
        transport.clear_input()
    }

    /// Stop heartbeat streaming and unlock the session.
    ///
    /// Blocks until the background thread has exited, which may take up to
    /// one more heartbeat frame. Does nothing if no heartbeat is active.
    pub fn disable_heartbeat(&self) -> Result<(), ProtocolError> {
        // Held until the lock is released so a concurrent call waits for
        // this one instead of returning while the session is still locked.
        let mut slot = self
            .heartbeat
            .lock()
            .map_err(|e| ProtocolError::TransportPoisoned(e.to_string()))?;
        let Some(heartbeat) = slot.take() else {
            return Ok(());
        };

        heartbeat.stop();
        let result = self.stop_streaming();

        self.locked.store(false, Ordering::Release);
        info!("heartbeat disabled");
        result
    }

    /// Stop any heartbeat and release the transport
    pub fn close(self) -> Result<(), ProtocolError> {
        self.disable_heartbeat()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.disable_heartbeat() {
            debug!(error = %e, "heartbeat shutdown failed while closing session");
        }
        debug!("session closed");
    }
}

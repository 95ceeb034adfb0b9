//! Serial port handling
//!
//! Provides low-level serial port access for GQ GMC units and the
//! [`Transport`] adapter used by sessions.

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::fs;
use std::io::{self, Read, Write};
use std::time::Duration;

use super::{ProtocolError, Transport, POLL_TIMEOUT_MS};

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyUSB0" or "COM3")
    pub name: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Product name (if available)
    pub product: Option<String>,
}

impl PortInfo {
    fn bare(name: String) -> Self {
        Self {
            name,
            vid: None,
            pid: None,
            product: None,
        }
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb_info) => Self {
                name: info.port_name,
                vid: Some(usb_info.vid),
                pid: Some(usb_info.pid),
                product: usb_info.product,
            },
            _ => Self::bare(info.port_name),
        }
    }
}

/// USB vendor ID of the WCH CH340 bridge fitted to GMC-280/300/320 units
pub const CH340_VID: u16 = 0x1A86;

impl PortInfo {
    /// True if the port sits behind the CH340 bridge GMC units use
    pub fn is_ch340(&self) -> bool {
        self.vid == Some(CH340_VID)
    }
}

/// Likely GMC ports first: CH340 bridges, then other ttyUSB*, then ttyACM*,
/// then everything else. Device numbers sort numerically.
fn port_rank(port: &PortInfo) -> (u8, usize, String) {
    let basename = port.name.rsplit('/').next().unwrap_or(&port.name);
    let number = |rest: &str| rest.parse::<usize>().unwrap_or(usize::MAX);
    let class = if port.is_ch340() {
        0
    } else if basename.starts_with("ttyUSB") {
        1
    } else if basename.starts_with("ttyACM") {
        2
    } else {
        3
    };
    let index = basename
        .strip_prefix("ttyUSB")
        .or_else(|| basename.strip_prefix("ttyACM"))
        .map(number)
        .unwrap_or(0);
    (class, index, basename.to_string())
}

/// List serial ports, most likely GMC units first
pub fn list_ports() -> Vec<PortInfo> {
    let mut ports: HashMap<String, PortInfo> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(PortInfo::from)
        .map(|p| (p.name.clone(), p))
        .collect();

    // udev metadata can be missing for the CH340 node; fall back to /dev
    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        let nodes = entries
            .flatten()
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with("ttyUSB") || name.starts_with("ttyACM"));
        for node in nodes {
            let path = format!("/dev/{}", node);
            ports
                .entry(path.clone())
                .or_insert_with(|| PortInfo::bare(path));
        }
    }

    let mut ports: Vec<PortInfo> = ports.into_values().collect();
    ports.sort_by_key(port_rank);
    ports
}

/// Open a serial port configured 8N1 without flow control
pub fn open_port(name: &str, baud_rate: u32) -> Result<Box<dyn SerialPort>, ProtocolError> {
    serialport::new(name, baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(Duration::from_millis(POLL_TIMEOUT_MS))
        .open()
        .map_err(|e| match e.kind {
            serialport::ErrorKind::NoDevice => ProtocolError::PortNotFound(name.to_string()),
            _ => ProtocolError::SerialError(e.to_string()),
        })
}

/// Serial port wrapper implementing [`Transport`]
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Wrap an already opened port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }

    /// Open `name` at `baud_rate`
    pub fn open(name: &str, baud_rate: u32) -> Result<Self, ProtocolError> {
        open_port(name, baud_rate).map(Self::new)
    }

    /// Baud rate the port is currently running at
    pub fn baud_rate(&self) -> Result<u32, ProtocolError> {
        self.port
            .baud_rate()
            .map_err(|e| ProtocolError::SerialError(e.to_string()))
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        Write::write_all(&mut self.port, bytes)?;
        Write::flush(&mut self.port)?;
        Ok(())
    }

    fn read_exact(&mut self, len: usize) -> Result<Vec<u8>, ProtocolError> {
        let mut buffer = vec![0u8; len];
        let mut filled = 0;

        // The port timeout only bounds a single poll; keep polling until the
        // device delivers or the link fails.
        while filled < len {
            match self.port.read(&mut buffer[filled..]) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("serial port closed after {} of {} bytes", filled, len),
                    )
                    .into())
                }
                Ok(n) => filled += n,
                Err(ref e)
                    if e.kind() == io::ErrorKind::TimedOut
                        || e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(buffer)
    }

    fn read_available(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let available = self
            .port
            .bytes_to_read()
            .map_err(|e| ProtocolError::SerialError(e.to_string()))?;
        if available == 0 {
            return Ok(Vec::new());
        }

        let mut buffer = vec![0u8; available as usize];
        let n = match self.port.read(&mut buffer) {
            Ok(n) => n,
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => 0,
            Err(e) => return Err(e.into()),
        };
        buffer.truncate(n);
        Ok(buffer)
    }

    fn clear_input(&mut self) -> Result<(), ProtocolError> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|e| ProtocolError::SerialError(e.to_string()))
    }
}

//! Frame encoding, parameter verification and reply decoding
//!
//! Request frames are `<` + command name + raw parameter bytes + `>>`.
//! Multi-byte parameters and reply fields are big-endian.

use byteorder::{BigEndian, ByteOrder};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{ProtocolError, Transport, ACK_BYTE};

const FRAME_START: &[u8] = b"<";
const FRAME_END: &[u8] = b">>";

/// Field names of the SETDATETIME payload, in wire order
const DATETIME_FIELDS: [&str; 6] = ["year", "month", "day", "hour", "minute", "second"];

/// Build a request frame around an optional raw payload
pub fn frame(name: &str, payload: &[u8]) -> Vec<u8> {
    let mut bytes =
        Vec::with_capacity(FRAME_START.len() + name.len() + payload.len() + FRAME_END.len());
    bytes.extend_from_slice(FRAME_START);
    bytes.extend_from_slice(name.as_bytes());
    bytes.extend_from_slice(payload);
    bytes.extend_from_slice(FRAME_END);
    bytes
}

fn check_range(parameter: &'static str, value: i64, min: i64, max: i64) -> Result<i64, ProtocolError> {
    if value < min || value > max {
        return Err(ProtocolError::Validation {
            parameter,
            value,
            min,
            max,
        });
    }
    Ok(value)
}

fn check_byte(parameter: &'static str, value: i64) -> Result<u8, ProtocolError> {
    check_range(parameter, value, 0, 0xFF).map(|v| v as u8)
}

/// Decoded reply of a command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    /// ASCII text (version string, serial number)
    Text(String),
    /// Big-endian 16-bit value
    UInt16(u16),
    /// Single raw byte
    Byte(u8),
    /// Raw memory block (configuration or history data)
    Block(Vec<u8>),
    /// Device clock reading
    Timestamp(NaiveDateTime),
    /// Temperature in degrees Celsius
    Float(f64),
    /// Gyroscope x, y, z
    Triple(u16, u16, u16),
    /// Command has no reply
    None,
}

impl Response {
    /// Variant name, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Text(_) => "text",
            Response::UInt16(_) => "uint16",
            Response::Byte(_) => "byte",
            Response::Block(_) => "block",
            Response::Timestamp(_) => "timestamp",
            Response::Float(_) => "float",
            Response::Triple(..) => "triple",
            Response::None => "empty",
        }
    }

    /// Get as text, returning None for other variants
    pub fn into_text(self) -> Option<String> {
        match self {
            Response::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get as 16-bit value
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Response::UInt16(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as single byte
    pub fn as_byte(&self) -> Option<u8> {
        match self {
            Response::Byte(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as byte block
    pub fn into_block(self) -> Option<Vec<u8>> {
        match self {
            Response::Block(b) => Some(b),
            _ => None,
        }
    }

    /// Get as timestamp
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Response::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Response::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as (x, y, z)
    pub fn as_triple(&self) -> Option<(u16, u16, u16)> {
        match self {
            Response::Triple(x, y, z) => Some((*x, *y, *z)),
            _ => None,
        }
    }

    /// Check for the empty reply
    pub fn is_none(&self) -> bool {
        matches!(self, Response::None)
    }
}

/// How a command's parameters are laid out between name and terminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoder {
    /// `<NAME>>`
    NameOnly,
    /// 24-bit address followed by 16-bit length
    Spir,
    /// 8-bit configuration address followed by 8-bit value
    ConfigWrite,
    /// Soft key index 0..=3
    Key,
    /// One clock field byte, bounded by the descriptor's verifier
    Field,
    /// Year offset, month, day, hour, minute, second
    DateTime,
}

impl Encoder {
    /// Number of parameters the encoder consumes
    pub fn arity(&self) -> usize {
        match self {
            Encoder::NameOnly => 0,
            Encoder::Key | Encoder::Field => 1,
            Encoder::Spir | Encoder::ConfigWrite => 2,
            Encoder::DateTime => DATETIME_FIELDS.len(),
        }
    }

    /// Fail unless `params` holds exactly [`Encoder::arity`] values
    pub fn check_arity(&self, name: &'static str, params: &[i64]) -> Result<(), ProtocolError> {
        if params.len() != self.arity() {
            return Err(ProtocolError::ParameterCount {
                command: name,
                expected: self.arity(),
                actual: params.len(),
            });
        }
        Ok(())
    }

    /// Build the frame for `name`. Bounds are checked before anything is built.
    pub fn encode(&self, name: &'static str, params: &[i64]) -> Result<Vec<u8>, ProtocolError> {
        self.check_arity(name, params)?;
        Ok(frame(name, &self.payload(params)?))
    }

    /// Raw parameter bytes. The caller has already checked the arity.
    pub(crate) fn payload(&self, params: &[i64]) -> Result<Vec<u8>, ProtocolError> {
        let payload = match self {
            Encoder::NameOnly => Vec::new(),
            Encoder::Spir => {
                let address = check_range("address", params[0], 0, 0xFF_FFFF)?;
                let length = check_range("length", params[1], 0, 0xFFFF)?;
                let mut buf = [0u8; 5];
                BigEndian::write_u24(&mut buf[0..3], address as u32);
                BigEndian::write_u16(&mut buf[3..5], length as u16);
                buf.to_vec()
            }
            Encoder::ConfigWrite => {
                vec![
                    check_byte("address", params[0])?,
                    check_byte("value", params[1])?,
                ]
            }
            Encoder::Key => vec![check_range("key", params[0], 0, 3)? as u8],
            Encoder::Field => vec![check_byte("value", params[0])?],
            Encoder::DateTime => DATETIME_FIELDS
                .iter()
                .zip(params)
                .map(|(field, value)| check_byte(*field, *value))
                .collect::<Result<Vec<u8>, _>>()?,
        };
        Ok(payload)
    }
}

/// Parameter checks run before encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verifier {
    /// Accept anything; the encoder still enforces wire widths
    Any,
    /// Every parameter must lie within `min..=max`
    Range {
        parameter: &'static str,
        min: i64,
        max: i64,
    },
    /// Parameters form year offset (from 2000), month, day, hour, minute,
    /// second and must name a real calendar instant
    CalendarDate,
}

impl Verifier {
    /// Check every parameter, failing on the first violation
    pub fn verify(&self, params: &[i64]) -> Result<(), ProtocolError> {
        match self {
            Verifier::Any => Ok(()),
            Verifier::Range {
                parameter,
                min,
                max,
            } => params
                .iter()
                .try_for_each(|v| check_range(*parameter, *v, *min, *max).map(|_| ())),
            Verifier::CalendarDate => {
                let fields = DATETIME_FIELDS
                    .iter()
                    .zip(params)
                    .map(|(field, value)| check_byte(*field, *value))
                    .collect::<Result<Vec<u8>, _>>()?;
                match fields[..] {
                    [yy, mo, dd, hh, mi, ss] => {
                        calendar_instant(yy, mo, dd, hh, mi, ss)
                            .map(|_| ())
                            .ok_or_else(|| {
                                ProtocolError::InvalidDate(format!(
                                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                                    2000 + yy as i32,
                                    mo,
                                    dd,
                                    hh,
                                    mi,
                                    ss
                                ))
                            })
                    }
                    _ => Err(ProtocolError::InvalidDate(format!(
                        "expected {} fields, got {}",
                        DATETIME_FIELDS.len(),
                        fields.len()
                    ))),
                }
            }
        }
    }
}

fn calendar_instant(yy: u8, mo: u8, dd: u8, hh: u8, mi: u8, ss: u8) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2000 + yy as i32, mo as u32, dd as u32)?.and_hms_opt(
        hh as u32,
        mi as u32,
        ss as u32,
    )
}

/// How a command's reply is read and interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    /// Fixed-length ASCII text
    Text(usize),
    /// Big-endian 16-bit value
    UInt16,
    /// Single raw byte
    Byte,
    /// Fixed-length block
    Block(usize),
    /// Block whose length is the request's second parameter (SPIR)
    RequestedBlock,
    /// Single acknowledgement byte
    Ack,
    /// yy, mm, dd, hh, mm, ss, ack
    DateTime,
    /// integer part, fraction divisor, sign, ack
    Temperature,
    /// x, y, z (16-bit each), reserved, ack
    Gyro,
}

impl Decoder {
    /// Number of reply bytes the device sends for this request
    pub fn response_len(&self, params: &[i64]) -> usize {
        match self {
            Decoder::Text(len) | Decoder::Block(len) => *len,
            Decoder::UInt16 => 2,
            Decoder::Byte | Decoder::Ack => 1,
            Decoder::RequestedBlock => params.get(1).map(|l| *l as usize).unwrap_or(0),
            Decoder::DateTime => 7,
            Decoder::Temperature => 4,
            Decoder::Gyro => 8,
        }
    }

    /// Block until the whole reply has arrived, then interpret it
    pub fn decode<T: Transport + ?Sized>(
        &self,
        command: &'static str,
        transport: &mut T,
        params: &[i64],
    ) -> Result<Response, ProtocolError> {
        let bytes = transport.read_exact(self.response_len(params))?;
        self.parse(command, &bytes)
    }

    /// Interpret a complete reply
    pub fn parse(&self, command: &'static str, bytes: &[u8]) -> Result<Response, ProtocolError> {
        let expected = match self {
            Decoder::RequestedBlock => bytes.len(),
            other => other.response_len(&[]),
        };
        if bytes.len() != expected {
            return Err(malformed(
                command,
                format!("expected {} bytes, got {}", expected, bytes.len()),
            ));
        }

        match self {
            Decoder::Text(_) => {
                if !bytes.is_ascii() {
                    return Err(malformed(command, format!("non-ASCII text {:02x?}", bytes)));
                }
                Ok(Response::Text(String::from_utf8_lossy(bytes).into_owned()))
            }
            Decoder::UInt16 => Ok(Response::UInt16(BigEndian::read_u16(bytes))),
            Decoder::Byte => Ok(Response::Byte(bytes[0])),
            Decoder::Block(_) | Decoder::RequestedBlock => Ok(Response::Block(bytes.to_vec())),
            Decoder::Ack => {
                check_ack(command, bytes)?;
                Ok(Response::None)
            }
            Decoder::DateTime => {
                check_ack(command, bytes)?;
                calendar_instant(bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5])
                    .map(Response::Timestamp)
                    .ok_or_else(|| {
                        malformed(command, format!("impossible date/time {:?}", &bytes[..6]))
                    })
            }
            Decoder::Temperature => {
                check_ack(command, bytes)?;
                let (magnitude, divisor, sign) = (bytes[0], bytes[1], bytes[2]);
                if divisor == 0 {
                    return Err(malformed(command, "fraction divisor is zero".to_string()));
                }
                let value = magnitude as f64 + 1.0 / divisor as f64;
                Ok(Response::Float(if sign != 0 { -value } else { value }))
            }
            Decoder::Gyro => {
                check_ack(command, bytes)?;
                Ok(Response::Triple(
                    BigEndian::read_u16(&bytes[0..2]),
                    BigEndian::read_u16(&bytes[2..4]),
                    BigEndian::read_u16(&bytes[4..6]),
                ))
            }
        }
    }
}

fn malformed(command: &'static str, reason: String) -> ProtocolError {
    ProtocolError::MalformedResponse { command, reason }
}

/// The last byte of a validated reply must be the acknowledgement byte
fn check_ack(command: &'static str, bytes: &[u8]) -> Result<(), ProtocolError> {
    match bytes.last() {
        Some(&ACK_BYTE) => Ok(()),
        Some(&actual) => Err(ProtocolError::Verification {
            command,
            actual,
            expected: ACK_BYTE,
        }),
        None => Err(malformed(command, "empty reply".to_string())),
    }
}

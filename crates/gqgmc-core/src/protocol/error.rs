//! Protocol errors

use thiserror::Error;

/// Errors that can occur during protocol communication
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("{parameter} out of bounds: {min} <= {value} <= {max}")]
    Validation {
        parameter: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Not a valid calendar date/time: {0}")]
    InvalidDate(String),

    #[error("{command} expects {expected} parameter(s), got {actual}")]
    ParameterCount {
        command: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{command}: acknowledgement byte not received, {actual:#04x} != {expected:#04x}")]
    Verification {
        command: &'static str,
        actual: u8,
        expected: u8,
    },

    #[error("{command}: malformed response: {reason}")]
    MalformedResponse {
        command: &'static str,
        reason: String,
    },

    #[error("Device locked by another operation")]
    Locked,

    #[error("Can't determine baud rate: no candidate rate answered GETVER")]
    BaudRateNotDetected,

    #[error("Transport unavailable: {0}")]
    TransportPoisoned(String),

    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProtocolError {
    /// True for errors raised before any byte was written to the device
    pub fn is_rejected_before_io(&self) -> bool {
        matches!(
            self,
            ProtocolError::Validation { .. }
                | ProtocolError::InvalidDate(_)
                | ProtocolError::ParameterCount { .. }
                | ProtocolError::Locked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_bound() {
        let err = ProtocolError::Validation {
            parameter: "address",
            value: 0x1000000,
            min: 0,
            max: 0xFFFFFF,
        };
        assert_eq!(
            err.to_string(),
            "address out of bounds: 0 <= 16777216 <= 16777215"
        );
        assert!(err.is_rejected_before_io());
    }

    #[test]
    fn test_verification_message_reports_both_bytes() {
        let err = ProtocolError::Verification {
            command: "ECFG",
            actual: 0x55,
            expected: 0xAA,
        };
        let msg = err.to_string();
        assert!(msg.contains("0x55"));
        assert!(msg.contains("0xaa"));
        assert!(!err.is_rejected_before_io());
    }
}

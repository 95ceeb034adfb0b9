//! Session configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{ProtocolError, DEFAULT_PROBE_DELAY_MS};

/// How to reach a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Serial port name
    pub port_name: String,
    /// Baud rate; probed when absent
    pub baud_rate: Option<u32>,
    /// Time to let the unit answer GETVER during baud-rate probing
    pub probe_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: None,
            probe_delay_ms: DEFAULT_PROBE_DELAY_MS,
        }
    }
}

impl SessionConfig {
    /// Config for `port_name` with baud-rate probing
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Self::default()
        }
    }

    /// Use a fixed baud rate instead of probing
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }

    /// Parse from JSON text
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ProtocolError::Config(e.to_string()))?;
        if config.port_name.is_empty() {
            return Err(ProtocolError::Config("port_name must not be empty".to_string()));
        }
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProtocolError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }
}

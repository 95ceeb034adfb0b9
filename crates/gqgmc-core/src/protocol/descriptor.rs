//! Command descriptors
//!
//! A descriptor bundles everything needed to run one device operation: its
//! wire name, informational metadata and three strategy slots (encoder,
//! optional decoder, verifier). Descriptors are plain `const` values and never
//! change after construction.

use tracing::debug;

use super::codec::{frame, Decoder, Encoder, Response, Verifier};
use super::{ProtocolError, Transport};

/// Immutable definition of one device command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescriptor {
    name: &'static str,
    description: &'static str,
    firmware: &'static str,
    encoder: Encoder,
    decoder: Option<Decoder>,
    verifier: Verifier,
}

impl CommandDescriptor {
    /// Name-only command with no reply and no parameter checks
    pub const fn new(name: &'static str, description: &'static str, firmware: &'static str) -> Self {
        Self {
            name,
            description,
            firmware,
            encoder: Encoder::NameOnly,
            decoder: None,
            verifier: Verifier::Any,
        }
    }

    /// Set the reply decoder
    pub const fn with_decoder(mut self, decoder: Decoder) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Set the request encoder
    pub const fn with_encoder(mut self, encoder: Encoder) -> Self {
        self.encoder = encoder;
        self
    }

    /// Set the parameter verifier
    pub const fn with_verifier(mut self, verifier: Verifier) -> Self {
        self.verifier = verifier;
        self
    }

    /// Command name as sent on the wire
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Human readable description
    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Firmware revisions known to support the command (informational only)
    pub fn firmware(&self) -> &'static str {
        self.firmware
    }

    /// Request encoder
    pub fn encoder(&self) -> Encoder {
        self.encoder
    }

    /// Reply decoder, `None` for fire-and-forget commands
    pub fn decoder(&self) -> Option<Decoder> {
        self.decoder
    }

    /// Parameter verifier
    pub fn verifier(&self) -> Verifier {
        self.verifier
    }

    /// Verify `params` and build the request frame without touching a transport
    pub fn encode(&self, params: &[i64]) -> Result<Vec<u8>, ProtocolError> {
        self.encoder.check_arity(self.name, params)?;
        self.verifier.verify(params)?;
        Ok(frame(self.name, &self.encoder.payload(params)?))
    }

    /// Run the command: verify, encode, write the frame in one call, then
    /// decode the reply if the command has one.
    ///
    /// Nothing is written when verification fails. Reads block until the
    /// full reply has arrived.
    pub fn execute<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        params: &[i64],
    ) -> Result<Response, ProtocolError> {
        let request = self.encode(params)?;
        debug!(command = self.name, frame = ?String::from_utf8_lossy(&request), "> request");
        transport.write_all(&request)?;

        match self.decoder {
            Some(decoder) => {
                let response = decoder.decode(self.name, transport, params)?;
                debug!(command = self.name, ?response, "< reply");
                Ok(response)
            }
            None => Ok(Response::None),
        }
    }
}

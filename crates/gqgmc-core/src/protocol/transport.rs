//! Byte transport abstraction
//!
//! The protocol engine only needs three primitives from the link: write a
//! whole frame, block until an exact number of bytes has arrived, and take
//! whatever is currently buffered (used by baud-rate probing).

use super::ProtocolError;

/// Abstraction for the byte stream a device is attached to
pub trait Transport: Send {
    /// Write the whole buffer or fail
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ProtocolError>;

    /// Block until exactly `len` bytes are available and return them.
    ///
    /// There is no timeout. Implementations must either return `len` bytes
    /// or an error; a short read is never a success.
    fn read_exact(&mut self, len: usize) -> Result<Vec<u8>, ProtocolError>;

    /// Return whatever bytes are currently buffered without blocking
    fn read_available(&mut self) -> Result<Vec<u8>, ProtocolError>;

    /// Discard any unread input
    fn clear_input(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        (**self).write_all(bytes)
    }

    fn read_exact(&mut self, len: usize) -> Result<Vec<u8>, ProtocolError> {
        (**self).read_exact(len)
    }

    fn read_available(&mut self) -> Result<Vec<u8>, ProtocolError> {
        (**self).read_available()
    }

    fn clear_input(&mut self) -> Result<(), ProtocolError> {
        (**self).clear_input()
    }
}

//! # gqgmc Core Library
//!
//! Command-protocol client for GQ GMC Geiger counters (GMC-280/300/320).

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Immutable descriptors for every GQ-RFC1201 command
//! - Parameter validation, frame encoding and reply decoding
//! - A session handle with heartbeat streaming on a background thread
//! - Serial port access and baud-rate detection
//!
//! ## Example
//!
//! ```rust,ignore
//! use gqgmc_core::protocol::{Session, SessionConfig};
//!
//! let session = Session::open(&SessionConfig::new("/dev/ttyUSB0"))?;
//! println!("{} CPM", session.get_counts_per_minute()?);
//!
//! session.enable_heartbeat(|cps| println!("{} CPS", cps))?;
//! std::thread::sleep(std::time::Duration::from_secs(10));
//! session.disable_heartbeat()?;
//! ```

pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::protocol::{
        commands, CommandDescriptor, ProtocolError, Response, Session, SessionConfig,
        SessionState, Transport,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

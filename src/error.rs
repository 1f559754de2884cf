//! # Error Types
//!
//! Error handling for channel registration and per-connection dispatch.
//!
//! ## Error Categories
//! - **Usage errors**: reserved names, over-long names, undeclared payload
//!   types, malformed identifiers. These indicate a defect at the call site
//!   and are always raised before any table is touched.
//! - **Connection errors**: dispatching on a closed connection
//! - **Handler errors**: failures reported by a channel handler
//! - **Configuration errors**: invalid or unreadable configuration
//!
//! Duplicate registrations and missing handlers are *not* errors; they are
//! reported as `Ok(false)` / `Ok(None)`.
//!
//! ## Example Usage
//! ```rust
//! use channel_registry::core::channel_id::ChannelId;
//! use channel_registry::error::{ChannelError, Result};
//!
//! fn parse(raw: &str) -> Result<ChannelId> {
//!     raw.parse::<ChannelId>()
//! }
//!
//! assert!(matches!(parse("no-separator"), Err(ChannelError::InvalidChannelId(_))));
//! ```

use crate::core::side::{Direction, Phase};
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Lock-related error messages
    pub const ERR_REGISTRY_WRITE_LOCK: &str = "Failed to acquire write lock on channel registry";
    pub const ERR_REGISTRY_READ_LOCK: &str = "Failed to acquire read lock on channel registry";
    pub const ERR_ADDON_WRITE_LOCK: &str = "Failed to acquire write lock on connection addon";
    pub const ERR_ADDON_READ_LOCK: &str = "Failed to acquire read lock on connection addon";
    pub const ERR_PAYLOAD_TYPES_LOCK: &str = "Failed to acquire lock on payload type registry";
    pub const ERR_CONNECTION_SLOT_LOCK: &str = "Failed to acquire lock on connection slot";

    /// Identifier validation errors
    pub const ERR_MISSING_SEPARATOR: &str = "Channel identifier must have the form namespace:path";
    pub const ERR_EMPTY_NAMESPACE: &str = "Channel namespace cannot be empty";
    pub const ERR_EMPTY_PATH: &str = "Channel path cannot be empty";
    pub const ERR_ILLEGAL_CHARACTER: &str =
        "Channel identifier cannot contain whitespace or control characters";
}

/// Primary error type for all registry operations
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Cannot (un)register handler for reserved channel with name \"{0}\"")]
    ReservedChannel(String),

    #[error("Cannot register handler for channel with name \"{channel}\" as it is {len} characters long (maximum: {max})")]
    ChannelNameTooLong {
        channel: String,
        len: usize,
        max: usize,
    },

    #[error("Cannot register handler as no payload type has been declared with name \"{channel}\" for {direction} {phase}")]
    UnknownPayloadType {
        channel: String,
        phase: Phase,
        direction: Direction,
    },

    #[error("Invalid channel identifier: {0}")]
    InvalidChannelId(String),

    #[error("Payload type already declared for channel \"{0}\"")]
    DuplicatePayloadType(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Synchronization primitive poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Handler error on channel \"{channel}\": {message}")]
    Handler { channel: String, message: String },

    #[error("Custom error: {0}")]
    Custom(String),
}

impl ChannelError {
    /// Whether this error signals a caller defect rather than a runtime condition
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            ChannelError::ReservedChannel(_)
                | ChannelError::ChannelNameTooLong { .. }
                | ChannelError::UnknownPayloadType { .. }
                | ChannelError::InvalidChannelId(_)
                | ChannelError::DuplicatePayloadType(_)
        )
    }
}

/// Type alias for Results using ChannelError
pub type Result<T> = std::result::Result<T, ChannelError>;

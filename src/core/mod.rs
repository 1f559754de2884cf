//! # Core Protocol Coordinates
//!
//! Identifiers and static protocol data shared by every registry.
//!
//! ## Components
//! - **ChannelId**: namespaced `namespace:path` channel identifiers
//! - **Phase / Direction**: the (phase, direction) pair a registry serves
//! - **ReservedChannels**: names kept for internal protocol bookkeeping
//! - **PayloadTypeRegistry**: declared payload codecs per (phase, direction)
//!
//! ## Limits
//! - Maximum channel name length: 128 characters in serialized form,
//!   enforced at registration time

pub mod channel_id;
pub mod payload;
pub mod reserved;
pub mod side;

/// Maximum serialized length of a channel name accepted for registration
pub const MAX_CHANNEL_NAME_LENGTH: usize = 128;

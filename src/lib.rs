//! # Channel Registry
//!
//! Namespaced channel registration for an extensible client/server binary
//! protocol. Independently developed extensions attach handlers to named
//! channels on a shared connection without central coordination.
//!
//! ## Architecture
//! - **[`registry::ChannelRegistry`]**: the process-wide handler table for one
//!   (phase, direction) pair
//! - **[`registry::ConnectionAddon`]**: a connection's mirror of that table,
//!   plus connection-scoped handlers
//! - **[`protocol::Dispatcher`]**: routes inbound payloads through an addon
//! - **[`connection::ConnectionSlot`]**: maps host lifecycle signals onto addons
//! - **[`networking::ChannelRegistries`]**: the explicitly owned registry set
//!
//! ## Thread Safety
//! Registries and addons are passive structures shared between network I/O
//! threads and the logic thread. Each owns an independent `RwLock`; updates
//! flow registry -> addon only.

pub mod config;
pub mod connection;
pub mod core;
pub mod error;
pub mod networking;
pub mod protocol;
pub mod registry;
pub mod utils;

pub use crate::core::channel_id::ChannelId;
pub use crate::core::side::{Direction, Phase};
pub use crate::error::{ChannelError, Result};
pub use crate::registry::{AddonHooks, ChannelRegistry, ConnectionAddon};

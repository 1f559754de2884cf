//! # Inbound Dispatch
//!
//! Routes channel-tagged payloads arriving on a connection to the handler that
//! connection's addon holds for the channel.
//!
//! ## Components
//! - **Dispatcher**: per-connection routing through a [`ConnectionAddon`]
//! - **PacketHandler**: the handler value stored in registries served by a
//!   dispatcher
//!
//! [`ConnectionAddon`]: crate::registry::ConnectionAddon

pub mod dispatcher;

pub use dispatcher::{handler, DispatchOutcome, Dispatcher, PacketHandler};

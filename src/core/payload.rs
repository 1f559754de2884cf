//! Declared payload types.
//!
//! A [`PayloadTypeRegistry`] records which channels have a payload codec for
//! one (phase, direction). The codec itself lives with the transport; this
//! layer only needs to know whether one was declared, so a registry can refuse
//! handlers for channels it could never decode.

use crate::core::channel_id::ChannelId;
use crate::core::side::{Direction, Phase};
use crate::core::MAX_CHANNEL_NAME_LENGTH;
use crate::error::{constants, ChannelError, Result};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Side-effect-free check: true iff a payload type is declared for the channel
pub type PayloadTypeValidator = Arc<dyn Fn(&ChannelId) -> bool + Send + Sync + 'static>;

#[derive(Debug)]
pub struct PayloadTypeRegistry {
    phase: Phase,
    direction: Direction,
    declared: RwLock<HashSet<ChannelId>>,
}

impl PayloadTypeRegistry {
    pub fn new(phase: Phase, direction: Direction) -> Self {
        Self {
            phase,
            direction,
            declared: RwLock::new(HashSet::new()),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Declare a payload type for `id`. Each id can be declared once.
    pub fn declare(&self, id: ChannelId) -> Result<()> {
        let len = id.serialized_len();
        if len > MAX_CHANNEL_NAME_LENGTH {
            return Err(ChannelError::ChannelNameTooLong {
                channel: id.to_string(),
                len,
                max: MAX_CHANNEL_NAME_LENGTH,
            });
        }

        let mut declared = self
            .declared
            .write()
            .map_err(|_| ChannelError::LockPoisoned(constants::ERR_PAYLOAD_TYPES_LOCK))?;

        if declared.contains(&id) {
            return Err(ChannelError::DuplicatePayloadType(id.to_string()));
        }

        debug!(channel = %id, phase = %self.phase, direction = %self.direction, "Payload type declared");
        declared.insert(id);
        Ok(())
    }

    /// A poisoned lock reads as "not declared"
    pub fn is_declared(&self, id: &ChannelId) -> bool {
        self.declared
            .read()
            .map(|declared| declared.contains(id))
            .unwrap_or(false)
    }

    /// Predicate to hand to a channel registry for the same (phase, direction)
    pub fn validator(self: &Arc<Self>) -> PayloadTypeValidator {
        let types = Arc::clone(self);
        Arc::new(move |id: &ChannelId| types.is_declared(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_then_validate() {
        let types = Arc::new(PayloadTypeRegistry::new(Phase::Play, Direction::Serverbound));
        let id = ChannelId::parse("mod:sync").unwrap();
        let validator = types.validator();

        assert!(!validator(&id));
        types.declare(id.clone()).unwrap();
        assert!(validator(&id));
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let types = PayloadTypeRegistry::new(Phase::Login, Direction::Clientbound);
        let id = ChannelId::parse("mod:query").unwrap();
        types.declare(id.clone()).unwrap();

        assert!(matches!(
            types.declare(id),
            Err(ChannelError::DuplicatePayloadType(_))
        ));
    }

    #[test]
    fn test_overlong_declaration_rejected() {
        let types = PayloadTypeRegistry::new(Phase::Play, Direction::Clientbound);
        let id = ChannelId::new("ns", "x".repeat(MAX_CHANNEL_NAME_LENGTH)).unwrap();

        assert!(matches!(
            types.declare(id),
            Err(ChannelError::ChannelNameTooLong { .. })
        ));
    }
}

//! Channel names reserved for protocol bookkeeping.
//!
//! Reserved names carry the protocol's own channel negotiation traffic and can
//! never be the target of a public register/unregister call.

use crate::core::channel_id::ChannelId;
use crate::core::side::Phase;
use std::collections::HashSet;

/// Namespace of the shared bookkeeping channels
pub const COMMON_NAMESPACE: &str = "c";

/// Announces the channels a peer can receive
pub fn common_register() -> ChannelId {
    ChannelId::from_static(COMMON_NAMESPACE, "register")
}

/// Negotiates the bookkeeping protocol version
pub fn common_version() -> ChannelId {
    ChannelId::from_static(COMMON_NAMESPACE, "version")
}

/// Legacy channel registration announcement
pub fn register_channel() -> ChannelId {
    ChannelId::from_static("minecraft", "register")
}

/// Legacy channel unregistration announcement
pub fn unregister_channel() -> ChannelId {
    ChannelId::from_static("minecraft", "unregister")
}

/// Predicate over channel names that may not be registered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservedChannels {
    names: HashSet<ChannelId>,
}

impl ReservedChannels {
    /// An empty set; nothing is reserved
    pub fn none() -> Self {
        Self::default()
    }

    /// The names reserved while a connection is in `phase`.
    ///
    /// The common bookkeeping channels are reserved everywhere. The
    /// (un)register announcement channels only exist once the connection has
    /// left login.
    pub fn for_phase(phase: Phase) -> Self {
        let mut names = HashSet::from([common_register(), common_version()]);

        if phase != Phase::Login {
            names.insert(register_channel());
            names.insert(unregister_channel());
        }

        Self { names }
    }

    pub fn with(mut self, id: ChannelId) -> Self {
        self.names.insert(id);
        self
    }

    pub fn extend<I: IntoIterator<Item = ChannelId>>(&mut self, ids: I) {
        self.names.extend(ids);
    }

    #[inline]
    pub fn is_reserved(&self, id: &ChannelId) -> bool {
        self.names.contains(id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelId> {
        self.names.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_only_reserves_common_channels() {
        let login = ReservedChannels::for_phase(Phase::Login);
        assert!(login.is_reserved(&common_register()));
        assert!(login.is_reserved(&common_version()));
        assert!(!login.is_reserved(&register_channel()));
    }

    #[test]
    fn test_play_reserves_announcement_channels() {
        let play = ReservedChannels::for_phase(Phase::Play);
        assert!(play.is_reserved(&register_channel()));
        assert!(play.is_reserved(&unregister_channel()));
        assert_eq!(play.len(), 4);
    }

    #[test]
    fn test_with_adds_names() {
        let extra = ChannelId::parse("host:internal").unwrap();
        let reserved = ReservedChannels::none().with(extra.clone());
        assert!(reserved.is_reserved(&extra));
        assert!(!reserved.is_reserved(&common_register()));
    }
}

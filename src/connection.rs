//! # Connection Lifecycle
//!
//! A [`ConnectionSlot`] holds the addon for the phase a connection is
//! currently in and turns the host's lifecycle signals into addon calls.
//!
//! ## Signals
//! - **Phase change**: the previous addon's session ends without a
//!   disconnect notification, then the new addon's session begins
//! - **Transport close** (`channel_inactive`) and **disconnect packet**
//!   (`disconnect_received`): both may arrive, from different threads, for the
//!   same close. The addon's disconnected flag decides which one notifies.

use crate::core::channel_id::ChannelId;
use crate::error::{constants, ChannelError, Result};
use crate::registry::ConnectionAddon;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

pub struct ConnectionSlot<H> {
    current: Mutex<Option<Arc<ConnectionAddon<H>>>>,
}

impl<H> Default for ConnectionSlot<H> {
    fn default() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }
}

impl<H> ConnectionSlot<H>
where
    H: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Arc<ConnectionAddon<H>>>>> {
        self.current
            .lock()
            .map_err(|_| ChannelError::LockPoisoned(constants::ERR_CONNECTION_SLOT_LOCK))
    }

    /// The addon for the current phase, if any
    pub fn current(&self) -> Result<Option<Arc<ConnectionAddon<H>>>> {
        Ok(self.lock()?.clone())
    }

    /// Move the connection into the phase served by `addon`
    pub fn enter_phase(&self, addon: Arc<ConnectionAddon<H>>) -> Result<()> {
        let previous = self.lock()?.replace(addon.clone());

        if let Some(previous) = previous {
            debug!(
                from = %previous.phase(),
                to = %addon.phase(),
                "Connection changed phase"
            );
            previous.end_session()?;
        }

        addon.begin_session()
    }

    /// Transport-level close
    pub fn channel_inactive(&self) -> Result<bool> {
        self.disconnect()
    }

    /// Protocol-level disconnect packet
    pub fn disconnect_received(&self) -> Result<bool> {
        self.disconnect()
    }

    fn disconnect(&self) -> Result<bool> {
        match self.current()? {
            Some(addon) => addon.handle_disconnect(),
            None => Ok(false),
        }
    }

    /// Handler for an inbound payload in the current phase
    pub fn lookup(&self, id: &ChannelId) -> Result<Option<H>> {
        match self.current()? {
            Some(addon) => addon.lookup(id),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::side::{Direction, Phase};
    use crate::registry::{CallbackHooks, ChannelRegistry, NoHooks};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn id(raw: &str) -> ChannelId {
        ChannelId::parse(raw).unwrap()
    }

    #[test]
    fn test_phase_change_ends_previous_session_quietly() {
        let login = ChannelRegistry::<u8>::builder(Phase::Login, Direction::Serverbound).build();
        let play = ChannelRegistry::<u8>::builder(Phase::Play, Direction::Serverbound).build();
        login.register(id("mod:hello"), 1).unwrap();
        play.register(id("mod:state"), 2).unwrap();

        let disconnects = Arc::new(AtomicUsize::new(0));
        let counter = disconnects.clone();
        let login_addon = ConnectionAddon::new(
            login.clone(),
            "login",
            CallbackHooks::new().on_disconnect(move |_: &ConnectionAddon<u8>| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let slot = ConnectionSlot::new();
        slot.enter_phase(login_addon.clone()).unwrap();
        assert_eq!(slot.lookup(&id("mod:hello")).unwrap(), Some(1));

        slot.enter_phase(ConnectionAddon::new(play.clone(), "play", NoHooks))
            .unwrap();

        assert_eq!(login.tracked_addons().unwrap(), 0);
        assert_eq!(play.tracked_addons().unwrap(), 1);
        assert_eq!(disconnects.load(Ordering::SeqCst), 0);
        assert!(!login_addon.is_disconnected());
        assert_eq!(slot.lookup(&id("mod:hello")).unwrap(), None);
        assert_eq!(slot.lookup(&id("mod:state")).unwrap(), Some(2));
    }

    #[test]
    fn test_both_close_signals_notify_once() {
        let registry = ChannelRegistry::<u8>::builder(Phase::Play, Direction::Clientbound).build();
        let disconnects = Arc::new(AtomicUsize::new(0));
        let counter = disconnects.clone();
        let slot = ConnectionSlot::new();
        slot.enter_phase(ConnectionAddon::new(
            registry.clone(),
            "play",
            CallbackHooks::new().on_disconnect(move |_: &ConnectionAddon<u8>| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        ))
        .unwrap();

        assert!(slot.disconnect_received().unwrap());
        assert!(!slot.channel_inactive().unwrap());
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(registry.tracked_addons().unwrap(), 0);
    }

    #[test]
    fn test_close_before_any_phase_is_noop() {
        let slot = ConnectionSlot::<u8>::new();
        assert!(!slot.channel_inactive().unwrap());
        assert_eq!(slot.lookup(&id("mod:any")).unwrap(), None);
    }
}

//! Per-connection channel tables.
//!
//! A [`ConnectionAddon`] is the connection's own view of which channels it can
//! receive. It is seeded from its [`ChannelRegistry`] on attach, kept in sync by
//! registry propagation, and may carry connection-scoped handlers that never
//! reach the global table.
//!
//! Phase and direction specific behavior (what happens on init, on disconnect,
//! or when the channel set changes) is injected through [`AddonHooks`].

use super::ChannelRegistry;
use crate::core::channel_id::ChannelId;
use crate::core::side::{Direction, Phase};
use crate::error::{constants, ChannelError, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, instrument};

static NEXT_ADDON_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an addon within its registry's tracked set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddonId(u64);

impl AddonId {
    fn next() -> Self {
        Self(NEXT_ADDON_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for AddonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "addon#{}", self.0)
    }
}

/// Phase/direction specific behavior of an addon.
///
/// `on_channel_registered` and `on_channel_unregistered` may run while the
/// owning registry holds its write lock, so no hook may call back into that
/// registry.
pub trait AddonHooks<H>: Send + Sync + 'static {
    /// The addon has attached and its table holds the full global snapshot
    fn on_init(&self, _addon: &ConnectionAddon<H>) {}

    /// The connection closed; fires at most once per addon
    fn on_disconnect(&self, _addon: &ConnectionAddon<H>) {}

    /// A channel became receivable on this connection
    fn on_channel_registered(&self, _channel: &ChannelId) {}

    /// A channel stopped being receivable on this connection
    fn on_channel_unregistered(&self, _channel: &ChannelId) {}

    /// Names reserved by this addon on top of the registry's reserved set
    fn is_reserved(&self, _channel: &ChannelId) -> bool {
        false
    }
}

/// Hooks that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl<H> AddonHooks<H> for NoHooks {}

type AddonCallback<H> = Box<dyn Fn(&ConnectionAddon<H>) + Send + Sync>;

/// Init/disconnect callback pair
pub struct CallbackHooks<H> {
    init: Option<AddonCallback<H>>,
    disconnect: Option<AddonCallback<H>>,
}

impl<H> CallbackHooks<H> {
    pub fn new() -> Self {
        Self {
            init: None,
            disconnect: None,
        }
    }

    pub fn on_init<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ConnectionAddon<H>) + Send + Sync + 'static,
    {
        self.init = Some(Box::new(callback));
        self
    }

    pub fn on_disconnect<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ConnectionAddon<H>) + Send + Sync + 'static,
    {
        self.disconnect = Some(Box::new(callback));
        self
    }
}

impl<H> Default for CallbackHooks<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: 'static> AddonHooks<H> for CallbackHooks<H> {
    fn on_init(&self, addon: &ConnectionAddon<H>) {
        if let Some(init) = &self.init {
            init(addon);
        }
    }

    fn on_disconnect(&self, addon: &ConnectionAddon<H>) {
        if let Some(disconnect) = &self.disconnect {
            disconnect(addon);
        }
    }
}

/// One connection's channel table for one phase
pub struct ConnectionAddon<H> {
    id: AddonId,
    description: String,
    registry: Arc<ChannelRegistry<H>>,
    hooks: Box<dyn AddonHooks<H>>,
    // Touched from network threads and the logic thread at once
    handlers: RwLock<HashMap<ChannelId, H>>,
    initialized: AtomicBool,
    disconnected: AtomicBool,
}

impl<H> ConnectionAddon<H>
where
    H: Clone + Send + Sync + 'static,
{
    pub fn new(
        registry: Arc<ChannelRegistry<H>>,
        description: impl Into<String>,
        hooks: impl AddonHooks<H>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: AddonId::next(),
            description: description.into(),
            registry,
            hooks: Box::new(hooks),
            handlers: RwLock::new(HashMap::new()),
            initialized: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> AddonId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry<H>> {
        &self.registry
    }

    pub fn phase(&self) -> Phase {
        self.registry.phase()
    }

    pub fn direction(&self) -> Direction {
        self.registry.direction()
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::Acquire)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<ChannelId, H>>> {
        self.handlers
            .read()
            .map_err(|_| ChannelError::LockPoisoned(constants::ERR_ADDON_READ_LOCK))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<ChannelId, H>>> {
        self.handlers
            .write()
            .map_err(|_| ChannelError::LockPoisoned(constants::ERR_ADDON_WRITE_LOCK))
    }

    fn ensure_not_reserved(&self, id: &ChannelId) -> Result<()> {
        if self.hooks.is_reserved(id) {
            return Err(ChannelError::ReservedChannel(id.to_string()));
        }
        self.registry.ensure_not_reserved(id)
    }

    /// Handler for an inbound payload on `id`. Consults only this connection's
    /// table.
    pub fn lookup(&self, id: &ChannelId) -> Result<Option<H>> {
        Ok(self.read()?.get(id).cloned())
    }

    /// Point-in-time copy of the channels this connection can receive
    pub fn channels(&self) -> Result<HashSet<ChannelId>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    /// Register a handler for this connection only.
    ///
    /// Same checks as a global registration; `Ok(false)` if the channel
    /// already has a handler here.
    pub fn register_local(&self, id: ChannelId, handler: H) -> Result<bool> {
        self.ensure_not_reserved(&id)?;
        self.registry.validate_channel(&id)?;

        self.register_channel(id, handler)
    }

    /// Remove a handler from this connection only
    pub fn unregister_local(&self, id: &ChannelId) -> Result<Option<H>> {
        self.ensure_not_reserved(id)?;

        self.unregister_channel(id)
    }

    /// Propagation entry point; the registry already validated `id`
    pub(crate) fn register_channel(&self, id: ChannelId, handler: H) -> Result<bool> {
        let inserted = {
            let mut handlers = self.write()?;
            if handlers.contains_key(&id) {
                false
            } else {
                handlers.insert(id.clone(), handler);
                true
            }
        };

        if inserted {
            self.hooks.on_channel_registered(&id);
        }

        Ok(inserted)
    }

    pub(crate) fn unregister_channel(&self, id: &ChannelId) -> Result<Option<H>> {
        let removed = self.write()?.remove(id);

        if removed.is_some() {
            self.hooks.on_channel_unregistered(id);
        }

        Ok(removed)
    }

    /// Bulk insert used to seed the table on attach. Existing local entries win.
    pub(crate) fn register_channels(&self, map: &HashMap<ChannelId, H>) -> Result<()> {
        let mut inserted = Vec::new();

        {
            let mut handlers = self.write()?;
            for (id, handler) in map {
                if !handlers.contains_key(id) {
                    handlers.insert(id.clone(), handler.clone());
                    inserted.push(id);
                }
            }
        }

        for id in inserted {
            self.hooks.on_channel_registered(id);
        }

        Ok(())
    }

    /// Attach to the registry, then fire the init notification.
    ///
    /// The init hook runs at most once per addon, after the table has been
    /// seeded.
    #[instrument(skip(self), fields(addon = %self.description, id = %self.id))]
    pub fn begin_session(self: &Arc<Self>) -> Result<()> {
        if self.is_disconnected() {
            return Err(ChannelError::ConnectionClosed);
        }

        self.registry.attach(self)?;

        if self
            .initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            debug!("Addon session started");
            self.hooks.on_init(self);
        }

        Ok(())
    }

    /// Detach from the registry. Safe to call repeatedly or without a session.
    pub fn end_session(&self) -> Result<bool> {
        self.registry.detach(self)
    }

    /// Handle a connection close from any signal.
    ///
    /// Only the caller that flips the disconnected flag fires the disconnect
    /// notification and ends the session; every other call returns
    /// `Ok(false)`.
    #[instrument(skip(self), fields(addon = %self.description, id = %self.id))]
    pub fn handle_disconnect(&self) -> Result<bool> {
        if self
            .disconnected
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(false);
        }

        debug!("Addon disconnected");
        self.registry.metrics().disconnected();
        self.hooks.on_disconnect(self);
        self.end_session()?;

        Ok(true)
    }
}

impl<H> fmt::Debug for ConnectionAddon<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionAddon")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("phase", &self.registry.phase())
            .field("direction", &self.registry.direction())
            .field("disconnected", &self.disconnected.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

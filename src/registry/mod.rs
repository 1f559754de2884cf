//! # Channel Registry
//!
//! The process-wide table of channel handlers for one (phase, direction) pair,
//! and the per-connection [`ConnectionAddon`] mirrors kept consistent with it.
//!
//! ## Consistency
//! - Attaching an addon copies the current table into it while the registry
//!   holds its write lock, so no registration can slip between the snapshot
//!   and the start of tracking.
//! - Every later register/unregister is pushed into each tracked addon before
//!   the registry call returns.
//!
//! ## Locking
//! Each registry and each addon owns an independent `RwLock`. Propagation
//! always goes registry lock -> addon lock; addon operations never call back
//! into the registry while holding their own lock.
//!
//! ## Example
//! ```rust
//! use channel_registry::core::channel_id::ChannelId;
//! use channel_registry::core::side::{Direction, Phase};
//! use channel_registry::registry::{ChannelRegistry, ConnectionAddon, NoHooks};
//!
//! let registry = ChannelRegistry::<u32>::builder(Phase::Play, Direction::Serverbound).build();
//! let ping = ChannelId::parse("mod:ping").unwrap();
//! assert!(registry.register(ping.clone(), 1).unwrap());
//!
//! let addon = ConnectionAddon::new(registry.clone(), "server play addon", NoHooks);
//! addon.begin_session().unwrap();
//! assert_eq!(addon.lookup(&ping).unwrap(), Some(1));
//! ```

pub mod addon;


pub use addon::{AddonHooks, AddonId, CallbackHooks, ConnectionAddon, NoHooks};

use crate::core::channel_id::ChannelId;
use crate::core::payload::PayloadTypeValidator;
use crate::core::reserved::ReservedChannels;
use crate::core::side::{Direction, Phase};
use crate::core::MAX_CHANNEL_NAME_LENGTH;
use crate::error::{constants, ChannelError, Result};
use crate::utils::metrics::RegistryMetrics;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use tracing::{debug, enabled, trace, warn, Level};

/// Global handler table for one (phase, direction)
pub struct ChannelRegistry<H> {
    phase: Phase,
    direction: Direction,
    reserved: ReservedChannels,
    payload_validator: Option<PayloadTypeValidator>,
    max_name_length: usize,
    metrics: Arc<RegistryMetrics>,
    state: RwLock<RegistryState<H>>,
}

struct RegistryState<H> {
    handlers: HashMap<ChannelId, H>,
    /// Non-owning; the connection owns its addon
    tracked: HashMap<AddonId, Weak<ConnectionAddon<H>>>,
}

impl<H> RegistryState<H> {
    /// Run `apply` on every live tracked addon, pruning dropped ones.
    /// Returns (updated, pruned).
    fn for_each_addon<F>(&mut self, mut apply: F) -> (u64, u64)
    where
        F: FnMut(&ConnectionAddon<H>),
    {
        let mut updated = 0;
        let before = self.tracked.len();

        self.tracked.retain(|_, weak| match weak.upgrade() {
            Some(addon) => {
                apply(&addon);
                updated += 1;
                true
            }
            None => false,
        });

        (updated, (before - self.tracked.len()) as u64)
    }
}

/// Builder for [`ChannelRegistry`]
pub struct ChannelRegistryBuilder<H> {
    phase: Phase,
    direction: Direction,
    reserved: Option<ReservedChannels>,
    payload_validator: Option<PayloadTypeValidator>,
    max_name_length: usize,
    metrics: Option<Arc<RegistryMetrics>>,
    _handler: PhantomData<fn() -> H>,
}

impl<H> ChannelRegistryBuilder<H> {
    /// Reserved names; defaults to [`ReservedChannels::for_phase`]
    pub fn reserved(mut self, reserved: ReservedChannels) -> Self {
        self.reserved = Some(reserved);
        self
    }

    /// Require a declared payload type for every registered channel
    pub fn payload_validator(mut self, validator: PayloadTypeValidator) -> Self {
        self.payload_validator = Some(validator);
        self
    }

    pub fn max_channel_name_length(mut self, max: usize) -> Self {
        self.max_name_length = max;
        self
    }

    /// Share a metrics collector with other registries
    pub fn metrics(mut self, metrics: Arc<RegistryMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Arc<ChannelRegistry<H>> {
        Arc::new(ChannelRegistry {
            phase: self.phase,
            direction: self.direction,
            reserved: self
                .reserved
                .unwrap_or_else(|| ReservedChannels::for_phase(self.phase)),
            payload_validator: self.payload_validator,
            max_name_length: self.max_name_length,
            metrics: self.metrics.unwrap_or_default(),
            state: RwLock::new(RegistryState {
                handlers: HashMap::new(),
                tracked: HashMap::new(),
            }),
        })
    }
}

impl<H> ChannelRegistry<H> {
    pub fn builder(phase: Phase, direction: Direction) -> ChannelRegistryBuilder<H> {
        ChannelRegistryBuilder {
            phase,
            direction,
            reserved: None,
            payload_validator: None,
            max_name_length: MAX_CHANNEL_NAME_LENGTH,
            metrics: None,
            _handler: PhantomData,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn metrics(&self) -> &Arc<RegistryMetrics> {
        &self.metrics
    }

    pub fn max_channel_name_length(&self) -> usize {
        self.max_name_length
    }

    #[inline]
    pub fn is_reserved(&self, id: &ChannelId) -> bool {
        self.reserved.is_reserved(id)
    }

    /// Checks run before any registration mutates a table.
    ///
    /// Fails on a reserved name, a name longer than the configured maximum, or
    /// (when a validator is configured) a channel without a declared payload
    /// type.
    pub fn validate_channel(&self, id: &ChannelId) -> Result<()> {
        self.ensure_not_reserved(id)?;

        let len = id.serialized_len();
        if len > self.max_name_length {
            return Err(ChannelError::ChannelNameTooLong {
                channel: id.to_string(),
                len,
                max: self.max_name_length,
            });
        }

        if let Some(validator) = &self.payload_validator {
            if !validator(id) {
                return Err(ChannelError::UnknownPayloadType {
                    channel: id.to_string(),
                    phase: self.phase,
                    direction: self.direction,
                });
            }
        }

        Ok(())
    }

    pub(crate) fn ensure_not_reserved(&self, id: &ChannelId) -> Result<()> {
        if self.is_reserved(id) {
            return Err(ChannelError::ReservedChannel(id.to_string()));
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, RegistryState<H>>> {
        self.state
            .read()
            .map_err(|_| ChannelError::LockPoisoned(constants::ERR_REGISTRY_READ_LOCK))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, RegistryState<H>>> {
        self.state
            .write()
            .map_err(|_| ChannelError::LockPoisoned(constants::ERR_REGISTRY_WRITE_LOCK))
    }

    /// Trackers beyond one addon are only interesting when tracing.
    /// In practice the count should never exceed the number of connections.
    fn log_tracked_addons(&self, state: &RegistryState<H>) {
        if enabled!(Level::TRACE) && state.tracked.len() > 1 {
            trace!(
                phase = %self.phase,
                direction = %self.direction,
                tracked = state.tracked.len(),
                "Receiver registry tracks multiple addon instances"
            );
        }
    }
}

impl<H> ChannelRegistry<H>
where
    H: Clone + Send + Sync + 'static,
{
    /// Handler registered for `id`, if any
    pub fn lookup(&self, id: &ChannelId) -> Result<Option<H>> {
        Ok(self.read()?.handlers.get(id).cloned())
    }

    /// Register a global handler and push it to every tracked addon.
    ///
    /// Returns `Ok(false)` without changing anything if `id` already has a
    /// handler. Usage errors are raised before any table is touched.
    pub fn register(&self, id: ChannelId, handler: H) -> Result<bool> {
        self.validate_channel(&id)?;

        let mut state = self.write()?;

        if state.handlers.contains_key(&id) {
            self.metrics.duplicate_registration();
            debug!(channel = %id, phase = %self.phase, direction = %self.direction, "Channel already has a global handler");
            return Ok(false);
        }

        state.handlers.insert(id.clone(), handler.clone());
        self.log_tracked_addons(&state);

        let (updated, pruned) = state.for_each_addon(|addon| {
            if let Err(e) = addon.register_channel(id.clone(), handler.clone()) {
                warn!(channel = %id, addon = %addon.description(), error = %e, "Failed to propagate registration");
            }
        });

        self.metrics.registration();
        self.metrics.propagated(updated);
        self.metrics.pruned(pruned);
        debug!(channel = %id, phase = %self.phase, direction = %self.direction, addons = updated, "Global handler registered");

        Ok(true)
    }

    /// Remove a global handler from the table and from every tracked addon
    pub fn unregister(&self, id: &ChannelId) -> Result<Option<H>> {
        self.ensure_not_reserved(id)?;

        let mut state = self.write()?;

        let Some(removed) = state.handlers.remove(id) else {
            return Ok(None);
        };

        self.log_tracked_addons(&state);

        let (updated, pruned) = state.for_each_addon(|addon| {
            if let Err(e) = addon.unregister_channel(id) {
                warn!(channel = %id, addon = %addon.description(), error = %e, "Failed to propagate unregistration");
            }
        });

        self.metrics.unregistration();
        self.metrics.propagated(updated);
        self.metrics.pruned(pruned);
        debug!(channel = %id, phase = %self.phase, direction = %self.direction, addons = updated, "Global handler unregistered");

        Ok(Some(removed))
    }

    /// Start tracking `addon` and seed it with the current table.
    ///
    /// Returns `Ok(false)` if the addon was already tracked.
    pub fn attach(&self, addon: &Arc<ConnectionAddon<H>>) -> Result<bool> {
        if !std::ptr::eq(Arc::as_ptr(addon.registry()), self) {
            return Err(ChannelError::Custom(format!(
                "Addon \"{}\" belongs to a different registry than {} {}",
                addon.description(),
                self.direction,
                self.phase
            )));
        }

        let mut state = self.write()?;

        if state.tracked.contains_key(&addon.id()) {
            return Ok(false);
        }

        state.tracked.insert(addon.id(), Arc::downgrade(addon));

        if let Err(e) = addon.register_channels(&state.handlers) {
            state.tracked.remove(&addon.id());
            return Err(e);
        }

        self.log_tracked_addons(&state);
        self.metrics.attached();
        debug!(addon = %addon.description(), channels = state.handlers.len(), "Addon attached");

        Ok(true)
    }

    /// Stop tracking `addon`. Returns `Ok(false)` if it was not tracked.
    pub fn detach(&self, addon: &ConnectionAddon<H>) -> Result<bool> {
        let mut state = self.write()?;

        self.log_tracked_addons(&state);

        if state.tracked.remove(&addon.id()).is_none() {
            return Ok(false);
        }

        self.metrics.detached();
        debug!(addon = %addon.description(), "Addon detached");
        Ok(true)
    }

    /// Point-in-time copy of the registered channel names
    pub fn channels(&self) -> Result<HashSet<ChannelId>> {
        Ok(self.read()?.handlers.keys().cloned().collect())
    }

    /// Point-in-time copy of the whole table
    pub fn handlers(&self) -> Result<HashMap<ChannelId, H>> {
        Ok(self.read()?.handlers.clone())
    }

    /// Number of tracked addons that are still alive
    pub fn tracked_addons(&self) -> Result<usize> {
        Ok(self
            .read()?
            .tracked
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count())
    }

    /// Whether the addon with `id` is in the tracked set
    pub fn is_tracking(&self, id: AddonId) -> Result<bool> {
        Ok(self.read()?.tracked.contains_key(&id))
    }
}

impl<H> fmt::Debug for ChannelRegistry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("phase", &self.phase)
            .field("direction", &self.direction)
            .field("reserved", &self.reserved.len())
            .field("payload_validator", &self.payload_validator.is_some())
            .field("max_name_length", &self.max_name_length)
            .finish_non_exhaustive()
    }
}

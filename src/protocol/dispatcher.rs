use crate::core::channel_id::ChannelId;
use crate::error::{ChannelError, Result};
use crate::registry::ConnectionAddon;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

/// Handler for inbound channel payloads.
/// Returns an optional response payload, e.g. the answer to a login query.
pub type PacketHandler =
    Arc<dyn Fn(&ChannelId, Bytes) -> Result<Option<Bytes>> + Send + Sync + 'static>;

/// Wrap a closure as a [`PacketHandler`]
pub fn handler<F>(f: F) -> PacketHandler
where
    F: Fn(&ChannelId, Bytes) -> Result<Option<Bytes>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Result of routing one inbound payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler ran; carries its response payload, if any
    Handled(Option<Bytes>),
    /// No handler on this connection. What to do about it is the transport's call.
    UnknownChannel,
}

/// Routes inbound payloads through a connection's addon.
/// Handlers run outside every registry and addon lock.
pub struct Dispatcher {
    addon: Arc<ConnectionAddon<PacketHandler>>,
    first_inbound: AtomicBool,
    on_first_inbound: Option<Box<dyn Fn(&ConnectionAddon<PacketHandler>) + Send + Sync>>,
}

impl Dispatcher {
    pub fn new(addon: Arc<ConnectionAddon<PacketHandler>>) -> Self {
        Self {
            addon,
            first_inbound: AtomicBool::new(true),
            on_first_inbound: None,
        }
    }

    /// Callback fired once, before the first inbound payload is handled
    pub fn on_first_inbound<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ConnectionAddon<PacketHandler>) + Send + Sync + 'static,
    {
        self.on_first_inbound = Some(Box::new(callback));
        self
    }

    pub fn addon(&self) -> &Arc<ConnectionAddon<PacketHandler>> {
        &self.addon
    }

    pub fn dispatch(&self, channel: &ChannelId, payload: Bytes) -> Result<DispatchOutcome> {
        if self.addon.is_disconnected() {
            return Err(ChannelError::ConnectionClosed);
        }

        debug!(
            channel = %channel,
            addon = %self.addon.description(),
            len = payload.len(),
            "Handling inbound payload"
        );

        if self.first_inbound.swap(false, Ordering::AcqRel) {
            if let Some(callback) = &self.on_first_inbound {
                callback(&self.addon);
            }
        }

        let metrics = self.addon.registry().metrics();

        let Some(handler) = self.addon.lookup(channel)? else {
            metrics.inbound_unknown();
            return Ok(DispatchOutcome::UnknownChannel);
        };

        metrics.inbound_dispatched();

        match handler(channel, payload) {
            Ok(response) => Ok(DispatchOutcome::Handled(response)),
            Err(e) => {
                error!(channel = %channel, error = %e, "Encountered error while handling inbound payload");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::side::{Direction, Phase};
    use crate::registry::{ChannelRegistry, NoHooks};
    use std::sync::atomic::AtomicUsize;

    fn id(raw: &str) -> ChannelId {
        ChannelId::parse(raw).unwrap()
    }

    fn session() -> Dispatcher {
        let registry = ChannelRegistry::<PacketHandler>::builder(Phase::Login, Direction::Clientbound)
            .build();
        registry
            .register(
                id("mod:echo"),
                handler(|_, payload| Ok(Some(payload))),
            )
            .unwrap();
        registry
            .register(
                id("mod:fail"),
                handler(|channel, _| {
                    Err(ChannelError::Handler {
                        channel: channel.to_string(),
                        message: "boom".to_string(),
                    })
                }),
            )
            .unwrap();

        let addon = ConnectionAddon::new(registry, "client login addon", NoHooks);
        addon.begin_session().unwrap();
        Dispatcher::new(addon)
    }

    #[test]
    fn test_dispatch_routes_to_handler() {
        let dispatcher = session();
        let outcome = dispatcher
            .dispatch(&id("mod:echo"), Bytes::from_static(b"hi"))
            .unwrap();

        assert_eq!(
            outcome,
            DispatchOutcome::Handled(Some(Bytes::from_static(b"hi")))
        );
    }

    #[test]
    fn test_unknown_channel_is_not_an_error() {
        let dispatcher = session();
        let outcome = dispatcher.dispatch(&id("mod:missing"), Bytes::new()).unwrap();

        assert_eq!(outcome, DispatchOutcome::UnknownChannel);
        assert_eq!(
            dispatcher.addon().registry().metrics().snapshot().inbound_unknown,
            1
        );
    }

    #[test]
    fn test_handler_error_propagates() {
        let dispatcher = session();
        let result = dispatcher.dispatch(&id("mod:fail"), Bytes::new());

        assert!(matches!(result, Err(ChannelError::Handler { .. })));
    }

    #[test]
    fn test_first_inbound_fires_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let dispatcher = session().on_first_inbound(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.dispatch(&id("mod:echo"), Bytes::new()).unwrap();
        dispatcher.dispatch(&id("mod:missing"), Bytes::new()).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_after_disconnect_fails() {
        let dispatcher = session();
        dispatcher.addon().handle_disconnect().unwrap();

        assert!(matches!(
            dispatcher.dispatch(&id("mod:echo"), Bytes::new()),
            Err(ChannelError::ConnectionClosed)
        ));
    }
}

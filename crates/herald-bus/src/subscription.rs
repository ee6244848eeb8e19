//! # Subscription Guard
//!
//! Ties a registration to the lifetime of a value.

use crate::identity::SubscriberId;
use crate::proxy::EventProxy;
use crate::Event;
use std::fmt;
use tracing::debug;

/// A registration that lasts as long as this handle.
///
/// When dropped, the handler is removed from every publisher behind the
/// pipeline it was bound to.
pub struct Subscription<E: Event> {
    /// The pipeline the handler was registered through.
    proxy: EventProxy<E>,

    /// Identity the handler is registered under.
    id: SubscriberId,

    closed: bool,
}

impl<E: Event> Subscription<E> {
    /// Register `handler` at the end of `proxy` under a fresh identity.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn new(proxy: &EventProxy<E>, handler: impl Fn(&E) + Send + Sync + 'static) -> Self {
        let id = proxy.listen(handler);
        Self {
            proxy: proxy.clone(),
            id,
            closed: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Unsubscribe now instead of at drop.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.proxy.unsubscribe(self.id);
        debug!(subscriber = %self.id, "Subscription dropped");
    }
}

impl<E: Event> Drop for Subscription<E> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<E: Event> fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("closed", &self.closed)
            .finish()
    }
}

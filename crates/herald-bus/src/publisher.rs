//! # Event Publisher
//!
//! Defines the publishing side of the engine: the owner of a subscriber
//! registry and the entry point for delivery.

use crate::diagnostics::Diagnostics;
use crate::envelope::Envelope;
use crate::error::SubscriptionError;
use crate::identity::SubscriberId;
use crate::provenance::{ProvenanceEntry, ProvenancePayload};
use crate::proxy::EventProxy;
use crate::registry::{Handler, Registry, SubmitterOf};
use crate::{Event, DEFAULT_PUBLISHER_LABEL};
use std::fmt;
use std::sync::Arc;

/// Owns a registry of handlers and delivers events to them.
///
/// Delivery is synchronous: [`publish`](Self::publish) runs every
/// registered handler on the calling thread before it returns. The order
/// in which handlers run is unspecified.
///
/// Every publisher has its own [`SubscriberId`], used when it is the
/// target of a [`redirect`](EventProxy::redirect).
pub struct Publisher<E: Event> {
    registry: Arc<Registry<E>>,
}

impl<E: Event> Publisher<E> {
    /// Create a publisher recording into the global diagnostics context.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_diagnostics(label, Diagnostics::global())
    }

    /// Create a publisher recording into `diagnostics`.
    #[must_use]
    pub fn with_diagnostics(label: impl Into<String>, diagnostics: &Diagnostics) -> Self {
        Self::build(label.into(), Some(diagnostics.clone()), None)
    }

    /// A publisher that never records diagnostics. Used by the diagnostic
    /// channels themselves.
    pub(crate) fn detached(label: impl Into<String>) -> Self {
        Self::build(label.into(), None, None)
    }

    fn build(
        label: String,
        diagnostics: Option<Diagnostics>,
        submitter_of: Option<SubmitterOf<E>>,
    ) -> Self {
        Self {
            registry: Arc::new(Registry::new(label, diagnostics, submitter_of)),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        self.registry.label()
    }

    /// This publisher's own identity.
    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.registry.id()
    }

    /// Register `handler` under `id`, replacing any handler already there.
    ///
    /// Replacing is not an error; it is logged and reported on the
    /// general-warnings channel.
    pub fn subscribe(&self, id: SubscriberId, handler: impl Fn(&E) + Send + Sync + 'static) {
        let handler: Handler<E> = Arc::new(handler);
        let label = self.registry.tracking().map(|_| format!("handler:{id}"));
        self.registry.insert(id, handler, label);
        self.announce(id);
    }

    /// Register `handler` under `id` unless the identity is already taken.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::AlreadySubscribed`] if `id` is registered.
    pub fn try_subscribe(
        &self,
        id: SubscriberId,
        handler: impl Fn(&E) + Send + Sync + 'static,
    ) -> Result<(), SubscriptionError> {
        let handler: Handler<E> = Arc::new(handler);
        let label = self.registry.tracking().map(|_| format!("handler:{id}"));
        self.registry.try_insert(id, handler, label)?;
        self.announce(id);
        Ok(())
    }

    /// Remove the handler registered under `id`.
    ///
    /// Returns whether a handler was removed; absent identities are a no-op.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.registry.remove(id)
    }

    /// Deliver `event` to every registered handler.
    ///
    /// # Returns
    ///
    /// The number of handlers that received the event.
    pub fn publish(&self, event: E) -> usize {
        self.registry.dispatch(&event)
    }

    /// A pipeline rooted at this publisher.
    #[must_use]
    pub fn proxy(&self) -> EventProxy<E> {
        EventProxy::from_registry(&self.registry)
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    #[must_use]
    pub fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.registry.contains(id)
    }

    pub(crate) fn registry(&self) -> &Arc<Registry<E>> {
        &self.registry
    }

    fn announce(&self, id: SubscriberId) {
        if let Some(diagnostics) = self.registry.tracking() {
            let payload = ProvenancePayload::from_entry(ProvenanceEntry::PublisherLabel {
                label: self.registry.description().to_owned(),
            })
            .adding(ProvenanceEntry::Subscribed {
                identifier: id,
                of_type: "handler".to_owned(),
            });
            diagnostics.submit_subscription(payload);
        }
    }
}

impl<E: Event> Default for Publisher<E> {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLISHER_LABEL)
    }
}

impl<E: Event> fmt::Debug for Publisher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("label", &self.registry.description())
            .field("id", &self.id())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

fn envelope_submitter<E>(envelope: &Envelope<E>) -> Option<SubscriberId> {
    envelope.submitter()
}

/// A publisher of [`Envelope`]s that never echoes an event back to the
/// subscriber that submitted it.
///
/// Suppression is applied on every delivery path, including events
/// redirected into [`as_publisher`](Self::as_publisher).
pub struct SignedPublisher<E: Event> {
    inner: Publisher<Envelope<E>>,
}

impl<E: Event> SignedPublisher<E> {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_diagnostics(label, Diagnostics::global())
    }

    #[must_use]
    pub fn with_diagnostics(label: impl Into<String>, diagnostics: &Diagnostics) -> Self {
        let submitter_of: SubmitterOf<Envelope<E>> = envelope_submitter::<E>;
        Self {
            inner: Publisher::build(label.into(), Some(diagnostics.clone()), Some(submitter_of)),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        self.inner.label()
    }

    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.inner.id()
    }

    /// Deliver `value` to every subscriber except `submitter`.
    ///
    /// With no submitter the event reaches everyone.
    pub fn publish(&self, value: E, submitter: Option<SubscriberId>) -> usize {
        self.inner.publish(Envelope::new(value, submitter))
    }

    pub fn publish_envelope(&self, envelope: Envelope<E>) -> usize {
        self.inner.publish(envelope)
    }

    pub fn subscribe(
        &self,
        id: SubscriberId,
        handler: impl Fn(&Envelope<E>) + Send + Sync + 'static,
    ) {
        self.inner.subscribe(id, handler);
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.inner.unsubscribe(id)
    }

    #[must_use]
    pub fn proxy(&self) -> EventProxy<Envelope<E>> {
        self.inner.proxy()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriber_count()
    }

    /// The underlying envelope publisher, e.g. as a redirect target.
    #[must_use]
    pub fn as_publisher(&self) -> &Publisher<Envelope<E>> {
        &self.inner
    }
}

impl<E: Event> Default for SignedPublisher<E> {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLISHER_LABEL)
    }
}

impl<E: Event> fmt::Debug for SignedPublisher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SignedPublisher").field(&self.inner).finish()
    }
}

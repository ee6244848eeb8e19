//! # Event Proxy
//!
//! The composition surface of the engine. An [`EventProxy`] is an immutable
//! handle to a pipeline rooted at one or more publishers. Combinators
//! (`filter`, `map`, `flat_map`, `interrupted`, `merge`) return new proxies
//! and never modify the receiver; terminals (`listen`, `subscribe`, `bind`,
//! `redirect`) register a handler at the end of the chain.
//!
//! ```text
//!  Publisher<i32> ──► filter ──► map(i32 → String) ──► listen(handler)
//!        ▲                                                  │
//!        └──────────── registered under a SubscriberId ─────┘
//! ```
//!
//! A proxy has no teardown of its own: dropping it leaves registrations made
//! through it in place. Remove them with [`EventProxy::unsubscribe`], or use
//! [`EventProxy::bind`] to tie a registration to a guard value.

use crate::diagnostics::Diagnostics;
use crate::envelope::Envelope;
use crate::error::SubscriptionError;
use crate::identity::SubscriberId;
use crate::pipeline::{Stage, Transform};
use crate::provenance::{ProvenanceEntry, ProvenancePayload};
use crate::publisher::Publisher;
use crate::registry::{Handler, Registry};
use crate::subscription::Subscription;
use crate::weak::WeakProxy;
use crate::Event;
use std::any::type_name;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Composable handle to a publish/subscribe pipeline.
pub struct EventProxy<E: Event> {
    stage: Arc<Stage<E>>,
    diagnostics: Option<Diagnostics>,
}

impl<E: Event> Clone for EventProxy<E> {
    fn clone(&self) -> Self {
        Self {
            stage: Arc::clone(&self.stage),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

impl<E: Event> EventProxy<E> {
    pub(crate) fn from_registry(registry: &Arc<Registry<E>>) -> Self {
        Self {
            stage: Arc::new(Stage::source(registry)),
            diagnostics: registry.diagnostics().cloned(),
        }
    }

    fn derive<U: Event>(&self, stage: Stage<U>) -> EventProxy<U> {
        EventProxy {
            stage: Arc::new(stage),
            diagnostics: self.diagnostics.clone(),
        }
    }

    fn tracking(&self) -> Option<&Diagnostics> {
        self.diagnostics.as_ref().filter(|d| d.is_enabled())
    }

    /// The provenance trail of this pipeline.
    ///
    /// Returns the shared empty sentinel while diagnostics are disabled.
    #[must_use]
    pub fn provenance(&self) -> ProvenancePayload {
        match self.tracking() {
            Some(diagnostics) => diagnostics.payload(|| self.stage.provenance()),
            None => ProvenancePayload::empty(),
        }
    }

    /// Attach `handler` under `id` and report it on the subscription trail.
    ///
    /// Labels and provenance are only built while diagnostics are enabled.
    pub(crate) fn register(
        &self,
        id: SubscriberId,
        handler: Handler<E>,
        label: impl FnOnce() -> String,
        entry: impl FnOnce() -> ProvenanceEntry,
    ) -> bool {
        let tracking = self.tracking();
        let label = tracking.map(|_| label());
        let attached = self.stage.attach(id, handler, label.as_deref());
        if let Some(diagnostics) = tracking {
            diagnostics.submit_subscription(self.stage.provenance().adding(entry()));
        }
        attached
    }

    // =========================================================================
    // RAW SUBSCRIPTION
    // =========================================================================

    /// Register `handler` under `id` at the end of this pipeline.
    ///
    /// Re-using an identity replaces its previous handler in every source.
    pub fn subscribe_with_id(
        &self,
        id: SubscriberId,
        handler: impl Fn(&E) + Send + Sync + 'static,
    ) {
        self.register(
            id,
            Arc::new(handler),
            || format!("handler:{id}"),
            || ProvenanceEntry::Subscribed {
                identifier: id,
                of_type: "handler".to_owned(),
            },
        );
    }

    /// Like [`subscribe_with_id`](Self::subscribe_with_id), but reports a
    /// pipeline whose publishers are all gone.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::PublisherDropped`] if no source publisher
    /// is alive.
    pub fn try_subscribe_with_id(
        &self,
        id: SubscriberId,
        handler: impl Fn(&E) + Send + Sync + 'static,
    ) -> Result<(), SubscriptionError> {
        let attached = self.register(
            id,
            Arc::new(handler),
            || format!("handler:{id}"),
            || ProvenanceEntry::Subscribed {
                identifier: id,
                of_type: "handler".to_owned(),
            },
        );
        if attached {
            Ok(())
        } else {
            Err(SubscriptionError::PublisherDropped)
        }
    }

    /// Remove `id` from every publisher behind this pipeline.
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.stage.detach(id);
    }

    // =========================================================================
    // WEAKLY CAPTURED SUBSCRIBERS
    // =========================================================================

    /// Subscribe `object` without keeping it alive.
    ///
    /// `producer` runs with the object for every event while the object is
    /// alive. The first event delivered after the object is dropped removes
    /// the registration instead.
    pub fn subscribe<T>(
        &self,
        object: &Arc<T>,
        producer: impl Fn(&T, &E) + Send + Sync + 'static,
    ) -> SubscriberId
    where
        T: Send + Sync + 'static,
    {
        let id = SubscriberId::issue();
        self.subscribe_as(id, object, producer);
        id
    }

    /// Like [`subscribe`](Self::subscribe), under an identity the caller
    /// already holds (for example one the object uses to sign envelopes).
    pub fn subscribe_as<T>(
        &self,
        id: SubscriberId,
        object: &Arc<T>,
        producer: impl Fn(&T, &E) + Send + Sync + 'static,
    ) where
        T: Send + Sync + 'static,
    {
        let object = Arc::downgrade(object);
        let chain = Arc::clone(&self.stage);
        let handler: Handler<E> = Arc::new(move |event: &E| match object.upgrade() {
            Some(object) => producer(&object, event),
            None => {
                debug!(subscriber = %id, "Subscriber dropped; unsubscribing");
                chain.detach(id);
            }
        });
        self.register(
            id,
            handler,
            || format!("{}:{id}", type_name::<T>()),
            || ProvenanceEntry::Subscribed {
                identifier: id,
                of_type: type_name::<T>().to_owned(),
            },
        );
    }

    /// Start an object-scoped pipeline whose stages receive `object`.
    #[must_use]
    pub fn weak<T>(&self, object: &Arc<T>) -> WeakProxy<T, E>
    where
        T: Send + Sync + 'static,
    {
        let object_ref = Arc::downgrade(object);
        let guarded = self.derive(Stage::Guard {
            upstream: Arc::clone(&self.stage),
            alive: Arc::new(move || object_ref.strong_count() > 0),
        });
        WeakProxy::new(Arc::downgrade(object), guarded)
    }

    // =========================================================================
    // COMBINATORS
    // =========================================================================

    /// Forward only events for which `predicate` holds.
    #[must_use]
    pub fn filter(&self, predicate: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.derive(Stage::Filter {
            upstream: Arc::clone(&self.stage),
            predicate: Arc::new(predicate),
        })
    }

    /// Forward `transform(event)` for every event.
    #[must_use]
    pub fn map<U: Event>(
        &self,
        transform: impl Fn(&E) -> U + Send + Sync + 'static,
    ) -> EventProxy<U> {
        let upstream = Arc::clone(&self.stage);
        self.derive(Stage::Transform(Arc::new(Transform::new(
            upstream,
            move |event: &E| Some(transform(event)),
        ))))
    }

    /// Forward `transform(event)` when it yields a value; drop the event
    /// otherwise.
    #[must_use]
    pub fn flat_map<U: Event>(
        &self,
        transform: impl Fn(&E) -> Option<U> + Send + Sync + 'static,
    ) -> EventProxy<U> {
        let upstream = Arc::clone(&self.stage);
        self.derive(Stage::Transform(Arc::new(Transform::new(upstream, transform))))
    }

    /// Run `tap` on every event, then forward the event unchanged.
    ///
    /// A panicking tap is contained: it is logged, reported on the
    /// general-warnings channel, and the event is still forwarded.
    #[must_use]
    pub fn interrupted(&self, tap: impl Fn(&E) + Send + Sync + 'static) -> Self {
        self.derive(Stage::Interrupt {
            upstream: Arc::clone(&self.stage),
            tap: Arc::new(tap),
            diagnostics: self.diagnostics.clone(),
        })
    }

    /// Receive events from both this pipeline and `other`.
    ///
    /// Subscribing attaches the same handler to both sides under one
    /// identity; unsubscribing detaches from both. No deduplication.
    ///
    /// When both sides read from the same publisher, the second attach
    /// replaces the first under that identity, so only `other` delivers.
    #[must_use]
    pub fn merge(&self, other: &EventProxy<E>) -> Self {
        self.derive(Stage::Merge {
            primary: Arc::clone(&self.stage),
            secondary: Arc::clone(&other.stage),
        })
    }

    // =========================================================================
    // TERMINALS
    // =========================================================================

    /// Forward every event from this pipeline into `target`, as if it were
    /// published there directly.
    ///
    /// The target is registered under its own [`Publisher::id`] and held
    /// weakly; once it is dropped the bridge removes itself on the next
    /// event. Undo with `proxy.unsubscribe(target.id())`.
    pub fn redirect(&self, target: &Publisher<E>) {
        let id = target.id();
        let registry = Arc::downgrade(target.registry());
        let chain = Arc::clone(&self.stage);
        let handler: Handler<E> = Arc::new(move |event: &E| match registry.upgrade() {
            Some(registry) => {
                registry.dispatch(event);
            }
            None => {
                debug!(subscriber = %id, "Redirect target dropped; unsubscribing");
                chain.detach(id);
            }
        });
        let description = target.registry().description();
        self.register(
            id,
            handler,
            || description.to_owned(),
            || ProvenanceEntry::Redirected {
                to: description.to_owned(),
            },
        );
    }

    /// Register `handler` under a freshly issued identity.
    ///
    /// The registration lasts until `unsubscribe` is called with the
    /// returned identity or the publisher is dropped.
    pub fn listen(&self, handler: impl Fn(&E) + Send + Sync + 'static) -> SubscriberId {
        let id = SubscriberId::issue();
        self.register(
            id,
            Arc::new(handler),
            || format!("listener<{}>:{id}", type_name::<E>()),
            || ProvenanceEntry::Listened {
                of_type: type_name::<E>().to_owned(),
            },
        );
        id
    }

    /// Register `handler` for as long as the returned guard is alive.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn bind(&self, handler: impl Fn(&E) + Send + Sync + 'static) -> Subscription<E> {
        Subscription::new(self, handler)
    }
}

// =============================================================================
// SIGNED VIEWS
// =============================================================================

impl<E: Event + Clone> EventProxy<E> {
    /// Lift plain events into envelopes with no submitter.
    #[must_use]
    pub fn signed(&self) -> EventProxy<Envelope<E>> {
        self.map(|event: &E| Envelope::unsigned(event.clone()))
    }
}

impl<E: Event> EventProxy<Envelope<E>> {
    /// Drop submitter information.
    #[must_use]
    pub fn unsigned(&self) -> EventProxy<E>
    where
        E: Clone,
    {
        self.map(|envelope: &Envelope<E>| envelope.value().clone())
    }

    /// Forward envelopes whose value satisfies `predicate`.
    #[must_use]
    pub fn filter_value(&self, predicate: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.filter(move |envelope: &Envelope<E>| predicate(envelope.value()))
    }

    /// Transform the value of each envelope, keeping its submitter.
    #[must_use]
    pub fn map_value<U: Event>(
        &self,
        transform: impl Fn(&E) -> U + Send + Sync + 'static,
    ) -> EventProxy<Envelope<U>> {
        self.map(move |envelope: &Envelope<E>| {
            Envelope::new(transform(envelope.value()), envelope.submitter())
        })
    }
}

impl<E: Event> fmt::Debug for EventProxy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventProxy")
            .field("event", &type_name::<E>())
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

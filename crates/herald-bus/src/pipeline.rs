//! # Pipeline Stages
//!
//! An [`EventProxy`](crate::EventProxy) is a handle to the last node of a
//! chain of stages. Attaching a handler walks the chain back to its
//! source(s), wrapping the handler once per stage, and registers the
//! resulting closure in each source publisher under the subscriber's
//! identity. Detaching walks the same path and removes the identity.
//!
//! Stages that change the event type cannot live in a single enum, so a
//! `Transform` node erases its upstream type behind [`Upstream`].
//!
//! Sources hold their registry weakly: a pipeline never keeps a publisher
//! alive, and attaching to a dropped publisher is a no-op.

use crate::diagnostics::Diagnostics;
use crate::identity::SubscriberId;
use crate::provenance::{ProvenanceEntry, ProvenancePayload};
use crate::registry::{Handler, Registry};
use crate::Event;
use std::any::type_name;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

pub(crate) type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;
pub(crate) type Tap<E> = Arc<dyn Fn(&E) + Send + Sync>;
pub(crate) type Liveness = Arc<dyn Fn() -> bool + Send + Sync>;

pub(crate) enum Stage<E: Event> {
    /// A publisher's registry.
    Source { registry: Weak<Registry<E>> },

    /// Forward only events matching `predicate`.
    Filter {
        upstream: Arc<Stage<E>>,
        predicate: Predicate<E>,
    },

    /// Run `tap` on every event, then forward it unchanged.
    Interrupt {
        upstream: Arc<Stage<E>>,
        tap: Tap<E>,
        diagnostics: Option<Diagnostics>,
    },

    /// Attach to both upstreams with the same identity and handler.
    Merge {
        primary: Arc<Stage<E>>,
        secondary: Arc<Stage<E>>,
    },

    /// Forward while `alive` holds; detach from upstream once it does not.
    Guard {
        upstream: Arc<Stage<E>>,
        alive: Liveness,
    },

    /// Map or flat-map from another event type.
    Transform(Arc<dyn Upstream<E>>),
}

/// A stage whose upstream carries a different event type.
pub(crate) trait Upstream<E>: Send + Sync {
    fn attach(&self, id: SubscriberId, handler: Handler<E>, label: Option<&str>) -> bool;
    fn detach(&self, id: SubscriberId);
    fn provenance(&self) -> ProvenancePayload;
}

impl<E: Event> Stage<E> {
    pub(crate) fn source(registry: &Arc<Registry<E>>) -> Self {
        Stage::Source {
            registry: Arc::downgrade(registry),
        }
    }

    /// Register `handler` under `id` in every source reachable from this stage.
    ///
    /// Returns `false` when no source publisher is alive.
    pub(crate) fn attach(
        &self,
        id: SubscriberId,
        handler: Handler<E>,
        label: Option<&str>,
    ) -> bool {
        match self {
            Stage::Source { registry } => match registry.upgrade() {
                Some(registry) => {
                    registry.insert(id, handler, label.map(str::to_owned));
                    true
                }
                None => {
                    debug!(subscriber = %id, "Attach ignored; publisher dropped");
                    false
                }
            },
            Stage::Filter {
                upstream,
                predicate,
            } => {
                let predicate = Arc::clone(predicate);
                let wrapped: Handler<E> = Arc::new(move |event: &E| {
                    if predicate(event) {
                        handler(event);
                    }
                });
                upstream.attach(id, wrapped, label)
            }
            Stage::Interrupt {
                upstream,
                tap,
                diagnostics,
            } => {
                let tap = Arc::clone(tap);
                let diagnostics = diagnostics.clone();
                let wrapped: Handler<E> = Arc::new(move |event: &E| {
                    if panic::catch_unwind(AssertUnwindSafe(|| tap(event))).is_err() {
                        warn!(subscriber = %id, "Interrupt tap panicked; event forwarded");
                        if let Some(diagnostics) = &diagnostics {
                            diagnostics.warn(format!(
                                "interrupt tap for {id} panicked on {}; event forwarded unchanged",
                                type_name::<E>()
                            ));
                        }
                    }
                    handler(event);
                });
                upstream.attach(id, wrapped, label)
            }
            Stage::Merge { primary, secondary } => {
                let attached_primary = primary.attach(id, Arc::clone(&handler), label);
                let attached_secondary = secondary.attach(id, handler, label);
                attached_primary || attached_secondary
            }
            Stage::Guard { upstream, alive } => {
                let alive = Arc::clone(alive);
                let chain = Arc::clone(upstream);
                let wrapped: Handler<E> = Arc::new(move |event: &E| {
                    if alive() {
                        handler(event);
                    } else {
                        debug!(subscriber = %id, "Scoped subscriber dropped; unsubscribing");
                        chain.detach(id);
                    }
                });
                upstream.attach(id, wrapped, label)
            }
            Stage::Transform(upstream) => upstream.attach(id, handler, label),
        }
    }

    /// Remove `id` from every source reachable from this stage.
    pub(crate) fn detach(&self, id: SubscriberId) {
        match self {
            Stage::Source { registry } => {
                if let Some(registry) = registry.upgrade() {
                    registry.remove(id);
                }
            }
            Stage::Filter { upstream, .. }
            | Stage::Interrupt { upstream, .. }
            | Stage::Guard { upstream, .. } => upstream.detach(id),
            Stage::Merge { primary, secondary } => {
                primary.detach(id);
                secondary.detach(id);
            }
            Stage::Transform(upstream) => upstream.detach(id),
        }
    }

    /// The provenance trail implied by the chain's structure.
    pub(crate) fn provenance(&self) -> ProvenancePayload {
        match self {
            Stage::Source { registry } => {
                let label = registry.upgrade().map_or_else(
                    || format!("Publisher<{}>:<dropped>", type_name::<E>()),
                    |registry| registry.description().to_owned(),
                );
                ProvenancePayload::from_entry(ProvenanceEntry::PublisherLabel { label })
            }
            Stage::Filter { upstream, .. } => {
                upstream.provenance().adding(ProvenanceEntry::Filtered)
            }
            Stage::Interrupt { upstream, .. } => {
                upstream.provenance().adding(ProvenanceEntry::Interrupted)
            }
            Stage::Merge { primary, secondary } => {
                primary.provenance().merging(secondary.provenance())
            }
            Stage::Guard { upstream, .. } => upstream.provenance(),
            Stage::Transform(upstream) => upstream.provenance(),
        }
    }
}

/// `map` and `flat_map` from `S` to `E`. A total map is a flat map that
/// always yields.
pub(crate) struct Transform<S: Event, E> {
    upstream: Arc<Stage<S>>,
    transform: Arc<dyn Fn(&S) -> Option<E> + Send + Sync>,
}

impl<S: Event, E> Transform<S, E> {
    pub(crate) fn new(
        upstream: Arc<Stage<S>>,
        transform: impl Fn(&S) -> Option<E> + Send + Sync + 'static,
    ) -> Self {
        Self {
            upstream,
            transform: Arc::new(transform),
        }
    }
}

impl<S: Event, E: Event> Upstream<E> for Transform<S, E> {
    fn attach(&self, id: SubscriberId, handler: Handler<E>, label: Option<&str>) -> bool {
        let transform = Arc::clone(&self.transform);
        let wrapped: Handler<S> = Arc::new(move |event: &S| {
            if let Some(transformed) = transform(event) {
                handler(&transformed);
            }
        });
        self.upstream.attach(id, wrapped, label)
    }

    fn detach(&self, id: SubscriberId) {
        self.upstream.detach(id);
    }

    fn provenance(&self) -> ProvenancePayload {
        self.upstream.provenance().adding(ProvenanceEntry::Mapped {
            from: type_name::<S>().to_owned(),
            to: type_name::<E>().to_owned(),
        })
    }
}

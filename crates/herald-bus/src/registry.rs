//! # Subscriber Registry
//!
//! The identity → handler map behind every publisher, and the dispatch loop
//! that walks it.
//!
//! Dispatch snapshots the live handlers and releases the lock before
//! invoking any of them, so handlers may subscribe or unsubscribe (on this
//! or any other publisher) while an event is being delivered. Every handler
//! present when the snapshot is taken runs exactly once; the order among
//! them follows `HashMap` iteration and is deliberately unspecified.

use crate::diagnostics::Diagnostics;
use crate::error::SubscriptionError;
use crate::identity::SubscriberId;
use crate::provenance::PublishRecord;
use crate::Event;
use parking_lot::RwLock;
use std::any::type_name;
use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// A registered event handler.
pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Extracts the submitter of an event, for echo suppression.
pub(crate) type SubmitterOf<E> = fn(&E) -> Option<SubscriberId>;

struct Registration<E> {
    handler: Handler<E>,
    /// Only recorded while diagnostics are enabled.
    label: Option<String>,
}

pub(crate) struct Registry<E> {
    id: SubscriberId,
    label: String,
    description: String,
    entries: RwLock<HashMap<SubscriberId, Registration<E>>>,
    diagnostics: Option<Diagnostics>,
    submitter_of: Option<SubmitterOf<E>>,
}

impl<E: Event> Registry<E> {
    pub(crate) fn new(
        label: String,
        diagnostics: Option<Diagnostics>,
        submitter_of: Option<SubmitterOf<E>>,
    ) -> Self {
        let description = format!("Publisher<{}>:{}", type_name::<E>(), label);
        Self {
            id: SubscriberId::issue(),
            label,
            description,
            entries: RwLock::new(HashMap::new()),
            diagnostics,
            submitter_of,
        }
    }

    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    /// `Publisher<Type>:label`, as it appears in provenance.
    pub(crate) fn description(&self) -> &str {
        &self.description
    }

    pub(crate) fn diagnostics(&self) -> Option<&Diagnostics> {
        self.diagnostics.as_ref()
    }

    /// The diagnostics context, if it is currently recording.
    pub(crate) fn tracking(&self) -> Option<&Diagnostics> {
        self.diagnostics.as_ref().filter(|d| d.is_enabled())
    }

    /// Register `handler` under `id`, replacing any previous handler.
    ///
    /// Returns `true` when an existing registration was overwritten.
    pub(crate) fn insert(
        &self,
        id: SubscriberId,
        handler: Handler<E>,
        label: Option<String>,
    ) -> bool {
        let replaced = self
            .entries
            .write()
            .insert(id, Registration { handler, label })
            .is_some();

        if replaced {
            warn!(
                publisher = %self.label,
                subscriber = %id,
                "Subscriber re-registered; previous handler replaced"
            );
            if let Some(diagnostics) = self.tracking() {
                diagnostics.warn(format!(
                    "{} already had a handler for {id}; the previous handler was replaced",
                    self.description
                ));
            }
        } else {
            debug!(publisher = %self.label, subscriber = %id, "Subscriber registered");
        }
        replaced
    }

    /// Register `handler` under `id` only if the identity is free.
    pub(crate) fn try_insert(
        &self,
        id: SubscriberId,
        handler: Handler<E>,
        label: Option<String>,
    ) -> Result<(), SubscriptionError> {
        match self.entries.write().entry(id) {
            MapEntry::Occupied(_) => Err(SubscriptionError::AlreadySubscribed { id }),
            MapEntry::Vacant(slot) => {
                slot.insert(Registration { handler, label });
                debug!(publisher = %self.label, subscriber = %id, "Subscriber registered");
                Ok(())
            }
        }
    }

    /// Remove the registration for `id`. Absent identities are a no-op.
    pub(crate) fn remove(&self, id: SubscriberId) -> bool {
        let removed = self.entries.write().remove(&id).is_some();
        if removed {
            debug!(publisher = %self.label, subscriber = %id, "Subscriber removed");
        }
        removed
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub(crate) fn contains(&self, id: SubscriberId) -> bool {
        self.entries.read().contains_key(&id)
    }

    /// Deliver `event` to every registered handler except its submitter.
    ///
    /// Returns the number of handlers invoked.
    pub(crate) fn dispatch(&self, event: &E) -> usize {
        let suppressed = self.submitter_of.and_then(|submitter_of| submitter_of(event));
        let tracking = self.tracking().cloned();

        let snapshot: Vec<(SubscriberId, Handler<E>, Option<String>)> = {
            let entries = self.entries.read();
            entries
                .iter()
                .filter(|(id, _)| Some(**id) != suppressed)
                .map(|(id, registration)| {
                    let label = if tracking.is_some() {
                        registration.label.clone()
                    } else {
                        None
                    };
                    (*id, Arc::clone(&registration.handler), label)
                })
                .collect()
        };

        let delivered = snapshot.len();
        let mut handled = Vec::new();
        for (id, handler, label) in snapshot {
            handler(event);
            if tracking.is_some() {
                handled.push(label.unwrap_or_else(|| id.to_string()));
            }
        }

        trace!(publisher = %self.label, delivered, "Event published");

        if let Some(diagnostics) = tracking {
            diagnostics.submit_publishing(|| PublishRecord {
                publisher: self.description.clone(),
                event: diagnostics.render_event(event),
                handlers: handled,
                suppressed,
            });
        }

        delivered
    }
}

//! # Provenance
//!
//! Structured records describing how a pipeline was built and how a publish
//! call was dispatched. These are the messages carried by the diagnostic
//! channels and consumed verbatim by log renderers.

use crate::identity::SubscriberId;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

lazy_static! {
    /// Shared empty payload handed out while diagnostics are disabled.
    static ref EMPTY_ENTRIES: Arc<Vec<ProvenanceEntry>> = Arc::new(Vec::new());
}

/// One step in the construction of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProvenanceEntry {
    /// The originating publisher, as `Publisher<Type>:label`.
    PublisherLabel { label: String },

    /// Events pass through a predicate.
    Filtered,

    /// Events are transformed from one type to another.
    Mapped { from: String, to: String },

    /// Events are observed by a side effect and forwarded unchanged.
    Interrupted,

    /// Events are forwarded into another publisher.
    Redirected { to: String },

    /// A subscriber object was attached under `identifier`.
    Subscribed {
        identifier: SubscriberId,
        of_type: String,
    },

    /// A bare handler was attached through `listen`.
    Listened { of_type: String },

    /// Another pipeline was merged in; its full trail is kept nested.
    Merged { payload: ProvenancePayload },
}

/// Ordered, append-only trail of [`ProvenanceEntry`] values.
///
/// Payloads are cheap to clone. Appending never mutates a payload that is
/// shared with someone else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProvenancePayload {
    entries: Arc<Vec<ProvenanceEntry>>,
}

impl ProvenancePayload {
    /// The shared empty payload.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: Arc::clone(&EMPTY_ENTRIES),
        }
    }

    /// A payload holding a single entry.
    #[must_use]
    pub fn from_entry(entry: ProvenanceEntry) -> Self {
        Self {
            entries: Arc::new(vec![entry]),
        }
    }

    /// Return this payload with `entry` appended.
    #[must_use]
    pub fn adding(mut self, entry: ProvenanceEntry) -> Self {
        Arc::make_mut(&mut self.entries).push(entry);
        self
    }

    /// Return this payload with `other` appended as a nested `Merged` entry.
    #[must_use]
    pub fn merging(self, other: ProvenancePayload) -> Self {
        self.adding(ProvenanceEntry::Merged { payload: other })
    }

    /// The entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[ProvenanceEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether this is the shared sentinel rather than a freshly built payload.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        Arc::ptr_eq(&self.entries, &EMPTY_ENTRIES)
    }
}

impl Default for ProvenancePayload {
    fn default() -> Self {
        Self::empty()
    }
}

/// One structured record per `publish` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRecord {
    /// Label of the publishing publisher, as `Publisher<Type>:label`.
    pub publisher: String,

    /// Debug rendering of the event, truncated to the configured limit.
    pub event: String,

    /// Labels of every handler invoked, in invocation order.
    pub handlers: Vec<String>,

    /// Subscriber skipped because it submitted the event.
    pub suppressed: Option<SubscriberId>,
}

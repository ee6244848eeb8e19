//! # Signed Envelopes
//!
//! An event paired with the identity of whoever submitted it. Signed
//! publishers use the submitter to suppress echoes: the envelope is
//! delivered to everyone except the subscriber that sent it.

use crate::identity::SubscriberId;
use serde::{Deserialize, Serialize};

/// An event value tagged with an optional submitter identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<E> {
    value: E,
    submitter: Option<SubscriberId>,
}

impl<E> Envelope<E> {
    /// Wrap `value` as submitted by `submitter`.
    #[must_use]
    pub fn new(value: E, submitter: Option<SubscriberId>) -> Self {
        Self { value, submitter }
    }

    /// Wrap `value` with no submitter. Delivered to every subscriber.
    #[must_use]
    pub fn unsigned(value: E) -> Self {
        Self::new(value, None)
    }

    /// The wrapped event.
    #[must_use]
    pub fn value(&self) -> &E {
        &self.value
    }

    /// Identity of the subscriber that submitted this event, if any.
    #[must_use]
    pub fn submitter(&self) -> Option<SubscriberId> {
        self.submitter
    }

    /// Whether `id` submitted this event.
    #[must_use]
    pub fn is_submitted_by(&self, id: SubscriberId) -> bool {
        self.submitter == Some(id)
    }

    /// Unwrap the event, dropping the submitter.
    #[must_use]
    pub fn into_value(self) -> E {
        self.value
    }

    /// Transform the value, keeping the submitter.
    #[must_use]
    pub fn map<U>(self, transform: impl FnOnce(E) -> U) -> Envelope<U> {
        Envelope {
            value: transform(self.value),
            submitter: self.submitter,
        }
    }
}

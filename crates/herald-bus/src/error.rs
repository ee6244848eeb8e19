//! Error types for subscription management.

use crate::identity::SubscriberId;
use thiserror::Error;

/// Errors from the rejecting subscription variants.
///
/// Steady-state delivery never fails; these only surface from
/// `try_subscribe`-style calls that opt out of the overwrite policy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// A handler is already registered under this identity.
    #[error("Subscriber {id} is already registered")]
    AlreadySubscribed { id: SubscriberId },

    /// Every publisher behind the proxy has been dropped.
    #[error("Publisher dropped")]
    PublisherDropped,
}

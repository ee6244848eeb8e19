//! # Subscriber Identity
//!
//! Issued handles that name a subscriber in a publisher's registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Next identity to hand out. Zero is never issued.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque, comparable token identifying a subscriber.
///
/// Identities are issued from a process-wide monotonically increasing
/// counter, so two distinct subscribers never share one, even when they are
/// structurally equal. An identity is only ever reused if the caller copies
/// it and registers a new handler under it on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Issue a fresh identity.
    #[must_use]
    pub fn issue() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value of this identity.
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

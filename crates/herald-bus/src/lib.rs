//! # Herald Bus - Typed In-Process Publish/Subscribe
//!
//! Synchronous event delivery with composable pipelines and an optional
//! provenance trail.
//!
//! ## Model
//!
//! ```text
//! ┌──────────────┐   publish(event)   ┌──────────────┐
//! │  Publisher   │ ─────────────────► │  handler #1  │
//! │  <E>         │ ──────┐            └──────────────┘
//! └──────────────┘       │            ┌──────────────┐
//!        │               └──────────► │  handler #N  │
//!        ▼ proxy()                    └──────────────┘
//! ┌──────────────┐
//! │ EventProxy   │  filter / map / flat_map / interrupted / merge
//! │  <E>         │  listen / subscribe / bind / redirect
//! └──────────────┘
//! ```
//!
//! - Every handler registered when `publish` starts runs exactly once,
//!   on the publishing thread, before `publish` returns.
//! - Handlers are keyed by [`SubscriberId`]; one identity holds at most one
//!   handler per publisher.
//! - Pipelines hold their publishers weakly. Objects subscribed through
//!   [`EventProxy::subscribe`] are held weakly and removed lazily.
//! - [`SignedPublisher`] never echoes an event to the subscriber that
//!   submitted it.
//!
//! ## Diagnostics
//!
//! When a [`Diagnostics`] context is enabled, every subscription and every
//! publish is described on its channels. When disabled, none of that work
//! is done.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod diagnostics;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod observable;
pub mod provenance;
pub mod proxy;
pub mod publisher;
pub mod subscription;
pub mod weak;

mod pipeline;
mod registry;

// Re-export main types
pub use config::DiagnosticsConfig;
pub use diagnostics::Diagnostics;
pub use envelope::Envelope;
pub use error::SubscriptionError;
pub use identity::SubscriberId;
pub use observable::Observable;
pub use provenance::{ProvenanceEntry, ProvenancePayload, PublishRecord};
pub use proxy::EventProxy;
pub use publisher::{Publisher, SignedPublisher};
pub use registry::Handler;
pub use subscription::Subscription;
pub use weak::WeakProxy;

/// Anything that can travel through a publisher.
///
/// `Debug` is required so the publish trail can render events.
pub trait Event: std::fmt::Debug + Send + Sync + 'static {}

impl<T: std::fmt::Debug + Send + Sync + 'static> Event for T {}

/// Label given to publishers created through `Default`.
pub const DEFAULT_PUBLISHER_LABEL: &str = "unnamed";

/// Characters of an event's `Debug` rendering kept in publish records.
pub const DEFAULT_EVENT_RENDER_LIMIT: usize = 256;

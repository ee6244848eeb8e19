//! # Diagnostic Trail
//!
//! A toggleable context that records subscription and publish provenance.
//! It is built from the same [`Publisher`] machinery it observes: three
//! detached publishers fan out subscription payloads, publish records and
//! free-form warnings to whoever listens (usually a log renderer).
//!
//! Publishers capture a context at construction. [`Diagnostics::global`] is
//! the process-wide default; tests and embedders can inject their own.
//!
//! While disabled, [`Diagnostics::payload`] returns the shared empty
//! sentinel without running its builder and every `submit_*` helper returns
//! immediately.

use crate::config::DiagnosticsConfig;
use crate::provenance::{ProvenancePayload, PublishRecord};
use crate::proxy::EventProxy;
use crate::publisher::Publisher;
use lazy_static::lazy_static;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::error;

lazy_static! {
    static ref GLOBAL: Diagnostics = Diagnostics::from_config(&DiagnosticsConfig::from_env());
}

/// Handle to a diagnostics context. Clones share state.
#[derive(Clone)]
pub struct Diagnostics {
    inner: Arc<DiagnosticsInner>,
}

struct DiagnosticsInner {
    enabled: AtomicBool,
    event_render_limit: usize,
    subscriptions: Publisher<ProvenancePayload>,
    publications: Publisher<PublishRecord>,
    warnings: Publisher<String>,
}

impl Diagnostics {
    /// A disabled context with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&DiagnosticsConfig::default())
    }

    /// A context built from `config`.
    #[must_use]
    pub fn from_config(config: &DiagnosticsConfig) -> Self {
        Self {
            inner: Arc::new(DiagnosticsInner {
                enabled: AtomicBool::new(config.enabled),
                event_render_limit: config.event_render_limit,
                subscriptions: Publisher::detached("herald.diagnostics.subscriptions"),
                publications: Publisher::detached("herald.diagnostics.publications"),
                warnings: Publisher::detached("herald.diagnostics.warnings"),
            }),
        }
    }

    /// The process-wide default context, configured from the environment on
    /// first use.
    #[must_use]
    pub fn global() -> &'static Diagnostics {
        &GLOBAL
    }

    pub fn enable(&self) {
        self.inner.enabled.store(true, Ordering::Relaxed);
    }

    pub fn disable(&self) {
        self.inner.enabled.store(false, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Relaxed)
    }

    /// Run `build` only while enabled; otherwise return the shared sentinel.
    pub fn payload(&self, build: impl FnOnce() -> ProvenancePayload) -> ProvenancePayload {
        if self.is_enabled() {
            build()
        } else {
            ProvenancePayload::empty()
        }
    }

    /// Submit an ad-hoc warning on the general-warnings channel.
    pub fn warn(&self, message: impl Into<String>) {
        if !self.is_enabled() {
            return;
        }
        let message = message.into();
        isolated("warnings", || {
            self.inner.warnings.publish(message);
        });
    }

    /// Channel carrying one payload per subscribe, listen or redirect.
    #[must_use]
    pub fn subscription_trail(&self) -> EventProxy<ProvenancePayload> {
        self.inner.subscriptions.proxy()
    }

    /// Channel carrying one record per publish call.
    #[must_use]
    pub fn publish_trail(&self) -> EventProxy<PublishRecord> {
        self.inner.publications.proxy()
    }

    /// Channel carrying free-form diagnostic warnings.
    #[must_use]
    pub fn general_warnings(&self) -> EventProxy<String> {
        self.inner.warnings.proxy()
    }

    pub(crate) fn submit_subscription(&self, payload: ProvenancePayload) {
        if !self.is_enabled() {
            return;
        }
        isolated("subscriptions", || {
            self.inner.subscriptions.publish(payload);
        });
    }

    /// Build a publish record with `build` and emit it.
    ///
    /// `build` runs inside the isolated region, so a panicking `Debug` impl
    /// of the published event never reaches the publisher.
    pub(crate) fn submit_publishing(&self, build: impl FnOnce() -> PublishRecord) {
        if !self.is_enabled() {
            return;
        }
        isolated("publications", || {
            self.inner.publications.publish(build());
        });
    }

    /// Debug rendering of `event`, cut at the configured limit.
    pub(crate) fn render_event<E: fmt::Debug>(&self, event: &E) -> String {
        let rendered = format!("{event:?}");
        let limit = self.inner.event_render_limit;
        match rendered.char_indices().nth(limit) {
            Some((cut, _)) => format!("{}…", &rendered[..cut]),
            None => rendered,
        }
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("enabled", &self.is_enabled())
            .field("event_render_limit", &self.inner.event_render_limit)
            .finish()
    }
}

/// Run a diagnostic emission so that a panicking listener never reaches the
/// publishing caller.
fn isolated(channel: &'static str, emit: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(emit)).is_err() {
        error!(channel, "Diagnostic listener panicked; delivery unaffected");
    }
}

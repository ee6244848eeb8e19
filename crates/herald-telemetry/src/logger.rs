//! Diagnostic trail rendering.
//!
//! [`DiagnosticLogger`] listens on the three channels of a
//! [`Diagnostics`] context and turns every payload into log lines:
//!
//! ```text
//! (S) Publisher<i32>:numbers
//! (S) --> filtered
//! (S) --> mapped from i32 to alloc::string::String
//! (S) !-> listened with handler<alloc::string::String>
//! (P) Publisher<i32>:numbers published 5 to 1 handler(s): [listener<…>:sub#3]
//! (W) Publisher<i32>:numbers already had a handler for sub#4; …
//! ```
//!
//! Lines go to a [`LineSink`]; the default sink emits them as `tracing`
//! events under [`DIAGNOSTICS_TARGET`]. With JSON logs enabled each payload
//! is rendered as one JSON document instead.

use crate::TelemetryConfig;
use herald_bus::{Diagnostics, ProvenanceEntry, ProvenancePayload, PublishRecord, Subscription};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// `tracing` target of rendered diagnostic lines.
pub const DIAGNOSTICS_TARGET: &str = "herald::diagnostics";

const INDENT: &str = "    ";

/// The diagnostic channel a line was rendered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Subscriptions,
    Publications,
    Warnings,
}

impl Channel {
    /// Prefix used in text rendering.
    #[must_use]
    pub fn mark(self) -> &'static str {
        match self {
            Channel::Subscriptions => "(S)",
            Channel::Publications => "(P)",
            Channel::Warnings => "(W)",
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Channel::Subscriptions => "subscriptions",
            Channel::Publications => "publications",
            Channel::Warnings => "warnings",
        }
    }
}

/// Destination of rendered lines.
pub type LineSink = Arc<dyn Fn(Channel, &str) + Send + Sync>;

fn tracing_sink() -> LineSink {
    Arc::new(|channel: Channel, line: &str| match channel {
        Channel::Warnings => {
            warn!(target: DIAGNOSTICS_TARGET, channel = channel.name(), "{line}");
        }
        _ => info!(target: DIAGNOSTICS_TARGET, channel = channel.name(), "{line}"),
    })
}

/// Render a provenance payload, one line per entry.
///
/// Merged payloads are rendered below a `--> merged with` line, indented
/// one level per nesting depth.
#[must_use]
pub fn render_provenance(payload: &ProvenancePayload) -> Vec<String> {
    let mut lines = Vec::with_capacity(payload.len());
    push_entries(payload, 0, &mut lines);
    lines
}

fn push_entries(payload: &ProvenancePayload, depth: usize, lines: &mut Vec<String>) {
    let indent = INDENT.repeat(depth);
    for entry in payload.entries() {
        let line = match entry {
            ProvenanceEntry::PublisherLabel { label } => label.clone(),
            ProvenanceEntry::Filtered => "--> filtered".to_string(),
            ProvenanceEntry::Mapped { from, to } => format!("--> mapped from {from} to {to}"),
            ProvenanceEntry::Interrupted => "--> interrupted".to_string(),
            ProvenanceEntry::Redirected { to } => format!("!-> redirected to {to}"),
            ProvenanceEntry::Subscribed {
                identifier,
                of_type,
            } => format!("!-> subscribed by {of_type}:{}", identifier.as_u64()),
            ProvenanceEntry::Listened { of_type } => {
                format!("!-> listened with handler<{of_type}>")
            }
            ProvenanceEntry::Merged { payload } => {
                lines.push(format!("{indent}--> merged with"));
                push_entries(payload, depth + 1, lines);
                continue;
            }
        };
        lines.push(format!("{indent}{line}"));
    }
}

/// Render a publish record as a single line.
#[must_use]
pub fn render_publish(record: &PublishRecord) -> String {
    let mut line = format!(
        "{} published {} to {} handler(s): [{}]",
        record.publisher,
        record.event,
        record.handlers.len(),
        record.handlers.join(", ")
    );
    if let Some(skipped) = record.suppressed {
        line.push_str(&format!(" (suppressed {skipped})"));
    }
    line
}

fn emit_text(sink: &LineSink, channel: Channel, line: &str) {
    sink(channel, &format!("{} {line}", channel.mark()));
}

fn emit_json<T: Serialize>(sink: &LineSink, channel: Channel, value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => sink(channel, &json),
        Err(e) => warn!(
            channel = channel.name(),
            error = %e,
            "Failed to encode diagnostic payload"
        ),
    }
}

struct Bindings {
    _subscriptions: Subscription<ProvenancePayload>,
    _publications: Option<Subscription<PublishRecord>>,
    _warnings: Subscription<String>,
}

/// Renders the diagnostic channels of one [`Diagnostics`] context.
///
/// Dropping the logger detaches it from every channel.
pub struct DiagnosticLogger {
    diagnostics: Diagnostics,
    sink: LineSink,
    json: bool,
    render_publishes: bool,
    bindings: Mutex<Option<Bindings>>,
}

impl DiagnosticLogger {
    /// A logger for `diagnostics` that writes to `tracing`. Not yet listening.
    #[must_use]
    pub fn new(diagnostics: &Diagnostics, config: &TelemetryConfig) -> Self {
        Self::with_sink(diagnostics, config, tracing_sink())
    }

    /// A logger that hands rendered lines to `sink`. Not yet listening.
    #[must_use]
    pub fn with_sink(
        diagnostics: &Diagnostics,
        config: &TelemetryConfig,
        sink: LineSink,
    ) -> Self {
        Self {
            diagnostics: diagnostics.clone(),
            sink,
            json: config.json_logs,
            render_publishes: config.render_publishes,
            bindings: Mutex::new(None),
        }
    }

    /// Create a logger and start listening.
    #[must_use]
    pub fn attach(diagnostics: &Diagnostics, config: &TelemetryConfig) -> Self {
        let logger = Self::new(diagnostics, config);
        logger.enable();
        logger
    }

    /// Start listening on the diagnostic channels.
    ///
    /// Returns `false` without listening if the context is disabled.
    /// Enabling an already listening logger is a no-op.
    pub fn enable(&self) -> bool {
        if !self.diagnostics.is_enabled() {
            warn!("Diagnostics disabled; enable the context before the logger");
            return false;
        }
        let mut bindings = self.bindings.lock();
        if bindings.is_none() {
            *bindings = Some(self.bind());
        }
        true
    }

    /// Stop listening.
    pub fn disable(&self) {
        self.bindings.lock().take();
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.bindings.lock().is_some()
    }

    fn bind(&self) -> Bindings {
        let json = self.json;

        let sink = Arc::clone(&self.sink);
        let subscriptions = self
            .diagnostics
            .subscription_trail()
            .bind(move |payload: &ProvenancePayload| {
                if json {
                    emit_json(&sink, Channel::Subscriptions, payload);
                    return;
                }
                for line in render_provenance(payload) {
                    emit_text(&sink, Channel::Subscriptions, &line);
                }
            });

        let publications = self.render_publishes.then(|| {
            let sink = Arc::clone(&self.sink);
            self.diagnostics
                .publish_trail()
                .bind(move |record: &PublishRecord| {
                    if json {
                        emit_json(&sink, Channel::Publications, record);
                    } else {
                        emit_text(&sink, Channel::Publications, &render_publish(record));
                    }
                })
        });

        let sink = Arc::clone(&self.sink);
        let warnings = self
            .diagnostics
            .general_warnings()
            .bind(move |message: &String| {
                if json {
                    emit_json(&sink, Channel::Warnings, message);
                } else {
                    emit_text(&sink, Channel::Warnings, message);
                }
            });

        Bindings {
            _subscriptions: subscriptions,
            _publications: publications,
            _warnings: warnings,
        }
    }
}

impl fmt::Debug for DiagnosticLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticLogger")
            .field("json", &self.json)
            .field("render_publishes", &self.render_publishes)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

//! Diagnostics configuration from environment variables.

use crate::DEFAULT_EVENT_RENDER_LIMIT;
use std::env;

/// Configuration for a [`Diagnostics`](crate::Diagnostics) context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticsConfig {
    /// Whether the diagnostic trail starts enabled.
    pub enabled: bool,

    /// Maximum characters of an event rendering in publish records.
    pub event_render_limit: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            event_render_limit: DEFAULT_EVENT_RENDER_LIMIT,
        }
    }
}

impl DiagnosticsConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `HERALD_DIAGNOSTICS`: Start with the trail enabled (default: false)
    /// - `HERALD_EVENT_RENDER_LIMIT`: Max rendered event length (default: 256)
    pub fn from_env() -> Self {
        Self {
            enabled: env::var("HERALD_DIAGNOSTICS")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),

            event_render_limit: env::var("HERALD_EVENT_RENDER_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_EVENT_RENDER_LIMIT),
        }
    }

    /// Builder-style toggle.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

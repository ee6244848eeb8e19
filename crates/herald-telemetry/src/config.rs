//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and diagnostic rendering.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error, or a directive list)
    pub log_level: String,

    /// Whether to enable console output
    pub console_output: bool,

    /// Whether to enable JSON formatted logs, including diagnostic payloads
    pub json_logs: bool,

    /// Whether the diagnostic logger renders the publish trail
    pub render_publishes: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "herald".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            render_publishes: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `HERALD_SERVICE_NAME`: Service name (default: herald)
    /// - `HERALD_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `HERALD_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `HERALD_JSON_LOGS`: Enable JSON logs (default: false)
    /// - `HERALD_RENDER_PUBLISHES`: Render the publish trail (default: true)
    pub fn from_env() -> Self {
        Self {
            service_name: env::var("HERALD_SERVICE_NAME")
                .unwrap_or_else(|_| "herald".to_string()),

            log_level: env::var("HERALD_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("HERALD_CONSOLE_OUTPUT")
                .map(|v| enabled_unless_off(&v))
                .unwrap_or(true),

            json_logs: env::var("HERALD_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),

            render_publishes: env::var("HERALD_RENDER_PUBLISHES")
                .map(|v| enabled_unless_off(&v))
                .unwrap_or(true),
        }
    }
}

fn enabled_unless_off(value: &str) -> bool {
    value.to_lowercase() != "false" && value != "0"
}

//! # Herald Telemetry
//!
//! Ambient logging for applications built on `herald-bus`.
//!
//! ## Components
//!
//! - [`init_tracing`]: installs a `tracing-subscriber` stack (pretty or JSON)
//!   filtered by level.
//! - [`DiagnosticLogger`]: renders the subscription trail, publish trail and
//!   general warnings of a [`Diagnostics`](herald_bus::Diagnostics) context.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use herald_bus::Diagnostics;
//! use herald_telemetry::{init_tracing, DiagnosticLogger, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_tracing(&config)?;
//!
//! let diagnostics = Diagnostics::global();
//! diagnostics.enable();
//! let _logger = DiagnosticLogger::attach(diagnostics, &config);
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `HERALD_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `HERALD_JSON_LOGS` | `false` | JSON formatted output |
//! | `HERALD_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `HERALD_RENDER_PUBLISHES` | `true` | Render the publish trail |

mod config;
mod logger;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use logger::{
    render_provenance, render_publish, Channel, DiagnosticLogger, LineSink, DIAGNOSTICS_TARGET,
};
pub use tracing_setup::init_tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

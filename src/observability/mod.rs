//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! relay executor, cors middleware, server
//!     → logging.rs (tracing events, EnvFilter, stdout)
//!     → metrics.rs (relay outcomes, origin decisions)
//!         → Prometheus scrape listener (optional)
//! ```
//!
//! # Design Decisions
//! - Relay logs carry header names, never header values or bodies
//! - Every inbound request span carries its `x-request-id`
//! - Metric recording is a no-op until the exporter is installed

pub mod logging;
pub mod metrics;

//! API Relay
//!
//! Backend for an API-testing client: relays caller-described HTTP requests
//! to arbitrary upstreams, stores per-user history and collections, and
//! decides which browser origins may use it.
//!
//! # Architecture Overview
//!
//! ```text
//!     Browser / CLI
//!         │
//!         ▼
//!   http: request id → cors → headers → limits → trace
//!         │
//!         ├── /api/proxy ────────▶ relay ───▶ upstream
//!         ├── /api/history ──────▶ store
//!         └── /api/collections ──▶ store
//!
//!   cross-cutting: config, security, observability, lifecycle
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;
pub mod security;
pub mod store;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;

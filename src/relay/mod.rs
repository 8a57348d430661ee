//! Relay subsystem.
//!
//! # Data Flow
//! ```text
//! POST /api/proxy (authenticated)
//!     → types.rs (lenient descriptor parse)
//!     → executor.rs (validate, dispatch once, normalize)
//!     → RelayResult, outer status = result.status
//! ```
//!
//! # Design Decisions
//! - Upstream targets are unrestricted; this is an API-testing tool
//! - One upstream call per invocation, no retries, no caching
//! - Concurrent relays share only the client's connection pool

pub mod executor;
pub mod types;

pub use executor::{RelayExecutor, RelayOutcome};
pub use types::{RelayRequest, RelayResult};

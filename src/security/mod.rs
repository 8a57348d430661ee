//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (origin decision from origin.rs; attach or withhold permission)
//!     → limits.rs (cap request body size)
//!     → access_control.rs (bearer token on protected routes)
//!     → handlers
//! Outgoing response:
//!     → headers.rs (hardening headers)
//! ```
//!
//! # Design Decisions
//! - Origin policy decides permission, never terminates a request
//! - Authentication fails closed: no valid token, no handler
//! - No trust in client input

pub mod access_control;
pub mod cors;
pub mod headers;
pub mod limits;
pub mod origin;

pub use access_control::{CallerContext, TokenVerifier};
pub use origin::{is_origin_allowed, AllowList, OriginDecision, OriginPolicy};

//! # Warden Common
//!
//! Shared types, constants, and primitives used across Warden components.
//!
//! ## Modules
//! - `constants` - Cookie/form names, header names, TTL defaults
//! - `crypto` - Challenge hashing and authentication token generation
//! - `error` - Common error types
//! - `types` - Reason vocabulary for responses and log lines

pub mod constants;
pub mod crypto;
pub mod error;
pub mod types;

pub use error::WardenError;
pub use types::*;

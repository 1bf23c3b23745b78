//! # Access Module
//!
//! Resolves whether this client is implicitly privileged and manages the
//! admin secret used for privileged folder operations.
//!
//! ## Overview
//!
//! - Single-flight privilege check: concurrent callers share one request
//! - Terminal access state (`Unknown -> Pending -> Granted | Denied`)
//! - Held-secret verification, independent of the access state
//! - Password exchange for a secret (`unlock`)

pub mod error;
pub mod resolver;
pub mod types;

pub use error::{AccessError, Result};
pub use resolver::AccessResolver;
pub use types::AccessState;

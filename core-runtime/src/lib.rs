//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the file manager core:
//! - Logging and tracing infrastructure
//! - Client configuration
//! - Event bus system
//! - Single-writer observable state cells shared with the UI layer
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its configuration,
//! logging conventions and the way it publishes state and events.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod state;

pub use error::{Error, Result};

//! Core domain + application logic for the Telegram assistant bridge.
//!
//! This crate is intentionally framework-agnostic. Telegram / OpenAI live
//! behind adapter crates; what lives here is configuration, the error
//! taxonomy, logging setup and the routing/eligibility core.

pub mod config;
pub mod errors;
pub mod logging;
pub mod routing;

pub use errors::{Error, Result};

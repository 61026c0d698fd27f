//! # vocprep common library
//!
//! Shared code for the vocprep feature preparation tools:
//! - Error types
//! - TOML configuration loading and priority resolution
//! - Atomic file writes
//! - Tracing subscriber setup

pub mod config;
pub mod error;
pub mod fs;
pub mod logging;

pub use error::{Error, Result};

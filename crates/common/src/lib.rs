//! voiceclean Common Utilities
//!
//! Shared infrastructure for all voiceclean crates:
//! - Error types, result aliases, and the pipeline stage taxonomy
//! - Run clock and timestamp formatting for job artifacts
//! - Tracing/logging initialization
//! - Configuration loading and validation

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;

//! # agro.IA Common Library
//!
//! Shared code for the agro.IA services:
//! - Error types
//! - TOML bootstrap configuration and config file resolution
//! - Identification result types exchanged with the consuming UI
//! - Event bus for identification progress events

pub mod config;
pub mod error;
pub mod events;
pub mod identification;

pub use error::{Error, Result};
pub use identification::{ClassifierErrorKind, ErrorInfo, IdentificationResult};

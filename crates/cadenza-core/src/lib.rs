//! # cadenza-core
//!
//! Core types, traits, and error handling for the Cadenza audio resolution service.

pub mod error;
pub mod types;

pub use error::{Error, FailureKind, HttpError, ProviderError, Result};
pub use types::*;

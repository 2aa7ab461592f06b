//! # cadenza-resolver
//!
//! Resolves a media locator into a direct audio URL by walking a
//! (quality tier × provider) matrix.
//!
//! Tiers are visited in search order (the preferred tier first, then
//! 320/256/128/92 kbps). Within a tier every available provider is tried in
//! registry order, each through a bounded retry wrapper. The first payload
//! that validates wins and nothing after it is called. If the matrix is
//! exhausted the caller gets every attempt's diagnostic, in order.

pub mod config;
pub mod engine;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod retry;

pub use config::ResolverConfig;
pub use engine::{ResolutionEngine, Strategy};
pub use provider::{AudioProvider, Availability};
pub use registry::{ProviderRegistry, ProviderStatus};
pub use retry::{Retried, RetryPolicy};

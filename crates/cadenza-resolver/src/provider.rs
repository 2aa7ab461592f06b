//! Provider trait.
//!
//! A provider wraps one external resolution backend and normalizes whatever
//! it returns into a [`ResolvedAudio`] before handing it to the engine.

use async_trait::async_trait;
use cadenza_core::{Locator, ProviderError, QualityTier, ResolvedAudio};

/// Result of a provider's one-time capability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    /// The provider cannot run here; carries the reason.
    Unavailable(String),
}

/// One external audio resolution backend.
#[async_trait]
pub trait AudioProvider: Send + Sync {
    /// Stable identifier reported in results and diagnostics.
    fn name(&self) -> &str;

    /// Checked once when the registry is built.
    async fn available(&self) -> Availability {
        Availability::Available
    }

    /// Resolve `locator` at `quality`.
    async fn resolve(
        &self,
        locator: &Locator,
        quality: QualityTier,
    ) -> Result<ResolvedAudio, ProviderError>;
}

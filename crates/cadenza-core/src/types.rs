//! Core domain types for Cadenza.

pub mod locator;
pub mod quality;
pub mod resolution;
pub mod stream;

pub use locator::Locator;
pub use quality::QualityTier;
pub use resolution::{
    download_filename, AttemptError, AttemptOutcome, ProviderAttempt, Resolution, ResolutionRequest,
    ResolutionResult, ResolvedAudio,
};
pub use stream::{AudioFormat, StreamCollection, StreamInfo};

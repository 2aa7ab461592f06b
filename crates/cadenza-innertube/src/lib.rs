//! # cadenza-innertube
//!
//! Minimal `YouTube` `InnerTube` client for Cadenza.
//!
//! Only the `player` endpoint is implemented: it is the one place where
//! `YouTube` hands out direct, unciphered audio stream URLs for mobile clients.

pub mod client;
pub mod context;
pub mod endpoints;
pub mod types;

pub use client::InnerTubeClient;
pub use context::ClientContext;
pub use types::VideoDetails;

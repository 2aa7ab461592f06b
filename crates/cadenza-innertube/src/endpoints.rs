//! `InnerTube` endpoint implementations.

pub mod player;

pub use player::PlayerStreams;

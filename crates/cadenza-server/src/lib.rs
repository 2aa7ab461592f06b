//! # cadenza-server
//!
//! HTTP front end for the Cadenza resolver: `POST /resolve-audio` (and the
//! legacy `POST /a-dl`), `GET /health` and `GET /providers`.

pub mod config;
pub mod routes;
pub mod telemetry;

pub use config::{Config, ServerConfig};
pub use routes::{router, ApiError, AppState};

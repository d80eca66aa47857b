//! Sluice server — the loopback control API.
//!
//! A small HTTP surface over the engine: start/status/pause/stop/metered
//! plus the `/proxy` route that frames the piece-aware reader as a seekable
//! video response.

#![warn(missing_docs)]

pub mod handlers;
pub mod server;

pub use server::{AppState, router, run_server};

//! PM2.5 air-quality dataset served over HTTP.
//!
//! The table lives in memory behind [`state::AppState`]; [`api::router`]
//! maps the `/data` endpoints onto it.

pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod state;

//! Hardware monitor HTTP service
//!
//! Exposes host metrics, health and mission status from `monitor-lib`
//! over an authenticated axum API.

pub mod api;
pub mod auth;
pub mod config;
pub mod request_id;

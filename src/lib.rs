//! Pluggable authentication core for axum services.
//!
//! - `services::password`: multi-algorithm password hashing (`{id}payload`)
//! - `services::auth`: tokens, providers, `ProviderManager`, JWT / refresh rotation
//! - `services::ott`: single-use one-time tokens
//! - `security` + `filter`: per-request security context and the filter chain
//! - `middleware`, `api`, `app`: demo HTTP service wiring

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod filter;
pub mod middleware;
pub mod repos;
pub mod security;
pub mod services;
pub mod state;

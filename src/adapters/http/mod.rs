//! HTTP adapters (axum).

pub mod gateway;

//! Kizuna server: connection graph, conversations and the real-time hub.
//!
//! Layers:
//! - `domain`: models and the traits the other layers implement
//! - `usecase`: one struct per operation
//! - `infrastructure`: stores, the real-time hub and wire DTOs
//! - `ui`: axum HTTP / WebSocket transport

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

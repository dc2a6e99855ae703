//! HTTP / WebSocket transport (axum).

pub mod auth;
pub mod error;
mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
pub use state::AppState;

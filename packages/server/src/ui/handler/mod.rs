//! Request handlers.

pub mod http;
pub mod websocket;

pub use http::*;
pub use websocket::websocket_handler;

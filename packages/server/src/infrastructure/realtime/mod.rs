//! Real-Time Hub
//!
//! In-process publish/subscribe over the WebSocket sessions of this server.

pub mod hub;
pub mod reaper;

pub use hub::RealtimeHub;
pub use reaper::spawn_reaper;

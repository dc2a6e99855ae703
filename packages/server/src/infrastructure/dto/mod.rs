//! Data Transfer Objects (DTOs) for the Kizuna wire protocol.
//!
//! DTOs are organized by protocol:
//! - `websocket`: real-time frames and the entity shapes they carry
//! - `http`: REST request / response bodies

pub mod conversion;
pub mod http;
pub mod websocket;

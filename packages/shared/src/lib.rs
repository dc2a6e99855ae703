//! Utilities shared by the Kizuna server and client binaries.

pub mod logger;
pub mod time;

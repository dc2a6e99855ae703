//! Terminal client for Kizuna: connections, chat list and real-time conversations.

pub mod api;
pub mod command;
pub mod domain;
pub mod error;
mod formatter;
mod runner;
mod session;
mod ui;

pub use runner::run_client;

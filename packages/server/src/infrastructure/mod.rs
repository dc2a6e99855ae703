//! Infrastructure 層
//!
//! ドメイン層が定義する trait の具体的な実装（ストア・リアルタイムハブ）と、
//! 通信用の DTO を提供します。

pub mod dto;
pub mod realtime;
pub mod repository;
pub mod seed;

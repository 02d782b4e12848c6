//! Core domain types
//!
//! These types describe what the console backend produces and what the
//! viewers expose to their consumers. They are shared between the HTTP
//! client (for decoding) and the viewers (for buffering and display).

pub mod connection;
pub mod log;

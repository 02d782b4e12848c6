//! Data Transfer Objects for the console log endpoints
//!
//! Query strings and response envelopes exchanged with the backend.

pub mod log;

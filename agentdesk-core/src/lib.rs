//! Agentdesk Core
//!
//! Core types shared by the agentdesk console client crates.
//!
//! This crate contains:
//! - Domain types: log entries, severity levels and connection state
//! - DTOs: query and response shapes of the console log endpoints

pub mod domain;
pub mod dto;

//! Core types and traits for chat-relay
//!
//! This crate provides the client-side chat session store, the message
//! formatting pipeline, configuration loading and logging setup shared by
//! the gateway and the CLI.

pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod session;
pub mod utils;

pub use error::{Error, Result};

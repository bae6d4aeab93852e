//! Protocol types for clocklockd IPC
//!
//! This crate defines the stable API between clocklockd and its clients
//! (tick pollers, rule editors):
//! - Commands (requests from clients)
//! - Responses
//! - Events (daemon -> subscribed clients)
//! - Versioning

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;

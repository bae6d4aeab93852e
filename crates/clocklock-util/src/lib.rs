//! Shared utilities for clocklock
//!
//! This crate provides:
//! - ID types (Domain, ClientId)
//! - Wall-clock helpers with mock time support
//! - Millisecond (de)serialization for durations, lenient on read
//! - Rate limiting helpers
//! - Default paths for socket, data, and config

mod ids;
mod paths;
mod rate_limit;
mod time;

pub use ids::*;
pub use paths::*;
pub use rate_limit::*;
pub use time::*;

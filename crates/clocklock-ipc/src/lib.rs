//! Unix socket transport between clocklockd and its clients
//!
//! One JSON document per line. Requests and responses are correlated by
//! `request_id`; subscribed connections additionally receive events.

mod client;
mod server;

pub use client::*;
pub use server::*;

use clocklock_api::ErrorInfo;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    /// `run` was called before `start` bound the socket
    #[error("Server not started")]
    NotStarted,

    #[error("Response {got} does not answer request {expected}")]
    MismatchedResponse { expected: u64, got: u64 },

    /// The daemon answered with an error response
    #[error("Request rejected ({:?}): {}", .0.code, .0.message)]
    Rejected(ErrorInfo),
}

pub type IpcResult<T> = Result<T, IpcError>;

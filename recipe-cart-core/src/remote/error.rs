//! Remote service error types.

use thiserror::Error;

/// Errors returned by a shopping list backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request could not be sent or the connection failed
    #[error("HTTP error: {0}")]
    Http(String),
    /// The backend rejected the bearer token
    #[error("Session expired, log in again")]
    Unauthorized,
    /// Non-success status other than 401
    #[error("Server returned status {status}: {body}")]
    Status { status: u16, body: String },
    /// Response body was not the expected JSON
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

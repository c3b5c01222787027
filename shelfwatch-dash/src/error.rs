//! Error types for shelfwatch-dash

use thiserror::Error;

use crate::client::FetchError;

/// Main error type for shelfwatch-dash
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration or other shared-library error
    #[error(transparent)]
    Common(#[from] shelfwatch_common::Error),

    /// Upstream inventory/chat API failure
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),
}

/// Convenience Result type using shelfwatch-dash Error
pub type Result<T> = std::result::Result<T, Error>;

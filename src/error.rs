//! Error handling and custom error types
//!
//! Provides unified error handling across the service using thiserror. Every
//! variant maps onto an [`ErrorKind`] so callers can branch on the failure
//! class instead of matching message text.

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("Model API error (status {status}): {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Failed to parse model API response: {0}")]
    UpstreamParse(String),

    #[error("Model API request timed out after {0} ms")]
    UpstreamTimeout(u64),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure class of an [`Error`], stable across message wording changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Validation,
    UpstreamStatus(u16),
    UpstreamParse,
    UpstreamTimeout,
    Transport,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Validation => "validation",
            ErrorKind::UpstreamStatus(_) => "upstream_status",
            ErrorKind::UpstreamParse => "upstream_parse",
            ErrorKind::UpstreamTimeout => "upstream_timeout",
            ErrorKind::Transport => "transport",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Configuration,
            Error::Validation(_) => ErrorKind::Validation,
            Error::UpstreamStatus { status, .. } => ErrorKind::UpstreamStatus(*status),
            Error::UpstreamParse(_) => ErrorKind::UpstreamParse,
            Error::UpstreamTimeout(_) => ErrorKind::UpstreamTimeout,
            Error::Http(_) => ErrorKind::Transport,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True when the error was raised before any outbound call was attempted.
    pub fn is_client_side(&self) -> bool {
        matches!(self.kind(), ErrorKind::Configuration | ErrorKind::Validation)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

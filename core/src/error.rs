//! Error types for the Neon API client.
//!
//! # Design
//! A failed call lands in exactly one class. `Api` means the server explained
//! itself with a `{code, message}` body. `UnexpectedResponse` means it answered
//! with a non-2xx status and nothing structured, so the raw exchange is kept
//! for troubleshooting. `Transport` means no response arrived at all.
//! `Config` and `Region` are raised before any request is sent.

use thiserror::Error;

use crate::config::ConfigError;
use crate::http::{HttpResponse, TransportError};
use crate::region::RegionParseError;

/// A failure the server reported with a structured error body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Neon API request failed. request_url: {url} status_code: {status} message: {message} code: {code}")]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub url: String,
    pub status: u16,
    /// The response the error was decoded from.
    pub response: HttpResponse,
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// Errors returned by `NeonApiClient`.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Region(#[from] RegionParseError),

    /// Rejected before sending: an empty id would address the collection.
    #[error("project ID must not be empty")]
    EmptyProjectId,

    #[error(transparent)]
    Api(Box<ApiError>),

    /// Non-2xx response without a structured error body.
    #[error("Neon API request failed. Bad response, raw dump:\n{dump}")]
    UnexpectedResponse { status: u16, url: String, dump: String },

    #[error("Neon API request to {url} failed after {attempts} attempt(s): {source}")]
    Transport {
        url: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl Error {
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.api().is_some_and(ApiError::is_not_found)
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        Error::Api(Box::new(err))
    }
}

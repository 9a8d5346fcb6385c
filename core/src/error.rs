//! Error types for the Confluence client.
//!
//! # Design
//! Every failure is returned to the immediate caller. `Api` is the only
//! variant that carries service-side diagnostics: the status line, the
//! request that caused it, and either the decoded Confluence error payload
//! or the reason it could not be decoded. Its `Display` output is meant to
//! be shown to an operator as-is.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::http::Method;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The path could not be resolved against the site base URL.
    #[error("cannot resolve path {path:?}: {reason}")]
    PathResolution { path: String, reason: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// No response was received: connection, TLS or timeout failure.
    #[error("{method} {url} failed: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: ureq::Error,
    },

    /// The server answered with a status other than the one expected for
    /// the verb.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The success body did not match the requested result type.
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// A required configuration variable is not set.
    #[error("missing configuration variable {var}")]
    Config { var: &'static str },
}

/// Unexpected-status failure with as much context as could be recovered.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: u16,
    pub status_line: String,
    pub method: Method,
    /// The path as the caller passed it, before resolution.
    pub path: String,
    /// Serialized request body, empty when none was sent.
    pub request_body: String,
    pub detail: ApiErrorDetail,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiErrorDetail {
    Payload(ErrorResponse),
    /// The error body was not a Confluence error payload.
    Undecodable(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n\n{} {}\n{}\n\n",
            self.status_line, self.method, self.path, self.request_body
        )?;
        match &self.detail {
            ApiErrorDetail::Payload(payload) => write!(f, "{payload}"),
            ApiErrorDetail::Undecodable(reason) => {
                write!(f, "error body could not be decoded: {reason}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// Error payload returned by Confluence. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: Option<i64>,
    pub message: Option<String>,
    pub data: Option<ErrorData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ErrorData {
    pub authorized: Option<bool>,
    pub valid: Option<bool>,
    pub successful: Option<bool>,
    pub errors: Option<Vec<String>>,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.clone().unwrap_or_default();
        write!(
            f,
            "{}\nAuthorized: {}\nValid: {}\nSuccessful: {}",
            self.message.as_deref().unwrap_or_default(),
            data.authorized.unwrap_or_default(),
            data.valid.unwrap_or_default(),
            data.successful.unwrap_or_default(),
        )?;
        for error in data.errors.iter().flatten() {
            write!(f, "\n  * {error}")?;
        }
        Ok(())
    }
}

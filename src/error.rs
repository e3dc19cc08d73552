// Mendeley Core - Rust client for the Mendeley Web API
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Error types for the Mendeley client
//!
//! Every failure raised by the request engine is one of the variants below.
//! Errors are built at the failure site and propagated unchanged; the only
//! failure that is recovered locally is a 401 "Token has expired" response,
//! which [`crate::api::client::MendeleyClient::execute`] answers with a single
//! refresh-and-retry.
//!
//! ## Taxonomy
//! - `NotSignedIn` - no credentials in the token store (caller error, never retried)
//! - `HttpResponse` - unexpected status code, carries the raw server text
//! - `FileDownload` - download-specific I/O or rename failure
//! - `JsonParsing` - malformed or unexpected wire payload
//! - `UserCancelled` - cooperative cancellation observed
//! - `NoMorePages` - next page requested without a `rel="next"` link
//!
//! Network failures from reqwest are folded into `Network` so callers never
//! see raw transport errors.

use thiserror::Error;

/// Result type alias using [`MendeleyError`]
pub type Result<T> = std::result::Result<T, MendeleyError>;

/// Marker the API puts in the body of a 401 caused by an expired bearer token
pub const TOKEN_EXPIRED_MESSAGE: &str = "Token has expired";

/// Main error type for the Mendeley client
#[derive(Error, Debug)]
pub enum MendeleyError {
    // ===== Authorization =====

    /// No credentials are stored; the user must sign in first
    #[error("Not signed in")]
    NotSignedIn,

    // ===== Transport =====

    /// Server answered with a status code the operation did not expect
    #[error("HTTP {code}: {message}")]
    HttpResponse {
        /// Numeric HTTP status code
        code: u16,
        /// Error body sent by the server, as UTF-8 text
        message: String,
    },

    /// Connection-level failure (DNS, connect, read timeout, reset)
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Whether this error might be transient
        is_transient: bool,
    },

    // ===== Payload =====

    /// Wire payload could not be parsed or produced
    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    // ===== Files =====

    /// Download of a file binary failed
    #[error("File download failed for {file_id}: {reason}")]
    FileDownload {
        reason: String,
        /// Identifier of the file being downloaded
        file_id: String,
    },

    // ===== Flow control =====

    /// The caller cancelled the operation
    #[error("Operation cancelled")]
    UserCancelled,

    /// Next page requested although the last response had no `rel="next"` link
    #[error("No more pages")]
    NoMorePages,

    // ===== Caller / configuration =====

    /// Generic input validation error
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Client configuration is invalid or incomplete
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Local I/O error outside of the download path (e.g. opening an upload source)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for MendeleyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return MendeleyError::JsonParsing(err.to_string());
        }
        let is_transient = err.is_timeout() || err.is_connect();
        MendeleyError::Network {
            message: err.to_string(),
            is_transient,
        }
    }
}

impl From<serde_json::Error> for MendeleyError {
    fn from(err: serde_json::Error) -> Self {
        MendeleyError::JsonParsing(err.to_string())
    }
}

impl From<url::ParseError> for MendeleyError {
    fn from(err: url::ParseError) -> Self {
        MendeleyError::InvalidInput(format!("Invalid URL: {}", err))
    }
}

// Helper methods for creating common errors
impl MendeleyError {
    /// Create an HttpResponse error
    pub fn http<S: Into<String>>(code: u16, message: S) -> Self {
        MendeleyError::HttpResponse {
            code,
            message: message.into(),
        }
    }

    /// Create a FileDownload error
    pub fn download<S: Into<String>, I: ToString>(reason: S, file_id: I) -> Self {
        MendeleyError::FileDownload {
            reason: reason.into(),
            file_id: file_id.to_string(),
        }
    }

    /// Create a Network error
    pub fn network_error<S: Into<String>>(message: S, is_transient: bool) -> Self {
        MendeleyError::Network {
            message: message.into(),
            is_transient,
        }
    }

    /// Create an InvalidInput error with a message
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        MendeleyError::InvalidInput(message.into())
    }

    /// True for the one failure the authorized request recovers from:
    /// a 401 whose body says the bearer token has expired.
    pub fn is_token_expired(&self) -> bool {
        matches!(
            self,
            MendeleyError::HttpResponse { code: 401, message } if message.contains(TOKEN_EXPIRED_MESSAGE)
        )
    }

    /// Check if error means the user has to sign in (again)
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            MendeleyError::NotSignedIn | MendeleyError::HttpResponse { code: 401, .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, MendeleyError::UserCancelled)
    }

    /// HTTP status code carried by the error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            MendeleyError::HttpResponse { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Get user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            MendeleyError::NotSignedIn => "You are not signed in. Please sign in to Mendeley.".to_string(),
            MendeleyError::HttpResponse { code: 401, .. } => {
                "Your session has expired. Please sign in again.".to_string()
            }
            MendeleyError::HttpResponse { code: 412, .. } => {
                "The item was changed on the server since it was last fetched.".to_string()
            }
            MendeleyError::Network { .. } => {
                "Could not reach Mendeley. Please check your connection and try again.".to_string()
            }
            MendeleyError::FileDownload { .. } => {
                "The file could not be downloaded. Please try again.".to_string()
            }
            MendeleyError::UserCancelled => "Cancelled.".to_string(),
            _ => self.to_string(),
        }
    }
}

//! Gateway error taxonomy.
//!
//! Two variants are navigation signals rather than messages:
//! [`GatewayError::Unauthenticated`] and [`GatewayError::SessionExpired`]
//! both resolve to [`Route::Login`]. Everything else is reported to the
//! caller as-is and never changes session state.

use crate::auth::Route;
use crate::catalog::FormError;
use crate::origin::Origin;
use crate::session::SessionError;

/// Errors produced by gateway, auth and catalog operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No usable base address is configured for the origin.
    #[error("origin `{origin}` is not configured: {reason}")]
    Configuration { origin: Origin, reason: String },

    /// A protected call was attempted with no session. Never reaches the network.
    #[error("not logged in")]
    Unauthenticated,

    /// The backend rejected the credential; the session has been evicted.
    #[error("session expired (status {status}), please log in again")]
    SessionExpired { status: u16 },

    /// No response reached us (connect failure, timeout, broken body).
    #[error("cannot reach server: {0}")]
    Network(String),

    /// The backend answered with a non-success status for a domain reason.
    #[error("{message}")]
    RequestFailed { status: u16, message: String },

    /// A success response could not be turned into the expected payload.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The session area could not be read or written.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Form input was rejected before anything was transmitted.
    #[error(transparent)]
    InvalidForm(#[from] FormError),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl GatewayError {
    /// Stable machine-readable code for logs and the console.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "E_CONFIGURATION",
            Self::Unauthenticated => "E_UNAUTHENTICATED",
            Self::SessionExpired { .. } => "E_SESSION_EXPIRED",
            Self::Network(_) => "E_NETWORK",
            Self::RequestFailed { .. } => "E_REQUEST_FAILED",
            Self::Decode(_) => "E_DECODE",
            Self::Session(_) => "E_SESSION_STORAGE",
            Self::InvalidForm(_) => "E_INVALID_FORM",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    /// Where the caller must navigate, if this error is a session signal.
    #[must_use]
    pub fn redirect(&self) -> Option<Route> {
        match self {
            Self::Unauthenticated | Self::SessionExpired { .. } => Some(Route::Login),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_session_signal(&self) -> bool {
        self.redirect().is_some()
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

//! Typed failure taxonomy for the session controller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

/// Every way an `acs`/`logout` request can fail. Each variant carries the
/// human-readable message surfaced to the caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Malformed or incomplete identity payload.
    #[error("{0}")]
    Validation(String),
    /// Persistence failure, including a falsy acknowledgment from the store.
    #[error("{0}")]
    SessionStore(String),
    /// No valid session on the request.
    #[error("{0}")]
    Extraction(String),
    /// The IDP logout callback returned an error or never fired.
    #[error("{0}")]
    ExternalProvider(String),
}

impl AuthError {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::SessionStore(_) => "session_store",
            Self::Extraction(_) => "extraction",
            Self::ExternalProvider(_) => "external_provider",
        }
    }

    /// Status code used when kind-tagged responses are enabled.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::SessionStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Extraction(_) => StatusCode::UNAUTHORIZED,
            Self::ExternalProvider(_) => StatusCode::BAD_GATEWAY,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(msg)
            | Self::SessionStore(msg)
            | Self::Extraction(msg)
            | Self::ExternalProvider(msg) => msg,
        }
    }

    /// Render the error as an HTTP response.
    ///
    /// In legacy mode every failure is a uniform 500 with only the message,
    /// matching the contract existing clients rely on. Tagged mode exposes
    /// the variant's status code and a machine-readable kind.
    #[must_use]
    pub fn into_response_with(self, tagged: bool) -> Response {
        if tagged {
            let body = json!({
                "kind": self.kind(),
                "error": self.message(),
            });
            (self.status_code(), Json(body)).into_response()
        } else {
            let body = json!({ "error": self.message() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

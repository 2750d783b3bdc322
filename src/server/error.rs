use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use crate::types::SObjectName;

const OBJECT_NOT_FOUND_HINT: &str = "Check Object Manager > your object API name. \
     Also ensure you logged into the SAME org where you created it.";

/// Errors surfaced by route handlers. Every variant renders as a JSON body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No logged-in session.
    #[error("Not authorized")]
    Unauthenticated,

    /// Missing or malformed request input.
    #[error("{0}")]
    Validation(String),

    /// The identity provider redirected back with an error.
    #[error("OAuth error: {error}")]
    OAuthDenied {
        error: String,
        description: Option<String>,
    },

    /// Required configuration is absent.
    #[error("{0}")]
    Config(String),

    /// Salesforce does not know the custom object, usually a misnamed object
    /// or a login into the wrong org.
    #[error("INVALID_TYPE: Object not found: {object}")]
    ObjectNotFound { object: SObjectName, details: Value },

    /// Non-2xx from Salesforce; the status is passed through.
    #[error("{message}")]
    Upstream {
        status: StatusCode,
        message: String,
        details: Value,
    },

    /// A handler-specific body with its own shape.
    #[error("{status}: {body}")]
    Custom { status: StatusCode, body: Value },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Map a failed sobject call, recognizing the `INVALID_TYPE` case.
    #[must_use]
    pub fn for_object(err: crate::error::Error, object: SObjectName) -> Self {
        if err.upstream_error_code() == Some("INVALID_TYPE") {
            if let crate::error::Error::Upstream { body, .. } = err {
                return Self::ObjectNotFound {
                    object,
                    details: body,
                };
            }
        }
        err.into()
    }

    /// Upstream failure with a handler-specific message.
    #[must_use]
    pub fn upstream(status: u16, message: impl Into<String>, details: Value) -> Self {
        Self::Upstream {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
            message: message.into(),
            details,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, json!({ "error": "Not authorized" })),
            Self::Validation(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            Self::OAuthDenied { error, description } => {
                tracing::warn!(error = %error, description = ?description, "OAuth2 error from Salesforce");
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": error, "errorDescription": description }),
                )
            }
            Self::ObjectNotFound { object, details } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": format!("INVALID_TYPE: Object not found: {object}"),
                    "hint": OBJECT_NOT_FOUND_HINT,
                    "details": details,
                }),
            ),
            Self::Upstream {
                status,
                message,
                details,
            } => (status, json!({ "error": message, "details": details })),
            Self::Custom { status, body } => (status, body),
            Self::Config(message) | Self::Internal(message) => {
                tracing::error!(error = %message, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": message }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<crate::error::Error> for ApiError {
    fn from(e: crate::error::Error) -> Self {
        use crate::error::Error;

        match e {
            Error::Config(message) => Self::Config(message),
            Error::InvalidRecordId(id) => Self::Validation(format!("Invalid record id: {id:?}")),
            Error::Upstream { status, body, .. } => {
                Self::upstream(status, "Salesforce API error", body)
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

//! Error types for the HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bucketdb_codec::CodecError;
use bucketdb_core::{CoreError, ErrorKind};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Result type for request handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors answered by the API.
///
/// The `Display` text is what the client sees in the `{"Error": ...}` body.
/// Underlying causes are only logged.
#[derive(Error, Debug)]
pub enum ApiError {
    /// A bucket name was missing or blank.
    #[error("invalid bucket name")]
    InvalidBucketName,

    /// The create-bucket body was not a JSON object of strings.
    #[error("error reading bucket name")]
    BucketNameDecode {
        /// Parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// An item body was not valid JSON.
    #[error("error reading bucket item")]
    ItemDecode {
        /// Parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// An item value could not be encoded for storage.
    #[error("error encoding bucket item")]
    ItemEncode {
        /// Encoding failure.
        #[source]
        source: CodecError,
    },

    /// The requested key holds no value.
    #[error("item not found")]
    ItemNotFound,

    /// The request body is not declared as UTF-8 JSON.
    #[error("Bad Content-Type or charset, expected 'application/json'")]
    UnsupportedMediaType,

    /// No route matches the request path.
    #[error("resource not found")]
    RouteNotFound,

    /// An engine failure reported under a fixed message.
    #[error("{context}")]
    Storage {
        /// Message shown to the client.
        context: &'static str,
        /// Engine failure.
        #[source]
        source: CoreError,
    },

    /// An engine failure reported with its own message.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Internal failure outside the engine.
    #[error("internal server error")]
    Internal {
        /// Description for the log.
        message: String,
    },
}

impl ApiError {
    /// Returns a mapper that reports an engine failure as `context`.
    pub fn storage(context: &'static str) -> impl FnOnce(CoreError) -> Self {
        move |source| Self::Storage { context, source }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidBucketName | Self::BucketNameDecode { .. } => StatusCode::BAD_REQUEST,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::Storage { source, .. } | Self::Core(source) => engine_status(source),
            Self::ItemDecode { .. }
            | Self::ItemEncode { .. }
            | Self::ItemNotFound
            | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    fn log(&self, status: StatusCode) {
        let cause = match self {
            Self::Internal { message } => Some(message.clone()),
            _ => std::error::Error::source(self).map(ToString::to_string),
        };
        let cause = cause.unwrap_or_default();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, cause = %cause, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, cause = %cause, "request rejected");
        }
    }
}

fn engine_status(error: &CoreError) -> StatusCode {
    match error.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("storage task failed: {err}"))
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    #[serde(rename = "Error")]
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        self.log(status);
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

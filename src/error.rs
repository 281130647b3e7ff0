//! Error handling.

use axum::{
    extract::rejection::JsonRejection,
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use thiserror::Error;
use tracing::{event, Level};
use uuid::Uuid;

/// Travel insights error type
///
/// This type encapsulates the various errors that may occur.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum InsightsError {
    /// Error rendering an export table
    #[error("failed to render table")]
    Export(#[from] csv::Error),

    /// A fetch did not complete within the configured timeout
    #[error("timed out fetching {analysis} data after {seconds}s")]
    FetchTimeout { analysis: &'static str, seconds: u64 },

    /// Error validating a market filter (single error)
    #[error("filter is not valid")]
    InvalidPattern(#[from] validator::ValidationError),

    /// Error validating a market filter (multiple errors)
    #[error("filter is not valid")]
    InvalidFilter(#[from] validator::ValidationErrors),

    /// Error deserialising request data
    #[error("request data is not valid")]
    RequestDataJsonRejection(#[from] JsonRejection),

    /// Invalid server configuration
    #[error("invalid server configuration: {reason}")]
    ServerConfig { reason: String },

    /// Unknown dashboard session
    #[error("session {id} not found")]
    SessionNotFound { id: Uuid },

    /// Error decoding a repository response
    #[error("failed to decode repository response")]
    UpstreamDecode(#[from] serde_json::Error),

    /// Transport error talking to the repository
    #[error("error retrieving data from the repository")]
    UpstreamRequest(#[from] reqwest::Error),

    /// The repository answered with a non-success status
    #[error("repository responded with status {status}")]
    UpstreamStatus { status: u16 },
}

impl IntoResponse for InsightsError {
    /// Convert from an `InsightsError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let message = error.to_string();
        let mut causes: Vec<String> = Vec::new();
        let mut current = error.source();
        while let Some(source) = current {
            causes.push(source.to_string());
            current = source.source();
        }
        // Remove duplicate entries.
        causes.dedup();
        let caused_by = if causes.is_empty() {
            None
        } else {
            Some(causes)
        };
        ErrorBody { message, caused_by }
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. This will be formatted into a suitable `ErrorBody`
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            error: ErrorBody::new(error),
        }
    }
}

impl From<InsightsError> for ErrorResponse {
    /// Convert from an `InsightsError` into an `ErrorResponse`.
    fn from(error: InsightsError) -> Self {
        let status = match &error {
            InsightsError::InvalidFilter(_)
            | InsightsError::InvalidPattern(_)
            | InsightsError::RequestDataJsonRejection(_) => StatusCode::BAD_REQUEST,

            InsightsError::SessionNotFound { id: _ } => StatusCode::NOT_FOUND,

            InsightsError::UpstreamDecode(_)
            | InsightsError::UpstreamRequest(_)
            | InsightsError::UpstreamStatus { status: _ } => StatusCode::BAD_GATEWAY,

            InsightsError::FetchTimeout {
                analysis: _,
                seconds: _,
            } => StatusCode::GATEWAY_TIMEOUT,

            InsightsError::Export(_) | InsightsError::ServerConfig { reason: _ } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let response = Self::new(status, &error);

        // Log server errors.
        if response.status.is_server_error() {
            event!(Level::ERROR, "{}", error.to_string());
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        match serde_json::to_string_pretty(&self) {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}

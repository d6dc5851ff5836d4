// SPDX-FileCopyrightText: 2026 smsflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of [`SmsflowError`] onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use smsflow_core::SmsflowError;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// HTTP status for an error class.
pub fn status_for(err: &SmsflowError) -> StatusCode {
    match err {
        SmsflowError::Authorization(_) => StatusCode::FORBIDDEN,
        SmsflowError::Validation(_) | SmsflowError::EmptyPool => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSON error for the operator API.
#[derive(Debug)]
pub struct ApiError(pub SmsflowError);

impl From<SmsflowError> for ApiError {
    fn from(err: SmsflowError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn not_found(what: impl std::fmt::Display) -> Response {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("{what} not found"),
            }),
        )
            .into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "admin request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classes_map_to_statuses() {
        assert_eq!(
            status_for(&SmsflowError::Authorization("x".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(status_for(&SmsflowError::EmptyPool), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&SmsflowError::Validation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&SmsflowError::delivery("down")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&SmsflowError::delivery("gateway call timed out after 30s")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn api_error_response_status() {
        let resp = ApiError(SmsflowError::EmptyPool).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}

//! HTTP handlers for the server.

pub mod print;
pub mod printer;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::TagpressError;

/// A [`TagpressError`] rendered as `{"success": false, "error": ...}`.
#[derive(Debug)]
pub struct ApiError(pub TagpressError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            TagpressError::InvalidRequest(_)
            | TagpressError::UnsupportedLabelType(_)
            | TagpressError::InvalidConfig(_)
            | TagpressError::Encoding(_) => StatusCode::BAD_REQUEST,
            TagpressError::Connection(_) | TagpressError::Timeout(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            TagpressError::Protocol(_) => StatusCode::BAD_GATEWAY,
            TagpressError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TagpressError> for ApiError {
    fn from(err: TagpressError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "error": self.0.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

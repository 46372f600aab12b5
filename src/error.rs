//! Error types surfaced over HTTP.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

pub const EMPTY_QUESTION_MESSAGE: &str = "Soru boş olamaz";

pub const INTERNAL_ERROR_ANSWER: &str =
    "İsteğiniz işlenirken bir hata oluştu. Lütfen tekrar deneyin.";

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The question was empty or whitespace only.
    #[error("Soru boş olamaz")]
    EmptyQuestion,

    /// Anything unexpected in the request path.
    #[error("Bir hata oluştu: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::EmptyQuestion => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            Self::EmptyQuestion => json!({ "error": self.to_string() }),
            Self::Internal(_) => json!({
                "error": self.to_string(),
                "answer": INTERNAL_ERROR_ANSWER,
            }),
        };
        (self.status(), Json(body)).into_response()
    }
}

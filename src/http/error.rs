//! Client-facing error responses.

use axum::Json;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{FormRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::content::StoreError;
use crate::llm::ProviderError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// A required input was blank.
    #[error("{0}")]
    Validation(String),
    /// A required form field was absent.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    /// The provider answered, but with nothing usable.
    #[error("{0}")]
    Generation(String),
    /// The provider call itself failed.
    #[error("{0}")]
    Transport(#[from] ProviderError),
    /// The request could not be extracted (content type, body or query
    /// encoding).
    #[error("{detail}")]
    Rejected { status: StatusCode, detail: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingField(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Transport(_) => StatusCode::BAD_GATEWAY,
            ApiError::Rejected { status, .. } => *status,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ModuleNotFound(_) | StoreError::KeyNotFound { .. } => {
                ApiError::NotFound(e.to_string())
            }
            StoreError::DuplicateModule(_) => ApiError::Conflict(e.to_string()),
        }
    }
}

macro_rules! rejection_into_api_error {
    ($($rejection:ty),+ $(,)?) => {
        $(
            impl From<$rejection> for ApiError {
                fn from(r: $rejection) -> Self {
                    ApiError::Rejected { status: r.status(), detail: r.body_text() }
                }
            }
        )+
    };
}

rejection_into_api_error!(FormRejection, QueryRejection, PathRejection, MultipartRejection, MultipartError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();
        if status.is_server_error() {
            error!(%status, %detail, "request failed");
        } else {
            warn!(%status, %detail, "request rejected");
        }
        (status, Json(json!({ "status": false, "detail": detail }))).into_response()
    }
}

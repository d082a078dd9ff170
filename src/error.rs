use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::data::model::DataError;
use crate::data::schema::FieldError;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Errors surfaced at the HTTP boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("invalid request: {0:?}")]
    Validation(Vec<FieldError>),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn internal(msg: impl std::fmt::Display) -> Self {
        ApiError::Internal(anyhow::anyhow!("{msg}"))
    }
}

impl From<DataError> for ApiError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::PositionOutOfRange { .. } => ApiError::NotFound("Data entry not found"),
            DataError::NoMatch => ApiError::NotFound("No matching data found"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(detail) => {
                (StatusCode::NOT_FOUND, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::Validation(fields) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": fields })))
                    .into_response()
            }
            ApiError::Internal(err) => {
                log::error!("Internal error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "detail": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

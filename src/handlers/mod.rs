use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

pub mod cards;
pub mod tap;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub status: String,
    pub reason: String,
}

pub type ApiFailure = (StatusCode, Json<ApiError>);

fn error_response(code: StatusCode, reason: &str) -> ApiFailure {
    (
        code,
        Json(ApiError {
            status: "ERROR".to_string(),
            reason: reason.to_string(),
        })
    )
}

fn database_error(error: anyhow::Error) -> ApiFailure {
    tracing::error!(%error, "Database error");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
}

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    /// Request body or query string could not be extracted
    #[error("{1}")]
    Rejected(StatusCode, String),
}

impl TrackerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TrackerError::Validation(_) => StatusCode::BAD_REQUEST,
            TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackerError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TrackerError::Rejected(status, _) => *status,
        }
    }
}

impl From<rusqlite::Error> for TrackerError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Persistence(value.to_string())
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(value: serde_json::Error) -> Self {
        Self::Persistence(value.to_string())
    }
}

impl From<JsonRejection> for TrackerError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for TrackerError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            TrackerError::Persistence(_) => error!("Request failed: {}", self),
            TrackerError::NotFound(_) => warn!("{}", self),
            TrackerError::Validation(_) | TrackerError::Rejected(..) => {
                warn!("Rejected request: {}", self)
            }
        }

        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}

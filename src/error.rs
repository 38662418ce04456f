use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-wide error types.
///
/// The rewrite decision itself never fails; a URI that does not match, a
/// version that is already current, or a missing target all converge on the
/// not-found response. These variants cover startup and infrastructure
/// failures only.
#[derive(Error, Debug)]
pub enum RedirectError {
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RedirectError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RedirectError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RedirectError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RedirectError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RedirectError::Config(_) => "CONFIG_ERROR",
            RedirectError::Internal(_) => "INTERNAL_ERROR",
            RedirectError::Io(_) => "IO_ERROR",
        }
    }
}

impl IntoResponse for RedirectError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
                "status": status.as_u16()
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, RedirectError>;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not invited to this poll")]
    NotInvited,
    #[error("poll is past its deadline")]
    PollClosed,
    #[error("vote cap reached for this poll")]
    VoteCapExceeded,
    #[error("unknown option for this poll")]
    UnknownOption,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Machine-readable error code string.
    fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound => "NOT_FOUND",
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::NotInvited => "NOT_INVITED",
            ApiError::PollClosed => "POLL_CLOSED",
            ApiError::VoteCapExceeded => "VOTE_CAP_EXCEEDED",
            ApiError::UnknownOption => "UNKNOWN_OPTION",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden | ApiError::NotInvited => StatusCode::FORBIDDEN,
            ApiError::PollClosed | ApiError::VoteCapExceeded => StatusCode::CONFLICT,
            ApiError::UnknownOption | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        let message = match &self {
            ApiError::Internal(err) => {
                tracing::error!("API internal error: {err:#}");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "code": code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}

impl From<livepoll_core::error::CoreError> for ApiError {
    fn from(e: livepoll_core::error::CoreError) -> Self {
        use livepoll_core::error::CoreError;
        match e {
            CoreError::NotFound => ApiError::NotFound,
            CoreError::Forbidden => ApiError::Forbidden,
            CoreError::NotInvited => ApiError::NotInvited,
            CoreError::PollClosed => ApiError::PollClosed,
            CoreError::UnknownOption => ApiError::UnknownOption,
            CoreError::VoteCapExceeded => ApiError::VoteCapExceeded,
            CoreError::BadRequest(msg) => ApiError::BadRequest(msg),
            CoreError::Database(_) => ApiError::Internal(anyhow::anyhow!("database error")),
        }
    }
}

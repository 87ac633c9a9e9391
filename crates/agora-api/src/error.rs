use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// The one error surface every handler funnels through. Expected domain
/// failures map to their documented status codes; anything else lands in
/// Internal and surfaces as a bare 500 with the chain logged server-side.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("User already exists")]
    EmailTaken,
    #[error("Not authorized, token missing or invalid")]
    TokenInvalid,
    #[error("Not authorized to modify this {0}")]
    NotOwner(&'static str),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("You have already voted on this item.")]
    DuplicateVote,
    #[error("Malformed request body: {0}")]
    BadBody(#[from] JsonRejection),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::InvalidCredentials
            | ApiError::EmailTaken
            | ApiError::DuplicateVote
            | ApiError::BadBody(_) => StatusCode::BAD_REQUEST,
            ApiError::TokenInvalid | ApiError::NotOwner(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if let ApiError::Internal(err) = &self {
            error!(error = ?err, "Unhandled error");
            "Internal server error".to_string()
        } else {
            warn!(error = %self, %status, "Replying with error");
            self.to_string()
        };

        (status, Json(ErrorBody { message })).into_response()
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(anyhow::Error::new(err))
    }
}

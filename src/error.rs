use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::StoreError;

/// Domain error kinds shared by the services and mapped to HTTP statuses at
/// the boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("account not exists")]
    AccountNotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("event not found")]
    EventNotFound,
    #[error("account already exists")]
    AccountExists,
    #[error("password not match")]
    PasswordMismatch,
    #[error("permission denied")]
    PermissionDenied,
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::PasswordMismatch => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::AccountNotFound | Self::UserNotFound | Self::EventNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::AccountExists => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        Self::Internal(e.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        Self::InvalidInput(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        Self::InvalidInput(e.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(e: MultipartRejection) -> Self {
        Self::InvalidInput(e.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        Self::InvalidInput(e.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            // details stay in the log; clients only see the kind
            tracing::error!(error = %self, "request failed");
            return (status, "internal error").into_response();
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(AppError::invalid("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::PasswordMismatch.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::PermissionDenied.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::AccountNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::UserNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::EventNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::AccountExists.status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::from(StoreError::Duplicate).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn invalid_input_message_is_passed_through() {
        assert_eq!(AppError::invalid("content empty").to_string(), "content empty");
    }

    async fn body_of(err: AppError) -> (StatusCode, String) {
        let res = err.into_response();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn internal_details_do_not_reach_the_client() {
        let err = AppError::Internal(anyhow::anyhow!(
            "value too long for type character varying(255)"
        ));
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "internal error");
    }

    #[tokio::test]
    async fn client_errors_keep_their_message() {
        let (status, body) = body_of(AppError::AccountNotFound).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "account not exists");
    }
}

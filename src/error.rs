/*!
 * Error Types
 * Closed error taxonomy shared by the editor, the view pipeline and the routes
 */
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::media::MediaError;
use crate::store::StoreError;

/// Sign-in failures, already mapped from whatever the identity backend reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthErrorKind {
    #[error("No account found with this email address.")]
    AccountNotFound,

    #[error("Incorrect password. Please try again.")]
    WrongCredential,

    #[error("Too many attempts. Account temporarily locked.")]
    RateLimited,

    #[error("This account has been disabled.")]
    Disabled,

    #[error("Login failed. Please try again.")]
    Unavailable,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error(transparent)]
    Auth(#[from] AuthErrorKind),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("Deletion must be confirmed")]
    ConfirmationRequired,

    #[error(transparent)]
    Media(#[from] MediaError),

    /// Backend failure; the message is the user-facing text.
    #[error("{0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Converts a store failure on a write path, logging the cause.
    pub fn from_write(err: StoreError, message: &str) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound,
            other => {
                tracing::error!(error = %other, "{}", message);
                AppError::Transport(message.to_string())
            }
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut field = None;
        let (status, message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Validation {
                field: name,
                message,
            } => {
                field = Some(name.to_string());
                (StatusCode::UNPROCESSABLE_ENTITY, message.clone())
            }
            AppError::Auth(kind) => {
                let status = match kind {
                    AuthErrorKind::AccountNotFound | AuthErrorKind::WrongCredential => {
                        StatusCode::UNAUTHORIZED
                    }
                    AuthErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                    AuthErrorKind::Disabled => StatusCode::FORBIDDEN,
                    AuthErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                };
                (status, kind.to_string())
            }
            AppError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::ConfirmationRequired => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Media(err) => match err {
                MediaError::Rejected(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
                MediaError::Decode(e) => {
                    tracing::warn!(error = %e, "uploaded image could not be decoded");
                    (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "The file is not a readable image.".to_string(),
                    )
                }
                other => {
                    tracing::error!(error = %other, "image ingestion failed");
                    (
                        StatusCode::BAD_GATEWAY,
                        "Failed to upload image. Please try a different file.".to_string(),
                    )
                }
            },
            AppError::Transport(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: message,
                field,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_use_readable_messages() {
        assert_eq!(
            AuthErrorKind::AccountNotFound.to_string(),
            "No account found with this email address."
        );
        assert_eq!(
            AuthErrorKind::RateLimited.to_string(),
            "Too many attempts. Account temporarily locked."
        );
        assert_eq!(
            AppError::from(AuthErrorKind::Disabled).to_string(),
            "This account has been disabled."
        );
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::NotFound, StatusCode::NOT_FOUND),
            (
                AppError::validation("title", "Title is required"),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::Auth(AuthErrorKind::RateLimited),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                AppError::Auth(AuthErrorKind::WrongCredential),
                StatusCode::UNAUTHORIZED,
            ),
            (AppError::ConfirmationRequired, StatusCode::BAD_REQUEST),
            (
                AppError::Transport("Failed".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[tokio::test]
    async fn test_validation_body_names_field() {
        let res = AppError::validation("title", "Title is required").into_response();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "Title is required");
        assert_eq!(body.field.as_deref(), Some("title"));
    }

    #[test]
    fn test_undecodable_image_is_client_error() {
        let corrupt = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        let err = image::load_from_memory(&corrupt).unwrap_err();
        let res = AppError::from(MediaError::from(err)).into_response();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let res = AppError::from(MediaError::MissingUrl).into_response();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_write_failure_maps_to_transport() {
        let err = AppError::from_write(
            StoreError::Unavailable("connection refused".to_string()),
            "Failed to save blog post. Please try again.",
        );
        assert!(matches!(err, AppError::Transport(ref m) if m.starts_with("Failed to save")));
        assert!(matches!(
            AppError::from_write(StoreError::NotFound, "x"),
            AppError::NotFound
        ));
    }
}

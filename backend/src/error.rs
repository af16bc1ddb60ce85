use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Field name -> human readable message.
pub type FieldErrors = BTreeMap<&'static str, String>;

#[derive(Debug, Error)]
pub enum AppError {
    /// No identity could be resolved for a protected operation.
    #[error("authentication required")]
    Unauthenticated,

    /// A resolved session points at a user record that no longer exists.
    #[error("identity {0} not found")]
    IdentityNotFound(String),

    #[error("username {0:?} is already taken")]
    UsernameTaken(String),

    /// Unknown username and wrong password collapse into this one variant.
    #[error("invalid username or password")]
    AuthenticationFailed,

    #[error("invalid input")]
    Validation(FieldErrors),

    #[error("song {0} not found")]
    SongNotFound(String),

    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field, message.into());
        AppError::Validation(fields)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::SEE_OTHER,
            AppError::UsernameTaken(_) => StatusCode::CONFLICT,
            AppError::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::SongNotFound(_) => StatusCode::NOT_FOUND,
            AppError::IdentityNotFound(_)
            | AppError::PersistenceUnavailable(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message that is safe to show to the client.
    pub fn public_message(&self) -> String {
        match self {
            AppError::UsernameTaken(_) => "Username is already taken.".to_string(),
            AppError::AuthenticationFailed => "Invalid username or password.".to_string(),
            AppError::Validation(_) => {
                "Please correct the highlighted errors before submitting.".to_string()
            }
            AppError::SongNotFound(_) => "Song not found.".to_string(),
            AppError::Unauthenticated => "Please log in first.".to_string(),
            AppError::IdentityNotFound(_)
            | AppError::PersistenceUnavailable(_)
            | AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Unauthenticated => return Redirect::to("/login").into_response(),
            AppError::IdentityNotFound(_)
            | AppError::PersistenceUnavailable(_)
            | AppError::Internal(_) => tracing::error!(error = %self, "request failed"),
            _ => {}
        }

        let mut body = json!({ "error": self.public_message() });
        if let AppError::Validation(fields) = &self {
            body["fields"] = json!(fields);
        }

        (self.status(), Json(body)).into_response()
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(err.to_string())
    }
}

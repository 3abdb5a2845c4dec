use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub type ActivityResult<T> = Result<T, ActivityLogError>;

#[derive(thiserror::Error, Debug)]
pub enum ActivityLogError {
    #[error("could not determine a user with identifier `{0}`")]
    CouldNotDetermineUser(String),
    #[error("the given activity model `{0}` does not provide the activity record shape")]
    InvalidConfiguration(String),
    #[error("auth guard `{0}` is not defined")]
    AuthGuardNotDefined(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ActivityLogError {
    pub fn could_not_determine_user(identifier: impl Into<String>) -> Self {
        Self::CouldNotDetermineUser(identifier.into())
    }

    pub fn invalid_configuration(model: impl Into<String>) -> Self {
        Self::InvalidConfiguration(model.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ActivityLogError {
    fn into_response(self) -> Response {
        let status = match self {
            ActivityLogError::CouldNotDetermineUser(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ActivityLogError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ActivityLogError::InvalidConfiguration(_)
            | ActivityLogError::AuthGuardNotDefined(_)
            | ActivityLogError::Configuration(_)
            | ActivityLogError::Serialization(_)
            | ActivityLogError::Database(_)
            | ActivityLogError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = self.to_string();
        let error = match &self {
            ActivityLogError::CouldNotDetermineUser(_) => "could_not_determine_user",
            ActivityLogError::InvalidConfiguration(_) => "invalid_configuration",
            ActivityLogError::AuthGuardNotDefined(_) => "auth_guard_not_defined",
            ActivityLogError::Configuration(_) => "configuration",
            ActivityLogError::Unauthorized(_) => "unauthorized",
            ActivityLogError::Serialization(_) => "serialization",
            ActivityLogError::Database(_) => "database",
            ActivityLogError::Internal(_) => "internal",
        };

        let payload = ErrorResponse {
            error: error.to_string(),
            message,
        };

        (status, Json(payload)).into_response()
    }
}

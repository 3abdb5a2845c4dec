use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use jsonwebtoken::{DecodingKey, Validation};

use crate::errors::ActivityLogError;
use crate::logger::ActivityLogger;
use crate::provider::ActivityLog;

/// Verifies bearer tokens minted by the host application.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Arc<Vec<u8>>,
}

impl JwtConfig {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: Arc::new(secret.into()),
        }
    }

    pub fn from_env() -> Result<Self, ActivityLogError> {
        let secret = std::env::var("JWT_SECRET").map_err(|_| ActivityLogError::configuration("JWT_SECRET not set"))?;
        Ok(Self::new(secret.into_bytes()))
    }

    /// Validates the signature and expiry of `token`.
    pub fn decode(&self, token: &str) -> Result<Claims, ActivityLogError> {
        jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &Validation::default())
            .map(|data| data.claims)
            .map_err(|err| ActivityLogError::unauthorized(err.to_string()))
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    /// Primary key of the authenticated actor.
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

/// Hands a request-scoped builder to handlers. A valid bearer token makes its
/// subject the default causer; requests without one log with no causer.
#[async_trait]
impl<S> FromRequestParts<S> for ActivityLogger
where
    S: Send + Sync,
    ActivityLog: FromRef<S>,
    JwtConfig: FromRef<S>,
{
    type Rejection = ActivityLogError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let activity_log = ActivityLog::from_ref(state);
        let jwt = JwtConfig::from_ref(state);

        let token = match parts.headers.get(axum::http::header::AUTHORIZATION) {
            Some(value) => {
                let value = value
                    .to_str()
                    .map_err(|_| ActivityLogError::unauthorized("Authorization header is not valid text"))?;
                let token = value
                    .strip_prefix("Bearer ")
                    .ok_or_else(|| ActivityLogError::unauthorized("Authorization header must be a bearer token"))?;
                Some(token)
            }
            None => None,
        };

        let actor_id = match token {
            Some(token) => Some(jwt.decode(token)?.sub),
            None => None,
        };

        activity_log.logger_for(actor_id.as_deref()).await
    }
}

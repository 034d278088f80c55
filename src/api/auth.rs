// Sign-in gate: credential check, signed session tokens, and the middleware
// guarding the record routes.

use super::envelope::{ok, ApiError, ApiResult};
use super::AppState;
use crate::error::Error;
use crate::schema::ValidationError;
use crate::users;
use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::header,
    middleware::Next,
    response::Response,
    Json,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Session settings derived from `AuthConfig`.
#[derive(Clone)]
pub struct AuthSettings {
    /// Enforce sessions on record routes
    pub enabled: bool,
    secret: String,
    ttl: chrono::Duration,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("enabled", &self.enabled)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl AuthSettings {
    pub fn new(enabled: bool, secret: impl Into<String>, ttl: chrono::Duration) -> Self {
        AuthSettings {
            enabled,
            secret: secret.into(),
            ttl,
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, String::new(), chrono::Duration::hours(24))
    }

    pub fn from_config(config: &crate::config::AuthConfig) -> Self {
        Self::new(config.enabled, config.jwt_secret.clone(), config.token_ttl())
    }

    pub fn issue_token(&self, user_id: Uuid, username: &str) -> Result<String, Error> {
        if self.secret.is_empty() {
            return Err(Error::unauthorized("sign-in is not configured"));
        }

        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| Error::internal(format!("token encode failed: {e}")))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| Error::Token(e.to_string()))?;

        Ok(data.claims)
    }
}

/// Token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// Identity of the signed-in caller, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Uuid,
    pub username: String,
}

/// POST /api/auth/login - exchange a credential pair for a session token
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(req) = payload.map_err(|rej| body_error(&rej, "Login"))?;

    let mut errors = Vec::new();
    let username = req.username.filter(|u| !u.trim().is_empty());
    let password = req.password.filter(|p| !p.is_empty());
    if username.is_none() {
        errors.push(ValidationError::required("username", "Login"));
    }
    if password.is_none() {
        errors.push(ValidationError::required("password", "Login"));
    }
    let (Some(username), Some(password)) = (username, password) else {
        return Err(Error::Validation(errors).into());
    };

    let credential = state
        .store
        .with_conn(|conn| users::find_credential(conn, &username))?
        .ok_or_else(|| Error::unauthorized("invalid username or password"))?;

    // argon2 runs off the async workers and outside the store lock
    let user = tokio::task::spawn_blocking(move || credential.verify(&password))
        .await
        .map_err(|e| Error::internal(format!("password check failed: {e}")))??
        .ok_or_else(|| Error::unauthorized("invalid username or password"))?;

    let token = state.auth.issue_token(user.id, &user.username)?;
    info!(username = %user.username, "signed in");

    Ok(ok(LoginResponse {
        token,
        user_id: user.id,
        username: user.username,
    }))
}

/// Middleware: reject requests without a valid `Bearer` token when auth is enabled.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.auth.enabled {
        return Ok(next.run(req).await);
    }

    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::unauthorized("missing Authorization header"))?;

    let token = header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| Error::unauthorized("invalid Authorization scheme"))?;

    let claims = state.auth.verify_token(token)?;
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| Error::unauthorized("invalid subject in token"))?;

    req.extensions_mut().insert(SessionUser {
        user_id,
        username: claims.username,
    });

    Ok(next.run(req).await)
}

pub(crate) fn body_error(rejection: &JsonRejection, context: &str) -> ApiError {
    ApiError(Error::Validation(vec![ValidationError::new(
        "body",
        rejection.body_text(),
        context,
    )]))
}

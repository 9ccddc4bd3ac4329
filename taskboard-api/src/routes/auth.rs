/// Authentication endpoints
///
/// - `POST /v1/auth/register` - Create an account
/// - `POST /v1/auth/login` - Exchange credentials for a bearer token and
///   an HttpOnly session cookie

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::users::UserResponse,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskboard_shared::{auth::middleware::session_cookie, services::NewUser};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 6, max = 128, message = "Password must be 6-128 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: UserResponse,

    /// Bearer token for the `Authorization` header
    pub token: String,

    pub expires_at: DateTime<Utc>,
}

/// Register a new user
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// { "name": "Ada", "email": "ada@example.com", "password": "secret1" }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: email already registered
/// - `422 Unprocessable Entity`: validation failed
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let Json(req) = body?;
    req.validate().map_err(ApiError::from)?;

    let user = state
        .users
        .register(NewUser {
            name: req.name,
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Login with email and password
///
/// The token is returned in the body and also set as the `Authorization`
/// cookie, which expires with the token. The cookie is `Secure` in production.
///
/// # Errors
///
/// - `401 Unauthorized`: unknown email or wrong password (same message)
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<([(header::HeaderName, String); 1], Json<LoginResponse>)> {
    let Json(req) = body?;
    req.validate().map_err(ApiError::from)?;

    let (user, issued) = state.users.authenticate(&req.email, &req.password).await?;
    let cookie = session_cookie(&issued.token, issued.expires_at, state.config.api.production);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            user: user.into(),
            token: issued.token,
            expires_at: issued.expires_at,
        }),
    ))
}

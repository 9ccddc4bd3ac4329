/// User endpoints
///
/// - `GET /v1/users` - List all users
/// - `GET /v1/users/me` - The authenticated user
/// - `PATCH /v1/users/me` - Change own name and/or email
/// - `GET /v1/users/:id` - Look up a user

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::user::{UpdateUser, User},
};
use uuid::Uuid;
use validator::Validate;

/// Public view of an account
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.uuid,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<UserResponse>>> {
    let users = state.users.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub async fn current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserResponse>> {
    let user = state.users.get_user(auth.user_id).await?;
    Ok(Json(user.into()))
}

pub async fn get_user(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<UserResponse>> {
    let Path(id) = path?;
    let user = state.users.get_user(id).await?;
    Ok(Json(user.into()))
}

/// # Errors
///
/// - `400 Bad Request`: empty patch
/// - `409 Conflict`: email belongs to another account
/// - `422 Unprocessable Entity`: validation failed
pub async fn update_current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let Json(req) = body?;
    req.validate().map_err(ApiError::from)?;

    let user = state
        .users
        .update_user(
            auth.user_id,
            UpdateUser {
                name: req.name,
                email: req.email,
            },
            auth.user_id,
        )
        .await?;

    Ok(Json(user.into()))
}

/// Task endpoints
///
/// All routes require a bearer token; the authenticated user is the
/// requestor for every permission check.
///
/// | Route | Who may call |
/// |---|---|
/// | `GET /v1/tasks`, `GET /v1/tasks/:id` | anyone |
/// | `POST /v1/tasks` | anyone (caller becomes creator) |
/// | `PATCH`, `DELETE /v1/tasks/:id` | creator |
/// | `POST /v1/tasks/:id/assign/:user_id` | creator |
/// | `POST /v1/tasks/:id/primary/:user_id` | creator |
/// | `POST /v1/tasks/:id/complete` | creator or assignee |

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::{
        task::{Task, UpdateTask},
        user::UserSummary,
    },
    services::NewTask,
};
use uuid::Uuid;
use validator::Validate;

/// Reference to an existing user in a request body
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UserRef {
    pub id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    pub description: Option<String>,

    /// Initial assignees; the first one becomes the primary assignee
    #[serde(default)]
    pub users: Vec<UserRef>,
}

/// Partial update. An empty `description` clears it.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<UserSummary>,

    /// Primary assignee
    pub assigned_to: Option<UserSummary>,

    /// Everyone assigned, in assignment order
    pub users: Vec<UserSummary>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.uuid,
            title: task.title,
            description: task.description,
            completed: task.completed,
            created_at: task.created_at,
            updated_at: task.updated_at,
            created_by: task.created_by,
            assigned_to: task.assigned_to,
            users: task.users,
        }
    }
}

fn respond_many(tasks: Vec<Task>) -> Json<Vec<TaskResponse>> {
    Json(tasks.into_iter().map(TaskResponse::from).collect())
}

pub async fn list_tasks(State(state): State<AppState>) -> ApiResult<Json<Vec<TaskResponse>>> {
    Ok(respond_many(state.tasks.list_tasks().await?))
}

pub async fn list_created(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    Ok(respond_many(state.tasks.list_created_by(auth.user_id).await?))
}

pub async fn list_assigned(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    Ok(respond_many(state.tasks.list_assigned_to(auth.user_id).await?))
}

/// Create a task, optionally assigning users in the same transaction
///
/// ```text
/// POST /v1/tasks
///
/// { "title": "Ship it", "users": [{ "id": "..." }, { "id": "..." }] }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: an assignee does not exist (nothing is created)
/// - `422 Unprocessable Entity`: validation failed
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    let Json(req) = body?;
    req.validate().map_err(ApiError::from)?;

    let task = state
        .tasks
        .create_task(
            NewTask {
                title: req.title,
                description: req.description,
                assignees: req.users.iter().map(|u| u.id).collect(),
            },
            auth.user_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(task.into())))
}

pub async fn get_task(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<TaskResponse>> {
    let Path(id) = path?;
    Ok(Json(state.tasks.get_task(id).await?.into()))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<Json<TaskResponse>> {
    let Path(id) = path?;
    let Json(req) = body?;
    req.validate().map_err(ApiError::from)?;

    let patch = UpdateTask {
        title: req.title,
        description: req.description.map(Some),
    };

    Ok(Json(state.tasks.update_task(id, patch, auth.user_id).await?.into()))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;
    state.tasks.delete_task(id, auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// # Errors
///
/// - `403 Forbidden`: caller is neither creator nor assignee
/// - `409 Conflict`: already completed
pub async fn complete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<TaskResponse>> {
    let Path(id) = path?;
    Ok(Json(state.tasks.complete_task(id, auth.user_id).await?.into()))
}

/// # Errors
///
/// - `403 Forbidden`: caller is not the creator
/// - `404 Not Found`: unknown task or user
/// - `409 Conflict`: user already assigned
pub async fn assign_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> ApiResult<Json<TaskResponse>> {
    let Path((id, user_id)) = path?;
    Ok(Json(
        state.tasks.assign_task(id, user_id, auth.user_id).await?.into(),
    ))
}

pub async fn set_primary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> ApiResult<Json<TaskResponse>> {
    let Path((id, user_id)) = path?;
    Ok(Json(
        state
            .tasks
            .set_primary_assignee(id, user_id, auth.user_id)
            .await?
            .into(),
    ))
}

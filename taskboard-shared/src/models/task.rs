/// Task model and database operations
///
/// A task is created by exactly one user (its creator) and may be assigned to
/// any number of users. One of the assigned users can be the primary assignee,
/// a denormalized pointer kept on the task row. Completion is one-way.
///
/// # State Machine
///
/// ```text
/// open → completed
/// ```
///
/// The assignment set evolves independently of the completion flag and only
/// grows while the task is live.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     uuid UUID NOT NULL UNIQUE,
///     title VARCHAR(255) NOT NULL CHECK (length(btrim(title)) > 0),
///     description TEXT,
///     completed BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ,
///     created_by_id UUID NOT NULL REFERENCES users (uuid),
///     assigned_to_id UUID REFERENCES users (uuid)
/// );
///
/// CREATE TABLE user_tasks (
///     task_id BIGINT NOT NULL REFERENCES tasks (id) ON DELETE CASCADE,
///     user_id BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
///     assigned_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     seq BIGSERIAL NOT NULL,
///     PRIMARY KEY (task_id, user_id)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::task::{CreateTask, Task};
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let task = Task::insert(&pool, &CreateTask {
///     uuid: Uuid::new_v4(),
///     title: "Write release notes".to_string(),
///     description: None,
///     created_by_id: Uuid::new_v4(),
///     assignees: vec![],
/// }).await?;
///
/// Task::mark_completed(&pool, task.uuid).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use super::user::UserSummary;

const TASK_COLUMNS: &str = "id, uuid, title, description, completed, created_at, updated_at, \
                            deleted_at, created_by_id, assigned_to_id";

/// Completion state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Open,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::Completed => "completed",
        }
    }

    /// Completion is terminal; the only legal move is open → completed.
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        matches!((self, target), (TaskStatus::Open, TaskStatus::Completed))
    }
}

/// Task with its resolved relations
///
/// Rows loaded straight from the database leave `created_by`, `assigned_to`
/// and `users` empty; the store fills them before returning the task.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Internal numeric key, used by the assignment relation
    #[serde(skip_serializing, default)]
    pub id: i64,

    pub uuid: Uuid,

    pub title: String,

    pub description: Option<String>,

    pub completed: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,

    /// Creator. Immutable after creation.
    pub created_by_id: Uuid,

    /// Primary assignee. Always a member of `users` when set.
    pub assigned_to_id: Option<Uuid>,

    #[sqlx(skip)]
    pub created_by: Option<UserSummary>,

    #[sqlx(skip)]
    pub assigned_to: Option<UserSummary>,

    /// Full assignment set
    #[sqlx(skip)]
    pub users: Vec<UserSummary>,
}

/// Input for creating a new task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub uuid: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_by_id: Uuid,

    /// Initial assignment set. The first entry becomes the primary assignee.
    /// Duplicates are expected to be removed with [`dedup_assignees`].
    pub assignees: Vec<Uuid>,
}

impl CreateTask {
    pub fn primary_assignee(&self) -> Option<Uuid> {
        self.assignees.first().copied()
    }
}

/// Input for updating a task
///
/// Only non-None fields are written. Use `description: Some(None)` to clear
/// the description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
}

impl UpdateTask {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

/// Removes repeated ids, keeping the first occurrence of each
pub fn dedup_assignees(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

impl Task {
    pub fn status(&self) -> TaskStatus {
        if self.completed {
            TaskStatus::Completed
        } else {
            TaskStatus::Open
        }
    }

    pub fn is_creator(&self, user_id: Uuid) -> bool {
        self.created_by_id == user_id
    }

    /// True if the user is in the assignment set or is the primary assignee
    pub fn is_assigned(&self, user_id: Uuid) -> bool {
        self.assigned_to_id == Some(user_id) || self.users.iter().any(|u| u.id == user_id)
    }

    /// Creator or any assignee
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.is_creator(user_id) || self.is_assigned(user_id)
    }

    /// Inserts the task row only. Assignment rows are written separately.
    pub async fn insert<'e, E>(executor: E, data: &CreateTask) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (uuid, title, description, created_by_id, assigned_to_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(data.uuid)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.created_by_id)
        .bind(data.primary_assignee())
        .fetch_one(executor)
        .await
    }

    /// Finds a live task row by external identifier
    pub async fn find_by_uuid<'e, E>(executor: E, uuid: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE uuid = $1 AND deleted_at IS NULL"
        ))
        .bind(uuid)
        .fetch_optional(executor)
        .await
    }

    /// Same as [`Task::find_by_uuid`] but takes a row lock for the rest of
    /// the surrounding transaction
    pub async fn find_by_uuid_for_update<'e, E>(
        executor: E,
        uuid: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE uuid = $1 AND deleted_at IS NULL FOR UPDATE"
        ))
        .bind(uuid)
        .fetch_optional(executor)
        .await
    }

    /// Lists all live tasks, newest first
    pub async fn list<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE deleted_at IS NULL \
             ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(executor)
        .await
    }

    /// Lists live tasks created by a user, newest first
    pub async fn list_created_by<'e, E>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS} FROM tasks
            WHERE created_by_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    /// Lists live tasks whose assignment set contains the user, newest first
    pub async fn list_assigned_to<'e, E>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.uuid, t.title, t.description, t.completed, t.created_at,
                   t.updated_at, t.deleted_at, t.created_by_id, t.assigned_to_id
            FROM tasks t
            JOIN user_tasks ut ON ut.task_id = t.id
            JOIN users u ON u.id = ut.user_id
            WHERE u.uuid = $1 AND t.deleted_at IS NULL
            ORDER BY t.created_at DESC, t.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    /// Updates title and/or description of a live task
    ///
    /// Returns `None` if no live task has this identifier.
    pub async fn update<'e, E>(
        executor: E,
        uuid: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE uuid = $1 AND deleted_at IS NULL RETURNING {TASK_COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(uuid);
        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }

        q.fetch_optional(executor).await
    }

    /// Flips the completed flag if it is not already set
    ///
    /// Returns `None` when the task is missing or already completed, so two
    /// racing calls produce exactly one `Some`.
    pub async fn mark_completed<'e, E>(executor: E, uuid: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET completed = TRUE, updated_at = NOW()
            WHERE uuid = $1 AND deleted_at IS NULL AND completed = FALSE
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(uuid)
        .fetch_optional(executor)
        .await
    }

    /// Moves the primary-assignee pointer
    pub async fn set_assigned_to<'e, E>(
        executor: E,
        id: i64,
        assignee: Option<Uuid>,
    ) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query("UPDATE tasks SET assigned_to_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(assignee)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Soft-deletes a task and clears its primary assignee
    ///
    /// Returns true if a live row was deleted.
    pub async fn soft_delete<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET deleted_at = NOW(), assigned_to_id = NULL, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Inserts an assignment row
    ///
    /// Returns false if the user was already assigned.
    pub async fn add_assignment<'e, E>(
        executor: E,
        task_id: i64,
        user_id: i64,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO user_tasks (task_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (task_id, user_id) DO NOTHING
            "#,
        )
        .bind(task_id)
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn has_assignment<'e, E>(
        executor: E,
        task_id: i64,
        user_id: i64,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM user_tasks WHERE task_id = $1 AND user_id = $2)",
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_one(executor)
        .await
    }

    /// Removes every assignment row of a task
    pub async fn remove_assignments<'e, E>(executor: E, task_id: i64) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM user_tasks WHERE task_id = $1")
            .bind(task_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Loads the assignment sets of a batch of tasks, keyed by internal task id
    pub async fn assignees_for<'e, E>(
        executor: E,
        task_ids: &[i64],
    ) -> Result<Vec<(i64, UserSummary)>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let rows: Vec<(i64, Uuid, String, String)> = sqlx::query_as(
            r#"
            SELECT ut.task_id, u.uuid, u.name, u.email
            FROM user_tasks ut
            JOIN users u ON u.id = ut.user_id
            WHERE ut.task_id = ANY($1)
            ORDER BY ut.seq ASC
            "#,
        )
        .bind(task_ids)
        .fetch_all(executor)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(task_id, id, name, email)| (task_id, UserSummary { id, name, email }))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(name: &str) -> UserSummary {
        UserSummary {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
        }
    }

    fn open_task(creator: Uuid) -> Task {
        Task {
            id: 1,
            uuid: Uuid::new_v4(),
            title: "Ship it".to_string(),
            description: None,
            completed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
            created_by_id: creator,
            assigned_to_id: None,
            created_by: None,
            assigned_to: None,
            users: Vec::new(),
        }
    }

    #[test]
    fn test_status_transitions() {
        assert!(TaskStatus::Open.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Open));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::Open.can_transition_to(TaskStatus::Open));
    }

    #[test]
    fn test_status_from_flag() {
        let mut task = open_task(Uuid::new_v4());
        assert_eq!(task.status(), TaskStatus::Open);
        task.completed = true;
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.status().as_str(), "completed");
    }

    #[test]
    fn test_participants() {
        let creator = Uuid::new_v4();
        let bob = summary("Bob");
        let stranger = Uuid::new_v4();

        let mut task = open_task(creator);
        task.users.push(bob.clone());

        assert!(task.is_creator(creator));
        assert!(!task.is_creator(bob.id));
        assert!(task.is_assigned(bob.id));
        assert!(task.is_participant(creator));
        assert!(task.is_participant(bob.id));
        assert!(!task.is_participant(stranger));
    }

    #[test]
    fn test_primary_assignee_counts_as_assigned() {
        let carol = Uuid::new_v4();
        let mut task = open_task(Uuid::new_v4());
        task.assigned_to_id = Some(carol);
        assert!(task.is_assigned(carol));
    }

    #[test]
    fn test_dedup_assignees_keeps_first_occurrence() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(dedup_assignees(&[a, b, a, b, a]), vec![a, b]);
        assert!(dedup_assignees(&[]).is_empty());
    }

    #[test]
    fn test_create_task_primary_is_first() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let data = CreateTask {
            uuid: Uuid::new_v4(),
            title: "X".to_string(),
            description: None,
            created_by_id: Uuid::new_v4(),
            assignees: vec![a, b],
        };
        assert_eq!(data.primary_assignee(), Some(a));
    }

    #[test]
    fn test_update_task_is_empty() {
        assert!(UpdateTask::default().is_empty());
        let clear = UpdateTask {
            title: None,
            description: Some(None),
        };
        assert!(!clear.is_empty());
    }
}

/// PostgreSQL store
///
/// Implements the repository ports on top of a shared [`PgPool`]. Mutations
/// that touch more than one row run in a single transaction; a transaction
/// that is dropped before `commit` rolls back, so every early `?` return
/// leaves the database untouched.
///
/// Assignment and primary-pointer writes lock the task row with
/// `SELECT ... FOR UPDATE` so concurrent writers on the same task serialize.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskboard_shared::repository::{PgStore, TaskRepository};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let store = PgStore::new(pool);
/// let tasks = store.list_tasks().await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use super::{RepoError, RepoResult, StoreHealth, TaskRepository, UserRepository};
use crate::db::pool;
use crate::models::{
    task::{dedup_assignees, CreateTask, Task, UpdateTask},
    user::{CreateUser, UpdateUser, User, UserSummary},
};

/// PostgreSQL-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Resolves creator, primary assignee and assignment set for a batch of
    /// task rows
    async fn hydrate(&self, mut tasks: Vec<Task>) -> RepoResult<Vec<Task>> {
        if tasks.is_empty() {
            return Ok(tasks);
        }

        let mut user_ids: Vec<Uuid> = tasks
            .iter()
            .flat_map(|t| std::iter::once(t.created_by_id).chain(t.assigned_to_id))
            .collect();
        user_ids.sort_unstable();
        user_ids.dedup();

        let summaries: HashMap<Uuid, UserSummary> =
            User::summaries_by_uuids(&self.pool, &user_ids)
                .await?
                .into_iter()
                .map(|s| (s.id, s))
                .collect();

        let task_ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
        let mut assignees: HashMap<i64, Vec<UserSummary>> = HashMap::new();
        for (task_id, summary) in Task::assignees_for(&self.pool, &task_ids).await? {
            assignees.entry(task_id).or_default().push(summary);
        }

        for task in &mut tasks {
            task.created_by = summaries.get(&task.created_by_id).cloned();
            task.assigned_to = task
                .assigned_to_id
                .and_then(|id| summaries.get(&id).cloned());
            task.users = assignees.remove(&task.id).unwrap_or_default();
        }

        Ok(tasks)
    }

    async fn hydrate_one(&self, task: Task) -> RepoResult<Task> {
        let uuid = task.uuid;
        self.hydrate(vec![task])
            .await?
            .pop()
            .ok_or_else(|| RepoError::task_not_found(uuid))
    }

    async fn load_task(&self, id: Uuid) -> RepoResult<Task> {
        let task = Task::find_by_uuid(&self.pool, id)
            .await?
            .ok_or_else(|| RepoError::task_not_found(id))?;
        self.hydrate_one(task).await
    }
}

/// Maps a unique violation on the email index to `DuplicateEmail`
fn email_conflict(err: sqlx::Error, email: &str) -> RepoError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            RepoError::DuplicateEmail(email.to_string())
        }
        _ => RepoError::Database(err),
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, data: CreateUser) -> RepoResult<User> {
        let email = data.email.clone();
        User::create(&self.pool, data)
            .await
            .map_err(|e| email_conflict(e, &email))
    }

    async fn find_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(User::find_by_uuid(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        Ok(User::list(&self.pool).await?)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> RepoResult<User> {
        let email = data.email.clone().unwrap_or_default();
        User::update(&self.pool, id, data)
            .await
            .map_err(|e| email_conflict(e, &email))?
            .ok_or_else(|| RepoError::user_not_found(id))
    }

    async fn email_exists(&self, email: &str) -> RepoResult<bool> {
        Ok(User::email_exists(&self.pool, email).await?)
    }
}

#[async_trait]
impl TaskRepository for PgStore {
    async fn create_task(&self, mut data: CreateTask) -> RepoResult<Task> {
        data.assignees = dedup_assignees(&data.assignees);

        let mut tx = self.pool.begin().await?;

        if User::find_by_uuid(&mut *tx, data.created_by_id).await?.is_none() {
            return Err(RepoError::user_not_found(data.created_by_id));
        }

        let mut assignee_keys = Vec::with_capacity(data.assignees.len());
        for uuid in &data.assignees {
            let user = User::find_by_uuid(&mut *tx, *uuid)
                .await?
                .ok_or_else(|| RepoError::user_not_found(*uuid))?;
            assignee_keys.push(user.id);
        }

        let task = Task::insert(&mut *tx, &data).await?;
        for user_key in assignee_keys {
            Task::add_assignment(&mut *tx, task.id, user_key).await?;
        }

        tx.commit().await?;

        debug!(task_id = %task.uuid, assignees = data.assignees.len(), "Task row committed");
        self.hydrate_one(task).await
    }

    async fn find_task(&self, id: Uuid) -> RepoResult<Option<Task>> {
        match Task::find_by_uuid(&self.pool, id).await? {
            Some(task) => self.hydrate_one(task).await.map(Some),
            None => Ok(None),
        }
    }

    async fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        let tasks = Task::list(&self.pool).await?;
        self.hydrate(tasks).await
    }

    async fn list_tasks_created_by(&self, user_id: Uuid) -> RepoResult<Vec<Task>> {
        let tasks = Task::list_created_by(&self.pool, user_id).await?;
        self.hydrate(tasks).await
    }

    async fn list_tasks_assigned_to(&self, user_id: Uuid) -> RepoResult<Vec<Task>> {
        let tasks = Task::list_assigned_to(&self.pool, user_id).await?;
        self.hydrate(tasks).await
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> RepoResult<Task> {
        let task = Task::update(&self.pool, id, data)
            .await?
            .ok_or_else(|| RepoError::task_not_found(id))?;
        self.hydrate_one(task).await
    }

    async fn complete_task(&self, id: Uuid) -> RepoResult<Task> {
        match Task::mark_completed(&self.pool, id).await? {
            Some(task) => self.hydrate_one(task).await,
            None => {
                // Nothing updated: either gone or already completed.
                if Task::find_by_uuid(&self.pool, id).await?.is_some() {
                    Err(RepoError::AlreadyCompleted(id))
                } else {
                    Err(RepoError::task_not_found(id))
                }
            }
        }
    }

    async fn delete_task(&self, id: Uuid) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        let task = Task::find_by_uuid_for_update(&mut *tx, id)
            .await?
            .ok_or_else(|| RepoError::task_not_found(id))?;

        let removed = Task::remove_assignments(&mut *tx, task.id).await?;
        Task::soft_delete(&mut *tx, task.id).await?;

        tx.commit().await?;

        debug!(task_id = %id, removed_assignments = removed, "Task soft-deleted");
        Ok(())
    }

    async fn add_user_to_task(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        make_primary: bool,
    ) -> RepoResult<Task> {
        let mut tx = self.pool.begin().await?;

        let task = Task::find_by_uuid_for_update(&mut *tx, task_id)
            .await?
            .ok_or_else(|| RepoError::task_not_found(task_id))?;
        let user = User::find_by_uuid(&mut *tx, user_id)
            .await?
            .ok_or_else(|| RepoError::user_not_found(user_id))?;

        if !Task::add_assignment(&mut *tx, task.id, user.id).await? {
            return Err(RepoError::AlreadyAssigned {
                task: task_id,
                user: user_id,
            });
        }

        if make_primary {
            Task::set_assigned_to(&mut *tx, task.id, Some(user.uuid)).await?;
        }

        tx.commit().await?;

        self.load_task(task_id).await
    }

    async fn set_primary_assignee(&self, task_id: Uuid, user_id: Uuid) -> RepoResult<Task> {
        let mut tx = self.pool.begin().await?;

        let task = Task::find_by_uuid_for_update(&mut *tx, task_id)
            .await?
            .ok_or_else(|| RepoError::task_not_found(task_id))?;
        let user = User::find_by_uuid(&mut *tx, user_id)
            .await?
            .ok_or_else(|| RepoError::user_not_found(user_id))?;

        if !Task::has_assignment(&mut *tx, task.id, user.id).await? {
            return Err(RepoError::NotAssigned {
                task: task_id,
                user: user_id,
            });
        }

        Task::set_assigned_to(&mut *tx, task.id, Some(user.uuid)).await?;

        tx.commit().await?;

        self.load_task(task_id).await
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn ping(&self) -> RepoResult<()> {
        pool::health_check(&self.pool).await?;
        Ok(())
    }
}

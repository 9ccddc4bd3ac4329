/// Persistence ports for users and tasks
///
/// Services talk to storage exclusively through the traits in this module.
/// Two implementations ship with the crate:
///
/// - [`postgres::PgStore`]: PostgreSQL via `sqlx`, every multi-row mutation in
///   one transaction
/// - [`memory::InMemoryStore`]: process-local store used by tests and local
///   runs, with the same atomicity guarantees
///
/// # Consistency contract
///
/// - Creating a task writes the task row, its assignment rows and the primary
///   pointer together. An unknown creator or assignee aborts the whole write.
/// - Duplicate ids in a creation request are collapsed, first occurrence wins
///   and becomes the primary assignee.
/// - Adding a user who is already assigned fails with
///   [`RepoError::AlreadyAssigned`] and changes nothing.
/// - The primary assignee is always a member of the assignment set.
/// - Completion is conditional on the stored flag; a second completion fails
///   with [`RepoError::AlreadyCompleted`].
/// - Soft-deleted rows are invisible to every read.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    task::{CreateTask, Task, UpdateTask},
    user::{CreateUser, UpdateUser, User},
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("email {0} is already registered")]
    DuplicateEmail(String),

    #[error("user {user} is already assigned to task {task}")]
    AlreadyAssigned { task: Uuid, user: Uuid },

    #[error("user {user} is not assigned to task {task}")]
    NotAssigned { task: Uuid, user: Uuid },

    #[error("task {0} is already completed")]
    AlreadyCompleted(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl RepoError {
    pub fn user_not_found(id: Uuid) -> Self {
        RepoError::NotFound { entity: "user", id }
    }

    pub fn task_not_found(id: Uuid) -> Self {
        RepoError::NotFound { entity: "task", id }
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

/// User persistence
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a user. Fails with `DuplicateEmail` if a live user already
    /// holds the email (case-insensitive).
    async fn create_user(&self, data: CreateUser) -> RepoResult<User>;

    async fn find_user(&self, id: Uuid) -> RepoResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    async fn list_users(&self) -> RepoResult<Vec<User>>;

    /// Updates name and/or email. Fails with `NotFound` or `DuplicateEmail`.
    async fn update_user(&self, id: Uuid, data: UpdateUser) -> RepoResult<User>;

    async fn email_exists(&self, email: &str) -> RepoResult<bool>;
}

/// Task and assignment persistence
///
/// Every returned [`Task`] has its creator, primary assignee and assignment
/// set resolved.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Creates a task together with its initial assignments
    async fn create_task(&self, data: CreateTask) -> RepoResult<Task>;

    async fn find_task(&self, id: Uuid) -> RepoResult<Option<Task>>;

    /// All live tasks, newest first
    async fn list_tasks(&self) -> RepoResult<Vec<Task>>;

    async fn list_tasks_created_by(&self, user_id: Uuid) -> RepoResult<Vec<Task>>;

    /// Tasks whose assignment set contains the user
    async fn list_tasks_assigned_to(&self, user_id: Uuid) -> RepoResult<Vec<Task>>;

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> RepoResult<Task>;

    /// Sets the completed flag. Fails with `AlreadyCompleted` if it was set.
    async fn complete_task(&self, id: Uuid) -> RepoResult<Task>;

    /// Soft-deletes the task and removes its assignment rows
    async fn delete_task(&self, id: Uuid) -> RepoResult<()>;

    /// Adds a user to the assignment set, optionally moving the primary
    /// pointer to them in the same write
    async fn add_user_to_task(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        make_primary: bool,
    ) -> RepoResult<Task>;

    /// Moves the primary pointer to a user already in the assignment set
    async fn set_primary_assignee(&self, task_id: Uuid, user_id: Uuid) -> RepoResult<Task>;
}

/// Liveness check for the backing store
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> RepoResult<()>;
}

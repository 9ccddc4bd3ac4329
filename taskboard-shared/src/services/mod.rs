/// Domain services
///
/// Services own the business rules and depend only on the repository ports
/// and the auth/notification traits, all injected at construction.
///
/// - [`users::UserService`]: registration, login, profiles
/// - [`tasks::TaskService`]: task lifecycle and the assignment workflow
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use taskboard_shared::auth::{jwt::JwtIssuer, password::{Argon2Hasher, HashParams}};
/// use taskboard_shared::notify::NoopNotifier;
/// use taskboard_shared::repository::InMemoryStore;
/// use taskboard_shared::services::{tasks::{NewTask, TaskService}, users::{NewUser, UserService}};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(InMemoryStore::new());
/// let users = UserService::new(
///     store.clone(),
///     Arc::new(Argon2Hasher::with_params(HashParams::light())),
///     Arc::new(JwtIssuer::new("a-secret-that-is-at-least-32-bytes!!")),
///     Arc::new(NoopNotifier),
/// );
/// let tasks = TaskService::new(store.clone(), store);
///
/// let alice = users.register(NewUser {
///     name: "Alice".into(),
///     email: "alice@example.com".into(),
///     password: "password123".into(),
/// }).await?;
///
/// let new_task = NewTask {
///     title: "Plan sprint".into(),
///     ..Default::default()
/// };
/// let task = tasks.create_task(new_task, alice.uuid).await?;
/// tasks.complete_task(task.uuid, alice.uuid).await?;
/// # Ok(())
/// # }
/// ```

pub mod tasks;
pub mod users;

pub use tasks::{NewTask, TaskService};
pub use users::{NewUser, UserService};

/// Database models for Taskboard
///
/// Each model carries its own SQL as associated functions generic over
/// `sqlx::PgExecutor`, so the same call works against the pool or inside a
/// transaction.
///
/// # Models
///
/// - [`user`]: user accounts and the compact [`user::UserSummary`]
/// - [`task`]: tasks, the completion state machine and the assignment relation

pub mod task;
pub mod user;

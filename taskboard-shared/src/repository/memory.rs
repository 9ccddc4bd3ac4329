/// In-memory store implementing every repository port
///
/// All state sits behind one `tokio::sync::RwLock`. Each mutation validates
/// everything it needs under the write guard before touching state, which
/// gives it the same all-or-nothing behaviour as the transactional store.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RepoError, RepoResult, StoreHealth, TaskRepository, UserRepository};
use crate::models::{
    task::{dedup_assignees, CreateTask, Task, UpdateTask},
    user::{CreateUser, UpdateUser, User, UserSummary},
};

/// Thread-safe in-memory store
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

#[derive(Debug, Default)]
struct State {
    next_user_id: i64,
    next_task_id: i64,
    users: BTreeMap<i64, User>,
    tasks: BTreeMap<i64, Task>,
    /// Assignment rows per task in insertion order
    assignments: HashMap<i64, Vec<i64>>,
}

impl InMemoryStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl State {
    fn live_user(&self, uuid: Uuid) -> Option<&User> {
        self.users
            .values()
            .find(|u| u.uuid == uuid && u.deleted_at.is_none())
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users.values().any(|u| {
            u.deleted_at.is_none()
                && u.email.eq_ignore_ascii_case(email)
                && Some(u.uuid) != except
        })
    }

    fn live_task_id(&self, uuid: Uuid) -> Option<i64> {
        self.tasks
            .values()
            .find(|t| t.uuid == uuid && t.deleted_at.is_none())
            .map(|t| t.id)
    }

    fn summary_by_uuid(&self, uuid: Uuid) -> Option<UserSummary> {
        self.users
            .values()
            .find(|u| u.uuid == uuid)
            .map(User::summary)
    }

    /// Clones a task row and resolves its relations
    fn hydrate(&self, task: &Task) -> Task {
        let mut task = task.clone();
        task.created_by = self.summary_by_uuid(task.created_by_id);
        task.assigned_to = task.assigned_to_id.and_then(|id| self.summary_by_uuid(id));
        task.users = self
            .assignments
            .get(&task.id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.users.get(id))
                    .map(User::summary)
                    .collect()
            })
            .unwrap_or_default();
        task
    }

    fn hydrated(&self, id: i64) -> RepoResult<Task> {
        let task = self.tasks.get(&id).ok_or_else(|| {
            RepoError::Database(sqlx::Error::Protocol(format!(
                "task row {id} vanished from the in-memory store"
            )))
        })?;
        Ok(self.hydrate(task))
    }

    /// Live tasks matching a predicate, newest first
    fn select_tasks<F>(&self, predicate: F) -> Vec<Task>
    where
        F: Fn(&Task) -> bool,
    {
        self.tasks
            .values()
            .rev()
            .filter(|t| t.deleted_at.is_none() && predicate(t))
            .map(|t| self.hydrate(t))
            .collect()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create_user(&self, data: CreateUser) -> RepoResult<User> {
        let mut state = self.state.write().await;

        if state.email_taken(&data.email, None) {
            return Err(RepoError::DuplicateEmail(data.email));
        }

        state.next_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: state.next_user_id,
            uuid: data.uuid,
            name: data.name,
            email: data.email,
            password_hash: data.password_hash,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.live_user(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.deleted_at.is_none() && u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .filter(|u| u.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> RepoResult<User> {
        let mut state = self.state.write().await;

        let key = state
            .live_user(id)
            .map(|u| u.id)
            .ok_or_else(|| RepoError::user_not_found(id))?;

        if let Some(email) = &data.email {
            if state.email_taken(email, Some(id)) {
                return Err(RepoError::DuplicateEmail(email.clone()));
            }
        }

        let user = state
            .users
            .get_mut(&key)
            .ok_or_else(|| RepoError::user_not_found(id))?;
        if let Some(name) = data.name {
            user.name = name;
        }
        if let Some(email) = data.email {
            user.email = email;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn email_exists(&self, email: &str) -> RepoResult<bool> {
        let state = self.state.read().await;
        Ok(state.email_taken(email, None))
    }
}

#[async_trait]
impl TaskRepository for InMemoryStore {
    async fn create_task(&self, data: CreateTask) -> RepoResult<Task> {
        let mut state = self.state.write().await;

        if state.live_user(data.created_by_id).is_none() {
            return Err(RepoError::user_not_found(data.created_by_id));
        }

        let assignees = dedup_assignees(&data.assignees);
        let mut assignee_keys = Vec::with_capacity(assignees.len());
        for uuid in &assignees {
            let user = state
                .live_user(*uuid)
                .ok_or_else(|| RepoError::user_not_found(*uuid))?;
            assignee_keys.push(user.id);
        }

        state.next_task_id += 1;
        let now = Utc::now();
        let task = Task {
            id: state.next_task_id,
            uuid: data.uuid,
            title: data.title,
            description: data.description,
            completed: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            created_by_id: data.created_by_id,
            assigned_to_id: assignees.first().copied(),
            created_by: None,
            assigned_to: None,
            users: Vec::new(),
        };
        let id = task.id;
        state.tasks.insert(id, task);
        state.assignments.insert(id, assignee_keys);

        state.hydrated(id)
    }

    async fn find_task(&self, id: Uuid) -> RepoResult<Option<Task>> {
        let state = self.state.read().await;
        match state.live_task_id(id) {
            Some(key) => state.hydrated(key).map(Some),
            None => Ok(None),
        }
    }

    async fn list_tasks(&self) -> RepoResult<Vec<Task>> {
        let state = self.state.read().await;
        Ok(state.select_tasks(|_| true))
    }

    async fn list_tasks_created_by(&self, user_id: Uuid) -> RepoResult<Vec<Task>> {
        let state = self.state.read().await;
        Ok(state.select_tasks(|t| t.created_by_id == user_id))
    }

    async fn list_tasks_assigned_to(&self, user_id: Uuid) -> RepoResult<Vec<Task>> {
        let state = self.state.read().await;
        let Some(user_key) = state.users.values().find(|u| u.uuid == user_id).map(|u| u.id)
        else {
            return Ok(Vec::new());
        };
        Ok(state.select_tasks(|t| {
            state
                .assignments
                .get(&t.id)
                .is_some_and(|ids| ids.contains(&user_key))
        }))
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> RepoResult<Task> {
        let mut state = self.state.write().await;
        let key = state
            .live_task_id(id)
            .ok_or_else(|| RepoError::task_not_found(id))?;

        if let Some(task) = state.tasks.get_mut(&key) {
            if let Some(title) = data.title {
                task.title = title;
            }
            if let Some(description) = data.description {
                task.description = description;
            }
            task.updated_at = Utc::now();
        }

        state.hydrated(key)
    }

    async fn complete_task(&self, id: Uuid) -> RepoResult<Task> {
        let mut state = self.state.write().await;
        let key = state
            .live_task_id(id)
            .ok_or_else(|| RepoError::task_not_found(id))?;

        if let Some(task) = state.tasks.get_mut(&key) {
            if task.completed {
                return Err(RepoError::AlreadyCompleted(id));
            }
            task.completed = true;
            task.updated_at = Utc::now();
        }

        state.hydrated(key)
    }

    async fn delete_task(&self, id: Uuid) -> RepoResult<()> {
        let mut state = self.state.write().await;
        let key = state
            .live_task_id(id)
            .ok_or_else(|| RepoError::task_not_found(id))?;

        if let Some(task) = state.tasks.get_mut(&key) {
            let now = Utc::now();
            task.deleted_at = Some(now);
            task.updated_at = now;
            task.assigned_to_id = None;
        }
        state.assignments.remove(&key);
        Ok(())
    }

    async fn add_user_to_task(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        make_primary: bool,
    ) -> RepoResult<Task> {
        let mut state = self.state.write().await;
        let key = state
            .live_task_id(task_id)
            .ok_or_else(|| RepoError::task_not_found(task_id))?;
        let user_key = state
            .live_user(user_id)
            .map(|u| u.id)
            .ok_or_else(|| RepoError::user_not_found(user_id))?;

        let assigned = state.assignments.entry(key).or_default();
        if assigned.contains(&user_key) {
            return Err(RepoError::AlreadyAssigned {
                task: task_id,
                user: user_id,
            });
        }
        assigned.push(user_key);

        if make_primary {
            if let Some(task) = state.tasks.get_mut(&key) {
                task.assigned_to_id = Some(user_id);
                task.updated_at = Utc::now();
            }
        }

        state.hydrated(key)
    }

    async fn set_primary_assignee(&self, task_id: Uuid, user_id: Uuid) -> RepoResult<Task> {
        let mut state = self.state.write().await;
        let key = state
            .live_task_id(task_id)
            .ok_or_else(|| RepoError::task_not_found(task_id))?;
        let user_key = state
            .live_user(user_id)
            .map(|u| u.id)
            .ok_or_else(|| RepoError::user_not_found(user_id))?;

        let is_member = state
            .assignments
            .get(&key)
            .is_some_and(|ids| ids.contains(&user_key));
        if !is_member {
            return Err(RepoError::NotAssigned {
                task: task_id,
                user: user_id,
            });
        }

        if let Some(task) = state.tasks.get_mut(&key) {
            task.assigned_to_id = Some(user_id);
            task.updated_at = Utc::now();
        }

        state.hydrated(key)
    }
}

#[async_trait]
impl StoreHealth for InMemoryStore {
    async fn ping(&self) -> RepoResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed_user(store: &InMemoryStore, name: &str) -> User {
        store
            .create_user(CreateUser {
                uuid: Uuid::new_v4(),
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                password_hash: "hash".to_string(),
            })
            .await
            .expect("seed user")
    }

    fn new_task(creator: Uuid, assignees: Vec<Uuid>) -> CreateTask {
        CreateTask {
            uuid: Uuid::new_v4(),
            title: "Task".to_string(),
            description: None,
            created_by_id: creator,
            assignees,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_case_insensitive() {
        let store = InMemoryStore::new();
        seed_user(&store, "Alice").await;

        let err = store
            .create_user(CreateUser {
                uuid: Uuid::new_v4(),
                name: "Other".to_string(),
                email: "ALICE@example.com".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .expect_err("duplicate email");
        assert!(matches!(err, RepoError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn test_create_task_with_unknown_assignee_writes_nothing() {
        let store = InMemoryStore::new();
        let alice = seed_user(&store, "Alice").await;

        let err = store
            .create_task(new_task(alice.uuid, vec![Uuid::new_v4()]))
            .await
            .expect_err("unknown assignee");
        assert!(matches!(err, RepoError::NotFound { entity: "user", .. }));
        assert!(store.list_tasks().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_create_task_collapses_duplicates() {
        let store = InMemoryStore::new();
        let alice = seed_user(&store, "Alice").await;
        let bob = seed_user(&store, "Bob").await;

        let task = store
            .create_task(new_task(alice.uuid, vec![bob.uuid, bob.uuid]))
            .await
            .expect("create");
        assert_eq!(task.users.len(), 1);
        assert_eq!(task.assigned_to_id, Some(bob.uuid));
        assert_eq!(task.created_by.map(|u| u.id), Some(alice.uuid));
    }

    #[tokio::test]
    async fn test_add_user_twice_conflicts() {
        let store = InMemoryStore::new();
        let alice = seed_user(&store, "Alice").await;
        let bob = seed_user(&store, "Bob").await;
        let task = store
            .create_task(new_task(alice.uuid, vec![]))
            .await
            .expect("create");

        store
            .add_user_to_task(task.uuid, bob.uuid, true)
            .await
            .expect("first assignment");
        let err = store
            .add_user_to_task(task.uuid, bob.uuid, true)
            .await
            .expect_err("second assignment");
        assert!(matches!(err, RepoError::AlreadyAssigned { .. }));

        let task = store.find_task(task.uuid).await.expect("find").expect("exists");
        assert_eq!(task.users.len(), 1);
    }

    #[tokio::test]
    async fn test_set_primary_requires_membership() {
        let store = InMemoryStore::new();
        let alice = seed_user(&store, "Alice").await;
        let bob = seed_user(&store, "Bob").await;
        let task = store
            .create_task(new_task(alice.uuid, vec![]))
            .await
            .expect("create");

        let err = store
            .set_primary_assignee(task.uuid, bob.uuid)
            .await
            .expect_err("not assigned");
        assert!(matches!(err, RepoError::NotAssigned { .. }));
    }

    #[tokio::test]
    async fn test_complete_twice_fails() {
        let store = InMemoryStore::new();
        let alice = seed_user(&store, "Alice").await;
        let task = store
            .create_task(new_task(alice.uuid, vec![]))
            .await
            .expect("create");

        assert!(store.complete_task(task.uuid).await.expect("complete").completed);
        let err = store.complete_task(task.uuid).await.expect_err("twice");
        assert!(matches!(err, RepoError::AlreadyCompleted(_)));
    }

    #[tokio::test]
    async fn test_deleted_task_is_invisible() {
        let store = InMemoryStore::new();
        let alice = seed_user(&store, "Alice").await;
        let bob = seed_user(&store, "Bob").await;
        let task = store
            .create_task(new_task(alice.uuid, vec![bob.uuid]))
            .await
            .expect("create");

        store.delete_task(task.uuid).await.expect("delete");

        assert!(store.find_task(task.uuid).await.expect("find").is_none());
        assert!(store
            .list_tasks_assigned_to(bob.uuid)
            .await
            .expect("assigned")
            .is_empty());
        assert!(matches!(
            store.delete_task(task.uuid).await,
            Err(RepoError::NotFound { entity: "task", .. })
        ));
    }

    #[tokio::test]
    async fn test_lists_are_newest_first() {
        let store = InMemoryStore::new();
        let alice = seed_user(&store, "Alice").await;
        let first = store
            .create_task(new_task(alice.uuid, vec![]))
            .await
            .expect("first");
        let second = store
            .create_task(new_task(alice.uuid, vec![]))
            .await
            .expect("second");

        let ids: Vec<Uuid> = store
            .list_tasks_created_by(alice.uuid)
            .await
            .expect("list")
            .into_iter()
            .map(|t| t.uuid)
            .collect();
        assert_eq!(ids, vec![second.uuid, first.uuid]);
    }
}

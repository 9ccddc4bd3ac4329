use std::sync::Arc;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::auth::authorization::{authorize, TaskAction};
use crate::error::{DomainError, DomainResult};
use crate::models::task::{dedup_assignees, CreateTask, Task, TaskStatus, UpdateTask};
use crate::repository::{TaskRepository, UserRepository};

pub const MAX_TITLE_LEN: usize = 255;

/// Task creation input
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,

    /// Initial assignees. Repeats are dropped; the first becomes primary.
    pub assignees: Vec<Uuid>,
}

/// Task lifecycle and assignment workflow
///
/// Every mutating call loads the task first, checks the requestor against
/// that fresh state, then applies the change through the repository.
#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
    users: Arc<dyn UserRepository>,
}

fn normalize_title(title: &str) -> DomainResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DomainError::invalid_input("title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(DomainError::invalid_input(format!(
            "title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { tasks, users }
    }

    async fn load(&self, id: Uuid) -> DomainResult<Task> {
        self.tasks
            .find_task(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("task {} not found", id)))
    }

    async fn require_user(&self, id: Uuid) -> DomainResult<()> {
        match self.users.find_user(id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::NotFound(format!("user {} not found", id))),
        }
    }

    /// Creates a task owned by `creator`
    ///
    /// The task and its initial assignments are written atomically; an
    /// unknown assignee fails the whole call with `NotFound`.
    #[instrument(
        name = "taskboard.tasks.create",
        skip(self, input),
        fields(creator = %creator, assignees = input.assignees.len())
    )]
    pub async fn create_task(&self, input: NewTask, creator: Uuid) -> DomainResult<Task> {
        let title = normalize_title(&input.title)?;

        let task = self
            .tasks
            .create_task(CreateTask {
                uuid: Uuid::new_v4(),
                title,
                description: normalize_description(input.description),
                created_by_id: creator,
                assignees: dedup_assignees(&input.assignees),
            })
            .await?;

        info!(task_id = %task.uuid, "Task created");
        Ok(task)
    }

    #[instrument(name = "taskboard.tasks.get", skip(self))]
    pub async fn get_task(&self, id: Uuid) -> DomainResult<Task> {
        self.load(id).await
    }

    pub async fn list_tasks(&self) -> DomainResult<Vec<Task>> {
        Ok(self.tasks.list_tasks().await?)
    }

    pub async fn list_created_by(&self, user_id: Uuid) -> DomainResult<Vec<Task>> {
        Ok(self.tasks.list_tasks_created_by(user_id).await?)
    }

    /// Tasks whose assignment set contains the user
    pub async fn list_assigned_to(&self, user_id: Uuid) -> DomainResult<Vec<Task>> {
        Ok(self.tasks.list_tasks_assigned_to(user_id).await?)
    }

    /// Adds `assignee` to the task and makes them the primary assignee
    ///
    /// Creator only. Assigning someone twice is a `Conflict`.
    #[instrument(name = "taskboard.tasks.assign", skip(self))]
    pub async fn assign_task(
        &self,
        task_id: Uuid,
        assignee: Uuid,
        requestor: Uuid,
    ) -> DomainResult<Task> {
        let task = self.load(task_id).await?;
        authorize(&task, requestor, TaskAction::Assign)?;
        self.require_user(assignee).await?;

        let task = self.tasks.add_user_to_task(task_id, assignee, true).await?;

        info!(task_id = %task_id, assignee = %assignee, "Task assigned");
        Ok(task)
    }

    /// Marks the task completed
    ///
    /// Allowed for the creator and any assignee. Completion is one-way; a
    /// second call is a `Conflict`.
    #[instrument(name = "taskboard.tasks.complete", skip(self))]
    pub async fn complete_task(&self, task_id: Uuid, requestor: Uuid) -> DomainResult<Task> {
        let task = self.load(task_id).await?;
        authorize(&task, requestor, TaskAction::Complete)?;

        if !task.status().can_transition_to(TaskStatus::Completed) {
            return Err(DomainError::Conflict(format!(
                "task {} is already completed",
                task_id
            )));
        }

        // The store re-checks the flag, so a racing completion still conflicts.
        let task = self.tasks.complete_task(task_id).await?;

        info!(task_id = %task_id, "Task completed");
        Ok(task)
    }

    /// Soft-deletes the task. Creator only.
    #[instrument(name = "taskboard.tasks.delete", skip(self))]
    pub async fn delete_task(&self, task_id: Uuid, requestor: Uuid) -> DomainResult<()> {
        let task = self.load(task_id).await?;
        authorize(&task, requestor, TaskAction::Delete)?;

        self.tasks.delete_task(task_id).await?;

        info!(task_id = %task_id, "Task deleted");
        Ok(())
    }

    /// Changes title and/or description. Creator only.
    #[instrument(name = "taskboard.tasks.update", skip(self, patch))]
    pub async fn update_task(
        &self,
        task_id: Uuid,
        patch: UpdateTask,
        requestor: Uuid,
    ) -> DomainResult<Task> {
        if patch.is_empty() {
            return Err(DomainError::invalid_input("nothing to update"));
        }

        let patch = UpdateTask {
            title: patch.title.as_deref().map(normalize_title).transpose()?,
            description: patch.description.map(normalize_description),
        };

        let task = self.load(task_id).await?;
        authorize(&task, requestor, TaskAction::Update)?;

        let task = self.tasks.update_task(task_id, patch).await?;
        debug!(task_id = %task_id, "Task updated");
        Ok(task)
    }

    /// Moves the primary-assignee pointer to a user who is already assigned
    ///
    /// Creator only. A user outside the assignment set is `InvalidInput`.
    #[instrument(name = "taskboard.tasks.set_primary", skip(self))]
    pub async fn set_primary_assignee(
        &self,
        task_id: Uuid,
        user_id: Uuid,
        requestor: Uuid,
    ) -> DomainResult<Task> {
        let task = self.load(task_id).await?;
        authorize(&task, requestor, TaskAction::SetPrimary)?;
        self.require_user(user_id).await?;

        let task = self.tasks.set_primary_assignee(task_id, user_id).await?;

        info!(task_id = %task_id, assignee = %user_id, "Primary assignee changed");
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  Fix bug ").expect("valid"), "Fix bug");
        assert!(normalize_title("").is_err());
        assert!(normalize_title(" \t\n").is_err());
        assert!(normalize_title(&"x".repeat(MAX_TITLE_LEN + 1)).is_err());
        assert!(normalize_title(&"x".repeat(MAX_TITLE_LEN)).is_ok());
    }

    #[test]
    fn test_normalize_description() {
        assert_eq!(normalize_description(None), None);
        assert_eq!(normalize_description(Some("   ".to_string())), None);
        assert_eq!(
            normalize_description(Some(" details ".to_string())),
            Some("details".to_string())
        );
    }
}

/// Task authorization rules
///
/// Every check runs against task state that was loaded for the current
/// request, never against a cached copy.
///
/// | Action | Allowed for |
/// |---|---|
/// | `Assign`, `SetPrimary`, `Update`, `Delete` | the task's creator |
/// | `Complete` | the creator or any assigned user |
/// | `View` | any authenticated user |
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::auth::authorization::{authorize, TaskAction};
/// # use taskboard_shared::models::task::Task;
/// # fn example(task: &Task, requestor: uuid::Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// authorize(task, requestor, TaskAction::Complete)?;
/// # Ok(())
/// # }
/// ```

use uuid::Uuid;

use crate::models::task::Task;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthzError {
    #[error("Only the creator of task {task} may {action}")]
    NotCreator { task: Uuid, action: TaskAction },

    #[error("Only the creator or an assignee of task {task} may {action}")]
    NotParticipant { task: Uuid, action: TaskAction },

    #[error("Users may only modify their own profile")]
    NotOwner,
}

/// Operations guarded by [`authorize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    View,
    Update,
    Assign,
    SetPrimary,
    Complete,
    Delete,
}

impl TaskAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskAction::View => "view it",
            TaskAction::Update => "update it",
            TaskAction::Assign => "assign it",
            TaskAction::SetPrimary => "change its primary assignee",
            TaskAction::Complete => "complete it",
            TaskAction::Delete => "delete it",
        }
    }
}

impl std::fmt::Display for TaskAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks whether `requestor` may perform `action` on `task`
pub fn authorize(task: &Task, requestor: Uuid, action: TaskAction) -> Result<(), AuthzError> {
    match action {
        TaskAction::View => Ok(()),
        TaskAction::Complete => {
            if task.is_participant(requestor) {
                Ok(())
            } else {
                Err(AuthzError::NotParticipant {
                    task: task.uuid,
                    action,
                })
            }
        }
        TaskAction::Update | TaskAction::Assign | TaskAction::SetPrimary | TaskAction::Delete => {
            if task.is_creator(requestor) {
                Ok(())
            } else {
                Err(AuthzError::NotCreator {
                    task: task.uuid,
                    action,
                })
            }
        }
    }
}

/// Checks that a caller is acting on their own user record
pub fn require_ownership(requestor: Uuid, owner: Uuid) -> Result<(), AuthzError> {
    if requestor == owner {
        Ok(())
    } else {
        Err(AuthzError::NotOwner)
    }
}

//! Scheduler data models.

use crate::prelude::*;

mod task_status;

pub use self::task_status::*;

/// Possible task states. These are ordered: a task only ever moves forward
/// through this list.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// The task has been accepted, but has not started.
    Pending,
    /// The task is currently running.
    Running,
    /// The task finished successfully.
    Completed,
    /// The task finished with an error.
    Failed,
}

impl TaskState {
    /// Has this task stopped running, either successfully or not?
    pub fn has_finished(self) -> bool {
        match self {
            TaskState::Pending | TaskState::Running => false,
            TaskState::Completed | TaskState::Failed => true,
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
        };
        s.fmt(f)
    }
}

#[test]
fn only_completed_and_failed_have_finished() {
    assert!(!TaskState::Pending.has_finished());
    assert!(!TaskState::Running.has_finished());
    assert!(TaskState::Completed.has_finished());
    assert!(TaskState::Failed.has_finished());
}

#[test]
fn states_are_ordered_by_progress() {
    assert!(TaskState::Pending < TaskState::Running);
    assert!(TaskState::Running < TaskState::Completed);
    assert!(TaskState::Completed < TaskState::Failed);
    assert_eq!(TaskState::Failed.to_string(), "failed");
}

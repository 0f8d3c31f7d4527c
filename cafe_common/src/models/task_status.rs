use crate::prelude::*;

/// The status of a task on the scheduler, as returned by the REST API.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    /// The unique ID of this task.
    pub id: Uuid,
    /// A human-readable name for this task.
    pub name: String,
    /// The current state of this task.
    pub state: TaskState,
    /// When this task started running.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// When this task finished.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// If this task failed, a description of what went wrong.
    #[serde(default)]
    pub failure_message: Option<String>,
}

impl TaskStatus {
    /// Create a new, pending task status with a fresh ID.
    pub fn new<S: Into<String>>(name: S) -> TaskStatus {
        TaskStatus {
            id: Uuid::new_v4(),
            name: name.into(),
            state: TaskState::Pending,
            started_at: None,
            completed_at: None,
            failure_message: None,
        }
    }

    /// Has this task stopped running?
    pub fn has_finished(&self) -> bool {
        self.state.has_finished()
    }

    /// Move this task to `state`. Tasks never go backwards, and a finished
    /// task never changes state again.
    pub fn advance_to(&mut self, state: TaskState) -> Result<()> {
        if state == self.state {
            return Ok(());
        }
        if state < self.state || self.state.has_finished() {
            return Err(format_err!(
                "task {} cannot go from {} to {}",
                self.id,
                self.state,
                state,
            ));
        }
        self.state = state;
        Ok(())
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.id, self.state)?;
        if let Some(msg) = &self.failure_message {
            write!(f, " ({})", msg)?;
        }
        Ok(())
    }
}

#[test]
fn advance_to_only_moves_forward() {
    let mut status = TaskStatus::new("chef run");
    status.advance_to(TaskState::Running).unwrap();
    status.advance_to(TaskState::Running).unwrap();
    assert!(status.advance_to(TaskState::Pending).is_err());
    status.advance_to(TaskState::Completed).unwrap();
    assert!(status.advance_to(TaskState::Failed).is_err());
    assert_eq!(status.state, TaskState::Completed);
}

#[test]
fn parse_task_status_json() {
    let json = r#"
{
  "id": "6b1f0f6e-4c0c-4a3e-9d2f-1f6a4e7c9b10",
  "name": "install chef",
  "state": "failed",
  "startedAt": "2018-05-01T12:00:00Z",
  "failureMessage": "download failed"
}"#;
    let status: TaskStatus = serde_json::from_str(json).expect("parse error");
    assert_eq!(status.name, "install chef");
    assert_eq!(status.state, TaskState::Failed);
    assert!(status.started_at.is_some());
    assert!(status.completed_at.is_none());
    assert_eq!(status.failure_message.as_deref(), Some("download failed"));
    assert!(status.has_finished());
}

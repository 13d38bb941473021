use serde::{Deserialize, Serialize};

use super::TaskStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Subtask {
    pub id: i64,
    pub task_id: i64,
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Subtask {
    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    /// Status a checkbox toggle should move to.
    pub fn toggled_status(&self) -> TaskStatus {
        if self.is_done() {
            TaskStatus::Todo
        } else {
            TaskStatus::Done
        }
    }
}

/// Body for `POST /subtasks`.
#[derive(Debug, Clone, Serialize)]
pub struct NewSubtask {
    pub task_id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

/// Body for `PATCH /subtasks/:id`. `task_id` moves the subtask to another task.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubtaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_subtask() {
        let mut sub = Subtask {
            id: 1,
            task_id: 2,
            title: "write tests".to_string(),
            status: TaskStatus::Todo,
            created_at: None,
        };
        assert_eq!(sub.toggled_status(), TaskStatus::Done);
        sub.status = TaskStatus::Done;
        assert_eq!(sub.toggled_status(), TaskStatus::Todo);
    }

    #[test]
    fn test_patch_omits_absent_fields() {
        let patch = SubtaskPatch {
            status: Some(TaskStatus::Done),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"status": "done"}));
    }
}

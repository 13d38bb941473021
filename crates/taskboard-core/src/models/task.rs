use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Subtask;

/// Largest page size the backend accepts.
pub const MAX_PER_PAGE: u32 = 100;

/// Page size used when none is configured.
pub const DEFAULT_PER_PAGE: u32 = 10;

/// Workflow state shared by tasks and subtasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    /// Wire value, as used in query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }

    /// Cycle todo -> in progress -> done -> todo.
    pub fn next(&self) -> Self {
        match self {
            TaskStatus::Todo => TaskStatus::InProgress,
            TaskStatus::InProgress => TaskStatus::Done,
            TaskStatus::Done => TaskStatus::Todo,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Todo => write!(f, "To Do"),
            TaskStatus::InProgress => write!(f, "In Progress"),
            TaskStatus::Done => write!(f, "Done"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    /// Accepts the wire value or the display label, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', '-'], " ").as_str() {
            "todo" | "to do" => Ok(TaskStatus::Todo),
            "in progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(format!("Unknown status '{}' (todo, in_progress, done)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn next(&self) -> Self {
        match self {
            Priority::Low => Priority::Normal,
            Priority::Normal => Priority::High,
            Priority::High => Priority::Low,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Normal => write!(f, "normal"),
            Priority::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            other => Err(format!("Unknown priority '{}' (low, normal, high)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Task {
    pub fn due_display(&self) -> String {
        self.due_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

/// A single task as returned by `GET /tasks/:id`, with its subtasks inlined.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

/// Body for `POST /tasks`.
#[derive(Debug, Clone, Serialize)]
pub struct NewTask {
    pub project_id: i64,
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub status: TaskStatus,
}

/// Body for `PATCH /tasks/:id`.
///
/// `due_date: Some(None)` serializes as `null` and clears the date;
/// `None` leaves it untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Status filter for task listings. `All` sends no status parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(TaskStatus),
}

impl StatusFilter {
    pub fn next(&self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Only(TaskStatus::Todo),
            StatusFilter::Only(TaskStatus::Todo) => StatusFilter::Only(TaskStatus::InProgress),
            StatusFilter::Only(TaskStatus::InProgress) => StatusFilter::Only(TaskStatus::Done),
            StatusFilter::Only(TaskStatus::Done) => StatusFilter::All,
        }
    }

    pub fn label(&self) -> String {
        match self {
            StatusFilter::All => "All".to_string(),
            StatusFilter::Only(status) => status.to_string(),
        }
    }
}

/// Sortable task columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    DueDate,
    Priority,
    Title,
    Status,
    CreatedAt,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::DueDate => "due_date",
            SortField::Priority => "priority",
            SortField::Title => "title",
            SortField::Status => "status",
            SortField::CreatedAt => "created_at",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            SortField::DueDate => SortField::Priority,
            SortField::Priority => SortField::Title,
            SortField::Title => SortField::Status,
            SortField::Status => SortField::CreatedAt,
            SortField::CreatedAt => SortField::DueDate,
        }
    }
}

/// A sort key such as `due_date` or `-priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskSort {
    pub field: SortField,
    pub descending: bool,
}

impl TaskSort {
    pub fn to_param(&self) -> String {
        if self.descending {
            format!("-{}", self.field.as_str())
        } else {
            self.field.as_str().to_string()
        }
    }
}

/// Parameters for `GET /tasks`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskQuery {
    pub project_id: Option<i64>,
    pub page: u32,
    pub per_page: u32,
    pub status: StatusFilter,
    pub sort: TaskSort,
    pub search: Option<String>,
    pub due_before: Option<NaiveDate>,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            project_id: None,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            status: StatusFilter::All,
            sort: TaskSort::default(),
            search: None,
            due_before: None,
        }
    }
}

impl TaskQuery {
    pub fn for_project(project_id: i64, per_page: u32) -> Self {
        Self {
            project_id: Some(project_id),
            per_page,
            ..Default::default()
        }
    }

    /// Query string pairs, with page and page size clamped to what the
    /// backend accepts.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(project_id) = self.project_id {
            pairs.push(("project_id", project_id.to_string()));
        }
        pairs.push(("page", self.page.max(1).to_string()));
        pairs.push(("per_page", clamp_per_page(self.per_page).to_string()));
        if let StatusFilter::Only(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        pairs.push(("sort", self.sort.to_param()));
        if let Some(ref search) = self.search {
            let trimmed = search.trim();
            if !trimmed.is_empty() {
                pairs.push(("q", trimmed.to_string()));
            }
        }
        if let Some(due_before) = self.due_before {
            pairs.push(("due_before", due_before.format("%Y-%m-%d").to_string()));
        }
        pairs
    }
}

/// Clamp a page size into 1..=MAX_PER_PAGE
pub fn clamp_per_page(per_page: u32) -> u32 {
    per_page.clamp(1, MAX_PER_PAGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair<'a>(pairs: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(serde_json::to_string(&TaskStatus::InProgress).unwrap(), "\"in_progress\"");
        let status: TaskStatus = serde_json::from_str("\"done\"").unwrap();
        assert_eq!(status, TaskStatus::Done);
        assert_eq!(TaskStatus::InProgress.as_str(), "in_progress");
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("in_progress".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert_eq!("In Progress".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert_eq!(" To Do ".parse::<TaskStatus>(), Ok(TaskStatus::Todo));
        assert_eq!("DONE".parse::<TaskStatus>(), Ok(TaskStatus::Done));
        assert!("blocked".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_priority_from_str() {
        assert_eq!("High".parse::<Priority>(), Ok(Priority::High));
        assert_eq!("low".parse::<Priority>(), Ok(Priority::Low));
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_status_cycle_wraps() {
        let mut status = TaskStatus::Todo;
        for _ in 0..3 {
            status = status.next();
        }
        assert_eq!(status, TaskStatus::Todo);
    }

    #[test]
    fn test_parse_task() {
        let json = r#"{
            "id": 4, "project_id": 2, "title": "Ship it", "status": "in_progress",
            "priority": "high", "due_date": "2024-03-01", "created_at": "2024-02-01T10:00:00"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(task.due_display(), "2024-03-01");
    }

    #[test]
    fn test_parse_task_without_due_date() {
        let json = r#"{"id": 4, "project_id": 2, "title": "Someday", "due_date": null}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.due_date, None);
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, Priority::Normal);
        assert_eq!(task.due_display(), "-");
    }

    #[test]
    fn test_parse_task_detail_with_subtasks() {
        let json = r#"{
            "id": 4, "project_id": 2, "title": "Ship it", "status": "todo",
            "subtasks": [{"id": 9, "task_id": 4, "title": "Tag release", "status": "done"}]
        }"#;
        let detail: TaskDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.task.id, 4);
        assert_eq!(detail.subtasks.len(), 1);
        assert!(detail.subtasks[0].is_done());
    }

    #[test]
    fn test_patch_can_clear_due_date() {
        let patch = TaskPatch {
            due_date: Some(None),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"due_date": null}));

        let untouched = serde_json::to_value(TaskPatch::status(TaskStatus::Done)).unwrap();
        assert_eq!(untouched, serde_json::json!({"status": "done"}));
    }

    #[test]
    fn test_query_omits_status_for_all() {
        let query = TaskQuery::for_project(3, 10);
        let pairs = query.to_query_pairs();
        assert_eq!(pair(&pairs, "project_id"), Some("3"));
        assert_eq!(pair(&pairs, "status"), None);
        assert_eq!(pair(&pairs, "sort"), Some("due_date"));
    }

    #[test]
    fn test_query_clamps_paging() {
        let query = TaskQuery {
            page: 0,
            per_page: 500,
            ..Default::default()
        };
        let pairs = query.to_query_pairs();
        assert_eq!(pair(&pairs, "page"), Some("1"));
        assert_eq!(pair(&pairs, "per_page"), Some("100"));
        assert_eq!(clamp_per_page(0), 1);
    }

    #[test]
    fn test_query_filters_and_descending_sort() {
        let query = TaskQuery {
            status: StatusFilter::Only(TaskStatus::InProgress),
            sort: TaskSort {
                field: SortField::Priority,
                descending: true,
            },
            search: Some("  deploy ".to_string()),
            due_before: NaiveDate::from_ymd_opt(2024, 12, 31),
            ..Default::default()
        };
        let pairs = query.to_query_pairs();
        assert_eq!(pair(&pairs, "status"), Some("in_progress"));
        assert_eq!(pair(&pairs, "sort"), Some("-priority"));
        assert_eq!(pair(&pairs, "q"), Some("deploy"));
        assert_eq!(pair(&pairs, "due_before"), Some("2024-12-31"));
    }

    #[test]
    fn test_status_filter_cycle() {
        let mut filter = StatusFilter::All;
        let mut labels = Vec::new();
        for _ in 0..4 {
            labels.push(filter.label());
            filter = filter.next();
        }
        assert_eq!(labels, vec!["All", "To Do", "In Progress", "Done"]);
        assert_eq!(filter, StatusFilter::All);
    }
}

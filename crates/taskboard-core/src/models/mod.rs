//! Data models for taskboard entities.
//!
//! This module contains the records exchanged with the taskboard backend:
//!
//! - `User`, `SessionCheck`: identity and the "who am I" response
//! - `Project`: top-level containers owned by a user
//! - `Task`, `TaskStatus`, `Priority`, `TaskQuery`: tasks and list filters
//! - `Subtask`: checklist items nested under a task
//! - `Page`, `PageMeta`: paginated list envelopes

pub mod page;
pub mod project;
pub mod subtask;
pub mod task;
pub mod user;

pub use page::{Deleted, Page, PageMeta};
pub use project::{NewProject, Project, ProjectPatch};
pub use subtask::{NewSubtask, Subtask, SubtaskPatch};
pub use task::{
    NewTask, Priority, SortField, StatusFilter, Task, TaskDetail, TaskPatch, TaskQuery, TaskSort,
    TaskStatus,
};
pub use user::{AuthResponse, SessionCheck, User};

//! Application state management for the taskboard terminal client.
//!
//! `App` owns the UI state and the identity-scoped data (projects, tasks,
//! subtasks). Identity itself lives in the shared `SessionStore`; the app
//! only reads snapshots from it and asks it to run operations.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use taskboard_core::models::{
    NewProject, NewSubtask, NewTask, Page, Priority, Project, ProjectPatch, SortField, StatusFilter,
    Subtask, SubtaskPatch, Task, TaskDetail, TaskPatch, TaskQuery, TaskStatus,
};
use taskboard_core::{ApiClient, Config, GuardDecision, Route, RouteGuard, Session, SessionStore};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Maximum length for free-text form fields.
const MAX_FIELD_LENGTH: usize = 200;

/// Maximum length for email and username input.
const MAX_IDENTIFIER_LENGTH: usize = 254;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum concurrent subtask requests when preloading a task page.
const MAX_CONCURRENT_REQUESTS: usize = 4;

pub type Store = SessionStore<ApiClient>;

// ============================================================================
// UI State Types
// ============================================================================

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    EditingForm,
    ConfirmingDelete,
    ConfirmingQuit,
    Quitting,
}

/// Which panel of the project view has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// Task list
    List,
    /// Subtasks of the selected task
    Detail,
}

/// Login/signup form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    Username,
    Email,
    Password,
    Button,
}

#[derive(Debug, Clone, Default)]
pub struct AuthForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub focus: Option<AuthField>,
    pub submitting: bool,
}

impl AuthForm {
    /// Fields shown for the given mode, in tab order.
    pub fn fields(signup: bool) -> &'static [AuthField] {
        if signup {
            &[AuthField::Username, AuthField::Email, AuthField::Password, AuthField::Button]
        } else {
            &[AuthField::Email, AuthField::Password, AuthField::Button]
        }
    }

    pub fn focused(&self, signup: bool) -> AuthField {
        self.focus
            .filter(|f| Self::fields(signup).contains(f))
            .unwrap_or(Self::fields(signup)[0])
    }

    pub fn move_focus(&mut self, signup: bool, forward: bool) {
        let fields = Self::fields(signup);
        let current = fields
            .iter()
            .position(|f| *f == self.focused(signup))
            .unwrap_or(0);
        let next = if forward {
            (current + 1) % fields.len()
        } else {
            (current + fields.len() - 1) % fields.len()
        };
        self.focus = Some(fields[next]);
    }

    /// The text buffer behind a field, if it has one.
    pub fn buffer_mut(&mut self, field: AuthField) -> Option<&mut String> {
        match field {
            AuthField::Username => Some(&mut self.username),
            AuthField::Email => Some(&mut self.email),
            AuthField::Password => Some(&mut self.password),
            AuthField::Button => None,
        }
    }
}

// ============================================================================
// Editing Forms
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    NewProject,
    EditProject(i64),
    NewTask(i64),
    EditTask(i64),
    NewSubtask(i64),
}

#[derive(Debug, Clone)]
pub struct FormField {
    pub label: &'static str,
    pub hint: &'static str,
    pub value: String,
}

impl FormField {
    fn new(label: &'static str, hint: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            hint,
            value: value.into(),
        }
    }
}

/// A small multi-field text form shown as an overlay.
#[derive(Debug, Clone)]
pub struct Form {
    pub kind: FormKind,
    pub fields: Vec<FormField>,
    pub focus: usize,
    pub error: Option<String>,
}

/// A validated form, ready to send.
#[derive(Debug, Clone)]
pub enum FormAction {
    CreateProject(NewProject),
    UpdateProject(i64, ProjectPatch),
    CreateTask(NewTask),
    UpdateTask(i64, TaskPatch),
    CreateSubtask(NewSubtask),
}

impl Form {
    fn with_fields(kind: FormKind, fields: Vec<FormField>) -> Self {
        Self {
            kind,
            fields,
            focus: 0,
            error: None,
        }
    }

    pub fn new_project() -> Self {
        Self::with_fields(
            FormKind::NewProject,
            vec![
                FormField::new("Title", "", ""),
                FormField::new("Description", "optional", ""),
            ],
        )
    }

    pub fn edit_project(project: &Project) -> Self {
        Self::with_fields(
            FormKind::EditProject(project.id),
            vec![
                FormField::new("Title", "", project.title.clone()),
                FormField::new("Description", "optional", project.description.clone()),
            ],
        )
    }

    pub fn new_task(project_id: i64) -> Self {
        Self::with_fields(
            FormKind::NewTask(project_id),
            vec![
                FormField::new("Title", "", ""),
                FormField::new("Due date", "YYYY-MM-DD, optional", ""),
                FormField::new("Priority", "low / normal / high", Priority::default().to_string()),
                FormField::new("Status", "todo / in_progress / done", TaskStatus::default().as_str()),
            ],
        )
    }

    pub fn edit_task(task: &Task) -> Self {
        let due = task
            .due_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        Self::with_fields(
            FormKind::EditTask(task.id),
            vec![
                FormField::new("Title", "", task.title.clone()),
                FormField::new("Due date", "YYYY-MM-DD, blank clears", due),
                FormField::new("Priority", "low / normal / high", task.priority.to_string()),
            ],
        )
    }

    pub fn new_subtask(task_id: i64) -> Self {
        Self::with_fields(FormKind::NewSubtask(task_id), vec![FormField::new("Title", "", "")])
    }

    pub fn title(&self) -> &'static str {
        match self.kind {
            FormKind::NewProject => " New project ",
            FormKind::EditProject(_) => " Edit project ",
            FormKind::NewTask(_) => " New task ",
            FormKind::EditTask(_) => " Edit task ",
            FormKind::NewSubtask(_) => " New subtask ",
        }
    }

    pub fn next_field(&mut self) {
        self.focus = (self.focus + 1) % self.fields.len();
    }

    pub fn prev_field(&mut self) {
        self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
    }

    pub fn push_char(&mut self, c: char) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            if can_add_field_char(field.value.chars().count(), c) {
                field.value.push(c);
            }
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(field) = self.fields.get_mut(self.focus) {
            field.value.pop();
        }
    }

    fn value(&self, index: usize) -> &str {
        self.fields.get(index).map(|f| f.value.trim()).unwrap_or("")
    }

    fn required_title(&self) -> Result<String, String> {
        let title = self.value(0);
        if title.is_empty() {
            Err("Title is required".to_string())
        } else {
            Ok(title.to_string())
        }
    }

    /// Validate the fields and build the request to send.
    pub fn submit(&self) -> Result<FormAction, String> {
        let title = self.required_title()?;
        match self.kind {
            FormKind::NewProject => Ok(FormAction::CreateProject(NewProject {
                title,
                description: self.value(1).to_string(),
            })),
            FormKind::EditProject(id) => Ok(FormAction::UpdateProject(
                id,
                ProjectPatch {
                    title: Some(title),
                    description: Some(self.value(1).to_string()),
                },
            )),
            FormKind::NewTask(project_id) => Ok(FormAction::CreateTask(NewTask {
                project_id,
                title,
                due_date: parse_due_date(self.value(1))?,
                priority: parse_or_default(self.value(2))?,
                status: parse_or_default(self.value(3))?,
            })),
            FormKind::EditTask(id) => Ok(FormAction::UpdateTask(
                id,
                TaskPatch {
                    title: Some(title),
                    due_date: Some(parse_due_date(self.value(1))?),
                    priority: Some(parse_or_default(self.value(2))?),
                    ..Default::default()
                },
            )),
            FormKind::NewSubtask(task_id) => Ok(FormAction::CreateSubtask(NewSubtask {
                task_id,
                title,
                status: None,
            })),
        }
    }
}

/// Parse an optional `YYYY-MM-DD` date; blank means no date.
pub fn parse_due_date(value: &str) -> Result<Option<NaiveDate>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| format!("Invalid date '{}', expected YYYY-MM-DD", value))
}

fn parse_or_default<T>(value: &str) -> Result<T, String>
where
    T: Default + std::str::FromStr<Err = String>,
{
    if value.trim().is_empty() {
        Ok(T::default())
    } else {
        value.parse()
    }
}

/// Something waiting for delete confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Project { id: i64, title: String },
    Task { id: i64, title: String },
    Subtask { task_id: i64, id: i64, title: String },
}

impl DeleteTarget {
    pub fn describe(&self) -> String {
        match self {
            DeleteTarget::Project { title, .. } => format!("project \"{}\" and all its tasks", title),
            DeleteTarget::Task { title, .. } => format!("task \"{}\"", title),
            DeleteTarget::Subtask { title, .. } => format!("subtask \"{}\"", title),
        }
    }
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent from background tasks back to the event loop.
enum BackgroundResult {
    /// Data fetched on behalf of `owner`; dropped if the identity changed since.
    Data { owner: i64, data: DataResult },
    /// A login or signup finished. `Err` carries an unexpected-response message.
    AuthFinished(Result<(), String>),
}

enum DataResult {
    Projects(Page<Project>),
    ProjectSaved(Project),
    ProjectDeleted(i64),
    /// A task page, tagged with the query that produced it.
    Tasks { query: TaskQuery, page: Page<Task> },
    TaskRefreshed(TaskDetail),
    TaskSaved(Task),
    TaskDeleted(i64),
    Subtasks { task_id: i64, subtasks: Vec<Subtask> },
    SubtaskSaved(Subtask),
    SubtaskDeleted { task_id: i64, subtask_id: i64 },
    Failed(String),
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    // Core services
    pub config: Config,
    pub api: ApiClient,
    pub store: Arc<Store>,
    session_rx: watch::Receiver<Session>,

    // Session and routing
    pub session: Session,
    pub guard: RouteGuard,
    pub route: Route,
    /// Where to go after signing in, set when the guard redirects.
    pub return_to: Option<Route>,

    // UI State
    pub state: AppState,
    pub focus: Focus,
    pub auth_form: AuthForm,
    pub form: Option<Form>,
    pub pending_delete: Option<DeleteTarget>,
    pub status_message: Option<String>,

    // Identity-scoped data. `data_owner` is the user it belongs to.
    data_owner: Option<i64>,
    pub projects: Page<Project>,
    pub project_page: u32,
    pub project_selection: usize,
    pub projects_loading: bool,
    projects_requested: bool,
    pub tasks: Page<Task>,
    pub task_query: TaskQuery,
    pub task_selection: usize,
    pub tasks_loading: bool,
    tasks_project: Option<i64>,
    pub subtasks: HashMap<i64, Vec<Subtask>>,
    pub subtask_selection: usize,

    // Background task channel
    result_rx: mpsc::Receiver<BackgroundResult>,
    result_tx: mpsc::Sender<BackgroundResult>,
}

impl App {
    pub fn new(config: Config, api: ApiClient, store: Arc<Store>) -> Self {
        let (result_tx, result_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let session_rx = store.subscribe();
        let session = session_rx.borrow().clone();
        let per_page = config.page_size();
        let auth_form = AuthForm {
            email: config.last_email.clone().unwrap_or_default(),
            ..AuthForm::default()
        };

        Self {
            config,
            api,
            store,
            session_rx,
            session,
            guard: RouteGuard::default(),
            route: Route::Home,
            return_to: None,
            state: AppState::Normal,
            focus: Focus::List,
            auth_form,
            form: None,
            pending_delete: None,
            status_message: None,
            data_owner: None,
            projects: Page::default(),
            project_page: 1,
            project_selection: 0,
            projects_loading: false,
            projects_requested: false,
            tasks: Page::default(),
            task_query: TaskQuery {
                per_page,
                ..TaskQuery::default()
            },
            task_selection: 0,
            tasks_loading: false,
            tasks_project: None,
            subtasks: HashMap::new(),
            subtask_selection: 0,
            result_rx,
            result_tx,
        }
    }

    // =========================================================================
    // Session and Routing
    // =========================================================================

    /// Switch to `route`, letting the guard redirect if needed.
    pub fn navigate(&mut self, route: Route) {
        if route != self.route {
            debug!(from = %self.route, to = %route, "Navigating");
        }
        self.route = route;
        self.focus = Focus::List;
        if matches!(route, Route::Login | Route::Signup) {
            self.auth_form.focus = None;
            self.auth_form.password.clear();
        }
        self.sync_route();
    }

    /// Take in a new session snapshot.
    fn apply_session(&mut self, session: Session) {
        let was_signed_in = self.session.user().is_some();
        self.session = session;

        let owner = self.session.identity.user_id();
        if owner != self.data_owner {
            debug!(previous = ?self.data_owner, current = ?owner, "Identity changed, clearing user data");
            self.clear_user_data();
            self.data_owner = owner;
        }

        let signed_in = self.session.user().is_some();
        if signed_in && !was_signed_in && matches!(self.route, Route::Login | Route::Signup) {
            self.finish_sign_in();
        }

        self.sync_route();
    }

    fn finish_sign_in(&mut self) {
        if self.config.remember_email(&self.auth_form.email) {
            if let Err(e) = self.config.save() {
                warn!(error = %e, "Failed to save config");
            }
        }
        self.auth_form.password.clear();
        self.auth_form.submitting = false;
        let target = self.return_to.take().unwrap_or(Route::Projects);
        info!(to = %target, "Signed in, continuing");
        self.route = target;
        self.focus = Focus::List;
    }

    /// Apply the guard to the current route: redirect, or load what it shows.
    fn sync_route(&mut self) {
        let decision = self.guard.check(&self.route, &self.session);
        let render = matches!(decision, GuardDecision::Render(_));
        let redirect = match decision {
            GuardDecision::Redirect { to, from } => Some((to, from)),
            _ => None,
        };

        if render {
            self.ensure_loaded();
        } else if let Some((to, from)) = redirect {
            info!(from = %from, to = %to, "Sign-in required, redirecting");
            self.return_to = Some(from);
            self.navigate(to);
        }
    }

    fn clear_user_data(&mut self) {
        self.projects = Page::default();
        self.project_page = 1;
        self.project_selection = 0;
        self.projects_loading = false;
        self.projects_requested = false;
        self.tasks = Page::default();
        self.task_query = TaskQuery {
            per_page: self.config.page_size(),
            ..TaskQuery::default()
        };
        self.task_selection = 0;
        self.tasks_loading = false;
        self.tasks_project = None;
        self.subtasks.clear();
        self.subtask_selection = 0;
        self.form = None;
        self.pending_delete = None;
        if matches!(self.state, AppState::EditingForm | AppState::ConfirmingDelete) {
            self.state = AppState::Normal;
        }
    }

    pub fn submit_auth(&mut self) {
        if self.auth_form.submitting {
            return;
        }
        let signup = self.route == Route::Signup;
        self.auth_form.submitting = true;
        self.status_message = Some(if signup { "Creating account..." } else { "Signing in..." }.to_string());

        let store = Arc::clone(&self.store);
        let tx = self.result_tx.clone();
        let username = self.auth_form.username.clone();
        let email = self.auth_form.email.clone();
        let password = self.auth_form.password.clone();
        tokio::spawn(async move {
            let result = if signup {
                store.signup(&username, &email, &password).await
            } else {
                store.login(&email, &password).await
            };
            Self::send_result(&tx, BackgroundResult::AuthFinished(result.map_err(|e| e.to_string()))).await;
        });
    }

    pub fn logout(&mut self) {
        info!("Logout requested");
        self.status_message = Some("Signed out".to_string());
        self.return_to = None;
        self.route = Route::Home;
        let store = Arc::clone(&self.store);
        tokio::spawn(async move { store.logout().await });
    }

    /// Re-check the session with the server.
    pub fn refresh_session(&mut self) {
        self.status_message = Some("Checking session...".to_string());
        let store = Arc::clone(&self.store);
        tokio::spawn(async move { store.resolve().await });
    }

    // =========================================================================
    // Data Loading
    // =========================================================================

    fn ensure_loaded(&mut self) {
        match self.route {
            Route::Projects if !self.projects_requested => self.load_projects(),
            Route::ProjectDetail(id) if self.tasks_project != Some(id) => self.load_tasks(id),
            _ => {}
        }
    }

    /// Reload whatever the current view shows.
    pub fn reload(&mut self) {
        match self.route {
            Route::Projects => self.load_projects(),
            Route::ProjectDetail(id) => self.load_tasks(id),
            _ => {}
        }
    }

    fn spawn_data<F>(&self, future: F)
    where
        F: Future<Output = DataResult> + Send + 'static,
    {
        let Some(owner) = self.data_owner else {
            debug!("No signed-in user, skipping request");
            return;
        };
        let tx = self.result_tx.clone();
        tokio::spawn(async move {
            let data = future.await;
            Self::send_result(&tx, BackgroundResult::Data { owner, data }).await;
        });
    }

    pub fn load_projects(&mut self) {
        if self.data_owner.is_none() {
            return;
        }
        self.projects_requested = true;
        self.projects_loading = true;
        let api = self.api.clone();
        let page = self.project_page;
        let per_page = self.config.page_size();
        self.spawn_data(async move {
            match api.list_projects(page, per_page, None).await {
                Ok(page) => DataResult::Projects(page),
                Err(e) => {
                    error!(error = %e, "Projects fetch failed");
                    DataResult::Failed(e.user_message("Failed to load projects"))
                }
            }
        });
    }

    /// Load a page of tasks, then preload each task's subtasks.
    pub fn load_tasks(&mut self, project_id: i64) {
        let Some(owner) = self.data_owner else {
            return;
        };
        if self.tasks_project != Some(project_id) {
            self.tasks = Page::default();
            self.task_query.page = 1;
            self.task_selection = 0;
            self.subtasks.clear();
        }
        self.tasks_project = Some(project_id);
        self.tasks_loading = true;
        self.task_query.project_id = Some(project_id);

        let api = self.api.clone();
        let query = self.task_query.clone();
        let tx = self.result_tx.clone();
        tokio::spawn(async move {
            let page = match api.list_tasks(&query).await {
                Ok(page) => page,
                Err(e) => {
                    error!(error = %e, project_id, "Tasks fetch failed");
                    let data = DataResult::Failed(e.user_message("Failed to load tasks"));
                    Self::send_result(&tx, BackgroundResult::Data { owner, data }).await;
                    return;
                }
            };

            let task_ids: Vec<i64> = page.data.iter().map(|t| t.id).collect();
            let data = DataResult::Tasks { query, page };
            Self::send_result(&tx, BackgroundResult::Data { owner, data }).await;

            debug!("Fetching subtasks with max {} concurrent requests...", MAX_CONCURRENT_REQUESTS);
            stream::iter(task_ids)
                .map(|task_id| {
                    let api = api.clone();
                    async move { (task_id, api.list_subtasks(task_id, None).await) }
                })
                .buffer_unordered(MAX_CONCURRENT_REQUESTS)
                .for_each(|(task_id, result)| {
                    let tx = tx.clone();
                    async move {
                        match result {
                            Ok(subtasks) => {
                                let data = DataResult::Subtasks { task_id, subtasks };
                                Self::send_result(&tx, BackgroundResult::Data { owner, data }).await;
                            }
                            Err(e) => debug!(error = %e, task_id, "Subtasks fetch failed"),
                        }
                    }
                })
                .await;
        });
    }

    /// Re-fetch the selected task together with its subtasks.
    pub fn refresh_selected_task(&mut self) {
        let Some(task_id) = self.selected_task().map(|t| t.id) else {
            return;
        };
        let api = self.api.clone();
        self.spawn_data(async move {
            match api.get_task(task_id).await {
                Ok(detail) => DataResult::TaskRefreshed(detail),
                Err(e) => {
                    warn!(error = %e, task_id, "Task refresh failed");
                    DataResult::Failed(e.user_message("Failed to load task"))
                }
            }
        });
    }

    // =========================================================================
    // Actions
    // =========================================================================

    pub fn open_form(&mut self, form: Form) {
        self.form = Some(form);
        self.state = AppState::EditingForm;
    }

    pub fn cancel_form(&mut self) {
        self.form = None;
        self.state = AppState::Normal;
    }

    pub fn submit_form(&mut self) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        let action = match form.submit() {
            Ok(action) => action,
            Err(message) => {
                form.error = Some(message);
                return;
            }
        };
        self.form = None;
        self.state = AppState::Normal;

        let api = self.api.clone();
        self.spawn_data(async move {
            let result = match action {
                FormAction::CreateProject(new) => api.create_project(&new).await.map(DataResult::ProjectSaved),
                FormAction::UpdateProject(id, patch) => {
                    api.update_project(id, &patch).await.map(DataResult::ProjectSaved)
                }
                FormAction::CreateTask(new) => api.create_task(&new).await.map(DataResult::TaskSaved),
                FormAction::UpdateTask(id, patch) => api.update_task(id, &patch).await.map(DataResult::TaskSaved),
                FormAction::CreateSubtask(new) => api.create_subtask(&new).await.map(DataResult::SubtaskSaved),
            };
            result.unwrap_or_else(|e| {
                warn!(error = %e, "Save failed");
                DataResult::Failed(e.user_message("Save failed"))
            })
        });
    }

    pub fn request_delete(&mut self, target: DeleteTarget) {
        self.pending_delete = Some(target);
        self.state = AppState::ConfirmingDelete;
    }

    pub fn confirm_delete(&mut self) {
        self.state = AppState::Normal;
        let Some(target) = self.pending_delete.take() else {
            return;
        };
        info!(?target, "Deleting");
        let api = self.api.clone();
        self.spawn_data(async move {
            let result = match target {
                DeleteTarget::Project { id, .. } => api.delete_project(id).await.map(|d| DataResult::ProjectDeleted(d.id)),
                DeleteTarget::Task { id, .. } => api.delete_task(id).await.map(|d| DataResult::TaskDeleted(d.id)),
                DeleteTarget::Subtask { task_id, id, .. } => api
                    .delete_subtask(id)
                    .await
                    .map(|d| DataResult::SubtaskDeleted { task_id, subtask_id: d.id }),
            };
            result.unwrap_or_else(|e| {
                warn!(error = %e, "Delete failed");
                DataResult::Failed(e.user_message("Delete failed"))
            })
        });
    }

    pub fn cycle_task_status(&mut self) {
        let Some(task) = self.selected_task() else {
            return;
        };
        let (id, status) = (task.id, task.status.next());
        let api = self.api.clone();
        self.spawn_data(async move {
            match api.update_task(id, &TaskPatch::status(status)).await {
                Ok(task) => DataResult::TaskSaved(task),
                Err(e) => DataResult::Failed(e.user_message("Failed to update task")),
            }
        });
    }

    pub fn toggle_subtask(&mut self) {
        let Some(subtask) = self.selected_subtask() else {
            return;
        };
        let id = subtask.id;
        let patch = SubtaskPatch {
            status: Some(subtask.toggled_status()),
            ..Default::default()
        };
        let api = self.api.clone();
        self.spawn_data(async move {
            match api.update_subtask(id, &patch).await {
                Ok(subtask) => DataResult::SubtaskSaved(subtask),
                Err(e) => DataResult::Failed(e.user_message("Failed to update subtask")),
            }
        });
    }

    pub fn change_project_page(&mut self, forward: bool) {
        let meta = &self.projects.meta;
        let allowed = if forward { meta.has_next() } else { meta.has_prev() };
        if !allowed {
            return;
        }
        self.project_page = if forward { meta.page + 1 } else { meta.page - 1 };
        self.project_selection = 0;
        self.load_projects();
    }

    pub fn change_task_page(&mut self, forward: bool) {
        let Route::ProjectDetail(project_id) = self.route else {
            return;
        };
        let meta = &self.tasks.meta;
        let allowed = if forward { meta.has_next() } else { meta.has_prev() };
        if !allowed {
            return;
        }
        self.task_query.page = if forward { meta.page + 1 } else { meta.page - 1 };
        self.task_selection = 0;
        self.load_tasks(project_id);
    }

    pub fn cycle_status_filter(&mut self) {
        self.task_query.status = self.task_query.status.next();
        self.restart_task_listing();
    }

    pub fn cycle_sort_field(&mut self) {
        self.task_query.sort.field = self.task_query.sort.field.next();
        self.restart_task_listing();
    }

    pub fn toggle_sort_direction(&mut self) {
        self.task_query.sort.descending = !self.task_query.sort.descending;
        self.restart_task_listing();
    }

    fn restart_task_listing(&mut self) {
        self.task_query.page = 1;
        self.task_selection = 0;
        if let Route::ProjectDetail(project_id) = self.route {
            self.load_tasks(project_id);
        }
    }

    // =========================================================================
    // Background Results
    // =========================================================================

    async fn send_result(tx: &mpsc::Sender<BackgroundResult>, result: BackgroundResult) {
        if tx.send(result).await.is_err() {
            debug!("Result channel closed, dropping background result");
        }
    }

    /// Pick up session changes and completed background tasks.
    pub fn check_background_tasks(&mut self) {
        if self.session_rx.has_changed().unwrap_or(false) {
            let session = self.session_rx.borrow_and_update().clone();
            self.apply_session(session);
        }

        let mut results = Vec::new();
        while let Ok(result) = self.result_rx.try_recv() {
            results.push(result);
        }
        for result in results {
            self.process_result(result);
        }
    }

    fn process_result(&mut self, result: BackgroundResult) {
        match result {
            BackgroundResult::AuthFinished(result) => {
                self.auth_form.submitting = false;
                // Rejections arrive through the session snapshot as `last_error`.
                self.status_message = result.err();
            }
            BackgroundResult::Data { owner, data } => {
                if Some(owner) != self.data_owner {
                    debug!(owner, current = ?self.data_owner, "Discarding data for a previous identity");
                    return;
                }
                self.apply_data(data);
            }
        }
    }

    fn apply_data(&mut self, data: DataResult) {
        match data {
            DataResult::Projects(page) => {
                self.projects_loading = false;
                self.project_page = page.meta.page.max(1);
                self.project_selection = clamp_selection(self.project_selection, page.data.len());
                self.projects = page;
            }
            DataResult::ProjectSaved(project) => {
                self.status_message = Some(format!("Saved project \"{}\"", project.title));
                self.load_projects();
            }
            DataResult::ProjectDeleted(id) => {
                self.status_message = Some("Project deleted".to_string());
                if self.route == Route::ProjectDetail(id) {
                    self.route = Route::Projects;
                    self.focus = Focus::List;
                }
                self.load_projects();
            }
            DataResult::Tasks { query, page } => {
                if query != self.task_query {
                    debug!(page = query.page, "Discarding task page for a superseded query");
                    return;
                }
                self.tasks_loading = false;
                self.task_selection = clamp_selection(self.task_selection, page.data.len());
                self.tasks = page;
            }
            DataResult::TaskSaved(task) => {
                self.status_message = Some(format!("Saved task \"{}\"", task.title));
                if let Some(existing) = self.tasks.data.iter_mut().find(|t| t.id == task.id) {
                    *existing = task;
                } else if self.tasks_project == Some(task.project_id) {
                    self.load_tasks(task.project_id);
                }
            }
            DataResult::TaskDeleted(id) => {
                self.status_message = Some("Task deleted".to_string());
                self.subtasks.remove(&id);
                if let Some(project_id) = self.tasks_project {
                    self.load_tasks(project_id);
                }
            }
            DataResult::TaskRefreshed(TaskDetail { task, subtasks }) => {
                let task_id = task.id;
                if let Some(existing) = self.tasks.data.iter_mut().find(|t| t.id == task_id) {
                    *existing = task;
                }
                self.subtask_selection = clamp_selection(self.subtask_selection, subtasks.len());
                self.subtasks.insert(task_id, subtasks);
            }
            DataResult::Subtasks { task_id, subtasks } => {
                self.subtasks.insert(task_id, subtasks);
            }
            DataResult::SubtaskSaved(subtask) => {
                let list = self.subtasks.entry(subtask.task_id).or_default();
                match list.iter_mut().find(|s| s.id == subtask.id) {
                    Some(existing) => *existing = subtask,
                    None => list.push(subtask),
                }
            }
            DataResult::SubtaskDeleted { task_id, subtask_id } => {
                if let Some(list) = self.subtasks.get_mut(&task_id) {
                    list.retain(|s| s.id != subtask_id);
                    self.subtask_selection = clamp_selection(self.subtask_selection, list.len());
                }
            }
            DataResult::Failed(message) => {
                self.projects_loading = false;
                self.tasks_loading = false;
                self.status_message = Some(message);
            }
        }
    }

    // =========================================================================
    // Selection Helpers
    // =========================================================================

    pub fn selected_project(&self) -> Option<&Project> {
        self.projects.data.get(self.project_selection)
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.tasks.data.get(self.task_selection)
    }

    pub fn selected_task_subtasks(&self) -> &[Subtask] {
        self.selected_task()
            .and_then(|t| self.subtasks.get(&t.id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn selected_subtask(&self) -> Option<&Subtask> {
        self.selected_task_subtasks().get(self.subtask_selection)
    }

    /// Title of the project being viewed, if it is on the loaded page.
    pub fn current_project_title(&self) -> String {
        match self.route {
            Route::ProjectDetail(id) => self
                .projects
                .data
                .iter()
                .find(|p| p.id == id)
                .map(|p| p.title.clone())
                .unwrap_or_else(|| format!("Project #{}", id)),
            _ => String::new(),
        }
    }

    pub fn status_filter(&self) -> StatusFilter {
        self.task_query.status
    }

    pub fn sort_field(&self) -> SortField {
        self.task_query.sort.field
    }

    pub fn move_selection(&mut self, down: bool) {
        let (selection, len) = match (self.route, self.focus) {
            (Route::Projects, _) => (&mut self.project_selection, self.projects.data.len()),
            (Route::ProjectDetail(_), Focus::List) => {
                self.subtask_selection = 0;
                (&mut self.task_selection, self.tasks.data.len())
            }
            (Route::ProjectDetail(_), Focus::Detail) => {
                let len = self
                    .tasks
                    .data
                    .get(self.task_selection)
                    .and_then(|t| self.subtasks.get(&t.id))
                    .map_or(0, Vec::len);
                (&mut self.subtask_selection, len)
            }
            _ => return,
        };
        if len == 0 {
            return;
        }
        *selection = if down {
            (*selection + 1).min(len - 1)
        } else {
            selection.saturating_sub(1)
        };
    }
}

fn clamp_selection(selection: usize, len: usize) -> usize {
    selection.min(len.saturating_sub(1))
}

// ============================================================================
// Input Validation
// ============================================================================

fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if a username or email character should be accepted
pub fn can_add_identifier_char(current_len: usize, c: char) -> bool {
    current_len < MAX_IDENTIFIER_LENGTH && is_valid_input_char(c)
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

pub fn can_add_field_char(current_len: usize, c: char) -> bool {
    current_len < MAX_FIELD_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================

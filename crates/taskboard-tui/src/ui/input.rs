//! Keyboard input handling for the TUI.
//!
//! Translates key events into application state changes. Network work is
//! started here but always runs on background tasks.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use taskboard_core::Route;

use crate::app::{
    can_add_identifier_char, can_add_password_char, App, AppState, AuthField, DeleteTarget, Focus, Form,
};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            return Ok(false);
        }
        AppState::ConfirmingQuit => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    app.state = AppState::Quitting;
                    return Ok(true);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::ConfirmingDelete => {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_delete(),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    app.pending_delete = None;
                    app.state = AppState::Normal;
                }
                _ => {}
            }
            return Ok(false);
        }
        AppState::EditingForm => {
            handle_form_input(app, key);
            return Ok(false);
        }
        AppState::Quitting => return Ok(true),
        AppState::Normal => {}
    }

    // The auth form owns the keyboard while it is shown
    if matches!(app.route, Route::Login | Route::Signup) {
        handle_auth_input(app, key);
        return Ok(false);
    }

    // Global keys
    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::ConfirmingQuit;
            return Ok(false);
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
            return Ok(false);
        }
        KeyCode::Char('1') => {
            app.navigate(Route::Home);
            return Ok(false);
        }
        KeyCode::Char('2') => {
            app.navigate(Route::Projects);
            return Ok(false);
        }
        KeyCode::Char('l') if app.session.user().is_none() => {
            app.navigate(Route::Login);
            return Ok(false);
        }
        KeyCode::Char('s') if app.session.user().is_none() => {
            app.navigate(Route::Signup);
            return Ok(false);
        }
        KeyCode::Char('o') if app.session.user().is_some() => {
            app.logout();
            return Ok(false);
        }
        KeyCode::Char('r') => {
            app.refresh_session();
            return Ok(false);
        }
        _ => {}
    }

    // Protected views only take input once they are actually shown
    if app.session.user().is_none() {
        return Ok(false);
    }

    match app.route {
        Route::Projects => handle_projects_input(app, key),
        Route::ProjectDetail(project_id) => handle_project_detail_input(app, project_id, key),
        Route::Home | Route::Login | Route::Signup => {}
    }

    Ok(false)
}

fn handle_auth_input(app: &mut App, key: KeyEvent) {
    let signup = app.route == Route::Signup;
    let focused = app.auth_form.focused(signup);

    match key.code {
        KeyCode::Esc => {
            app.return_to = None;
            app.navigate(Route::Home);
        }
        KeyCode::Down | KeyCode::Tab => app.auth_form.move_focus(signup, true),
        KeyCode::Up | KeyCode::BackTab => app.auth_form.move_focus(signup, false),
        KeyCode::Enter => {
            if focused == AuthField::Button {
                app.submit_auth();
            } else {
                app.auth_form.move_focus(signup, true);
            }
        }
        KeyCode::Backspace => {
            if let Some(buffer) = app.auth_form.buffer_mut(focused) {
                buffer.pop();
            }
        }
        KeyCode::Char(c) => {
            let allowed = |len: usize| match focused {
                AuthField::Password => can_add_password_char(len, c),
                _ => can_add_identifier_char(len, c),
            };
            if let Some(buffer) = app.auth_form.buffer_mut(focused) {
                if allowed(buffer.chars().count()) {
                    buffer.push(c);
                }
            }
        }
        _ => {}
    }
}

fn handle_form_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_form(),
        KeyCode::Enter => app.submit_form(),
        KeyCode::Tab | KeyCode::Down => {
            if let Some(form) = app.form.as_mut() {
                form.next_field();
            }
        }
        KeyCode::BackTab | KeyCode::Up => {
            if let Some(form) = app.form.as_mut() {
                form.prev_field();
            }
        }
        KeyCode::Backspace => {
            if let Some(form) = app.form.as_mut() {
                form.pop_char();
            }
        }
        KeyCode::Char(c) => {
            if let Some(form) = app.form.as_mut() {
                form.push_char(c);
            }
        }
        _ => {}
    }
}

fn handle_projects_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(false),
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(true),
        KeyCode::Char('[') => app.change_project_page(false),
        KeyCode::Char(']') => app.change_project_page(true),
        KeyCode::Char('u') => app.reload(),
        KeyCode::Char('n') => app.open_form(Form::new_project()),
        KeyCode::Enter => {
            if let Some(project) = app.selected_project() {
                let id = project.id;
                app.navigate(Route::ProjectDetail(id));
            }
        }
        KeyCode::Char('e') => {
            if let Some(form) = app.selected_project().map(Form::edit_project) {
                app.open_form(form);
            }
        }
        KeyCode::Char('d') => {
            if let Some(project) = app.selected_project() {
                let target = DeleteTarget::Project {
                    id: project.id,
                    title: project.title.clone(),
                };
                app.request_delete(target);
            }
        }
        _ => {}
    }
}

fn handle_project_detail_input(app: &mut App, project_id: i64, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            if app.focus == Focus::Detail {
                app.focus = Focus::List;
            } else {
                app.navigate(Route::Projects);
            }
        }
        KeyCode::Tab => {
            if app.selected_task().is_some() {
                app.subtask_selection = 0;
                if app.focus == Focus::List {
                    app.refresh_selected_task();
                    app.focus = Focus::Detail;
                } else {
                    app.focus = Focus::List;
                }
            }
        }
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(false),
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(true),
        KeyCode::Char('[') => app.change_task_page(false),
        KeyCode::Char(']') => app.change_task_page(true),
        KeyCode::Char('f') => app.cycle_status_filter(),
        KeyCode::Char('t') => app.cycle_sort_field(),
        KeyCode::Char('v') => app.toggle_sort_direction(),
        KeyCode::Char('u') => app.reload(),
        KeyCode::Char('n') => {
            let form = match (app.focus, app.selected_task()) {
                (Focus::Detail, Some(task)) => Form::new_subtask(task.id),
                _ => Form::new_task(project_id),
            };
            app.open_form(form);
        }
        KeyCode::Char('e') if app.focus == Focus::List => {
            if let Some(form) = app.selected_task().map(Form::edit_task) {
                app.open_form(form);
            }
        }
        KeyCode::Char(' ') | KeyCode::Enter => match app.focus {
            Focus::List => app.cycle_task_status(),
            Focus::Detail => app.toggle_subtask(),
        },
        KeyCode::Char('d') => {
            let target = match app.focus {
                Focus::List => app.selected_task().map(|t| DeleteTarget::Task {
                    id: t.id,
                    title: t.title.clone(),
                }),
                Focus::Detail => app.selected_subtask().map(|s| DeleteTarget::Subtask {
                    task_id: s.task_id,
                    id: s.id,
                    title: s.title.clone(),
                }),
            };
            if let Some(target) = target {
                app.request_delete(target);
            }
        }
        _ => {}
    }
}

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use taskboard_core::{GuardDecision, Route};

use crate::app::{App, AppState};

use super::styles;
use super::views::{auth, home, project_detail, projects};

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Navigation
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_nav(frame, app, chunks[1]);
    render_main_content(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::ConfirmingDelete => render_delete_overlay(frame, app),
        AppState::EditingForm => render_form_overlay(frame, app),
        AppState::Normal | AppState::Quitting => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  Taskboard";
    let session_text = app.session.status_line();
    let help_hint = "[?] Help";
    let used = title.len() + session_text.chars().count() + help_hint.len() + 7;

    let session_style = if app.session.user().is_some() {
        styles::success_style()
    } else {
        styles::muted_style()
    };

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat((area.width as usize).saturating_sub(used))),
        Span::styled(session_text, session_style),
        Span::raw("   "),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block);
    frame.render_widget(paragraph, area);
}

fn render_nav(frame: &mut Frame, app: &App, area: Rect) {
    let on_projects = matches!(app.route, Route::Projects | Route::ProjectDetail(_));
    let main_tabs = [
        ("[1] Home", app.route == Route::Home),
        ("[2] Projects", on_projects),
    ];

    let mut spans = vec![Span::raw(" ")];
    push_tabs(&mut spans, &main_tabs);

    let account_tabs: Vec<(&str, bool)> = if app.session.user().is_some() {
        vec![("[o] Log out", false)]
    } else {
        vec![
            ("[l] Log in", app.route == Route::Login),
            ("[s] Sign up", app.route == Route::Signup),
        ]
    };

    // Push account actions to the right
    let main_width: usize = spans.iter().map(|s| s.content.chars().count()).sum();
    let account_width: usize = account_tabs.iter().map(|(l, _)| l.len()).sum::<usize>()
        + (account_tabs.len() - 1) * 3;
    let padding = (area.width as usize).saturating_sub(main_width + account_width + 2);
    spans.push(Span::raw(" ".repeat(padding)));
    push_tabs(&mut spans, &account_tabs);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}

fn push_tabs<'a>(spans: &mut Vec<Span<'a>>, tabs: &[(&'a str, bool)]) {
    for (i, (label, selected)) in tabs.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        spans.push(Span::styled(*label, styles::tab_style(*selected)));
    }
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.route {
        Route::Home => home::render(frame, app, area),
        Route::Login | Route::Signup => auth::render(frame, app, area),
        Route::Projects | Route::ProjectDetail(_) => match app.guard.check(&app.route, &app.session) {
            GuardDecision::Render(user) => {
                if let Route::ProjectDetail(_) = app.route {
                    project_detail::render(frame, app, area);
                } else {
                    projects::render(frame, app, user, area);
                }
            }
            // A redirect is applied on the next tick; until then nothing protected is drawn.
            GuardDecision::Loading | GuardDecision::Redirect { .. } | GuardDecision::Public => {
                render_loading(frame, area)
            }
        },
    }
}

fn render_loading(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    let paragraph = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled("Loading...", styles::muted_style())),
    ])
    .alignment(Alignment::Center)
    .block(block);
    frame.render_widget(paragraph, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = match app.route {
        Route::Projects => "[n]ew [e]dit [d]elete [Enter] open [/] page [u] reload | [q]uit",
        Route::ProjectDetail(_) => "[n]ew [Space] status [f]ilter [t] sort [Tab] subtasks [Esc] back | [q]uit",
        Route::Login | Route::Signup => "[Tab] next field [Enter] submit [Esc] home",
        Route::Home => "[r] recheck session | [q]uit",
    };

    let left_text = match app.status_message {
        Some(ref msg) => format!(" {} ", msg),
        None => format!(" {} ", app.route),
    };
    let right_text = format!(" {} ", shortcuts);

    let width = area.width as usize;
    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());
    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(56, 28, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled("  Taskboard", styles::title_style())),
        Line::from(Span::styled(format!("  version {}", version), styles::muted_style())),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::highlight_style())),
        help_line("1 / 2", "Home / projects"),
        help_line("↑/↓ j/k", "Move selection"),
        help_line("Enter", "Open project / submit form"),
        help_line("Tab", "Switch tasks ↔ subtasks"),
        help_line("[ / ]", "Previous / next page"),
        help_line("Esc", "Go back"),
        Line::from(""),
        Line::from(Span::styled(" Account", styles::highlight_style())),
        help_line("l / s", "Log in / sign up"),
        help_line("o", "Log out"),
        help_line("r", "Re-check session"),
        Line::from(""),
        Line::from(Span::styled(" Projects and tasks", styles::highlight_style())),
        help_line("n", "New project / task / subtask"),
        help_line("e", "Edit selected"),
        help_line("d", "Delete selected"),
        help_line("Space", "Cycle task status / toggle subtask"),
        help_line("f / t / v", "Filter status / sort field / reverse"),
        help_line("u", "Reload from server"),
        help_line("q", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_delete_overlay(frame: &mut Frame, app: &App) {
    let Some(ref target) = app.pending_delete else {
        return;
    };
    let area = centered_rect_fixed(56, 8, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(format!(" Delete {}?", target.describe()), styles::error_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled(" Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to delete, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .title(" Confirm ")
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_form_overlay(frame: &mut Frame, app: &App) {
    let Some(ref form) = app.form else {
        return;
    };
    let extra = if form.error.is_some() { 2 } else { 0 };
    let height = form.fields.len() as u16 * 3 + 4 + extra;
    let area = centered_rect_fixed(60, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![Line::from("")];
    for (i, field) in form.fields.iter().enumerate() {
        let focused = i == form.focus;
        let mut label = vec![Span::styled(format!(" {}", field.label), styles::highlight_style())];
        if !field.hint.is_empty() {
            label.push(Span::styled(format!("  ({})", field.hint), styles::muted_style()));
        }
        lines.push(Line::from(label));

        let cursor = if focused { "▌" } else { "" };
        let style = if focused {
            styles::selected_style()
        } else {
            styles::list_item_style()
        };
        lines.push(Line::from(vec![
            Span::styled(" [", styles::muted_style()),
            Span::styled(format!("{:<52}", format!("{}{}", field.value, cursor)), style),
            Span::styled("]", styles::muted_style()),
        ]));
        lines.push(Line::from(""));
    }

    if let Some(ref error) = form.error {
        lines.push(Line::from(Span::styled(format!(" {}", error), styles::error_style())));
    }
    lines.push(Line::from(Span::styled(
        " [Tab] next field  [Enter] save  [Esc] cancel",
        styles::muted_style(),
    )));

    let block = Block::default()
        .title(form.title())
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
pub fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

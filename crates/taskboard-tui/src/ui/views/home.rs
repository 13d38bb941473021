use ratatui::{
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("Taskboard", styles::title_style())),
        Line::from(Span::styled(
            "Projects, tasks and subtasks from your terminal",
            styles::muted_style(),
        )),
        Line::from(""),
    ];

    if app.session.resolving && app.session.identity.user().is_none() {
        lines.push(Line::from(Span::styled("Checking your session...", styles::muted_style())));
    } else if let Some(user) = app.session.user() {
        lines.push(Line::from(vec![
            Span::raw("Welcome back, "),
            Span::styled(user.username.clone(), styles::highlight_style()),
        ]));
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::raw("Press "),
            Span::styled("2", styles::help_key_style()),
            Span::raw(" to open your projects."),
        ]));
    } else {
        lines.push(Line::from("You are not signed in."));
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::raw("Press "),
            Span::styled("l", styles::help_key_style()),
            Span::raw(" to log in or "),
            Span::styled("s", styles::help_key_style()),
            Span::raw(" to create an account."),
        ]));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));
    let paragraph = Paragraph::new(lines).alignment(Alignment::Center).block(block);
    frame.render_widget(paragraph, area);
}

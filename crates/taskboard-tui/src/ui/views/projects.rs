use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use taskboard_core::models::User;
use taskboard_core::utils::{format_date, pluralize, truncate_string};

use crate::app::App;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, user: &User, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    render_project_list(frame, app, user, chunks[0]);
    render_project_detail(frame, app, chunks[1]);
}

fn render_project_list(frame: &mut Frame, app: &App, user: &User, area: Rect) {
    let title_width = (area.width as usize).saturating_sub(6);
    let items: Vec<ListItem> = app
        .projects
        .data
        .iter()
        .enumerate()
        .map(|(i, project)| {
            let style = if i == app.project_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            ListItem::new(Line::from(truncate_string(&project.title, title_width))).style(style)
        })
        .collect();

    let title = format!(" {}'s projects ({}) ", user.username, app.projects.meta.total);
    let footer = if app.projects_loading {
        " Loading... ".to_string()
    } else {
        format!(" {} ", app.projects.meta.summary())
    };
    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .title_bottom(Line::from(Span::styled(footer, styles::muted_style())))
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    if items.is_empty() && !app.projects_loading {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  No projects yet. Press n to create one.",
                styles::muted_style(),
            )),
        ])
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let list = List::new(items).block(block);
    let mut state = ListState::default();
    state.select(Some(app.project_selection));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_project_detail(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    let Some(project) = app.selected_project() else {
        frame.render_widget(block, area);
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(project.title.clone(), styles::title_style())),
        Line::from(""),
    ];
    if project.description.trim().is_empty() {
        lines.push(Line::from(Span::styled("No description", styles::muted_style())));
    } else {
        lines.push(Line::from(project.description.clone()));
    }
    lines.push(Line::from(""));
    if let Some(ref created) = project.created_at {
        lines.push(Line::from(vec![
            Span::styled("Created: ", styles::highlight_style()),
            Span::raw(format_date(created)),
        ]));
    }
    lines.push(Line::from(vec![
        Span::styled("Showing: ", styles::highlight_style()),
        Span::raw(pluralize(app.projects.data.len() as u64, "project")),
        Span::styled(" on this page", styles::muted_style()),
    ]));

    let paragraph = Paragraph::new(lines)
        .block(block.title(" Details ").title_style(styles::title_style()))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

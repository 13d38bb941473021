use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use taskboard_core::models::Subtask;
use taskboard_core::utils::{pluralize, truncate_string};

use crate::app::{App, Focus};
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(5)])
        .split(area);

    render_header(frame, app, chunks[0]);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(chunks[1]);

    render_tasks(frame, app, panels[0]);
    render_subtasks(frame, app, panels[1]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let sort = &app.task_query.sort;
    let direction = if sort.descending { "↓" } else { "↑" };
    let line = Line::from(vec![
        Span::styled(format!(" {} ", app.current_project_title()), styles::title_style()),
        Span::styled("  Status: ", styles::muted_style()),
        Span::styled(app.status_filter().label(), styles::highlight_style()),
        Span::styled("  Sort: ", styles::muted_style()),
        Span::styled(
            format!("{} {}", app.sort_field().as_str().replace('_', " "), direction),
            styles::highlight_style(),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_tasks(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::List;
    let title_width = (area.width as usize).saturating_sub(40).max(10);

    let rows: Vec<Row> = app
        .tasks
        .data
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let done = app
                .subtasks
                .get(&task.id)
                .map(|subs| format!("{}/{}", subs.iter().filter(|s| s.is_done()).count(), subs.len()))
                .unwrap_or_default();
            let row = Row::new(vec![
                Cell::from(truncate_string(&task.title, title_width)),
                Cell::from(Span::styled(task.status.to_string(), styles::status_style(task.status))),
                Cell::from(Span::styled(task.priority.to_string(), styles::priority_style(task.priority))),
                Cell::from(task.due_display()),
                Cell::from(Span::styled(done, styles::muted_style())),
            ]);
            if i == app.task_selection {
                row.style(styles::selected_style())
            } else {
                row
            }
        })
        .collect();

    let header = Row::new(vec!["Title", "Status", "Priority", "Due", "Sub"]).style(styles::highlight_style());
    let footer = if app.tasks_loading {
        " Loading... ".to_string()
    } else {
        format!(" {} ", app.tasks.meta.summary())
    };
    let block = Block::default()
        .title(format!(" Tasks ({}) ", app.tasks.meta.total))
        .title_style(styles::title_style())
        .title_bottom(Line::from(Span::styled(footer, styles::muted_style())))
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    if rows.is_empty() && !app.tasks_loading {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  No tasks match. Press n to add one or f to change the filter.",
                styles::muted_style(),
            )),
        ])
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let table = Table::new(
        rows,
        [
            Constraint::Min(10),
            Constraint::Length(12),
            Constraint::Length(9),
            Constraint::Length(11),
            Constraint::Length(6),
        ],
    )
    .header(header)
    .block(block);

    let mut state = TableState::default();
    state.select(Some(app.task_selection));
    frame.render_stateful_widget(table, area, &mut state);
}

fn subtask_line(subtask: &Subtask, selected: bool, width: usize) -> Line<'static> {
    let (mark, mark_style) = if subtask.is_done() {
        ("[x] ", styles::success_style())
    } else {
        ("[ ] ", styles::muted_style())
    };
    let title_style = if selected {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    Line::from(vec![
        Span::styled(mark, mark_style),
        Span::styled(truncate_string(&subtask.title, width), title_style),
    ])
}

fn render_subtasks(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Detail;
    let width = (area.width as usize).saturating_sub(8);

    let (title, lines) = match app.selected_task() {
        Some(task) => {
            let subtasks = app.selected_task_subtasks();
            let lines: Vec<Line> = if !app.subtasks.contains_key(&task.id) {
                vec![Line::from(Span::styled("Loading subtasks...", styles::muted_style()))]
            } else if subtasks.is_empty() {
                vec![Line::from(Span::styled("No subtasks", styles::muted_style()))]
            } else {
                subtasks
                    .iter()
                    .enumerate()
                    .map(|(i, s)| subtask_line(s, focused && i == app.subtask_selection, width))
                    .collect()
            };
            (
                format!(" {} ", pluralize(subtasks.len() as u64, "subtask")),
                lines,
            )
        }
        None => (" Subtasks ".to_string(), Vec::new()),
    };

    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use taskboard_core::Route;

use crate::app::{App, AuthField, AuthForm};
use crate::ui::render::centered_rect_fixed;
use crate::ui::styles;

/// Width of the visible part of a text field.
const FIELD_WIDTH: usize = 24;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let signup = app.route == Route::Signup;
    let form = &app.auth_form;
    let focused = form.focused(signup);
    let error = app.session.last_error.as_deref();

    let fields = AuthForm::fields(signup);
    let height = fields.len() as u16 + 7 + if error.is_some() { 2 } else { 0 };
    let area = centered_rect_fixed(48, height, area);
    frame.render_widget(Clear, area);

    let mut lines = vec![Line::from("")];
    for field in fields {
        let line = match field {
            AuthField::Username => text_field("Username", &form.username, *field == focused),
            AuthField::Email => text_field("Email   ", &form.email, *field == focused),
            AuthField::Password => {
                let masked = "*".repeat(form.password.chars().count());
                text_field("Password", &masked, *field == focused)
            }
            AuthField::Button => {
                lines.push(Line::from(""));
                submit_button(signup, *field == focused, form.submitting)
            }
        };
        lines.push(line);
    }

    if let Some(error) = error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", error), styles::error_style())));
    }

    lines.push(Line::from(""));
    let switch_hint = if signup {
        " Have an account? Press Esc, then l"
    } else {
        " New here? Press Esc, then s"
    };
    lines.push(Line::from(Span::styled(switch_hint, styles::muted_style())));

    let title = if signup { " Sign up " } else { " Log in " };
    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn text_field(label: &'static str, value: &str, focused: bool) -> Line<'static> {
    let style = if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    // Show the tail of long input so the cursor stays visible
    let visible: String = {
        let count = value.chars().count();
        value.chars().skip(count.saturating_sub(FIELD_WIDTH)).collect()
    };
    let cursor = if focused { "▌" } else { "" };
    Line::from(vec![
        Span::raw("   "),
        Span::styled(format!("{}: [", label), styles::muted_style()),
        Span::styled(format!("{:<width$}", format!("{}{}", visible, cursor), width = FIELD_WIDTH + 1), style),
        Span::styled("]", styles::muted_style()),
    ])
}

fn submit_button(signup: bool, focused: bool, submitting: bool) -> Line<'static> {
    let label = match (signup, submitting) {
        (_, true) => "  Working...  ",
        (true, false) => "   Sign up    ",
        (false, false) => "    Log in    ",
    };
    let style = if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let (open, close) = if focused { ("[▶", "◀]") } else { ("[ ", " ]") };
    Line::from(vec![
        Span::raw("              "),
        Span::raw(open),
        Span::styled(label, style),
        Span::raw(close),
    ])
}

use ratatui::style::{Color, Modifier, Style};

use taskboard_core::models::{Priority, TaskStatus};

// Palette
const BRAND: Color = Color::Rgb(86, 140, 214);
const GOOD: Color = Color::Rgb(110, 178, 112);
const WARN: Color = Color::Rgb(214, 172, 76);
const BAD: Color = Color::Rgb(206, 84, 84);
const DIM: Color = Color::Rgb(120, 124, 132);
const TEXT: Color = Color::Rgb(224, 226, 230);
const SELECTION_BG: Color = Color::Rgb(44, 52, 70);
const BAR_BG: Color = Color::Rgb(28, 30, 38);

fn fg(color: Color) -> Style {
    Style::default().fg(color)
}

pub fn title_style() -> Style {
    fg(BRAND).add_modifier(Modifier::BOLD)
}

pub fn selected_style() -> Style {
    fg(TEXT).bg(SELECTION_BG).add_modifier(Modifier::BOLD)
}

pub fn list_item_style() -> Style {
    fg(TEXT)
}

pub fn muted_style() -> Style {
    fg(DIM)
}

pub fn highlight_style() -> Style {
    fg(WARN)
}

pub fn success_style() -> Style {
    fg(GOOD)
}

pub fn error_style() -> Style {
    fg(BAD)
}

/// Active navigation tabs are underlined in the brand color.
pub fn tab_style(active: bool) -> Style {
    if active {
        title_style().add_modifier(Modifier::UNDERLINED)
    } else {
        muted_style()
    }
}

pub fn border_style(focused: bool) -> Style {
    fg(if focused { BRAND } else { DIM })
}

pub fn status_bar_style() -> Style {
    fg(TEXT).bg(BAR_BG)
}

pub fn help_key_style() -> Style {
    highlight_style().add_modifier(Modifier::BOLD)
}

pub fn help_desc_style() -> Style {
    list_item_style()
}

pub fn status_style(status: TaskStatus) -> Style {
    match status {
        TaskStatus::Todo => list_item_style(),
        TaskStatus::InProgress => highlight_style(),
        TaskStatus::Done => success_style().add_modifier(Modifier::DIM),
    }
}

pub fn priority_style(priority: Priority) -> Style {
    match priority {
        Priority::Low => muted_style(),
        Priority::Normal => list_item_style(),
        Priority::High => error_style().add_modifier(Modifier::BOLD),
    }
}

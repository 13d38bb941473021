//! Taskboard TUI - a terminal client for the taskboard project tracker.
//!
//! Signs in against the taskboard REST service and provides a keyboard-driven
//! interface for browsing and editing projects, tasks and subtasks.

mod app;
mod ui;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use taskboard_core::config::API_URL_ENV;
use taskboard_core::{ApiClient, Config, SessionStore};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

const LOG_FILE_PREFIX: &str = "taskboard.log";

/// Initialize file logging. The terminal belongs to the UI, so nothing is
/// written to stderr. Use RUST_LOG to control the level (e.g. RUST_LOG=debug).
fn init_tracing() -> Result<WorkerGuard> {
    let log_dir = Config::log_dir()?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create {}", log_dir.display()))?;

    let appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    // Logging is best effort; the app still runs without a log directory
    let _log_guard = init_tracing().ok();
    info!("Taskboard TUI starting");

    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        let mut config = Config::default();
        config.apply_overrides(std::env::var(API_URL_ENV).ok());
        config
    });

    let api = ApiClient::from_config(&config)
        .with_context(|| format!("Failed to create API client for {}", config.api_base_url()))?;
    let store = Arc::new(SessionStore::new(api.clone()));

    // Resolve the existing session while the first frame is drawn
    {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            store.activate().await;
        });
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, api, store);

    // Main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("Taskboard TUI shutting down");
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        // Draw UI
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key)? {
                    return Ok(());
                }
            }
        }

        // Apply session changes and completed background tasks
        app.check_background_tasks();

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}

mod api;
mod app;
mod config;
mod error;
mod events;
mod logging;
mod models;
mod ui;
mod workflow;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::Backend, prelude::*};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use api::{GeminiClient, ImageModel};
use app::{App, Focus};
use events::AppEvent;

#[tokio::main]
async fn main() -> Result<()> {
    // Fail before touching the terminal so the message stays visible
    let api_key = config::api_key()?;
    let config = config::load_config()?;
    logging::init_logging(&config::get_log_path()?, &config.log_filter)?;

    let model: Arc<dyn ImageModel> = Arc::new(GeminiClient::new(&config, api_key)?);
    let download_dir = config.download_dir();
    tracing::info!(
        edit_model = %config.edit_model,
        tag_model = %config.tag_model,
        "starting photo studio"
    );

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new();

    // Create channel for async events
    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();

    let res = run_app(&mut terminal, &mut app, &model, &download_dir, &tx, &mut rx);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = ?err, "application error");
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn handle_app_event(
    app: &mut App,
    event: AppEvent,
    model: &Arc<dyn ImageModel>,
    event_tx: &mpsc::UnboundedSender<AppEvent>,
) {
    if let Some(job) = app.handle_event(event) {
        workflow::spawn_tagging(Arc::clone(model), job, event_tx.clone());
    }
}

/// Keys that close popups or control exit. Returns true when the key was consumed.
fn handle_global_keys(app: &mut App, key: KeyCode, modifiers: KeyModifiers) -> bool {
    match key {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            if app.exit_pending {
                app.quit();
            } else {
                app.exit_pending = true;
            }
            true
        }
        KeyCode::Esc => {
            if app.show_help {
                app.show_help = false;
            } else if app.show_info {
                app.show_info = false;
            } else {
                app.exit_pending = false;
            }
            true
        }
        KeyCode::Char('h') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.toggle_help();
            true
        }
        KeyCode::Char('i') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.toggle_info();
            true
        }
        KeyCode::Char('q') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.quit();
            true
        }
        _ if app.show_help || app.show_info => true,
        _ => {
            // Any other key cancels pending exit
            app.exit_pending = false;
            false
        }
    }
}

fn handle_keyboard_input(
    app: &mut App,
    key: KeyCode,
    modifiers: KeyModifiers,
    model: &Arc<dyn ImageModel>,
    download_dir: &Path,
    event_tx: &mpsc::UnboundedSender<AppEvent>,
) {
    if handle_global_keys(app, key, modifiers) {
        return;
    }

    match key {
        KeyCode::Char('s') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.save_result(download_dir);
        }
        KeyCode::Tab => app.toggle_focus(),
        KeyCode::F(n @ 1..=5) => app.apply_example_prompt(usize::from(n - 1)),

        KeyCode::Enter => match app.focus {
            Focus::Path => {
                if let Some(path) = app.begin_file_load() {
                    workflow::spawn_load(path, event_tx.clone());
                }
            }
            Focus::Instruction if !app.is_generating => {
                if let Some(job) = app.request_generation() {
                    workflow::spawn_generation(Arc::clone(model), job, event_tx.clone());
                }
            }
            Focus::Instruction => {}
        },

        KeyCode::Backspace => match app.focus {
            Focus::Path => {
                app.path_input.pop();
            }
            Focus::Instruction => app.pop_instruction_char(),
        },
        KeyCode::Char(c) => match app.focus {
            Focus::Path => app.path_input.push(c),
            Focus::Instruction => app.push_instruction_char(c),
        },

        _ => {}
    }
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    model: &Arc<dyn ImageModel>,
    download_dir: &Path,
    event_tx: &mpsc::UnboundedSender<AppEvent>,
    event_rx: &mut mpsc::UnboundedReceiver<AppEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::render(f, app))?;

        // Apply finished workflow results first
        while let Ok(app_event) = event_rx.try_recv() {
            handle_app_event(app, app_event, model, event_tx);
        }

        if event::poll(Duration::from_millis(16))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_keyboard_input(
                        app,
                        key.code,
                        key.modifiers,
                        model,
                        download_dir,
                        event_tx,
                    );
                }
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

pub mod widgets;

use crate::app::App;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

pub fn render(frame: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title
            Constraint::Min(0),    // Panels
            Constraint::Length(1), // Status line
            Constraint::Length(1), // Bottom keymap bar
        ])
        .split(frame.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Path input
            Constraint::Min(0),    // Original image details
            Constraint::Length(10), // Tags
        ])
        .split(columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Instruction
            Constraint::Length(7), // Example prompts
            Constraint::Min(0),    // Result
        ])
        .split(columns[1]);

    widgets::render_title(frame, rows[0]);
    widgets::render_path_input(frame, app, left[0]);
    widgets::render_selection(frame, app, left[1]);
    widgets::render_tags(frame, app, left[2]);
    widgets::render_instruction_input(frame, app, right[0]);
    widgets::render_example_prompts(frame, app, right[1]);
    widgets::render_result(frame, app, right[2]);
    widgets::render_status_bar(frame, app, rows[2]);
    widgets::render_bottom_bar(frame, app, rows[3]);

    if app.show_help {
        widgets::render_help_window(frame, frame.area());
    }

    if app.show_info {
        widgets::render_info_window(frame, app, frame.area());
    }
}

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Focus, EXAMPLE_PROMPTS};

/// Longest slice of the result data URL shown inline.
const PREVIEW_CHARS: usize = 96;

#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f >= KIB * KIB {
        format!("{:.1} MB", bytes_f / (KIB * KIB))
    } else if bytes_f >= KIB {
        format!("{:.1} KB", bytes_f / KIB)
    } else {
        format!("{bytes} B")
    }
}

fn panel(title: &str, focused: bool) -> Block<'_> {
    let color = if focused { Color::Cyan } else { Color::DarkGray };
    Block::default()
        .borders(Borders::ALL)
        .title(format!(" {title} "))
        .border_style(Style::default().fg(color))
}

fn centered_popup(area: Rect, width: u16, height: u16) -> Rect {
    let x = (area.width.saturating_sub(width)) / 2;
    let y = (area.height.saturating_sub(height)) / 2;
    Rect {
        x: area.x + x,
        y: area.y + y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

pub fn render_title(frame: &mut Frame, area: Rect) {
    let title = vec![
        Line::from(Span::styled(
            "AI Photo Studio",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Clean up your product photos with simple text instructions.",
            Style::default().fg(Color::Gray),
        )),
    ];

    frame.render_widget(Paragraph::new(title).alignment(Alignment::Center), area);
}

pub fn render_path_input(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Path;
    let (text, style) = if app.path_input.is_empty() {
        (
            "Type a path to an image and press Enter",
            Style::default().fg(Color::Gray),
        )
    } else {
        (
            app.path_input.as_str(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )
    };

    let title = if app.is_loading_file {
        "Image file [Loading...]"
    } else {
        "Image file"
    };

    let input = Paragraph::new(text)
        .style(style)
        .block(panel(title, focused));

    frame.render_widget(input, area);
}

pub fn render_selection(frame: &mut Frame, app: &App, area: Rect) {
    let lines = app.selection.as_ref().map_or_else(
        || {
            vec![
                Line::from(""),
                Line::from(Span::styled(
                    "No image selected",
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    "PNG, JPG, or WEBP (Max 4MB)",
                    Style::default().fg(Color::DarkGray),
                )),
            ]
        },
        |selection| {
            vec![
                Line::from(vec![
                    Span::raw("File: "),
                    Span::styled(&selection.name, Style::default().fg(Color::Yellow)),
                ]),
                Line::from(vec![
                    Span::raw("Type: "),
                    Span::styled(
                        selection.media_type.mime_type(),
                        Style::default().fg(Color::Blue),
                    ),
                ]),
                Line::from(vec![
                    Span::raw("Size: "),
                    Span::styled(
                        format_size(selection.size()),
                        Style::default().fg(Color::Green),
                    ),
                ]),
            ]
        },
    );

    let paragraph = Paragraph::new(lines)
        .alignment(if app.has_selection() {
            Alignment::Left
        } else {
            Alignment::Center
        })
        .block(panel("Original", false))
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

pub fn render_tags(frame: &mut Frame, app: &App, area: Rect) {
    let lines: Vec<Line> = if app.is_tagging {
        vec![Line::from(Span::styled(
            "Recognizing objects...",
            Style::default().fg(Color::Yellow),
        ))]
    } else if let Some(error) = &app.tagging_error {
        vec![Line::from(Span::styled(
            error.as_str(),
            Style::default().fg(Color::Red),
        ))]
    } else if app.tags.is_empty() {
        vec![Line::from(Span::styled(
            "Tags appear here after upload",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        let spans: Vec<Span> = app
            .tags
            .iter()
            .flat_map(|tag| {
                [
                    Span::styled(format!("#{tag}"), Style::default().fg(Color::Cyan)),
                    Span::raw("  "),
                ]
            })
            .collect();
        vec![Line::from(spans)]
    };

    let paragraph = Paragraph::new(lines)
        .block(panel("Tags", false))
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}

pub fn render_instruction_input(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Instruction;
    let (text, style) = if !app.has_selection() {
        (
            "Upload an image first",
            Style::default().fg(Color::DarkGray),
        )
    } else if app.instruction.is_empty() {
        (
            "e.g., 'Remove the background and add a soft shadow'",
            Style::default().fg(Color::Gray),
        )
    } else {
        (
            app.instruction.as_str(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )
    };

    let input = Paragraph::new(text)
        .style(style)
        .block(panel("Your instruction", focused))
        .wrap(Wrap { trim: false });

    frame.render_widget(input, area);
}

pub fn render_example_prompts(frame: &mut Frame, app: &App, area: Rect) {
    let style = if app.has_selection() {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let lines: Vec<Line> = EXAMPLE_PROMPTS
        .iter()
        .enumerate()
        .map(|(i, prompt)| {
            Line::from(vec![
                Span::styled(format!("F{} ", i + 1), Style::default().fg(Color::Magenta)),
                Span::styled(*prompt, style),
            ])
        })
        .collect();

    frame.render_widget(
        Paragraph::new(lines).block(panel("Examples", false)),
        area,
    );
}

pub fn render_result(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = Vec::new();
    if let Some(error) = &app.error {
        lines.push(Line::from(Span::styled(
            error.as_str(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(""));
    }

    if app.is_generating {
        lines.push(Line::from(Span::styled(
            "AI is working its magic...",
            Style::default().fg(Color::Yellow),
        )));
    } else if let Some(result) = &app.result {
        lines.extend([
            Line::from(vec![
                Span::raw("Generated: "),
                Span::styled(
                    result.created_at.format("%H:%M:%S").to_string(),
                    Style::default().fg(Color::Green),
                ),
                Span::raw(format!("  ({})", format_size(result.byte_len()))),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                result.data_url_preview(PREVIEW_CHARS),
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press Ctrl+S to download as edited-image.png",
                Style::default().fg(Color::Cyan),
            )),
        ]);
    } else if app.error.is_none() {
        lines.push(Line::from(Span::styled(
            "Your edited image will appear here",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(panel("Result", false))
        .wrap(Wrap { trim: false });

    frame.render_widget(paragraph, area);
}

pub fn status_text(app: &App) -> String {
    if let Some(notice) = &app.notice {
        return notice.clone();
    }
    let mut parts = Vec::new();
    if app.is_generating {
        parts.push("Generating...");
    }
    if app.is_tagging {
        parts.push("Tagging...");
    }
    if parts.is_empty() {
        if app.can_generate() {
            "Ready to generate".to_string()
        } else {
            "Idle".to_string()
        }
    } else {
        parts.join(" ")
    }
}

pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let color = if app.is_generating || app.is_tagging {
        Color::Yellow
    } else {
        Color::Green
    };

    let status = Paragraph::new(status_text(app))
        .alignment(Alignment::Right)
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD));

    frame.render_widget(status, area);
}

pub fn render_bottom_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (text, style) = if app.exit_pending {
        (
            "Press Ctrl+C again to exit, Esc to cancel",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    } else {
        (
            "Enter: Load/Generate | Tab: Switch Input | F1-F5: Examples | Ctrl+S: Save | Ctrl+H: Help",
            Style::default().fg(Color::DarkGray),
        )
    };

    let bar = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(style);

    frame.render_widget(bar, area);
}

pub fn render_help_window(frame: &mut Frame, area: Rect) {
    let help_text = vec![
        Line::from(Span::styled(
            "Photo Studio - Keyboard Shortcuts",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled("General:", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  Ctrl+H        - Show/hide this help"),
        Line::from("  Ctrl+I        - Show/hide session info"),
        Line::from("  Ctrl+Q        - Quit application"),
        Line::from("  Ctrl+C        - Quit (press twice)"),
        Line::from(""),
        Line::from(Span::styled("Editing:", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  Tab           - Switch between path and instruction"),
        Line::from("  Enter         - Load image / Generate"),
        Line::from("  F1-F5         - Use an example instruction"),
        Line::from("  Ctrl+S        - Save result as edited-image.png"),
        Line::from(""),
        Line::from(Span::styled(
            "Press Ctrl+H or Esc to close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let help_paragraph = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help ")
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });

    let popup_area = centered_popup(area, 60, 18);
    frame.render_widget(Clear, popup_area);
    frame.render_widget(help_paragraph, popup_area);
}

pub fn render_info_window(frame: &mut Frame, app: &App, area: Rect) {
    let selection = app
        .selection
        .as_ref()
        .map_or_else(|| "none".to_string(), |s| s.id.short());

    let info_text = vec![
        Line::from(Span::styled(
            "Session Information",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::raw("Selection: "),
            Span::styled(selection, Style::default().fg(Color::Yellow)),
        ]),
        Line::from(vec![
            Span::raw("Tags: "),
            Span::styled(app.tags.len().to_string(), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![
            Span::raw("Result: "),
            Span::styled(
                if app.result.is_some() { "ready" } else { "none" },
                Style::default().fg(Color::Blue),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Press Ctrl+I to close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let info_paragraph = Paragraph::new(info_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Info ")
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });

    let popup_area = centered_popup(area, 40, 10);
    frame.render_widget(Clear, popup_area);
    frame.render_widget(info_paragraph, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageFile;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(2 * 1024 * 1024), "2.0 MB");
    }

    #[test]
    fn test_status_text() {
        let mut app = App::new();
        assert_eq!(status_text(&app), "Idle");

        app.handle_upload(ImageFile::new("a.png", "image/png", vec![0]));
        assert_eq!(status_text(&app), "Tagging...");

        app.instruction = "Remove the background".into();
        app.request_generation();
        assert_eq!(status_text(&app), "Generating... Tagging...");

        app.notice = Some("Saved to ./edited-image.png".into());
        assert_eq!(status_text(&app), "Saved to ./edited-image.png");
    }

    #[test]
    fn test_centered_popup_clamps() {
        let area = Rect::new(0, 0, 30, 8);
        let popup = centered_popup(area, 60, 18);
        assert_eq!(popup.width, 30);
        assert_eq!(popup.height, 8);
    }
}

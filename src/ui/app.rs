use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::app_state::{AppState, Region, Thumbnail, UiState, VideoPreview};
use crate::client::{artifact_url, extract_id, format_count};
use crate::thumbnail::{get_loading_ascii, get_sad_face_ascii};
use crate::ui::components::{centered_rect, spinner_frame, validation_color};

const VIDGRAB_ASCII: &str = r#"       _     _                 _
__   _(_) __| | __ _ _ __ __ _| |__
\ \ / / |/ _` |/ _` | '__/ _` | '_ \
 \ V /| | (_| | (_| | | | (_| | |_) |
  \_/ |_|\__,_|\__, |_|  \__,_|_.__/
               |___/"#;

/// Draws whichever regions the controller reports visible
pub struct App {
    api_url: String,
    list_state: ListState,
}

impl App {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            list_state: ListState::default(),
        }
    }

    /// Render the ASCII art header
    fn render_header(&self, f: &mut Frame, area: Rect) {
        let header = Paragraph::new(VIDGRAB_ASCII)
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center);

        f.render_widget(header, area);
    }

    /// Render the complete UI
    pub fn render(&mut self, f: &mut Frame, state: &AppState) {
        let size = f.size();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(6), // ASCII art header
                Constraint::Length(3), // URL form
                Constraint::Min(10),   // Regions
                Constraint::Length(1), // Status bar
            ])
            .split(size);

        self.render_header(f, chunks[0]);
        self.render_input(f, chunks[1], state);

        let main = chunks[2];
        if state.is_visible(Region::Preview) {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(main);

            self.render_preview(f, columns[0], state);
            if state.is_visible(Region::DownloadOptions) {
                self.render_download_options(f, columns[1], state);
            } else {
                self.render_no_formats(f, columns[1]);
            }
        } else if state.is_visible(Region::Success) {
            self.render_success(f, main, state);
        } else {
            self.render_welcome(f, main);
        }

        self.render_status_bar(f, chunks[3], state);

        // Overlays
        if state.is_visible(Region::Loading) {
            self.render_loading_indicator(f, main);
        }
        if state.is_visible(Region::Error) {
            self.render_error_popup(f, size, state);
        }
    }

    /// Render the URL form
    fn render_input(&self, f: &mut Frame, area: Rect, state: &AppState) {
        let input = &state.input;
        let input_style = if input.editing {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };

        let border_style = if input.editing {
            Style::default().fg(validation_color(&input.text))
        } else {
            Style::default()
        };

        let widget = Paragraph::new(input.text.as_str()).style(input_style).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Video URL (i: edit, Enter: fetch preview)")
                .border_style(border_style),
        );

        f.render_widget(widget, area);

        if input.editing && area.width > 2 {
            f.set_cursor(input_cursor_x(area, &input.text), area.y + 1);
        }
    }

    fn render_welcome(&self, f: &mut Frame, area: Rect) {
        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Paste a video link to get started",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "youtube.com/watch?v=…  youtu.be/…  /embed/…  /v/…",
                Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
            )),
        ];

        let welcome = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));

        f.render_widget(welcome, area);
    }

    /// Render preview metadata with the thumbnail beside it
    fn render_preview(&self, f: &mut Frame, area: Rect, state: &AppState) {
        let Some(preview) = &state.preview else {
            return;
        };

        let block = Block::default().title("Preview").borders(Borders::ALL);
        let inner = block.inner(area);
        f.render_widget(block, area);

        let (details_area, thumb_area) = if state.thumbnail == Thumbnail::None {
            (inner, None)
        } else {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(8), Constraint::Min(3)])
                .split(inner);
            (rows[0], Some(rows[1]))
        };

        let details = Paragraph::new(preview_lines(preview, state.preview_url.as_deref()))
            .wrap(Wrap { trim: true });
        f.render_widget(details, details_area);

        if let Some(thumb_area) = thumb_area {
            let art = match &state.thumbnail {
                Thumbnail::Ready(lines) => lines.clone(),
                Thumbnail::Loading => get_loading_ascii(),
                _ => get_sad_face_ascii(),
            };
            let art: Vec<Line> = art.into_iter().map(Line::from).collect();
            let thumbnail = Paragraph::new(art)
                .style(Style::default().fg(Color::Gray))
                .alignment(Alignment::Center);
            f.render_widget(thumbnail, thumb_area);
        }
    }

    /// Render the quality list, selection summary and the confirm control
    fn render_download_options(&mut self, f: &mut Frame, area: Rect, state: &AppState) {
        let block = Block::default()
            .title("Quality")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(2), // Summary
                Constraint::Length(1), // Confirm control
            ])
            .split(inner);

        let items: Vec<ListItem> = state
            .format_rows()
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let marker = if row.selected { "●" } else { "○" };
                let style = if row.selected {
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{} {}. {}", marker, i + 1, row.label), style),
                    Span::styled(format!("  {}", row.size), Style::default().fg(Color::Gray)),
                ]))
            })
            .collect();

        let list = List::new(items)
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol(">> ");
        self.list_state.select(state.selected_index());
        f.render_stateful_widget(list, rows[0], &mut self.list_state);

        if let Some((quality, size)) = state.selection_summary() {
            let summary = Paragraph::new(vec![
                Line::from(Span::styled(quality, Style::default().fg(Color::Cyan))),
                Line::from(Span::styled(size, Style::default().fg(Color::Cyan))),
            ]);
            f.render_widget(summary, rows[1]);
        }

        let button = if state.download_busy {
            Paragraph::new(format!(
                "{} Downloading...",
                spinner_frame(now_millis())
            ))
            .style(Style::default().fg(Color::DarkGray))
        } else {
            Paragraph::new("[ Enter: Download ]")
                .style(Style::default().fg(Color::Black).bg(Color::Green))
        };
        f.render_widget(button.alignment(Alignment::Center), rows[2]);
    }

    fn render_no_formats(&self, f: &mut Frame, area: Rect) {
        let message = Paragraph::new("No downloadable formats were returned for this video")
            .style(Style::default().fg(Color::Gray))
            .wrap(Wrap { trim: true })
            .block(Block::default().title("Quality").borders(Borders::ALL));
        f.render_widget(message, area);
    }

    /// Render the finished download with its retrieval link
    fn render_success(&self, f: &mut Frame, area: Rect, state: &AppState) {
        let UiState::Success(filename) = &state.ui else {
            return;
        };

        let label = Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan);
        let mut lines = vec![
            Line::from(Span::styled(
                "✔ Download ready",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];
        match filename {
            Some(filename) => {
                lines.push(Line::from(vec![
                    Span::styled("File: ", label),
                    Span::raw(filename.as_str()),
                ]));
                lines.push(Line::from(vec![
                    Span::styled("Link: ", label),
                    Span::raw(artifact_url(&self.api_url, filename)),
                ]));
            }
            None => lines.push(Line::from(Span::styled(
                "The server did not report a file name, so there is nothing to fetch.",
                Style::default().fg(Color::Gray),
            ))),
        }

        if let Some(notice) = &state.notice {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                notice.as_str(),
                Style::default().fg(Color::Yellow),
            )));
        }

        let success = Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title("Done")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Green)),
            );
        f.render_widget(success, area);
    }

    /// Render the status bar
    fn render_status_bar(&self, f: &mut Frame, area: Rect, state: &AppState) {
        let help_text = if state.input.editing {
            "Enter: fetch preview | ESC: leave field | Ctrl+C: quit"
        } else {
            match &state.ui {
                UiState::Idle => "i: enter URL | q: quit",
                UiState::Loading => "Fetching preview... | x: cancel | q: quit",
                UiState::PreviewShown => "i: new URL | x: reset | q: quit",
                UiState::DownloadReady if state.download_busy => "Waiting for the server... | x: cancel",
                UiState::DownloadReady => "↑/↓ or 1-9: quality | Enter: download | x: reset | q: quit",
                UiState::Error(_) => "r/Enter: retry | x: reset | q: quit",
                UiState::Success(Some(_)) => "s: save locally | i: new URL | x: reset | q: quit",
                UiState::Success(None) => "i: new URL | x: reset | q: quit",
            }
        };

        let status = Paragraph::new(help_text)
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Left);
        f.render_widget(status, area);

        let info = format!(" {} ", self.api_url);
        let info_width = info.chars().count() as u16;
        let info_area = Rect {
            x: area.x + area.width.saturating_sub(info_width),
            y: area.y,
            width: info_width.min(area.width),
            height: area.height,
        };
        f.render_widget(
            Paragraph::new(info)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Right),
            info_area,
        );
    }

    /// Render error popup
    fn render_error_popup(&self, f: &mut Frame, area: Rect, state: &AppState) {
        let UiState::Error(message) = &state.ui else {
            return;
        };
        let popup_area = centered_rect(60, 25, area);

        // Clear background
        f.render_widget(Clear, popup_area);

        let error_text = Paragraph::new(message.as_str())
            .block(
                Block::default()
                    .title("Error")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red)),
            )
            .wrap(Wrap { trim: true })
            .alignment(Alignment::Center);
        f.render_widget(error_text, popup_area);

        if popup_area.height > 3 {
            let help_area = Rect {
                x: popup_area.x + 1,
                y: popup_area.y + popup_area.height - 2,
                width: popup_area.width.saturating_sub(2),
                height: 1,
            };
            let help = Paragraph::new("r: retry | x: start over")
                .style(Style::default().fg(Color::Gray))
                .alignment(Alignment::Center);
            f.render_widget(help, help_area);
        }
    }

    /// Render loading indicator
    fn render_loading_indicator(&self, f: &mut Frame, area: Rect) {
        let popup_area = centered_rect(50, 30, area);

        // Clear background
        f.render_widget(Clear, popup_area);

        let loading_text = format!("{} Fetching video information...", spinner_frame(now_millis()));
        let loading_widget = Paragraph::new(loading_text)
            .block(
                Block::default()
                    .title("Loading")
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .wrap(Wrap { trim: true })
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Yellow));

        f.render_widget(loading_widget, popup_area);
    }
}

fn preview_lines<'a>(preview: &'a VideoPreview, url: Option<&str>) -> Vec<Line<'a>> {
    let label = Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan);
    let count = |n: Option<u64>| n.map(format_count).unwrap_or_else(|| "-".to_string());

    let mut lines = vec![
        Line::from(vec![Span::styled("Title: ", label), Span::raw(preview.title.as_str())]),
        Line::from(vec![Span::styled("Uploader: ", label), Span::raw(preview.uploader.as_str())]),
        Line::from(vec![Span::styled("Duration: ", label), Span::raw(preview.duration.as_str())]),
        Line::from(vec![
            Span::styled("Views: ", label),
            Span::raw(count(preview.view_count)),
            Span::raw("   "),
            Span::styled("Likes: ", label),
            Span::raw(count(preview.like_count)),
        ]),
    ];

    if let Some(id) = url.and_then(extract_id) {
        lines.push(Line::from(vec![Span::styled("Video ID: ", label), Span::raw(id)]));
    }

    lines
}

/// Cursor column after the typed text, kept inside the field's borders
fn input_cursor_x(area: Rect, text: &str) -> u16 {
    let typed = u16::try_from(text.chars().count()).unwrap_or(u16::MAX);
    let last = area.x.saturating_add(area.width.saturating_sub(2));
    area.x.saturating_add(1).saturating_add(typed).min(last)
}

fn now_millis() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::events::{Effect, Event};
    use crate::app_state::{Controller, DownloadResult, FormatOption};
    use ratatui::{Terminal, backend::TestBackend};

    fn draw(state: &AppState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 36)).unwrap();
        let mut app = App::new("http://127.0.0.1:8000");
        terminal.draw(|f| app.render(f, state)).unwrap();

        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer.get(x, y).symbol());
            }
            text.push('\n');
        }
        text
    }

    fn loaded_controller() -> Controller {
        let mut controller = Controller::new(false);
        let effects = controller.handle(Event::Submit("https://youtu.be/dQw4w9WgXcQ".to_string()));
        let Some(Effect::FetchPreview { seq, .. }) = effects.first() else {
            panic!("Expected FetchPreview");
        };
        controller.handle(Event::PreviewLoaded {
            seq: *seq,
            preview: VideoPreview {
                title: "Never Gonna Give You Up".to_string(),
                uploader: "Rick Astley".to_string(),
                duration: "3:33".to_string(),
                view_count: Some(1_500_000_000),
                like_count: Some(2_300_000),
                thumbnail_url: String::new(),
                formats: vec![
                    FormatOption {
                        quality_label: "1080p".to_string(),
                        format_id: "f1".to_string(),
                        file_size: "50MB".to_string(),
                    },
                    FormatOption {
                        quality_label: "720p".to_string(),
                        format_id: "f2".to_string(),
                        file_size: "30MB".to_string(),
                    },
                ],
            },
        });
        controller
    }

    #[test]
    fn test_renders_preview_and_selection_summary() {
        let controller = loaded_controller();
        let screen = draw(controller.state());

        assert!(screen.contains("Never Gonna Give You Up"));
        assert!(screen.contains("1.5B"));
        assert!(screen.contains("2.3M"));
        assert!(screen.contains("Video ID: dQw4w9WgXcQ"));
        assert!(screen.contains("Quality: 1080p"));
        assert!(screen.contains("Size: 50MB"));
        assert!(screen.contains("Enter: Download"));
        assert!(!screen.contains("Error"));
    }

    #[test]
    fn test_busy_download_disables_confirm() {
        let mut controller = loaded_controller();
        controller.handle(Event::ConfirmDownload);
        let screen = draw(controller.state());

        assert!(screen.contains("Downloading..."));
        assert!(!screen.contains("Enter: Download"));
    }

    #[test]
    fn test_renders_success_with_link() {
        let mut controller = loaded_controller();
        let effects = controller.handle(Event::ConfirmDownload);
        let Some(Effect::StartDownload { seq, .. }) = effects.first() else {
            panic!("Expected StartDownload");
        };
        controller.handle(Event::DownloadFinished {
            seq: *seq,
            result: DownloadResult {
                success: true,
                filename: Some("rick roll.mp4".to_string()),
                message: None,
            },
        });
        let screen = draw(controller.state());

        assert!(screen.contains("Download ready"));
        assert!(screen.contains("http://127.0.0.1:8000/downloads/rick%20roll.mp4"));
        assert!(!screen.contains("Quality: 1080p"));
    }

    #[test]
    fn test_renders_error_popup() {
        let mut controller = Controller::new(false);
        controller.handle(Event::Submit("https://vimeo.com/123".to_string()));
        let screen = draw(controller.state());

        assert!(screen.contains("Please enter a valid video URL"));
        assert!(screen.contains("r: retry"));
    }

    #[test]
    fn test_success_without_filename_has_no_link() {
        let mut controller = loaded_controller();
        let effects = controller.handle(Event::ConfirmDownload);
        let Some(Effect::StartDownload { seq, .. }) = effects.first() else {
            panic!("Expected StartDownload");
        };
        controller.handle(Event::DownloadFinished {
            seq: *seq,
            result: DownloadResult {
                success: true,
                filename: None,
                message: None,
            },
        });
        let screen = draw(controller.state());

        assert!(screen.contains("Download ready"));
        assert!(!screen.contains("/downloads/"));
        assert!(!screen.contains("s: save"));
    }

    #[test]
    fn test_cursor_stays_inside_the_field() {
        let area = Rect::new(0, 6, 40, 3);
        assert_eq!(input_cursor_x(area, ""), 1);
        assert_eq!(input_cursor_x(area, "abc"), 4);
        assert_eq!(input_cursor_x(area, &"x".repeat(100_000)), 38);

        let far = Rect::new(u16::MAX - 10, 0, 10, 3);
        assert_eq!(input_cursor_x(far, &"x".repeat(50)), u16::MAX - 2);
    }

    #[test]
    fn test_long_paste_renders() {
        let mut controller = Controller::new(false);
        let input = controller.input_mut();
        input.editing = true;
        input.text = format!("https://youtu.be/{}", "a".repeat(70_000));
        draw(controller.state());
    }
}

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthChar;

use crate::core::message::Message;
use crate::core::session::{SessionController, SessionStatus, ERROR_PREFIX};
use crate::ui::theme::{Theme, ThemeState};

pub const APP_TITLE: &str = "💬 Business Chatbot";
const PLACEHOLDER: &str = "Ask me anything!";
const TYPING_INDICATOR: &str = "Bot is typing...";
const USER_PREFIX: &str = "You: ";
const BOT_PREFIX: &str = "Bot: ";

pub struct ChatView<'a> {
    pub session: &'a SessionController,
    pub theme: &'a ThemeState,
    /// Rows scrolled up from the bottom of the transcript.
    pub scroll_from_bottom: u16,
}

pub fn build_display_lines<'a>(
    messages: &'a [Message],
    status: SessionStatus,
    theme: &Theme,
) -> Vec<Line<'a>> {
    let mut lines = Vec::new();

    if messages.is_empty() && status == SessionStatus::Idle {
        lines.push(Line::from(Span::styled(PLACEHOLDER, theme.placeholder_style)).centered());
        return lines;
    }

    for msg in messages {
        let (prefix, prefix_style, text_style) = if msg.is_user() {
            (USER_PREFIX, theme.user_prefix_style, theme.user_text_style)
        } else if msg.content.starts_with(ERROR_PREFIX) {
            (BOT_PREFIX, theme.bot_prefix_style, theme.error_text_style)
        } else {
            (BOT_PREFIX, theme.bot_prefix_style, theme.bot_text_style)
        };

        let mut content_lines = msg.content.lines();
        let first = content_lines.next().unwrap_or("");
        lines.push(Line::from(vec![
            Span::styled(prefix, prefix_style),
            Span::styled(first, text_style),
        ]));
        let indent = " ".repeat(prefix.len());
        for content_line in content_lines {
            lines.push(Line::from(vec![
                Span::raw(indent.clone()),
                Span::styled(content_line, text_style),
            ]));
        }
        lines.push(Line::from(""));
    }

    if status == SessionStatus::Awaiting {
        lines.push(Line::from(Span::styled(
            TYPING_INDICATOR,
            theme.typing_indicator_style,
        )));
    }

    lines
}

fn transcript_paragraph<'a>(lines: Vec<Line<'a>>) -> Paragraph<'a> {
    Paragraph::new(lines).wrap(Wrap { trim: false })
}

/// Rows the lines occupy once word-wrapped to `width` columns, counted by
/// the same wrapper that draws the transcript.
pub fn wrapped_height(lines: &[Line<'_>], width: u16) -> u16 {
    rendered_rows(&transcript_paragraph(lines.to_vec()), width)
}

fn rendered_rows(paragraph: &Paragraph<'_>, width: u16) -> u16 {
    u16::try_from(paragraph.line_count(width.max(1))).unwrap_or(u16::MAX)
}

/// The end of `input` that fits in `max_width` columns.
fn visible_input_tail(input: &str, max_width: usize) -> (&str, usize) {
    let mut used = 0;
    let mut start = input.len();
    for (idx, ch) in input.char_indices().rev() {
        let w = ch.width().unwrap_or(0);
        if used + w > max_width {
            break;
        }
        used += w;
        start = idx;
    }
    (&input[start..], used)
}

fn split_screen(area: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2]]
}

/// Largest useful `scroll_from_bottom` for the current transcript and area.
pub fn max_scroll(view: &ChatView<'_>, area: Rect) -> u16 {
    let [_, transcript_area, _] = split_screen(area);
    let lines = build_display_lines(
        view.session.messages(),
        view.session.status(),
        view.theme.theme(),
    );
    wrapped_height(&lines, transcript_area.width).saturating_sub(transcript_area.height)
}

pub fn ui(f: &mut Frame, view: &ChatView<'_>) {
    let theme = view.theme.theme();
    let area = f.area();
    f.render_widget(
        Block::default().style(Style::default().bg(theme.background_color)),
        area,
    );

    let [title_area, transcript_area, input_area] = split_screen(area);

    let title = Line::from(vec![
        Span::styled(APP_TITLE, theme.title_style),
        Span::styled(
            format!("  •  {} (Ctrl+T)", view.theme.mode().label()),
            theme.input_title_style,
        ),
    ])
    .centered();
    f.render_widget(Paragraph::new(title), title_area);

    let lines = build_display_lines(view.session.messages(), view.session.status(), theme);
    let transcript = transcript_paragraph(lines);
    let total_rows = rendered_rows(&transcript, transcript_area.width);
    let bottom_offset = total_rows.saturating_sub(transcript_area.height);
    let scroll_offset = bottom_offset.saturating_sub(view.scroll_from_bottom);
    let transcript = transcript.scroll((scroll_offset, 0));
    f.render_widget(transcript, transcript_area);

    let idle = view.session.is_idle();
    let input_title = if idle {
        "Type your message here... (Enter send • Ctrl+N new chat • Ctrl+C quit)"
    } else {
        "Sending..."
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.input_border_style)
        .title(Span::styled(input_title, theme.input_title_style));

    let inner_width = usize::from(input_area.width.saturating_sub(2));
    let (visible, used) = visible_input_tail(view.session.input(), inner_width.saturating_sub(1));
    let input_style = if idle {
        theme.input_text_style
    } else {
        theme.input_disabled_style
    };
    f.render_widget(
        Paragraph::new(Span::styled(visible, input_style)).block(input_block),
        input_area,
    );

    if idle {
        let cursor_x = input_area.x + 1 + u16::try_from(used).unwrap_or(0);
        f.set_cursor_position((cursor_x, input_area.y + 1));
    }
}

use crate::types::{Reaction, Role, Turn};
use crate::ui::input_metrics::{
    char_display_width, cursor_row_col, truncate_to_display_width, wrap_input_lines,
};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Paragraph, Wrap},
    Frame,
};

/// The screen regions of the chat view: one status row on top, the input
/// anchored at the bottom growing with its wrapped rows, the transcript
/// taking whatever remains.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChatLayout {
    pub status: Rect,
    pub transcript: Rect,
    pub input: Rect,
}

impl ChatLayout {
    pub fn of(area: Rect, input_rows: u16) -> Self {
        // The input never collapses, and never squeezes the transcript out
        // entirely however long the draft is.
        let input_rows = input_rows.clamp(1, area.height.saturating_sub(2).max(1));
        let [status, transcript, input] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(input_rows),
        ])
        .areas(area);
        Self {
            status,
            transcript,
            input,
        }
    }
}

const WELCOME: &str = "\
gazel, a chat client for a vision model backend

  type a prompt and press enter to send
  /url <image-url> <prompt>    ask about an image by URL
  /image <path> <prompt>       ask about a local image
  /regen [n]                   regenerate an answer
  /edit <n> <text>             rewrite a turn
  /delete <n>                  remove a turn
  /like <n>  /dislike <n>      react to a turn
  /clear                       wipe the transcript
  /health                      probe the backend
  /quit                        exit (esc cancels a stream)";

/// Flatten the transcript into display lines. Positions are recomputed on
/// every frame, so the `[n]` labels always match the current store layout.
pub fn transcript_lines(turns: &[Turn]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (index, turn) in turns.iter().enumerate() {
        lines.push(turn_header(index, turn));
        if turn.content.is_empty() && turn.streaming {
            lines.push(Line::styled(
                "  …",
                Style::default().fg(Color::DarkGray),
            ));
        }
        for content_line in turn.content.lines() {
            lines.push(Line::from(format!("  {content_line}")));
        }
        lines.push(Line::from(""));
    }
    lines
}

fn turn_header(index: usize, turn: &Turn) -> Line<'static> {
    let name = match turn.role {
        Role::User => "you",
        Role::Assistant => "gazel",
    };
    let mut header = format!("[{index}] {name}");
    if let Some(image) = &turn.image {
        header.push_str(&format!("  (image: {image})"));
    }
    match turn.reaction {
        Some(Reaction::Like) => header.push_str("  +1"),
        Some(Reaction::Dislike) => header.push_str("  -1"),
        None => {}
    }
    if turn.streaming {
        header.push_str("  ⋯");
    }

    let color = match turn.role {
        Role::User => Color::Cyan,
        Role::Assistant => Color::Green,
    };
    Line::styled(header, Style::default().fg(color).add_modifier(Modifier::BOLD))
}

/// Render the transcript pane. `scroll` of `None` follows the bottom.
pub fn render_transcript(
    frame: &mut Frame<'_>,
    area: Rect,
    lines: Vec<Line<'static>>,
    scroll: Option<usize>,
) {
    if area.height == 0 || area.width == 0 {
        return;
    }

    if lines.is_empty() {
        frame.render_widget(
            Paragraph::new(WELCOME).style(Style::default().fg(Color::DarkGray)),
            area,
        );
        return;
    }

    let offset = resolve_scroll(lines.len(), area.height as usize, scroll);

    let paragraph = Paragraph::new(lines)
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));
    frame.render_widget(paragraph, area);
}

/// Clamp a scroll request to the renderable range. `None` follows the
/// bottom. The widget scroll is u16, so transcripts past 65535 display
/// lines saturate instead of wrapping back to the top.
fn resolve_scroll(total_lines: usize, viewport: usize, scroll: Option<usize>) -> u16 {
    let bottom = total_lines.saturating_sub(viewport);
    let offset = scroll.map_or(bottom, |s| s.min(bottom));
    u16::try_from(offset).unwrap_or(u16::MAX)
}

pub fn render_status_line(frame: &mut Frame<'_>, area: Rect, status: &str) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let text = truncate_line(status, area.width as usize);
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

pub fn input_visual_rows(input: &str, width: usize) -> usize {
    wrap_input_lines(input, width).len().max(1)
}

pub fn render_input(frame: &mut Frame<'_>, area: Rect, input: &str, cursor_byte: usize) {
    if area.height == 0 || area.width <= 2 {
        return;
    }

    let input_width = area.width.saturating_sub(2).max(1) as usize;
    let lines = wrap_input_lines(input, input_width);
    let (cursor_row, cursor_col) = cursor_row_col(input, cursor_byte, input_width);
    let visible_rows = area.height as usize;
    let window_start = cursor_row.saturating_add(1).saturating_sub(visible_rows);

    let mut rendered = Vec::with_capacity(visible_rows);
    for offset in 0..visible_rows {
        let row_index = window_start + offset;
        let prefix = if row_index == 0 { "> " } else { "  " };
        let line = lines.get(row_index).cloned().unwrap_or_default();
        rendered.push(Line::from(format!("{prefix}{line}")));
    }

    frame.render_widget(
        Paragraph::new(rendered)
            .style(Style::default().fg(Color::Gray))
            .wrap(Wrap { trim: false }),
        area,
    );

    let cursor_y = area
        .y
        .saturating_add(cursor_row.saturating_sub(window_start) as u16);
    let cursor_x = area
        .x
        .saturating_add(2 + cursor_col as u16)
        .min(area.x.saturating_add(area.width.saturating_sub(1)));
    frame.set_cursor_position((cursor_x, cursor_y));
}

fn truncate_line(input: &str, width: usize) -> String {
    let width = width.max(1);
    let mut used = 0usize;
    let mut out = String::new();
    let mut truncated = false;

    for ch in input.chars() {
        let ch_width = char_display_width(ch);
        if used + ch_width > width {
            truncated = true;
            break;
        }
        out.push(ch);
        used += ch_width;
    }

    if truncated && width >= 4 {
        out = truncate_to_display_width(&out, width - 3);
        out.push_str("...");
    }
    out
}

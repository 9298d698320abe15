use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use gazel::app::App;
use gazel::config::Config;
use gazel::logging;
use gazel::terminal::{ChatTerminal, TerminalGuard};
use gazel::ui::render::{
    input_visual_rows, render_input, render_status_line, render_transcript, transcript_lines,
    ChatLayout,
};
use ratatui::layout::Rect;
use ratatui::widgets::Clear;
use std::time::Duration;

#[derive(Default)]
struct InputEditor {
    buffer: String,
    cursor: usize,
}

impl InputEditor {
    fn clamp_cursor_to_boundary_left(&self, mut idx: usize) -> usize {
        idx = idx.min(self.buffer.len());
        while idx > 0 && !self.buffer.is_char_boundary(idx) {
            idx -= 1;
        }
        idx
    }

    fn prev_char_boundary(&self, idx: usize) -> usize {
        let i = self.clamp_cursor_to_boundary_left(idx);
        if i == 0 {
            return 0;
        }
        let mut j = i - 1;
        while j > 0 && !self.buffer.is_char_boundary(j) {
            j -= 1;
        }
        j
    }

    fn next_char_boundary(&self, idx: usize) -> usize {
        let i = self.clamp_cursor_to_boundary_left(idx);
        if i >= self.buffer.len() {
            return self.buffer.len();
        }
        match self.buffer[i..].chars().next() {
            Some(ch) => i + ch.len_utf8(),
            None => self.buffer.len(),
        }
    }

    fn insert_str(&mut self, value: &str) {
        let cursor = self.clamp_cursor_to_boundary_left(self.cursor);
        self.buffer.insert_str(cursor, value);
        self.cursor = cursor + value.len();
    }

    fn backspace(&mut self) {
        let end = self.clamp_cursor_to_boundary_left(self.cursor);
        if end == 0 {
            return;
        }
        let start = self.prev_char_boundary(end);
        self.buffer.replace_range(start..end, "");
        self.cursor = start;
    }

    fn delete(&mut self) {
        let start = self.clamp_cursor_to_boundary_left(self.cursor);
        if start >= self.buffer.len() {
            return;
        }
        let end = self.next_char_boundary(start);
        self.buffer.replace_range(start..end, "");
        self.cursor = start;
    }

    fn submit(&mut self) -> Option<String> {
        let value = self.buffer.trim().to_string();
        self.buffer.clear();
        self.cursor = 0;
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

enum KeyOutcome {
    None,
    Submit(String),
    Interrupt,
    Quit,
}

fn handle_key(app: &mut App, editor: &mut InputEditor, key: KeyEvent) -> KeyOutcome {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            KeyOutcome::Interrupt
        }
        KeyCode::Esc => KeyOutcome::Interrupt,
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if editor.buffer.is_empty() {
                KeyOutcome::Quit
            } else {
                KeyOutcome::None
            }
        }
        KeyCode::Char('j') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            editor.insert_str("\n");
            KeyOutcome::None
        }
        KeyCode::Up => {
            app.scroll_up(1);
            KeyOutcome::None
        }
        KeyCode::Down => {
            app.scroll_down(1);
            KeyOutcome::None
        }
        KeyCode::PageUp => {
            app.scroll_up(10);
            KeyOutcome::None
        }
        KeyCode::PageDown => {
            app.scroll_down(10);
            KeyOutcome::None
        }
        KeyCode::Home if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_home();
            KeyOutcome::None
        }
        KeyCode::End if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_end();
            KeyOutcome::None
        }
        KeyCode::Home => {
            editor.cursor = 0;
            KeyOutcome::None
        }
        KeyCode::End => {
            editor.cursor = editor.buffer.len();
            KeyOutcome::None
        }
        KeyCode::Left => {
            editor.cursor = editor.prev_char_boundary(editor.cursor);
            KeyOutcome::None
        }
        KeyCode::Right => {
            editor.cursor = editor.next_char_boundary(editor.cursor);
            KeyOutcome::None
        }
        KeyCode::Backspace => {
            editor.backspace();
            KeyOutcome::None
        }
        KeyCode::Delete => {
            editor.delete();
            KeyOutcome::None
        }
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {
            editor.insert_str("\n");
            KeyOutcome::None
        }
        KeyCode::Enter => match editor.submit() {
            Some(line) => KeyOutcome::Submit(line),
            None => KeyOutcome::None,
        },
        KeyCode::Char(ch)
            if !key.modifiers.contains(KeyModifiers::CONTROL)
                && !key.modifiers.contains(KeyModifiers::ALT) =>
        {
            editor.insert_str(&ch.to_string());
            KeyOutcome::None
        }
        _ => KeyOutcome::None,
    }
}

fn draw(terminal: &mut ChatTerminal, app: &mut App, editor: &InputEditor) -> Result<()> {
    let size = terminal.size()?;
    let area = Rect::new(0, 0, size.width, size.height);
    let input_width = area.width.saturating_sub(2).max(1) as usize;
    let input_rows = input_visual_rows(&editor.buffer, input_width).max(1) as u16;
    let panes = ChatLayout::of(area, input_rows);

    let turns = app.turns_snapshot();
    let lines = transcript_lines(&turns);
    app.set_scroll_bottom(lines.len().saturating_sub(panes.transcript.height as usize));

    let status = app.status_line();
    let scroll = app.scroll_offset();

    terminal.draw(|frame| {
        frame.render_widget(Clear, frame.area());
        render_status_line(frame, panes.status, &status);
        render_transcript(frame, panes.transcript, lines, scroll);
        render_input(frame, panes.input, &editor.buffer, editor.cursor);
    })?;
    Ok(())
}

async fn run(terminal: &mut ChatTerminal, app: &mut App) -> Result<()> {
    let mut editor = InputEditor::default();

    loop {
        app.drain_updates();
        draw(terminal, app, &editor)?;
        if app.should_quit() {
            return Ok(());
        }

        if !event::poll(Duration::from_millis(16))? {
            continue;
        }
        match event::read()? {
            Event::Key(key) => {
                if key.kind == KeyEventKind::Release {
                    continue;
                }
                match handle_key(app, &mut editor, key) {
                    KeyOutcome::None => {}
                    KeyOutcome::Submit(line) => app.submit(&line).await,
                    KeyOutcome::Interrupt => app.interrupt().await,
                    KeyOutcome::Quit => return Ok(()),
                }
            }
            Event::Paste(text) => {
                // Terminal escape sequences in a paste mean bracketed paste
                // got confused; drop it rather than corrupt the buffer.
                if !text.contains('\u{1b}') {
                    editor.insert_str(&text);
                }
            }
            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;
    logging::init(config.log_file.as_deref())?;

    let mut app = App::new(&config);
    let mut terminal = TerminalGuard::acquire()?;
    let result = run(&mut terminal, &mut app).await;
    app.shutdown().await;
    drop(terminal);
    result
}

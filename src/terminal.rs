use anyhow::Result;
use crossterm::{
    cursor::Show,
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::ops::{Deref, DerefMut};
use std::sync::Once;

pub type ChatTerminal = Terminal<CrosstermBackend<Stdout>>;

static RESTORE_HOOK: Once = Once::new();

/// Owns the raw-mode alternate screen for the lifetime of the chat loop.
/// The screen is restored on drop and from the panic hook, so a crash
/// mid-stream never leaves the shell in raw mode.
pub struct TerminalGuard {
    terminal: ChatTerminal,
}

impl TerminalGuard {
    pub fn acquire() -> Result<Self> {
        RESTORE_HOOK.call_once(|| {
            let previous = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                restore_screen();
                previous(info);
            }));
        });

        enable_raw_mode()?;
        // Bracketed paste keeps multi-line prompts out of the key handler.
        execute!(io::stdout(), EnterAlternateScreen, EnableBracketedPaste)?;

        let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        terminal.clear()?;
        Ok(Self { terminal })
    }
}

impl Deref for TerminalGuard {
    type Target = ChatTerminal;

    fn deref(&self) -> &ChatTerminal {
        &self.terminal
    }
}

impl DerefMut for TerminalGuard {
    fn deref_mut(&mut self) -> &mut ChatTerminal {
        &mut self.terminal
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_screen();
    }
}

fn restore_screen() {
    let _ = disable_raw_mode();
    let _ = execute!(
        io::stdout(),
        LeaveAlternateScreen,
        DisableBracketedPaste,
        Show
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_screen_is_idempotent() {
        // Restoring twice (drop after a panic-hook restore) must not fail.
        restore_screen();
        restore_screen();
    }
}

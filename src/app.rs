use crate::api::ApiClient;
use crate::config::Config;
use crate::session::{SessionManager, SessionUpdate};
use crate::state::SharedTranscript;
use crate::types::{ImageRef, Reaction, SendRequest, Turn, TurnId};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tokio::sync::mpsc;

/// One parsed input line. Indices refer to current transcript positions as
/// rendered, and are resolved to stable turn ids at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(SendRequest),
    SendImageFile { path: String, prompt: String },
    Regenerate(Option<usize>),
    Edit { index: usize, content: String },
    Delete(usize),
    React { index: usize, reaction: Reaction },
    Clear,
    Health,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    if !line.starts_with('/') {
        return Ok(Command::Send(SendRequest::text(line)));
    }

    let mut parts = line.splitn(2, ' ');
    let head = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default().trim();

    match head {
        "/url" => {
            let (url, prompt) = split_arg(rest)
                .context("usage: /url <image-url> <prompt>")?;
            Ok(Command::Send(SendRequest::with_image(
                prompt,
                ImageRef::Url(url.to_string()),
            )))
        }
        "/image" => {
            let (path, prompt) = split_arg(rest)
                .context("usage: /image <path> <prompt>")?;
            Ok(Command::SendImageFile {
                path: path.to_string(),
                prompt: prompt.to_string(),
            })
        }
        "/regen" => {
            if rest.is_empty() {
                Ok(Command::Regenerate(None))
            } else {
                Ok(Command::Regenerate(Some(parse_index(rest)?)))
            }
        }
        "/edit" => {
            let (index, content) = split_arg(rest).context("usage: /edit <n> <text>")?;
            Ok(Command::Edit {
                index: parse_index(index)?,
                content: content.to_string(),
            })
        }
        "/delete" => Ok(Command::Delete(parse_index(rest)?)),
        "/like" => Ok(Command::React {
            index: parse_index(rest)?,
            reaction: Reaction::Like,
        }),
        "/dislike" => Ok(Command::React {
            index: parse_index(rest)?,
            reaction: Reaction::Dislike,
        }),
        "/clear" => Ok(Command::Clear),
        "/health" => Ok(Command::Health),
        "/quit" | "/q" => Ok(Command::Quit),
        other => bail!("unknown command '{other}'"),
    }
}

fn split_arg(rest: &str) -> Option<(&str, &str)> {
    let mut parts = rest.splitn(2, ' ');
    let first = parts.next().filter(|s| !s.is_empty())?;
    let second = parts.next().map(str::trim).filter(|s| !s.is_empty())?;
    Some((first, second))
}

fn parse_index(text: &str) -> Result<usize> {
    text.trim()
        .parse::<usize>()
        .with_context(|| format!("'{}' is not a turn number", text.trim()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamPhase {
    Idle,
    Sending,
    Streaming,
}

/// UI-side state: owns the session manager and the update channel, turns
/// input lines into engine operations, and carries the transient status
/// banner and scroll position.
pub struct App {
    manager: SessionManager,
    transcript: SharedTranscript,
    update_rx: mpsc::UnboundedReceiver<SessionUpdate>,
    banner: Option<String>,
    phase: StreamPhase,
    scroll: Option<usize>,
    scroll_bottom: usize,
    quit: bool,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let client = ApiClient::new(config);
        Self::with_client(client)
    }

    pub fn with_client(client: ApiClient) -> Self {
        let transcript = SharedTranscript::new();
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let manager = SessionManager::new(client, transcript.clone(), update_tx);
        Self {
            manager,
            transcript,
            update_rx,
            banner: None,
            phase: StreamPhase::Idle,
            scroll: None,
            scroll_bottom: 0,
            quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn is_streaming(&self) -> bool {
        self.manager.is_streaming()
    }

    pub fn turns_snapshot(&self) -> Vec<Turn> {
        self.transcript.lock().turns().to_vec()
    }

    pub fn status_line(&self) -> String {
        let mode = match self.phase {
            StreamPhase::Idle => "ready",
            StreamPhase::Sending => "sending",
            StreamPhase::Streaming => "streaming",
        };
        let turns = self.transcript.lock().len();
        match &self.banner {
            Some(banner) => format!(" gazel | {mode} | {turns} turns | {banner}"),
            None => format!(" gazel | {mode} | {turns} turns"),
        }
    }

    pub async fn submit(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        let result = match parse_command(line) {
            Ok(command) => self.dispatch(command).await,
            Err(error) => Err(error),
        };
        if let Err(error) = result {
            self.banner = Some(format!("error: {error}"));
        }
    }

    async fn dispatch(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Send(request) => {
                self.banner = None;
                self.scroll = None;
                self.manager.start(request).await
            }
            Command::SendImageFile { path, prompt } => {
                let data = std::fs::read(&path)
                    .with_context(|| format!("cannot read image '{path}'"))?;
                self.banner = None;
                self.scroll = None;
                self.manager
                    .start(SendRequest::with_image(
                        prompt,
                        ImageRef::Bytes {
                            data,
                            path: PathBuf::from(path),
                        },
                    ))
                    .await
            }
            Command::Regenerate(index) => {
                let index = match index {
                    Some(index) => index,
                    None => self
                        .last_assistant_index()
                        .context("no assistant turn to regenerate")?,
                };
                self.banner = None;
                self.scroll = None;
                self.manager.regenerate(index).await
            }
            Command::Edit { index, content } => {
                let id = self.id_at(index)?;
                self.transcript.lock().edit(id, content)
            }
            Command::Delete(index) => {
                let id = self.id_at(index)?;
                let mut transcript = self.transcript.lock();
                let turn = transcript.find(id).context("turn disappeared")?;
                if turn.streaming {
                    bail!("turn {index} is still streaming; cancel first (esc)");
                }
                transcript.remove(id);
                Ok(())
            }
            Command::React { index, reaction } => {
                let id = self.id_at(index)?;
                self.transcript.lock().set_reaction(id, reaction)
            }
            Command::Clear => {
                self.banner = None;
                self.scroll = None;
                self.manager.clear().await;
                Ok(())
            }
            Command::Health => {
                match self.manager.client().health().await {
                    Ok(health) => {
                        self.banner = Some(format!(
                            "backend: {} | ollama: {} | model: {}",
                            health.status,
                            health.ollama_status.as_deref().unwrap_or("unknown"),
                            health.model.as_deref().unwrap_or("unknown"),
                        ));
                    }
                    Err(error) => {
                        self.banner = Some(format!("health check failed: {error}"));
                    }
                }
                Ok(())
            }
            Command::Quit => {
                self.quit = true;
                Ok(())
            }
        }
    }

    /// Esc / Ctrl+C: cancel the in-flight stream if there is one, otherwise
    /// request exit.
    pub async fn interrupt(&mut self) {
        if self.manager.is_streaming() {
            self.manager.cancel_active().await;
            self.banner = Some("generation cancelled".to_string());
        } else {
            self.quit = true;
        }
    }

    /// Teardown path: make sure no session outlives the UI.
    pub async fn shutdown(&mut self) {
        self.manager.cancel_active().await;
    }

    /// Pump the session update channel. Returns true when anything arrived,
    /// i.e. the transcript may have changed and a re-render is due.
    pub fn drain_updates(&mut self) -> bool {
        let mut changed = false;
        while let Ok(update) = self.update_rx.try_recv() {
            changed = true;
            match update {
                SessionUpdate::Sending => self.phase = StreamPhase::Sending,
                SessionUpdate::Streaming => self.phase = StreamPhase::Streaming,
                SessionUpdate::Delta(_) => {}
                SessionUpdate::Completed | SessionUpdate::Cancelled => {
                    self.phase = StreamPhase::Idle;
                }
                SessionUpdate::Failed(message) => {
                    self.phase = StreamPhase::Idle;
                    self.banner = Some(format!("stream failed: {message}"));
                }
            }
        }
        changed
    }

    fn id_at(&self, index: usize) -> Result<TurnId> {
        self.transcript
            .lock()
            .get(index)
            .map(|turn| turn.id)
            .with_context(|| format!("no turn at position {index}"))
    }

    fn last_assistant_index(&self) -> Option<usize> {
        let transcript = self.transcript.lock();
        transcript
            .turns()
            .iter()
            .rposition(|turn| turn.role == crate::types::Role::Assistant)
    }

    // Scroll handling: `None` follows the stream bottom; any explicit offset
    // detaches until the user scrolls back past the end.

    pub fn scroll_offset(&self) -> Option<usize> {
        self.scroll
    }

    pub fn set_scroll_bottom(&mut self, bottom: usize) {
        self.scroll_bottom = bottom;
    }

    pub fn scroll_up(&mut self, lines: usize) {
        let current = self.scroll.unwrap_or(self.scroll_bottom);
        self.scroll = Some(current.saturating_sub(lines));
    }

    pub fn scroll_down(&mut self, lines: usize) {
        if let Some(current) = self.scroll {
            let next = current.saturating_add(lines);
            self.scroll = if next >= self.scroll_bottom {
                None
            } else {
                Some(next)
            };
        }
    }

    pub fn scroll_home(&mut self) {
        self.scroll = Some(0);
    }

    pub fn scroll_end(&mut self) {
        self.scroll = None;
    }
}

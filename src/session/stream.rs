use crate::api::stream::{decode_frame, FrameParser};
use crate::api::ApiClient;
use crate::state::{SharedTranscript, TurnPatch};
use crate::types::{SendRequest, StreamEvent, Turn, TurnId};
use futures::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle of one request/response cycle. `Completed`, `Failed`, and
/// `Cancelled` are terminal; a session transitions into exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sending,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

/// Failure classification at the session boundary. Protocol-level noise
/// (undecodable frames) never reaches this type; it is skipped inside the
/// read loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The backend signalled an error payload mid-stream.
    #[error("{0}")]
    Application(String),
    /// The transport failed before or during streaming.
    #[error("{0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Failed(SessionError),
    Cancelled,
}

/// One message per delta or state transition, decoupling transport timing
/// from render timing. The transcript remains the source of truth; these are
/// render nudges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    Sending,
    Streaming,
    Delta(String),
    Completed,
    Failed(String),
    Cancelled,
}

/// Drives a single streaming exchange: issues the request, feeds the frame
/// parser and event decoder, and reconciles every delta into the paired
/// assistant placeholder turn.
pub struct StreamSession {
    client: Arc<ApiClient>,
    transcript: SharedTranscript,
    cancel: CancellationToken,
    update_tx: mpsc::UnboundedSender<SessionUpdate>,
    placeholder: TurnId,
    state: SessionState,
    accumulator: String,
}

impl StreamSession {
    pub fn new(
        client: Arc<ApiClient>,
        transcript: SharedTranscript,
        cancel: CancellationToken,
        update_tx: mpsc::UnboundedSender<SessionUpdate>,
        placeholder: TurnId,
    ) -> Self {
        Self {
            client,
            transcript,
            cancel,
            update_tx,
            placeholder,
            state: SessionState::Idle,
            accumulator: String::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the session to a terminal state. Every failure is classified
    /// here; nothing escapes unclassified.
    pub async fn run(mut self, request: SendRequest) -> SessionOutcome {
        self.state = SessionState::Sending;
        self.emit(SessionUpdate::Sending);
        if self.cancel.is_cancelled() {
            return self.resolve_cancelled();
        }

        let stream = tokio::select! {
            () = self.cancel.cancelled() => return self.resolve_cancelled(),
            result = self.client.stream_generate(&request) => result,
        };
        let mut stream = match stream {
            Ok(stream) => stream,
            Err(error) => {
                return self.resolve_failed(SessionError::Transport(error.to_string()));
            }
        };

        self.state = SessionState::Streaming;
        self.emit(SessionUpdate::Streaming);

        let mut parser = FrameParser::new();
        loop {
            let chunk = tokio::select! {
                () = self.cancel.cancelled() => return self.resolve_cancelled(),
                chunk = stream.next() => chunk,
            };
            match chunk {
                None => break,
                Some(Err(error)) => {
                    return self.resolve_failed(SessionError::Transport(error.to_string()));
                }
                Some(Ok(bytes)) => {
                    for frame in parser.push(&bytes) {
                        // Once cancellation is raised, buffered frames are
                        // dropped unprocessed.
                        if self.cancel.is_cancelled() {
                            return self.resolve_cancelled();
                        }
                        if let Some(outcome) = self.dispatch(decode_frame(&frame)) {
                            return outcome;
                        }
                    }
                }
            }
        }

        // End-of-stream without a done frame: flush the residual buffer as
        // one best-effort frame, then finalize with whatever accumulated.
        if let Some(frame) = parser.finish() {
            if let Some(outcome) = self.dispatch(decode_frame(&frame)) {
                return outcome;
            }
        }
        debug!("stream closed without done frame");
        self.resolve_completed()
    }

    fn dispatch(&mut self, event: StreamEvent) -> Option<SessionOutcome> {
        match event {
            StreamEvent::TextDelta(text) => {
                self.accumulator.push_str(&text);
                self.transcript.lock().update_last(
                    Turn::is_assistant_streaming,
                    TurnPatch::content(self.accumulator.clone()).streaming(true),
                );
                self.emit(SessionUpdate::Delta(text));
                None
            }
            StreamEvent::ApplicationError(message) => {
                Some(self.resolve_failed(SessionError::Application(message)))
            }
            StreamEvent::Done => Some(self.resolve_completed()),
            StreamEvent::Unknown => None,
        }
    }

    fn resolve_completed(&mut self) -> SessionOutcome {
        self.state = SessionState::Completed;
        self.transcript.lock().update_last(
            Turn::is_assistant_streaming,
            TurnPatch::content(self.accumulator.clone()).streaming(false),
        );
        info!(chars = self.accumulator.len(), "session completed");
        self.emit(SessionUpdate::Completed);
        SessionOutcome::Completed
    }

    fn resolve_failed(&mut self, error: SessionError) -> SessionOutcome {
        self.state = SessionState::Failed;
        self.transcript.lock().update_last(
            Turn::is_assistant_streaming,
            TurnPatch::content(format!("Error: {error}")).streaming(false),
        );
        warn!(%error, "session failed");
        self.emit(SessionUpdate::Failed(error.to_string()));
        SessionOutcome::Failed(error)
    }

    /// User-initiated abort is not an error: the placeholder turn is removed
    /// rather than left with partial content.
    fn resolve_cancelled(&mut self) -> SessionOutcome {
        self.state = SessionState::Cancelled;
        self.transcript.lock().remove(self.placeholder);
        info!("session cancelled");
        self.emit(SessionUpdate::Cancelled);
        SessionOutcome::Cancelled
    }

    fn emit(&self, update: SessionUpdate) {
        let _ = self.update_tx.send(update);
    }
}

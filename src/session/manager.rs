use super::stream::{SessionOutcome, SessionUpdate, StreamSession};
use crate::api::ApiClient;
use crate::state::SharedTranscript;
use crate::types::{ImageRef, Role, SendRequest};
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

struct ActiveSession {
    cancel: CancellationToken,
    handle: JoinHandle<SessionOutcome>,
}

/// Process-wide owner of the single in-flight stream session. A new send
/// always supersedes the previous one: `start` signals cancellation and
/// awaits the old session's terminal state before appending the next
/// user/placeholder pair, so two sessions never touch the transcript
/// concurrently.
pub struct SessionManager {
    client: Arc<ApiClient>,
    transcript: SharedTranscript,
    update_tx: mpsc::UnboundedSender<SessionUpdate>,
    active: Option<ActiveSession>,
}

impl SessionManager {
    pub fn new(
        client: ApiClient,
        transcript: SharedTranscript,
        update_tx: mpsc::UnboundedSender<SessionUpdate>,
    ) -> Self {
        Self {
            client: Arc::new(client),
            transcript,
            update_tx,
            active: None,
        }
    }

    pub fn transcript(&self) -> SharedTranscript {
        self.transcript.clone()
    }

    pub fn client(&self) -> Arc<ApiClient> {
        Arc::clone(&self.client)
    }

    pub fn is_streaming(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }

    /// Begin a new exchange: cancel any in-flight session, append the user
    /// turn and its paired assistant placeholder, and spawn the stream
    /// session that will fill the placeholder.
    pub async fn start(&mut self, request: SendRequest) -> Result<()> {
        self.cancel_active().await;

        let placeholder = {
            let mut transcript = self.transcript.lock();
            transcript.push_user(
                request.prompt.clone(),
                request.image.as_ref().map(ImageRef::display_ref),
            );
            transcript.push_assistant_placeholder()?
        };

        let cancel = CancellationToken::new();
        let session = StreamSession::new(
            Arc::clone(&self.client),
            self.transcript.clone(),
            cancel.clone(),
            self.update_tx.clone(),
            placeholder,
        );
        let handle = tokio::spawn(session.run(request));
        self.active = Some(ActiveSession { cancel, handle });
        Ok(())
    }

    /// Re-invoke the send pipeline for the assistant turn at `index`, using
    /// its paired user turn's prompt and image reference. The original
    /// assistant turn stays in the transcript; history is preserved, not
    /// replaced.
    pub async fn regenerate(&mut self, index: usize) -> Result<()> {
        let request = {
            let transcript = self.transcript.lock();
            let turn = transcript
                .get(index)
                .with_context(|| format!("no turn at position {index}"))?;
            if turn.role != Role::Assistant {
                bail!("turn at position {index} is not an assistant turn");
            }
            let user = transcript
                .preceding_user(index)
                .with_context(|| format!("no user turn precedes position {index}"))?;
            SendRequest {
                prompt: user.content.clone(),
                image: user.image.as_deref().map(resolve_image_ref).transpose()?,
            }
        };
        info!(index, "regenerating response");
        self.start(request).await
    }

    /// Cancel the in-flight session, if any, and await its terminal state.
    /// Used by clear-transcript and teardown paths as well as `start`.
    pub async fn cancel_active(&mut self) -> Option<SessionOutcome> {
        let active = self.active.take()?;
        active.cancel.cancel();
        active.handle.await.ok()
    }

    /// Await the in-flight session without cancelling it.
    pub async fn join_active(&mut self) -> Option<SessionOutcome> {
        let active = self.active.take()?;
        active.handle.await.ok()
    }

    /// Cancel any active session, then empty the transcript.
    pub async fn clear(&mut self) {
        self.cancel_active().await;
        self.transcript.lock().clear();
    }
}

/// Map a stored turn image reference back to a request attachment. URL and
/// data-URI references pass through; anything else is the full local path
/// the bytes were originally read from, re-read here.
fn resolve_image_ref(reference: &str) -> Result<ImageRef> {
    if reference.starts_with("http://")
        || reference.starts_with("https://")
        || reference.starts_with("data:")
    {
        return Ok(ImageRef::Url(reference.to_string()));
    }
    let data = std::fs::read(reference)
        .with_context(|| format!("cannot re-read image '{reference}'"))?;
    Ok(ImageRef::Bytes {
        data,
        path: std::path::PathBuf::from(reference),
    })
}

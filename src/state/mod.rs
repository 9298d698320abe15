pub mod transcript;

pub use transcript::{Transcript, TurnPatch};

use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle to the transcript. Every mutation happens inside one lock
/// acquisition, so no interleaved partial state is ever observable between
/// two store operations.
#[derive(Clone, Default)]
pub struct SharedTranscript(Arc<Mutex<Transcript>>);

impl SharedTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, Transcript> {
        self.0.lock().expect("transcript lock poisoned")
    }
}

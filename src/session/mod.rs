pub mod manager;
pub mod stream;

pub use manager::SessionManager;
pub use stream::{SessionError, SessionOutcome, SessionState, SessionUpdate, StreamSession};

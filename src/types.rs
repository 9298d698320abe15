use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Stable identity of a transcript turn. Ids are never reused within a
/// transcript, so they survive deletes (positions do not).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TurnId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reaction {
    Like,
    Dislike,
}

/// One entry in the conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub role: Role,
    pub content: String,
    /// Opaque display reference (URL or data URI); the core never inspects it.
    pub image: Option<String>,
    /// True only while the owning stream session is appending content.
    pub streaming: bool,
    pub reaction: Option<Reaction>,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn is_assistant_streaming(&self) -> bool {
        self.role == Role::Assistant && self.streaming
    }
}

/// Image attachment for an outgoing request. The backend accepts either a
/// binary upload or a URL, never both; the enum makes the conflict
/// unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    Bytes { data: Vec<u8>, path: PathBuf },
    Url(String),
}

impl ImageRef {
    /// Reference stored on the user turn: the URL, or the full path the
    /// bytes were read from, so a later regenerate can re-resolve the
    /// attachment no matter the working directory.
    pub fn display_ref(&self) -> String {
        match self {
            ImageRef::Bytes { path, .. } => path.display().to_string(),
            ImageRef::Url(url) => url.clone(),
        }
    }

    /// Basename reported to the backend for binary uploads.
    pub fn upload_file_name(&self) -> Option<String> {
        match self {
            ImageRef::Bytes { path, .. } => Some(
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
            ),
            ImageRef::Url(_) => None,
        }
    }
}

/// One request to the streaming endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub prompt: String,
    pub image: Option<ImageRef>,
}

impl SendRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
        }
    }

    pub fn with_image(prompt: impl Into<String>, image: ImageRef) -> Self {
        Self {
            prompt: prompt.into(),
            image: Some(image),
        }
    }
}

/// A decoded wire event. Downstream code matches exhaustively; anything the
/// decoder does not recognize collapses into `Unknown` and is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    TextDelta(String),
    ApplicationError(String),
    Done,
    Unknown,
}

/// JSON body of a `data:` payload as the backend emits it. Either a text
/// fragment or an error envelope; unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WirePayload {
    #[serde(default)]
    pub error: bool,
    pub message: Option<String>,
    pub detail: Option<String>,
    pub body: Option<String>,
    pub text: Option<String>,
}

impl WirePayload {
    /// Best human-readable error text, in the order the backend populates it.
    pub fn error_message(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.detail.clone())
            .or_else(|| self.body.clone())
            .unwrap_or_else(|| "stream error".to_string())
    }
}

/// Backend `/health` response shape.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub ollama_status: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub ollama_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_payload_error_message_preference_order() {
        let payload: WirePayload = serde_json::from_str(
            r#"{"error":true,"message":"boom","detail":"detail text","body":"raw body"}"#,
        )
        .unwrap();
        assert_eq!(payload.error_message(), "boom");

        let payload: WirePayload =
            serde_json::from_str(r#"{"error":true,"detail":"detail text"}"#).unwrap();
        assert_eq!(payload.error_message(), "detail text");

        let payload: WirePayload = serde_json::from_str(r#"{"error":true}"#).unwrap();
        assert_eq!(payload.error_message(), "stream error");
    }

    #[test]
    fn test_wire_payload_ignores_unknown_keys() {
        let payload: WirePayload =
            serde_json::from_str(r#"{"text":"Hi","status_code":502}"#).unwrap();
        assert_eq!(payload.text.as_deref(), Some("Hi"));
        assert!(!payload.error);
    }

    #[test]
    fn test_image_ref_display_reference_keeps_full_path() {
        let by_url = ImageRef::Url("https://example.com/cat.png".to_string());
        assert_eq!(by_url.display_ref(), "https://example.com/cat.png");
        assert_eq!(by_url.upload_file_name(), None);

        let by_bytes = ImageRef::Bytes {
            data: vec![0xFF, 0xD8],
            path: PathBuf::from("shots/jan/photo.jpg"),
        };
        assert_eq!(by_bytes.display_ref(), "shots/jan/photo.jpg");
        assert_eq!(by_bytes.upload_file_name().as_deref(), Some("photo.jpg"));
    }
}

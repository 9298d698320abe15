use crate::types::{StreamEvent, WirePayload};
use tracing::debug;

/// Splits the raw transport stream into discrete frames on the blank-line
/// delimiter. Chunks arrive in arbitrary sizes, never aligned to frame
/// boundaries, so the parser keeps an accumulation buffer between calls.
#[derive(Default)]
pub struct FrameParser {
    buffer: String,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one transport chunk and drain every complete frame it closes.
    /// Accepts both bare-LF and CRLF blank-line delimiters.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));
        let mut frames = Vec::new();
        let mut start = 0;

        while let Some((end, delimiter_len)) = find_delimiter(&self.buffer[start..]) {
            let frame_end = start + end;
            frames.push(self.buffer[start..frame_end].to_string());
            start = frame_end + delimiter_len;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }
        frames
    }

    /// Flush the residual buffer at end-of-stream. A stream that ends
    /// without a trailing delimiter still yields its last frame.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = rest.trim();
        if rest.is_empty() {
            None
        } else {
            Some(rest.to_string())
        }
    }
}

fn find_delimiter(text: &str) -> Option<(usize, usize)> {
    let lf = text.find("\n\n");
    let crlf = text.find("\r\n\r\n");
    match (lf, crlf) {
        (Some(l), Some(c)) if c < l => Some((c, 4)),
        (Some(l), _) => Some((l, 2)),
        (None, Some(c)) => Some((c, 4)),
        (None, None) => None,
    }
}

/// Classify one raw frame into a typed event.
///
/// Recognized fields: `event: <type>` (default type `message`) and
/// `data: <payload>`; multiple data lines concatenate so a payload split
/// across lines reassembles intact. A `done` frame terminates the read loop
/// regardless of payload. Payloads that are not valid JSON, or JSON with no
/// recognized field, decode to `Unknown` and are skipped by the caller.
pub fn decode_frame(frame: &str) -> StreamEvent {
    let mut event_type: Option<&str> = None;
    let mut data = String::new();

    for line in frame.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(rest) = line.strip_prefix("event: ") {
            event_type = Some(rest.trim());
        } else if let Some(rest) = line.strip_prefix("data: ") {
            data.push_str(rest);
        }
    }

    if event_type == Some("done") {
        return StreamEvent::Done;
    }

    if data.is_empty() {
        return StreamEvent::Unknown;
    }

    match serde_json::from_str::<WirePayload>(&data) {
        Ok(payload) if payload.error => StreamEvent::ApplicationError(payload.error_message()),
        Ok(payload) => match payload.text {
            Some(text) => StreamEvent::TextDelta(text),
            None => StreamEvent::Unknown,
        },
        Err(err) => {
            debug!(%err, data, "skipping undecodable frame payload");
            StreamEvent::Unknown
        }
    }
}

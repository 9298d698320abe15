use crate::api::client::{ByteStream, MockStreamProducer};
use crate::types::SendRequest;
use anyhow::Result;
use bytes::Bytes;
use futures::{stream, StreamExt};
use std::sync::{Arc, Mutex};

/// One canned streaming response. With `hold_open` the stream never ends on
/// its own after delivering its chunks, so tests can exercise cancellation
/// while a session is mid-stream.
#[derive(Clone)]
pub struct MockResponse {
    pub chunks: Vec<String>,
    pub hold_open: bool,
}

impl MockResponse {
    pub fn ending(chunks: Vec<String>) -> Self {
        Self {
            chunks,
            hold_open: false,
        }
    }

    pub fn held_open(chunks: Vec<String>) -> Self {
        Self {
            chunks,
            hold_open: true,
        }
    }
}

/// Serves canned byte chunks in place of the real backend. Each call to
/// `create_mock_stream` consumes the next configured response; chunks are
/// delivered verbatim so tests control fragmentation and framing exactly.
#[derive(Clone)]
pub struct MockApiClient {
    responses: Arc<Mutex<Vec<MockResponse>>>,
    requests_seen: Arc<Mutex<Vec<SendRequest>>>,
}

impl MockApiClient {
    pub fn new(responses: Vec<Vec<String>>) -> Self {
        Self::with_responses(responses.into_iter().map(MockResponse::ending).collect())
    }

    pub fn with_responses(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requests_seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests_seen(&self) -> Vec<SendRequest> {
        self.requests_seen.lock().unwrap().clone()
    }
}

impl MockStreamProducer for MockApiClient {
    fn create_mock_stream(&self, request: &SendRequest) -> Result<ByteStream> {
        self.requests_seen.lock().unwrap().push(request.clone());

        let mut responses_guard = self.responses.lock().unwrap();
        if responses_guard.is_empty() {
            return Err(anyhow::anyhow!(
                "MockApiClient: no more responses configured"
            ));
        }
        let response = responses_guard.remove(0);

        let byte_chunks: Vec<Result<Bytes>> = response
            .chunks
            .into_iter()
            .map(|s| Ok(Bytes::from(s)))
            .collect();
        let canned = stream::iter(byte_chunks);
        if response.hold_open {
            Ok(Box::pin(canned.chain(stream::pending())))
        } else {
            Ok(Box::pin(canned))
        }
    }
}

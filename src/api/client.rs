use crate::config::Config;
use crate::types::{HealthStatus, ImageRef, SendRequest};
use anyhow::{anyhow, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::multipart::{Form, Part};
use std::pin::Pin;
use std::time::Duration;
#[cfg(test)]
use std::sync::Arc;
use tracing::debug;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[cfg(test)]
pub trait MockStreamProducer: Send + Sync {
    fn create_mock_stream(&self, request: &SendRequest) -> Result<ByteStream>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    #[cfg(test)]
    mock_stream_producer: Option<Arc<dyn MockStreamProducer>>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url().to_string(),
            #[cfg(test)]
            mock_stream_producer: None,
        }
    }

    #[cfg(test)]
    pub fn new_mock(mock_producer: Arc<dyn MockStreamProducer>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "http://localhost:8000".to_string(),
            mock_stream_producer: Some(mock_producer),
        }
    }

    /// Open the streaming generate endpoint for one request and return the
    /// raw byte stream. Errors here are transport-level: the request never
    /// reached the streaming phase.
    pub async fn stream_generate(&self, request: &SendRequest) -> Result<ByteStream> {
        #[cfg(test)]
        {
            if let Some(producer) = &self.mock_stream_producer {
                return producer.create_mock_stream(request);
            }
        }

        let url = format!("{}/stream-analyze", self.base_url);
        debug!(
            url,
            prompt_len = request.prompt.len(),
            has_image = request.image.is_some(),
            "opening generation stream"
        );

        let mut form = Form::new().text("prompt", request.prompt.clone());
        match &request.image {
            Some(image @ ImageRef::Bytes { data, .. }) => {
                let file_name = image.upload_file_name().unwrap_or_default();
                form = form.part("image", Part::bytes(data.clone()).file_name(file_name));
            }
            Some(ImageRef::Url(image_url)) => {
                form = form.text("image_url", image_url.clone());
            }
            None => {}
        }

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|error| map_request_error(error, &url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = body.trim();
            return Err(if body.is_empty() {
                anyhow!("backend '{url}' returned HTTP {status}")
            } else {
                anyhow!("backend '{url}' returned HTTP {status}: {body}")
            });
        }

        let url_for_stream = url.clone();
        let stream = response
            .bytes_stream()
            .map(move |item| item.map_err(|error| map_request_error(error, &url_for_stream)));
        Ok(Box::pin(stream))
    }

    /// Probe the backend's health endpoint.
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .http
            .get(&url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(|error| map_request_error(error, &url))?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("backend '{url}' returned HTTP {status}"));
        }
        Ok(response.json::<HealthStatus>().await?)
    }
}

fn map_request_error(error: reqwest::Error, url: &str) -> anyhow::Error {
    if error.is_connect() {
        return anyhow!(
            "cannot reach backend '{}': {}. Start the server or update GAZEL_API_URL.",
            url,
            error
        );
    }
    if error.is_timeout() {
        return anyhow!("request to '{}' timed out: {}", url, error);
    }
    anyhow!("request to '{}' failed: {}", url, error)
}

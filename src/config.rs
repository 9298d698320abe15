use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_url: String,
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_url = std::env::var("GAZEL_API_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());
        let log_file = std::env::var("GAZEL_LOG_FILE").ok().and_then(|v| {
            if v.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(v))
            }
        });

        Ok(Self { api_url, log_file })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            bail!(
                "Invalid GAZEL_API_URL '{}': expected http:// or https:// URL",
                self.api_url
            );
        }
        Ok(())
    }

    /// Base URL with no trailing slash, ready for path joining.
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

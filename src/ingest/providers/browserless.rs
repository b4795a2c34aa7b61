// src/ingest/providers/browserless.rs
//! Thin client for a Browserless `/content` endpoint (fully rendered HTML).

use anyhow::{anyhow, Context, Result};
use std::time::Duration;

#[derive(Clone)]
pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("building browserless http client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    fn endpoint(&self) -> String {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(token) = &self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }

    /// Rendered HTML of `url` after the page settles.
    pub async fn content(&self, url: &str) -> Result<String> {
        let body = serde_json::json!({
            "url": url,
            "gotoOptions": { "waitUntil": "networkidle2", "timeout": 45_000 },
        });

        let resp = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .context("browserless request")?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(anyhow!("browserless status {}: {}", status.as_u16(), message.trim()));
        }

        resp.text().await.context("browserless body")
    }
}

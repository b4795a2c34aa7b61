use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{SendOptions, Transport};
use crate::config::TelegramCredentials;

const API_BASE: &str = "https://api.telegram.org";

pub struct TelegramTransport {
    client: Client,
    bot_token: String,
    chat_id: String,
}

#[derive(Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramTransport {
    pub fn new(creds: &TelegramCredentials) -> Self {
        Self {
            client: Client::new(),
            bot_token: creds.bot_token.clone(),
            chat_id: creds.chat_id.clone(),
        }
    }

    fn body(&self, text: &str, opts: SendOptions) -> serde_json::Value {
        let mut body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "link_preview_options": { "is_disabled": !opts.link_preview },
        });
        if opts.html {
            body["parse_mode"] = serde_json::Value::from("HTML");
        }
        body
    }
}

#[async_trait::async_trait]
impl Transport for TelegramTransport {
    async fn send(&self, text: &str, opts: SendOptions) -> Result<()> {
        let url = format!("{API_BASE}/bot{}/sendMessage", self.bot_token);

        let rsp = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(10))
            .json(&self.body(text, opts))
            .send()
            .await
            .context("telegram post")?;

        let status = rsp.status();
        let reply: ApiReply = rsp.json().await.context("telegram reply")?;
        if !reply.ok {
            return Err(anyhow!(
                "telegram rejected message ({status}): {}",
                reply.description.unwrap_or_default()
            ));
        }
        Ok(())
    }
}

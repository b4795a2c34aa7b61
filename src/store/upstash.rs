// src/store/upstash.rs
//! Redis-over-REST seen store (Upstash wire format).
//!
//! Every command is one `POST {base}` with a JSON array body
//! (`["SADD", key, m1, m2]`) and a bearer token. Replies are
//! `{"result": ...}` or `{"error": "..."}`.

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::SeenStore;
use crate::config::StoreCredentials;
use crate::error::{Result, WatchError};

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct UpstashStore {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl UpstashStore {
    pub fn new(creds: &StoreCredentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(WatchError::store)?;
        Ok(Self {
            client,
            url: creds.url.trim_end_matches('/').to_string(),
            token: creds.token.clone(),
        })
    }

    async fn command(&self, args: Vec<String>) -> Result<Value> {
        let name = args.first().cloned().unwrap_or_default();
        let rsp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await
            .map_err(|e| WatchError::store(format!("{name}: {e}")))?;

        let status = rsp.status();
        let reply: Reply = rsp
            .json()
            .await
            .map_err(|e| WatchError::store(format!("{name}: bad reply ({status}): {e}")))?;
        decode_reply(&name, reply)
    }
}

fn decode_reply(name: &str, reply: Reply) -> Result<Value> {
    if let Some(err) = reply.error {
        return Err(WatchError::store(format!("{name}: {err}")));
    }
    Ok(reply.result.unwrap_or(Value::Null))
}

fn as_string_set(name: &str, v: Value) -> Result<HashSet<String>> {
    match v {
        Value::Null => Ok(HashSet::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|it| match it {
                Value::String(s) => Ok(s),
                other => Err(WatchError::store(format!("{name}: non-string member {other}"))),
            })
            .collect(),
        other => Err(WatchError::store(format!("{name}: expected array, got {other}"))),
    }
}

#[async_trait::async_trait]
impl SeenStore for UpstashStore {
    async fn members(&self, key: &str) -> Result<HashSet<String>> {
        let v = self
            .command(vec!["SMEMBERS".into(), key.to_string()])
            .await?;
        as_string_set("SMEMBERS", v)
    }

    async fn add_members(&self, key: &str, values: &[String]) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let mut args = Vec::with_capacity(values.len() + 2);
        args.push("SADD".to_string());
        args.push(key.to_string());
        args.extend(values.iter().cloned());
        self.command(args).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let v = self.command(vec!["EXISTS".into(), key.to_string()]).await?;
        Ok(v.as_i64().unwrap_or(0) > 0)
    }

    async fn refresh_expiry(&self, key: &str, ttl: Duration) -> Result<()> {
        self.command(vec![
            "EXPIRE".into(),
            key.to_string(),
            ttl.as_secs().to_string(),
        ])
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(s: &str) -> Reply {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn error_reply_is_store_unavailable() {
        let err = decode_reply("SADD", reply(r#"{"error":"WRONGPASS invalid token"}"#)).unwrap_err();
        assert!(matches!(err, WatchError::StoreUnavailable(_)));
        assert!(err.to_string().contains("WRONGPASS"));
    }

    #[test]
    fn smembers_reply_decodes_to_set() {
        let v = decode_reply("SMEMBERS", reply(r#"{"result":["a:1","a:2","a:1"]}"#)).unwrap();
        let set = as_string_set("SMEMBERS", v).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("a:2"));
    }

    #[test]
    fn unexpected_shapes_are_rejected() {
        assert!(as_string_set("SMEMBERS", serde_json::json!(3)).is_err());
        assert!(as_string_set("SMEMBERS", serde_json::json!([1, 2])).is_err());
        assert!(as_string_set("SMEMBERS", Value::Null).unwrap().is_empty());
    }
}

// src/config/mod.rs
//! Environment-driven configuration.
//!
//! Values are read once into [`Settings`] (every field optional), then
//! [`Settings::validate`] turns them into a [`Config`] or a single
//! `Validation` error naming everything that is missing.

pub mod sites;

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, WatchError};
use crate::ingest::fetch::DEFAULT_RETRY_DELAY;
use crate::notify::DEFAULT_PACING;
use crate::store::DEFAULT_TTL;
use sites::SiteSelectors;

pub const ENV_STORE_URL: &str = "UPSTASH_REDIS_REST_URL";
pub const ENV_STORE_TOKEN: &str = "UPSTASH_REDIS_REST_TOKEN";
pub const ENV_TELEGRAM_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_TELEGRAM_CHAT: &str = "TELEGRAM_CHAT_ID";
pub const ENV_BROWSERLESS_URL: &str = "BROWSERLESS_URL";
pub const ENV_BROWSERLESS_TOKEN: &str = "BROWSERLESS_TOKEN";
pub const ENV_TTL_DAYS: &str = "SEEN_TTL_DAYS";
pub const ENV_RETRY_DELAY_SECS: &str = "FETCH_RETRY_DELAY_SECS";
pub const ENV_PACING_MS: &str = "NOTIFY_PACING_MS";
pub const ENV_METRICS_TEXTFILE: &str = "METRICS_TEXTFILE";

/// Separator inside an address-list variable. `|` is not legal unescaped
/// in a URL, unlike `,` or `;`.
pub const ADDRESS_DELIMITER: char = '|';

pub fn split_addresses(raw: &str) -> Vec<String> {
    raw.split(ADDRESS_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCredentials {
    pub url: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramCredentials {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserlessSettings {
    pub url: String,
    pub token: Option<String>,
}

/// Raw, unvalidated view of the environment.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub store_url: Option<String>,
    pub store_token: Option<String>,
    pub telegram_token: Option<String>,
    pub telegram_chat: Option<String>,
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,
    pub sites: Vec<(SiteSelectors, Vec<String>)>,
    pub ttl_days: Option<u64>,
    pub retry_delay_secs: Option<u64>,
    pub pacing_ms: Option<u64>,
    pub metrics_textfile: Option<PathBuf>,
}

/// Validated configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreCredentials,
    pub telegram: TelegramCredentials,
    pub browserless: Option<BrowserlessSettings>,
    /// Sites with at least one address; sites with an empty list are skipped.
    pub sites: Vec<(SiteSelectors, Vec<String>)>,
    pub ttl: Duration,
    pub retry_delay: Duration,
    pub pacing: Duration,
    pub metrics_textfile: Option<PathBuf>,
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl Settings {
    pub fn from_env(sites: Vec<SiteSelectors>) -> Self {
        Self::from_lookup(sites, |k| std::env::var(k).ok())
    }

    /// Build from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(sites: Vec<SiteSelectors>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| non_empty(lookup(k));
        let num = |k: &str| get(k).and_then(|v| v.parse::<u64>().ok());

        let sites = sites
            .into_iter()
            .map(|s| {
                let addrs = get(&s.urls_env)
                    .map(|v| split_addresses(&v))
                    .unwrap_or_default();
                (s, addrs)
            })
            .collect();

        Self {
            store_url: get(ENV_STORE_URL),
            store_token: get(ENV_STORE_TOKEN),
            telegram_token: get(ENV_TELEGRAM_TOKEN),
            telegram_chat: get(ENV_TELEGRAM_CHAT),
            browserless_url: get(ENV_BROWSERLESS_URL),
            browserless_token: get(ENV_BROWSERLESS_TOKEN),
            sites,
            ttl_days: num(ENV_TTL_DAYS),
            retry_delay_secs: num(ENV_RETRY_DELAY_SECS),
            pacing_ms: num(ENV_PACING_MS),
            metrics_textfile: get(ENV_METRICS_TEXTFILE).map(PathBuf::from),
        }
    }

    /// Transport credentials alone, so a failed validation can still be reported.
    pub fn telegram(&self) -> Option<TelegramCredentials> {
        Some(TelegramCredentials {
            bot_token: self.telegram_token.clone()?,
            chat_id: self.telegram_chat.clone()?,
        })
    }

    pub fn validate(self) -> Result<Config> {
        let mut missing = Vec::new();
        for (key, v) in [
            (ENV_STORE_URL, &self.store_url),
            (ENV_STORE_TOKEN, &self.store_token),
            (ENV_TELEGRAM_TOKEN, &self.telegram_token),
            (ENV_TELEGRAM_CHAT, &self.telegram_chat),
        ] {
            if v.is_none() {
                missing.push(key.to_string());
            }
        }

        let telegram = self.telegram();
        let sites: Vec<_> = self
            .sites
            .into_iter()
            .filter(|(_, addrs)| !addrs.is_empty())
            .collect();
        if sites.is_empty() {
            missing.push("at least one source address list".to_string());
        }

        if !missing.is_empty() {
            return Err(WatchError::Validation(format!("missing {}", missing.join(", "))));
        }

        let (Some(url), Some(token), Some(telegram)) = (self.store_url, self.store_token, telegram)
        else {
            return Err(WatchError::Validation("missing store or transport credentials".into()));
        };

        Ok(Config {
            store: StoreCredentials { url, token },
            telegram,
            browserless: self.browserless_url.map(|url| BrowserlessSettings {
                url,
                token: self.browserless_token,
            }),
            sites,
            ttl: self
                .ttl_days
                .filter(|d| *d > 0)
                .map(|d| Duration::from_secs(d * 24 * 3600))
                .unwrap_or(DEFAULT_TTL),
            retry_delay: self
                .retry_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_RETRY_DELAY),
            pacing: self
                .pacing_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_PACING),
            metrics_textfile: self.metrics_textfile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn site(name: &str, env: &str) -> SiteSelectors {
        SiteSelectors {
            name: name.into(),
            urls_env: env.into(),
            item: "li".into(),
            id_attr: None,
            title: "h2".into(),
            price: ".p".into(),
            link: "a".into(),
            location: None,
            image: None,
            block_marker: None,
        }
    }

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (ENV_STORE_URL, "https://redis.example.test"),
            (ENV_STORE_TOKEN, "tok"),
            (ENV_TELEGRAM_TOKEN, "123:abc"),
            (ENV_TELEGRAM_CHAT, "-100"),
            ("A_URLS", "https://a.test/s?q=bike&x=1,2 | https://a.test/s?q=lamp|"),
        ])
    }

    fn settings(env: &HashMap<&'static str, &'static str>) -> Settings {
        Settings::from_lookup(vec![site("a", "A_URLS"), site("b", "B_URLS")], |k| {
            env.get(k).map(|v| v.to_string())
        })
    }

    #[test]
    fn split_keeps_commas_inside_addresses() {
        let v = split_addresses("https://a.test/s?q=1,2|  |https://a.test/t ");
        assert_eq!(v, vec!["https://a.test/s?q=1,2", "https://a.test/t"]);
    }

    #[test]
    fn valid_env_yields_defaults_and_skips_empty_sites() {
        let cfg = settings(&full_env()).validate().unwrap();
        assert_eq!(cfg.sites.len(), 1);
        assert_eq!(cfg.sites[0].1.len(), 2);
        assert_eq!(cfg.ttl, DEFAULT_TTL);
        assert_eq!(cfg.retry_delay, Duration::from_secs(10));
        assert_eq!(cfg.pacing, Duration::from_millis(500));
        assert!(cfg.browserless.is_none());
    }

    #[test]
    fn missing_keys_are_all_reported() {
        let mut env = full_env();
        env.remove(ENV_STORE_TOKEN);
        env.remove(ENV_TELEGRAM_CHAT);
        env.insert("A_URLS", "  ");
        let err = settings(&env).validate().unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, WatchError::Validation(_)));
        assert!(msg.contains(ENV_STORE_TOKEN));
        assert!(msg.contains(ENV_TELEGRAM_CHAT));
        assert!(msg.contains("source address"));
    }

    #[test]
    fn telegram_available_even_when_invalid() {
        let mut env = full_env();
        env.remove(ENV_STORE_URL);
        let s = settings(&env);
        assert!(s.telegram().is_some());
        assert!(s.validate().is_err());
    }

    #[test]
    fn overrides_parse_numbers() {
        let mut env = full_env();
        env.insert(ENV_TTL_DAYS, "7");
        env.insert(ENV_PACING_MS, "50");
        env.insert(ENV_RETRY_DELAY_SECS, "nope");
        let cfg = settings(&env).validate().unwrap();
        assert_eq!(cfg.ttl, Duration::from_secs(7 * 24 * 3600));
        assert_eq!(cfg.pacing, Duration::from_millis(50));
        assert_eq!(cfg.retry_delay, DEFAULT_RETRY_DELAY);
    }
}

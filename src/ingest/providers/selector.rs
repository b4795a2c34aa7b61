// src/ingest/providers/selector.rs
//! Generic results-page adapter driven by per-site CSS selectors.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::browserless::BrowserlessClient;
use crate::config::sites::SiteSelectors;
use crate::ingest::types::{PageSession, SourceAdapter};
use crate::listing::{collapse_ws, RawListing};

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

/// Parsed form of [`SiteSelectors`].
pub struct CompiledSelectors {
    item: Selector,
    id_attr: Option<String>,
    title: Selector,
    price: Selector,
    link: Selector,
    location: Option<Selector>,
    image: Option<Selector>,
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| anyhow!("invalid selector {s:?}: {e:?}"))
}

impl CompiledSelectors {
    pub fn compile(site: &SiteSelectors) -> Result<Self> {
        Ok(Self {
            item: parse_selector(&site.item)?,
            id_attr: site.id_attr.clone(),
            title: parse_selector(&site.title)?,
            price: parse_selector(&site.price)?,
            link: parse_selector(&site.link)?,
            location: site.location.as_deref().map(parse_selector).transpose()?,
            image: site.image.as_deref().map(parse_selector).transpose()?,
        })
    }
}

fn first_text(el: &ElementRef<'_>, sel: &Selector) -> Option<String> {
    el.select(sel)
        .next()
        .map(|e| collapse_ws(&e.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

fn id_from_href(href: &str) -> Option<String> {
    static RE_ID: OnceCell<Regex> = OnceCell::new();
    let re = RE_ID.get_or_init(|| Regex::new(r"(\d{3,})").expect("static id regex"));
    let path = href.split(['?', '#']).next().unwrap_or(href);
    re.find_iter(path).last().map(|m| m.as_str().to_string())
}

/// Turn a results page into raw listings. Items without a title or a
/// resolvable link are skipped; zero matches is an empty result.
pub fn extract_listings(html: &str, page_url: &str, sel: &CompiledSelectors) -> Vec<RawListing> {
    let doc = Html::parse_document(html);
    let base = reqwest::Url::parse(page_url).ok();
    let resolve = |href: &str| -> Option<String> {
        match &base {
            Some(b) => b.join(href).ok().map(|u| u.to_string()),
            None => reqwest::Url::parse(href).ok().map(|u| u.to_string()),
        }
    };

    let mut out = Vec::new();
    for item in doc.select(&sel.item) {
        let Some(title) = first_text(&item, &sel.title) else {
            debug!("item without title skipped");
            continue;
        };
        let Some(url) = item
            .select(&sel.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|h| resolve(h.trim()))
        else {
            debug!(title = %title, "item without link skipped");
            continue;
        };

        let id = sel
            .id_attr
            .as_deref()
            .and_then(|attr| item.value().attr(attr))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .or_else(|| id_from_href(&url))
            .unwrap_or_else(|| url.clone());

        let image_url = sel.image.as_ref().and_then(|s| {
            item.select(s)
                .next()
                .and_then(|img| img.value().attr("data-src").or_else(|| img.value().attr("src")))
                .and_then(|src| resolve(src.trim()))
        });

        out.push(RawListing {
            id,
            title: html_escape::decode_html_entities(&title).to_string(),
            price: first_text(&item, &sel.price).unwrap_or_default(),
            url,
            location: sel.location.as_ref().and_then(|s| first_text(&item, s)),
            image_url,
        });
    }
    out
}

#[derive(Clone)]
enum Fetcher {
    Direct,
    Browserless(BrowserlessClient),
}

pub struct SelectorAdapter {
    name: String,
    selectors: Arc<CompiledSelectors>,
    block_marker: Option<String>,
    fetcher: Fetcher,
}

impl SelectorAdapter {
    /// Fetch pages with plain HTTP.
    pub fn direct(site: &SiteSelectors) -> Result<Self> {
        Self::build(site, Fetcher::Direct)
    }

    /// Fetch pages rendered by a remote browser.
    pub fn via_browserless(site: &SiteSelectors, client: BrowserlessClient) -> Result<Self> {
        Self::build(site, Fetcher::Browserless(client))
    }

    fn build(site: &SiteSelectors, fetcher: Fetcher) -> Result<Self> {
        let selectors = CompiledSelectors::compile(site)
            .with_context(|| format!("site {}", site.name))?;
        Ok(Self {
            name: site.name.clone(),
            selectors: Arc::new(selectors),
            block_marker: site.block_marker.clone().filter(|m| !m.is_empty()),
            fetcher,
        })
    }
}

#[async_trait]
impl SourceAdapter for SelectorAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open_session(&self) -> Result<Box<dyn PageSession>> {
        let transport = match &self.fetcher {
            Fetcher::Direct => SessionTransport::Http(
                reqwest::Client::builder()
                    .user_agent(USER_AGENT)
                    .cookie_store(true)
                    .timeout(Duration::from_secs(30))
                    .build()
                    .context("building page http client")?,
            ),
            Fetcher::Browserless(c) => SessionTransport::Browserless(c.clone()),
        };
        debug!(source = %self.name, "session opened");
        Ok(Box::new(HtmlSession {
            site: self.name.clone(),
            selectors: self.selectors.clone(),
            block_marker: self.block_marker.clone(),
            transport,
        }))
    }
}

enum SessionTransport {
    Http(reqwest::Client),
    Browserless(BrowserlessClient),
}

struct HtmlSession {
    site: String,
    selectors: Arc<CompiledSelectors>,
    block_marker: Option<String>,
    transport: SessionTransport,
}

impl HtmlSession {
    async fn load(&self, address: &str) -> Result<String> {
        match &self.transport {
            SessionTransport::Http(client) => client
                .get(address)
                .send()
                .await
                .context("page request")?
                .error_for_status()
                .context("page status")?
                .text()
                .await
                .context("page body"),
            SessionTransport::Browserless(c) => c.content(address).await,
        }
    }
}

#[async_trait]
impl PageSession for HtmlSession {
    async fn fetch_page(&mut self, address: &str) -> Result<Vec<RawListing>> {
        let html = self.load(address).await?;
        if let Some(marker) = &self.block_marker {
            if html.contains(marker.as_str()) {
                return Err(anyhow!("anti-bot challenge not cleared on {address}"));
            }
        }
        Ok(extract_listings(&html, address, &self.selectors))
    }

    async fn close(self: Box<Self>) {
        debug!(source = %self.site, "session closed");
    }
}

// src/listing.rs
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One entry as extracted from a results page, id still site-local.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawListing {
    pub id: String,
    pub title: String,
    pub price: String,
    pub url: String,
    pub location: Option<String>,
    pub image_url: Option<String>,
}

/// A listing observed during this run. `id` is namespaced by site
/// (`"{site}:{site_id}"`) so two sites can never collide.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub price: String,
    pub url: String,
    pub location: Option<String>,
    pub image_url: Option<String>,
}

impl Listing {
    pub fn from_raw(site: &str, raw: RawListing) -> Self {
        Self {
            id: format!("{site}:{}", raw.id),
            title: raw.title,
            price: raw.price,
            url: raw.url,
            location: raw.location.filter(|l| !l.trim().is_empty()),
            image_url: raw.image_url,
        }
    }
}

fn ws_regex() -> &'static Regex {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    RE_WS.get_or_init(|| Regex::new(r"\s+").expect("static whitespace regex"))
}

/// Collapse runs of whitespace to one space and trim.
pub fn collapse_ws(s: &str) -> String {
    ws_regex().replace_all(s, " ").trim().to_string()
}

/// Normalized `(title, price)` join used for repost detection.
pub fn fingerprint(listing: &Listing) -> String {
    let title = collapse_ws(&listing.title).to_lowercase();
    let price: String = listing.price.chars().filter(|c| !c.is_whitespace()).collect();
    format!("{title}|{price}")
}

/// What actually goes into the fingerprint set: SHA-256 hex of [`fingerprint`].
pub fn fingerprint_digest(listing: &Listing) -> String {
    format!("{:x}", Sha256::digest(fingerprint(listing).as_bytes()))
}

/// Display label for a listing link, taken from the url host.
pub fn site_label(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "link".to_string())
}

// src/config/sites.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_SITES_PATH: &str = "WATCH_SITES_PATH";
pub const DEFAULT_SITES_PATH: &str = "config/sites.toml";

/// CSS selectors describing one site's results page.
///
/// Every selector is evaluated relative to one `item` element, except
/// `item` itself which is evaluated against the whole document.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SiteSelectors {
    /// Namespace for ids and the label used in logs.
    pub name: String,
    /// Env var holding this site's `|`-delimited search page addresses.
    pub urls_env: String,
    pub item: String,
    /// Attribute on the item element that carries the site's listing id.
    /// When absent, the trailing number of the link path is used.
    #[serde(default)]
    pub id_attr: Option<String>,
    pub title: String,
    pub price: String,
    pub link: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// Substring that only appears on an anti-bot interstitial.
    #[serde(default)]
    pub block_marker: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SitesFile {
    #[serde(default)]
    site: Vec<SiteSelectors>,
}

pub fn parse_sites(s: &str) -> Result<Vec<SiteSelectors>> {
    let file: SitesFile = toml::from_str(s).context("parsing sites toml")?;
    let mut names = std::collections::BTreeSet::new();
    for site in &file.site {
        if site.name.trim().is_empty() {
            return Err(anyhow!("site entry with empty name"));
        }
        if !names.insert(site.name.as_str()) {
            return Err(anyhow!("duplicate site name {:?}", site.name));
        }
    }
    Ok(file.site)
}

pub fn load_sites_from(path: &Path) -> Result<Vec<SiteSelectors>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sites from {}", path.display()))?;
    parse_sites(&content)
}

/// 1) $WATCH_SITES_PATH
/// 2) config/sites.toml
pub fn load_sites_default() -> Result<Vec<SiteSelectors>> {
    if let Ok(p) = std::env::var(ENV_SITES_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("{ENV_SITES_PATH} points to non-existent path"));
        }
        return load_sites_from(&pb);
    }
    load_sites_from(Path::new(DEFAULT_SITES_PATH))
}

// src/ingest/types.rs
use anyhow::Result;

use crate::listing::RawListing;

/// One per supported site. Opening a session acquires whatever per-attempt
/// resource the site needs (HTTP client with its own cookie jar, a remote
/// browser, ...).
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short site name, also used as the id namespace.
    fn name(&self) -> &str;

    async fn open_session(&self) -> Result<Box<dyn PageSession>>;
}

#[async_trait::async_trait]
pub trait PageSession: Send {
    /// Read the top of the results page at `address`.
    ///
    /// A page that loads but shows no listings is `Ok(vec![])`, never an error.
    async fn fetch_page(&mut self, address: &str) -> Result<Vec<RawListing>>;

    /// Release the session. Called exactly once, whatever `fetch_page` returned.
    async fn close(self: Box<Self>);
}

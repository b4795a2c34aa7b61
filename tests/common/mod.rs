// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use classifieds_watch::ingest::types::{PageSession, SourceAdapter};
use classifieds_watch::ingest::Source;
use classifieds_watch::RawListing;

pub fn raw(id: &str, title: &str, price: &str) -> RawListing {
    RawListing {
        id: id.into(),
        title: title.into(),
        price: price.into(),
        url: format!("https://www.kleinanzeigen.de/s-anzeige/{id}"),
        location: Some("Berlin".into()),
        image_url: None,
    }
}

#[derive(Clone)]
enum Page {
    Listings(Vec<RawListing>),
    Broken(String),
}

/// Adapter serving fixed pages per address and counting sessions.
#[derive(Clone)]
pub struct FakeSite {
    name: String,
    pages: Arc<Mutex<HashMap<String, Page>>>,
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

impl FakeSite {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            pages: Arc::default(),
            opened: Arc::default(),
            closed: Arc::default(),
        }
    }

    pub fn page(self, address: &str, listings: Vec<RawListing>) -> Self {
        self.set_page(address, listings);
        self
    }

    pub fn broken(self, address: &str, reason: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(address.into(), Page::Broken(reason.into()));
        self
    }

    /// Replace what `address` serves from now on.
    pub fn set_page(&self, address: &str, listings: Vec<RawListing>) {
        self.pages
            .lock()
            .unwrap()
            .insert(address.into(), Page::Listings(listings));
    }

    pub fn source(&self, addresses: &[&str]) -> Source {
        Source::new(
            Arc::new(self.clone()),
            addresses.iter().map(|a| a.to_string()).collect(),
        )
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

struct FakeSession {
    pages: Arc<Mutex<HashMap<String, Page>>>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl SourceAdapter for FakeSite {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open_session(&self) -> Result<Box<dyn PageSession>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            pages: self.pages.clone(),
            closed: self.closed.clone(),
        }))
    }
}

#[async_trait]
impl PageSession for FakeSession {
    async fn fetch_page(&mut self, address: &str) -> Result<Vec<RawListing>> {
        let page = self.pages.lock().unwrap().get(address).cloned();
        match page {
            Some(Page::Listings(v)) => Ok(v),
            Some(Page::Broken(reason)) => Err(anyhow!("{reason}")),
            None => Err(anyhow!("navigation timeout: {address}")),
        }
    }

    async fn close(self: Box<Self>) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

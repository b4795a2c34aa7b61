// src/ingest/providers/mod.rs
pub mod browserless;
pub mod selector;

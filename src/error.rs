// src/error.rs
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WatchError>;

/// Failure taxonomy for one run.
///
/// `Notify` is the only non-fatal variant: the dispatcher logs it and moves
/// on. Everything else ends the run with exit code 1.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("invalid configuration: {0}")]
    Validation(String),

    #[error("source {address} unavailable after {attempts} attempts: {source:#}")]
    SourceUnavailable {
        address: String,
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("seen-state store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("notification failed: {0}")]
    Notify(String),
}

impl WatchError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        WatchError::StoreUnavailable(err.to_string())
    }

    pub fn is_fatal(&self) -> bool {
        !matches!(self, WatchError::Notify(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_unavailable_names_address_and_cause() {
        let err = WatchError::SourceUnavailable {
            address: "https://example.test/s".into(),
            attempts: 2,
            source: anyhow::anyhow!("navigation timeout"),
        };
        let msg = err.to_string();
        assert!(msg.contains("https://example.test/s"));
        assert!(msg.contains("navigation timeout"));
        assert!(err.is_fatal());
    }

    #[test]
    fn notify_is_not_fatal() {
        assert!(!WatchError::Notify("429".into()).is_fatal());
    }
}

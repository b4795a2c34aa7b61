// src/notify/capture.rs
//! Recording transport for tests.

use std::sync::Mutex;

use anyhow::{anyhow, Result};
use tokio::time::Instant;

use super::{SendOptions, Transport};

#[derive(Debug, Clone)]
pub struct Sent {
    pub text: String,
    pub opts: SendOptions,
    pub at: Instant,
}

#[derive(Debug, Default)]
pub struct CaptureTransport {
    sent: Mutex<Vec<Sent>>,
    attempts: Mutex<usize>,
    /// 1-based attempt numbers that fail.
    fail_on: Vec<usize>,
    fail_all: bool,
}

impl CaptureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(attempts: &[usize]) -> Self {
        Self {
            fail_on: attempts.to_vec(),
            ..Self::default()
        }
    }

    pub fn always_failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Successfully delivered messages, in order.
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().expect("capture mutex poisoned").clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|s| s.text).collect()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().expect("capture mutex poisoned")
    }
}

#[async_trait::async_trait]
impl Transport for CaptureTransport {
    async fn send(&self, text: &str, opts: SendOptions) -> Result<()> {
        let n = {
            let mut a = self.attempts.lock().expect("capture mutex poisoned");
            *a += 1;
            *a
        };
        if self.fail_all || self.fail_on.contains(&n) {
            return Err(anyhow!("simulated send failure #{n}"));
        }
        self.sent.lock().expect("capture mutex poisoned").push(Sent {
            text: text.to_string(),
            opts,
            at: Instant::now(),
        });
        Ok(())
    }
}

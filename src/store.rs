//! Persistence contract the engine needs: an append-only event log and a
//! digest queue. Signature persistence lives in `dedup::SignatureTable`.
//!
//! The in-memory store caps the log at 5 000 events, dropping the oldest;
//! a JSON snapshot can be written as a best-effort backup.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;

use crate::event::{Category, ScoredEvent};

pub const DEFAULT_EVENT_CAP: usize = 5_000;

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append a produced event to the log. Append-only; no updates.
    async fn append_event(&self, event: ScoredEvent) -> Result<()>;

    /// Most recent `n` events for user-facing listings. Suppressed
    /// records are never surfaced here.
    async fn recent(&self, n: usize) -> Vec<ScoredEvent>;

    /// Queue a Digest-category event for the next periodic summary.
    async fn enqueue_digest(&self, event: ScoredEvent) -> Result<()>;

    /// Drain the pending digest batch (empties the queue).
    async fn drain_digest(&self) -> Vec<ScoredEvent>;

    async fn event_count(&self) -> usize;
}

#[derive(Debug, Default)]
struct Inner {
    events: Vec<ScoredEvent>,
    digest_queue: Vec<ScoredEvent>,
}

#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    cap: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_EVENT_CAP)
    }

    pub fn with_cap(cap: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            cap,
        }
    }

    /// Best-effort JSON snapshot of the event log.
    pub async fn snapshot_to_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = {
            let inner = self.inner.lock().expect("store mutex poisoned");
            serde_json::to_vec_pretty(&inner.events).context("serialize event log")?
        };
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).await.context("snapshot dir")?;
        }
        fs::write(path.as_ref(), json).await.context("write snapshot")?;
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn append_event(&self, event: ScoredEvent) -> Result<()> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.events.push(event);
        if inner.events.len() > self.cap {
            let excess = inner.events.len() - self.cap;
            inner.events.drain(0..excess);
        }
        Ok(())
    }

    async fn recent(&self, n: usize) -> Vec<ScoredEvent> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        inner
            .events
            .iter()
            .rev()
            .filter(|e| e.category != Category::Suppressed)
            .take(n)
            .cloned()
            .collect()
    }

    async fn enqueue_digest(&self, event: ScoredEvent) -> Result<()> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.digest_queue.push(event);
        Ok(())
    }

    async fn drain_digest(&self) -> Vec<ScoredEvent> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        std::mem::take(&mut inner.digest_queue)
    }

    async fn event_count(&self) -> usize {
        self.inner.lock().expect("store mutex poisoned").events.len()
    }
}

//! # Deduplication Engine
//! Near-identical reports recur across polling cycles and across sources
//! describing the same underlying recall. A signature over normalized
//! identity fields (lower-cased, whitespace-collapsed, description
//! truncated to its first words) tolerates minor textual variation while
//! staying deterministic and cheap.
//!
//! Policy: duplicates are silently dropped before persistence and before
//! notification; first-seen wins for the whole window. Entries older
//! than the window are logically stale; reads check age, no eager
//! eviction.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use crate::event::NormalizedEvent;

pub const DEFAULT_WINDOW_DAYS: i64 = 14;

/// Words of the description that participate in the signature.
const SIGNATURE_WORDS: usize = 5;

/// Stable content hash over the identity fields of an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventSignature(String);

impl EventSignature {
    pub fn new(
        manufacturer: &str,
        device_descriptor: &str,
        classification: &str,
        description: &str,
    ) -> Self {
        let material = [
            manufacturer.trim().to_ascii_lowercase(),
            device_descriptor.trim().to_ascii_lowercase(),
            classification.trim().to_ascii_lowercase(),
            normalized_prefix(description, SIGNATURE_WORDS),
        ]
        .join("|");

        let mut hasher = Sha256::new();
        hasher.update(material.as_bytes());
        let digest = hasher.finalize();
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        Self(hex)
    }

    pub fn of_event(event: &NormalizedEvent) -> Self {
        Self::new(
            event.manufacturer.as_deref().unwrap_or_default(),
            event.device_descriptor.as_deref().unwrap_or_default(),
            event.classification_tag.as_deref().unwrap_or_default(),
            &event.description,
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Lower-case, strip non-word characters, keep the first `n` words.
fn normalized_prefix(s: &str, n: usize) -> String {
    s.to_ascii_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .take(n)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Shared signature → last-seen table. Owned by the orchestrator and
/// passed by reference to pipeline workers; the check-and-record pair is
/// indivisible under one lock.
#[derive(Debug)]
pub struct SignatureTable {
    inner: Mutex<HashMap<String, DateTime<Utc>>>,
    window: Duration,
}

impl SignatureTable {
    pub fn with_window_days(days: i64) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            window: Duration::days(days),
        }
    }

    pub fn window_days(&self) -> i64 {
        self.window.num_days()
    }

    /// Read-only duplicate check: a prior entry exists and is inside the window.
    pub fn is_duplicate(&self, sig: &EventSignature, now: DateTime<Utc>) -> bool {
        let map = self.inner.lock().expect("signature table mutex poisoned");
        match map.get(sig.as_str()) {
            Some(last_seen) => now.signed_duration_since(*last_seen) <= self.window,
            None => false,
        }
    }

    /// Record a signature as seen at `now`.
    pub fn record(&self, sig: &EventSignature, now: DateTime<Utc>) {
        let mut map = self.inner.lock().expect("signature table mutex poisoned");
        map.insert(sig.as_str().to_string(), now);
    }

    /// Atomic check-and-record: returns true (suppress) when `sig` was
    /// seen inside the window; otherwise records `now` and returns false.
    /// A suppressed duplicate does NOT refresh the last-seen timestamp;
    /// the first-seen record anchors the window.
    pub fn check_and_record(&self, sig: &EventSignature, now: DateTime<Utc>) -> bool {
        let mut map = self.inner.lock().expect("signature table mutex poisoned");
        if let Some(last_seen) = map.get(sig.as_str()) {
            if now.signed_duration_since(*last_seen) <= self.window {
                return true;
            }
        }
        map.insert(sig.as_str().to_string(), now);
        false
    }

    pub fn lookup(&self, sig: &EventSignature) -> Option<DateTime<Utc>> {
        let map = self.inner.lock().expect("signature table mutex poisoned");
        map.get(sig.as_str()).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("signature table mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SignatureTable {
    fn default() -> Self {
        Self::with_window_days(DEFAULT_WINDOW_DAYS)
    }
}

//! Per-module content cache.
//!
//! Each module has two independent entries: the raw text and the structured
//! value. Misses are fetched lazily. Concurrent misses for the same entry are
//! not merged into one request; instead every fetch takes a ticket from a
//! per-entry counter and only the holder of the newest ticket may store its
//! response. A confirmed write also bumps both counters, so a read that was
//! already in flight cannot overwrite freshly saved text.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::client::{ClientError, ConfigApi};

/// Which representation of a module an entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Raw,
    Structured,
}

/// Known raw-text byte lengths per module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LengthIndex(HashMap<String, usize>);

impl LengthIndex {
    pub fn get(&self, name: &str) -> Option<usize> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, length: usize) {
        self.0.insert(name.into(), length);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, usize)> for LengthIndex {
    fn from_iter<I: IntoIterator<Item = (S, usize)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[derive(Debug, Default)]
struct CacheState {
    raw: HashMap<String, String>,
    structured: HashMap<String, Value>,
    lengths: LengthIndex,
    tickets: HashMap<(String, Variant), u64>,
}

impl CacheState {
    fn issue(&mut self, name: &str, variant: Variant) -> u64 {
        let ticket = self.tickets.entry((name.to_string(), variant)).or_insert(0);
        *ticket += 1;
        *ticket
    }

    fn current(&self, name: &str, variant: Variant) -> u64 {
        self.tickets
            .get(&(name.to_string(), variant))
            .copied()
            .unwrap_or(0)
    }

    fn is_current(&self, name: &str, variant: Variant, ticket: u64) -> bool {
        self.current(name, variant) == ticket
    }
}

/// Shared content cache. Cloning shares the same entries.
#[derive(Clone)]
pub struct ContentCache {
    api: Arc<dyn ConfigApi>,
    state: Arc<Mutex<CacheState>>,
}

impl ContentCache {
    pub fn new(api: Arc<dyn ConfigApi>) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    pub fn cached_raw(&self, name: &str) -> Option<String> {
        self.state.lock().raw.get(name).cloned()
    }

    pub fn cached_structured(&self, name: &str) -> Option<Value> {
        self.state.lock().structured.get(name).cloned()
    }

    pub fn contains(&self, name: &str, variant: Variant) -> bool {
        let state = self.state.lock();
        match variant {
            Variant::Raw => state.raw.contains_key(name),
            Variant::Structured => state.structured.contains_key(name),
        }
    }

    /// Raw text of a module, fetched on a miss.
    pub async fn raw(&self, name: &str) -> Result<String, ClientError> {
        if let Some(text) = self.cached_raw(name) {
            return Ok(text);
        }
        let ticket = self.state.lock().issue(name, Variant::Raw);
        let text = self.api.get_raw(name).await?;

        let mut state = self.state.lock();
        if state.is_current(name, Variant::Raw, ticket) {
            state.lengths.insert(name, text.len());
            state.raw.insert(name.to_string(), text.clone());
            Ok(text)
        } else {
            tracing::debug!(module = name, "discarding stale raw response");
            // A newer fetch or a write owns the entry now.
            Ok(state.raw.get(name).cloned().unwrap_or(text))
        }
    }

    /// Structured value of a module, fetched on a miss.
    pub async fn structured(&self, name: &str) -> Result<Value, ClientError> {
        if let Some(value) = self.cached_structured(name) {
            return Ok(value);
        }
        let ticket = self.state.lock().issue(name, Variant::Structured);
        let value = self.api.get_structured(name).await?;

        let mut state = self.state.lock();
        if state.is_current(name, Variant::Structured, ticket) {
            state.structured.insert(name.to_string(), value.clone());
            Ok(value)
        } else {
            tracing::debug!(module = name, "discarding stale structured response");
            Ok(state.structured.get(name).cloned().unwrap_or(value))
        }
    }

    /// Fetch raw text only to learn its length. The text fills the raw entry
    /// when that entry is still empty.
    ///
    /// Measuring does not take a ticket of its own, so it never turns a
    /// concurrent [`ContentCache::raw`] fetch stale; it only stores when no
    /// fetch or write was issued while it was in flight.
    pub async fn measure(&self, name: &str) -> Result<usize, ClientError> {
        let seen = self.state.lock().current(name, Variant::Raw);
        let text = self.api.get_raw(name).await?;

        let mut state = self.state.lock();
        let length = text.len();
        if state.current(name, Variant::Raw) == seen {
            state.lengths.insert(name, length);
            if !state.raw.contains_key(name) {
                state.raw.insert(name.to_string(), text);
            }
        }
        Ok(length)
    }

    /// Apply a write the server has confirmed.
    pub fn record_write(&self, name: &str, text: &str) {
        let mut state = self.state.lock();
        state.issue(name, Variant::Raw);
        state.issue(name, Variant::Structured);
        state.raw.insert(name.to_string(), text.to_string());
        state.structured.remove(name);
        state.lengths.insert(name, text.len());
    }

    pub fn length(&self, name: &str) -> Option<usize> {
        self.state.lock().lengths.get(name)
    }

    /// Snapshot of the length index.
    pub fn lengths(&self) -> LengthIndex {
        self.state.lock().lengths.clone()
    }

    /// Drop every entry and length. Tickets survive so older in-flight
    /// responses stay stale.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.raw.clear();
        state.structured.clear();
        state.lengths = LengthIndex::default();
        let keys: Vec<_> = state.tickets.keys().cloned().collect();
        for (name, variant) in keys {
            state.issue(&name, variant);
        }
    }
}

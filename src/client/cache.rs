use crate::client::RawRecord;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    records: Vec<RawRecord>,
    stored: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.stored.elapsed() >= ttl
    }
}

/// In-memory search results keyed by adapter, query and limit.
///
/// Only non-empty results are stored, so a failed source is asked again on
/// the next call.
#[derive(Debug)]
pub struct SearchCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl SearchCache {
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    fn key(adapter: &str, query: &str, limit: u32) -> String {
        format!("{adapter}\u{1f}{}\u{1f}{limit}", query.trim().to_lowercase())
    }

    pub async fn get(&self, adapter: &str, query: &str, limit: u32) -> Option<Vec<RawRecord>> {
        let key = Self::key(adapter, query, limit);
        let entries = self.entries.read().await;
        let entry = entries.get(&key)?;
        if entry.is_expired(self.ttl) {
            return None;
        }
        debug!("Cache hit for {} '{}'", adapter, query);
        Some(entry.records.clone())
    }

    pub async fn insert(&self, adapter: &str, query: &str, limit: u32, records: &[RawRecord]) {
        if records.is_empty() || self.ttl.is_zero() {
            return;
        }

        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| !entry.is_expired(self.ttl));
        let key = Self::key(adapter, query, limit);
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored)
                .map(|(key, _)| key.clone())
            {
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key,
            CacheEntry {
                records: records.to_vec(),
                stored: Instant::now(),
            },
        );
        debug!("Cached {} records, cache size: {}", records.len(), entries.len());
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Stored entries, expired ones included until the next insert
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

//! Routing Cache (component F).
//!
//! Two-tier lookup: an exact-hash tier and, on miss, a cosine-similarity
//! tier over stored embeddings. Ships an in-memory reference
//! implementation of [`CacheStore`] — TTL expiry, atomic hit-count
//! increment, lazy reaping — in the style of
//! `dashflow_registry::cache::InMemoryCacheStore`.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::collaborators::{CacheStats, CacheStore};
use crate::error::Result;
use crate::types::CacheEntry;

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f64
}

/// An in-memory, process-local [`CacheStore`]. Suitable as a reference
/// implementation and for single-node deployments/testing; a production
/// deployment backs this trait with a real K/V + vector-similarity store.
pub struct InMemoryCacheStore {
    by_hash: DashMap<String, Uuid>,
    entries: RwLock<std::collections::HashMap<Uuid, CacheEntry>>,
    total_hits: AtomicU64,
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCacheStore {
    #[must_use]
    pub fn new() -> Self {
        InMemoryCacheStore {
            by_hash: DashMap::new(),
            entries: RwLock::new(std::collections::HashMap::new()),
            total_hits: AtomicU64::new(0),
        }
    }
}

#[async_trait::async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get_by_hash(&self, exact_hash: &str) -> Result<Option<CacheEntry>> {
        let now = Utc::now();
        let Some(id) = self.by_hash.get(exact_hash).map(|r| *r) else {
            return Ok(None);
        };
        let mut entries = self.entries.write();
        let Some(entry) = entries.get_mut(&id) else {
            return Ok(None);
        };
        if !entry.is_live(now) {
            return Ok(None);
        }
        entry.hit_count += 1;
        self.total_hits.fetch_add(1, Ordering::Relaxed);
        Ok(Some(entry.clone()))
    }

    async fn get_by_similarity(
        &self,
        embedding: &[f32],
        threshold: f64,
    ) -> Result<Option<CacheEntry>> {
        let now = Utc::now();
        let mut entries = self.entries.write();
        let best = entries
            .values_mut()
            .filter(|entry| entry.is_live(now) && entry.embedding.is_some())
            .filter_map(|entry| {
                let similarity =
                    cosine_similarity(embedding, entry.embedding.as_ref().unwrap());
                if similarity >= threshold {
                    Some((similarity, entry))
                } else {
                    None
                }
            })
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        match best {
            Some((_, entry)) => {
                entry.hit_count += 1;
                self.total_hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(entry.clone()))
            }
            None => Ok(None),
        }
    }

    async fn insert(&self, entry: CacheEntry) -> Result<()> {
        let hash = entry.exact_hash.clone();
        let id = entry.id;
        self.entries.write().insert(id, entry);
        // Later insertions for the same hash are treated as an update:
        // the hash index simply repoints, and hit counts never merge
        // across the two distinct entry rows.
        self.by_hash.insert(hash, id);
        Ok(())
    }

    async fn increment_hit(&self, id: Uuid) -> Result<()> {
        if let Some(entry) = self.entries.write().get_mut(&id) {
            entry.hit_count += 1;
            self.total_hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    async fn prune(&self, expired_only: bool, now: DateTime<Utc>) -> Result<u64> {
        let mut entries = self.entries.write();
        let to_remove: Vec<Uuid> = entries
            .iter()
            .filter(|(_, entry)| !expired_only || entry.expires_at <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in &to_remove {
            if let Some(entry) = entries.remove(id) {
                self.by_hash.remove(&entry.exact_hash);
            }
        }
        Ok(to_remove.len() as u64)
    }

    async fn stats(&self) -> Result<CacheStats> {
        let entries = self.entries.read();
        Ok(CacheStats {
            total_entries: entries.len() as u64,
            total_hits: self.total_hits.load(Ordering::Relaxed),
        })
    }
}

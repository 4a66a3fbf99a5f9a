// sift-gateway-rs/src/cache.rs
//
// Analysis result cache
// Bounded FIFO keyed by exact input text. Insertion order decides
// eviction; repeat lookups and overwrites do not reorder entries.

use std::collections::{HashMap, VecDeque};

use tokio::sync::RwLock;
use tracing::debug;

use crate::routes::AnalysisEnvelope;

struct CacheState {
    entries: HashMap<String, AnalysisEnvelope>,
    order: VecDeque<String>,
}

pub struct ResultCache {
    capacity: usize,
    inner: RwLock<CacheState>,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: RwLock::new(CacheState {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub async fn get(&self, text: &str) -> Option<AnalysisEnvelope> {
        self.inner.read().await.entries.get(text).cloned()
    }

    pub async fn put(&self, text: &str, envelope: AnalysisEnvelope) {
        if self.capacity == 0 {
            return;
        }
        let mut state = self.inner.write().await;
        if state.entries.contains_key(text) {
            // Overwrite in place; the entry keeps its queue position.
            state.entries.insert(text.to_string(), envelope);
            return;
        }
        if state.entries.len() >= self.capacity {
            if let Some(oldest) = state.order.pop_front() {
                debug!("evicting oldest cached analysis");
                state.entries.remove(&oldest);
            }
        }
        state.order.push_back(text.to_string());
        state.entries.insert(text.to_string(), envelope);
    }

    /// Drop everything, returning how many entries were removed.
    pub async fn flush(&self) -> usize {
        let mut state = self.inner.write().await;
        let removed = state.entries.len();
        state.entries.clear();
        state.order.clear();
        removed
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_analyzer::AnalysisReport;

    fn envelope(text: &str) -> AnalysisEnvelope {
        AnalysisEnvelope {
            report: AnalysisReport::neutral(),
            processing_time: 0.0,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn hit_returns_the_stored_envelope() {
        let cache = ResultCache::new(10);
        cache.put("hello", envelope("hello")).await;
        let hit = cache.get("hello").await.unwrap();
        assert_eq!(hit.text, "hello");
        assert!(cache.get("other").await.is_none());
    }

    #[tokio::test]
    async fn oldest_entry_is_evicted_at_capacity() {
        let cache = ResultCache::new(2);
        cache.put("a", envelope("a")).await;
        cache.put("b", envelope("b")).await;
        cache.put("c", envelope("c")).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get("a").await.is_none());
        assert!(cache.get("b").await.is_some());
        assert!(cache.get("c").await.is_some());
    }

    #[tokio::test]
    async fn overwrite_keeps_queue_position() {
        let cache = ResultCache::new(2);
        cache.put("a", envelope("a")).await;
        cache.put("b", envelope("b")).await;
        // Overwriting "a" must not make it newest.
        cache.put("a", envelope("a")).await;
        cache.put("c", envelope("c")).await;

        assert!(cache.get("a").await.is_none());
        assert!(cache.get("b").await.is_some());
        assert!(cache.get("c").await.is_some());
    }

    #[tokio::test]
    async fn repeated_reads_do_not_reorder() {
        let cache = ResultCache::new(2);
        cache.put("a", envelope("a")).await;
        cache.put("b", envelope("b")).await;
        for _ in 0..5 {
            assert!(cache.get("a").await.is_some());
        }
        cache.put("c", envelope("c")).await;
        // "a" is still the oldest despite being read repeatedly.
        assert!(cache.get("a").await.is_none());
    }

    #[tokio::test]
    async fn flush_reports_removed_count() {
        let cache = ResultCache::new(10);
        cache.put("a", envelope("a")).await;
        cache.put("b", envelope("b")).await;
        assert_eq!(cache.flush().await, 2);
        assert!(cache.is_empty().await);
        assert_eq!(cache.flush().await, 0);
    }

    #[tokio::test]
    async fn zero_capacity_stores_nothing() {
        let cache = ResultCache::new(0);
        cache.put("a", envelope("a")).await;
        assert!(cache.get("a").await.is_none());
        assert_eq!(cache.len().await, 0);
    }
}

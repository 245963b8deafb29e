use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// Keys of the cached list views the UI reads between mutations.
///
/// Every successful assignment mutation invalidates all three so the console
/// observes a consistent state on its next read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewKey {
    ActivityList,
    UnassignedActivities,
    ActivityAssignments(String),
}

struct CachedView {
    stored_at: Instant,
    value: serde_json::Value,
}

/// Read-through cache for list views, with TTL as a staleness bound and
/// explicit invalidation as the primary mechanism.
pub struct ViewCache {
    ttl: Duration,
    entries: RwLock<HashMap<ViewKey, CachedView>>,
}

impl ViewCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &ViewKey) -> Option<serde_json::Value> {
        let entries = self.entries.read().await;
        let cached = entries.get(key)?;
        if cached.stored_at.elapsed() > self.ttl {
            return None;
        }
        Some(cached.value.clone())
    }

    pub async fn put(&self, key: ViewKey, value: serde_json::Value) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CachedView {
                stored_at: Instant::now(),
                value,
            },
        );
    }

    pub async fn invalidate(&self, keys: &[ViewKey]) {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(key);
        }
    }

    /// Invalidate everything an assignment mutation can make stale: the
    /// activity list, the unassigned list and the per-activity assignments.
    pub async fn invalidate_activity_views(&self, activity_id: &str) {
        self.invalidate(&[
            ViewKey::ActivityList,
            ViewKey::UnassignedActivities,
            ViewKey::ActivityAssignments(activity_id.to_string()),
        ])
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn put_get_roundtrip() {
        let cache = ViewCache::new(Duration::from_secs(60));
        cache.put(ViewKey::ActivityList, json!([1, 2, 3])).await;
        assert_eq!(cache.get(&ViewKey::ActivityList).await, Some(json!([1, 2, 3])));
    }

    #[tokio::test]
    async fn expired_entries_are_misses() {
        let cache = ViewCache::new(Duration::from_millis(0));
        cache.put(ViewKey::ActivityList, json!("x")).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(cache.get(&ViewKey::ActivityList).await.is_none());
    }

    #[tokio::test]
    async fn activity_mutation_invalidates_all_three_views() {
        let cache = ViewCache::new(Duration::from_secs(60));
        cache.put(ViewKey::ActivityList, json!("a")).await;
        cache.put(ViewKey::UnassignedActivities, json!("b")).await;
        cache
            .put(ViewKey::ActivityAssignments("ev1".into()), json!("c"))
            .await;
        cache
            .put(ViewKey::ActivityAssignments("ev2".into()), json!("d"))
            .await;

        cache.invalidate_activity_views("ev1").await;

        assert!(cache.get(&ViewKey::ActivityList).await.is_none());
        assert!(cache.get(&ViewKey::UnassignedActivities).await.is_none());
        assert!(cache
            .get(&ViewKey::ActivityAssignments("ev1".into()))
            .await
            .is_none());
        // Unrelated per-activity views survive.
        assert!(cache
            .get(&ViewKey::ActivityAssignments("ev2".into()))
            .await
            .is_some());
    }
}

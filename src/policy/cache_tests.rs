// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the policy cache

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::errors::ErrorKind;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    type Data = BTreeMap<String, String>;

    /// In-memory store whose records can be changed between refreshes.
    #[derive(Default)]
    struct FakeStore {
        records: std::sync::Mutex<HashMap<(RecordKind, String), Data>>,
        timeout: bool,
    }

    impl FakeStore {
        fn put(&self, kind: RecordKind, name: &str, pairs: &[(&str, &str)]) {
            let data = pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect();
            self.records
                .lock()
                .unwrap()
                .insert((kind, name.to_string()), data);
        }

        fn remove(&self, kind: RecordKind, name: &str) {
            self.records
                .lock()
                .unwrap()
                .remove(&(kind, name.to_string()));
        }
    }

    #[async_trait]
    impl PolicyStore for FakeStore {
        async fn fetch(&self, kind: RecordKind, name: &str) -> Result<Data, StoreError> {
            if self.timeout {
                return Err(StoreError::Timeout {
                    name: name.to_string(),
                    timeout: Duration::from_secs(5),
                });
            }
            self.records
                .lock()
                .unwrap()
                .get(&(kind, name.to_string()))
                .cloned()
                .ok_or_else(|| StoreError::NotFound {
                    name: name.to_string(),
                    namespace: "getdeck".to_string(),
                })
        }
    }

    fn cache(store: Arc<FakeStore>) -> PolicyCache {
        PolicyCache::new(store, "default", "default", GroupQuota::default())
    }

    #[tokio::test]
    async fn test_missing_policy_is_not_found() {
        let cache = cache(Arc::new(FakeStore::default()));
        let err = cache.policy("free").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyNotFound);
    }

    #[tokio::test]
    async fn test_refresh_publishes_record() {
        let store = Arc::new(FakeStore::default());
        store.put(RecordKind::Policy, "free", &[("NODE_COUNT_MAX", "2")]);
        let cache = cache(store.clone());

        cache.refresh(RecordKind::Policy, "free").await.unwrap();
        assert_eq!(cache.policy("free").unwrap().node_count_max, Some(2));
        assert!(cache.contains_policy("free"));
    }

    #[tokio::test]
    async fn test_records_do_not_change_without_refresh() {
        let store = Arc::new(FakeStore::default());
        store.put(RecordKind::Policy, "free", &[("NODE_COUNT_MAX", "2")]);
        let cache = cache(store.clone());
        cache.refresh(RecordKind::Policy, "free").await.unwrap();

        let before = cache.policy("free").unwrap();
        store.put(RecordKind::Policy, "free", &[("NODE_COUNT_MAX", "4")]);
        assert_eq!(cache.policy("free").unwrap().node_count_max, Some(2));

        cache.refresh(RecordKind::Policy, "free").await.unwrap();
        assert_eq!(cache.policy("free").unwrap().node_count_max, Some(4));
        assert_eq!(
            before.node_count_max,
            Some(2),
            "Readers holding the old record keep a consistent view"
        );
    }

    #[tokio::test]
    async fn test_fallback_to_default_policy() {
        let store = Arc::new(FakeStore::default());
        store.put(RecordKind::Policy, "default", &[("NODE_COUNT_MIN", "2")]);
        let cache = cache(store);
        cache.refresh(RecordKind::Policy, "default").await.unwrap();

        assert_eq!(cache.policy("developer").unwrap().node_count_min, 2);
        assert!(!cache.contains_policy("developer"));
    }

    #[tokio::test]
    async fn test_invalid_record_keeps_previous() {
        let store = Arc::new(FakeStore::default());
        store.put(RecordKind::Policy, "free", &[("NODE_COUNT_MAX", "2")]);
        let cache = cache(store.clone());
        cache.refresh(RecordKind::Policy, "free").await.unwrap();

        store.put(RecordKind::Policy, "free", &[("NODE_COUNT_MAX", "lots")]);
        let err = cache.refresh(RecordKind::Policy, "free").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPolicy);
        assert_eq!(cache.policy("free").unwrap().node_count_max, Some(2));
    }

    #[tokio::test]
    async fn test_deleted_record_is_evicted() {
        let store = Arc::new(FakeStore::default());
        store.put(RecordKind::Policy, "free", &[]);
        let cache = cache(store.clone());
        cache.refresh(RecordKind::Policy, "free").await.unwrap();

        store.remove(RecordKind::Policy, "free");
        let err = cache.refresh(RecordKind::Policy, "free").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyNotFound);
        assert!(!cache.contains_policy("free"));
    }

    #[tokio::test]
    async fn test_timeout_is_distinguishable() {
        let store = Arc::new(FakeStore {
            timeout: true,
            ..FakeStore::default()
        });
        let err = cache(store)
            .refresh(RecordKind::Policy, "free")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_quota_fallback_chain() {
        let store = Arc::new(FakeStore::default());
        let cache = cache(store.clone());
        assert_eq!(*cache.quota("free"), GroupQuota::default());

        store.put(RecordKind::Quota, "default", &[("USER_CLUSTER_LIMIT", "2")]);
        store.put(RecordKind::Quota, "free", &[("GROUP_CLUSTER_LIMIT", "0")]);
        cache.refresh(RecordKind::Quota, "default").await.unwrap();
        assert_eq!(cache.quota("free").user_cluster_limit, 2);

        cache.refresh(RecordKind::Quota, "free").await.unwrap();
        let free = cache.quota("free");
        assert_eq!(free.group_cluster_limit, None);
        assert_eq!(free.user_cluster_limit, 1, "Omitted keys use configured defaults");
    }

    #[tokio::test]
    async fn test_refresh_all_is_best_effort() {
        let store = Arc::new(FakeStore::default());
        store.put(RecordKind::Policy, "default", &[]);
        store.put(RecordKind::Quota, "free", &[]);
        let cache = cache(store);

        let loaded = cache.refresh_all(["default", "developer", "free"]).await;
        assert_eq!(loaded, 2);
        assert!(cache.contains_policy("default"));
        assert!(!cache.contains_policy("developer"));
    }

    const NARROW: [(&str, &str); 2] = [("NODE_COUNT_MIN", "2"), ("NODE_COUNT_MAX", "4")];
    const WIDE: [(&str, &str); 3] = [
        ("NODE_COUNT_MIN", "3"),
        ("NODE_COUNT_MAX", "6"),
        ("LIFETIME_LIMIT", "2h"),
    ];

    /// Store that alternates between two records and tracks overlapping fetches.
    #[derive(Default)]
    struct AlternatingStore {
        fetches: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl PolicyStore for AlternatingStore {
        async fn fetch(&self, _kind: RecordKind, _name: &str) -> Result<Data, StoreError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(1)).await;
            let pairs: &[(&str, &str)] = if self.fetches.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                &NARROW
            } else {
                &WIDE
            };
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect())
        }
    }

    fn record(pairs: &[(&str, &str)]) -> PolicyRecord {
        let data = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        PolicyRecord::from_data(&data).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refreshes_publish_whole_records() {
        let store = Arc::new(AlternatingStore::default());
        let cache = Arc::new(PolicyCache::new(
            store.clone(),
            "default",
            "default",
            GroupQuota::default(),
        ));
        cache.refresh(RecordKind::Policy, "x").await.unwrap();

        let narrow = record(&NARROW);
        let wide = record(&WIDE);

        let refreshers: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    for _ in 0..5 {
                        cache.refresh(RecordKind::Policy, "x").await.unwrap();
                    }
                })
            })
            .collect();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                let (narrow, wide) = (narrow.clone(), wide.clone());
                tokio::spawn(async move {
                    for _ in 0..200 {
                        let seen = cache.policy("x").unwrap();
                        assert!(
                            *seen == narrow || *seen == wide,
                            "Reader saw a record that was never stored: {seen:?}"
                        );
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        for handle in refreshers.into_iter().chain(readers) {
            handle.await.unwrap();
        }

        assert_eq!(store.fetches.load(Ordering::SeqCst), 41);
        assert_eq!(
            store.max_in_flight.load(Ordering::SeqCst),
            1,
            "Refreshes must not overlap"
        );
    }

    fn refresh_count(kind: &str, name: &str, status: &str) -> f64 {
        metrics::POLICY_REFRESH_TOTAL
            .with_label_values(&[kind, name, status])
            .get()
    }

    #[tokio::test]
    async fn test_refresh_metric_names_only_known_records() {
        let store = Arc::new(FakeStore::default());
        store.put(RecordKind::Policy, "metric-known", &[]);
        let cache = cache(store.clone());

        let untracked_before = refresh_count("policy", metrics::UNTRACKED_RECORD_NAME, "not_found");
        cache
            .refresh(RecordKind::Policy, "metric-never-stored")
            .await
            .unwrap_err();
        assert_eq!(refresh_count("policy", "metric-never-stored", "not_found"), 0.0);
        assert!(
            refresh_count("policy", metrics::UNTRACKED_RECORD_NAME, "not_found")
                >= untracked_before + 1.0
        );

        cache.refresh(RecordKind::Policy, "metric-known").await.unwrap();
        assert_eq!(refresh_count("policy", "metric-known", "success"), 1.0);

        store.remove(RecordKind::Policy, "metric-known");
        cache
            .refresh(RecordKind::Policy, "metric-known")
            .await
            .unwrap_err();
        assert_eq!(
            refresh_count("policy", "metric-known", "not_found"),
            1.0,
            "A cached record that disappears keeps its name"
        );
    }
}

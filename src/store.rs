//! Shared in-memory state for provider records and cached aggregates.
//!
//! One reader/writer lock guards the whole store. Readers always receive
//! owned copies, so a concurrent `put` can never be observed half-applied.

use ahash::AHashMap as HashMap;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::adapters::price::Price;
use crate::adapters::supply::CoinSupply;
use crate::error::StoreError;
use crate::provider::{ProviderInstance, ProviderRecord};

/// Slots of the aggregate cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    DownloadCount,
    DownloadBadge,
    CoinSupply,
    Price,
}

impl CacheKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKey::DownloadCount => "dc",
            CacheKey::DownloadBadge => "dic",
            CacheKey::CoinSupply => "gcs",
            CacheKey::Price => "price",
        }
    }
}

/// Value held by an aggregate cache slot.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    DownloadCount(u64),
    Badge(String),
    CoinSupply(CoinSupply),
    Price(Price),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CachedValue,
    expiry: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoreInner {
    records: HashMap<String, ProviderRecord>,
    cache: HashMap<CacheKey, CacheEntry>,
}

#[derive(Debug)]
pub struct Store {
    inner: RwLock<StoreInner>,
}

impl Store {
    /// Creates a store holding the default record of every instance.
    pub fn new(instances: &[ProviderInstance]) -> Self {
        let records = instances
            .iter()
            .map(|p| (p.id.clone(), p.family.default_record()))
            .collect();

        Self {
            inner: RwLock::new(StoreInner {
                records,
                cache: HashMap::new(),
            }),
        }
    }

    /// Last known record of `id`, or `None` if `id` was never configured.
    pub async fn get(&self, id: &str) -> Option<ProviderRecord> {
        self.inner.read().await.records.get(id).cloned()
    }

    /// Replaces the record of `id` and stamps it with the acceptance time.
    ///
    /// The stamp is strictly greater than the previous one for this id.
    pub async fn put(&self, id: &str, mut record: ProviderRecord) -> Result<i64, StoreError> {
        let now = Utc::now().timestamp();
        let mut inner = self.inner.write().await;
        let slot = inner
            .records
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownProvider { id: id.to_string() })?;

        let stamp = now.max(slot.last_updated() + 1);
        record.set_last_updated(stamp);
        *slot = record;

        debug!("Stored record for {} (last updated {})", id, stamp);
        Ok(stamp)
    }

    /// Point-in-time copy of every record.
    pub async fn snapshot_all(&self) -> BTreeMap<String, ProviderRecord> {
        self.inner
            .read()
            .await
            .records
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    }

    pub async fn get_if_valid(&self, key: CacheKey) -> Option<CachedValue> {
        self.get_if_valid_at(key, Utc::now()).await
    }

    /// Cached value for `key` if `now` is strictly before its expiry.
    pub async fn get_if_valid_at(&self, key: CacheKey, now: DateTime<Utc>) -> Option<CachedValue> {
        let inner = self.inner.read().await;
        inner
            .cache
            .get(&key)
            .filter(|entry| now < entry.expiry)
            .map(|entry| entry.value.clone())
    }

    pub async fn set(&self, key: CacheKey, value: CachedValue, expiry: DateTime<Utc>) {
        let mut inner = self.inner.write().await;
        inner.cache.insert(key, CacheEntry { value, expiry });
    }

    /// Drops every cached aggregate. Provider records are untouched.
    pub async fn clear_cache(&self) -> usize {
        let mut inner = self.inner.write().await;
        let cleared = inner.cache.len();
        inner.cache.clear();
        cleared
    }

    pub async fn cache_len(&self) -> usize {
        self.inner.read().await.cache.len()
    }
}

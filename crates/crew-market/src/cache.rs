//! Time-bounded memoisation of market data
//!
//! One analysis asks for the same profile and price history several times:
//! the financial analyst re-runs the researcher's tools, and every risk
//! assessment fetches the benchmark. [`CachedMarketData`] answers those
//! repeats from memory until the entries expire.

use crate::api::{Bar, CompanyProfile, MarketData};
use crate::error::Result;
use async_trait::async_trait;
use cached::{Cached, TimedCache};
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;
use tokio::sync::Mutex;

/// Entries of one kind, each living for a fixed lifespan
pub struct TtlCache<K, V> {
    // Reads evict the key they touch and writes flush, so every access is exclusive
    entries: Mutex<TimedCache<K, V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(TimedCache::with_lifespan(ttl)),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.entries.lock().await.cache_get(key).cloned()
    }

    /// Store `value`, first sweeping out every expired entry so keys that
    /// are never read again do not pile up
    pub async fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.lock().await;
        entries.flush();
        entries.cache_set(key, value);
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.lock().await.cache_size()
    }

    /// Serve `key` from memory, or run `fetch` and remember a successful result
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(hit) = self.get(&key).await {
            tracing::debug!(?key, "Cache hit");
            return Ok(hit);
        }
        tracing::debug!(?key, "Cache miss");
        let fresh = fetch().await?;
        self.insert(key, fresh.clone()).await;
        Ok(fresh)
    }
}

/// [`MarketData`] decorator that remembers every successful answer.
///
/// Failures pass straight through and are retried on the next call.
pub struct CachedMarketData<M> {
    inner: M,
    history: TtlCache<(String, String), Vec<Bar>>,
    profiles: TtlCache<String, CompanyProfile>,
    related: TtlCache<String, Vec<String>>,
    holdings: TtlCache<String, Vec<String>>,
}

impl<M: MarketData> CachedMarketData<M> {
    pub fn new(inner: M, ttl: Duration) -> Self {
        Self {
            inner,
            history: TtlCache::new(ttl),
            profiles: TtlCache::new(ttl),
            related: TtlCache::new(ttl),
            holdings: TtlCache::new(ttl),
        }
    }
}

#[async_trait]
impl<M: MarketData> MarketData for CachedMarketData<M> {
    async fn price_history(&self, symbol: &str, range: &str) -> Result<Vec<Bar>> {
        let key = (symbol.to_string(), range.to_string());
        self.history
            .get_or_fetch(key, || self.inner.price_history(symbol, range))
            .await
    }

    async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile> {
        self.profiles
            .get_or_fetch(symbol.to_string(), || self.inner.company_profile(symbol))
            .await
    }

    async fn recommended_symbols(&self, symbol: &str) -> Result<Vec<String>> {
        self.related
            .get_or_fetch(symbol.to_string(), || self.inner.recommended_symbols(symbol))
            .await
    }

    async fn fund_holdings(&self, symbol: &str) -> Result<Vec<String>> {
        self.holdings
            .get_or_fetch(symbol.to_string(), || self.inner.fund_holdings(symbol))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockMarketData;
    use crate::error::MarketError;

    #[tokio::test]
    async fn entries_expire_after_their_lifespan() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(1));
        cache.insert("AAPL".to_string(), 7).await;
        assert_eq!(cache.get(&"AAPL".to_string()).await, Some(7));
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(cache.get(&"AAPL".to_string()).await, None);
    }

    #[tokio::test]
    async fn expired_entries_are_swept_on_insert() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(1));
        cache.insert("AAPL".to_string(), 1).await;
        cache.insert("MSFT".to_string(), 2).await;
        tokio::time::sleep(Duration::from_millis(1100)).await;

        cache.insert("NVDA".to_string(), 3).await;
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&"NVDA".to_string()).await, Some(3));
    }

    #[tokio::test]
    async fn profile_fetched_once() {
        let mut inner = MockMarketData::new();
        inner.expect_company_profile().times(1).returning(|symbol| {
            Ok(CompanyProfile {
                symbol: symbol.to_string(),
                sector: Some("Technology".to_string()),
                ..Default::default()
            })
        });

        let cached = CachedMarketData::new(inner, Duration::from_secs(60));
        let first = cached.company_profile("AAPL").await.unwrap();
        let second = cached.company_profile("AAPL").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let mut inner = MockMarketData::new();
        inner
            .expect_recommended_symbols()
            .times(2)
            .returning(|_| Err(MarketError::ApiError("down".to_string())));

        let cached = CachedMarketData::new(inner, Duration::from_secs(60));
        assert!(cached.recommended_symbols("AAPL").await.is_err());
        assert!(cached.recommended_symbols("AAPL").await.is_err());
    }
}

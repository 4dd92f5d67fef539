use crate::core::errors::LedgerError;
use crate::infrastructure::cache::cache_keys::trip_balances_key;
use crate::infrastructure::cache::{Cache, CachedBalances};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct InMemoryCache {
    cache: Arc<RwLock<HashMap<String, (CachedBalances, DateTime<Utc>)>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        InMemoryCache {
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_trip_balances(&self, trip_id: &str) -> Result<Option<CachedBalances>, LedgerError> {
        let key = trip_balances_key(trip_id);
        {
            let cache = self.cache.read().await;
            match cache.get(&key) {
                Some((balances, expiry)) if *expiry > Utc::now() => return Ok(Some(balances.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Expired: drop it so the map does not grow with dead entries.
        let mut cache = self.cache.write().await;
        cache.remove(&key);
        Ok(None)
    }

    async fn save_trip_balances(
        &self,
        trip_id: &str,
        balances: &CachedBalances,
        ttl: std::time::Duration,
    ) -> Result<(), LedgerError> {
        let expiry = Utc::now()
            + chrono::Duration::from_std(ttl)
                .map_err(|e| LedgerError::CacheError(format!("Failed to convert TTL: {}", e)))?;
        let mut cache = self.cache.write().await;
        let key = trip_balances_key(trip_id);
        // A slow reader must not replace a sheet computed from a newer revision.
        if let Some((existing, _)) = cache.get(&key) {
            if existing.revision > balances.revision {
                return Ok(());
            }
        }
        cache.insert(key, (balances.clone(), expiry));
        Ok(())
    }

    async fn invalidate_trip_balances(&self, trip_id: &str) -> Result<(), LedgerError> {
        let mut cache = self.cache.write().await;
        cache.remove(&trip_balances_key(trip_id));
        Ok(())
    }
}

pub mod cache_keys;
pub mod in_memory;

use crate::core::balance::BalanceSheet;
use crate::core::errors::LedgerError;
use async_trait::async_trait;

/// Balance sheet tagged with the ledger revision it was computed from.
#[derive(Clone, Debug, PartialEq)]
pub struct CachedBalances {
    pub revision: u64,
    pub sheet: BalanceSheet,
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get_trip_balances(&self, trip_id: &str) -> Result<Option<CachedBalances>, LedgerError>;
    async fn save_trip_balances(
        &self,
        trip_id: &str,
        balances: &CachedBalances,
        ttl: std::time::Duration,
    ) -> Result<(), LedgerError>;
    async fn invalidate_trip_balances(&self, trip_id: &str) -> Result<(), LedgerError>;
}

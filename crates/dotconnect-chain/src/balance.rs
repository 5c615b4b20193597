//! Short-lived memoization of account balances.
//!
//! Balance reads are best effort: any failure yields a zero balance in the
//! network's currency instead of an error.

use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dotconnect_core::{Balance, NetworkDescriptor, NetworkId, format_balance};
use lru::LruCache;
use subxt::utils::AccountId32;
use tokio::time::Instant;

use crate::client::{ClientHandle, Connector};
use crate::error::ChainError;
use crate::failover::FailoverClient;

/// How long a balance read is reused.
pub const DEFAULT_BALANCE_TTL: Duration = Duration::from_secs(10);

/// Maximum number of (network, address) entries kept.
const MAX_ENTRIES: usize = 256;

/// Transferable balance of an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBalance {
    /// Raw amount in the smallest unit.
    pub planck: Balance,
    /// Amount formatted with the network decimals.
    pub amount: String,
    pub symbol: String,
}

impl AccountBalance {
    pub fn zero(network: &NetworkDescriptor) -> Self {
        Self {
            planck: 0,
            amount: "0".to_string(),
            symbol: network.symbol().to_string(),
        }
    }

    fn new(planck: Balance, network: &NetworkDescriptor) -> Self {
        Self {
            planck,
            amount: format_balance(planck, network.decimals()),
            symbol: network.symbol().to_string(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.planck == 0
    }
}

impl std::fmt::Display for AccountBalance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.symbol)
    }
}

struct CacheEntry {
    balance: AccountBalance,
    captured_at: Instant,
}

type EntryKey = (NetworkId, String);

/// Balance reads through the failover client, cached for a short TTL.
pub struct BalanceCache<C: Connector> {
    client: Arc<FailoverClient<C>>,
    entries: Mutex<LruCache<EntryKey, CacheEntry>>,
    ttl: Duration,
}

impl<C: Connector> BalanceCache<C> {
    pub fn new(client: Arc<FailoverClient<C>>) -> Self {
        Self::with_ttl(client, DEFAULT_BALANCE_TTL)
    }

    pub fn with_ttl(client: Arc<FailoverClient<C>>, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(MAX_ENTRIES).unwrap_or(NonZeroUsize::MIN);
        Self {
            client,
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Transferable balance of `address`, or zero if it cannot be read.
    pub async fn read(&self, network: &NetworkDescriptor, address: &str) -> AccountBalance {
        let key = (network.id.clone(), address.to_string());

        if let Some(balance) = self.fresh(&key) {
            tracing::debug!("Balance cache hit for {} on {}", address, network.name);
            return balance;
        }

        match self.fetch(network, address).await {
            Ok(balance) => {
                self.store(key, balance.clone());
                balance
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read balance of {} on {}: {}",
                    address,
                    network.name,
                    e
                );
                AccountBalance::zero(network)
            }
        }
    }

    async fn fetch(
        &self,
        network: &NetworkDescriptor,
        address: &str,
    ) -> Result<AccountBalance, ChainError> {
        let account = AccountId32::from_str(address)
            .map_err(|_| ChainError::InvalidData(format!("Invalid address {}", address)))?;
        let handle = self.client.acquire(network).await?;
        let data = handle.account_data(&account).await?;
        Ok(AccountBalance::new(data.transferable(), network))
    }

    fn fresh(&self, key: &EntryKey) -> Option<AccountBalance> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(key)?;
        if entry.captured_at.elapsed() < self.ttl {
            return Some(entry.balance.clone());
        }
        entries.pop(key);
        None
    }

    fn store(&self, key: EntryKey, balance: AccountBalance) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.put(
            key,
            CacheEntry {
                balance,
                captured_at: Instant::now(),
            },
        );
    }

    /// Forget the cached balance of one account.
    pub fn invalidate(&self, network: &NetworkId, address: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.pop(&(network.clone(), address.to_string()));
    }

    /// Forget every cached balance of an address, on any network.
    pub fn invalidate_address(&self, address: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let keys: Vec<EntryKey> = entries
            .iter()
            .filter(|((_, a), _)| a == address)
            .map(|(k, _)| k.clone())
            .collect();
        for key in keys {
            entries.pop(&key);
        }
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

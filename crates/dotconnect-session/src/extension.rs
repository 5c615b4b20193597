//! Interfaces to the injected wallet extensions.
//!
//! Browser wallets are reached through an [`ExtensionProviderSet`]. Whether
//! such a runtime exists at all is decided once, when the adapter is built,
//! by choosing an [`ExtensionRuntime`] variant.

use std::sync::Arc;

use async_trait::async_trait;
use dotconnect_chain::reencode_address;
use dotconnect_core::{AccountRecord, KeyType, NetworkDescriptor};

use crate::error::ExtensionError;

/// An extension that accepted the enable request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedExtension {
    /// Source identifier, e.g. `polkadot-js`, `talisman`, `subwallet-js`.
    pub name: String,
    pub version: String,
}

/// An account as reported by an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedAccount {
    pub address: String,
    pub name: Option<String>,
    /// Extension source that holds the account.
    pub source: String,
    /// Raw key type, `None` meaning the extension default (sr25519).
    pub key_type: Option<String>,
    /// Genesis hash the account is restricted to.
    pub genesis_hash: Option<String>,
}

/// Callback invoked with the full account list on every account change.
pub type AccountsCallback = Arc<dyn Fn(Vec<InjectedAccount>) + Send + Sync>;

/// Cancels an account subscription.
pub type Unsubscribe = Box<dyn FnOnce() + Send>;

/// Signing capability for one account.
#[async_trait]
pub trait ExtensionSigner: Send + Sync {
    /// Sign raw bytes with the account's key.
    async fn sign_raw(&self, address: &str, payload: &[u8]) -> Result<Vec<u8>, ExtensionError>;
}

/// The set of injected extensions visible to the app.
#[async_trait]
pub trait ExtensionProviderSet: Send + Sync {
    /// Ask every extension to authorize `app_label`; returns those that did.
    async fn enable(&self, app_label: &str) -> Result<Vec<InjectedExtension>, ExtensionError>;

    /// All accounts of all enabled extensions.
    async fn accounts(&self) -> Result<Vec<InjectedAccount>, ExtensionError>;

    /// Subscribe to account changes. There is one feed for the whole app.
    async fn subscribe_accounts(
        &self,
        callback: AccountsCallback,
    ) -> Result<Unsubscribe, ExtensionError>;

    /// Signer for an address.
    async fn signer_for(&self, address: &str) -> Result<Arc<dyn ExtensionSigner>, ExtensionError>;
}

/// Whether an extension runtime exists in this execution context.
#[derive(Clone)]
pub enum ExtensionRuntime {
    Available(Arc<dyn ExtensionProviderSet>),
    /// Headless or server-side execution: no extensions can exist.
    Unavailable,
}

impl ExtensionRuntime {
    pub fn provider(&self) -> Option<&Arc<dyn ExtensionProviderSet>> {
        match self {
            ExtensionRuntime::Available(provider) => Some(provider),
            ExtensionRuntime::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ExtensionRuntime::Available(_))
    }
}

impl std::fmt::Debug for ExtensionRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtensionRuntime::Available(_) => f.write_str("ExtensionRuntime::Available"),
            ExtensionRuntime::Unavailable => f.write_str("ExtensionRuntime::Unavailable"),
        }
    }
}

/// Asks the user to pick one of several accounts.
#[async_trait]
pub trait AccountSelector: Send + Sync {
    /// Returns the chosen account, or an error if the user cancelled.
    async fn select(&self, candidates: &[AccountRecord]) -> Result<AccountRecord, ExtensionError>;
}

/// Accounts of `source`, as records for `network`.
///
/// Addresses are re-encoded for the network's SS58 format. Accounts pinned to
/// a different genesis hash than the network's (when known) are left out.
pub fn accounts_for_source(
    accounts: &[InjectedAccount],
    source: &str,
    network: Option<&NetworkDescriptor>,
) -> Vec<AccountRecord> {
    let genesis = network.and_then(|n| n.genesis_hash_hex());

    accounts
        .iter()
        .filter(|a| a.source == source)
        .filter(|a| match (&a.genesis_hash, &genesis) {
            (Some(pinned), Some(current)) => pinned.eq_ignore_ascii_case(current),
            _ => true,
        })
        .map(|a| to_record(a, network))
        .collect()
}

fn to_record(account: &InjectedAccount, network: Option<&NetworkDescriptor>) -> AccountRecord {
    let address = network
        .and_then(|n| reencode_address(&account.address, n.ss58_format))
        .unwrap_or_else(|| account.address.clone());

    AccountRecord {
        address,
        name: account.name.clone(),
        source: account.source.clone(),
        key_type: KeyType::parse(account.key_type.as_deref()),
        genesis_hash: account.genesis_hash.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dotconnect_chain::networks::descriptor;
    use dotconnect_core::Network;

    const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";

    fn account(address: &str, source: &str) -> InjectedAccount {
        InjectedAccount {
            address: address.into(),
            name: Some("Alice".into()),
            source: source.into(),
            key_type: None,
            genesis_hash: None,
        }
    }

    #[test]
    fn test_filters_by_source() {
        let accounts = vec![account(ALICE, "talisman"), account(ALICE, "polkadot-js")];
        let records = accounts_for_source(&accounts, "polkadot-js", None);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source, "polkadot-js");
        assert_eq!(records[0].address, ALICE);
        assert_eq!(records[0].key_type, KeyType::Sr25519);
    }

    #[test]
    fn test_reencodes_for_network() {
        let kusama = descriptor(Network::Kusama);
        let records = accounts_for_source(&[account(ALICE, "talisman")], "talisman", Some(&kusama));
        assert_eq!(records[0].address, "HNZata7iMYWmk5RvZRTiAsSDhV8366zq2YGb3tLH5Upf74F");
    }

    #[test]
    fn test_keeps_non_ss58_addresses() {
        let eth = "0x8ba1f109551bd432803012645ac136ddd64dba72";
        let mut a = account(eth, "talisman");
        a.key_type = Some("ethereum".into());
        let records =
            accounts_for_source(&[a], "talisman", Some(&descriptor(Network::Polkadot)));
        assert_eq!(records[0].address, eth);
        assert_eq!(records[0].key_type, KeyType::Ethereum);
    }

    #[test]
    fn test_genesis_scoping() {
        let mut network = descriptor(Network::Polkadot);
        network.genesis_hash = Some([0x11; 32]);
        let current = network.genesis_hash_hex().unwrap();

        let mut pinned_here = account(ALICE, "talisman");
        pinned_here.genesis_hash = Some(current.to_uppercase().replacen("0X", "0x", 1));
        let mut pinned_elsewhere = account(ALICE, "talisman");
        pinned_elsewhere.genesis_hash = Some(format!("0x{}", "22".repeat(32)));
        let unpinned = account(ALICE, "talisman");

        let records = accounts_for_source(
            &[pinned_here, pinned_elsewhere, unpinned],
            "talisman",
            Some(&network),
        );
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_runtime_availability() {
        assert!(!ExtensionRuntime::Unavailable.is_available());
        assert!(ExtensionRuntime::Unavailable.provider().is_none());
    }
}

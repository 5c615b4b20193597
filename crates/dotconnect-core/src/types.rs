//! Core domain types for chain sessions.

use serde::{Deserialize, Serialize};

pub type Balance = u128;

/// Built-in networks - exhaustive match required (no default case).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Polkadot,
    Kusama,
    Westend,
    Paseo,
}

impl Network {
    /// Stable identifier used as the cache key for this network.
    pub fn id(&self) -> NetworkId {
        NetworkId::new(match self {
            Network::Polkadot => "polkadot",
            Network::Kusama => "kusama",
            Network::Westend => "westend",
            Network::Paseo => "paseo",
        })
    }

    pub fn token_symbol(&self) -> &'static str {
        match self {
            Network::Polkadot => "DOT",
            Network::Kusama => "KSM",
            Network::Westend => "WND",
            Network::Paseo => "PAS",
        }
    }

    pub fn token_decimals(&self) -> u8 {
        match self {
            Network::Polkadot => 10,
            Network::Kusama => 12,
            Network::Westend => 12,
            Network::Paseo => 10,
        }
    }

    pub fn ss58_format(&self) -> u16 {
        match self {
            Network::Polkadot => 0,
            Network::Kusama => 2,
            Network::Westend => 42,
            Network::Paseo => 0,
        }
    }

    /// Returns all known networks.
    pub fn all() -> &'static [Network] {
        &[
            Network::Polkadot,
            Network::Kusama,
            Network::Westend,
            Network::Paseo,
        ]
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Polkadot => write!(f, "Polkadot"),
            Network::Kusama => write!(f, "Kusama"),
            Network::Westend => write!(f, "Westend"),
            Network::Paseo => write!(f, "Paseo"),
        }
    }
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "polkadot" | "dot" => Ok(Network::Polkadot),
            "kusama" | "ksm" => Ok(Network::Kusama),
            "westend" | "wnd" => Ok(Network::Westend),
            "paseo" | "pas" => Ok(Network::Paseo),
            _ => Err(format!(
                "Unknown network '{}'. Valid options: polkadot, kusama, westend, paseo",
                s
            )),
        }
    }
}

/// Identity of a logical network. Client handles and balances are cached per id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(String);

impl NetworkId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NetworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NetworkId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Native token of a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub symbol: String,
    pub decimals: u8,
}

/// Endpoint URLs of one source, grouped by declared transport.
///
/// The declared transport is not trusted: WebSocket URLs are regularly
/// filed under `http` by network configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcUrlSet {
    #[serde(default)]
    pub web_socket: Vec<String>,
    #[serde(default)]
    pub http: Vec<String>,
}

impl RpcUrlSet {
    pub fn web_socket<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            web_socket: urls.into_iter().map(Into::into).collect(),
            http: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.web_socket.is_empty() && self.http.is_empty()
    }
}

/// Candidate endpoints of a network, by source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcUrls {
    pub default: RpcUrlSet,
    #[serde(default)]
    pub public: Option<RpcUrlSet>,
}

/// A logical chain network as supplied by network configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    pub id: NetworkId,
    pub name: String,
    pub native_currency: NativeCurrency,
    pub ss58_format: u16,
    #[serde(default)]
    pub genesis_hash: Option<[u8; 32]>,
    pub rpc_urls: RpcUrls,
}

impl NetworkDescriptor {
    pub fn symbol(&self) -> &str {
        &self.native_currency.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.native_currency.decimals
    }

    /// Genesis hash as a `0x`-prefixed hex string, the form extensions report.
    pub fn genesis_hash_hex(&self) -> Option<String> {
        self.genesis_hash.map(|h| format!("0x{}", hex::encode(h)))
    }
}

/// Key type of an extension account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    #[default]
    Sr25519,
    Ed25519,
    Ecdsa,
    Ethereum,
    #[serde(untagged)]
    Other(String),
}

impl KeyType {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            None | Some("sr25519") => KeyType::Sr25519,
            Some("ed25519") => KeyType::Ed25519,
            Some("ecdsa") => KeyType::Ecdsa,
            Some("ethereum") => KeyType::Ethereum,
            Some(other) => KeyType::Other(other.to_string()),
        }
    }
}

/// An account exposed by a wallet extension, as seen by the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// SS58 address, re-encoded for the session network when possible.
    pub address: String,
    pub name: Option<String>,
    /// Extension source the account came from.
    pub source: String,
    pub key_type: KeyType,
    /// Genesis hash the account is restricted to, if any.
    pub genesis_hash: Option<String>,
}

impl AccountRecord {
    /// Name for display, falling back to a shortened address.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => crate::display::short_address(&self.address),
        }
    }
}

/// Notifications sent to downstream listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// The primary account of a session changed or was (re)announced.
    AccountChanged {
        address: String,
        chain_id: Option<NetworkId>,
        source: String,
    },
    /// The last session went away.
    Disconnected,
}

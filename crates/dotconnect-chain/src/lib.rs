pub mod balance;
pub mod cache;
pub mod client;
pub mod error;
pub mod failover;
pub mod networks;
pub mod resolver;
pub mod ss58;

pub use balance::{AccountBalance, BalanceCache, DEFAULT_BALANCE_TTL};
pub use cache::{Checkout, ClientCache};
pub use client::{AccountData, ClientHandle, Connector, SubxtConnector, SubxtHandle, WsTransport};
pub use error::*;
pub use failover::{DEFAULT_ATTEMPT_TIMEOUT, FailoverClient};
pub use networks::{BuiltinNetworks, NetworkConfigProvider};
pub use resolver::{is_websocket_url, resolve_endpoints};
pub use ss58::reencode_address;

/// Re-exported so connectors and tests can name accounts without depending on subxt.
pub use subxt::utils::AccountId32;

//! Built-in network catalogue.
//!
//! Since the Polkadot 2.0 migration (Nov 2025), balances and staking data
//! live on Asset Hub, so the built-in descriptors point at Asset Hub
//! endpoints. The `default` source lists the endpoints in failover priority
//! order (independent providers before the Parity-operated endpoint); the
//! `public` source adds community-run mirrors.

use dotconnect_core::{
    NativeCurrency, Network, NetworkDescriptor, NetworkId, RpcUrlSet, RpcUrls,
};

/// Supplies network descriptors to the session layer.
pub trait NetworkConfigProvider: Send + Sync {
    /// Descriptor for a network id, if the network is known.
    fn network(&self, id: &NetworkId) -> Option<NetworkDescriptor>;

    /// Network used when a request names none.
    fn default_network(&self) -> NetworkDescriptor;
}

/// Get the default-source Asset Hub RPC endpoints for a network.
pub fn get_asset_hub_endpoints(network: Network) -> &'static [&'static str] {
    match network {
        Network::Polkadot => &[
            "wss://rpc-asset-hub-polkadot.luckyfriday.io",
            "wss://polkadot-asset-hub-rpc.polkadot.io",
            "wss://asset-hub-polkadot-rpc.dwellir.com",
        ],
        Network::Kusama => &[
            "wss://rpc-asset-hub-kusama.luckyfriday.io",
            "wss://kusama-asset-hub-rpc.polkadot.io",
            "wss://asset-hub-kusama-rpc.dwellir.com",
        ],
        Network::Westend => &[
            "wss://westend-asset-hub-rpc.polkadot.io",
            "wss://asset-hub-westend-rpc.dwellir.com",
        ],
        Network::Paseo => &[
            "wss://asset-hub-paseo-rpc.dwellir.com",
        ],
    }
}

/// Get the public-source (community) Asset Hub RPC endpoints for a network.
pub fn get_public_asset_hub_endpoints(network: Network) -> &'static [&'static str] {
    match network {
        Network::Polkadot => &[
            "wss://sys.ibp.network/asset-hub-polkadot",
            "wss://sys.dotters.network/asset-hub-polkadot",
        ],
        Network::Kusama => &[
            "wss://sys.ibp.network/asset-hub-kusama",
            "wss://sys.dotters.network/asset-hub-kusama",
        ],
        Network::Westend => &[
            "wss://sys.ibp.network/asset-hub-westend",
            "wss://sys.dotters.network/asset-hub-westend",
        ],
        Network::Paseo => &[
            "wss://sys.ibp.network/asset-hub-paseo",
            "wss://sys.dotters.network/asset-hub-paseo",
        ],
    }
}

/// Build the descriptor of a built-in network.
pub fn descriptor(network: Network) -> NetworkDescriptor {
    NetworkDescriptor {
        id: network.id(),
        name: format!("{} Asset Hub", network),
        native_currency: NativeCurrency {
            symbol: network.token_symbol().to_string(),
            decimals: network.token_decimals(),
        },
        ss58_format: network.ss58_format(),
        genesis_hash: None,
        rpc_urls: RpcUrls {
            default: RpcUrlSet::web_socket(get_asset_hub_endpoints(network).iter().copied()),
            public: Some(RpcUrlSet::web_socket(
                get_public_asset_hub_endpoints(network).iter().copied(),
            )),
        },
    }
}

/// The built-in networks, with optional custom endpoints tried first.
#[derive(Debug, Clone, Default)]
pub struct BuiltinNetworks {
    default_network: Network,
    custom_endpoints: Vec<String>,
}

impl BuiltinNetworks {
    pub fn new(default_network: Network) -> Self {
        Self {
            default_network,
            custom_endpoints: Vec::new(),
        }
    }

    /// Endpoints placed ahead of the built-in ones on every network.
    pub fn with_custom_endpoints(mut self, endpoints: Vec<String>) -> Self {
        self.custom_endpoints = endpoints;
        self
    }

    fn build(&self, network: Network) -> NetworkDescriptor {
        let mut descriptor = descriptor(network);
        if !self.custom_endpoints.is_empty() {
            let builtin = std::mem::take(&mut descriptor.rpc_urls.default.web_socket);
            descriptor.rpc_urls.default.web_socket =
                self.custom_endpoints.iter().cloned().chain(builtin).collect();
        }
        descriptor
    }
}

impl NetworkConfigProvider for BuiltinNetworks {
    fn network(&self, id: &NetworkId) -> Option<NetworkDescriptor> {
        Network::all()
            .iter()
            .find(|n| n.id() == *id)
            .map(|n| self.build(*n))
    }

    fn default_network(&self) -> NetworkDescriptor {
        self.build(self.default_network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::resolve_endpoints;

    #[test]
    fn test_every_network_has_endpoints() {
        for network in Network::all() {
            let d = descriptor(*network);
            assert!(!resolve_endpoints(&d).is_empty(), "{} has no endpoints", network);
            assert_eq!(d.symbol(), network.token_symbol());
        }
    }

    #[test]
    fn test_endpoints_are_websocket() {
        for network in Network::all() {
            for url in resolve_endpoints(&descriptor(*network)) {
                assert!(url.starts_with("wss://"), "{} is not wss", url);
            }
        }
    }

    #[test]
    fn test_lookup_by_id() {
        let networks = BuiltinNetworks::new(Network::Kusama);
        assert_eq!(networks.default_network().id, Network::Kusama.id());
        assert_eq!(
            networks.network(&NetworkId::new("westend")).unwrap().symbol(),
            "WND"
        );
        assert!(networks.network(&NetworkId::new("rococo")).is_none());
    }

    #[test]
    fn test_custom_endpoints_first() {
        let networks = BuiltinNetworks::new(Network::Polkadot)
            .with_custom_endpoints(vec!["wss://my-node:9944".to_string()]);
        let endpoints = resolve_endpoints(&networks.default_network());
        assert_eq!(endpoints[0], "wss://my-node:9944");
        assert_eq!(endpoints[1], get_asset_hub_endpoints(Network::Polkadot)[0]);
    }
}

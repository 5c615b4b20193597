//! Client handles and the connectors that build them.
//!
//! A [`Connector`] turns an endpoint URL into a live [`ClientHandle`] in two
//! steps: `open` establishes the transport, `ready` builds a client on top
//! of it and waits until it can serve queries. The failover acquirer bounds
//! both steps with one deadline and hands the transport back to `dispose`
//! when an attempt is abandoned.
//!
//! [`SubxtConnector`] is the production connector for Polkadot-SDK chains.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dotconnect_core::{Balance, NetworkDescriptor};
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use subxt::backend::rpc::RpcClient;
use subxt::dynamic::{At, DecodedValueThunk, Value};
use subxt::utils::AccountId32;
use subxt::{OnlineClient, PolkadotConfig};

use crate::error::ChainError;

/// Balance fields of `System.Account`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountData {
    pub free: Balance,
    pub reserved: Balance,
    pub misc_frozen: Balance,
    pub fee_frozen: Balance,
}

impl AccountData {
    /// Spendable part of the free balance: `free - max(misc_frozen, fee_frozen)`.
    ///
    /// Chain data should never make this negative; if it does, the amount
    /// is clamped to zero.
    pub fn transferable(&self) -> Balance {
        let frozen = self.misc_frozen.max(self.fee_frozen);
        match self.free.checked_sub(frozen) {
            Some(amount) => amount,
            None => {
                tracing::warn!(
                    "Frozen balance {} exceeds free balance {}, reporting zero transferable",
                    frozen,
                    self.free
                );
                0
            }
        }
    }
}

/// A live connection to one RPC endpoint.
#[async_trait]
pub trait ClientHandle: Send + Sync + 'static {
    /// URL this handle is connected to.
    fn endpoint(&self) -> &str;

    /// Whether the handle can still serve queries. An error counts as "not live".
    fn is_live(&self) -> Result<bool, ChainError>;

    /// Release the connection. Calling it more than once is harmless.
    fn dispose(&self);

    /// Read the balance fields of an account.
    async fn account_data(&self, account: &AccountId32) -> Result<AccountData, ChainError>;
}

/// Builds client handles for endpoint URLs.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: Send + Sync;
    type Handle: ClientHandle;

    /// Open the transport to `url`.
    async fn open(
        &self,
        network: &NetworkDescriptor,
        url: &str,
    ) -> Result<Self::Transport, ChainError>;

    /// Build a client over an opened transport and wait until it is ready.
    async fn ready(
        &self,
        network: &NetworkDescriptor,
        url: &str,
        transport: &Self::Transport,
    ) -> Result<Self::Handle, ChainError>;

    /// Release a transport whose attempt failed or timed out.
    fn dispose(&self, url: &str, transport: Self::Transport);
}

/// Subscription buffer per RPC subscription, as subxt configures its own clients.
const SUBSCRIPTION_BUFFER: usize = 4096;

/// An open WebSocket with the subxt RPC client layered over it.
///
/// Both share one socket, so the socket state seen here is the state
/// subxt queries run against.
#[derive(Clone)]
pub struct WsTransport {
    socket: Arc<WsClient>,
    rpc: RpcClient,
}

impl WsTransport {
    pub fn new(socket: WsClient) -> Self {
        let socket = Arc::new(socket);
        Self {
            rpc: RpcClient::new(Arc::clone(&socket)),
            socket,
        }
    }

    /// Connect a WebSocket to `url`.
    pub async fn connect(url: &str) -> Result<Self, ChainError> {
        let socket = WsClientBuilder::default()
            .max_buffer_capacity_per_subscription(SUBSCRIPTION_BUFFER)
            .build(url)
            .await
            .map_err(|e| ChainError::Connection(format!("{}: {}", url, e)))?;
        Ok(Self::new(socket))
    }

    /// False once the node or the network has closed the socket.
    pub fn is_connected(&self) -> bool {
        self.socket.is_connected()
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }
}

/// Connector backed by subxt WebSocket RPC clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubxtConnector;

#[async_trait]
impl Connector for SubxtConnector {
    type Transport = WsTransport;
    type Handle = SubxtHandle;

    async fn open(&self, network: &NetworkDescriptor, url: &str) -> Result<WsTransport, ChainError> {
        tracing::info!("Trying {} via {}", network.name, url);
        WsTransport::connect(url).await
    }

    async fn ready(
        &self,
        network: &NetworkDescriptor,
        url: &str,
        transport: &WsTransport,
    ) -> Result<SubxtHandle, ChainError> {
        let client =
            OnlineClient::<PolkadotConfig>::from_rpc_client(transport.rpc().clone()).await?;

        if let Some(expected) = network.genesis_hash {
            let actual = client.genesis_hash().0;
            if actual != expected {
                return Err(ChainError::InvalidData(format!(
                    "{} serves a different chain than {} (genesis mismatch)",
                    url, network.name
                )));
            }
        }

        // Log chain name to verify the endpoint serves what we asked for
        if let Ok(name) = transport
            .rpc()
            .request::<String>("system_chain", subxt::ext::subxt_rpcs::client::rpc_params![])
            .await
        {
            tracing::info!("Chain reported name: {}", name);
        }

        tracing::info!("Connected to {} via {}", network.name, url);

        Ok(SubxtHandle {
            endpoint: url.to_string(),
            client,
            transport: transport.clone(),
            live: AtomicBool::new(true),
        })
    }

    fn dispose(&self, url: &str, transport: WsTransport) {
        tracing::debug!("Dropping transport to {}", url);
        drop(transport);
    }
}

/// Client handle wrapping a subxt `OnlineClient`.
pub struct SubxtHandle {
    endpoint: String,
    client: OnlineClient<PolkadotConfig>,
    transport: WsTransport,
    live: AtomicBool,
}

impl SubxtHandle {
    /// Get the genesis hash.
    pub fn genesis_hash(&self) -> [u8; 32] {
        self.client.genesis_hash().0
    }

    /// Get the latest block number and hash to verify connection.
    pub async fn get_latest_block(&self) -> Result<(u32, [u8; 32]), ChainError> {
        let block = self
            .client
            .blocks()
            .at_latest()
            .await
            .inspect_err(|_| self.mark_dead())?;
        let number = block.number();
        let hash: [u8; 32] = block.hash().0;
        Ok((number, hash))
    }

    fn mark_dead(&self) {
        if self.live.swap(false, Ordering::AcqRel) {
            tracing::warn!("Connection to {} looks dead", self.endpoint);
        }
    }
}

#[async_trait]
impl ClientHandle for SubxtHandle {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn is_live(&self) -> Result<bool, ChainError> {
        if !self.transport.is_connected() {
            self.mark_dead();
        }
        Ok(self.live.load(Ordering::Acquire))
    }

    fn dispose(&self) {
        if self.live.swap(false, Ordering::AcqRel) {
            tracing::debug!("Disposed client for {}", self.endpoint);
        }
    }

    async fn account_data(&self, account: &AccountId32) -> Result<AccountData, ChainError> {
        let storage_query = subxt::dynamic::storage(
            "System",
            "Account",
            vec![Value::from_bytes(account.clone())],
        );

        // Transport failures here mean the handle should not be reused.
        let result: Option<DecodedValueThunk> = self
            .client
            .storage()
            .at_latest()
            .await
            .inspect_err(|_| self.mark_dead())?
            .fetch(&storage_query)
            .await
            .inspect_err(|_| self.mark_dead())?;

        let Some(value) = result else {
            return Ok(AccountData::default());
        };

        let decoded = value.to_value()?;

        // AccountInfo = { nonce, consumers, providers, sufficients, data: AccountData }
        // Older runtimes: AccountData = { free, reserved, misc_frozen, fee_frozen }
        // Newer runtimes: AccountData = { free, reserved, frozen, flags }
        let data = decoded.at("data");
        let field = |name: &str| {
            data.and_then(|d| d.at(name))
                .and_then(|v: &Value<u32>| v.as_u128())
        };

        let free = field("free").unwrap_or(0);
        let reserved = field("reserved").unwrap_or(0);
        let frozen = field("frozen");
        let misc_frozen = field("misc_frozen").or(frozen).unwrap_or(0);
        let fee_frozen = field("fee_frozen").or(frozen).unwrap_or(0);

        Ok(AccountData {
            free,
            reserved,
            misc_frozen,
            fee_frozen,
        })
    }
}

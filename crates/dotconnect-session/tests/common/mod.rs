//! Scripted wallet extensions and chain connector for session tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dotconnect_chain::{
    AccountData, AccountId32, ChainError, ClientHandle, Connector, NetworkConfigProvider,
};
use dotconnect_core::{
    AccountRecord, NativeCurrency, NetworkDescriptor, NetworkId, RpcUrlSet, RpcUrls, SessionEvent,
};
use dotconnect_session::{
    AccountSelector, AccountsCallback, ExtensionError, ExtensionProviderSet, ExtensionRuntime,
    ExtensionSigner, InjectedAccount, InjectedExtension, SessionConfig, SessionManager,
    Unsubscribe,
};
use tokio::sync::{Notify, mpsc};

pub const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
pub const BOB: &str = "5FHneW46xGXgs5mUiveU4sbTyGBzmstUspZC92UhjJM694ty";
/// ALICE in the Kusama (2) address format.
pub const ALICE_KUSAMA: &str = "HNZata7iMYWmk5RvZRTiAsSDhV8366zq2YGb3tLH5Upf74F";

pub fn account(address: &str, source: &str) -> InjectedAccount {
    InjectedAccount {
        address: address.to_string(),
        name: None,
        source: source.to_string(),
        key_type: None,
        genesis_hash: None,
    }
}

#[derive(Default)]
struct ProviderState {
    extensions: Vec<InjectedExtension>,
    accounts: Vec<InjectedAccount>,
    callback: Option<AccountsCallback>,
}

/// Extension provider set with scripted extensions and accounts.
#[derive(Default)]
pub struct FakeProvider {
    state: Mutex<ProviderState>,
    gate: Option<Notify>,
    subscribe_gate: Option<Notify>,
    pub enable_calls: AtomicUsize,
    pub accounts_calls: AtomicUsize,
    pub subscribe_calls: AtomicUsize,
    pub unsubscribe_calls: Arc<AtomicUsize>,
    pub fail_subscribe: AtomicBool,
}

impl FakeProvider {
    pub fn new(sources: &[&str], accounts: Vec<InjectedAccount>) -> Self {
        let provider = Self::default();
        {
            let mut state = provider.state.lock().unwrap();
            state.extensions = sources
                .iter()
                .map(|name| InjectedExtension {
                    name: name.to_string(),
                    version: "1.0.0".to_string(),
                })
                .collect();
            state.accounts = accounts;
        }
        provider
    }

    /// Make `enable` wait until [`FakeProvider::open_gate`] is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Notify::new());
        self
    }

    pub fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_waiters();
            gate.notify_one();
        }
    }

    /// Make `subscribe_accounts` wait until [`FakeProvider::open_subscribe_gate`] is called.
    pub fn gated_subscribe(mut self) -> Self {
        self.subscribe_gate = Some(Notify::new());
        self
    }

    pub fn open_subscribe_gate(&self) {
        if let Some(gate) = &self.subscribe_gate {
            gate.notify_one();
        }
    }

    /// Deliver an account change to the current subscriber.
    pub fn push_accounts(&self, accounts: Vec<InjectedAccount>) {
        let callback = self.state.lock().unwrap().callback.clone();
        if let Some(callback) = callback {
            callback(accounts);
        }
    }

    pub fn calls(&self, counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtensionProviderSet for FakeProvider {
    async fn enable(&self, _app_label: &str) -> Result<Vec<InjectedExtension>, ExtensionError> {
        self.enable_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(self.state.lock().unwrap().extensions.clone())
    }

    async fn accounts(&self) -> Result<Vec<InjectedAccount>, ExtensionError> {
        self.accounts_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().unwrap().accounts.clone())
    }

    async fn subscribe_accounts(
        &self,
        callback: AccountsCallback,
    ) -> Result<Unsubscribe, ExtensionError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.subscribe_gate {
            gate.notified().await;
        }
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(ExtensionError::new("subscriptions not supported"));
        }
        self.state.lock().unwrap().callback = Some(callback);
        let unsubscribed = Arc::clone(&self.unsubscribe_calls);
        Ok(Box::new(move || {
            unsubscribed.fetch_add(1, Ordering::SeqCst);
        }))
    }

    async fn signer_for(&self, address: &str) -> Result<Arc<dyn ExtensionSigner>, ExtensionError> {
        Ok(Arc::new(FakeSigner {
            address: address.to_string(),
        }))
    }
}

pub struct FakeSigner {
    pub address: String,
}

#[async_trait]
impl ExtensionSigner for FakeSigner {
    async fn sign_raw(&self, address: &str, payload: &[u8]) -> Result<Vec<u8>, ExtensionError> {
        if address != self.address {
            return Err(ExtensionError::new("unknown account"));
        }
        Ok(payload.iter().rev().copied().collect())
    }
}

/// Picks a fixed candidate, a foreign account, or cancels.
pub enum FakeSelector {
    Pick(usize),
    Foreign,
    Cancel,
}

#[async_trait]
impl AccountSelector for FakeSelector {
    async fn select(&self, candidates: &[AccountRecord]) -> Result<AccountRecord, ExtensionError> {
        match self {
            FakeSelector::Pick(index) => candidates
                .get(*index)
                .cloned()
                .ok_or_else(|| ExtensionError::new("no such candidate")),
            FakeSelector::Foreign => {
                let mut foreign = candidates[0].clone();
                foreign.address = "5Foreign".to_string();
                Ok(foreign)
            }
            FakeSelector::Cancel => Err(ExtensionError::new("user closed the dialog")),
        }
    }
}

pub struct FakeHandle {
    url: String,
    live: AtomicBool,
}

#[async_trait]
impl ClientHandle for FakeHandle {
    fn endpoint(&self) -> &str {
        &self.url
    }

    fn is_live(&self) -> Result<bool, ChainError> {
        Ok(self.live.load(Ordering::SeqCst))
    }

    fn dispose(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    async fn account_data(&self, _account: &AccountId32) -> Result<AccountData, ChainError> {
        Ok(AccountData {
            free: 30_000_000_000,
            reserved: 0,
            misc_frozen: 10_000_000_000,
            fee_frozen: 0,
        })
    }
}

/// Connector whose endpoints connect immediately, except `deadnet` ones which refuse.
#[derive(Clone, Default)]
pub struct FakeConnector {
    attempts: Arc<Mutex<Vec<String>>>,
}

impl FakeConnector {
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Transport = ();
    type Handle = FakeHandle;

    async fn open(&self, _network: &NetworkDescriptor, url: &str) -> Result<(), ChainError> {
        self.attempts.lock().unwrap().push(url.to_string());
        if url.contains("deadnet") {
            return Err(ChainError::Connection(format!("{} refused", url)));
        }
        Ok(())
    }

    async fn ready(
        &self,
        _network: &NetworkDescriptor,
        url: &str,
        _transport: &(),
    ) -> Result<FakeHandle, ChainError> {
        Ok(FakeHandle {
            url: url.to_string(),
            live: AtomicBool::new(true),
        })
    }

    fn dispose(&self, _url: &str, _transport: ()) {}
}

fn descriptor(id: &str, ss58_format: u16) -> NetworkDescriptor {
    NetworkDescriptor {
        id: NetworkId::new(id),
        name: id.to_string(),
        native_currency: NativeCurrency {
            symbol: "TST".into(),
            decimals: 10,
        },
        ss58_format,
        genesis_hash: None,
        rpc_urls: RpcUrls {
            default: RpcUrlSet::web_socket([format!("wss://{}.invalid", id)]),
            public: None,
        },
    }
}

/// `testnet` (generic address format, the default), `kusama-test` and
/// `deadnet`, whose two endpoints both refuse connections.
pub struct TestNetworks;

impl NetworkConfigProvider for TestNetworks {
    fn network(&self, id: &NetworkId) -> Option<NetworkDescriptor> {
        match id.as_str() {
            "testnet" => Some(descriptor("testnet", 42)),
            "kusama-test" => Some(descriptor("kusama-test", 2)),
            "deadnet" => {
                let mut network = descriptor("deadnet", 42);
                network.rpc_urls.default =
                    RpcUrlSet::web_socket(["wss://a.deadnet.invalid", "wss://b.deadnet.invalid"]);
                Some(network)
            }
            _ => None,
        }
    }

    fn default_network(&self) -> NetworkDescriptor {
        descriptor("testnet", 42)
    }
}

pub struct Harness {
    pub manager: SessionManager<FakeConnector>,
    pub provider: Arc<FakeProvider>,
    pub connector: FakeConnector,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Harness {
    pub fn new(provider: FakeProvider) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dotconnect_session=debug,dotconnect_chain=debug")
            .with_test_writer()
            .try_init();

        let provider = Arc::new(provider);
        let connector = FakeConnector::default();
        let (tx, events) = mpsc::unbounded_channel();
        let manager = SessionManager::new(
            SessionConfig::default(),
            ExtensionRuntime::Available(provider.clone()),
            Arc::new(TestNetworks),
            connector.clone(),
        )
        .with_events(Arc::new(tx));

        Self {
            manager,
            provider,
            connector,
            events,
        }
    }

    /// Events emitted so far.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

pub fn changed(address: &str, chain: &str, source: &str) -> SessionEvent {
    SessionEvent::AccountChanged {
        address: address.to_string(),
        chain_id: Some(NetworkId::new(chain)),
        source: source.to_string(),
    }
}

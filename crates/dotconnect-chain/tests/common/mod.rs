//! Scripted connector for exercising failover without a network.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dotconnect_chain::{AccountData, AccountId32, ChainError, ClientHandle, Connector};
use dotconnect_core::{NativeCurrency, NetworkDescriptor, NetworkId, RpcUrlSet, RpcUrls};

/// How an endpoint behaves when connected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    /// `open` fails.
    Refuse,
    /// `open` succeeds, `ready` fails.
    NotReady,
    /// `open` never completes.
    Hang,
    /// `open` succeeds, `ready` never completes.
    HangReady,
}

pub struct FakeHandle {
    pub url: String,
    pub live: AtomicBool,
    pub data: AccountData,
    pub fail_queries: AtomicBool,
}

impl FakeHandle {
    pub fn kill(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
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
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(ChainError::Rpc("query failed".into()));
        }
        Ok(self.data)
    }
}

#[derive(Default)]
struct State {
    behaviors: HashMap<String, Behavior>,
    attempts: Vec<String>,
    disposed: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeConnector {
    state: Arc<Mutex<State>>,
    data: AccountData,
}

impl FakeConnector {
    pub fn new(behaviors: &[(&str, Behavior)]) -> Self {
        let connector = Self::default();
        for (url, behavior) in behaviors {
            connector.set(url, *behavior);
        }
        connector
    }

    pub fn with_account_data(mut self, data: AccountData) -> Self {
        self.data = data;
        self
    }

    pub fn set(&self, url: &str, behavior: Behavior) {
        self.state
            .lock()
            .unwrap()
            .behaviors
            .insert(url.to_string(), behavior);
    }

    /// URLs passed to `open`, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.state.lock().unwrap().attempts.clone()
    }

    /// URLs whose transport was handed back to `dispose`.
    pub fn disposed(&self) -> Vec<String> {
        self.state.lock().unwrap().disposed.clone()
    }

    fn behavior(&self, url: &str) -> Behavior {
        self.state
            .lock()
            .unwrap()
            .behaviors
            .get(url)
            .copied()
            .unwrap_or(Behavior::Refuse)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Transport = String;
    type Handle = FakeHandle;

    async fn open(&self, _network: &NetworkDescriptor, url: &str) -> Result<String, ChainError> {
        self.state.lock().unwrap().attempts.push(url.to_string());
        match self.behavior(url) {
            Behavior::Refuse => Err(ChainError::Connection(format!("{} refused", url))),
            Behavior::Hang => std::future::pending().await,
            _ => Ok(url.to_string()),
        }
    }

    async fn ready(
        &self,
        _network: &NetworkDescriptor,
        url: &str,
        _transport: &String,
    ) -> Result<FakeHandle, ChainError> {
        match self.behavior(url) {
            Behavior::NotReady => Err(ChainError::Rpc(format!("{} not ready", url))),
            Behavior::HangReady => std::future::pending().await,
            _ => Ok(FakeHandle {
                url: url.to_string(),
                live: AtomicBool::new(true),
                data: self.data,
                fail_queries: AtomicBool::new(false),
            }),
        }
    }

    fn dispose(&self, url: &str, _transport: String) {
        self.state.lock().unwrap().disposed.push(url.to_string());
    }
}

pub fn network(urls: &[&str]) -> NetworkDescriptor {
    NetworkDescriptor {
        id: NetworkId::new("testnet"),
        name: "Testnet".into(),
        native_currency: NativeCurrency {
            symbol: "TST".into(),
            decimals: 10,
        },
        ss58_format: 42,
        genesis_hash: None,
        rpc_urls: RpcUrls {
            default: RpcUrlSet::web_socket(urls.iter().copied()),
            public: None,
        },
    }
}

pub const ALICE: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";

//! Wallet connection orchestration.
//!
//! [`SessionManager`] owns every piece of session state of one adapter
//! instance: the sessions, the account subscription, the failover client
//! and the balance cache. Nothing is shared between instances.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use dotconnect_chain::{
    AccountBalance, BalanceCache, ChainError, ClientHandle, Connector, DEFAULT_ATTEMPT_TIMEOUT,
    DEFAULT_BALANCE_TTL, FailoverClient, NetworkConfigProvider, reencode_address,
};
use dotconnect_core::{AccountRecord, NetworkDescriptor, NetworkId, SessionEvent};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::task::JoinHandle;

use crate::error::SessionError;
use crate::events::{EventSink, NoopSink};
use crate::extension::{
    AccountSelector, ExtensionProviderSet, ExtensionRuntime, ExtensionSigner, InjectedExtension,
    accounts_for_source,
};
use crate::session::{ConnectionSession, SessionStore};
use crate::subscription::AccountSubscriptions;

/// Settings of one adapter instance.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name the app presents to extensions when asking for authorization.
    pub app_label: String,
    pub attempt_timeout: Duration,
    pub balance_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            app_label: "dotconnect".to_string(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            balance_ttl: DEFAULT_BALANCE_TTL,
        }
    }
}

/// Parameters of a connect call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Extension source to connect, e.g. `talisman`.
    pub source: String,
    /// Preferred account address.
    pub address: Option<String>,
    /// Network to connect for. The provider's default when `None`.
    pub network: Option<NetworkId>,
}

impl ConnectRequest {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            address: None,
            network: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_network(mut self, network: impl Into<NetworkId>) -> Self {
        self.network = Some(network.into());
        self
    }
}

/// Connection lifecycle as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
}

type EnableResult = Result<Arc<Vec<InjectedExtension>>, SessionError>;
type EnableFuture = Shared<BoxFuture<'static, EnableResult>>;

/// Held while a connect runs. Dropping it lets the next connect in.
struct ConnectGuard<'a>(&'a AtomicBool);

impl<'a> ConnectGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ConnectGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Connects wallet extensions and keeps their sessions.
pub struct SessionManager<C: Connector> {
    config: SessionConfig,
    runtime: ExtensionRuntime,
    networks: Arc<dyn NetworkConfigProvider>,
    selector: Option<Arc<dyn AccountSelector>>,
    events: Arc<dyn EventSink>,
    store: Arc<SessionStore>,
    subscriptions: AccountSubscriptions,
    client: Arc<FailoverClient<C>>,
    balances: BalanceCache<C>,
    connecting: AtomicBool,
    enabling: Arc<Mutex<Option<EnableFuture>>>,
}

impl<C: Connector> SessionManager<C> {
    pub fn new(
        config: SessionConfig,
        runtime: ExtensionRuntime,
        networks: Arc<dyn NetworkConfigProvider>,
        connector: C,
    ) -> Self {
        let store = Arc::new(SessionStore::new());
        let events: Arc<dyn EventSink> = Arc::new(NoopSink);
        let client = Arc::new(FailoverClient::with_timeout(
            connector,
            config.attempt_timeout,
        ));
        let balances = BalanceCache::with_ttl(Arc::clone(&client), config.balance_ttl);

        Self {
            subscriptions: AccountSubscriptions::new(
                runtime.clone(),
                Arc::clone(&store),
                Arc::clone(&events),
            ),
            config,
            runtime,
            networks,
            selector: None,
            events,
            store,
            client,
            balances,
            connecting: AtomicBool::new(false),
            enabling: Arc::new(Mutex::new(None)),
        }
    }

    /// Ask this selector when a source offers several accounts.
    pub fn with_selector(mut self, selector: Arc<dyn AccountSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Deliver session events to `events`.
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.subscriptions = AccountSubscriptions::new(
            self.runtime.clone(),
            Arc::clone(&self.store),
            Arc::clone(&events),
        );
        self.events = events;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<FailoverClient<C>> {
        &self.client
    }

    pub fn balances(&self) -> &BalanceCache<C> {
        &self.balances
    }

    pub fn subscriptions(&self) -> &AccountSubscriptions {
        &self.subscriptions
    }

    pub fn state(&self) -> ConnectionState {
        if self.connecting.load(Ordering::Acquire) {
            ConnectionState::Connecting
        } else if self.store.has_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Idle
        }
    }

    /// Connect an extension source and select one of its accounts.
    ///
    /// Only one connect runs at a time per adapter; a concurrent call fails
    /// with [`SessionError::ConnectInProgress`] without touching the
    /// extension. Connecting a source that already has a selected account
    /// reuses that session.
    pub async fn connect(&self, request: ConnectRequest) -> Result<AccountRecord, SessionError> {
        let _guard =
            ConnectGuard::acquire(&self.connecting).ok_or(SessionError::ConnectInProgress)?;

        let Some(provider) = self.runtime.provider().cloned() else {
            return Err(SessionError::ExtensionUnavailable(
                "no extension runtime in this environment".to_string(),
            ));
        };

        if let Some(account) = self.reuse(&provider, &request).await? {
            return Ok(account);
        }

        self.teardown(&request.source);

        let network = self.resolve_network(request.network.as_ref())?;
        let enabled = self.enable(&provider).await?;
        if !enabled.iter().any(|e| e.name == request.source) {
            return Err(SessionError::ExtensionUnavailable(format!(
                "{} is not installed or did not authorize {}",
                request.source, self.config.app_label
            )));
        }

        let injected = provider
            .accounts()
            .await
            .map_err(|e| SessionError::ExtensionUnavailable(e.to_string()))?;
        let accounts = accounts_for_source(&injected, &request.source, Some(&network));
        if accounts.is_empty() {
            return Err(SessionError::ExtensionUnavailable(format!(
                "{} has no accounts for {}",
                request.source, network.name
            )));
        }

        let account = self
            .select_account(&accounts, request.address.as_deref(), &network)
            .await?;

        let session = ConnectionSession {
            source: request.source.clone(),
            network: Some(network.clone()),
            accounts,
            account: Some(account.clone()),
        };
        let event = session.account_event();
        self.store.insert(session);
        tracing::info!(
            "Connected {} account {} on {}",
            request.source,
            account.address,
            network.name
        );
        if let Some(event) = event {
            self.events.emit(event);
        }

        if let Err(e) = self.subscriptions.attach(&request.source).await {
            tracing::warn!("No live account updates for {}: {}", request.source, e);
        }

        // A disconnect may have run while the subscription was being set up.
        if self.store.get(&request.source).is_none() {
            tracing::debug!("{} was disconnected while connecting", request.source);
            self.subscriptions.detach(Some(&request.source));
            return Ok(account);
        }

        spawn_background_prefetch(Arc::clone(&self.client), network);

        Ok(account)
    }

    /// Return the stored account when the source is already connected.
    async fn reuse(
        &self,
        provider: &Arc<dyn ExtensionProviderSet>,
        request: &ConnectRequest,
    ) -> Result<Option<AccountRecord>, SessionError> {
        let Some(session) = self.store.get(&request.source) else {
            return Ok(None);
        };
        if session.account.is_none() {
            return Ok(None);
        }

        if let Err(e) = self.enable(provider).await {
            tracing::warn!("Re-enabling {} failed: {}", request.source, e);
        }

        let switch = match (&session.network, &request.network) {
            (None, _) => true,
            (Some(current), Some(requested)) => current.id != *requested,
            (Some(_), None) => false,
        };
        let session = if switch {
            let network = self.resolve_network(request.network.as_ref())?;
            tracing::debug!("Session {} now on {}", request.source, network.name);
            self.store
                .set_network(&request.source, network)
                .unwrap_or(session)
        } else {
            session
        };

        if let Some(event) = session.account_event() {
            self.events.emit(event);
        }
        tracing::debug!("Reusing session for {}", request.source);
        Ok(session.account)
    }

    fn resolve_network(&self, id: Option<&NetworkId>) -> Result<NetworkDescriptor, SessionError> {
        match id {
            Some(id) => self
                .networks
                .network(id)
                .ok_or_else(|| ChainError::UnknownNetwork(id.to_string()).into()),
            None => Ok(self.networks.default_network()),
        }
    }

    /// Enable the extensions, joining an enable that is already in flight.
    async fn enable(&self, provider: &Arc<dyn ExtensionProviderSet>) -> EnableResult {
        let inflight = {
            let mut slot = lock(&self.enabling);
            match slot.as_ref() {
                Some(inflight) => inflight.clone(),
                None => {
                    let provider = Arc::clone(provider);
                    let app_label = self.config.app_label.clone();
                    let enabling = Arc::clone(&self.enabling);
                    let future = async move {
                        let result = provider
                            .enable(&app_label)
                            .await
                            .map(Arc::new)
                            .map_err(|e| SessionError::ExtensionUnavailable(e.to_string()));
                        lock(&enabling).take();
                        result
                    }
                    .boxed()
                    .shared();
                    *slot = Some(future.clone());
                    future
                }
            }
        };
        inflight.await
    }

    /// Enabled extensions, sharing any enable already in flight.
    pub async fn extensions(&self) -> Result<Vec<InjectedExtension>, SessionError> {
        let Some(provider) = self.runtime.provider().cloned() else {
            return Ok(Vec::new());
        };
        let enabled = self.enable(&provider).await?;
        Ok(enabled.as_ref().clone())
    }

    async fn select_account(
        &self,
        accounts: &[AccountRecord],
        address: Option<&str>,
        network: &NetworkDescriptor,
    ) -> Result<AccountRecord, SessionError> {
        let first = || {
            accounts
                .first()
                .cloned()
                .ok_or_else(|| SessionError::ExtensionUnavailable("no accounts".to_string()))
        };

        if let Some(address) = address {
            let wanted = reencode_address(address, network.ss58_format)
                .unwrap_or_else(|| address.to_string());
            return match accounts.iter().find(|a| a.address == wanted) {
                Some(account) => Ok(account.clone()),
                None => {
                    tracing::debug!("Account {} not offered, using the first one", address);
                    first()
                }
            };
        }

        match (accounts, &self.selector) {
            ([only], _) => Ok(only.clone()),
            (_, Some(selector)) => {
                let chosen = selector
                    .select(accounts)
                    .await
                    .map_err(|e| SessionError::SelectionCancelled(e.to_string()))?;
                if accounts.contains(&chosen) {
                    Ok(chosen)
                } else {
                    Err(SessionError::SelectionCancelled(format!(
                        "{} was not one of the offered accounts",
                        chosen.address
                    )))
                }
            }
            (_, None) => first(),
        }
    }

    /// Drop a session that cannot be reused, without announcing it.
    fn teardown(&self, source: &str) {
        let (removed, _) = self.store.remove(source);
        if let Some(session) = removed {
            tracing::debug!("Dropping stale session for {}", source);
            self.subscriptions.detach(Some(source));
            self.forget_balances(&session);
        }
    }

    fn forget_balances(&self, session: &ConnectionSession) {
        for account in &session.accounts {
            self.balances.invalidate_address(&account.address);
        }
    }

    /// Close the session of `source`, or every session when `None`.
    ///
    /// Closing the last session disposes all chain clients and emits
    /// [`SessionEvent::Disconnected`].
    pub fn disconnect(&self, source: Option<&str>) {
        if !self.runtime.is_available() {
            return;
        }

        let (removed, now_empty) = match source {
            Some(source) => {
                let (removed, now_empty) = self.store.remove(source);
                (removed.into_iter().collect::<Vec<_>>(), now_empty)
            }
            None => (self.store.drain(), true),
        };

        self.subscriptions.detach(source);
        if removed.is_empty() {
            return;
        }
        for session in &removed {
            tracing::info!("Disconnected {}", session.source);
            self.forget_balances(session);
        }

        if now_empty {
            self.client.shutdown();
            self.events.emit(SessionEvent::Disconnected);
        }
    }

    pub fn sessions(&self) -> Vec<ConnectionSession> {
        self.store.all()
    }

    pub fn session(&self, source: &str) -> Option<ConnectionSession> {
        self.store.get(source)
    }

    pub fn accounts(&self, source: &str) -> Vec<AccountRecord> {
        self.store
            .get(source)
            .map(|s| s.accounts)
            .unwrap_or_default()
    }

    pub fn is_connected(&self) -> bool {
        self.store.has_connected()
    }

    pub fn current_account(&self, source: &str) -> Option<AccountRecord> {
        self.store.get(source).and_then(|s| s.account)
    }

    /// Transferable balance of the selected account of `source`.
    pub async fn balance(&self, source: &str) -> Option<AccountBalance> {
        let session = self.store.get(source)?;
        let account = session.account?;
        let network = session
            .network
            .unwrap_or_else(|| self.networks.default_network());
        Some(self.balances.read(&network, &account.address).await)
    }

    /// Signer for the selected account of `source`.
    pub async fn signer(&self, source: &str) -> Result<Arc<dyn ExtensionSigner>, SessionError> {
        let Some(provider) = self.runtime.provider() else {
            return Err(SessionError::ExtensionUnavailable(
                "no extension runtime in this environment".to_string(),
            ));
        };
        let account = self.current_account(source).ok_or_else(|| {
            SessionError::ExtensionUnavailable(format!("{} is not connected", source))
        })?;
        provider
            .signer_for(&account.address)
            .await
            .map_err(|e| SessionError::ExtensionUnavailable(e.to_string()))
    }

    /// A live chain client for a network.
    pub async fn client_for(&self, network: &NetworkId) -> Result<Arc<C::Handle>, SessionError> {
        let network = self.resolve_network(Some(network))?;
        Ok(self.client.acquire(&network).await?)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Warm the client of `network` in a detached task.
///
/// The outcome is only logged. Returns `None` outside a Tokio runtime.
pub fn spawn_background_prefetch<C: Connector>(
    client: Arc<FailoverClient<C>>,
    network: NetworkDescriptor,
) -> Option<JoinHandle<()>> {
    let runtime = tokio::runtime::Handle::try_current().ok()?;
    Some(runtime.spawn(async move {
        match client.acquire(&network).await {
            Ok(handle) => tracing::debug!(
                "Prefetched {} client via {}",
                network.name,
                handle.endpoint()
            ),
            Err(e) => tracing::warn!("Background prefetch for {} failed: {}", network.name, e),
        }
    }))
}

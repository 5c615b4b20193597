//! Live account-change subscription.
//!
//! The extension runtime offers a single account feed for the whole app, so
//! an adapter holds at most one subscription at a time. Attaching for a new
//! source replaces the previous one, and sessions of other sources stop
//! receiving live updates until they reconnect.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::error::SessionError;
use crate::events::EventSink;
use crate::extension::{
    AccountsCallback, ExtensionRuntime, InjectedAccount, Unsubscribe, accounts_for_source,
};
use crate::session::SessionStore;

/// An attached account feed. Released at most once, explicitly or on drop.
pub struct Subscription {
    source: String,
    unsubscribe: Option<Unsubscribe>,
}

impl Subscription {
    pub fn new(source: impl Into<String>, unsubscribe: Unsubscribe) -> Self {
        Self {
            source: source.into(),
            unsubscribe: Some(unsubscribe),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_released(&self) -> bool {
        self.unsubscribe.is_none()
    }

    /// Cancel the feed. Later calls do nothing.
    pub fn release(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            tracing::debug!("Releasing account subscription for {}", self.source);
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("source", &self.source)
            .field("released", &self.is_released())
            .finish()
    }
}

/// Keeps sessions in sync with the extension's account list.
pub struct AccountSubscriptions {
    runtime: ExtensionRuntime,
    store: Arc<SessionStore>,
    events: Arc<dyn EventSink>,
    active: Mutex<Option<Subscription>>,
}

impl AccountSubscriptions {
    pub fn new(
        runtime: ExtensionRuntime,
        store: Arc<SessionStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            runtime,
            store,
            events,
            active: Mutex::new(None),
        }
    }

    fn active(&self) -> MutexGuard<'_, Option<Subscription>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Source the current subscription was attached for.
    pub fn active_source(&self) -> Option<String> {
        self.active().as_ref().map(|s| s.source.clone())
    }

    /// Subscribe to account changes for `source`, replacing any previous
    /// subscription.
    pub async fn attach(&self, source: &str) -> Result<(), SessionError> {
        let Some(provider) = self.runtime.provider() else {
            return Ok(());
        };

        let previous = self.active().take();
        if let Some(mut previous) = previous {
            previous.release();
        }

        let store = Arc::downgrade(&self.store);
        let events = Arc::clone(&self.events);
        let owner = source.to_string();
        let callback: AccountsCallback = Arc::new(move |accounts| {
            on_accounts_changed(&store, events.as_ref(), &owner, accounts);
        });

        let unsubscribe = provider
            .subscribe_accounts(callback)
            .await
            .map_err(|e| SessionError::Subscription(e.to_string()))?;

        let replaced = self
            .active()
            .replace(Subscription::new(source, unsubscribe));
        // A concurrent attach may have landed while we were subscribing.
        drop(replaced);

        tracing::debug!("Attached account subscription for {}", source);
        Ok(())
    }

    /// Release the subscription. With a source, only when it was attached
    /// for that source.
    pub fn detach(&self, source: Option<&str>) {
        let taken = {
            let mut active = self.active();
            match (source, active.as_ref()) {
                (Some(source), Some(current)) if current.source != source => None,
                _ => active.take(),
            }
        };
        if let Some(mut subscription) = taken {
            subscription.release();
        }
    }
}

fn on_accounts_changed(
    store: &Weak<SessionStore>,
    events: &dyn EventSink,
    source: &str,
    accounts: Vec<InjectedAccount>,
) {
    let Some(store) = store.upgrade() else {
        return;
    };
    let network = store.get(source).and_then(|s| s.network);
    let records = accounts_for_source(&accounts, source, network.as_ref());
    if records.is_empty() {
        tracing::debug!("Account update without {} accounts, ignoring", source);
        return;
    }

    match store.replace_accounts(source, records) {
        Some(session) => {
            tracing::debug!("Accounts of {} changed ({})", source, session.accounts.len());
            if let Some(event) = session.account_event() {
                events.emit(event);
            }
        }
        None => tracing::debug!("Account update for {} without a session", source),
    }
}

//! Connection sessions, one per extension source.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use dotconnect_chain::reencode_address;
use dotconnect_core::{AccountRecord, NetworkDescriptor, NetworkId, SessionEvent};

/// An active connection to one wallet extension.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSession {
    /// Extension source identifier.
    pub source: String,
    /// Network the session was connected for. `None` for sessions that
    /// predate network selection.
    pub network: Option<NetworkDescriptor>,
    /// Accounts of this source, replaced on every account change.
    pub accounts: Vec<AccountRecord>,
    /// The selected (primary) account.
    pub account: Option<AccountRecord>,
}

impl ConnectionSession {
    pub fn chain_id(&self) -> Option<NetworkId> {
        self.network.as_ref().map(|n| n.id.clone())
    }

    /// Event announcing the selected account, if there is one.
    pub fn account_event(&self) -> Option<SessionEvent> {
        self.account.as_ref().map(|account| SessionEvent::AccountChanged {
            address: account.address.clone(),
            chain_id: self.chain_id(),
            source: self.source.clone(),
        })
    }
}

/// Sessions of one adapter instance, keyed by extension source.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, ConnectionSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ConnectionSession>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, source: &str) -> Option<ConnectionSession> {
        self.lock().get(source).cloned()
    }

    pub fn all(&self) -> Vec<ConnectionSession> {
        let mut sessions: Vec<_> = self.lock().values().cloned().collect();
        sessions.sort_by(|a, b| a.source.cmp(&b.source));
        sessions
    }

    /// Store a session, replacing any previous one for the same source.
    pub fn insert(&self, session: ConnectionSession) -> Option<ConnectionSession> {
        self.lock().insert(session.source.clone(), session)
    }

    /// Remove one session. Also reports whether the store is now empty.
    pub fn remove(&self, source: &str) -> (Option<ConnectionSession>, bool) {
        let mut sessions = self.lock();
        let removed = sessions.remove(source);
        (removed, sessions.is_empty())
    }

    /// Remove every session.
    pub fn drain(&self) -> Vec<ConnectionSession> {
        self.lock().drain().map(|(_, session)| session).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any session has a selected account.
    pub fn has_connected(&self) -> bool {
        self.lock().values().any(|s| s.account.is_some())
    }

    /// Replace the accounts of a session and make the first one primary.
    ///
    /// Returns the updated session, or `None` if there is no session for
    /// `source` or `accounts` is empty.
    pub fn replace_accounts(
        &self,
        source: &str,
        accounts: Vec<AccountRecord>,
    ) -> Option<ConnectionSession> {
        let primary = accounts.first().cloned()?;
        let mut sessions = self.lock();
        let session = sessions.get_mut(source)?;
        session.accounts = accounts;
        session.account = Some(primary);
        Some(session.clone())
    }

    /// Set the network of a session, re-encoding its addresses for it.
    pub fn set_network(&self, source: &str, network: NetworkDescriptor) -> Option<ConnectionSession> {
        let mut sessions = self.lock();
        let session = sessions.get_mut(source)?;
        let prefix = network.ss58_format;
        for account in session.accounts.iter_mut().chain(session.account.as_mut()) {
            if let Some(address) = reencode_address(&account.address, prefix) {
                account.address = address;
            }
        }
        session.network = Some(network);
        Some(session.clone())
    }
}

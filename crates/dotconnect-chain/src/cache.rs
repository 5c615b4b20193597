//! Client handle cache: at most one handle per network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use dotconnect_core::NetworkId;

use crate::client::ClientHandle;

/// Outcome of [`ClientCache::checkout`].
pub enum Checkout<H> {
    /// A live handle, still cached.
    Live(Arc<H>),
    /// The cached handle was not live and has been removed. The caller disposes it.
    Evicted(Arc<H>),
    /// Nothing cached for this network.
    Missing,
}

/// Maps a network to its live client handle.
///
/// The lock is never held across an await point, so a liveness check and the
/// decision to reuse or evict happen atomically.
pub struct ClientCache<H> {
    handles: Mutex<HashMap<NetworkId, Arc<H>>>,
}

impl<H> Default for ClientCache<H> {
    fn default() -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
        }
    }
}

impl<H: ClientHandle> ClientCache<H> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<NetworkId, Arc<H>>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.handles.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, network: &NetworkId) -> Option<Arc<H>> {
        self.lock().get(network).cloned()
    }

    /// Store a handle, returning the one it displaced.
    pub fn put(&self, network: NetworkId, handle: Arc<H>) -> Option<Arc<H>> {
        self.lock().insert(network, handle)
    }

    pub fn evict(&self, network: &NetworkId) -> Option<Arc<H>> {
        self.lock().remove(network)
    }

    /// Remove every handle.
    pub fn clear(&self) -> Vec<Arc<H>> {
        self.lock().drain().map(|(_, handle)| handle).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a handle and check it is live, evicting it if it is not.
    pub fn checkout(&self, network: &NetworkId) -> Checkout<H> {
        let mut handles = self.lock();
        let Some(handle) = handles.get(network) else {
            return Checkout::Missing;
        };

        if is_live(handle.as_ref()) {
            return Checkout::Live(Arc::clone(handle));
        }

        match handles.remove(network) {
            Some(dead) => Checkout::Evicted(dead),
            None => Checkout::Missing,
        }
    }

    /// Cache `handle` unless a live handle is already cached for the network.
    ///
    /// Returns the handle to use and, if any, a handle the caller must dispose:
    /// either the dead one that was replaced, or `handle` itself when it lost
    /// to an existing live handle.
    pub fn insert_or_reuse(&self, network: NetworkId, handle: Arc<H>) -> (Arc<H>, Option<Arc<H>>) {
        let mut handles = self.lock();
        if let Some(existing) = handles.get(&network)
            && is_live(existing.as_ref())
        {
            return (Arc::clone(existing), Some(handle));
        }
        let replaced = handles.insert(network, Arc::clone(&handle));
        (handle, replaced)
    }
}

/// A failing liveness check counts as "not live".
pub fn is_live<H: ClientHandle + ?Sized>(handle: &H) -> bool {
    match handle.is_live() {
        Ok(live) => live,
        Err(e) => {
            tracing::debug!("Liveness check for {} failed: {}", handle.endpoint(), e);
            false
        }
    }
}

//! Failover client acquisition.
//!
//! `FailoverClient::acquire` hands out the cached handle for a network while
//! it is live. Otherwise it walks the resolved endpoints strictly in priority
//! order, one bounded attempt at a time, and caches the first success.

use std::sync::Arc;
use std::time::Duration;

use dotconnect_core::{NetworkDescriptor, NetworkId};
use tokio::time::{Instant, timeout_at};

use crate::cache::{Checkout, ClientCache};
use crate::client::{ClientHandle, Connector};
use crate::error::ChainError;
use crate::resolver::resolve_endpoints;

/// Upper bound for opening one endpoint and waiting for its client to be ready.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(15);

/// Obtains healthy client handles, one per network.
pub struct FailoverClient<C: Connector> {
    connector: C,
    cache: ClientCache<C::Handle>,
    attempt_timeout: Duration,
}

impl<C: Connector> FailoverClient<C> {
    pub fn new(connector: C) -> Self {
        Self::with_timeout(connector, DEFAULT_ATTEMPT_TIMEOUT)
    }

    pub fn with_timeout(connector: C, attempt_timeout: Duration) -> Self {
        Self {
            connector,
            cache: ClientCache::new(),
            attempt_timeout,
        }
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Currently cached handle for a network, without a liveness check.
    pub fn cached(&self, network: &NetworkId) -> Option<Arc<C::Handle>> {
        self.cache.get(network)
    }

    /// Return a live client for the network, connecting if needed.
    ///
    /// Fails with [`ChainError::NoEndpoints`] when the network declares no
    /// usable endpoint, and with [`ChainError::AllEndpointsFailed`] when every
    /// endpoint was tried and none could be connected.
    pub async fn acquire(&self, network: &NetworkDescriptor) -> Result<Arc<C::Handle>, ChainError> {
        match self.cache.checkout(&network.id) {
            Checkout::Live(handle) => {
                tracing::debug!("Reusing {} client via {}", network.name, handle.endpoint());
                return Ok(handle);
            }
            Checkout::Evicted(dead) => {
                tracing::info!(
                    "Cached {} client via {} is no longer live, reconnecting",
                    network.name,
                    dead.endpoint()
                );
                dead.dispose();
            }
            Checkout::Missing => {}
        }

        let endpoints = resolve_endpoints(network);
        if endpoints.is_empty() {
            return Err(ChainError::NoEndpoints(network.id.clone()));
        }

        let mut last_error = None;
        let mut attempts = 0;

        for endpoint in &endpoints {
            attempts += 1;
            match self.attempt(network, endpoint).await {
                Ok(handle) => {
                    let (handle, to_dispose) =
                        self.cache.insert_or_reuse(network.id.clone(), Arc::new(handle));
                    if let Some(stale) = to_dispose {
                        stale.dispose();
                    }
                    return Ok(handle);
                }
                Err(e) => {
                    tracing::warn!("Failed to connect to {} via {}: {}", network.name, endpoint, e);
                    last_error = Some(e);
                }
            }
        }

        Err(ChainError::AllEndpointsFailed {
            network: network.id.clone(),
            attempts,
            last: Box::new(
                last_error
                    .unwrap_or_else(|| ChainError::Connection("All endpoints failed".to_string())),
            ),
        })
    }

    /// One connection attempt, open and ready under a single deadline.
    async fn attempt(&self, network: &NetworkDescriptor, url: &str) -> Result<C::Handle, ChainError> {
        let deadline = Instant::now() + self.attempt_timeout;
        let timed_out = || ChainError::Timeout {
            url: url.to_string(),
            timeout: self.attempt_timeout,
        };

        // Dropping the open future on timeout cancels it together with its transport.
        let transport = match timeout_at(deadline, self.connector.open(network, url)).await {
            Ok(result) => result?,
            Err(_) => return Err(timed_out()),
        };

        match timeout_at(deadline, self.connector.ready(network, url, &transport)).await {
            Ok(Ok(handle)) => Ok(handle),
            Ok(Err(e)) => {
                self.connector.dispose(url, transport);
                Err(e)
            }
            Err(_) => {
                self.connector.dispose(url, transport);
                Err(timed_out())
            }
        }
    }

    /// Drop the cached handle of a network, disposing it.
    pub fn invalidate(&self, network: &NetworkId) {
        if let Some(handle) = self.cache.evict(network) {
            tracing::debug!("Invalidated {} client via {}", network, handle.endpoint());
            handle.dispose();
        }
    }

    /// Dispose every cached handle.
    pub fn shutdown(&self) {
        for handle in self.cache.clear() {
            handle.dispose();
        }
    }
}

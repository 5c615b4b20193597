//! Error types for chain operations.

use std::time::Duration;

use dotconnect_core::NetworkId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("No RPC endpoints configured for {0}")]
    NoEndpoints(NetworkId),

    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    #[error("Failed to connect to chain: {0}")]
    Connection(String),

    #[error("Timed out after {timeout:?} connecting to {url}")]
    Timeout { url: String, timeout: Duration },

    #[error("All {attempts} endpoints failed for {network}: {last}")]
    AllEndpointsFailed {
        network: NetworkId,
        attempts: usize,
        last: Box<ChainError>,
    },

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Subxt error: {0}")]
    Subxt(#[from] subxt::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] subxt::error::DecodeError),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl ChainError {
    /// Configuration problems are not retried; fixing them needs a config change.
    pub fn is_configuration(&self) -> bool {
        matches!(self, ChainError::NoEndpoints(_) | ChainError::UnknownNetwork(_))
    }

    /// Connectivity problems are retried across the remaining endpoints.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            ChainError::Connection(_)
                | ChainError::Timeout { .. }
                | ChainError::AllEndpointsFailed { .. }
        )
    }
}

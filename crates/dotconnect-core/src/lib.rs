//! Core domain types for chain-session management.
//!
//! This crate provides:
//! - Network, account and event types (`types` module)
//! - Balance and address display helpers (`display` module)
//!
//! With the `persistence` feature enabled:
//! - Adapter configuration stored on disk (`config` module)

pub mod display;
pub mod types;

#[cfg(feature = "persistence")]
pub mod config;

pub use display::*;
pub use types::*;

#[cfg(feature = "persistence")]
pub use config::{AdapterConfig, ConfigError, load_config, save_config};

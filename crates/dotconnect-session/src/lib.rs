//! Wallet extension sessions on top of the failover chain client.
//!
//! - `orchestrator`: connect/disconnect and session queries ([`SessionManager`])
//! - `subscription`: live account updates from the extension
//! - `extension`: interfaces to injected wallet extensions
//! - `events`: delivery of [`SessionEvent`](dotconnect_core::SessionEvent)s

pub mod error;
pub mod events;
pub mod extension;
pub mod orchestrator;
pub mod session;
pub mod subscription;

pub use error::{ExtensionError, SessionError};
pub use events::{EventSink, NoopSink};
pub use extension::{
    AccountSelector, AccountsCallback, ExtensionProviderSet, ExtensionRuntime, ExtensionSigner,
    InjectedAccount, InjectedExtension, Unsubscribe, accounts_for_source,
};
pub use orchestrator::{
    ConnectRequest, ConnectionState, SessionConfig, SessionManager, spawn_background_prefetch,
};
pub use session::{ConnectionSession, SessionStore};
pub use subscription::{AccountSubscriptions, Subscription};

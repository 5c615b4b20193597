//! Delivery of session events to downstream listeners.
//!
//! Delivery is fire-and-forget: no acknowledgement, no replay. A listener
//! that went away simply stops receiving events.

use dotconnect_core::SessionEvent;
use tokio::sync::mpsc;

/// Receives session events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SessionEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: SessionEvent) {}
}

impl EventSink for mpsc::UnboundedSender<SessionEvent> {
    fn emit(&self, event: SessionEvent) {
        if self.send(event).is_err() {
            tracing::debug!("Session event listener closed, dropping event");
        }
    }
}

impl EventSink for mpsc::Sender<SessionEvent> {
    fn emit(&self, event: SessionEvent) {
        match self.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!("Session event channel full, dropping {:?}", event);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Session event listener closed, dropping event");
            }
        }
    }
}

//! Signaling transport capability
//!
//! The relay is reached through a bidirectional event socket owned by the
//! embedder. This trait is the interface boundary: the client emits named
//! events, performs one request/acknowledgment exchange (`link`), and
//! listens for named events either once or as a stream. Implementations are
//! responsible for connection management; the client never reconnects.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::errors::SignalError;

/// Bidirectional event socket to the signaling relay
#[async_trait]
pub trait SignalTransport: Send + Sync {
    /// Emit a fire-and-forget event
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Transport`] when the event cannot be sent
    async fn emit(&self, event: &str, payload: Value) -> Result<(), SignalError>;

    /// Emit an event and suspend until its correlated acknowledgment arrives
    ///
    /// This is a one-shot request/acknowledgment, not a subscription; it is
    /// used by the link handshake. There is no timeout — bounded waiting is
    /// the caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Transport`] when the event cannot be sent or
    /// the socket closes before the acknowledgment
    async fn request(&self, event: &str, payload: Value) -> Result<Value, SignalError>;

    /// Suspend until the named event is delivered once
    ///
    /// At-most-one resolution: a second event of the same name is not
    /// observed by this listener.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Transport`] when the socket closes before the
    /// event arrives
    async fn once(&self, event: &str) -> Result<Value, SignalError>;

    /// Subscribe to every delivery of the named event
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Transport`] when the subscription cannot be
    /// registered
    async fn subscribe(&self, event: &str) -> Result<mpsc::Receiver<Value>, SignalError>;

    /// Drop every listener registered through this transport
    async fn remove_all_listeners(&self);

    /// Disconnect the underlying socket
    async fn disconnect(&self);
}

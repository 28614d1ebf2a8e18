//! Peer connection capabilities
//!
//! The WebRTC engine is injected behind these traits so the state machine is
//! deterministic and testable without a network stack. The `native-rtc`
//! feature provides implementations backed by the `webrtc` crate.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::errors::SignalError;
use crate::signaling::types::{IceCandidate, RtcConfiguration, SessionDescription};

/// A negotiated bidirectional data channel
#[async_trait]
pub trait DataChannel: Send + Sync {
    fn label(&self) -> String;

    /// Send one message over the channel
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Peer`] when the channel is not open
    async fn send(&self, data: &[u8]) -> Result<(), SignalError>;

    /// Receive the next message, or `None` once the channel is closed
    async fn recv(&self) -> Option<Vec<u8>>;

    /// Close the channel
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Peer`] when the engine rejects the close
    async fn close(&self) -> Result<(), SignalError>;
}

/// One peer connection as exposed by the engine
///
/// Methods map one-to-one onto the engine's async operations; the engine's
/// callback surfaces (local candidate discovery, remote-opened channels) are
/// exposed as broadcast subscriptions so the session can pump them into the
/// signaling transport.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// # Errors
    /// Returns [`SignalError::Peer`] when the engine fails
    async fn create_offer(&self) -> Result<SessionDescription, SignalError>;

    /// # Errors
    /// Returns [`SignalError::Peer`] when the engine fails
    async fn create_answer(&self) -> Result<SessionDescription, SignalError>;

    /// # Errors
    /// Returns [`SignalError::Peer`] when the engine rejects the description
    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), SignalError>;

    /// # Errors
    /// Returns [`SignalError::Peer`] when the engine rejects the description
    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), SignalError>;

    async fn has_remote_description(&self) -> bool;

    /// Apply a remote candidate; only valid after the remote description is
    /// set
    ///
    /// # Errors
    /// Returns [`SignalError::Peer`] when the engine rejects the candidate
    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), SignalError>;

    /// Open a data channel toward the remote peer
    ///
    /// # Errors
    /// Returns [`SignalError::Peer`] when the engine fails
    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn DataChannel>, SignalError>;

    /// Locally discovered ICE candidates
    fn local_candidates(&self) -> broadcast::Receiver<IceCandidate>;

    /// Data channels opened by the remote peer
    fn remote_data_channels(&self) -> broadcast::Receiver<Arc<dyn DataChannel>>;

    async fn close(&self);
}

/// Creates peer connections from a configuration
#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    /// # Errors
    /// Returns [`SignalError::Peer`] when the engine cannot be constructed
    async fn create_connection(
        &self,
        config: &RtcConfiguration,
    ) -> Result<Arc<dyn PeerConnection>, SignalError>;
}

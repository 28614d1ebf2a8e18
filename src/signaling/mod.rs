//! Signaling and peer-link state machine
//!
//! One linking session per client: link-request correlation over the relay,
//! offer/answer exchange, candidate exchange with out-of-order buffering,
//! and data-channel establishment. The transport, the WebRTC engine, and the
//! credential provider are injected capabilities.

mod client;
mod peer;
mod session;
mod transport;
mod types;

#[cfg(feature = "native-rtc")]
mod rtc;

#[cfg(test)]
mod tests;

pub use client::{generate_deep_link, SignalClient, CHANNEL_LABEL};
pub use peer::{DataChannel, PeerConnection, PeerConnectionFactory};
pub use session::{CandidateBuffer, Session, SessionState};
pub use transport::SignalTransport;
pub use types::{
    Direction, ExchangeRole, IceCandidate, IceServer, LinkMessage, RtcConfiguration, SdpType,
    SessionDescription, SignalEvent, DEFAULT_ICE_SERVERS,
};

#[cfg(feature = "native-rtc")]
pub use rtc::NativePeerConnectionFactory;

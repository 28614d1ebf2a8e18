#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Client for passwordless authentication and device linking
//!
//! Credential ceremonies (assertion and attestation) run against an HTTP
//! ceremony service, and a peer-to-peer data channel is negotiated through a
//! signaling relay: one [`SignalClient`] manages one linking session at a
//! time — link-request correlation, offer/answer exchange, candidate
//! buffering, channel establishment. The transport, WebRTC engine, HTTP
//! client, and credential provider are injected capabilities, so the state
//! machine runs deterministically under test.

/// Version of the liquid-auth client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod assertion;
pub mod attestation;
pub mod encoding;
pub mod errors;
pub mod http;
pub mod settings;
pub mod signaling;
pub mod webauthn;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use attestation::{AttestationCeremonyOptions, ChallengeSigner, LiquidExtension};
pub use errors::{CeremonyError, CodecError, SignalError};
pub use settings::LiquidSettings;
pub use signaling::{
    generate_deep_link, Direction, LinkMessage, SignalClient, SignalEvent, SignalTransport,
};
pub use webauthn::CredentialProvider;

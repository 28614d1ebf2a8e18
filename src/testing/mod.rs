//! Testing utilities
//!
//! Mock implementations of every injected capability plus shared fixtures,
//! so the ceremonies and the signaling state machine can be driven without a
//! browser runtime, a relay, or a network stack.
//!
//! ## Organization
//!
//! - [`mock`] - Mock transport, peer network, credential provider, signer
//! - [`fixtures`] - Pre-built wire payloads and credentials

pub mod fixtures;
pub mod mock;

pub use fixtures::TestFixtures;
pub use mock::{
    MockCredentialProvider, MockDataChannel, MockPeerConnection, MockRtcNetwork,
    MockSignalTransport, StaticChallengeSigner,
};

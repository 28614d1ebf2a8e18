//! `WebAuthn` structures and the credential provider capability
//!
//! The native option/credential types carry binary buffers; the base64url
//! wire forms live with each ceremony's encoder.

mod provider;
mod types;

pub use provider::CredentialProvider;
pub use types::{
    AssertionResponse, AttestationResponse, AuthenticatorResponse, AuthenticatorSelection,
    CredentialCreationOptions, CredentialDescriptor, CredentialParameters,
    CredentialRequestOptions, PublicKeyCredential, RelyingParty, UserEntity,
};

//! Credential provider capability
//!
//! Stands in for the environment's native credential API. Injected so the
//! ceremony orchestrators run deterministically without a browser runtime;
//! an environment without a provider fails ceremonies with
//! `AuthenticatorNotSupported`.

use async_trait::async_trait;

use crate::errors::CeremonyError;
use crate::webauthn::types::{
    CredentialCreationOptions, CredentialRequestOptions, PublicKeyCredential,
};

/// Native credential operations (`credentials.get` / `credentials.create`)
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Request an assertion for one of the allowed credentials
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails or the user aborts; `Ok(None)`
    /// means the provider completed without producing a credential
    async fn get_credential(
        &self,
        options: CredentialRequestOptions,
    ) -> Result<Option<PublicKeyCredential>, CeremonyError>;

    /// Create a new credential
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails or the user aborts; `Ok(None)`
    /// means the provider completed without producing a credential
    async fn create_credential(
        &self,
        options: CredentialCreationOptions,
    ) -> Result<Option<PublicKeyCredential>, CeremonyError>;
}

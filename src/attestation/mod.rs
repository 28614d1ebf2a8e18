//! Attestation ceremony
//!
//! Registers a new credential bound to a wallet identity: fetch the creation
//! options, hand the decoded challenge to the external signer, merge the
//! signer's identity into the options, create the credential, and submit it
//! with the signer's result attached as the `liquid` extension.

pub mod encoder;
pub mod fetch;

use async_trait::async_trait;
use log::debug;
use serde_json::{json, Value};

use crate::encoding::from_base64_url;
use crate::errors::CeremonyError;
use crate::http::HttpClient;
use crate::webauthn::CredentialProvider;

pub use encoder::LiquidExtension;
pub use fetch::AttestationCeremonyOptions;

/// External challenge-signing capability
///
/// One suspend point: given the decoded binary challenge, produce a signed
/// [`LiquidExtension`]. This typically fronts a wallet; the ceremony depends
/// on it synchronously and does not implement it.
#[async_trait]
pub trait ChallengeSigner: Send + Sync {
    /// Sign the service-issued challenge
    ///
    /// # Errors
    ///
    /// Returns an error when the signer cannot produce a signature; the
    /// ceremony propagates it unchanged
    async fn sign_challenge(&self, challenge: Vec<u8>) -> Result<LiquidExtension, CeremonyError>;
}

/// Inputs for one attestation ceremony
pub struct AttestationParams<'a> {
    /// Origin of the ceremony service
    pub origin: &'a str,
    /// Options posted to the service when requesting the ceremony
    pub options: AttestationCeremonyOptions,
}

/// Register a new credential
///
/// # Errors
///
/// Returns [`CeremonyError::AuthenticatorNotSupported`] when no credential
/// provider exists in this environment, [`CeremonyError::InvalidInput`] on
/// missing arguments, and otherwise propagates transport, codec, signer, and
/// provider failures unchanged
pub async fn attestation(
    http: &dyn HttpClient,
    provider: Option<&dyn CredentialProvider>,
    signer: &dyn ChallengeSigner,
    params: AttestationParams<'_>,
) -> Result<Value, CeremonyError> {
    let provider = provider.ok_or(CeremonyError::AuthenticatorNotSupported)?;
    if params.origin.is_empty() {
        return Err(CeremonyError::InvalidInput);
    }

    debug!("fetching /attestation/request");
    let raw_options = fetch::post_options(http, params.origin, &params.options).await?;

    let challenge = raw_options
        .get("challenge")
        .and_then(Value::as_str)
        .ok_or(CeremonyError::InvalidInput)?;
    let challenge = from_base64_url(challenge)?;
    debug!("handing {}-byte challenge to signer", challenge.len());
    let liquid = signer.sign_challenge(challenge).await?;

    let creation_options = encoder::decode_options(&raw_options, &liquid)?;

    debug!("creating credential with provider");
    let credential = provider.create_credential(creation_options).await?;
    let mut encoded = encoder::encode_credential(credential.as_ref())?;
    encoded.client_extension_results = Some(json!({ "liquid": liquid }));

    debug!("posting /attestation/response");
    let result = fetch::post_response(http, params.origin, &encoded).await?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ReqwestHttpClient;
    use crate::testing::fixtures::WALLET_ADDRESS;
    use crate::testing::{MockCredentialProvider, StaticChallengeSigner, TestFixtures};

    #[tokio::test]
    async fn test_attestation_requires_a_provider() {
        let http = ReqwestHttpClient::new();
        let signer = StaticChallengeSigner::new(TestFixtures::liquid_extension());
        let result = attestation(
            &http,
            None,
            &signer,
            AttestationParams {
                origin: "https://auth.example.com",
                options: AttestationCeremonyOptions::default(),
            },
        )
        .await;
        assert!(matches!(
            result,
            Err(CeremonyError::AuthenticatorNotSupported)
        ));
    }

    #[tokio::test]
    async fn test_attestation_signs_challenge_and_attaches_extension() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/attestation/request")
            .with_status(200)
            .with_body(TestFixtures::attestation_options_json().to_string())
            .create_async()
            .await;
        let response_mock = server
            .mock("POST", "/attestation/response")
            .match_body(mockito::Matcher::PartialJsonString(format!(
                r#"{{"clientExtensionResults":{{"liquid":{{"address":"{WALLET_ADDRESS}"}}}}}}"#
            )))
            .with_status(201)
            .with_body(r#"{"registered":true}"#)
            .create_async()
            .await;

        let http = ReqwestHttpClient::new();
        let provider = MockCredentialProvider::returning(TestFixtures::attestation_credential());
        let signer = StaticChallengeSigner::new(TestFixtures::liquid_extension());

        let result = attestation(
            &http,
            Some(&provider),
            &signer,
            AttestationParams {
                origin: &server.url(),
                options: AttestationCeremonyOptions::default(),
            },
        )
        .await
        .unwrap();

        response_mock.assert_async().await;
        assert_eq!(result["registered"], true);
        assert_eq!(signer.challenges(), vec![b"attestation-challenge".to_vec()]);

        // User identity came from the signer's address.
        let creation = provider.last_creation().unwrap();
        assert_eq!(creation.user.name, WALLET_ADDRESS);
        assert_eq!(creation.user.display_name, WALLET_ADDRESS);
    }
}

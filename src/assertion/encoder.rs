//! Assertion wire codec
//!
//! Converts the service's base64url JSON into native request options and the
//! provider's credential back into its wire form. The two directions are
//! inverse operations on every binary field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::encoding::{from_base64_url, to_base64_url};
use crate::errors::CeremonyError;
use crate::webauthn::{
    AuthenticatorResponse, CredentialDescriptor, CredentialRequestOptions, PublicKeyCredential,
};

/// Wire form of an assertion response, every field base64url
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EncodedAssertionResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub authenticator_data: String,
    pub signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<String>,
}

/// Wire form of an asserted credential
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EncodedCredential {
    pub id: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub raw_id: String,
    pub response: EncodedAssertionResponse,
}

/// Decode assertion request options from the service
///
/// `challenge` must be a base64url string; `allowCredentials` defaults to an
/// empty sequence when absent.
///
/// # Errors
///
/// Returns [`CeremonyError::InvalidInput`] if the payload is not an object or
/// `challenge` is missing or not a string, and a codec error if any binary
/// field fails to decode
pub fn decode_options(options: &Value) -> Result<CredentialRequestOptions, CeremonyError> {
    let object = options.as_object().ok_or(CeremonyError::InvalidInput)?;
    let challenge = object
        .get("challenge")
        .and_then(Value::as_str)
        .ok_or(CeremonyError::InvalidInput)?;

    let mut allow_credentials = Vec::new();
    if let Some(entries) = object.get("allowCredentials").and_then(Value::as_array) {
        for entry in entries {
            let id = entry
                .get("id")
                .and_then(Value::as_str)
                .ok_or(CeremonyError::InvalidInput)?;
            allow_credentials.push(CredentialDescriptor {
                credential_type: entry
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("public-key")
                    .to_string(),
                id: from_base64_url(id)?,
                transports: entry
                    .get("transports")
                    .and_then(Value::as_array)
                    .map(|transports| {
                        transports
                            .iter()
                            .filter_map(Value::as_str)
                            .map(ToString::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            });
        }
    }

    Ok(CredentialRequestOptions {
        challenge: from_base64_url(challenge)?,
        allow_credentials,
        rp_id: object
            .get("rpId")
            .and_then(Value::as_str)
            .map(ToString::to_string),
        timeout: object
            .get("timeout")
            .and_then(Value::as_u64)
            .and_then(|timeout| u32::try_from(timeout).ok()),
        user_verification: object
            .get("userVerification")
            .and_then(Value::as_str)
            .map(ToString::to_string),
    })
}

/// Encode an asserted credential for submission to the service
///
/// # Errors
///
/// Returns [`CeremonyError::InvalidInput`] if no credential was produced and
/// [`CeremonyError::CredentialActionFailure`] if the credential lacks a
/// usable assertion response
pub fn encode_credential(
    credential: Option<&PublicKeyCredential>,
) -> Result<EncodedCredential, CeremonyError> {
    let credential = credential.ok_or(CeremonyError::InvalidInput)?;
    let response = credential
        .response
        .as_ref()
        .ok_or(CeremonyError::CredentialActionFailure)?;
    let AuthenticatorResponse::Assertion(response) = response else {
        return Err(CeremonyError::CredentialActionFailure);
    };

    Ok(EncodedCredential {
        id: credential.id.clone(),
        credential_type: credential.credential_type.clone(),
        raw_id: to_base64_url(&credential.raw_id),
        response: EncodedAssertionResponse {
            client_data_json: to_base64_url(&response.client_data_json),
            authenticator_data: to_base64_url(&response.authenticator_data),
            signature: to_base64_url(&response.signature),
            user_handle: response.user_handle.as_deref().map(to_base64_url),
        },
    })
}

//! Attestation wire codec
//!
//! Decoding merges the service's creation options with the challenge
//! signer's result: the user identity is derived from the wallet address
//! (decoded address bytes as the user handle, the address string as name and
//! display name).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::encoding::{decode_address, from_base64_url, to_base64_url};
use crate::errors::CeremonyError;
use crate::webauthn::{
    AuthenticatorResponse, AuthenticatorSelection, CredentialCreationOptions,
    CredentialDescriptor, CredentialParameters, PublicKeyCredential, RelyingParty, UserEntity,
};

/// Result of the external challenge-signing step
///
/// Whatever signs the challenge (typically a wallet) must return at least the
/// signer's address and the signature over the challenge; any additional
/// fields ride along and are submitted with the credential as the `liquid`
/// client-extension result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidExtension {
    pub address: String,
    pub signature: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Wire form of an attestation response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncodedAttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    #[serde(rename = "attestationObject")]
    pub attestation_object: String,
}

/// Wire form of a newly created credential
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedAttestationCredential {
    pub id: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub raw_id: String,
    pub response: EncodedAttestationResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_extension_results: Option<Value>,
}

/// Decode creation options and inject the signer-derived identity
///
/// # Errors
///
/// Returns [`CeremonyError::InvalidInput`] if the payload is not an object or
/// `challenge` is missing or not a string, and a codec error if the address
/// or any binary field fails to decode
pub fn decode_options(
    options: &Value,
    liquid: &LiquidExtension,
) -> Result<CredentialCreationOptions, CeremonyError> {
    let object = options.as_object().ok_or(CeremonyError::InvalidInput)?;
    let challenge = object
        .get("challenge")
        .and_then(Value::as_str)
        .ok_or(CeremonyError::InvalidInput)?;

    let rp = object.get("rp").and_then(Value::as_object);
    let mut exclude_credentials = Vec::new();
    if let Some(entries) = object.get("excludeCredentials").and_then(Value::as_array) {
        for entry in entries {
            let id = entry
                .get("id")
                .and_then(Value::as_str)
                .ok_or(CeremonyError::InvalidInput)?;
            exclude_credentials.push(CredentialDescriptor {
                credential_type: entry
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("public-key")
                    .to_string(),
                id: from_base64_url(id)?,
                transports: Vec::new(),
            });
        }
    }

    Ok(CredentialCreationOptions {
        challenge: from_base64_url(challenge)?,
        rp: RelyingParty {
            id: rp
                .and_then(|rp| rp.get("id"))
                .and_then(Value::as_str)
                .map(ToString::to_string),
            name: rp
                .and_then(|rp| rp.get("name"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        },
        user: UserEntity {
            id: decode_address(&liquid.address)?.to_vec(),
            name: liquid.address.clone(),
            display_name: liquid.address.clone(),
        },
        pub_key_cred_params: object
            .get("pubKeyCredParams")
            .and_then(Value::as_array)
            .map(|params| {
                params
                    .iter()
                    .filter_map(|param| {
                        Some(CredentialParameters {
                            credential_type: param.get("type")?.as_str()?.to_string(),
                            alg: i32::try_from(param.get("alg")?.as_i64()?).ok()?,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default(),
        timeout: object
            .get("timeout")
            .and_then(Value::as_u64)
            .and_then(|timeout| u32::try_from(timeout).ok()),
        attestation: object
            .get("attestation")
            .and_then(Value::as_str)
            .unwrap_or("none")
            .to_string(),
        authenticator_selection: object
            .get("authenticatorSelection")
            .and_then(Value::as_object)
            .map(|selection| AuthenticatorSelection {
                authenticator_attachment: selection
                    .get("authenticatorAttachment")
                    .and_then(Value::as_str)
                    .map(ToString::to_string),
                require_resident_key: selection
                    .get("requireResidentKey")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                user_verification: selection
                    .get("userVerification")
                    .and_then(Value::as_str)
                    .unwrap_or("required")
                    .to_string(),
            }),
        exclude_credentials,
        extensions: object.get("extensions").cloned(),
    })
}

/// Encode a newly created credential for submission to the service
///
/// Extension results are attached by the orchestrator after encoding.
///
/// # Errors
///
/// Returns [`CeremonyError::InvalidInput`] if no credential was produced and
/// [`CeremonyError::CredentialActionFailure`] if the credential lacks a
/// usable attestation response
pub fn encode_credential(
    credential: Option<&PublicKeyCredential>,
) -> Result<EncodedAttestationCredential, CeremonyError> {
    let credential = credential.ok_or(CeremonyError::InvalidInput)?;
    let response = credential
        .response
        .as_ref()
        .ok_or(CeremonyError::CredentialActionFailure)?;
    let AuthenticatorResponse::Attestation(response) = response else {
        return Err(CeremonyError::CredentialActionFailure);
    };

    Ok(EncodedAttestationCredential {
        id: credential.id.clone(),
        credential_type: credential.credential_type.clone(),
        raw_id: to_base64_url(&credential.raw_id),
        response: EncodedAttestationResponse {
            client_data_json: to_base64_url(&response.client_data_json),
            attestation_object: to_base64_url(&response.attestation_object),
        },
        client_extension_results: None,
    })
}

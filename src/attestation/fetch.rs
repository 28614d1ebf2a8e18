//! Attestation ceremony endpoints
//!
//! Unlike the assertion pair, a rejected attestation call reports the
//! service's status line rather than a bare invalid-response marker.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attestation::encoder::EncodedAttestationCredential;
use crate::errors::{is_valid_status, CeremonyError};
use crate::http::{endpoint, HttpClient};

/// Authenticator selection sent with the attestation options request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CeremonySelection {
    pub authenticator_attachment: String,
    pub user_verification: String,
    pub require_resident_key: bool,
}

/// Extension flags sent with the attestation options request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CeremonyExtensions {
    pub liquid: bool,
}

/// Options posted to `/attestation/request`
///
/// Defaults: attestation type `none`, platform authenticator, required user
/// verification, no resident key, the `liquid` extension enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationCeremonyOptions {
    pub attestation_type: String,
    pub authenticator_selection: CeremonySelection,
    pub extensions: CeremonyExtensions,
}

impl Default for AttestationCeremonyOptions {
    fn default() -> Self {
        Self {
            attestation_type: "none".to_string(),
            authenticator_selection: CeremonySelection {
                authenticator_attachment: "platform".to_string(),
                user_verification: "required".to_string(),
                require_resident_key: false,
            },
            extensions: CeremonyExtensions { liquid: true },
        }
    }
}

/// Fetch attestation creation options from `/attestation/request`
///
/// # Errors
///
/// Returns [`CeremonyError::Service`] carrying the status line on a
/// non-success response
pub async fn post_options(
    http: &dyn HttpClient,
    origin: &str,
    options: &AttestationCeremonyOptions,
) -> Result<Value, CeremonyError> {
    if origin.is_empty() {
        return Err(CeremonyError::InvalidInput);
    }
    let url = endpoint(origin, "attestation/request")?;
    let body = serde_json::to_value(options).map_err(|_| CeremonyError::InvalidInput)?;
    let response = http.post_json(&url, Some(&body)).await?;
    if !is_valid_status(response.status) {
        return Err(CeremonyError::Service {
            status: response.status,
            message: response.status_text,
        });
    }
    Ok(response.body)
}

/// Submit an encoded attestation to `/attestation/response`
///
/// # Errors
///
/// Returns [`CeremonyError::Service`] carrying the status line on a
/// non-success response
pub async fn post_response(
    http: &dyn HttpClient,
    origin: &str,
    credential: &EncodedAttestationCredential,
) -> Result<Value, CeremonyError> {
    if origin.is_empty() {
        return Err(CeremonyError::InvalidInput);
    }
    let url = endpoint(origin, "attestation/response")?;
    let body = serde_json::to_value(credential).map_err(|_| CeremonyError::InvalidInput)?;
    let response = http.post_json(&url, Some(&body)).await?;
    if !is_valid_status(response.status) {
        return Err(CeremonyError::Service {
            status: response.status,
            message: response.status_text,
        });
    }
    Ok(response.body)
}

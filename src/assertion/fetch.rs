//! Assertion ceremony endpoints
//!
//! Two calls: fetch the request options for a credential id, and submit the
//! encoded assertion. Anything other than 200/201 is an invalid response.

use serde_json::Value;

use crate::assertion::encoder::EncodedCredential;
use crate::errors::{is_valid_status, CeremonyError};
use crate::http::{endpoint, HttpClient};

/// Fetch assertion request options from `/assertion/request/:credId`
///
/// # Errors
///
/// Returns [`CeremonyError::InvalidInput`] on an empty origin or credential
/// id and [`CeremonyError::InvalidResponse`] on a non-success status
pub async fn post_options(
    http: &dyn HttpClient,
    origin: &str,
    cred_id: &str,
) -> Result<Value, CeremonyError> {
    if origin.is_empty() || cred_id.is_empty() {
        return Err(CeremonyError::InvalidInput);
    }
    let url = endpoint(origin, &format!("assertion/request/{cred_id}"))?;
    let response = http.post_json(&url, None).await?;
    if !is_valid_status(response.status) {
        return Err(CeremonyError::InvalidResponse);
    }
    Ok(response.body)
}

/// Submit an encoded assertion to `/assertion/response`
///
/// # Errors
///
/// Returns [`CeremonyError::InvalidResponse`] on a non-success status
pub async fn post_response(
    http: &dyn HttpClient,
    origin: &str,
    credential: &EncodedCredential,
) -> Result<Value, CeremonyError> {
    if origin.is_empty() {
        return Err(CeremonyError::InvalidInput);
    }
    let url = endpoint(origin, "assertion/response")?;
    let body = serde_json::to_value(credential).map_err(|_| CeremonyError::InvalidInput)?;
    let response = http.post_json(&url, Some(&body)).await?;
    if !is_valid_status(response.status) {
        return Err(CeremonyError::InvalidResponse);
    }
    Ok(response.body)
}

//! Assertion ceremony
//!
//! Asserts a known credential against the service: fetch and decode the
//! request options, invoke the credential provider, encode and submit the
//! result. Each step's failure propagates unchanged; there is no retry.

pub mod encoder;
pub mod fetch;

use log::debug;
use serde_json::Value;

use crate::errors::CeremonyError;
use crate::http::HttpClient;
use crate::webauthn::{CredentialProvider, CredentialRequestOptions};

/// Inputs for one assertion ceremony
pub struct AssertionParams<'a> {
    /// Origin of the ceremony service
    pub origin: &'a str,
    /// Identifier of the credential to assert
    pub cred_id: &'a str,
    /// Pre-fetched request options; when supplied they are used as-is
    pub options: Option<CredentialRequestOptions>,
}

/// Assert a known credential
///
/// Resolves to `None` without invoking the provider when the service reports
/// no registered credentials to present.
///
/// # Errors
///
/// Returns [`CeremonyError::AuthenticatorNotSupported`] when no credential
/// provider exists in this environment, [`CeremonyError::InvalidInput`] on
/// missing arguments, and otherwise propagates transport, codec, and provider
/// failures unchanged
pub async fn assertion(
    http: &dyn HttpClient,
    provider: Option<&dyn CredentialProvider>,
    params: AssertionParams<'_>,
) -> Result<Option<Value>, CeremonyError> {
    let provider = provider.ok_or(CeremonyError::AuthenticatorNotSupported)?;
    if params.origin.is_empty() || params.cred_id.is_empty() {
        return Err(CeremonyError::InvalidInput);
    }

    let options = match params.options {
        // Caller-supplied options are trusted as-is
        Some(options) => options,
        None => {
            debug!("fetching /assertion/request/{}", params.cred_id);
            let raw = fetch::post_options(http, params.origin, params.cred_id).await?;
            encoder::decode_options(&raw)?
        }
    };

    if options.allow_credentials.is_empty() {
        debug!("no registered credentials found");
        return Ok(None);
    }

    debug!("requesting credential from provider");
    let credential = provider.get_credential(options).await?;
    let encoded = encoder::encode_credential(credential.as_ref())?;

    debug!("posting /assertion/response");
    let result = fetch::post_response(http, params.origin, &encoded).await?;
    Ok(Some(result))
}

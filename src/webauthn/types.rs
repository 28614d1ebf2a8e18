//! Native `WebAuthn` data types
//!
//! These mirror the credential provider's option and credential objects with
//! binary fields as byte buffers. The ceremony encoders convert between these
//! and the service's base64url JSON.

/// Reference to a previously registered credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialDescriptor {
    pub credential_type: String, // Always "public-key"
    pub id: Vec<u8>,             // Raw credential ID
    pub transports: Vec<String>, // "internal", "usb", "ble", "nfc", "hybrid"
}

/// Options for a credential-get (assertion) operation
#[derive(Debug, Clone, Default)]
pub struct CredentialRequestOptions {
    pub challenge: Vec<u8>,
    pub allow_credentials: Vec<CredentialDescriptor>,
    pub rp_id: Option<String>,
    pub timeout: Option<u32>, // Milliseconds
    pub user_verification: Option<String>,
}

/// Relying party information
#[derive(Debug, Clone)]
pub struct RelyingParty {
    pub id: Option<String>, // Domain name
    pub name: String,
}

/// User entity; identity fields are derived from the wallet address during
/// attestation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntity {
    pub id: Vec<u8>, // Raw user handle (decoded address)
    pub name: String,
    pub display_name: String,
}

/// Allowed credential algorithm
#[derive(Debug, Clone)]
pub struct CredentialParameters {
    pub credential_type: String, // Always "public-key"
    pub alg: i32,                // COSE algorithm identifier (-7 for ES256)
}

/// Authenticator selection criteria
#[derive(Debug, Clone)]
pub struct AuthenticatorSelection {
    pub authenticator_attachment: Option<String>, // "platform", "cross-platform"
    pub require_resident_key: bool,
    pub user_verification: String, // "required", "preferred", "discouraged"
}

/// Options for a credential-create (attestation) operation
#[derive(Debug, Clone)]
pub struct CredentialCreationOptions {
    pub challenge: Vec<u8>,
    pub rp: RelyingParty,
    pub user: UserEntity,
    pub pub_key_cred_params: Vec<CredentialParameters>,
    pub timeout: Option<u32>,
    pub attestation: String, // "none", "indirect", "direct"
    pub authenticator_selection: Option<AuthenticatorSelection>,
    pub exclude_credentials: Vec<CredentialDescriptor>,
    pub extensions: Option<serde_json::Value>,
}

/// Credential returned by the provider
#[derive(Debug, Clone)]
pub struct PublicKeyCredential {
    pub id: String,              // Base64url form of the raw ID
    pub credential_type: String, // Always "public-key"
    pub raw_id: Vec<u8>,
    /// Absent when the provider produced a credential without a usable
    /// response payload
    pub response: Option<AuthenticatorResponse>,
}

/// Response payload of a credential operation
#[derive(Debug, Clone)]
pub enum AuthenticatorResponse {
    Assertion(AssertionResponse),
    Attestation(AttestationResponse),
}

/// Authenticator output of a credential-get operation
#[derive(Debug, Clone)]
pub struct AssertionResponse {
    pub client_data_json: Vec<u8>,
    pub authenticator_data: Vec<u8>,
    pub signature: Vec<u8>,
    pub user_handle: Option<Vec<u8>>,
}

/// Authenticator output of a credential-create operation
#[derive(Debug, Clone)]
pub struct AttestationResponse {
    pub client_data_json: Vec<u8>,
    pub attestation_object: Vec<u8>,
}

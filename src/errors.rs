//! Error types for the `liquid-auth` client
//!
//! Three domains of failure: binary codecs, credential ceremonies, and the
//! signaling state machine. No operation retries internally; every error
//! propagates unchanged to the caller of the method that triggered it.

use std::fmt;

/// Binary codec errors (base64url and address encoding)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input is not valid base64url
    InvalidBase64UrlInput,

    /// Address is not a 58-character address string
    MalformedAddress,

    /// Address checksum does not match the embedded public key
    BadChecksum,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::InvalidBase64UrlInput => write!(f, "Invalid base64url input"),
            CodecError::MalformedAddress => write!(f, "Malformed address"),
            CodecError::BadChecksum => write!(f, "Bad checksum"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Credential ceremony errors (assertion and attestation)
#[derive(Debug)]
pub enum CeremonyError {
    /// Malformed caller arguments (missing or mistyped required fields)
    InvalidInput,

    /// The ceremony endpoint returned a non-success response
    InvalidResponse,

    /// The ceremony endpoint rejected the request with a status
    Service { status: u16, message: String },

    /// The native credential provider returned a credential without a
    /// usable response payload
    CredentialActionFailure,

    /// No native credential provider exists in this environment
    AuthenticatorNotSupported,

    /// The HTTP request itself failed (connection, TLS, body read)
    Network(String),

    /// A binary field could not be encoded or decoded
    Encoding(CodecError),
}

impl fmt::Display for CeremonyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CeremonyError::InvalidInput => write!(f, "Invalid input"),
            CeremonyError::InvalidResponse => write!(f, "Invalid response"),
            CeremonyError::Service { status, message } => {
                write!(f, "Service error {status}: {message}")
            }
            CeremonyError::CredentialActionFailure => write!(f, "Credential action failed"),
            CeremonyError::AuthenticatorNotSupported => write!(f, "Authenticator not supported"),
            CeremonyError::Network(msg) => write!(f, "Network error: {msg}"),
            CeremonyError::Encoding(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for CeremonyError {}

impl From<CodecError> for CeremonyError {
    fn from(err: CodecError) -> Self {
        CeremonyError::Encoding(err)
    }
}

/// Signaling and peer-link errors
#[derive(Debug)]
pub enum SignalError {
    /// No request id was supplied or stored when one is required
    RequestIsMissing,

    /// A second session was attempted while one is pending
    RequestInProcess,

    /// `signal` was called before a link handshake completed
    Unauthenticated,

    /// Deep-link or QR generation without an origin
    OriginIsMissing,

    /// The signaling transport failed or delivered an unusable payload
    Transport(String),

    /// The peer connection failed an operation
    Peer(String),

    /// A piggybacked credential ceremony failed
    Ceremony(CeremonyError),
}

impl fmt::Display for SignalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalError::RequestIsMissing => write!(f, "Request id is required"),
            SignalError::RequestInProcess => write!(f, "Request in process"),
            SignalError::Unauthenticated => write!(f, "Not authenticated"),
            SignalError::OriginIsMissing => write!(f, "Origin is required"),
            SignalError::Transport(msg) => write!(f, "Transport error: {msg}"),
            SignalError::Peer(msg) => write!(f, "Peer connection error: {msg}"),
            SignalError::Ceremony(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SignalError {}

impl From<CeremonyError> for SignalError {
    fn from(err: CeremonyError) -> Self {
        SignalError::Ceremony(err)
    }
}

/// Whether a ceremony endpoint response counts as success
#[must_use]
pub fn is_valid_status(status: u16) -> bool {
    status == 200 || status == 201
}

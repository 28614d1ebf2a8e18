//! Pre-built test data
//!
//! Wire payloads and credentials matching what the ceremony service and a
//! linked wallet produce.

use serde_json::{json, Value};

use crate::attestation::LiquidExtension;
use crate::encoding::to_base64_url;
use crate::signaling::LinkMessage;
use crate::webauthn::{
    AssertionResponse, AttestationResponse, AuthenticatorResponse, PublicKeyCredential,
};

/// Wallet address used across fixtures
pub const WALLET_ADDRESS: &str = "65X3KSKFCNX3VUPQDVO3RQUHDZN7BONGBEC6PJWAVKX73DIC356M7M32JM";

/// Credential id used across fixtures
pub const CRED_ID: &str = "y0FhnA";

pub struct TestFixtures;

impl TestFixtures {
    /// Assertion options as served by `/assertion/request/:credId`
    #[must_use]
    pub fn assertion_options_json() -> Value {
        json!({
            "challenge": to_base64_url(b"assertion-challenge"),
            "rpId": "auth.example.com",
            "timeout": 60_000,
            "userVerification": "required",
            "allowCredentials": [
                { "type": "public-key", "id": CRED_ID, "transports": ["internal"] }
            ]
        })
    }

    /// Assertion options with nothing to present
    #[must_use]
    pub fn assertion_options_without_credentials_json() -> Value {
        json!({
            "challenge": to_base64_url(b"assertion-challenge"),
            "allowCredentials": []
        })
    }

    /// Attestation options as served by `/attestation/request`
    #[must_use]
    pub fn attestation_options_json() -> Value {
        json!({
            "challenge": to_base64_url(b"attestation-challenge"),
            "rp": { "id": "auth.example.com", "name": "Example" },
            "pubKeyCredParams": [ { "type": "public-key", "alg": -7 } ],
            "attestation": "none",
            "authenticatorSelection": {
                "authenticatorAttachment": "platform",
                "userVerification": "required",
                "requireResidentKey": false
            }
        })
    }

    /// Credential as produced by a provider during assertion
    #[must_use]
    pub fn assertion_credential() -> PublicKeyCredential {
        PublicKeyCredential {
            id: CRED_ID.to_string(),
            credential_type: "public-key".to_string(),
            raw_id: vec![0xcb, 0x41, 0x61, 0x9c],
            response: Some(AuthenticatorResponse::Assertion(AssertionResponse {
                client_data_json: b"{\"type\":\"webauthn.get\"}".to_vec(),
                authenticator_data: vec![1, 2, 3, 4],
                signature: vec![5, 6, 7, 8],
                user_handle: None,
            })),
        }
    }

    /// Credential as produced by a provider during attestation
    #[must_use]
    pub fn attestation_credential() -> PublicKeyCredential {
        PublicKeyCredential {
            id: CRED_ID.to_string(),
            credential_type: "public-key".to_string(),
            raw_id: vec![0xcb, 0x41, 0x61, 0x9c],
            response: Some(AuthenticatorResponse::Attestation(AttestationResponse {
                client_data_json: b"{\"type\":\"webauthn.create\"}".to_vec(),
                attestation_object: vec![0xa3, 0x63, 0x66, 0x6d, 0x74],
            })),
        }
    }

    /// Signed challenge result as returned by a wallet
    #[must_use]
    pub fn liquid_extension() -> LiquidExtension {
        LiquidExtension {
            address: WALLET_ADDRESS.to_string(),
            signature: to_base64_url(&[0xde, 0xad, 0xbe, 0xef]),
            extra: serde_json::Map::new(),
        }
    }

    /// Link handshake acknowledgment payload for a request id
    #[must_use]
    pub fn link_ack(request_id: &str) -> Value {
        json!({
            "data": {
                "requestId": request_id,
                "wallet": WALLET_ADDRESS,
            }
        })
    }

    /// Parsed form of [`TestFixtures::link_ack`]
    #[must_use]
    pub fn link_message(request_id: &str) -> LinkMessage {
        LinkMessage {
            request_id: request_id.to_string(),
            wallet: WALLET_ADDRESS.to_string(),
            cred_id: None,
        }
    }
}

//! Signaling data types
//!
//! Session descriptions and candidates travel over the transport under
//! role-derived event names: the side playing the offerer role emits
//! `offer-description` / `offer-candidate` and listens for the `answer-*`
//! events, and vice versa. [`Direction`] is the caller-facing parameter — it
//! names the *remote* description type the session waits for — and maps to
//! the effective local [`ExchangeRole`] through one place,
//! [`Direction::local_role`].

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Default STUN servers for peer connections
pub static DEFAULT_ICE_SERVERS: Lazy<Vec<String>> = Lazy::new(|| {
    vec![
        "stun:stun.l.google.com:19302".to_string(),
        "stun:stun1.l.google.com:19302".to_string(),
        "stun:stun2.l.google.com:19302".to_string(),
    ]
});

/// Which remote description type a `peer` call waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Wait for a remote offer (and perform the link handshake first)
    Offer,
    /// Wait for a remote answer (the caller must already be authenticated)
    Answer,
}

impl Direction {
    /// The role the local session plays in the exchange — the opposite of
    /// the awaited description type
    #[must_use]
    pub fn local_role(self) -> ExchangeRole {
        match self {
            Direction::Offer => ExchangeRole::Answerer,
            Direction::Answer => ExchangeRole::Offerer,
        }
    }

    /// The role the remote session plays in the exchange
    #[must_use]
    pub fn remote_role(self) -> ExchangeRole {
        self.local_role().counterpart()
    }
}

/// Role of one side of a description exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeRole {
    Offerer,
    Answerer,
}

impl ExchangeRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExchangeRole::Offerer => "offer",
            ExchangeRole::Answerer => "answer",
        }
    }

    #[must_use]
    pub fn counterpart(self) -> ExchangeRole {
        match self {
            ExchangeRole::Offerer => ExchangeRole::Answerer,
            ExchangeRole::Answerer => ExchangeRole::Offerer,
        }
    }

    /// Transport event carrying this role's session description
    #[must_use]
    pub fn description_event(self) -> String {
        format!("{}-description", self.as_str())
    }

    /// Transport event carrying this role's ICE candidates
    #[must_use]
    pub fn candidate_event(self) -> String {
        format!("{}-candidate", self.as_str())
    }
}

/// SDP tag of a session description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

impl SdpType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SdpType::Offer => "offer",
            SdpType::Answer => "answer",
        }
    }
}

/// A session description exchanged between the two peers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

/// A discovered network path, exchanged asynchronously and possibly out of
/// order relative to the session description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMid", skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", skip_serializing_if = "Option::is_none")]
    pub sdp_mline_index: Option<u16>,
    #[serde(rename = "usernameFragment", skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

/// Acknowledgment payload of the link handshake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMessage {
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub wallet: String,
    #[serde(rename = "credId", skip_serializing_if = "Option::is_none")]
    pub cred_id: Option<String>,
}

/// One ICE server entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,
}

/// Peer connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RtcConfiguration {
    pub ice_servers: Vec<IceServer>,
    pub ice_candidate_pool_size: u8,
}

impl Default for RtcConfiguration {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServer {
                urls: DEFAULT_ICE_SERVERS.clone(),
            }],
            ice_candidate_pool_size: 10,
        }
    }
}

/// Notifications delivered to client observers
///
/// Observation is decoupled from session state: subscribers receive these
/// over a broadcast channel and cannot influence the state machine.
#[derive(Debug, Clone)]
pub enum SignalEvent {
    /// A link handshake started for the given request id
    Link { request_id: String },
    /// The link handshake was acknowledged
    LinkMessage(LinkMessage),
    /// The session started waiting for a remote description
    Signal { sdp_type: SdpType },
    /// A session description was produced or received
    Description(SessionDescription),
    /// A candidate was produced locally or applied from the remote side
    Candidate {
        /// Role that produced the candidate
        role: ExchangeRole,
        candidate: IceCandidate,
    },
    /// A data channel is ready
    DataChannel { label: String },
    /// The client was closed
    Close,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_role_mapping_is_inverted() {
        assert_eq!(Direction::Offer.local_role(), ExchangeRole::Answerer);
        assert_eq!(Direction::Answer.local_role(), ExchangeRole::Offerer);
        assert_eq!(Direction::Offer.remote_role(), ExchangeRole::Offerer);
        assert_eq!(Direction::Answer.remote_role(), ExchangeRole::Answerer);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(ExchangeRole::Offerer.description_event(), "offer-description");
        assert_eq!(ExchangeRole::Answerer.description_event(), "answer-description");
        assert_eq!(ExchangeRole::Offerer.candidate_event(), "offer-candidate");
        assert_eq!(ExchangeRole::Answerer.candidate_event(), "answer-candidate");
    }

    #[test]
    fn test_candidate_wire_names_are_camel_case() {
        let candidate = IceCandidate {
            candidate: "candidate:0 1 UDP 2122252543 192.0.2.1 54400 typ host".to_string(),
            sdp_mid: Some("0".to_string()),
            sdp_mline_index: Some(0),
            username_fragment: None,
        };
        let wire = serde_json::to_value(&candidate).unwrap();
        assert!(wire.get("sdpMid").is_some());
        assert!(wire.get("sdpMLineIndex").is_some());
        assert!(wire.get("usernameFragment").is_none());
    }

    #[test]
    fn test_link_message_wire_names() {
        let message: LinkMessage = serde_json::from_value(serde_json::json!({
            "requestId": "0191-a",
            "wallet": "65X3KSKFCNX3VUPQDVO3RQUHDZN7BONGBEC6PJWAVKX73DIC356M7M32JM"
        }))
        .unwrap();
        assert_eq!(message.request_id, "0191-a");
        assert!(message.cred_id.is_none());
    }

    #[test]
    fn test_session_description_wire_shape() {
        let description = SessionDescription {
            sdp_type: SdpType::Answer,
            sdp: "v=0".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&description).unwrap(),
            serde_json::json!({ "type": "answer", "sdp": "v=0" })
        );
    }
}

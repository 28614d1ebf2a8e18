//! Per-client session state
//!
//! One session at a time. The state is an explicit tagged union rather than
//! a scatter of nullable fields, and the candidate buffer has single-shot
//! flush-and-clear semantics tied to the remote-description transition.

use std::collections::VecDeque;

use crate::signaling::types::{ExchangeRole, IceCandidate};

/// Lifecycle of one linking attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// Waiting for the link acknowledgment; the request id lives only here
    /// and is gone once the handshake resolves
    Linking { request_id: String },
    /// Exchanging descriptions and candidates as the given local role
    Exchanging { role: ExchangeRole },
    Connected,
    Closed,
}

impl SessionState {
    /// Whether a session is in flight; a second `link`/`peer` call is
    /// rejected while this holds
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, SessionState::Linking { .. } | SessionState::Exchanging { .. })
    }

    /// The stored request id, present only while linking
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match self {
            SessionState::Linking { request_id } => Some(request_id),
            _ => None,
        }
    }
}

/// Mutable per-client session record
#[derive(Debug)]
pub struct Session {
    pub state: SessionState,
    /// Set by a successful link handshake or ceremony; cleared on close and
    /// on ceremony failure
    pub authenticated: bool,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            authenticated: false,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Candidates received before the remote description is known
///
/// Candidates accumulate in arrival order and are drained exactly once,
/// immediately after the remote description is set; afterwards candidates
/// are applied directly. The queue is bounded; overflow drops the newest
/// arrival rather than growing without limit.
#[derive(Debug)]
pub struct CandidateBuffer {
    queued: VecDeque<IceCandidate>,
    flushed: bool,
}

impl CandidateBuffer {
    pub const CAPACITY: usize = 64;

    #[must_use]
    pub fn new() -> Self {
        Self {
            queued: VecDeque::new(),
            flushed: false,
        }
    }

    /// Whether the one-time flush has happened; candidates arriving after
    /// that are applied directly
    #[must_use]
    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Queue a candidate; returns `false` when the buffer is full and the
    /// candidate was dropped
    pub fn push(&mut self, candidate: IceCandidate) -> bool {
        if self.queued.len() >= Self::CAPACITY {
            return false;
        }
        self.queued.push_back(candidate);
        true
    }

    /// Take every queued candidate in arrival order and mark the buffer
    /// flushed
    pub fn drain(&mut self) -> Vec<IceCandidate> {
        self.flushed = true;
        self.queued.drain(..).collect()
    }
}

impl Default for CandidateBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(n: u16) -> IceCandidate {
        IceCandidate {
            candidate: format!("candidate:{n}"),
            sdp_mid: None,
            sdp_mline_index: Some(n),
            username_fragment: None,
        }
    }

    #[test]
    fn test_pending_states() {
        assert!(!SessionState::Idle.is_pending());
        assert!(!SessionState::Connected.is_pending());
        assert!(!SessionState::Closed.is_pending());
        assert!(SessionState::Linking {
            request_id: "id".to_string()
        }
        .is_pending());
        assert!(SessionState::Exchanging {
            role: ExchangeRole::Offerer
        }
        .is_pending());
    }

    #[test]
    fn test_request_id_only_while_linking() {
        let linking = SessionState::Linking {
            request_id: "0191-a".to_string(),
        };
        assert_eq!(linking.request_id(), Some("0191-a"));
        assert_eq!(SessionState::Idle.request_id(), None);
        assert_eq!(SessionState::Connected.request_id(), None);
    }

    #[test]
    fn test_buffer_drains_in_arrival_order_once() {
        let mut buffer = CandidateBuffer::new();
        assert!(!buffer.is_flushed());
        assert!(buffer.push(candidate(1)));
        assert!(buffer.push(candidate(2)));
        assert!(buffer.push(candidate(3)));

        let drained = buffer.drain();
        assert_eq!(drained, vec![candidate(1), candidate(2), candidate(3)]);
        assert!(buffer.is_flushed());
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn test_buffer_is_bounded() {
        let mut buffer = CandidateBuffer::new();
        for n in 0..CandidateBuffer::CAPACITY {
            assert!(buffer.push(candidate(u16::try_from(n).unwrap())));
        }
        assert!(!buffer.push(candidate(9999)));
        assert_eq!(buffer.drain().len(), CandidateBuffer::CAPACITY);
    }
}

//! Signaling client and peer-link state machine
//!
//! One client manages at most one linking session at a time: link-request
//! correlation, offer/answer exchange, ICE candidate exchange with buffering
//! for out-of-order arrival, and data-channel establishment. Observers watch
//! a broadcast notification channel that is decoupled from session state.
//!
//! There is no timeout primitive here: a caller that never receives a remote
//! description or link acknowledgment suspends indefinitely, and `close`
//! does not reject in-flight waits. Callers wrap `link`/`peer`/`signal` in
//! their own timeouts when bounded waiting is required.

use std::sync::Arc;

use log::{debug, warn};
use serde_json::{json, Value};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::attestation::{self, AttestationCeremonyOptions, AttestationParams, ChallengeSigner};
use crate::errors::SignalError;
use crate::http::{HttpClient, ReqwestHttpClient};
use crate::signaling::peer::{DataChannel, PeerConnection, PeerConnectionFactory};
use crate::signaling::session::{CandidateBuffer, Session, SessionState};
use crate::signaling::transport::SignalTransport;
use crate::signaling::types::{
    Direction, ExchangeRole, IceCandidate, LinkMessage, RtcConfiguration, SdpType,
    SessionDescription, SignalEvent,
};
use crate::assertion::{self, AssertionParams};
use crate::webauthn::CredentialProvider;

/// Label of the single data channel negotiated per linking session
pub const CHANNEL_LABEL: &str = "liquid";

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Build the deep-link URI for a linking request
///
/// # Errors
///
/// Returns [`SignalError::OriginIsMissing`] on an empty origin and
/// [`SignalError::RequestIsMissing`] on an empty request id
pub fn generate_deep_link(origin: &str, request_id: &str) -> Result<String, SignalError> {
    if origin.is_empty() {
        return Err(SignalError::OriginIsMissing);
    }
    if request_id.is_empty() {
        return Err(SignalError::RequestIsMissing);
    }
    let host = origin.strip_prefix("https://").unwrap_or(origin);
    Ok(format!(
        "liquid://{host}/?requestId={}",
        urlencoding::encode(request_id)
    ))
}

/// Client for the signaling relay and its linking sessions
pub struct SignalClient {
    origin: String,
    transport: Arc<dyn SignalTransport>,
    factory: Arc<dyn PeerConnectionFactory>,
    http: Arc<dyn HttpClient>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    session: Arc<Mutex<Session>>,
    peer_connection: Mutex<Option<Arc<dyn PeerConnection>>>,
    events: broadcast::Sender<SignalEvent>,
    pumps: Mutex<Vec<JoinHandle<()>>>,
}

impl SignalClient {
    /// Create a client for the given service origin
    pub fn new(
        origin: impl Into<String>,
        transport: Arc<dyn SignalTransport>,
        factory: Arc<dyn PeerConnectionFactory>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            origin: origin.into(),
            transport,
            factory,
            http: Arc::new(ReqwestHttpClient::new()),
            credentials: None,
            session: Arc::new(Mutex::new(Session::new())),
            peer_connection: Mutex::new(None),
            events,
            pumps: Mutex::new(Vec::new()),
        }
    }

    /// Replace the HTTP client used for ceremonies
    #[must_use]
    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = http;
        self
    }

    /// Attach a native credential provider for ceremonies
    #[must_use]
    pub fn with_credential_provider(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    /// Generate a time-ordered, single-use request id
    #[must_use]
    pub fn generate_request_id() -> String {
        Uuid::now_v7().to_string()
    }

    /// Watch client notifications
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SignalEvent> {
        self.events.subscribe()
    }

    /// Whether a link handshake or ceremony has authenticated this session
    pub async fn is_authenticated(&self) -> bool {
        self.session.lock().await.authenticated
    }

    /// Build the deep-link URI, using the pending request id when none is
    /// given
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::RequestIsMissing`] when no id is given and
    /// none is pending
    pub async fn deep_link(&self, request_id: Option<&str>) -> Result<String, SignalError> {
        match request_id {
            Some(id) => generate_deep_link(&self.origin, id),
            None => {
                let session = self.session.lock().await;
                let id = session
                    .state
                    .request_id()
                    .ok_or(SignalError::RequestIsMissing)?;
                generate_deep_link(&self.origin, id)
            }
        }
    }

    /// Deep-link payload for QR rendering
    ///
    /// Rendering itself is left to the embedder; this returns the string a
    /// QR image should carry for the pending session.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::RequestIsMissing`] when no request is pending
    pub async fn qr_code_data(&self) -> Result<String, SignalError> {
        self.deep_link(None).await
    }

    /// Perform the link handshake for a request id
    ///
    /// Stores the id, emits a `link` event, and suspends until the relay
    /// delivers the correlated acknowledgment. On receipt the session is
    /// marked authenticated and the id is cleared.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::RequestInProcess`] while another session is
    /// pending, and transport failures otherwise
    pub async fn link(&self, request_id: &str) -> Result<LinkMessage, SignalError> {
        {
            let mut session = self.session.lock().await;
            if session.state.is_pending() {
                return Err(SignalError::RequestInProcess);
            }
            session.state = SessionState::Linking {
                request_id: request_id.to_string(),
            };
        }
        self.notify(SignalEvent::Link {
            request_id: request_id.to_string(),
        });

        debug!("awaiting link acknowledgment for {request_id}");
        let ack = match self
            .transport
            .request("link", json!({ "requestId": request_id }))
            .await
        {
            Ok(ack) => ack,
            Err(err) => {
                self.session.lock().await.state = SessionState::Idle;
                return Err(err);
            }
        };

        let message = match Self::parse_link_ack(&ack) {
            Ok(message) => message,
            Err(err) => {
                self.session.lock().await.state = SessionState::Idle;
                return Err(err);
            }
        };

        {
            let mut session = self.session.lock().await;
            session.authenticated = true;
            session.state = SessionState::Idle;
        }
        self.notify(SignalEvent::LinkMessage(message.clone()));
        Ok(message)
    }

    fn parse_link_ack(ack: &Value) -> Result<LinkMessage, SignalError> {
        let data = ack
            .get("data")
            .ok_or_else(|| SignalError::Transport("link acknowledgment without data".to_string()))?;
        serde_json::from_value(data.clone())
            .map_err(|err| SignalError::Transport(format!("malformed link message: {err}")))
    }

    /// Wait for one remote description of the given type
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Unauthenticated`] unless a link handshake or
    /// ceremony completed first
    pub async fn signal(&self, sdp_type: SdpType) -> Result<SessionDescription, SignalError> {
        if !self.session.lock().await.authenticated {
            return Err(SignalError::Unauthenticated);
        }
        self.notify(SignalEvent::Signal { sdp_type });

        let event = format!("{}-description", sdp_type.as_str());
        let value = self.transport.once(&event).await?;
        let sdp = value
            .as_str()
            .ok_or_else(|| SignalError::Transport("description event without an SDP".to_string()))?;

        let description = SessionDescription {
            sdp_type,
            sdp: sdp.to_string(),
        };
        self.notify(SignalEvent::Description(description.clone()));
        Ok(description)
    }

    /// Establish the peer link for a session and resolve its data channel
    ///
    /// `direction` names the remote description type this session waits for:
    /// `Offer` performs the link handshake, waits for the remote offer, and
    /// answers it; `Answer` opens the data channel, emits an offer, and
    /// waits for the remote answer (requiring prior authentication, enforced
    /// inside [`SignalClient::signal`]).
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::RequestInProcess`] while another session is
    /// pending, [`SignalError::RequestIsMissing`] without a request id, and
    /// transport or engine failures otherwise
    pub async fn peer(
        &self,
        request_id: Option<&str>,
        direction: Direction,
    ) -> Result<Arc<dyn DataChannel>, SignalError> {
        self.peer_with_config(request_id, direction, RtcConfiguration::default())
            .await
    }

    /// [`SignalClient::peer`] with an explicit peer-connection configuration
    ///
    /// # Errors
    ///
    /// See [`SignalClient::peer`]
    pub async fn peer_with_config(
        &self,
        request_id: Option<&str>,
        direction: Direction,
        config: RtcConfiguration,
    ) -> Result<Arc<dyn DataChannel>, SignalError> {
        if self.session.lock().await.state.is_pending() {
            return Err(SignalError::RequestInProcess);
        }
        let request_id = request_id.ok_or(SignalError::RequestIsMissing)?;

        let peer = self.factory.create_connection(&config).await?;
        *self.peer_connection.lock().await = Some(peer.clone());

        let local_role = direction.local_role();

        // Engine streams must be watched before any negotiation happens.
        let channel_rx = peer.remote_data_channels();
        let local_candidates = peer.local_candidates();

        // The offer direction waits for a remote party to join; the answer
        // direction proceeds on an already-authenticated session.
        if direction == Direction::Offer {
            self.link(request_id).await?;
        }

        {
            let mut session = self.session.lock().await;
            if session.state.is_pending() {
                return Err(SignalError::RequestInProcess);
            }
            session.state = SessionState::Exchanging { role: local_role };
        }

        let buffer = Arc::new(Mutex::new(CandidateBuffer::new()));
        self.spawn_local_candidate_pump(local_role, local_candidates)
            .await;
        if let Err(err) = self
            .spawn_remote_candidate_pump(direction.remote_role(), &peer, &buffer)
            .await
        {
            self.session.lock().await.state = SessionState::Idle;
            return Err(err);
        }

        let result = self
            .exchange_descriptions(&peer, direction, channel_rx, &buffer)
            .await;

        let mut session = self.session.lock().await;
        match result {
            Ok(channel) => {
                session.state = SessionState::Connected;
                drop(session);
                self.notify(SignalEvent::DataChannel {
                    label: channel.label(),
                });
                Ok(channel)
            }
            Err(err) => {
                session.state = SessionState::Idle;
                Err(err)
            }
        }
    }

    async fn exchange_descriptions(
        &self,
        peer: &Arc<dyn PeerConnection>,
        direction: Direction,
        mut channel_rx: broadcast::Receiver<Arc<dyn DataChannel>>,
        buffer: &Arc<Mutex<CandidateBuffer>>,
    ) -> Result<Arc<dyn DataChannel>, SignalError> {
        let local_role = direction.local_role();
        match direction {
            Direction::Offer => {
                let remote = self.signal(SdpType::Offer).await?;
                peer.set_remote_description(remote).await?;
                let answer = peer.create_answer().await?;
                peer.set_local_description(answer.clone()).await?;
                self.flush_candidates(peer, buffer, direction.remote_role())
                    .await;

                self.notify(SignalEvent::Description(answer.clone()));
                self.transport
                    .emit(
                        &local_role.description_event(),
                        Value::String(answer.sdp),
                    )
                    .await?;

                // Resolution waits for the channel the remote side opened.
                channel_rx.recv().await.map_err(|_| {
                    SignalError::Peer("connection closed before a data channel opened".to_string())
                })
            }
            Direction::Answer => {
                let channel = peer.create_data_channel(CHANNEL_LABEL).await?;
                let offer = peer.create_offer().await?;
                peer.set_local_description(offer.clone()).await?;

                self.notify(SignalEvent::Description(offer.clone()));
                self.transport
                    .emit(&local_role.description_event(), Value::String(offer.sdp))
                    .await?;

                let remote = self.signal(SdpType::Answer).await?;
                peer.set_remote_description(remote).await?;
                self.flush_candidates(peer, buffer, direction.remote_role())
                    .await;

                Ok(channel)
            }
        }
    }

    /// Forward locally discovered candidates to observers and the relay
    async fn spawn_local_candidate_pump(
        &self,
        local_role: ExchangeRole,
        mut candidates: broadcast::Receiver<IceCandidate>,
    ) {
        let transport = self.transport.clone();
        let events = self.events.clone();
        let event = local_role.candidate_event();
        let pump = tokio::spawn(async move {
            while let Ok(candidate) = candidates.recv().await {
                let _ = events.send(SignalEvent::Candidate {
                    role: local_role,
                    candidate: candidate.clone(),
                });
                let payload = match serde_json::to_value(&candidate) {
                    Ok(payload) => payload,
                    Err(_) => continue,
                };
                if let Err(err) = transport.emit(&event, payload).await {
                    warn!("failed to forward local candidate: {err}");
                }
            }
        });
        self.pumps.lock().await.push(pump);
    }

    /// Apply remote candidates, buffering until the remote description is in
    /// place
    async fn spawn_remote_candidate_pump(
        &self,
        remote_role: ExchangeRole,
        peer: &Arc<dyn PeerConnection>,
        buffer: &Arc<Mutex<CandidateBuffer>>,
    ) -> Result<(), SignalError> {
        let mut incoming = self
            .transport
            .subscribe(&remote_role.candidate_event())
            .await?;
        let peer = peer.clone();
        let buffer = buffer.clone();
        let events = self.events.clone();
        let pump = tokio::spawn(async move {
            while let Some(value) = incoming.recv().await {
                let candidate: IceCandidate = match serde_json::from_value(value) {
                    Ok(candidate) => candidate,
                    Err(err) => {
                        warn!("discarding malformed remote candidate: {err}");
                        continue;
                    }
                };
                // The buffer lock is held across the apply so a candidate
                // arriving mid-flush cannot jump the queue.
                let mut buffer = buffer.lock().await;
                if buffer.is_flushed() {
                    let _ = events.send(SignalEvent::Candidate {
                        role: remote_role,
                        candidate: candidate.clone(),
                    });
                    if let Err(err) = peer.add_ice_candidate(candidate).await {
                        warn!("failed to apply remote candidate: {err}");
                    }
                } else if !buffer.push(candidate) {
                    warn!("remote candidate buffer full, dropping candidate");
                }
            }
        });
        self.pumps.lock().await.push(pump);
        Ok(())
    }

    /// Apply every buffered candidate in arrival order and clear the buffer;
    /// runs exactly once, right after the remote description is set
    async fn flush_candidates(
        &self,
        peer: &Arc<dyn PeerConnection>,
        buffer: &Arc<Mutex<CandidateBuffer>>,
        remote_role: ExchangeRole,
    ) {
        let mut buffer = buffer.lock().await;
        for candidate in buffer.drain() {
            let _ = self.events.send(SignalEvent::Candidate {
                role: remote_role,
                candidate: candidate.clone(),
            });
            if let Err(err) = peer.add_ice_candidate(candidate).await {
                warn!("failed to apply buffered candidate: {err}");
            }
        }
    }

    /// Register a new credential, marking the session authenticated on
    /// success
    ///
    /// # Errors
    ///
    /// Resets `authenticated` and rethrows the ceremony error on failure
    pub async fn attestation(
        &self,
        signer: &dyn ChallengeSigner,
        options: AttestationCeremonyOptions,
    ) -> Result<Value, SignalError> {
        let result = attestation::attestation(
            self.http.as_ref(),
            self.credentials.as_deref(),
            signer,
            AttestationParams {
                origin: &self.origin,
                options,
            },
        )
        .await;

        let mut session = self.session.lock().await;
        match result {
            Ok(response) => {
                session.authenticated = true;
                Ok(response)
            }
            Err(err) => {
                session.authenticated = false;
                Err(err.into())
            }
        }
    }

    /// Assert a known credential, marking the session authenticated on
    /// success
    ///
    /// # Errors
    ///
    /// Resets `authenticated` and rethrows the ceremony error on failure
    pub async fn assertion(&self, cred_id: &str) -> Result<Option<Value>, SignalError> {
        let result = assertion::assertion(
            self.http.as_ref(),
            self.credentials.as_deref(),
            AssertionParams {
                origin: &self.origin,
                cred_id,
                options: None,
            },
        )
        .await;

        let mut session = self.session.lock().await;
        match result {
            Ok(response) => {
                session.authenticated = true;
                Ok(response)
            }
            Err(err) => {
                session.authenticated = false;
                Err(err.into())
            }
        }
    }

    /// Tear the session down
    ///
    /// Removes transport listeners, stops the candidate pumps, clears any
    /// pending request id, marks the session unauthenticated, and optionally
    /// disconnects the transport. Idempotent; does not reject in-flight
    /// waits.
    pub async fn close(&self, disconnect: bool) {
        self.transport.remove_all_listeners().await;
        for pump in self.pumps.lock().await.drain(..) {
            pump.abort();
        }
        {
            let mut session = self.session.lock().await;
            session.state = SessionState::Closed;
            session.authenticated = false;
        }
        if let Some(peer) = self.peer_connection.lock().await.take() {
            peer.close().await;
        }
        if disconnect {
            self.transport.disconnect().await;
        }
        self.notify(SignalEvent::Close);
    }

    fn notify(&self, event: SignalEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_deep_link_is_deterministic() {
        assert_eq!(
            generate_deep_link("https://host", "abc123").unwrap(),
            "liquid://host/?requestId=abc123"
        );
    }

    #[test]
    fn test_generate_deep_link_strips_only_https_scheme() {
        assert_eq!(
            generate_deep_link("example.com", "abc").unwrap(),
            "liquid://example.com/?requestId=abc"
        );
    }

    #[test]
    fn test_generate_deep_link_guards() {
        assert!(matches!(
            generate_deep_link("", "abc123"),
            Err(SignalError::OriginIsMissing)
        ));
        assert!(matches!(
            generate_deep_link("https://host", ""),
            Err(SignalError::RequestIsMissing)
        ));
    }

    #[test]
    fn test_generate_request_id_is_time_ordered() {
        let first = SignalClient::generate_request_id();
        let second = SignalClient::generate_request_id();
        assert_eq!(first.len(), 36);
        assert_ne!(first, second);
        // The leading characters carry the timestamp, so later ids never
        // sort before earlier ones.
        assert!(first[..13] <= second[..13]);
    }
}

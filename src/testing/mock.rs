//! Mock objects and fake implementations for testing
//!
//! The mock transport delivers events in-process and keeps undelivered
//! events queued per name, so late listeners still observe them and test
//! orchestration stays deterministic. The mock peer network pairs the first
//! two connections it creates and moves data-channel ends and messages
//! between them in memory.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};

use crate::attestation::{ChallengeSigner, LiquidExtension};
use crate::errors::{CeremonyError, SignalError};
use crate::signaling::{
    DataChannel, IceCandidate, PeerConnection, PeerConnectionFactory, RtcConfiguration, SdpType,
    SessionDescription, SignalTransport,
};
use crate::webauthn::{
    CredentialCreationOptions, CredentialProvider, CredentialRequestOptions, PublicKeyCredential,
};

const STREAM_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Signaling transport
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TransportInner {
    once: HashMap<String, Vec<oneshot::Sender<Value>>>,
    subscribers: HashMap<String, Vec<mpsc::Sender<Value>>>,
    queued: HashMap<String, VecDeque<Value>>,
    emitted: Vec<(String, Value)>,
    emit_waiters: HashMap<String, Vec<oneshot::Sender<Value>>>,
    scripted_acks: HashMap<String, Value>,
    pending_acks: HashMap<String, Vec<oneshot::Sender<Value>>>,
    requests: Vec<(String, Value)>,
    peer: Option<Weak<MockSignalTransport>>,
    connected: bool,
}

/// In-process [`SignalTransport`]
pub struct MockSignalTransport {
    inner: StdMutex<TransportInner>,
}

impl MockSignalTransport {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: StdMutex::new(TransportInner {
                connected: true,
                ..TransportInner::default()
            }),
        })
    }

    /// Two transports wired back-to-back: events emitted on one are
    /// delivered on the other
    #[must_use]
    pub fn pair() -> (Arc<Self>, Arc<Self>) {
        let a = Self::new();
        let b = Self::new();
        a.inner.lock().unwrap().peer = Some(Arc::downgrade(&b));
        b.inner.lock().unwrap().peer = Some(Arc::downgrade(&a));
        (a, b)
    }

    /// Deliver an event to this transport's listeners (or queue it until one
    /// appears)
    pub fn deliver(&self, event: &str, payload: Value) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(listeners) = inner.once.get_mut(event) {
            if let Some(listener) = listeners.pop() {
                let _ = listener.send(payload);
                return;
            }
        }
        let mut handled = false;
        if let Some(subscribers) = inner.subscribers.get_mut(event) {
            subscribers.retain(|subscriber| !subscriber.is_closed());
            for subscriber in subscribers.iter() {
                handled = subscriber.try_send(payload.clone()).is_ok() || handled;
            }
        }
        if !handled {
            inner
                .queued
                .entry(event.to_string())
                .or_default()
                .push_back(payload);
        }
    }

    /// Script the acknowledgment returned for a `request` on this event
    pub fn set_ack(&self, event: &str, payload: Value) {
        self.inner
            .lock()
            .unwrap()
            .scripted_acks
            .insert(event.to_string(), payload);
    }

    /// Resolve one outstanding `request` on this event
    pub fn acknowledge(&self, event: &str, payload: Value) {
        let sender = {
            let mut inner = self.inner.lock().unwrap();
            inner
                .pending_acks
                .get_mut(event)
                .and_then(|pending| (!pending.is_empty()).then(|| pending.remove(0)))
        };
        if let Some(sender) = sender {
            let _ = sender.send(payload);
        }
    }

    /// Every event emitted through this transport, in order
    #[must_use]
    pub fn emitted(&self) -> Vec<(String, Value)> {
        self.inner.lock().unwrap().emitted.clone()
    }

    /// Every request payload sent through this transport, in order
    #[must_use]
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// Suspend until this transport emits the named event; returns the
    /// payload (immediately when it was already emitted)
    pub async fn wait_for_emitted(&self, event: &str) -> Value {
        let receiver = {
            let mut inner = self.inner.lock().unwrap();
            if let Some((_, payload)) = inner
                .emitted
                .iter()
                .find(|(name, _)| name == event)
            {
                return payload.clone();
            }
            let (tx, rx) = oneshot::channel();
            inner
                .emit_waiters
                .entry(event.to_string())
                .or_default()
                .push(tx);
            rx
        };
        receiver.await.unwrap_or(Value::Null)
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.lock().unwrap().connected
    }

    fn record_emit(&self, event: &str, payload: &Value) -> Option<Arc<MockSignalTransport>> {
        let mut inner = self.inner.lock().unwrap();
        inner.emitted.push((event.to_string(), payload.clone()));
        if let Some(waiters) = inner.emit_waiters.remove(event) {
            for waiter in waiters {
                let _ = waiter.send(payload.clone());
            }
        }
        inner.peer.as_ref().and_then(Weak::upgrade)
    }
}

#[async_trait]
impl SignalTransport for MockSignalTransport {
    async fn emit(&self, event: &str, payload: Value) -> Result<(), SignalError> {
        if let Some(peer) = self.record_emit(event, &payload) {
            peer.deliver(event, payload);
        }
        Ok(())
    }

    async fn request(&self, event: &str, payload: Value) -> Result<Value, SignalError> {
        let receiver = {
            let mut inner = self.inner.lock().unwrap();
            inner.requests.push((event.to_string(), payload));
            if let Some(ack) = inner.scripted_acks.get(event) {
                return Ok(ack.clone());
            }
            let (tx, rx) = oneshot::channel();
            inner
                .pending_acks
                .entry(event.to_string())
                .or_default()
                .push(tx);
            rx
        };
        receiver
            .await
            .map_err(|_| SignalError::Transport("socket closed before acknowledgment".to_string()))
    }

    async fn once(&self, event: &str) -> Result<Value, SignalError> {
        let receiver = {
            let mut inner = self.inner.lock().unwrap();
            if let Some(queued) = inner.queued.get_mut(event) {
                if let Some(payload) = queued.pop_front() {
                    return Ok(payload);
                }
            }
            let (tx, rx) = oneshot::channel();
            inner.once.entry(event.to_string()).or_default().push(tx);
            rx
        };
        receiver
            .await
            .map_err(|_| SignalError::Transport("socket closed before event".to_string()))
    }

    async fn subscribe(&self, event: &str) -> Result<mpsc::Receiver<Value>, SignalError> {
        let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
        let mut inner = self.inner.lock().unwrap();
        if let Some(queued) = inner.queued.get_mut(event) {
            while let Some(payload) = queued.pop_front() {
                if tx.try_send(payload).is_err() {
                    break;
                }
            }
        }
        inner
            .subscribers
            .entry(event.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }

    async fn remove_all_listeners(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.once.clear();
        inner.subscribers.clear();
    }

    async fn disconnect(&self) {
        self.inner.lock().unwrap().connected = false;
    }
}

// ---------------------------------------------------------------------------
// Peer network
// ---------------------------------------------------------------------------

#[derive(Default)]
struct NetworkCore {
    connections: StdMutex<Vec<Arc<MockPeerConnection>>>,
    /// Channel ends waiting for their destination to hold a remote
    /// description, keyed by destination connection index
    pending_channels: StdMutex<HashMap<usize, Vec<Arc<MockDataChannel>>>>,
}

/// In-memory peer "network" whose first two connections are linked
///
/// Implements [`PeerConnectionFactory`]; channel ends created on one
/// connection surface on its partner once the partner holds a remote
/// description, mirroring how an engine raises remote channels after
/// negotiation.
#[derive(Clone, Default)]
pub struct MockRtcNetwork {
    core: Arc<NetworkCore>,
}

impl MockRtcNetwork {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connection created by the n-th `create_connection` call
    ///
    /// # Panics
    ///
    /// Panics when fewer than `index + 1` connections exist
    #[must_use]
    pub fn connection(&self, index: usize) -> Arc<MockPeerConnection> {
        self.core.connections.lock().unwrap()[index].clone()
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.core.connections.lock().unwrap().len()
    }

    fn partner_of(&self, index: usize) -> Option<Arc<MockPeerConnection>> {
        let partner = if index % 2 == 0 { index + 1 } else { index - 1 };
        self.core.connections.lock().unwrap().get(partner).cloned()
    }

    fn register_channel(&self, from_index: usize, remote_end: Arc<MockDataChannel>) {
        let destination = if from_index % 2 == 0 {
            from_index + 1
        } else {
            from_index - 1
        };
        if let Some(partner) = self.partner_of(from_index) {
            if partner.remote_description().is_some() {
                partner.surface_remote_channel(remote_end);
                return;
            }
        }
        self.core
            .pending_channels
            .lock()
            .unwrap()
            .entry(destination)
            .or_default()
            .push(remote_end);
    }

    fn deliver_pending(&self, destination: usize) {
        let pending = self
            .core
            .pending_channels
            .lock()
            .unwrap()
            .remove(&destination)
            .unwrap_or_default();
        if pending.is_empty() {
            return;
        }
        let connection = self.connection(destination);
        for channel in pending {
            connection.surface_remote_channel(channel);
        }
    }
}

#[async_trait]
impl PeerConnectionFactory for MockRtcNetwork {
    async fn create_connection(
        &self,
        _config: &RtcConfiguration,
    ) -> Result<Arc<dyn PeerConnection>, SignalError> {
        let mut connections = self.core.connections.lock().unwrap();
        let index = connections.len();
        let connection = Arc::new(MockPeerConnection::new(index, self.clone()));
        connections.push(connection.clone());
        Ok(connection)
    }
}

struct PeerState {
    local_description: Option<SessionDescription>,
    remote_description: Option<SessionDescription>,
    operations: Vec<String>,
}

/// Scriptable, recording [`PeerConnection`]
pub struct MockPeerConnection {
    index: usize,
    network: MockRtcNetwork,
    state: StdMutex<PeerState>,
    candidate_tx: broadcast::Sender<IceCandidate>,
    channel_tx: broadcast::Sender<Arc<dyn DataChannel>>,
    /// Synthetic candidates emitted after the local description is set
    local_candidate_count: usize,
}

impl MockPeerConnection {
    fn new(index: usize, network: MockRtcNetwork) -> Self {
        let (candidate_tx, _) = broadcast::channel(STREAM_CAPACITY);
        let (channel_tx, _) = broadcast::channel(8);
        Self {
            index,
            network,
            state: StdMutex::new(PeerState {
                local_description: None,
                remote_description: None,
                operations: Vec::new(),
            }),
            candidate_tx,
            channel_tx,
            local_candidate_count: 2,
        }
    }

    /// Operations applied to this connection, in call order
    #[must_use]
    pub fn operations(&self) -> Vec<String> {
        self.state.lock().unwrap().operations.clone()
    }

    #[must_use]
    pub fn local_description(&self) -> Option<SessionDescription> {
        self.state.lock().unwrap().local_description.clone()
    }

    #[must_use]
    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.state.lock().unwrap().remote_description.clone()
    }

    /// Hand a remote-opened channel to subscribers (what an engine does when
    /// the other side created a channel)
    pub fn surface_remote_channel(&self, channel: Arc<MockDataChannel>) {
        let channel: Arc<dyn DataChannel> = channel;
        let _ = self.channel_tx.send(channel);
    }

    fn record(&self, operation: String) {
        self.state.lock().unwrap().operations.push(operation);
    }
}

#[async_trait]
impl PeerConnection for MockPeerConnection {
    async fn create_offer(&self) -> Result<SessionDescription, SignalError> {
        self.record("create_offer".to_string());
        Ok(SessionDescription {
            sdp_type: SdpType::Offer,
            sdp: format!("offer-sdp-{}", self.index),
        })
    }

    async fn create_answer(&self) -> Result<SessionDescription, SignalError> {
        self.record("create_answer".to_string());
        Ok(SessionDescription {
            sdp_type: SdpType::Answer,
            sdp: format!("answer-sdp-{}", self.index),
        })
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), SignalError> {
        self.record(format!("set_local:{}", description.sdp_type.as_str()));
        self.state.lock().unwrap().local_description = Some(description);
        // Candidate gathering starts once the local description is in place.
        for n in 0..self.local_candidate_count {
            let _ = self.candidate_tx.send(IceCandidate {
                candidate: format!("candidate:mock-{}-{n}", self.index),
                sdp_mid: Some("0".to_string()),
                sdp_mline_index: Some(0),
                username_fragment: None,
            });
        }
        Ok(())
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), SignalError> {
        self.record(format!("set_remote:{}", description.sdp_type.as_str()));
        self.state.lock().unwrap().remote_description = Some(description);
        self.network.deliver_pending(self.index);
        Ok(())
    }

    async fn has_remote_description(&self) -> bool {
        self.state.lock().unwrap().remote_description.is_some()
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), SignalError> {
        if self.state.lock().unwrap().remote_description.is_none() {
            return Err(SignalError::Peer(
                "candidate applied before remote description".to_string(),
            ));
        }
        self.record(format!("add_candidate:{}", candidate.candidate));
        Ok(())
    }

    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn DataChannel>, SignalError> {
        self.record(format!("create_data_channel:{label}"));
        let (local_end, remote_end) = MockDataChannel::pair(label);
        self.network.register_channel(self.index, remote_end);
        Ok(local_end)
    }

    fn local_candidates(&self) -> broadcast::Receiver<IceCandidate> {
        self.candidate_tx.subscribe()
    }

    fn remote_data_channels(&self) -> broadcast::Receiver<Arc<dyn DataChannel>> {
        self.channel_tx.subscribe()
    }

    async fn close(&self) {
        self.record("close".to_string());
    }
}

/// One end of an in-memory data channel pair
pub struct MockDataChannel {
    label: String,
    outgoing: mpsc::Sender<Vec<u8>>,
    incoming: Mutex<mpsc::Receiver<Vec<u8>>>,
    closed: AtomicBool,
}

impl MockDataChannel {
    /// Two channel ends wired back-to-back
    #[must_use]
    pub fn pair(label: &str) -> (Arc<Self>, Arc<Self>) {
        let (a_to_b_tx, a_to_b_rx) = mpsc::channel(STREAM_CAPACITY);
        let (b_to_a_tx, b_to_a_rx) = mpsc::channel(STREAM_CAPACITY);
        let a = Arc::new(Self {
            label: label.to_string(),
            outgoing: a_to_b_tx,
            incoming: Mutex::new(b_to_a_rx),
            closed: AtomicBool::new(false),
        });
        let b = Arc::new(Self {
            label: label.to_string(),
            outgoing: b_to_a_tx,
            incoming: Mutex::new(a_to_b_rx),
            closed: AtomicBool::new(false),
        });
        (a, b)
    }
}

#[async_trait]
impl DataChannel for MockDataChannel {
    fn label(&self) -> String {
        self.label.clone()
    }

    async fn send(&self, data: &[u8]) -> Result<(), SignalError> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(SignalError::Peer("data channel closed".to_string()));
        }
        self.outgoing
            .send(data.to_vec())
            .await
            .map_err(|_| SignalError::Peer("data channel peer gone".to_string()))
    }

    async fn recv(&self) -> Option<Vec<u8>> {
        self.incoming.lock().await.recv().await
    }

    async fn close(&self) -> Result<(), SignalError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Credential provider and challenge signer
// ---------------------------------------------------------------------------

/// Scriptable [`CredentialProvider`] that records every invocation
#[derive(Default)]
pub struct MockCredentialProvider {
    credential: StdMutex<Option<PublicKeyCredential>>,
    get_calls: AtomicUsize,
    create_calls: AtomicUsize,
    last_request: StdMutex<Option<CredentialRequestOptions>>,
    last_creation: StdMutex<Option<CredentialCreationOptions>>,
}

impl MockCredentialProvider {
    /// Provider returning the given credential from both operations
    #[must_use]
    pub fn returning(credential: PublicKeyCredential) -> Self {
        Self {
            credential: StdMutex::new(Some(credential)),
            ..Self::default()
        }
    }

    /// Provider that completes without producing a credential
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn last_request(&self) -> Option<CredentialRequestOptions> {
        self.last_request.lock().unwrap().clone()
    }

    #[must_use]
    pub fn last_creation(&self) -> Option<CredentialCreationOptions> {
        self.last_creation.lock().unwrap().clone()
    }
}

#[async_trait]
impl CredentialProvider for MockCredentialProvider {
    async fn get_credential(
        &self,
        options: CredentialRequestOptions,
    ) -> Result<Option<PublicKeyCredential>, CeremonyError> {
        self.get_calls.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap() = Some(options);
        Ok(self.credential.lock().unwrap().clone())
    }

    async fn create_credential(
        &self,
        options: CredentialCreationOptions,
    ) -> Result<Option<PublicKeyCredential>, CeremonyError> {
        self.create_calls.fetch_add(1, Ordering::Relaxed);
        *self.last_creation.lock().unwrap() = Some(options);
        Ok(self.credential.lock().unwrap().clone())
    }
}

/// [`ChallengeSigner`] answering with a fixed extension result
pub struct StaticChallengeSigner {
    extension: LiquidExtension,
    challenges: StdMutex<Vec<Vec<u8>>>,
}

impl StaticChallengeSigner {
    #[must_use]
    pub fn new(extension: LiquidExtension) -> Self {
        Self {
            extension,
            challenges: StdMutex::new(Vec::new()),
        }
    }

    /// Challenges handed to the signer, in order
    #[must_use]
    pub fn challenges(&self) -> Vec<Vec<u8>> {
        self.challenges.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChallengeSigner for StaticChallengeSigner {
    async fn sign_challenge(&self, challenge: Vec<u8>) -> Result<LiquidExtension, CeremonyError> {
        self.challenges.lock().unwrap().push(challenge);
        Ok(self.extension.clone())
    }
}

//! Peer connection capabilities backed by the `webrtc` crate
//!
//! Bridges the engine's callback surfaces onto the channel subscriptions the
//! session pumps expect. Available with the `native-rtc` feature.

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{broadcast, mpsc, Mutex};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;

use crate::errors::SignalError;
use crate::signaling::peer::{DataChannel, PeerConnection, PeerConnectionFactory};
use crate::signaling::types::{IceCandidate, RtcConfiguration, SdpType, SessionDescription};

const CANDIDATE_CHANNEL_CAPACITY: usize = 64;
const DATA_CHANNEL_CAPACITY: usize = 8;
const MESSAGE_CHANNEL_CAPACITY: usize = 64;

fn peer_err(err: impl Display) -> SignalError {
    SignalError::Peer(err.to_string())
}

/// [`PeerConnectionFactory`] producing `webrtc`-crate connections
#[derive(Debug, Clone, Copy, Default)]
pub struct NativePeerConnectionFactory;

impl NativePeerConnectionFactory {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PeerConnectionFactory for NativePeerConnectionFactory {
    async fn create_connection(
        &self,
        config: &RtcConfiguration,
    ) -> Result<Arc<dyn PeerConnection>, SignalError> {
        let mut media = MediaEngine::default();
        media.register_default_codecs().map_err(peer_err)?;
        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media).map_err(peer_err)?;
        let api = APIBuilder::new()
            .with_media_engine(media)
            .with_interceptor_registry(registry)
            .build();

        let ice_servers = config
            .ice_servers
            .iter()
            .map(|server| RTCIceServer {
                urls: server.urls.clone(),
                ..Default::default()
            })
            .collect();
        let rtc_config = RTCConfiguration {
            ice_servers,
            ice_candidate_pool_size: config.ice_candidate_pool_size,
            ..Default::default()
        };

        let connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .map_err(peer_err)?,
        );

        let (candidate_tx, _) = broadcast::channel(CANDIDATE_CHANNEL_CAPACITY);
        let (channel_tx, _) = broadcast::channel(DATA_CHANNEL_CAPACITY);

        let tx = candidate_tx.clone();
        connection.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let tx = tx.clone();
            Box::pin(async move {
                if let Some(candidate) = candidate {
                    if let Ok(init) = candidate.to_json() {
                        let _ = tx.send(IceCandidate {
                            candidate: init.candidate,
                            sdp_mid: init.sdp_mid,
                            sdp_mline_index: init.sdp_mline_index,
                            username_fragment: init.username_fragment,
                        });
                    }
                }
            })
        }));

        let tx = channel_tx.clone();
        connection.on_data_channel(Box::new(move |channel: Arc<RTCDataChannel>| {
            let tx = tx.clone();
            Box::pin(async move {
                let channel: Arc<dyn DataChannel> = Arc::new(NativeDataChannel::new(channel));
                let _ = tx.send(channel);
            })
        }));

        Ok(Arc::new(NativePeerConnection {
            connection,
            candidate_tx,
            channel_tx,
        }))
    }
}

struct NativePeerConnection {
    connection: Arc<RTCPeerConnection>,
    candidate_tx: broadcast::Sender<IceCandidate>,
    channel_tx: broadcast::Sender<Arc<dyn DataChannel>>,
}

fn to_engine_description(
    description: SessionDescription,
) -> Result<RTCSessionDescription, SignalError> {
    match description.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(description.sdp),
        SdpType::Answer => RTCSessionDescription::answer(description.sdp),
    }
    .map_err(peer_err)
}

#[async_trait]
impl PeerConnection for NativePeerConnection {
    async fn create_offer(&self) -> Result<SessionDescription, SignalError> {
        let offer = self.connection.create_offer(None).await.map_err(peer_err)?;
        Ok(SessionDescription {
            sdp_type: SdpType::Offer,
            sdp: offer.sdp,
        })
    }

    async fn create_answer(&self) -> Result<SessionDescription, SignalError> {
        let answer = self
            .connection
            .create_answer(None)
            .await
            .map_err(peer_err)?;
        Ok(SessionDescription {
            sdp_type: SdpType::Answer,
            sdp: answer.sdp,
        })
    }

    async fn set_local_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), SignalError> {
        self.connection
            .set_local_description(to_engine_description(description)?)
            .await
            .map_err(peer_err)
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), SignalError> {
        self.connection
            .set_remote_description(to_engine_description(description)?)
            .await
            .map_err(peer_err)
    }

    async fn has_remote_description(&self) -> bool {
        self.connection.remote_description().await.is_some()
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), SignalError> {
        self.connection
            .add_ice_candidate(RTCIceCandidateInit {
                candidate: candidate.candidate,
                sdp_mid: candidate.sdp_mid,
                sdp_mline_index: candidate.sdp_mline_index,
                username_fragment: candidate.username_fragment,
            })
            .await
            .map_err(peer_err)
    }

    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn DataChannel>, SignalError> {
        let channel = self
            .connection
            .create_data_channel(label, None)
            .await
            .map_err(peer_err)?;
        Ok(Arc::new(NativeDataChannel::new(channel)))
    }

    fn local_candidates(&self) -> broadcast::Receiver<IceCandidate> {
        self.candidate_tx.subscribe()
    }

    fn remote_data_channels(&self) -> broadcast::Receiver<Arc<dyn DataChannel>> {
        self.channel_tx.subscribe()
    }

    async fn close(&self) {
        let _ = self.connection.close().await;
    }
}

struct NativeDataChannel {
    channel: Arc<RTCDataChannel>,
    incoming: Mutex<mpsc::Receiver<Vec<u8>>>,
}

impl NativeDataChannel {
    fn new(channel: Arc<RTCDataChannel>) -> Self {
        let (tx, rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
        channel.on_message(Box::new(move |message: DataChannelMessage| {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(message.data.to_vec()).await;
            })
        }));
        Self {
            channel,
            incoming: Mutex::new(rx),
        }
    }
}

#[async_trait]
impl DataChannel for NativeDataChannel {
    fn label(&self) -> String {
        self.channel.label().to_string()
    }

    async fn send(&self, data: &[u8]) -> Result<(), SignalError> {
        self.channel
            .send(&Bytes::copy_from_slice(data))
            .await
            .map(|_| ())
            .map_err(peer_err)
    }

    async fn recv(&self) -> Option<Vec<u8>> {
        self.incoming.lock().await.recv().await
    }

    async fn close(&self) -> Result<(), SignalError> {
        self.channel.close().await.map_err(peer_err)
    }
}

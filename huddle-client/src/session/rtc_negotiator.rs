use crate::session::negotiator::{LocalTrack, Negotiator, NegotiatorFactory};
use crate::session::negotiator_event::{NegotiatorEvent, NegotiatorEvents, RemoteTrack};
use crate::session::rtc_config::RtcConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use huddle_core::{SdpType, SessionDescription};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::track::track_remote::TrackRemote;

/// [`Negotiator`] backed by a native `RTCPeerConnection`.
pub struct RtcNegotiator {
    peer_connection: Arc<RTCPeerConnection>,
    config: RtcConfig,
}

impl RtcNegotiator {
    pub async fn new(config: RtcConfig, events: NegotiatorEvents) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);
        let session = events.session();

        let state_events = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let events = state_events.clone();
                Box::pin(async move {
                    info!("{} peer connection state: {}", events.session(), s);
                    // Disconnected may still recover; Failed does not.
                    if s == RTCPeerConnectionState::Failed {
                        events.emit(NegotiatorEvent::TransportFailed);
                    }
                })
            },
        ));

        let nego_events = events.clone();
        peer_connection.on_negotiation_needed(Box::new(move || {
            let events = nego_events.clone();
            Box::pin(async move {
                debug!("{} negotiation needed", events.session());
                events.emit(NegotiatorEvent::NegotiationNeeded);
            })
        }));

        let track_events = events;
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let events = track_events.clone();
                Box::pin(async move {
                    let remote = RemoteTrack {
                        stream_id: track.stream_id(),
                        track_id: track.id(),
                        kind: track.kind(),
                        track: Some(track),
                    };
                    info!(
                        "{} remote {} track '{}'",
                        events.session(),
                        remote.kind,
                        remote.track_id
                    );
                    events.emit(NegotiatorEvent::Track(remote));
                })
            },
        ));

        debug!("{} peer connection ready", session);
        Ok(Self {
            peer_connection,
            config,
        })
    }

    pub fn peer_connection(&self) -> &Arc<RTCPeerConnection> {
        &self.peer_connection
    }
}

#[async_trait]
impl Negotiator for RtcNegotiator {
    async fn create_offer(&self) -> Result<SessionDescription> {
        // A first offer made before any track is added still has to ask for media.
        if self.peer_connection.get_transceivers().await.is_empty() {
            for kind in [RTPCodecType::Audio, RTPCodecType::Video] {
                self.peer_connection
                    .add_transceiver_from_kind(
                        kind,
                        Some(RTCRtpTransceiverInit {
                            direction: RTCRtpTransceiverDirection::Recvonly,
                            send_encodings: vec![],
                        }),
                    )
                    .await?;
            }
        }

        let offer = self.peer_connection.create_offer(None).await?;
        from_rtc(offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection.create_answer(None).await?;
        from_rtc(answer)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_local_description(to_rtc(desc)?)
            .await?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_remote_description(to_rtc(desc)?)
            .await?;
        Ok(())
    }

    /// Waits for ICE gathering so the description carries every candidate.
    async fn local_description(&self) -> Result<Option<SessionDescription>> {
        let mut gathered = self.peer_connection.gathering_complete_promise().await;
        if timeout(self.config.gathering_timeout, gathered.recv())
            .await
            .is_err()
        {
            warn!(
                "ICE gathering still running after {:?}, sending partial candidates",
                self.config.gathering_timeout
            );
        }

        self.peer_connection
            .local_description()
            .await
            .map(from_rtc)
            .transpose()
    }

    async fn rollback(&self) -> Result<()> {
        let pending = self
            .peer_connection
            .pending_local_description()
            .await
            .context("no local offer to roll back")?;

        let mut desc = RTCSessionDescription::default();
        desc.sdp_type = RTCSdpType::Rollback;
        desc.sdp = pending.sdp;
        self.peer_connection.set_local_description(desc).await?;
        Ok(())
    }

    async fn add_track(&self, track: LocalTrack) -> Result<()> {
        let sender = self.peer_connection.add_track(track).await?;

        // RTCP has to be drained for the interceptors to keep working.
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while sender.read(&mut buf).await.is_ok() {}
        });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

/// Builds an [`RtcNegotiator`] per session from one shared [`RtcConfig`].
#[derive(Debug, Clone, Default)]
pub struct RtcNegotiatorFactory {
    config: RtcConfig,
}

impl RtcNegotiatorFactory {
    pub fn new(config: RtcConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl NegotiatorFactory for RtcNegotiatorFactory {
    async fn create(&self, events: NegotiatorEvents) -> Result<Box<dyn Negotiator>> {
        let negotiator = RtcNegotiator::new(self.config.clone(), events).await?;
        Ok(Box::new(negotiator))
    }
}

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription> {
    let rtc = match desc.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp)?,
        SdpType::Pranswer => RTCSessionDescription::pranswer(desc.sdp)?,
        SdpType::Rollback => {
            let mut rtc = RTCSessionDescription::default();
            rtc.sdp_type = RTCSdpType::Rollback;
            rtc.sdp = desc.sdp;
            rtc
        }
    };
    Ok(rtc)
}

fn from_rtc(desc: RTCSessionDescription) -> Result<SessionDescription> {
    let sdp_type = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        RTCSdpType::Unspecified => anyhow::bail!("description without a type"),
    };
    Ok(SessionDescription {
        sdp_type,
        sdp: desc.sdp,
    })
}

use crate::error::MediaError;
use crate::media::media_source::MediaSource;
use crate::session::LocalTrack;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Opus audio and VP8 video tracks the application feeds with encoded samples.
pub struct SampleTrackSource {
    stream_id: String,
    audio: bool,
    video: bool,
    live: Mutex<Vec<Arc<TrackLocalStaticSample>>>,
}

impl SampleTrackSource {
    pub fn new(stream_id: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
            audio: true,
            video: true,
            live: Mutex::new(Vec::new()),
        }
    }

    pub fn with_audio(mut self, audio: bool) -> Self {
        self.audio = audio;
        self
    }

    pub fn with_video(mut self, video: bool) -> Self {
        self.video = video;
        self
    }

    /// Tracks handed out by the last [`acquire`](MediaSource::acquire) and not
    /// yet released. Write samples into these.
    pub fn live_tracks(&self) -> Vec<Arc<TrackLocalStaticSample>> {
        self.live.lock().map(|live| live.clone()).unwrap_or_default()
    }

    fn audio_track(&self) -> Arc<TrackLocalStaticSample> {
        Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                ..Default::default()
            },
            "audio".to_owned(),
            self.stream_id.clone(),
        ))
    }

    fn video_track(&self) -> Arc<TrackLocalStaticSample> {
        Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
            "video".to_owned(),
            self.stream_id.clone(),
        ))
    }
}

#[async_trait]
impl MediaSource for SampleTrackSource {
    async fn acquire(&self) -> Result<Vec<LocalTrack>, MediaError> {
        let mut tracks = Vec::new();
        if self.audio {
            tracks.push(self.audio_track());
        }
        if self.video {
            tracks.push(self.video_track());
        }
        if tracks.is_empty() {
            return Err(MediaError::Unavailable);
        }

        info!("Acquired {} track(s) for stream '{}'", tracks.len(), self.stream_id);
        if let Ok(mut live) = self.live.lock() {
            live.extend(tracks.iter().cloned());
        }

        Ok(tracks
            .into_iter()
            .map(|track| track as LocalTrack)
            .collect())
    }

    fn release(&self, tracks: &[LocalTrack]) {
        debug!("Releasing {} track(s) of '{}'", tracks.len(), self.stream_id);
        if let Ok(mut live) = self.live.lock() {
            live.retain(|held| {
                !tracks
                    .iter()
                    .any(|track| std::ptr::addr_eq(Arc::as_ptr(held), Arc::as_ptr(track)))
            });
        }
    }
}

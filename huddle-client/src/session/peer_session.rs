use crate::error::NegotiationError;
use crate::session::negotiator::{LocalTrack, Negotiator};
use crate::session::negotiator_event::SessionId;
use crate::session::session_state::SessionState;
use huddle_core::{SdpType, SessionDescription};
use tracing::{debug, info, warn};

/// One offer/answer negotiation with one remote participant.
///
/// Owned by a single controller; every operation takes `&mut self`, so only one
/// exchange step runs at a time.
pub struct PeerSession {
    id: SessionId,
    state: SessionState,
    negotiator: Option<Box<dyn Negotiator>>,
    local_description: Option<SessionDescription>,
    remote_description: Option<SessionDescription>,
    local_tracks: Vec<LocalTrack>,
    /// Tracks waiting for the next description exchange to be attached.
    staged_tracks: Vec<LocalTrack>,
    /// Bumped once per batch of added tracks.
    track_generation: u64,
    /// `track_generation` covered by the last exchange we took part in.
    negotiated_generation: u64,
    /// `negotiated_generation` before the outstanding offer, for rollback.
    settled_generation: u64,
}

impl PeerSession {
    pub fn new(id: SessionId, negotiator: Box<dyn Negotiator>) -> Self {
        Self {
            id,
            state: SessionState::Idle,
            negotiator: Some(negotiator),
            local_description: None,
            remote_description: None,
            local_tracks: Vec::new(),
            staged_tracks: Vec::new(),
            track_generation: 0,
            negotiated_generation: 0,
            settled_generation: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn local_description(&self) -> Option<&SessionDescription> {
        self.local_description.as_ref()
    }

    pub fn remote_description(&self) -> Option<&SessionDescription> {
        self.remote_description.as_ref()
    }

    pub fn local_tracks(&self) -> &[LocalTrack] {
        &self.local_tracks
    }

    pub fn staged_tracks(&self) -> &[LocalTrack] {
        &self.staged_tracks
    }

    /// Local tracks were added that no exchange has carried yet.
    pub fn needs_renegotiation(&self) -> bool {
        self.state == SessionState::Connected && self.track_generation > self.negotiated_generation
    }

    pub async fn create_offer(&mut self) -> Result<SessionDescription, NegotiationError> {
        let next = match self.state {
            SessionState::Idle => SessionState::Offering,
            SessionState::Connected => SessionState::Renegotiating,
            SessionState::Closed => return Err(NegotiationError::Closed),
            state => {
                return Err(NegotiationError::InvalidState {
                    operation: "create an offer",
                    state,
                });
            }
        };

        self.attach_staged().await?;
        let generation = self.track_generation;

        let negotiator = self.negotiator()?;
        let offer = negotiator.create_offer().await?;
        negotiator.set_local_description(offer.clone()).await?;
        let offer = negotiator.local_description().await?.unwrap_or(offer);

        self.settled_generation = self.negotiated_generation;
        self.negotiated_generation = generation;
        self.local_description = Some(offer.clone());
        self.state = next;

        info!("{} created offer, now {}", self.id, self.state);
        Ok(offer)
    }

    pub async fn create_answer(
        &mut self,
        remote_offer: SessionDescription,
    ) -> Result<SessionDescription, NegotiationError> {
        match self.state {
            SessionState::Closed => return Err(NegotiationError::Closed),
            SessionState::Idle | SessionState::Connected => {}
            state => {
                return Err(NegotiationError::InvalidState {
                    operation: "answer an offer",
                    state,
                });
            }
        }
        check_description(&remote_offer, SdpType::Offer, self.state)?;

        let previous = self.state;
        self.state = SessionState::Answering;

        match self.answer(remote_offer).await {
            Ok(answer) => {
                self.state = SessionState::Connected;
                info!("{} answered, now {}", self.id, self.state);
                Ok(answer)
            }
            Err(e) => {
                self.state = previous;
                Err(e)
            }
        }
    }

    async fn answer(
        &mut self,
        remote_offer: SessionDescription,
    ) -> Result<SessionDescription, NegotiationError> {
        self.negotiator()?
            .set_remote_description(remote_offer.clone())
            .await?;
        self.remote_description = Some(remote_offer);

        // Attached after the remote offer so they take its transceivers. An
        // answer never settles our own pending tracks; those need an offer.
        self.attach_staged().await?;

        let negotiator = self.negotiator()?;
        let answer = negotiator.create_answer().await?;
        negotiator.set_local_description(answer.clone()).await?;
        let answer = negotiator.local_description().await?.unwrap_or(answer);

        self.local_description = Some(answer.clone());
        Ok(answer)
    }

    pub async fn apply_remote_answer(
        &mut self,
        answer: SessionDescription,
    ) -> Result<(), NegotiationError> {
        if self.state == SessionState::Closed {
            return Err(NegotiationError::Closed);
        }
        check_description(&answer, SdpType::Answer, self.state)?;
        if !self.state.has_local_offer() {
            return Err(NegotiationError::Malformed(format!(
                "received an answer with no offer outstanding (session {})",
                self.state
            )));
        }

        self.negotiator()?
            .set_remote_description(answer.clone())
            .await?;

        self.remote_description = Some(answer);
        self.state = SessionState::Connected;
        info!("{} remote answer applied, now {}", self.id, self.state);
        Ok(())
    }

    /// Withdraws our outstanding offer so a colliding remote offer can be answered.
    pub async fn rollback(&mut self) -> Result<(), NegotiationError> {
        let previous = match self.state {
            SessionState::Offering => SessionState::Idle,
            SessionState::Renegotiating => SessionState::Connected,
            SessionState::Closed => return Err(NegotiationError::Closed),
            state => {
                return Err(NegotiationError::InvalidState {
                    operation: "roll back",
                    state,
                });
            }
        };

        self.negotiator()?.rollback().await?;

        self.negotiated_generation = self.settled_generation;
        self.local_description = None;
        self.state = previous;
        info!("{} rolled back local offer, now {}", self.id, self.state);
        Ok(())
    }

    /// Adds a batch of local tracks.
    ///
    /// On a connected session they are attached right away and `true` is
    /// returned: one renegotiation round is now due for the whole batch. In any
    /// other state they wait for the next exchange.
    pub async fn add_tracks(&mut self, tracks: Vec<LocalTrack>) -> Result<bool, NegotiationError> {
        if self.state == SessionState::Closed {
            return Err(NegotiationError::Closed);
        }
        if tracks.is_empty() {
            return Ok(false);
        }

        self.track_generation += 1;

        if self.state != SessionState::Connected {
            debug!(
                "{} staging {} track(s) while {}",
                self.id,
                tracks.len(),
                self.state
            );
            self.staged_tracks.extend(tracks);
            return Ok(false);
        }

        self.staged_tracks.extend(tracks);
        self.attach_staged().await?;
        Ok(true)
    }

    /// Keeps tracks aside until the next exchange without asking for one.
    pub fn stage_tracks(&mut self, tracks: Vec<LocalTrack>) -> Result<(), NegotiationError> {
        if self.state == SessionState::Closed {
            return Err(NegotiationError::Closed);
        }
        self.staged_tracks.extend(tracks);
        Ok(())
    }

    /// Releases the negotiation object and every track. Idempotent.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }

        if let Some(negotiator) = self.negotiator.take() {
            if let Err(e) = negotiator.close().await {
                warn!("{} negotiator did not close cleanly: {:?}", self.id, e);
            }
        }

        self.local_tracks.clear();
        self.staged_tracks.clear();
        self.state = SessionState::Closed;
        info!("{} closed", self.id);
    }

    async fn attach_staged(&mut self) -> Result<(), NegotiationError> {
        if self.staged_tracks.is_empty() {
            return Ok(());
        }

        let staged = std::mem::take(&mut self.staged_tracks);
        let negotiator = self.negotiator()?;
        for track in &staged {
            negotiator.add_track(track.clone()).await?;
        }

        debug!("{} attached {} track(s)", self.id, staged.len());
        self.local_tracks.extend(staged);
        Ok(())
    }

    fn negotiator(&self) -> Result<&dyn Negotiator, NegotiationError> {
        self.negotiator.as_deref().ok_or(NegotiationError::Closed)
    }
}

fn check_description(
    desc: &SessionDescription,
    expected: SdpType,
    state: SessionState,
) -> Result<(), NegotiationError> {
    if desc.sdp_type != expected {
        return Err(NegotiationError::Malformed(format!(
            "expected {} while {}, got {}",
            expected, state, desc.sdp_type
        )));
    }
    if desc.sdp.trim().is_empty() {
        return Err(NegotiationError::Malformed(format!("empty {} description", expected)));
    }
    Ok(())
}

use crate::controller::call_command::CallCommand;
use crate::controller::call_config::CallConfig;
use crate::controller::call_event::{CallEvent, CallPhase, CallSnapshot, Participant};
use crate::controller::call_handle::CallHandle;
use crate::error::{CallError, MediaError};
use crate::media::MediaSource;
use crate::session::{
    LocalTrack, NegotiatorEvent, NegotiatorEvents, NegotiatorFactory, PeerSession, SessionId,
};
use crate::signaling::SignalingOutput;
use huddle_core::{ClientMessage, ConnectionId, Payload, RoomKey, ServerMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Caller,
    Callee,
}

/// The one call this controller is running.
struct ActiveCall {
    peer: ConnectionId,
    role: Role,
    session: PeerSession,
    /// Every local track the call owns, attached or not; released on teardown.
    media: Vec<LocalTrack>,
    established: bool,
    /// Set while an outgoing call waits for its answer.
    deadline: Option<Instant>,
    remote_tracks: usize,
}

/// Client side of a call: one task owning the session and reacting to user
/// commands, relay frames and negotiator callbacks in arrival order.
pub struct CallController {
    config: CallConfig,
    factory: Arc<dyn NegotiatorFactory>,
    media: Arc<dyn MediaSource>,
    signaling: Arc<dyn SignalingOutput>,

    command_rx: mpsc::UnboundedReceiver<CallCommand>,
    inbound_rx: mpsc::UnboundedReceiver<ServerMessage>,
    negotiator_rx: mpsc::UnboundedReceiver<(SessionId, NegotiatorEvent)>,
    negotiator_tx: mpsc::UnboundedSender<(SessionId, NegotiatorEvent)>,
    events: mpsc::UnboundedSender<CallEvent>,

    own_id: Option<ConnectionId>,
    room: Option<RoomKey>,
    participant: Option<Participant>,
    call: Option<ActiveCall>,
    next_session: u64,
}

impl CallController {
    pub fn new(
        config: CallConfig,
        factory: Arc<dyn NegotiatorFactory>,
        media: Arc<dyn MediaSource>,
        signaling: Arc<dyn SignalingOutput>,
        inbound_rx: mpsc::UnboundedReceiver<ServerMessage>,
    ) -> (Self, CallHandle, mpsc::UnboundedReceiver<CallEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (negotiator_tx, negotiator_rx) = mpsc::unbounded_channel();
        let (events, events_rx) = mpsc::unbounded_channel();

        let controller = Self {
            config,
            factory,
            media,
            signaling,
            command_rx,
            inbound_rx,
            negotiator_rx,
            negotiator_tx,
            events,
            own_id: None,
            room: None,
            participant: None,
            call: None,
            next_session: 0,
        };

        (controller, CallHandle::new(command_tx), events_rx)
    }

    /// Builds a controller and runs it on its own task.
    pub fn spawn(
        config: CallConfig,
        factory: Arc<dyn NegotiatorFactory>,
        media: Arc<dyn MediaSource>,
        signaling: Arc<dyn SignalingOutput>,
        inbound_rx: mpsc::UnboundedReceiver<ServerMessage>,
    ) -> (CallHandle, mpsc::UnboundedReceiver<CallEvent>, JoinHandle<()>) {
        let (controller, handle, events) =
            Self::new(config, factory, media, signaling, inbound_rx);
        let task = tokio::spawn(controller.run());
        (handle, events, task)
    }

    pub async fn run(mut self) {
        info!("Call controller started");

        loop {
            let deadline = self.call.as_ref().and_then(|call| call.deadline);

            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            info!("All call handles dropped, shutting down");
                            break;
                        }
                    }
                }

                msg = self.inbound_rx.recv() => {
                    match msg {
                        Some(msg) => self.handle_signal(msg).await,
                        None => {
                            warn!("Signaling connection closed, shutting down");
                            break;
                        }
                    }
                }

                Some((session, event)) = self.negotiator_rx.recv() => {
                    self.handle_negotiator_event(session, event).await;
                }

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.handle_timeout().await;
                }
            }
        }

        if let Some(call) = self.call.take() {
            let peer = call.peer;
            self.teardown(call).await;
            self.emit(CallEvent::CallEnded { peer });
        }
        info!("Call controller finished");
    }

    async fn handle_command(&mut self, cmd: CallCommand) {
        match cmd {
            CallCommand::JoinRoom { room, label } => {
                info!("Joining room '{}' as {}", room, label);
                let msg = ClientMessage::JoinRoom {
                    room_id: room,
                    email: label,
                };
                if let Err(e) = self.signaling.send(msg).await {
                    self.emit(CallEvent::CallFailed {
                        peer: None,
                        error: e.into(),
                    });
                }
            }

            CallCommand::Call { target } => self.start_call(target).await,

            CallCommand::AttachTracks(tracks) => {
                if let Err(e) = self.attach_tracks(tracks).await {
                    self.fail_call(e).await;
                }
            }

            CallCommand::HangUp => {
                let Some(call) = self.call.take() else {
                    debug!("Hang-up with no call running");
                    return;
                };
                let peer = call.peer;
                info!("Hanging up on {}", peer);
                self.teardown(call).await;
                self.emit(CallEvent::CallEnded { peer });
            }

            CallCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    async fn handle_signal(&mut self, msg: ServerMessage) {
        debug!("Relay sent {}", msg.event_name());

        let result = match msg {
            ServerMessage::Welcome { id } => {
                info!("Relay assigned connection id {}", id);
                self.own_id = Some(id);
                self.emit(CallEvent::Connected { id });
                Ok(())
            }

            ServerMessage::RoomJoined { room_id, email } => {
                info!("In room '{}', waiting for a participant", room_id);
                self.room = Some(room_id.clone());
                self.emit(CallEvent::RoomJoined {
                    room: room_id,
                    label: email,
                });
                Ok(())
            }

            ServerMessage::UserJoined { email, id } => {
                self.on_user_joined(email, id).await;
                Ok(())
            }

            ServerMessage::IncomingCall { from, offer } => self.on_incoming_call(from, offer).await,

            ServerMessage::CallAccepted { from, ans } => self.on_call_accepted(from, ans).await,

            ServerMessage::PeerNegoNeeded { from, offer } => {
                self.on_renegotiation_offer(from, offer).await
            }

            ServerMessage::PeerNegoFinal { from, ans } => {
                self.on_renegotiation_answer(from, ans).await
            }
        };

        if let Err(e) = result {
            self.fail_call(e).await;
        }
    }

    async fn handle_negotiator_event(&mut self, session: SessionId, event: NegotiatorEvent) {
        let Some(call) = self.call.as_mut() else {
            debug!("Dropping {:?} from {}: no call", event, session);
            return;
        };
        if call.session.id() != session {
            debug!("Dropping {:?} from stale {}", event, session);
            return;
        }

        match event {
            NegotiatorEvent::NegotiationNeeded => {
                if let Err(e) = self.renegotiate_if_needed().await {
                    self.fail_call(e).await;
                }
            }

            NegotiatorEvent::Track(track) => {
                call.remote_tracks += 1;
                let peer = call.peer;
                info!("Remote {} track from {}", track.kind, peer);
                self.emit(CallEvent::RemoteTrack { peer, track });
            }

            NegotiatorEvent::TransportFailed => {
                error!("Peer transport to {} failed", call.peer);
                self.fail_call(CallError::TransportFailed).await;
            }
        }
    }

    async fn handle_timeout(&mut self) {
        let Some(call) = self.call.take() else {
            return;
        };
        warn!(
            "{} did not answer within {:?}",
            call.peer, self.config.call_timeout
        );
        let peer = call.peer;
        self.teardown(call).await;
        self.emit(CallEvent::CallFailed {
            peer: Some(peer),
            error: CallError::Timeout(self.config.call_timeout),
        });
    }

    async fn on_user_joined(&mut self, label: String, id: ConnectionId) {
        if Some(id) == self.own_id {
            return;
        }

        let previous = self
            .participant
            .as_ref()
            .filter(|p| p.id != id && p.label.as_deref() == Some(label.as_str()))
            .map(|p| p.id);

        let participant = Participant {
            id,
            label: Some(label),
        };

        let Some(previous) = previous else {
            info!("{} joined as {}", id, participant.label.as_deref().unwrap_or("?"));
            if self.call.is_none() {
                self.participant = Some(participant.clone());
            }
            self.emit(CallEvent::ParticipantJoined(participant));
            return;
        };

        info!("Participant {} is back as {}", previous, id);
        self.participant = Some(participant.clone());

        // The old connection is gone, and so is any call over it.
        if let Some(call) = self.call.take_if(|call| call.peer == previous) {
            self.teardown(call).await;
            self.emit(CallEvent::CallEnded { peer: previous });
        }

        self.emit(CallEvent::ParticipantReconnected {
            previous,
            participant,
        });
    }

    async fn start_call(&mut self, target: Option<ConnectionId>) {
        if self.call.is_some() {
            warn!("Already in a call, ignoring call request");
            self.emit(CallEvent::CallFailed {
                peer: target,
                error: CallError::Busy,
            });
            return;
        }

        let Some(peer) = target.or(self.participant.as_ref().map(|p| p.id)) else {
            self.emit(CallEvent::CallFailed {
                peer: None,
                error: CallError::NoParticipant,
            });
            return;
        };

        if let Err(error) = self.place_call(peer).await {
            error!("Call to {} failed: {}", peer, error);
            if let Some(call) = self.call.take() {
                self.teardown(call).await;
            }
            self.emit(CallEvent::CallFailed {
                peer: Some(peer),
                error,
            });
        }
    }

    async fn place_call(&mut self, peer: ConnectionId) -> Result<(), CallError> {
        info!("Calling {}", peer);

        let media = self.acquire_media().await?;
        let session = match self.new_session().await {
            Ok(session) => session,
            Err(e) => {
                self.media.release(&media);
                return Err(e);
            }
        };

        // Tracks are attached once the answer is in.
        let call = self.call.insert(ActiveCall {
            peer,
            role: Role::Caller,
            session,
            media,
            established: false,
            deadline: Some(Instant::now() + self.config.call_timeout),
            remote_tracks: 0,
        });

        let offer = call.session.create_offer().await?;
        self.signaling
            .send(ClientMessage::CallUser {
                to: peer,
                offer: Payload::from(&offer),
            })
            .await?;
        Ok(())
    }

    async fn on_incoming_call(&mut self, from: ConnectionId, offer: Payload) -> Result<(), CallError> {
        if let Some(call) = &self.call {
            if call.peer != from {
                warn!("Busy with {}, ignoring call from {}", call.peer, from);
                return Ok(());
            }
            if call.established || call.role != Role::Caller {
                warn!("Ignoring repeated call from {}", from);
                return Ok(());
            }

            // Both sides called each other. The greater id answers.
            let yields = self.own_id.is_some_and(|own| own > from);
            if !yields {
                info!("Call glare with {}, keeping our offer", from);
                return Ok(());
            }

            info!("Call glare with {}, answering theirs", from);
            if let Some(mut call) = self.call.take() {
                call.session.close().await;
                return self.answer_call(from, offer, call.media).await;
            }
        }

        self.emit(CallEvent::IncomingCall { from });
        let media = match self.acquire_media().await {
            Ok(media) => media,
            Err(error) => {
                self.refuse_call(from, error);
                return Ok(());
            }
        };
        self.answer_call(from, offer, media).await
    }

    /// Fails an incoming call that never got as far as a session.
    fn refuse_call(&self, from: ConnectionId, error: CallError) {
        error!("Cannot answer {}: {}", from, error);
        self.emit(CallEvent::CallFailed {
            peer: Some(from),
            error,
        });
    }

    /// A call needs at least one local track; the callee's only go out
    /// with the caller's first renegotiation.
    async fn acquire_media(&self) -> Result<Vec<LocalTrack>, CallError> {
        let media = self.media.acquire().await?;
        if media.is_empty() {
            return Err(MediaError::Unavailable.into());
        }
        Ok(media)
    }

    async fn answer_call(
        &mut self,
        from: ConnectionId,
        offer: Payload,
        media: Vec<LocalTrack>,
    ) -> Result<(), CallError> {
        let session = match self.new_session().await {
            Ok(session) => session,
            Err(e) => {
                self.media.release(&media);
                self.refuse_call(from, e);
                return Ok(());
            }
        };

        let call = self.call.insert(ActiveCall {
            peer: from,
            role: Role::Callee,
            session,
            media,
            established: false,
            deadline: None,
            remote_tracks: 0,
        });

        let offer = offer.to_description()?;
        let answer = call.session.create_answer(offer).await?;

        // Ours ride along with the answer to the caller's first renegotiation.
        call.session.stage_tracks(call.media.clone())?;

        self.signaling
            .send(ClientMessage::CallAccepted {
                to: from,
                ans: Payload::from(&answer),
            })
            .await?;

        call.established = true;
        if self.participant.as_ref().is_none_or(|p| p.id != from) {
            self.participant = Some(Participant {
                id: from,
                label: None,
            });
        }

        info!("Call with {} established", from);
        self.emit(CallEvent::CallEstablished { peer: from });
        Ok(())
    }

    async fn on_call_accepted(&mut self, from: ConnectionId, ans: Payload) -> Result<(), CallError> {
        let Some(call) = self.call.as_mut() else {
            warn!("Rejecting answer from {}: no call pending", from);
            return Ok(());
        };
        if call.peer != from || call.role != Role::Caller || call.established {
            warn!("Rejecting unexpected answer from {}", from);
            return Ok(());
        }

        let answer = ans.to_description()?;
        call.session.apply_remote_answer(answer).await?;
        call.established = true;
        call.deadline = None;

        info!("Call with {} established", from);
        self.emit(CallEvent::CallEstablished { peer: from });

        let Some(call) = self.call.as_mut() else {
            return Ok(());
        };
        if call.session.add_tracks(call.media.clone()).await? {
            self.renegotiate_if_needed().await?;
        }
        Ok(())
    }

    async fn on_renegotiation_offer(
        &mut self,
        from: ConnectionId,
        offer: Payload,
    ) -> Result<(), CallError> {
        let Some(call) = self.call.as_mut().filter(|call| call.peer == from) else {
            warn!("Ignoring renegotiation offer from {}: not in a call with it", from);
            return Ok(());
        };

        if call.session.state().has_local_offer() {
            if call.role == Role::Caller {
                info!("Renegotiation glare with {}, keeping our offer", from);
                return Ok(());
            }
            info!("Renegotiation glare with {}, rolling back", from);
            call.session.rollback().await?;
        }

        let offer = offer.to_description()?;
        let answer = call.session.create_answer(offer).await?;
        self.signaling
            .send(ClientMessage::PeerNegoDone {
                to: from,
                ans: Payload::from(&answer),
            })
            .await?;

        self.renegotiate_if_needed().await
    }

    async fn on_renegotiation_answer(
        &mut self,
        from: ConnectionId,
        ans: Payload,
    ) -> Result<(), CallError> {
        let Some(call) = self.call.as_mut().filter(|call| call.peer == from) else {
            warn!("Ignoring renegotiation answer from {}: not in a call with it", from);
            return Ok(());
        };
        if !call.session.state().has_local_offer() {
            warn!("Ignoring late renegotiation answer from {}", from);
            return Ok(());
        }

        let answer = ans.to_description()?;
        call.session.apply_remote_answer(answer).await?;

        // Tracks added during the round go out now.
        self.renegotiate_if_needed().await
    }

    async fn attach_tracks(&mut self, tracks: Vec<LocalTrack>) -> Result<(), CallError> {
        let Some(call) = self.call.as_mut() else {
            warn!("No call to attach {} track(s) to", tracks.len());
            return Ok(());
        };

        call.media.extend(tracks.iter().cloned());
        if !call.established {
            // Joins the acquired media once the answer is in.
            debug!("Holding {} track(s) until {} answers", tracks.len(), call.peer);
            return Ok(());
        }
        if call.session.add_tracks(tracks).await? {
            self.renegotiate_if_needed().await?;
        }
        Ok(())
    }

    /// Starts a round if tracks are waiting and none is in flight.
    async fn renegotiate_if_needed(&mut self) -> Result<(), CallError> {
        let Some(call) = self.call.as_mut() else {
            return Ok(());
        };
        if !call.session.needs_renegotiation() {
            return Ok(());
        }

        let offer = call.session.create_offer().await?;
        info!("Renegotiating with {}", call.peer);
        self.signaling
            .send(ClientMessage::PeerNegoNeeded {
                to: call.peer,
                offer: Payload::from(&offer),
            })
            .await?;
        Ok(())
    }

    async fn new_session(&mut self) -> Result<PeerSession, CallError> {
        self.next_session += 1;
        let id = SessionId(self.next_session);

        let events = NegotiatorEvents::new(id, self.negotiator_tx.clone());
        let negotiator = self
            .factory
            .create(events)
            .await
            .map_err(CallError::Setup)?;

        debug!("Created {}", id);
        Ok(PeerSession::new(id, negotiator))
    }

    /// Aborts the running call, if any, and reports why.
    async fn fail_call(&mut self, error: CallError) {
        error!("Call failed: {}", error);
        let peer = match self.call.take() {
            Some(call) => {
                let peer = call.peer;
                self.teardown(call).await;
                Some(peer)
            }
            None => None,
        };
        self.emit(CallEvent::CallFailed { peer, error });
    }

    async fn teardown(&mut self, mut call: ActiveCall) {
        call.session.close().await;
        self.media.release(&call.media);
        debug!("Released {} local track(s)", call.media.len());
    }

    fn snapshot(&self) -> CallSnapshot {
        let phase = match &self.call {
            None => CallPhase::Idle,
            Some(call) if call.established => CallPhase::InCall,
            Some(_) => CallPhase::Calling,
        };

        CallSnapshot {
            own_id: self.own_id,
            room: self.room.clone(),
            participant: self.participant.clone(),
            phase,
            peer: self.call.as_ref().map(|call| call.peer),
            session_state: self.call.as_ref().map(|call| call.session.state()),
            local_tracks: self
                .call
                .as_ref()
                .map_or(0, |call| call.session.local_tracks().len()),
            remote_tracks: self.call.as_ref().map_or(0, |call| call.remote_tracks),
        }
    }

    fn emit(&self, event: CallEvent) {
        if self.events.send(event).is_err() {
            debug!("No one is listening for call events");
        }
    }
}

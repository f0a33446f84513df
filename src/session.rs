//! Session and lifecycle management
//!
//! A [`PongSession`] owns one peer's view of the game: the local player,
//! the links to remote peers, both loops and the replication state. The host
//! application feeds it key events and frame deltas, issues commands
//! (join, pause, restart, cleanup) and drains [`SessionEvent`]s to redraw.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::PeerId;
use crate::error::PongError;
use crate::events::{EventQueue, SessionEvent};
use crate::input::InputSampler;
use crate::net::{LinkState, ReplicationStats, Replicator, Transport, TransportEvent};
use crate::schedule::{FramePlan, Loops, TaskHandle};
use crate::settings::Settings;
use crate::sim::{GameState, Side, TickOutcome, tick};

/// Which part this peer plays. A join makes this peer a joiner right away; a
/// join link that closes without ever opening hands the authority back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// Created the room; runs the simulation
    Host,
    /// Dialed into `room`; mirrors the host's snapshots
    Joiner { room: PeerId },
}

impl Role {
    pub fn is_authority(&self) -> bool {
        matches!(self, Role::Host)
    }
}

/// One peer's game session
pub struct PongSession<T: Transport> {
    transport: T,
    local_id: PeerId,
    role: Role,
    state: GameState,
    links: BTreeMap<PeerId, LinkState>,
    input: InputSampler,
    replicator: Replicator,
    loops: Loops,
    rng: Pcg32,
    events: EventQueue,
    room_code: Option<PeerId>,
    last_peer_count: usize,
    torn_down: bool,
}

impl<T: Transport> PongSession<T> {
    /// Create a session hosting its own room. The local player takes the left
    /// slot and this peer is the authority until it joins someone else's room.
    pub fn new(local_id: impl Into<PeerId>, transport: T, settings: &Settings) -> Self {
        let local_id = local_id.into();
        let seed = settings.resolve_seed();
        let mut session = Self {
            transport,
            local_id: local_id.clone(),
            role: Role::Host,
            state: GameState::new(settings.field),
            links: BTreeMap::new(),
            input: InputSampler::new(settings.keys.clone()),
            replicator: Replicator::new(settings.apply_policy),
            loops: Loops::start(settings.net_tick_hz, settings.max_catchup_ticks),
            rng: Pcg32::seed_from_u64(seed),
            events: EventQueue::new(),
            room_code: None,
            last_peer_count: 0,
            torn_down: false,
        };
        session.add_player(local_id.clone());
        log::info!("Session {local_id} started (seed {seed})");
        session
    }

    // === Accessors ===

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn is_authority(&self) -> bool {
        self.role.is_authority()
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    /// Seated players, self included
    pub fn peer_count(&self) -> usize {
        self.state.player_count()
    }

    /// Our identity as announced by the transport, shared to let others join
    pub fn room_code(&self) -> Option<&PeerId> {
        self.room_code.as_ref()
    }

    pub fn link_state(&self, peer: &PeerId) -> LinkState {
        self.links.get(peer).copied().unwrap_or(LinkState::Idle)
    }

    pub fn replication_stats(&self) -> ReplicationStats {
        self.replicator.stats()
    }

    pub fn is_running(&self) -> bool {
        !self.torn_down
    }

    pub fn render_handle(&self) -> TaskHandle {
        self.loops.render_handle()
    }

    pub fn network_handle(&self) -> TaskHandle {
        self.loops.network_handle()
    }

    pub fn cancel_loop(&mut self, handle: TaskHandle) -> bool {
        self.loops.cancel(handle)
    }

    pub fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.pop()
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain()
    }

    // === Input ===

    pub fn key_down(&mut self, key: &str) {
        self.input.press(key);
    }

    pub fn key_up(&mut self, key: &str) {
        self.input.release(key);
    }

    pub fn release_keys(&mut self) {
        self.input.release_all();
    }

    // === Commands ===

    /// Seat a player in the free slot. Silently refused when the room is full.
    pub fn add_player(&mut self, id: PeerId) -> bool {
        match self.state.add_player(id.clone()) {
            Some(side) => {
                log::info!("Player {id} seated on the {side:?}");
                self.events.push(SessionEvent::PlayerJoined {
                    id,
                    left: side.is_left(),
                });
                self.notify_peer_count();
                self.notify_scores();
                true
            }
            None => {
                if self.state.player(&id).is_none() {
                    log::warn!("Room full, {id} stays unseated");
                }
                false
            }
        }
    }

    /// Move a player's paddle up (negative) or down (positive)
    pub fn move_player(&mut self, id: &PeerId, direction: f32) -> bool {
        self.state.move_player(id, direction)
    }

    /// Dial a host's room code. This peer stops simulating unless the link
    /// closes before it opens.
    pub fn join(&mut self, room_code: impl Into<PeerId>) -> Result<(), PongError> {
        let room = room_code.into();
        if self.torn_down {
            return Err(PongError::TornDown);
        }
        if room == self.local_id {
            return Err(PongError::SelfJoin(room));
        }
        if let Role::Joiner { room: current } = &self.role {
            let state = self.link_state(current);
            if matches!(state, LinkState::Connecting | LinkState::Open) {
                return Err(PongError::AlreadyJoined(current.clone()));
            }
        }
        if self.state.player_count() > 1 {
            return Err(PongError::RoomOccupied(self.state.player_count()));
        }

        log::info!("Joining room {room}");
        self.role = Role::Joiner { room: room.clone() };
        self.links.insert(room.clone(), LinkState::Connecting);
        self.transport.connect(&room);
        Ok(())
    }

    pub fn toggle_pause(&mut self) {
        if self.torn_down {
            log::warn!("toggle_pause after cleanup ignored");
            return;
        }
        self.state.paused = !self.state.paused;
        log::info!("Paused: {}", self.state.paused);
        self.events.push(SessionEvent::PauseChanged {
            paused: self.state.paused,
        });
        if !self.is_authority() {
            self.replicator.request_pause(self.state.paused);
            self.broadcast();
        }
    }

    /// Zero scores, serve a new ball, unpause and recenter paddles.
    /// A joiner also asks the host to do the same.
    pub fn restart(&mut self) {
        if self.torn_down {
            log::warn!("restart after cleanup ignored");
            return;
        }
        self.reset_match();
        if !self.is_authority() {
            self.replicator.request_restart();
            self.broadcast();
        }
    }

    fn reset_match(&mut self) {
        let was_paused = self.state.paused;
        self.state.restart(&mut self.rng);
        log::info!("Match restarted");
        self.notify_scores();
        if was_paused {
            self.events.push(SessionEvent::PauseChanged { paused: false });
        }
    }

    /// Stop both loops, close every link and release the transport identity.
    /// Safe to call more than once.
    pub fn cleanup(&mut self) {
        if self.torn_down {
            return;
        }
        self.loops.cancel_all();
        for (peer, state) in &self.links {
            if matches!(state, LinkState::Connecting | LinkState::Open) {
                self.transport.close(peer);
            }
        }
        self.transport.shutdown();
        self.links.clear();
        self.torn_down = true;
        log::info!("Session {} cleaned up", self.local_id);
    }

    // === Loop ===

    /// Run one host frame: drain the transport, then whatever loops are due
    pub fn frame(&mut self, dt: f32) -> FramePlan {
        if self.torn_down {
            return FramePlan::default();
        }
        self.pump_transport();
        let plan = self.loops.plan(dt);
        if plan.render {
            self.render_tick();
        }
        for _ in 0..plan.network_ticks {
            self.network_tick();
        }
        plan
    }

    /// Physics step (authority only, skipped while paused)
    pub fn render_tick(&mut self) -> TickOutcome {
        if self.torn_down {
            return TickOutcome::default();
        }
        let is_authority = self.is_authority();
        let outcome = tick(&mut self.state, is_authority, &mut self.rng);
        if let Some(scorer) = &outcome.scorer {
            log::debug!("Point for {scorer}");
            self.notify_scores();
        }
        outcome
    }

    /// Apply held keys to the local paddle, then broadcast a snapshot
    pub fn network_tick(&mut self) {
        if self.torn_down {
            return;
        }
        for direction in self.input.sample() {
            self.state.move_player(&self.local_id, direction);
        }
        self.broadcast();
    }

    /// Send the full state to every open link (only once two players are seated)
    fn broadcast(&mut self) {
        let payload = match self.replicator.outgoing(&self.state) {
            Ok(Some(payload)) => payload,
            Ok(None) => return,
            Err(e) => {
                log::error!("{e}");
                return;
            }
        };
        for (peer, state) in &self.links {
            if *state != LinkState::Open {
                continue;
            }
            let result = self.transport.send(peer, &payload);
            if let Err(e) = &result {
                log::debug!("Send to {peer} failed: {e}");
            }
            self.replicator.record_send(&result);
        }
    }

    // === Transport events ===

    pub fn pump_transport(&mut self) {
        for event in self.transport.poll_events() {
            match event {
                TransportEvent::Ready(id) => self.on_ready(id),
                TransportEvent::Opened { peer, inbound } => self.on_opened(peer, inbound),
                TransportEvent::Data { peer, payload } => self.on_data(&peer, &payload),
                TransportEvent::Closed { peer } => self.on_closed(peer),
                TransportEvent::Error { peer, message } => {
                    log::warn!("Transport error ({peer:?}): {message}");
                    self.events.push(SessionEvent::ConnectionFailed {
                        peer,
                        reason: message,
                    });
                }
            }
        }
    }

    fn on_ready(&mut self, id: PeerId) {
        if id != self.local_id {
            log::warn!("Transport registered {id}, expected {}", self.local_id);
        }
        log::info!("Room code: {id}");
        self.room_code = Some(id.clone());
        self.events.push(SessionEvent::RoomOpened { room_code: id });
    }

    fn on_opened(&mut self, peer: PeerId, inbound: bool) {
        log::info!(
            "Link with {peer} open ({})",
            if inbound { "inbound" } else { "outbound" }
        );
        self.links.insert(peer.clone(), LinkState::Open);

        let joined_host = matches!(&self.role, Role::Joiner { room } if room == &peer) && !inbound;
        if joined_host && self.state.player_count() > 1 {
            // Someone dialed in while our join was pending; keep hosting them
            log::warn!("Room filled while joining {peer}, staying host");
            self.role = Role::Host;
            self.transport.close(&peer);
        } else if joined_host {
            self.seat_behind_host(peer);
        } else {
            self.add_player(peer);
        }
        self.notify_peer_count();
    }

    /// Joiner side: the host owns the left slot, we move to the right
    fn seat_behind_host(&mut self, host: PeerId) {
        let local = self.local_id.clone();
        self.replicator.reset_requests();
        self.state.remove_player(&local);
        self.add_player(host);
        if self.state.add_player(local.clone()) == Some(Side::Right) {
            self.events.push(SessionEvent::PlayerJoined {
                id: local,
                left: false,
            });
        }
        self.notify_scores();
    }

    fn on_data(&mut self, peer: &PeerId, payload: &str) {
        let is_authority = self.is_authority();
        match self
            .replicator
            .incoming(peer, payload, is_authority, &mut self.state)
        {
            Ok(applied) => {
                if applied.scores_changed || applied.roster_changed {
                    self.notify_scores();
                }
                if applied.pause_changed {
                    self.events.push(SessionEvent::PauseChanged {
                        paused: self.state.paused,
                    });
                }
                if applied.restart_requested {
                    self.reset_match();
                }
                self.notify_peer_count();
            }
            Err(e) => log::warn!("Discarding snapshot from {peer}: {e}"),
        }
    }

    fn on_closed(&mut self, peer: PeerId) {
        log::info!("Link with {peer} closed");
        let previous = self.links.insert(peer.clone(), LinkState::Closed);
        let join_failed = previous == Some(LinkState::Connecting)
            && matches!(&self.role, Role::Joiner { room } if room == &peer);
        if join_failed {
            log::warn!("Could not join {peer}, hosting own room again");
            self.role = Role::Host;
        }
        self.replicator.forget(&peer);
        if self.state.remove_player(&peer) {
            self.events.push(SessionEvent::PlayerLeft { id: peer });
            self.notify_scores();
        }
        self.notify_peer_count();
    }

    // === Notifications ===

    fn notify_peer_count(&mut self) {
        let count = self.state.player_count();
        if count != self.last_peer_count {
            self.last_peer_count = count;
            self.events.push(SessionEvent::PeerCountChanged { count });
        }
    }

    fn notify_scores(&mut self) {
        let score_on = |side| {
            self.state
                .player_on(side)
                .and_then(|p| self.state.scores.get(&p.id))
                .unwrap_or(0)
        };
        let event = SessionEvent::ScoresChanged {
            left: score_on(Side::Left),
            right: score_on(Side::Right),
        };
        self.events.push(event);
    }
}

impl<T: Transport> Drop for PongSession<T> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{LocalEndpoint, LocalNetwork};

    fn session(net: &LocalNetwork, id: &str) -> PongSession<LocalEndpoint> {
        let transport = net.endpoint(id).unwrap();
        PongSession::new(id, transport, &Settings::default().with_seed(11))
    }

    #[test]
    fn test_new_session_hosts_alone() {
        let net = LocalNetwork::new();
        let mut host = session(&net, "host");
        assert!(host.is_authority());
        assert_eq!(host.peer_count(), 1);
        assert!(host.state().players[0].is_left);

        for _ in 0..30 {
            host.frame(1.0 / 60.0);
        }
        assert_eq!(host.room_code(), Some(&PeerId::from("host")));
        assert_eq!(host.replication_stats().sent, 0);
        assert!(host.drain_events().contains(&SessionEvent::RoomOpened {
            room_code: "host".into()
        }));
    }

    #[test]
    fn test_join_misuse() {
        let net = LocalNetwork::new();
        let _host = session(&net, "host");
        let mut guest = session(&net, "guest");

        assert!(matches!(guest.join("guest"), Err(PongError::SelfJoin(_))));
        guest.join("host").unwrap();
        assert!(!guest.is_authority());
        assert_eq!(guest.link_state(&"host".into()), LinkState::Connecting);
        assert!(matches!(guest.join("host"), Err(PongError::AlreadyJoined(_))));

        guest.cleanup();
        assert!(matches!(guest.join("host"), Err(PongError::TornDown)));
    }

    #[test]
    fn test_failed_join_can_retry() {
        let net = LocalNetwork::new();
        let _host = session(&net, "host");
        let mut guest = session(&net, "guest");

        guest.join("typo").unwrap();
        guest.frame(1.0 / 60.0);
        assert_eq!(guest.link_state(&"typo".into()), LinkState::Closed);
        assert_eq!(guest.peer_count(), 1);
        assert!(guest.drain_events().iter().any(|e| matches!(
            e,
            SessionEvent::ConnectionFailed { peer: Some(p), .. } if p.as_str() == "typo"
        )));
        assert_eq!(guest.role(), &Role::Host);
        assert!(guest.is_authority());

        guest.join("host").unwrap();
        guest.frame(1.0 / 60.0);
        assert_eq!(guest.peer_count(), 2);
        assert!(!guest.is_authority());
    }

    #[test]
    fn test_inbound_player_during_pending_join_keeps_host() {
        let net = LocalNetwork::new();
        let mut a = session(&net, "a");
        let mut b = session(&net, "b");
        let mut c = session(&net, "c");

        c.join("a").unwrap();
        a.join("b").unwrap();
        a.pump_transport();

        assert!(a.is_authority());
        assert!(a.state().player(&"c".into()).is_some());
        assert!(a.state().player(&"b".into()).is_none());

        a.pump_transport();
        b.pump_transport();
        c.pump_transport();
        assert_eq!(a.link_state(&"b".into()), LinkState::Closed);
        assert_eq!(b.peer_count(), 1);
        assert_eq!(c.peer_count(), 2);
    }

    #[test]
    fn test_joiner_sits_on_the_right() {
        let net = LocalNetwork::new();
        let _host = session(&net, "host");
        let mut guest = session(&net, "guest");
        guest.join("host").unwrap();
        guest.frame(1.0 / 60.0);

        let host_player = guest.state().player(&"host".into()).unwrap();
        let me = guest.state().player(&"guest".into()).unwrap();
        assert!(host_player.is_left);
        assert!(!me.is_left);
        assert_eq!(me.x, guest.state().field.width - guest.state().field.paddle_width);
    }

    #[test]
    fn test_keys_move_local_paddle_on_network_tick() {
        let net = LocalNetwork::new();
        let mut host = session(&net, "host");
        let start = host.state().players[0].y;

        host.key_down("ArrowUp");
        host.network_tick();
        host.network_tick();
        assert_eq!(host.state().players[0].y, start - 30.0);

        host.key_up("ArrowUp");
        host.key_down("ArrowDown");
        host.network_tick();
        assert_eq!(host.state().players[0].y, start - 15.0);
    }

    #[test]
    fn test_pause_and_restart_emit_events() {
        let net = LocalNetwork::new();
        let mut host = session(&net, "host");
        host.drain_events();

        host.toggle_pause();
        assert!(host.is_paused());
        let ball = host.state().ball;
        host.render_tick();
        assert_eq!(host.state().ball, ball);

        host.restart();
        assert!(!host.is_paused());
        let events = host.drain_events();
        assert_eq!(events[0], SessionEvent::PauseChanged { paused: true });
        assert!(events.contains(&SessionEvent::PauseChanged { paused: false }));
        assert!(events.contains(&SessionEvent::ScoresChanged { left: 0, right: 0 }));
    }

    #[test]
    fn test_cleanup_is_idempotent_and_stops_loops() {
        let net = LocalNetwork::new();
        let mut host = session(&net, "host");
        host.cleanup();
        host.cleanup();
        assert!(!host.is_running());
        assert!(!net.is_registered(&"host".into()));
        assert_eq!(host.frame(1.0), FramePlan::default());
        host.toggle_pause();
        assert!(!host.is_paused());
    }

    #[test]
    fn test_loops_cancel_separately() {
        let net = LocalNetwork::new();
        let mut host = session(&net, "host");
        let network = host.network_handle();
        assert!(host.cancel_loop(network));
        let plan = host.frame(0.05);
        assert!(plan.render);
        assert_eq!(plan.network_ticks, 0);
    }
}

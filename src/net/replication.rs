//! Snapshot broadcast and application
//!
//! Both sides broadcast every network tick once two players are present.
//! How an inbound snapshot lands depends on the [`ApplyPolicy`]:
//!
//! - `Authoritative`: a non-authority replaces its state wholesale. The
//!   authority keeps its own ball, scores, pause flag and paddle. It adopts
//!   the sender's paddle position and runs any pause or restart request the
//!   sender has not had served yet.
//! - `LastWriteWins`: every receiver replaces its state wholesale, authority
//!   included. A stale peer snapshot can rewind the authority.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::snapshot::{GameSnapshot, PeerRequests};
use super::transport::TransportError;
use crate::PeerId;
use crate::error::PongError;
use crate::sim::GameState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyPolicy {
    #[default]
    Authoritative,
    LastWriteWins,
}

/// Counters for the snapshot stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplicationStats {
    pub sent: u64,
    pub send_failures: u64,
    pub received: u64,
    pub applied: u64,
    pub rejected: u64,
}

/// What an applied snapshot changed locally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Applied {
    pub roster_changed: bool,
    pub scores_changed: bool,
    pub pause_changed: bool,
    /// Sender asked for a restart; the caller owns the RNG and runs it
    pub restart_requested: bool,
}

#[derive(Debug, Default)]
pub struct Replicator {
    policy: ApplyPolicy,
    stats: ReplicationStats,
    /// Requests made by this peer, attached to every outgoing snapshot
    local_requests: PeerRequests,
    /// Highest request counters already served per peer (authority side)
    served: HashMap<PeerId, PeerRequests>,
}

impl Replicator {
    pub fn new(policy: ApplyPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn policy(&self) -> ApplyPolicy {
        self.policy
    }

    pub fn stats(&self) -> ReplicationStats {
        self.stats
    }

    pub fn request_pause(&mut self, paused: bool) {
        self.local_requests.request_pause(paused);
    }

    pub fn request_restart(&mut self) {
        self.local_requests.request_restart();
    }

    /// Start counting requests from zero (a new room link)
    pub fn reset_requests(&mut self) {
        self.local_requests = PeerRequests::default();
    }

    /// Encoded snapshot to broadcast, or `None` while alone in the room
    pub fn outgoing(&self, state: &GameState) -> Result<Option<String>, PongError> {
        if state.player_count() <= 1 {
            return Ok(None);
        }
        let mut snapshot = GameSnapshot::capture(state);
        snapshot.requests = self.local_requests;
        snapshot.encode().map(Some)
    }

    pub fn record_send(&mut self, result: &Result<(), TransportError>) {
        match result {
            Ok(()) => self.stats.sent += 1,
            Err(_) => self.stats.send_failures += 1,
        }
    }

    /// Decode and apply a payload from `from`. On error local state is untouched.
    pub fn incoming(
        &mut self,
        from: &PeerId,
        payload: &str,
        is_authority: bool,
        state: &mut GameState,
    ) -> Result<Applied, PongError> {
        self.stats.received += 1;
        let snapshot = match GameSnapshot::decode(payload) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.stats.rejected += 1;
                return Err(err);
            }
        };

        let roster_before = roster(state);
        let scores_before = state.scores.clone();
        let paused_before = state.paused;

        let mut restart_requested = false;
        if is_authority && self.policy == ApplyPolicy::Authoritative {
            restart_requested = self.merge_at_authority(from, &snapshot, state);
        } else {
            snapshot.overwrite(state);
        }

        self.stats.applied += 1;
        Ok(Applied {
            roster_changed: roster(state) != roster_before,
            scores_changed: state.scores != scores_before,
            pause_changed: state.paused != paused_before,
            restart_requested,
        })
    }

    /// Returns true when the sender asked for a restart not served yet
    fn merge_at_authority(
        &mut self,
        from: &PeerId,
        snapshot: &GameSnapshot,
        state: &mut GameState,
    ) -> bool {
        let field = state.field;
        let Some(player) = state.player_mut(from) else {
            // Unseated peers (over capacity) get no say
            return false;
        };
        if let Some(remote) = snapshot.player(from) {
            player.set_y(remote.y, &field);
        }

        let requests = snapshot.requests;
        let served = self.served.entry(from.clone()).or_default();
        if requests.pause_seq > served.pause_seq {
            served.pause_seq = requests.pause_seq;
            log::info!("Peer {from} requested pause = {}", requests.paused);
            state.paused = requests.paused;
        }
        if requests.restart_seq > served.restart_seq {
            served.restart_seq = requests.restart_seq;
            log::info!("Peer {from} requested a restart");
            return true;
        }
        false
    }

    /// Drop per-peer bookkeeping when a link closes
    pub fn forget(&mut self, peer: &PeerId) {
        self.served.remove(peer);
    }
}

fn roster(state: &GameState) -> Vec<(PeerId, bool)> {
    state
        .players
        .iter()
        .map(|p| (p.id.clone(), p.is_left))
        .collect()
}

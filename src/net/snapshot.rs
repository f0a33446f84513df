//! Snapshot wire format
//!
//! One JSON object per message carrying the whole game:
//! `{"players":[[id,{"x","y","isLeft"}]...],"ball":{"x","y","dx","dy"},
//! "scores":{id:n},"isPaused":b}`
//!
//! Guest snapshots may also carry `"requests":{"pauseSeq","paused","restartSeq"}`.
//! The key is omitted when no request was ever made, and payloads without it
//! decode with zeroed counters.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::PeerId;
use crate::error::PongError;
use crate::sim::{Ball, GameState, Player, ScoreTable};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePlayer {
    pub x: f32,
    pub y: f32,
    pub is_left: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireBall {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
}

impl From<Ball> for WireBall {
    fn from(ball: Ball) -> Self {
        Self {
            x: ball.pos.x,
            y: ball.pos.y,
            dx: ball.vel.x,
            dy: ball.vel.y,
        }
    }
}

impl From<WireBall> for Ball {
    fn from(ball: WireBall) -> Self {
        Self {
            pos: Vec2::new(ball.x, ball.y),
            vel: Vec2::new(ball.dx, ball.dy),
        }
    }
}

/// Commands a non-authority peer wants the authority to run.
///
/// Each counter grows by one per request and is resent with every snapshot,
/// so the authority acts on a request once however many copies arrive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PeerRequests {
    pub pause_seq: u32,
    /// Pause state asked for by request `pause_seq`
    pub paused: bool,
    pub restart_seq: u32,
}

impl PeerRequests {
    pub fn is_empty(&self) -> bool {
        self.pause_seq == 0 && self.restart_seq == 0
    }

    pub fn request_pause(&mut self, paused: bool) {
        self.pause_seq = self.pause_seq.wrapping_add(1);
        self.paused = paused;
    }

    pub fn request_restart(&mut self) {
        self.restart_seq = self.restart_seq.wrapping_add(1);
    }
}

/// Full replicated state as sent on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub players: Vec<(PeerId, WirePlayer)>,
    pub ball: WireBall,
    pub scores: ScoreTable,
    pub is_paused: bool,
    #[serde(default, skip_serializing_if = "PeerRequests::is_empty")]
    pub requests: PeerRequests,
}

impl GameSnapshot {
    pub fn capture(state: &GameState) -> Self {
        Self {
            players: state
                .players
                .iter()
                .map(|p| {
                    (
                        p.id.clone(),
                        WirePlayer {
                            x: p.x,
                            y: p.y,
                            is_left: p.is_left,
                        },
                    )
                })
                .collect(),
            ball: state.ball.into(),
            scores: state.scores.clone(),
            is_paused: state.paused,
            requests: PeerRequests::default(),
        }
    }

    pub fn player(&self, id: &PeerId) -> Option<&WirePlayer> {
        self.players.iter().find(|(pid, _)| pid == id).map(|(_, p)| p)
    }

    /// Replace players, ball, scores and pause flag wholesale
    pub fn overwrite(&self, state: &mut GameState) {
        state.players = self
            .players
            .iter()
            .map(|(id, p)| Player {
                id: id.clone(),
                x: p.x,
                y: p.y,
                is_left: p.is_left,
            })
            .collect();
        state.ball = self.ball.into();
        state.scores = self.scores.clone();
        state.paused = self.is_paused;
        state.normalize();
    }

    pub fn encode(&self) -> Result<String, PongError> {
        serde_json::to_string(self).map_err(PongError::Encode)
    }

    pub fn decode(payload: &str) -> Result<Self, PongError> {
        serde_json::from_str(payload).map_err(PongError::Decode)
    }
}

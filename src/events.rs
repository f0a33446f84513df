//! State-change notifications for the presentation layer
//!
//! The session never touches a display surface. Whatever draws scores, the
//! room code or the pause icon drains these and redraws.

use std::collections::VecDeque;

use serde::Serialize;

use crate::PeerId;

/// Something the UI may want to reflect
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// Transport registered our identity; share it as the room code
    #[serde(rename_all = "camelCase")]
    RoomOpened { room_code: PeerId },
    PlayerJoined { id: PeerId, left: bool },
    PlayerLeft { id: PeerId },
    PeerCountChanged { count: usize },
    ScoresChanged { left: u32, right: u32 },
    PauseChanged { paused: bool },
    /// Outbound connection could not be established or errored
    ConnectionFailed { peer: Option<PeerId>, reason: String },
}

/// FIFO of pending notifications
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: VecDeque<SessionEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: SessionEvent) {
        self.pending.push_back(event);
    }

    pub fn pop(&mut self) -> Option<SessionEvent> {
        self.pending.pop_front()
    }

    pub fn drain(&mut self) -> Vec<SessionEvent> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

//! Crate error types

use crate::PeerId;
use crate::net::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum PongError {
    #[error("snapshot encode failed: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("snapshot decode failed: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("settings read failed: {0}")]
    SettingsIo(#[from] std::io::Error),
    #[error("settings json: {0}")]
    SettingsJson(#[source] serde_json::Error),
    #[error("session has been cleaned up")]
    TornDown,
    #[error("cannot join own room {0}")]
    SelfJoin(PeerId),
    #[error("already joined room {0}")]
    AlreadyJoined(PeerId),
    #[error("room already has {0} players")]
    RoomOccupied(usize),
}

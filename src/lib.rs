//! P2P Pong - two-player Pong over a direct peer-to-peer link
//!
//! Core modules:
//! - `sim`: Authoritative simulation (paddles, ball, collisions, scoring)
//! - `input`: Local key state sampling for paddle movement
//! - `net`: Transport abstraction, snapshot wire format, replication policy
//! - `session`: Player slots, join/leave, pause/restart, teardown
//! - `schedule`: Render and network loop drivers with cancellation handles
//! - `platform`: Browser bindings (PeerJS transport, exported game handle)

pub mod error;
pub mod events;
pub mod input;
pub mod net;
pub mod platform;
pub mod schedule;
pub mod session;
pub mod settings;
pub mod sim;

pub use error::PongError;
pub use events::SessionEvent;
pub use session::{PongSession, Role};
pub use settings::Settings;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Game configuration constants (reference values)
pub mod consts {
    /// Logical field dimensions
    pub const FIELD_WIDTH: f32 = 800.0;
    pub const FIELD_HEIGHT: f32 = 600.0;

    /// Paddle box and per-move displacement
    pub const PADDLE_WIDTH: f32 = 10.0;
    pub const PADDLE_HEIGHT: f32 = 100.0;
    pub const PADDLE_SPEED: f32 = 15.0;

    /// Ball box and per-tick speed on each axis
    pub const BALL_SIZE: f32 = 10.0;
    pub const BALL_SPEED: f32 = 3.0;

    /// Half-width of the random vertical nudge applied on a paddle hit
    pub const PADDLE_NUDGE: f32 = 1.0;

    /// Room capacity
    pub const MAX_PLAYERS: usize = 2;

    /// Network tick rate (input sampling + snapshot broadcast)
    pub const NET_TICK_HZ: f32 = 60.0;
    /// Maximum network ticks run in one frame to prevent spiral of death
    pub const MAX_CATCHUP_TICKS: u32 = 8;
    /// Frame delta cap (seconds) applied before accumulating
    pub const MAX_FRAME_DT: f32 = 0.1;
}

/// Transport-level peer identity. Also serves as the room code of a host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

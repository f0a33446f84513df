//! Peer-to-peer transport boundary
//!
//! A transport moves opaque string payloads between named endpoints. It
//! makes no ordering or delivery promises. Everything it observes comes back
//! through `poll_events`, drained from the same thread that drives the game.

use crate::PeerId;

/// Per-link lifecycle as seen by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Connecting,
    Open,
    Closed,
}

/// Something the transport observed since the last poll
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Local identity registered and reachable by others
    Ready(PeerId),
    /// Link with `peer` is usable. `inbound` is true when the peer dialed us.
    Opened { peer: PeerId, inbound: bool },
    Data { peer: PeerId, payload: String },
    Closed { peer: PeerId },
    /// Failure reported by the transport; a link error is followed by `Closed`
    Error { peer: Option<PeerId>, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("no open link to {0}")]
    NotConnected(PeerId),
    #[error("transport has been shut down")]
    Shutdown,
    #[error("{0}")]
    Backend(String),
}

/// Message-oriented, peer-id-addressed connection provider
pub trait Transport {
    /// Our identity once registered
    fn local_id(&self) -> Option<&PeerId>;

    /// Dial a remote peer. Failure arrives later as `Error` + `Closed`.
    fn connect(&mut self, remote: &PeerId);

    /// Queue a payload on an open link
    fn send(&mut self, remote: &PeerId, payload: &str) -> Result<(), TransportError>;

    /// Close one link. Closing an unknown or closed link is a no-op.
    fn close(&mut self, remote: &PeerId);

    /// Close every link and release the identity. Safe to call twice.
    fn shutdown(&mut self);

    /// Drain events observed since the last call
    fn poll_events(&mut self) -> Vec<TransportEvent>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn local_id(&self) -> Option<&PeerId> {
        (**self).local_id()
    }

    fn connect(&mut self, remote: &PeerId) {
        (**self).connect(remote)
    }

    fn send(&mut self, remote: &PeerId, payload: &str) -> Result<(), TransportError> {
        (**self).send(remote, payload)
    }

    fn close(&mut self, remote: &PeerId) {
        (**self).close(remote)
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }

    fn poll_events(&mut self) -> Vec<TransportEvent> {
        (**self).poll_events()
    }
}

//! Browser bindings
//!
//! PeerJS does the signaling and owns the data channels. Its callbacks only
//! queue plain event objects on the JS side; the game drains the queue once
//! per frame as a JSON string, so no Rust code runs inside a PeerJS callback.

use serde::Deserialize;
use wasm_bindgen::prelude::*;

use crate::PeerId;
use crate::error::PongError;
use crate::events::SessionEvent;
use crate::net::{GameSnapshot, Transport, TransportError, TransportEvent};
use crate::session::PongSession;
use crate::settings::Settings;

#[wasm_bindgen(inline_js = "
    const peers = new Map();
    let nextHandle = 1;

    function wire(state, conn, inbound) {
        state.conns.set(conn.peer, conn);
        conn.on('open', () => state.events.push({ type: 'opened', peer: conn.peer, inbound }));
        conn.on('data', (data) => state.events.push({
            type: 'data',
            peer: conn.peer,
            payload: typeof data === 'string' ? data : JSON.stringify(data),
        }));
        conn.on('close', () => {
            state.conns.delete(conn.peer);
            state.events.push({ type: 'closed', peer: conn.peer });
        });
        conn.on('error', (err) => state.events.push({
            type: 'error',
            peer: conn.peer,
            message: String(err),
        }));
    }

    export function peer_create(id) {
        const handle = nextHandle++;
        const peer = new Peer(id);
        const state = { peer, conns: new Map(), events: [] };
        peer.on('open', (assigned) => state.events.push({ type: 'ready', id: assigned }));
        peer.on('connection', (conn) => wire(state, conn, true));
        peer.on('error', (err) => {
            const target = err.type === 'peer-unavailable' ? state.pending : null;
            const message = String(err.type || err);
            state.events.push({ type: 'error', peer: target ?? null, message });
            if (target) {
                state.conns.delete(target);
                state.events.push({ type: 'closed', peer: target });
            }
        });
        peers.set(handle, state);
        return handle;
    }

    export function peer_connect(handle, remote) {
        const state = peers.get(handle);
        if (!state) return;
        state.pending = remote;
        wire(state, state.peer.connect(remote), false);
    }

    export function peer_send(handle, remote, payload) {
        const conn = peers.get(handle)?.conns.get(remote);
        if (!conn || !conn.open) return false;
        conn.send(payload);
        return true;
    }

    export function peer_close(handle, remote) {
        peers.get(handle)?.conns.get(remote)?.close();
    }

    export function peer_destroy(handle) {
        const state = peers.get(handle);
        if (!state) return;
        peers.delete(handle);
        state.conns.forEach((conn) => conn.close());
        state.peer.destroy();
    }

    export function peer_poll(handle) {
        const state = peers.get(handle);
        if (!state || state.events.length === 0) return '[]';
        const drained = JSON.stringify(state.events);
        state.events = [];
        return drained;
    }
")]
extern "C" {
    fn peer_create(id: &str) -> u32;
    fn peer_connect(handle: u32, remote: &str);
    fn peer_send(handle: u32, remote: &str, payload: &str) -> bool;
    fn peer_close(handle: u32, remote: &str);
    fn peer_destroy(handle: u32);
    fn peer_poll(handle: u32) -> String;
}

/// Event object queued by the PeerJS callbacks
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum JsEvent {
    Ready { id: PeerId },
    Opened { peer: PeerId, inbound: bool },
    Data { peer: PeerId, payload: String },
    Closed { peer: PeerId },
    Error { peer: Option<PeerId>, message: String },
}

impl From<JsEvent> for TransportEvent {
    fn from(event: JsEvent) -> Self {
        match event {
            JsEvent::Ready { id } => TransportEvent::Ready(id),
            JsEvent::Opened { peer, inbound } => TransportEvent::Opened { peer, inbound },
            JsEvent::Data { peer, payload } => TransportEvent::Data { peer, payload },
            JsEvent::Closed { peer } => TransportEvent::Closed { peer },
            JsEvent::Error { peer, message } => TransportEvent::Error { peer, message },
        }
    }
}

/// PeerJS-backed transport
pub struct WebTransport {
    handle: u32,
    id: Option<PeerId>,
    shut: bool,
}

impl WebTransport {
    /// Register `id` with the PeerJS signaling server. The identity becomes
    /// usable once a `Ready` event has been polled.
    pub fn open(id: &PeerId) -> Self {
        Self {
            handle: peer_create(id.as_str()),
            id: None,
            shut: false,
        }
    }
}

impl Transport for WebTransport {
    fn local_id(&self) -> Option<&PeerId> {
        self.id.as_ref()
    }

    fn connect(&mut self, remote: &PeerId) {
        if !self.shut {
            peer_connect(self.handle, remote.as_str());
        }
    }

    fn send(&mut self, remote: &PeerId, payload: &str) -> Result<(), TransportError> {
        if self.shut {
            return Err(TransportError::Shutdown);
        }
        if peer_send(self.handle, remote.as_str(), payload) {
            Ok(())
        } else {
            Err(TransportError::NotConnected(remote.clone()))
        }
    }

    fn close(&mut self, remote: &PeerId) {
        if !self.shut {
            peer_close(self.handle, remote.as_str());
        }
    }

    fn shutdown(&mut self) {
        if self.shut {
            return;
        }
        self.shut = true;
        self.id = None;
        peer_destroy(self.handle);
    }

    fn poll_events(&mut self) -> Vec<TransportEvent> {
        if self.shut {
            return Vec::new();
        }
        let raw = peer_poll(self.handle);
        let events: Vec<JsEvent> = match serde_json::from_str(&raw) {
            Ok(events) => events,
            Err(e) => {
                log::error!("Unreadable PeerJS event batch: {e}");
                return Vec::new();
            }
        };
        events
            .into_iter()
            .map(|event| {
                if let JsEvent::Ready { id } = &event {
                    self.id = Some(id.clone());
                }
                event.into()
            })
            .collect()
    }
}

fn js_error(err: PongError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Game handle exported to the page
#[wasm_bindgen]
pub struct WebPong {
    session: PongSession<WebTransport>,
}

#[wasm_bindgen]
impl WebPong {
    /// Start a session hosting its own room. A random id is picked when
    /// `player_id` is not given.
    #[wasm_bindgen(constructor)]
    pub fn new(player_id: Option<String>) -> WebPong {
        console_error_panic_hook::set_once();
        // A second WebPong on the same page finds the logger already set
        let _ = console_log::init_with_level(log::Level::Info);

        let settings = Settings::load();
        let id = match player_id {
            Some(id) if !id.is_empty() => PeerId::new(id),
            _ => super::random_peer_id(&mut rand::rng()),
        };
        let transport = WebTransport::open(&id);
        WebPong {
            session: PongSession::new(id, transport, &settings),
        }
    }

    /// Drive one animation frame (`dt` in seconds)
    pub fn frame(&mut self, dt: f32) {
        self.session.frame(dt);
    }

    pub fn key_down(&mut self, key: &str) {
        self.session.key_down(key);
    }

    pub fn key_up(&mut self, key: &str) {
        self.session.key_up(key);
    }

    /// Window lost focus
    pub fn release_keys(&mut self) {
        self.session.release_keys();
    }

    pub fn join(&mut self, room_code: &str) -> Result<(), JsValue> {
        self.session.join(room_code).map_err(js_error)
    }

    pub fn toggle_pause(&mut self) {
        self.session.toggle_pause();
    }

    pub fn restart(&mut self) {
        self.session.restart();
    }

    pub fn cleanup(&mut self) {
        self.session.cleanup();
    }

    #[wasm_bindgen(getter)]
    pub fn room_code(&self) -> Option<String> {
        self.session.room_code().map(|id| id.to_string())
    }

    #[wasm_bindgen(getter)]
    pub fn is_authority(&self) -> bool {
        self.session.is_authority()
    }

    /// Current state in wire format, for drawing
    pub fn state_json(&self) -> Result<String, JsValue> {
        GameSnapshot::capture(self.session.state())
            .encode()
            .map_err(js_error)
    }

    /// Drain pending session events as a JSON array
    pub fn events_json(&mut self) -> Result<String, JsValue> {
        let events: Vec<SessionEvent> = self.session.drain_events();
        serde_json::to_string(&events).map_err(|e| js_error(PongError::Encode(e)))
    }
}

//! P2P Pong entry point
//!
//! The browser build is driven by the page through `WebPong`. Natively this
//! runs a headless match between two sessions over the in-process network.

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use p2p_pong::net::{LocalEndpoint, LocalNetwork, Transport};
    use p2p_pong::{PongError, PongSession, SessionEvent, Settings};

    const FRAME_DT: f32 = 1.0 / 60.0;
    const MATCH_SECONDS: u32 = 60;
    /// Dead zone around the paddle center before the script reacts
    const TRACK_SLACK: f32 = 12.0;

    /// Hold up/down to keep the local paddle centered on the ball
    fn steer<T: Transport>(session: &mut PongSession<T>) {
        let state = session.state();
        let Some(me) = state.player(session.local_id()) else {
            return;
        };
        let paddle_center = me.y + state.field.paddle_height / 2.0;
        let ball_center = state.ball.pos.y + state.field.ball_size / 2.0;
        let up = ball_center < paddle_center - TRACK_SLACK;
        let down = ball_center > paddle_center + TRACK_SLACK;

        session.release_keys();
        if up {
            session.key_down("ArrowUp");
        }
        if down {
            session.key_down("ArrowDown");
        }
    }

    fn log_events(name: &str, session: &mut PongSession<LocalEndpoint>) {
        for event in session.drain_events() {
            match event {
                SessionEvent::ScoresChanged { left, right } => {
                    log::info!("[{name}] score {left} : {right}")
                }
                other => log::debug!("[{name}] {other:?}"),
            }
        }
    }

    pub fn run() -> Result<(), PongError> {
        let settings = Settings::load();
        let network = LocalNetwork::new();

        let mut host = PongSession::new("host", network.endpoint("host")?, &settings);
        let mut guest = PongSession::new("guest", network.endpoint("guest")?, &settings);

        // Host needs one frame to announce its room code
        host.frame(FRAME_DT);
        let room = host.room_code().cloned().ok_or(PongError::TornDown)?;
        guest.join(room)?;

        for _ in 0..MATCH_SECONDS * 60 {
            steer(&mut host);
            steer(&mut guest);
            host.frame(FRAME_DT);
            guest.frame(FRAME_DT);
            log_events("host", &mut host);
            log_events("guest", &mut guest);
        }

        let state = host.state();
        for (id, score) in state.scores.iter() {
            log::info!("Final: {id} = {score}");
        }
        log::info!(
            "Host replication {:?}, guest replication {:?}",
            host.replication_stats(),
            guest.replication_stats()
        );

        guest.cleanup();
        host.cleanup();
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("P2P Pong (native) starting...");
    log::info!("Native mode runs a local demo match - build for wasm32 to play in a browser");

    if let Err(e) = demo::run() {
        log::error!("Demo failed: {e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is WebPong's constructor, this is just to satisfy the compiler
}

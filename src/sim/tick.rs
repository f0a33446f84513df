//! Authoritative physics tick
//!
//! Advances the ball one logical step: move, wall bounce, paddle deflection,
//! then goal check. Non-authority or paused sessions never get here.

use rand::Rng;

use super::collision::{goal_crossed, hits_horizontal_wall, paddle_in_path};
use super::state::{Ball, Field, GameState};
use crate::PeerId;
use crate::consts::PADDLE_NUDGE;

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    /// Whether the tick ran at all
    pub stepped: bool,
    pub wall_bounce: bool,
    /// Owner of the paddle that deflected the ball
    pub paddle_hit: Option<PeerId>,
    /// Player awarded a point
    pub scorer: Option<PeerId>,
    /// Ball was recentered after crossing a goal line
    pub ball_reset: bool,
}

/// Advance the game state by one tick. No-op unless `is_authority` and unpaused.
pub fn tick<R: Rng + ?Sized>(
    state: &mut GameState,
    is_authority: bool,
    rng: &mut R,
) -> TickOutcome {
    let mut outcome = TickOutcome::default();
    if !is_authority || state.paused {
        return outcome;
    }
    outcome.stepped = true;

    let field = state.field;
    state.ball.advance();

    if hits_horizontal_wall(&state.ball, &field) {
        state.ball.vel.y = -state.ball.vel.y;
        outcome.wall_bounce = true;
    }

    if let Some(idx) = paddle_in_path(&state.ball, &state.players, &field) {
        deflect(&mut state.ball, &field, rng);
        outcome.paddle_hit = Some(state.players[idx].id.clone());
    }

    if let Some(goal) = goal_crossed(&state.ball, &field) {
        // With one player present the ball still resets, nobody scores
        let scorer = state.player_on(goal.scoring_side()).map(|p| p.id.clone());
        if let Some(id) = &scorer {
            state.scores.increment(id);
        }
        outcome.scorer = scorer;
        state.reset_ball(rng);
        outcome.ball_reset = true;
    }

    outcome
}

/// Reverse horizontal travel and nudge the vertical speed, capped at ball speed
fn deflect<R: Rng + ?Sized>(ball: &mut Ball, field: &Field, rng: &mut R) {
    ball.vel.x = -ball.vel.x;
    let nudge = rng.random_range(-PADDLE_NUDGE..PADDLE_NUDGE);
    ball.vel.y = (ball.vel.y + nudge).clamp(-field.ball_speed, field.ball_speed);
}

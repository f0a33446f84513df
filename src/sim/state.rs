//! Game state and core simulation types
//!
//! Everything a snapshot carries lives here: players, ball, scores and the pause flag.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::PeerId;
use crate::consts::*;

/// Field geometry and per-tick speeds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Field {
    pub width: f32,
    pub height: f32,
    pub paddle_width: f32,
    pub paddle_height: f32,
    /// Paddle displacement per move request
    pub paddle_speed: f32,
    pub ball_size: f32,
    /// Ball speed on each axis after a serve (also the |dy| cap after paddle hits)
    pub ball_speed: f32,
}

impl Default for Field {
    fn default() -> Self {
        Self {
            width: FIELD_WIDTH,
            height: FIELD_HEIGHT,
            paddle_width: PADDLE_WIDTH,
            paddle_height: PADDLE_HEIGHT,
            paddle_speed: PADDLE_SPEED,
            ball_size: BALL_SIZE,
            ball_speed: BALL_SPEED,
        }
    }
}

impl Field {
    /// Paddle top edge when vertically centered
    pub fn paddle_rest_y(&self) -> f32 {
        self.height / 2.0 - self.paddle_height / 2.0
    }

    /// Lowest allowed paddle top edge
    pub fn max_paddle_y(&self) -> f32 {
        (self.height - self.paddle_height).max(0.0)
    }

    /// Paddle left edge for a side
    pub fn slot_x(&self, side: Side) -> f32 {
        match side {
            Side::Left => 0.0,
            Side::Right => self.width - self.paddle_width,
        }
    }

    /// Ball top-left corner when served from the center
    pub fn serve_position(&self) -> Vec2 {
        Vec2::new(
            self.width / 2.0 - self.ball_size / 2.0,
            self.height / 2.0 - self.ball_size / 2.0,
        )
    }
}

/// Which goal a paddle defends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn is_left(self) -> bool {
        self == Side::Left
    }
}

/// A paddle owned by one peer
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PeerId,
    pub x: f32,
    pub y: f32,
    pub is_left: bool,
}

impl Player {
    pub fn new(id: PeerId, side: Side, field: &Field) -> Self {
        Self {
            id,
            x: field.slot_x(side),
            y: field.paddle_rest_y(),
            is_left: side.is_left(),
        }
    }

    pub fn side(&self) -> Side {
        if self.is_left { Side::Left } else { Side::Right }
    }

    /// Move vertically by `direction * paddle_speed`, clamped to the field
    pub fn move_by(&mut self, direction: f32, field: &Field) {
        self.set_y(self.y + direction * field.paddle_speed, field);
    }

    pub fn set_y(&mut self, y: f32, field: &Field) {
        self.y = y.clamp(0.0, field.max_paddle_y());
    }
}

/// The ball: top-left corner position and per-tick velocity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub pos: Vec2,
    pub vel: Vec2,
}

impl Ball {
    /// Opening ball: dead center, heading down-right
    pub fn new(field: &Field) -> Self {
        Self {
            pos: Vec2::new(field.width / 2.0, field.height / 2.0),
            vel: Vec2::splat(field.ball_speed),
        }
    }

    /// Recentered ball with an independent random sign on each axis
    pub fn serve<R: Rng + ?Sized>(field: &Field, rng: &mut R) -> Self {
        let sign = |heads: bool| -> f32 { if heads { 1.0 } else { -1.0 } };
        Self {
            pos: field.serve_position(),
            vel: Vec2::new(
                field.ball_speed * sign(rng.random_bool(0.5)),
                field.ball_speed * sign(rng.random_bool(0.5)),
            ),
        }
    }

    #[inline]
    pub fn advance(&mut self) {
        self.pos += self.vel;
    }
}

/// Score per player id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreTable(BTreeMap<PeerId, u32>);

impl ScoreTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &PeerId) -> Option<u32> {
        self.0.get(id).copied()
    }

    /// Start tracking a player at zero (keeps an existing score)
    pub fn track(&mut self, id: &PeerId) {
        self.0.entry(id.clone()).or_insert(0);
    }

    pub fn remove(&mut self, id: &PeerId) -> Option<u32> {
        self.0.remove(id)
    }

    pub fn increment(&mut self, id: &PeerId) {
        *self.0.entry(id.clone()).or_insert(0) += 1;
    }

    pub fn reset(&mut self) {
        for score in self.0.values_mut() {
            *score = 0;
        }
    }

    /// Drop entries without a player and add missing ones at zero
    pub fn reconcile(&mut self, players: &[Player]) {
        self.0.retain(|id, _| players.iter().any(|p| &p.id == id));
        for player in players {
            self.track(&player.id);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PeerId, u32)> {
        self.0.iter().map(|(id, score)| (id, *score))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(PeerId, u32)> for ScoreTable {
    fn from_iter<I: IntoIterator<Item = (PeerId, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Complete replicated game state
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub field: Field,
    /// Players in join order (collision checks follow this order)
    pub players: Vec<Player>,
    pub ball: Ball,
    pub scores: ScoreTable,
    pub paused: bool,
}

impl GameState {
    pub fn new(field: Field) -> Self {
        Self {
            field,
            players: Vec::with_capacity(MAX_PLAYERS),
            ball: Ball::new(&field),
            scores: ScoreTable::new(),
            paused: false,
        }
    }

    /// Register a player in the free slot. Returns `None` when the room is
    /// full or the id is already present.
    pub fn add_player(&mut self, id: PeerId) -> Option<Side> {
        if self.is_full() || self.player(&id).is_some() {
            return None;
        }
        let side = if self.players.iter().any(|p| p.is_left) {
            Side::Right
        } else {
            Side::Left
        };
        self.scores.track(&id);
        self.players.push(Player::new(id, side, &self.field));
        Some(side)
    }

    /// Remove a player and its score entry
    pub fn remove_player(&mut self, id: &PeerId) -> bool {
        let before = self.players.len();
        self.players.retain(|p| &p.id != id);
        self.scores.remove(id);
        self.players.len() != before
    }

    pub fn player(&self, id: &PeerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn player_mut(&mut self, id: &PeerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| &p.id == id)
    }

    pub fn player_on(&self, side: Side) -> Option<&Player> {
        self.players.iter().find(|p| p.side() == side)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS
    }

    /// Move a paddle up (negative) or down (positive). Returns false for unknown ids.
    pub fn move_player(&mut self, id: &PeerId, direction: f32) -> bool {
        let field = self.field;
        match self.player_mut(id) {
            Some(player) => {
                player.move_by(direction, &field);
                true
            }
            None => false,
        }
    }

    pub fn reset_ball<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.ball = Ball::serve(&self.field, rng);
    }

    /// Zero scores, serve a fresh ball, unpause and recenter paddles.
    /// Player identities and slots are kept.
    pub fn restart<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.scores.reset();
        self.scores.reconcile(&self.players);
        self.reset_ball(rng);
        self.paused = false;
        let rest_y = self.field.paddle_rest_y();
        for player in &mut self.players {
            player.y = rest_y;
        }
    }

    /// Enforce room capacity and the score-key invariant on foreign state
    pub fn normalize(&mut self) {
        if self.players.len() > MAX_PLAYERS {
            log::warn!(
                "Dropping {} players beyond capacity",
                self.players.len() - MAX_PLAYERS
            );
            self.players.truncate(MAX_PLAYERS);
        }
        self.scores.reconcile(&self.players);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_slots_assigned_in_join_order() {
        let mut state = GameState::new(Field::default());
        assert_eq!(state.add_player("p1".into()), Some(Side::Left));
        assert_eq!(state.add_player("p2".into()), Some(Side::Right));

        let left = state.player(&"p1".into()).unwrap();
        let right = state.player(&"p2".into()).unwrap();
        assert_eq!(left.x, 0.0);
        assert!(left.is_left);
        assert_eq!(right.x, FIELD_WIDTH - PADDLE_WIDTH);
        assert!(!right.is_left);
        assert_eq!(left.y, FIELD_HEIGHT / 2.0 - PADDLE_HEIGHT / 2.0);
        assert_eq!(state.scores.get(&"p1".into()), Some(0));
        assert_eq!(state.scores.get(&"p2".into()), Some(0));
    }

    #[test]
    fn test_capacity_is_two() {
        let mut state = GameState::new(Field::default());
        for i in 0..5 {
            state.add_player(PeerId::new(format!("p{i}")));
        }
        assert_eq!(state.player_count(), 2);
        assert_eq!(state.scores.len(), 2);
        assert!(state.player(&"p2".into()).is_none());
    }

    #[test]
    fn test_duplicate_id_ignored() {
        let mut state = GameState::new(Field::default());
        state.add_player("p1".into());
        assert_eq!(state.add_player("p1".into()), None);
        assert_eq!(state.player_count(), 1);
    }

    #[test]
    fn test_freed_slot_is_reused() {
        let mut state = GameState::new(Field::default());
        state.add_player("host".into());
        state.add_player("guest".into());
        assert!(state.remove_player(&"host".into()));
        assert!(state.scores.get(&"host".into()).is_none());

        assert_eq!(state.add_player("late".into()), Some(Side::Left));
        assert_eq!(state.player_on(Side::Left).unwrap().id, PeerId::from("late"));
    }

    #[test]
    fn test_paddle_clamped() {
        let mut state = GameState::new(Field::default());
        state.add_player("p1".into());
        for _ in 0..100 {
            state.move_player(&"p1".into(), -1.0);
        }
        assert_eq!(state.player(&"p1".into()).unwrap().y, 0.0);
        for _ in 0..100 {
            state.move_player(&"p1".into(), 1.0);
        }
        assert_eq!(
            state.player(&"p1".into()).unwrap().y,
            FIELD_HEIGHT - PADDLE_HEIGHT
        );
        assert!(!state.move_player(&"ghost".into(), 1.0));
    }

    #[test]
    fn test_serve_is_centered_diagonal() {
        let field = Field::default();
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..32 {
            let ball = Ball::serve(&field, &mut rng);
            assert_eq!(ball.pos, field.serve_position());
            assert_eq!(ball.vel.x.abs(), BALL_SPEED);
            assert_eq!(ball.vel.y.abs(), BALL_SPEED);
        }
    }

    #[test]
    fn test_restart_keeps_slots() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut state = GameState::new(Field::default());
        state.add_player("p1".into());
        state.add_player("p2".into());
        state.scores.increment(&"p1".into());
        state.paused = true;
        state.move_player(&"p2".into(), 1.0);

        state.restart(&mut rng);

        assert!(!state.paused);
        assert_eq!(state.scores.get(&"p1".into()), Some(0));
        assert_eq!(state.player_count(), 2);
        assert!(state.player(&"p1".into()).unwrap().is_left);
        for player in &state.players {
            assert_eq!(player.y, state.field.paddle_rest_y());
        }
        assert_eq!(state.ball.pos, state.field.serve_position());
    }

    #[test]
    fn test_normalize_reconciles_scores() {
        let mut state = GameState::new(Field::default());
        state.add_player("p1".into());
        state.scores = [(PeerId::from("ghost"), 4)].into_iter().collect();
        state.normalize();
        assert_eq!(state.scores.get(&"p1".into()), Some(0));
        assert_eq!(state.scores.get(&"ghost".into()), None);
    }
}

//! Collision detection for the rectangular field
//!
//! Everything is an axis-aligned box anchored at its top-left corner.
//! Edge contact counts as overlap on both axes.

use glam::Vec2;

use super::state::{Ball, Field, Player, Side};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub size: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, size: Vec2) -> Self {
        Self { min, size }
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    pub fn overlaps_x(&self, other: &Aabb) -> bool {
        self.min.x <= other.max().x && self.max().x >= other.min.x
    }

    pub fn overlaps_y(&self, other: &Aabb) -> bool {
        self.min.y <= other.max().y && self.max().y >= other.min.y
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.overlaps_x(other) && self.overlaps_y(other)
    }
}

pub fn ball_bounds(ball: &Ball, field: &Field) -> Aabb {
    Aabb::new(ball.pos, Vec2::splat(field.ball_size))
}

pub fn paddle_bounds(player: &Player, field: &Field) -> Aabb {
    Aabb::new(
        Vec2::new(player.x, player.y),
        Vec2::new(field.paddle_width, field.paddle_height),
    )
}

/// Top or bottom wall contact.
///
/// The ball is not pushed back inside, so it may sit past the wall for one
/// tick before the inverted velocity carries it back.
pub fn hits_horizontal_wall(ball: &Ball, field: &Field) -> bool {
    ball.pos.y <= 0.0 || ball.pos.y > field.height - field.ball_size
}

/// Index of the first paddle the ball overlaps, considering only paddles on
/// the side the ball is travelling toward.
pub fn paddle_in_path(ball: &Ball, players: &[Player], field: &Field) -> Option<usize> {
    let heading = if ball.vel.x < 0.0 {
        Side::Left
    } else if ball.vel.x > 0.0 {
        Side::Right
    } else {
        return None;
    };
    let bounds = ball_bounds(ball, field);
    players
        .iter()
        .position(|p| p.side() == heading && bounds.overlaps(&paddle_bounds(p, field)))
}

/// Goal line crossed by the ball
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    /// Ball reached x <= 0
    Left,
    /// Ball's right edge reached the field width
    Right,
}

impl Goal {
    /// Side of the player who is awarded the point
    pub fn scoring_side(self) -> Side {
        match self {
            Goal::Left => Side::Right,
            Goal::Right => Side::Left,
        }
    }
}

pub fn goal_crossed(ball: &Ball, field: &Field) -> Option<Goal> {
    if ball.pos.x <= 0.0 {
        Some(Goal::Left)
    } else if ball.pos.x + field.ball_size >= field.width {
        Some(Goal::Right)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PeerId;

    fn players(field: &Field) -> Vec<Player> {
        vec![
            Player::new(PeerId::from("left"), Side::Left, field),
            Player::new(PeerId::from("right"), Side::Right, field),
        ]
    }

    #[test]
    fn test_aabb_edge_contact_overlaps() {
        let a = Aabb::new(Vec2::ZERO, Vec2::splat(10.0));
        let b = Aabb::new(Vec2::new(10.0, 10.0), Vec2::splat(5.0));
        assert!(a.overlaps(&b));

        let c = Aabb::new(Vec2::new(10.1, 0.0), Vec2::splat(5.0));
        assert!(!a.overlaps(&c));
        assert!(a.overlaps_y(&c));
    }

    #[test]
    fn test_wall_contact() {
        let field = Field::default();
        let mut ball = Ball::new(&field);

        ball.pos.y = 0.0;
        assert!(hits_horizontal_wall(&ball, &field));

        ball.pos.y = field.height - field.ball_size;
        assert!(!hits_horizontal_wall(&ball, &field));

        ball.pos.y += 0.5;
        assert!(hits_horizontal_wall(&ball, &field));
    }

    #[test]
    fn test_paddle_only_in_direction_of_travel() {
        let field = Field::default();
        let players = players(&field);
        let mut ball = Ball::new(&field);
        ball.pos = Vec2::new(5.0, players[0].y + 10.0);

        ball.vel = Vec2::new(-3.0, 0.0);
        assert_eq!(paddle_in_path(&ball, &players, &field), Some(0));

        // Moving away from the left paddle: no hit even while overlapping
        ball.vel = Vec2::new(3.0, 0.0);
        assert_eq!(paddle_in_path(&ball, &players, &field), None);

        ball.pos.x = field.width - field.paddle_width - 5.0;
        assert_eq!(paddle_in_path(&ball, &players, &field), Some(1));
    }

    #[test]
    fn test_paddle_vertical_miss() {
        let field = Field::default();
        let players = players(&field);
        let mut ball = Ball::new(&field);
        ball.vel = Vec2::new(-3.0, 3.0);
        ball.pos = Vec2::new(4.0, players[0].y - field.ball_size - 1.0);
        assert_eq!(paddle_in_path(&ball, &players, &field), None);

        // Bottom edge touching paddle top counts
        ball.pos.y = players[0].y - field.ball_size;
        assert_eq!(paddle_in_path(&ball, &players, &field), Some(0));
    }

    #[test]
    fn test_goal_lines() {
        let field = Field::default();
        let mut ball = Ball::new(&field);
        assert_eq!(goal_crossed(&ball, &field), None);

        ball.pos.x = 0.0;
        assert_eq!(goal_crossed(&ball, &field), Some(Goal::Left));
        assert_eq!(Goal::Left.scoring_side(), Side::Right);

        ball.pos.x = field.width - field.ball_size;
        assert_eq!(goal_crossed(&ball, &field), Some(Goal::Right));
        assert_eq!(Goal::Right.scoring_side(), Side::Left);
    }
}

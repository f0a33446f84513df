//! Authoritative simulation module
//!
//! All gameplay rules live here. This module stays free of networking and
//! platform concerns:
//! - One logical step per call, no wall-clock time
//! - Randomness only through an injected RNG
//! - Stable iteration order (players in join order)

pub mod collision;
pub mod state;
pub mod tick;

pub use collision::{Aabb, Goal, goal_crossed, hits_horizontal_wall, paddle_in_path};
pub use state::{Ball, Field, GameState, Player, ScoreTable, Side};
pub use tick::{TickOutcome, tick};

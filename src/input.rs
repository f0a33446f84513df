//! Local keyboard sampling
//!
//! Key events only flip held flags; the network tick decides what they mean.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Key names that move the local paddle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub up: String,
    pub down: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            up: "ArrowUp".to_string(),
            down: "ArrowDown".to_string(),
        }
    }
}

/// Held state per key name (last write wins)
#[derive(Debug, Clone, Default)]
pub struct InputSampler {
    held: HashMap<String, bool>,
    bindings: KeyBindings,
}

impl InputSampler {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            held: HashMap::new(),
            bindings,
        }
    }

    pub fn press(&mut self, key: &str) {
        self.held.insert(key.to_string(), true);
    }

    pub fn release(&mut self, key: &str) {
        self.held.insert(key.to_string(), false);
    }

    /// Forget every held key (e.g. window lost focus)
    pub fn release_all(&mut self) {
        self.held.clear();
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.get(key).copied().unwrap_or(false)
    }

    /// Paddle moves requested this tick, in application order: up (-1) then down (+1)
    pub fn sample(&self) -> Vec<f32> {
        let mut moves = Vec::with_capacity(2);
        if self.is_held(&self.bindings.up) {
            moves.push(-1.0);
        }
        if self.is_held(&self.bindings.down) {
            moves.push(1.0);
        }
        moves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_move_keys_count() {
        let mut input = InputSampler::new(KeyBindings::default());
        input.press("w");
        input.press(" ");
        assert!(input.sample().is_empty());

        input.press("ArrowUp");
        assert_eq!(input.sample(), vec![-1.0]);
    }

    #[test]
    fn test_release_is_last_write_wins() {
        let mut input = InputSampler::new(KeyBindings::default());
        input.press("ArrowDown");
        input.press("ArrowDown");
        input.release("ArrowDown");
        assert!(!input.is_held("ArrowDown"));
        assert!(input.sample().is_empty());
    }

    #[test]
    fn test_up_and_down_apply_in_order() {
        let mut input = InputSampler::new(KeyBindings::default());
        input.press("ArrowDown");
        input.press("ArrowUp");
        let moves = input.sample();
        assert_eq!(moves, vec![-1.0, 1.0]);
        assert_eq!(moves.iter().sum::<f32>(), 0.0);
    }

    #[test]
    fn test_custom_bindings_and_release_all() {
        let mut input = InputSampler::new(KeyBindings {
            up: "w".to_string(),
            down: "s".to_string(),
        });
        input.press("s");
        assert_eq!(input.sample(), vec![1.0]);
        input.release_all();
        assert!(input.sample().is_empty());
    }
}

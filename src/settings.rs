//! Session settings
//!
//! Field geometry, network cadence and replication policy. Persisted as JSON:
//! a file named by `P2P_PONG_SETTINGS` on native, LocalStorage on the web.

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_CATCHUP_TICKS, NET_TICK_HZ};
use crate::error::PongError;
use crate::input::KeyBindings;
use crate::net::ApplyPolicy;
use crate::sim::Field;

/// Game settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Logical field and entity sizes
    pub field: Field,

    // === Network ===
    /// Snapshot broadcast + input sampling rate (Hz)
    pub net_tick_hz: f32,
    /// Network ticks allowed in one frame when the host falls behind
    pub max_catchup_ticks: u32,
    /// How the authority treats inbound snapshots
    pub apply_policy: ApplyPolicy,

    // === Input ===
    pub keys: KeyBindings,

    /// Fixed RNG seed (random when unset)
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            field: Field::default(),
            net_tick_hz: NET_TICK_HZ,
            max_catchup_ticks: MAX_CATCHUP_TICKS,
            apply_policy: ApplyPolicy::default(),
            keys: KeyBindings::default(),
            seed: None,
        }
    }
}

impl Settings {
    /// Environment variable naming a JSON settings file (native)
    pub const ENV_PATH: &'static str = "P2P_PONG_SETTINGS";

    /// LocalStorage key
    #[cfg(target_arch = "wasm32")]
    const STORAGE_KEY: &'static str = "p2p_pong_settings";

    pub fn from_json(json: &str) -> Result<Self, PongError> {
        serde_json::from_str(json).map_err(PongError::SettingsJson)
    }

    pub fn to_json(&self) -> Result<String, PongError> {
        serde_json::to_string_pretty(self).map_err(PongError::SettingsJson)
    }

    /// Settings with a fixed seed (tests, replays)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Seed to use for this session
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }

    /// Read settings from a JSON file
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, PongError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load from the file named by `P2P_PONG_SETTINGS`, falling back to defaults
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        let Ok(path) = std::env::var(Self::ENV_PATH) else {
            log::info!("Using default settings");
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(settings) => {
                log::info!("Loaded settings from {path}");
                settings
            }
            Err(e) => {
                log::warn!("Ignoring settings file {path}: {e}");
                Self::default()
            }
        }
    }

    /// Write settings to a JSON file
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to(&self, path: impl AsRef<std::path::Path>) -> Result<(), PongError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Save to the file named by `P2P_PONG_SETTINGS`. Without it there is
    /// nowhere to save and the call only logs.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        self.save_at(std::env::var(Self::ENV_PATH).ok());
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn save_at(&self, path: Option<String>) -> bool {
        let Some(path) = path else {
            log::info!("{} not set, settings not saved", Self::ENV_PATH);
            return false;
        };
        match self.save_to(&path) {
            Ok(()) => {
                log::info!("Settings saved to {path}");
                true
            }
            Err(e) => {
                log::warn!("Could not save settings to {path}: {e}");
                false
            }
        }
    }

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {e}"),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = self.to_json() {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;

    #[test]
    fn test_defaults_are_reference_values() {
        let settings = Settings::default();
        assert_eq!(settings.field.width, FIELD_WIDTH);
        assert_eq!(settings.field.height, FIELD_HEIGHT);
        assert_eq!(settings.field.paddle_height, PADDLE_HEIGHT);
        assert_eq!(settings.field.ball_speed, BALL_SPEED);
        assert_eq!(settings.net_tick_hz, 60.0);
        assert_eq!(settings.apply_policy, ApplyPolicy::Authoritative);
        assert_eq!(settings.keys.up, "ArrowUp");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings = Settings::from_json(
            r#"{"field": {"width": 1024}, "apply_policy": "last_write_wins", "seed": 7}"#,
        )
        .unwrap();
        assert_eq!(settings.field.width, 1024.0);
        assert_eq!(settings.field.height, FIELD_HEIGHT);
        assert_eq!(settings.apply_policy, ApplyPolicy::LastWriteWins);
        assert_eq!(settings.resolve_seed(), 7);
        assert_eq!(settings.max_catchup_ticks, MAX_CATCHUP_TICKS);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(
            Settings::from_json("{\"net_tick_hz\": \"fast\"}"),
            Err(PongError::SettingsJson(_))
        ));
    }

    #[test]
    fn test_save_needs_a_path() {
        let settings = Settings::default().with_seed(3);
        assert!(!settings.save_at(None));

        let name = format!("p2p_pong_save_{}.json", std::process::id());
        let path = std::env::temp_dir().join(name);
        let path_str = path.to_string_lossy().into_owned();
        assert!(settings.save_at(Some(path_str)));
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
        let _ = std::fs::remove_file(&path);

        let missing_dir = std::env::temp_dir().join("p2p_pong_no_such_dir").join("s.json");
        assert!(!settings.save_at(Some(missing_dir.to_string_lossy().into_owned())));
    }

    #[test]
    fn test_file_round_trip() {
        let name = format!("p2p_pong_settings_{}.json", std::process::id());
        let path = std::env::temp_dir().join(name);
        let settings = Settings::default().with_seed(99);
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            Settings::load_from(&path),
            Err(PongError::SettingsIo(_))
        ));
    }
}

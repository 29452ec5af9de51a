//! Physics parameters and board settings
//!
//! The core trusts whatever `PhysicsState` it is handed. Range clamping lives
//! here, in front of it, mirroring the limits of the live-tuning controls.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Visual state of the board, chosen by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BoardMode {
    /// Ambient demo drops while waiting for players
    #[default]
    Waiting,
    /// One player on the board
    Single,
    /// Several players share the board
    Multi,
    /// Main round
    Round,
}

impl BoardMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardMode::Waiting => "waiting",
            BoardMode::Single => "single",
            BoardMode::Multi => "multi",
            BoardMode::Round => "round",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "waiting" | "idle" | "demo" => Some(BoardMode::Waiting),
            "single" => Some(BoardMode::Single),
            "multi" => Some(BoardMode::Multi),
            "round" => Some(BoardMode::Round),
            _ => None,
        }
    }

    /// Gravity multiplier applied to a live world when switching into this mode
    pub fn gravity_boost(&self) -> Option<f32> {
        match self {
            BoardMode::Single | BoardMode::Multi => Some(2.0),
            BoardMode::Waiting | BoardMode::Round => None,
        }
    }
}

/// Tunable physics snapshot, replaced wholesale when anything changes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhysicsState {
    /// Steering pull strength
    pub magnet_force: f32,
    /// Downward acceleration (m/s²)
    pub gravity: f32,
    pub restitution_ball: f32,
    pub friction_ball: f32,
    /// Ball radius in pixels (rebuild on change)
    pub ball_radius_live: f32,
    /// Peg radius in pixels (rebuild on change)
    pub peg_radius_live: f32,
    /// Strong field with live-tunable shaping, or the fixed weak profile
    pub use_magnetic_field: bool,
    pub field_strength: f32,
    pub animation_speed: f32,
    pub gradual_power: f32,
    pub horizontal_ratio: f32,
}

impl Default for PhysicsState {
    fn default() -> Self {
        Self {
            magnet_force: 13.0,
            gravity: 20.0,
            restitution_ball: 0.1,
            friction_ball: 0.01,
            ball_radius_live: BALL_RADIUS,
            peg_radius_live: PEG_RADIUS,
            use_magnetic_field: true,
            field_strength: 0.8,
            animation_speed: 1.0,
            gradual_power: 1.0,
            horizontal_ratio: 1.0,
        }
    }
}

/// Inclusive limits enforced by the tuning layer
pub mod limits {
    pub const MAGNET_FORCE: (f32, f32) = (1.0, 100.0);
    pub const GRAVITY: (f32, f32) = (0.0, 30.0);
    pub const RESTITUTION: (f32, f32) = (0.0, 1.0);
    pub const FRICTION: (f32, f32) = (0.0, 1.0);
    pub const BALL_RADIUS: (f32, f32) = (8.0, 16.0);
    pub const PEG_RADIUS: (f32, f32) = (3.0, 10.0);
    pub const FIELD_STRENGTH: (f32, f32) = (0.1, 1.0);
    pub const ANIMATION_SPEED: (f32, f32) = (0.1, 3.0);
    pub const GRADUAL_POWER: (f32, f32) = (0.5, 3.0);
    pub const HORIZONTAL_RATIO: (f32, f32) = (0.7, 1.0);
}

fn clamp_to(value: f32, (lo, hi): (f32, f32)) -> f32 {
    if value.is_nan() { lo } else { value.clamp(lo, hi) }
}

impl PhysicsState {
    /// Copy with every field pulled into its tuning range
    pub fn clamped(&self) -> Self {
        Self {
            magnet_force: clamp_to(self.magnet_force, limits::MAGNET_FORCE),
            gravity: clamp_to(self.gravity, limits::GRAVITY),
            restitution_ball: clamp_to(self.restitution_ball, limits::RESTITUTION),
            friction_ball: clamp_to(self.friction_ball, limits::FRICTION),
            ball_radius_live: clamp_to(self.ball_radius_live, limits::BALL_RADIUS),
            peg_radius_live: clamp_to(self.peg_radius_live, limits::PEG_RADIUS),
            use_magnetic_field: self.use_magnetic_field,
            field_strength: clamp_to(self.field_strength, limits::FIELD_STRENGTH),
            animation_speed: clamp_to(self.animation_speed, limits::ANIMATION_SPEED),
            gradual_power: clamp_to(self.gradual_power, limits::GRADUAL_POWER),
            horizontal_ratio: clamp_to(self.horizontal_ratio, limits::HORIZONTAL_RATIO),
        }
    }

    /// True when `other` can be applied to a live world without a rebuild
    pub fn same_geometry(&self, other: &PhysicsState) -> bool {
        self.ball_radius_live == other.ball_radius_live
            && self.peg_radius_live == other.peg_radius_live
    }
}

/// Partial physics update sent by the host; absent fields keep their value
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhysicsOverrides {
    pub magnet_force: Option<f32>,
    pub gravity: Option<f32>,
    pub restitution_ball: Option<f32>,
    pub friction_ball: Option<f32>,
    pub ball_radius_live: Option<f32>,
    pub peg_radius_live: Option<f32>,
    pub use_magnetic_field: Option<bool>,
    pub field_strength: Option<f32>,
    pub animation_speed: Option<f32>,
    pub gradual_power: Option<f32>,
    pub horizontal_ratio: Option<f32>,
}

impl PhysicsOverrides {
    /// Merge over `base`, then clamp
    pub fn apply_to(&self, base: &PhysicsState) -> PhysicsState {
        PhysicsState {
            magnet_force: self.magnet_force.unwrap_or(base.magnet_force),
            gravity: self.gravity.unwrap_or(base.gravity),
            restitution_ball: self.restitution_ball.unwrap_or(base.restitution_ball),
            friction_ball: self.friction_ball.unwrap_or(base.friction_ball),
            ball_radius_live: self.ball_radius_live.unwrap_or(base.ball_radius_live),
            peg_radius_live: self.peg_radius_live.unwrap_or(base.peg_radius_live),
            use_magnetic_field: self.use_magnetic_field.unwrap_or(base.use_magnetic_field),
            field_strength: self.field_strength.unwrap_or(base.field_strength),
            animation_speed: self.animation_speed.unwrap_or(base.animation_speed),
            gradual_power: self.gradual_power.unwrap_or(base.gradual_power),
            horizontal_ratio: self.horizontal_ratio.unwrap_or(base.horizontal_ratio),
        }
        .clamped()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Board configuration persisted by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoardSettings {
    pub physics: PhysicsState,
    pub mode: BoardMode,
    /// Delay between landing and the completion notification (ms)
    pub completion_delay_ms: f64,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            physics: PhysicsState::default(),
            mode: BoardMode::Waiting,
            completion_delay_ms: 0.0,
        }
    }
}

impl BoardSettings {
    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "plinko_drop_settings";

    /// Parse settings; physics values are clamped into range
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: BoardSettings = serde_json::from_str(json)?;
        settings.physics = settings.physics.clamped();
        settings.completion_delay_ms = settings.completion_delay_ms.max(0.0);
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load settings from a JSON file, falling back to defaults
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Invalid settings in {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Cannot read {}: {}", path.display(), e);
                log::info!("Using default settings");
                Self::default()
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
                if let Ok(settings) = Self::from_json(&json) {
                    log::info!("Loaded settings from LocalStorage");
                    return settings;
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
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_in_range() {
        let physics = PhysicsState::default();
        assert_eq!(physics.clamped(), physics);
        assert_eq!(physics.ball_radius_live, 16.0);
        assert_eq!(physics.peg_radius_live, 3.0);
        assert!(physics.use_magnetic_field);
    }

    #[test]
    fn test_clamped_pulls_values_into_range() {
        let wild = PhysicsState {
            magnet_force: 500.0,
            gravity: -3.0,
            horizontal_ratio: 0.1,
            animation_speed: f32::NAN,
            ..Default::default()
        };
        let clamped = wild.clamped();
        assert_eq!(clamped.magnet_force, 100.0);
        assert_eq!(clamped.gravity, 0.0);
        assert_eq!(clamped.horizontal_ratio, 0.7);
        assert_eq!(clamped.animation_speed, 0.1);
    }

    #[test]
    fn test_overrides_merge_partial_json() {
        let overrides = PhysicsOverrides::from_json(r#"{"gravity": 12.5, "ballRadiusLive": 10}"#)
            .expect("valid overrides");
        let merged = overrides.apply_to(&PhysicsState::default());
        assert_eq!(merged.gravity, 12.5);
        assert_eq!(merged.ball_radius_live, 10.0);
        assert_eq!(merged.magnet_force, 13.0);
        assert!(!merged.same_geometry(&PhysicsState::default()));
    }

    #[test]
    fn test_settings_json_roundtrip_keeps_mode() {
        let json = r#"{"mode": "multi", "completionDelayMs": 250, "physics": {
            "magnetForce": 20, "gravity": 20, "restitutionBall": 0.1, "frictionBall": 0.01,
            "ballRadiusLive": 12, "pegRadiusLive": 4, "useMagneticField": false,
            "fieldStrength": 0.5, "animationSpeed": 2, "gradualPower": 1.5, "horizontalRatio": 0.8
        }}"#;
        let settings = BoardSettings::from_json(json).expect("valid settings");
        assert_eq!(settings.mode, BoardMode::Multi);
        assert_eq!(settings.completion_delay_ms, 250.0);
        assert!(!settings.physics.use_magnetic_field);

        let back = BoardSettings::from_json(&settings.to_json().expect("serializes")).expect("parses");
        assert_eq!(back, settings);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings = BoardSettings::from_json("{}").expect("empty object is valid");
        assert_eq!(settings, BoardSettings::default());
        assert!(BoardSettings::from_json("not json").is_err());
    }

    #[test]
    fn test_board_mode_parsing() {
        assert_eq!(BoardMode::from_str("Single"), Some(BoardMode::Single));
        assert_eq!(BoardMode::from_str("demo"), Some(BoardMode::Waiting));
        assert_eq!(BoardMode::from_str("bogus"), None);
        assert_eq!(BoardMode::Multi.gravity_boost(), Some(2.0));
        assert_eq!(BoardMode::Round.gravity_boost(), None);
        assert_eq!(BoardMode::Round.as_str(), "round");
    }
}

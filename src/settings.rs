//! Rider tuning
//!
//! Every gameplay constant that designers tweak lives here. Loaded from JSON;
//! missing fields fall back to the defaults below.

use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed settings JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Ground probes and slope alignment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundSettings {
    /// Nose probe anchor (board space)
    pub nose_anchor: Vec3,
    /// Tail probe anchor (board space)
    pub tail_anchor: Vec3,
    /// Maximum probe distance below each anchor
    pub probe_distance: f32,
    /// Layer mask the probes test against
    pub ground_mask: u32,
    /// Slerp rate for slope alignment (per second)
    pub align_rate: f32,
    /// Nose/tail raise angle for manuals (degrees)
    pub manual_tilt_deg: f32,
    /// Yaw offset held while pivoting (degrees)
    pub manual_turn_deg: f32,
    /// Slerp rate for manual tilt/turn (per second)
    pub manual_rate: f32,
}

impl Default for GroundSettings {
    fn default() -> Self {
        Self {
            nose_anchor: Vec3::new(0.0, 0.1, 0.4),
            tail_anchor: Vec3::new(0.0, 0.1, -0.4),
            probe_distance: 0.3,
            ground_mask: crate::consts::GROUND_LAYER,
            align_rate: 10.0,
            manual_tilt_deg: 12.0,
            manual_turn_deg: 60.0,
            manual_rate: 12.0,
        }
    }
}

/// Forward push, steering and jumping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionSettings {
    /// Speed the board coasts back to when nothing is held
    pub cruise_speed: f32,
    pub max_speed: f32,
    pub push_accel: f32,
    pub brake_decel: f32,
    pub coast_decel: f32,
    /// Lateral speed while steering
    pub steer_speed: f32,
    /// Minimum jump impulse (tap)
    pub jump_min: f32,
    /// Maximum jump impulse (full charge)
    pub jump_max: f32,
    /// Impulse gained per second of holding jump
    pub jump_charge_rate: f32,
    /// Gravity (m/s², negative is down)
    pub gravity: f32,
    /// Board height above the ground contact
    pub ride_height: f32,
}

impl Default for LocomotionSettings {
    fn default() -> Self {
        Self {
            cruise_speed: 6.0,
            max_speed: 12.0,
            push_accel: 4.0,
            brake_decel: 8.0,
            coast_decel: 1.5,
            steer_speed: 3.0,
            jump_min: 4.0,
            jump_max: 7.0,
            jump_charge_rate: 6.0,
            gravity: -9.81,
            ride_height: 0.1,
        }
    }
}

/// Trick timing and stance lean
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrickSettings {
    /// Seconds to complete one trick
    pub duration: f32,
    /// Seconds after the original start during which a second input upgrades the trick
    pub combo_window: f32,
    /// Yaw lean into turns (degrees)
    pub lean_deg: f32,
    /// Lateral speed below which the rider does not lean
    pub lean_threshold: f32,
    /// Slerp rate for lean (per second)
    pub lean_rate: f32,
}

impl Default for TrickSettings {
    fn default() -> Self {
        Self {
            duration: 0.5,
            combo_window: 0.2,
            lean_deg: 35.0,
            lean_threshold: 0.3,
            lean_rate: 8.0,
        }
    }
}

/// 180° turn maneuver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnSettings {
    pub duration: f32,
    /// Total signed angle magnitude (degrees)
    pub angle_deg: f32,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            duration: 0.4,
            angle_deg: 180.0,
        }
    }
}

/// Rail grinding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrindSettings {
    /// Constant speed along the rail
    pub speed: f32,
    /// Rotation alignment rate (per second)
    pub align_speed: f32,
    /// Position easing rate (per second)
    pub position_ease: f32,
    /// Board clearance above the rail
    pub clearance: f32,
    /// Forward kick added when leaving the rail
    pub exit_kick: f32,
    /// Seconds before another grind may start
    pub cooldown: f32,
    /// Maximum horizontal distance from the rail to catch it
    pub catch_radius: f32,
}

impl Default for GrindSettings {
    fn default() -> Self {
        Self {
            speed: 8.0,
            align_speed: 15.0,
            position_ease: 25.0,
            clearance: 0.1,
            exit_kick: 1.5,
            cooldown: 0.5,
            catch_radius: 0.6,
        }
    }
}

/// Foot targets for leg IK
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeetSettings {
    /// Back (left) foot anchor on the board
    pub back_anchor: Vec3,
    /// Front (right) foot anchor on the board
    pub front_anchor: Vec3,
    /// Height the feet rise to during tricks
    pub lift_height: f32,
    /// Lift blend rate (per second)
    pub lift_rate: f32,
    /// Board yaw past which the feet swap anchors (degrees)
    pub swap_yaw_deg: f32,
}

impl Default for FeetSettings {
    fn default() -> Self {
        Self {
            back_anchor: Vec3::new(0.0, 0.05, -0.22),
            front_anchor: Vec3::new(0.0, 0.05, 0.22),
            lift_height: 0.25,
            lift_rate: 6.0,
            swap_yaw_deg: 120.0,
        }
    }
}

/// Leg IK
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IkSettings {
    pub enabled: bool,
    /// Blend between the rig's own pose (0) and the IK target (1)
    pub weight: f32,
}

impl Default for IkSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            weight: 1.0,
        }
    }
}

/// Scoreboard behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    /// Multiplier gained per extra trick in a line
    pub line_step: f32,
    /// Displayed score lerp speed (per second)
    pub display_lerp: f32,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            line_step: 0.5,
            display_lerp: 5.0,
        }
    }
}

/// All rider tuning
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ground: GroundSettings,
    pub locomotion: LocomotionSettings,
    pub trick: TrickSettings,
    pub turn: TurnSettings,
    pub grind: GrindSettings,
    pub feet: FeetSettings,
    pub ik: IkSettings,
    pub scoring: ScoringSettings,
}

impl Settings {
    /// Parse settings from JSON, filling gaps with defaults
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Write settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        log::info!("Settings saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let positive = [
            ("ground.probe_distance", self.ground.probe_distance),
            ("trick.duration", self.trick.duration),
            ("turn.duration", self.turn.duration),
            ("grind.speed", self.grind.speed),
            ("locomotion.max_speed", self.locomotion.max_speed),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(SettingsError::Invalid {
                    field,
                    reason: format!("must be positive, got {value}"),
                });
            }
        }

        let non_negative = [
            ("trick.combo_window", self.trick.combo_window),
            ("grind.cooldown", self.grind.cooldown),
            ("grind.clearance", self.grind.clearance),
            ("feet.lift_height", self.feet.lift_height),
        ];
        for (field, value) in non_negative {
            if !(value >= 0.0) {
                return Err(SettingsError::Invalid {
                    field,
                    reason: format!("must not be negative, got {value}"),
                });
            }
        }

        if self.locomotion.jump_min > self.locomotion.jump_max {
            return Err(SettingsError::Invalid {
                field: "locomotion.jump_min",
                reason: "exceeds locomotion.jump_max".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.ik.weight) {
            return Err(SettingsError::Invalid {
                field: "ik.weight",
                reason: format!("must be within [0, 1], got {}", self.ik.weight),
            });
        }
        Ok(())
    }
}

//! Rider state and core simulation types
//!
//! Everything one tick reads or writes lives in [`RiderState`]. Each flag has
//! a single owner: ground flags belong to the ground sensor, the trick state to
//! the trick machine, and so on; `tick` only sequences them.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::feet::FootResolver;
use super::grind::{GrindCooldown, GrindExit, GrindFollower, GrindKind};
use super::ground::GroundState;
use super::ik::{LegBones, LegRig};
use super::locomotion::SkaterBody;
use super::trick::{TrickKind, TrickLine, TrickState};
use super::turn::TurnManeuver;
use super::world::BodyId;

/// Visual mesh orientation, separate from the physics body
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualRig {
    /// Board mesh yaw on top of the body rotation (degrees)
    pub board_yaw: f32,
    /// Character mesh yaw (degrees)
    pub character_yaw: f32,
    /// Character mesh is horizontally mirrored (switch stance)
    pub mirrored: bool,
}

impl VisualRig {
    /// Mirror when the character faces backwards
    pub fn update_mirror(&mut self) {
        self.mirrored = self.character_yaw.to_radians().cos() < 0.0;
    }

    pub fn character_rotation(&self) -> Quat {
        Quat::from_rotation_y(self.character_yaw.to_radians())
    }

    pub fn board_rotation(&self, body: Quat) -> Quat {
        (body * Quat::from_rotation_y(self.board_yaw.to_radians())).normalize()
    }
}

/// Things that happened during a tick, for scoring, clips and logging
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RiderEvent {
    Jumped { impulse: f32 },
    Landed { manual: bool },
    ManualStarted { nose: bool },
    ManualEnded,
    TrickStarted(TrickKind),
    ComboUpgraded { from: TrickKind, to: TrickKind },
    TrickCompleted(TrickKind),
    TrickCancelled(TrickKind),
    GrindStarted(GrindKind),
    GrindEnded(GrindExit),
    TurnStarted { direction: f32 },
    TurnCompleted { mirrored: bool },
    MultiplierChanged(f32),
    Slammed,
    Respawned,
}

/// Bound legs; a leg that failed to bind stays `None` and is skipped
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Legs {
    pub back: Option<LegRig>,
    pub front: Option<LegRig>,
}

impl Legs {
    /// Bind both legs, logging (once) any leg that cannot be used
    pub fn bind(back: &LegBones, front: &LegBones) -> Self {
        let bind = |name: &str, bones: &LegBones| match LegRig::bind(bones) {
            Ok(rig) => {
                log::info!(
                    "Bound {name} leg: upper {:.3}, lower {:.3}",
                    rig.upper,
                    rig.lower
                );
                Some(rig)
            }
            Err(e) => {
                log::warn!("Leg IK disabled for {name} leg: {e}");
                None
            }
        };
        Self {
            back: bind("back", back),
            front: bind("front", front),
        }
    }
}

/// Complete rider state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiderState {
    /// Simulation clock (seconds)
    pub clock: f64,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub body: SkaterBody,
    pub ground: GroundState,
    pub trick: TrickState,
    pub line: TrickLine,
    pub turn: Option<TurnManeuver>,
    pub grind: Option<GrindFollower>,
    /// Rail body being ground, for matching contact-end events
    pub grind_body: Option<BodyId>,
    pub grind_cooldown: GrindCooldown,
    pub visual: VisualRig,
    pub feet: FootResolver,
    pub legs: Legs,
    pub slammed: bool,
    /// Where a respawn puts the rider
    pub spawn: Vec3,
    /// Events raised by the last tick
    #[serde(skip)]
    pub events: Vec<RiderEvent>,
}

impl RiderState {
    /// Rider rolling forward at cruise speed from `spawn`
    pub fn new(spawn: Vec3, cruise_speed: f32) -> Self {
        Self {
            clock: 0.0,
            time_ticks: 0,
            body: SkaterBody::new(spawn, cruise_speed),
            ground: GroundState::default(),
            trick: TrickState::default(),
            line: TrickLine::default(),
            turn: None,
            grind: None,
            grind_body: None,
            grind_cooldown: GrindCooldown::default(),
            visual: VisualRig::default(),
            feet: FootResolver::default(),
            legs: Legs::default(),
            slammed: false,
            spawn,
            events: Vec::new(),
        }
    }

    pub fn with_legs(mut self, legs: Legs) -> Self {
        self.legs = legs;
        self
    }

    pub fn grinding(&self) -> bool {
        self.grind.is_some()
    }

    /// Put the rider back at the spawn point, keeping the clock
    pub fn reset_to_spawn(&mut self, cruise_speed: f32) {
        self.body = SkaterBody::new(self.spawn, cruise_speed);
        self.ground = GroundState::default();
        self.trick = TrickState::default();
        self.line.end();
        self.turn = None;
        self.grind = None;
        self.grind_body = None;
        self.visual = VisualRig::default();
        self.feet = FootResolver::default();
        self.slammed = false;
    }

    pub(crate) fn emit(&mut self, event: RiderEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_follows_facing() {
        let mut rig = VisualRig::default();
        rig.update_mirror();
        assert!(!rig.mirrored);
        rig.character_yaw = 180.0;
        rig.update_mirror();
        assert!(rig.mirrored);
        rig.character_yaw = -540.0;
        rig.update_mirror();
        assert!(rig.mirrored);
        rig.character_yaw = 360.0;
        rig.update_mirror();
        assert!(!rig.mirrored);
    }

    #[test]
    fn test_leg_bind_failure_is_local() {
        let mut broken = LegBones::standing(0.12);
        broken.tip = None;
        let legs = Legs::bind(&LegBones::standing(-0.12), &broken);
        assert!(legs.back.is_some());
        assert!(legs.front.is_none());
    }

    #[test]
    fn test_reset_to_spawn() {
        let mut state = RiderState::new(Vec3::new(0.0, 0.1, 0.0), 6.0);
        state.body.position = Vec3::new(3.0, 2.0, 40.0);
        state.slammed = true;
        state.line.record_move();
        state.visual.character_yaw = 180.0;
        state.reset_to_spawn(6.0);
        assert_eq!(state.body.position, Vec3::new(0.0, 0.1, 0.0));
        assert!(!state.slammed);
        assert_eq!(state.line.pending, 0);
        assert_eq!(state.visual, VisualRig::default());
    }
}

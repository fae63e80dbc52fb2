//! Nose/tail ground probes and slope alignment
//!
//! The rider counts as grounded only when both probes hit ground and the body
//! is not rising. Landing, trick cancellation and grind exit all use this one
//! policy, so an edge contact with a single probe never lands a trick.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::world::{PhysicsWorld, RayHit};
use crate::consts::WORLD_UP;
use crate::settings::GroundSettings;
use crate::{delta_degrees, ease_rotation, euler_degrees, look_rotation, rotation_from_euler};

/// Change in grounded state over one probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundTransition {
    None,
    Landed,
    LeftGround,
}

/// Ground contact and manual balance flags
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroundState {
    pub grounded: bool,
    pub nose_raised: bool,
    pub tail_raised: bool,
    /// Pivot yaw offset held
    pub manual_turn: bool,
    /// -1 or +1 while pivoting
    pub pivot_direction: f32,
    pub nose_hit: Option<RayHit>,
    pub tail_hit: Option<RayHit>,
}

impl GroundState {
    /// Nose or tail raised
    pub fn in_manual(&self) -> bool {
        self.nose_raised || self.tail_raised
    }

    /// Cast both probes and update the grounded flag
    pub fn sense(
        &mut self,
        world: &impl PhysicsWorld,
        position: Vec3,
        rotation: Quat,
        vertical_velocity: f32,
        tuning: &GroundSettings,
    ) -> GroundTransition {
        let probe = |anchor: Vec3| {
            world.raycast(
                position + rotation * anchor,
                -WORLD_UP,
                tuning.probe_distance,
                tuning.ground_mask,
            )
        };
        self.nose_hit = probe(tuning.nose_anchor);
        self.tail_hit = probe(tuning.tail_anchor);

        let was = self.grounded;
        self.grounded =
            self.nose_hit.is_some() && self.tail_hit.is_some() && vertical_velocity <= 0.0;

        match (was, self.grounded) {
            (false, true) => GroundTransition::Landed,
            (true, false) => {
                // Balance poses only exist on the ground
                self.nose_raised = false;
                self.tail_raised = false;
                self.manual_turn = false;
                GroundTransition::LeftGround
            }
            _ => GroundTransition::None,
        }
    }

    /// Apply manual tilt intent. Raising both ends at once cancels out.
    ///
    /// Returns true when a manual has just begun.
    pub fn set_manual(&mut self, nose: bool, tail: bool) -> bool {
        let was = self.in_manual();
        if !self.grounded || nose == tail {
            self.nose_raised = false;
            self.tail_raised = false;
        } else {
            self.nose_raised = nose;
            self.tail_raised = tail;
        }
        !was && self.in_manual()
    }

    /// Apply pivot intent (`direction` 0 releases)
    pub fn set_pivot(&mut self, direction: f32) {
        if self.grounded && direction != 0.0 {
            self.manual_turn = true;
            self.pivot_direction = direction.signum();
        } else {
            self.manual_turn = false;
            self.pivot_direction = 0.0;
        }
    }

    /// Ground height under the board midpoint
    pub fn height(&self) -> Option<f32> {
        match (self.nose_hit, self.tail_hit) {
            (Some(nose), Some(tail)) => Some((nose.point.y + tail.point.y) * 0.5),
            (Some(hit), None) | (None, Some(hit)) => Some(hit.point.y),
            (None, None) => None,
        }
    }

    /// Pitch/roll (degrees) that lay the board along the tail->nose slope
    pub fn slope_euler(&self) -> Option<Vec3> {
        let (nose, tail) = (self.nose_hit?, self.tail_hit?);
        let dir = (nose.point - tail.point).normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }
        let right = dir.cross(WORLD_UP).normalize_or_zero();
        if right == Vec3::ZERO {
            return None;
        }
        let up = right.cross(dir).normalize();
        Some(euler_degrees(look_rotation(dir, up)))
    }

    /// Blend the board toward the slope, manual tilt and pivot targets.
    ///
    /// Yaw is never driven by the slope; only a held pivot changes it.
    pub fn align(&self, rotation: Quat, tuning: &GroundSettings, dt: f32) -> Quat {
        if !self.grounded {
            return rotation;
        }
        let current = euler_degrees(rotation);
        let mut target = current;

        if self.manual_turn {
            let base = if delta_degrees(current.y, 0.0).abs() <= 90.0 {
                0.0
            } else {
                180.0
            };
            target.y = base + self.pivot_direction * tuning.manual_turn_deg;
        } else if let Some(slope) = self.slope_euler() {
            target.x = slope.x;
            target.z = slope.z;
        }

        let rate = if self.in_manual() || self.manual_turn {
            tuning.manual_rate
        } else {
            tuning.align_rate
        };
        if self.nose_raised {
            target.x -= tuning.manual_tilt_deg;
        } else if self.tail_raised {
            target.x += tuning.manual_tilt_deg;
        }

        // Keep yaw continuous so the slerp never takes the long way round
        target.y = current.y + delta_degrees(current.y, target.y);
        ease_rotation(rotation, rotation_from_euler(target), rate, dt)
    }
}

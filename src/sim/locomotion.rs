//! Rigid-body locomotion: push, steer, jump, gravity and ground snap

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::world::PhysicsWorld;
use crate::approach;
use crate::consts::{WORLD_FORWARD, WORLD_RIGHT, WORLD_UP};
use crate::settings::LocomotionSettings;

/// The skater's rigid body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkaterBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Quat,
    /// Speed along the run (+Z)
    pub forward_speed: f32,
    /// Signed lateral speed (+X is right)
    pub steer_speed: f32,
}

impl SkaterBody {
    pub fn new(position: Vec3, forward_speed: f32) -> Self {
        Self {
            position,
            velocity: WORLD_FORWARD * forward_speed,
            rotation: Quat::IDENTITY,
            forward_speed,
            steer_speed: 0.0,
        }
    }

    /// Lateral component of the current velocity
    pub fn lateral_velocity(&self) -> f32 {
        self.velocity.dot(WORLD_RIGHT)
    }
}

/// Directional intent for one tick
#[derive(Debug, Clone, Copy, Default)]
pub struct DriveIntent {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

/// Update forward and steer speeds from intent
pub fn drive(body: &mut SkaterBody, intent: DriveIntent, tuning: &LocomotionSettings, dt: f32) {
    body.forward_speed = if intent.forward {
        (body.forward_speed + tuning.push_accel * dt).min(tuning.max_speed)
    } else if intent.backward {
        (body.forward_speed - tuning.brake_decel * dt).max(0.0)
    } else {
        approach(body.forward_speed, tuning.cruise_speed, tuning.coast_decel * dt)
    };

    let steer = match (intent.left, intent.right) {
        (true, false) => -1.0,
        (false, true) => 1.0,
        _ => 0.0,
    };
    body.steer_speed = steer * tuning.steer_speed;
}

/// Vertical impulse for a jump held for `hold` seconds
pub fn jump_impulse(hold: f32, tuning: &LocomotionSettings) -> f32 {
    (tuning.jump_min + hold.max(0.0) * tuning.jump_charge_rate).clamp(tuning.jump_min, tuning.jump_max)
}

/// Move `position` onto the ground below (or slightly above) it.
///
/// Casts down from `max_snap` above the position over twice that distance.
/// Returns the snapped position and whether ground was found.
pub fn snap_to_ground(
    world: &impl PhysicsWorld,
    position: Vec3,
    max_snap: f32,
    ride_height: f32,
    mask: u32,
) -> (Vec3, bool) {
    if max_snap <= 0.0 {
        return (position, false);
    }
    let origin = position + WORLD_UP * max_snap;
    match world.raycast(origin, -WORLD_UP, max_snap * 2.0, mask) {
        Some(hit) => (Vec3::new(position.x, hit.point.y + ride_height, position.z), true),
        None => (position, false),
    }
}

/// Integrate one physics step.
///
/// On the ground the horizontal velocity is re-derived from the speeds and the
/// board is kept at ride height; in the air it is carried and gravity acts.
pub fn integrate(
    body: &mut SkaterBody,
    world: &impl PhysicsWorld,
    grounded: bool,
    tuning: &LocomotionSettings,
    ground_mask: u32,
    dt: f32,
) {
    if grounded {
        body.velocity.x = body.steer_speed;
        body.velocity.z = body.forward_speed;
        body.velocity.y = body.velocity.y.max(0.0);
    } else {
        body.velocity.y += tuning.gravity * dt;
    }

    body.position += body.velocity * dt;

    if grounded && body.velocity.y <= 0.0 {
        let (snapped, found) =
            snap_to_ground(world, body.position, 0.25, tuning.ride_height, ground_mask);
        if found {
            body.position = snapped;
            body.velocity.y = 0.0;
        }
    }
}

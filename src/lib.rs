//! Skateline - real-time skater motion core
//!
//! Core modules:
//! - `sim`: Deterministic rider simulation (locomotion, tricks, grinds, leg IK)
//! - `settings`: Data-driven tuning loaded from JSON
//! - `scoring`: Score/multiplier/recent-trick collaborator
//! - `cues`: Fire-and-forget animation clip requests

pub mod cues;
pub mod scoring;
pub mod settings;
pub mod sim;

pub use scoring::{ScoreBoard, ScoreSink};
pub use settings::{Settings, SettingsError};

use glam::{EulerRot, Mat3, Quat, Vec3};

/// Simulation configuration constants
pub mod consts {
    use glam::Vec3;

    /// Fixed simulation timestep (120 Hz physics rate)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// World up axis (+Y). Forward is +Z, right is +X.
    pub const WORLD_UP: Vec3 = Vec3::Y;
    pub const WORLD_FORWARD: Vec3 = Vec3::Z;
    pub const WORLD_RIGHT: Vec3 = Vec3::X;

    /// Layer bits for ray queries
    pub const GROUND_LAYER: u32 = 1 << 0;
    pub const RAIL_LAYER: u32 = 1 << 1;

    /// Length of the recent-tricks display queue
    pub const RECENT_TRICKS: usize = 3;
}

/// Wrap an angle in degrees to [-180, 180)
#[inline]
pub fn wrap_degrees(angle: f32) -> f32 {
    (angle + 180.0).rem_euclid(360.0) - 180.0
}

/// Snap an angle (degrees) to the nearest multiple of `step`
#[inline]
pub fn snap_degrees(angle: f32, step: f32) -> f32 {
    (angle / step).round() * step
}

/// Shortest signed difference `to - from` in degrees
#[inline]
pub fn delta_degrees(from: f32, to: f32) -> f32 {
    wrap_degrees(to - from)
}

/// Euler angles (degrees) of a rotation: x = pitch, y = yaw, z = roll.
///
/// Rotation order is yaw, then pitch, then roll (`EulerRot::YXZ`).
pub fn euler_degrees(rotation: Quat) -> Vec3 {
    let (yaw, pitch, roll) = rotation.to_euler(EulerRot::YXZ);
    Vec3::new(pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees())
}

/// Inverse of [`euler_degrees`]
pub fn rotation_from_euler(euler: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        euler.y.to_radians(),
        euler.x.to_radians(),
        euler.z.to_radians(),
    )
}

/// Yaw (degrees) of a rotation
#[inline]
pub fn yaw_degrees(rotation: Quat) -> f32 {
    euler_degrees(rotation).y
}

/// Rotation that maps local +Z to `forward` and keeps local +Y as close to `up` as possible.
///
/// Falls back to identity when `forward` is degenerate, and to a world-axis up when
/// `forward` is parallel to `up`.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let f = forward.normalize_or_zero();
    if f == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let mut right = up.cross(f);
    if right.length_squared() < 1e-8 {
        right = consts::WORLD_FORWARD.cross(f);
        if right.length_squared() < 1e-8 {
            right = consts::WORLD_RIGHT;
        }
    }
    let right = right.normalize();
    let up = f.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, up, f)).normalize()
}

/// Spherical blend toward `target` by `rate * dt`, clamped so it never overshoots
#[inline]
pub fn ease_rotation(current: Quat, target: Quat, rate: f32, dt: f32) -> Quat {
    current.slerp(target, (rate * dt).clamp(0.0, 1.0)).normalize()
}

/// Move a scalar toward `target` by at most `max_delta`
#[inline]
pub fn approach(current: f32, target: f32, max_delta: f32) -> f32 {
    if current < target {
        (current + max_delta).min(target)
    } else {
        (current - max_delta).max(target)
    }
}

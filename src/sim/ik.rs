//! Analytic two-bone leg IK
//!
//! Each leg is a root (hip), mid (knee) and tip (ankle) joint. Solving is a
//! closed-form law-of-cosines step; a pole direction picks which of the two
//! knee solutions is used. Joint poses live in character space.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{WORLD_FORWARD, WORLD_RIGHT, WORLD_UP};

/// Keeps the IK triangle strictly solvable
pub const IK_EPSILON: f32 = 1e-4;

/// Leg rig faults, detected at bind time
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RigError {
    #[error("leg rig is missing its {0} bone")]
    MissingBone(&'static str),
    #[error("leg rig {0} segment has zero length")]
    ZeroLength(&'static str),
}

/// Joint transform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl JointPose {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }
}

/// Bones exposed by the mesh/rig collaborator; any may be missing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegBones {
    pub root: Option<JointPose>,
    pub mid: Option<JointPose>,
    pub tip: Option<JointPose>,
}

impl LegBones {
    /// A slightly bent standing leg `lateral` units to the side of the character origin
    pub fn standing(lateral: f32) -> Self {
        Self {
            root: Some(JointPose::at(Vec3::new(lateral, 0.85, 0.0))),
            mid: Some(JointPose::at(Vec3::new(lateral, 0.45, 0.08))),
            tip: Some(JointPose::at(Vec3::new(lateral, 0.05, 0.0))),
        }
    }
}

/// Solved positions for one leg
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegSolve {
    /// Bend of the upper segment away from the root->target line (radians)
    pub bend: f32,
    pub mid: Vec3,
    pub tip: Vec3,
}

/// Law of cosines: angle at the root between the upper segment and the
/// root->target line. The cosine is clamped so the result is always real.
pub fn bend_angle(upper: f32, lower: f32, distance: f32) -> f32 {
    let denom = 2.0 * upper * distance;
    if denom <= f32::EPSILON {
        return 0.0;
    }
    let cos = (upper * upper + distance * distance - lower * lower) / denom;
    cos.clamp(-1.0, 1.0).acos()
}

/// One bound leg
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegRig {
    pub root: JointPose,
    pub mid: JointPose,
    pub tip: JointPose,
    pub upper: f32,
    pub lower: f32,
    /// Bone axis of the root joint in its local frame
    root_axis: Vec3,
    /// Bone axis of the mid joint in its local frame
    mid_axis: Vec3,
    default_pole: Vec3,
    pole_sign: f32,
}

impl LegRig {
    /// Measure a leg from its bind pose
    pub fn bind(bones: &LegBones) -> Result<Self, RigError> {
        let root = bones.root.ok_or(RigError::MissingBone("root"))?;
        let mid = bones.mid.ok_or(RigError::MissingBone("mid"))?;
        let tip = bones.tip.ok_or(RigError::MissingBone("tip"))?;

        let upper_vec = mid.position - root.position;
        let lower_vec = tip.position - mid.position;
        let upper = upper_vec.length();
        let lower = lower_vec.length();
        if upper < 1e-5 {
            return Err(RigError::ZeroLength("upper"));
        }
        if lower < 1e-5 {
            return Err(RigError::ZeroLength("lower"));
        }

        Ok(Self {
            root,
            mid,
            tip,
            upper,
            lower,
            root_axis: (root.rotation.inverse() * (upper_vec / upper)).normalize(),
            mid_axis: (mid.rotation.inverse() * (lower_vec / lower)).normalize(),
            default_pole: Self::bind_pole(root.position, mid.position, tip.position),
            pole_sign: 1.0,
        })
    }

    /// Knee direction: the mid joint's offset from the root->tip line
    fn bind_pole(root: Vec3, mid: Vec3, tip: Vec3) -> Vec3 {
        let line = (tip - root).normalize_or_zero();
        let on_line = root + line * (mid - root).dot(line);
        let offset = mid - on_line;
        if offset.length_squared() > 1e-8 {
            return offset.normalize();
        }
        // Straight bind pose
        let fallback = line.cross(WORLD_RIGHT);
        if fallback.length_squared() > 1e-8 {
            return fallback.normalize();
        }
        line.cross(WORLD_FORWARD).normalize_or(WORLD_FORWARD)
    }

    pub fn default_pole(&self) -> Vec3 {
        self.default_pole
    }

    /// Flip the pole when the character mesh is horizontally mirrored
    pub fn set_mirrored(&mut self, mirrored: bool) {
        self.pole_sign = if mirrored { -1.0 } else { 1.0 };
    }

    /// Current knee angle between the upper and lower segments (radians, 0 = straight)
    pub fn knee_angle(&self) -> f32 {
        let upper = (self.mid.position - self.root.position).normalize_or_zero();
        let lower = (self.tip.position - self.mid.position).normalize_or_zero();
        upper.dot(lower).clamp(-1.0, 1.0).acos()
    }

    /// Pole for this pose, perpendicular to `dir`, never degenerate
    fn pole_for(&self, dir: Vec3) -> Vec3 {
        for candidate in [self.default_pole * self.pole_sign, WORLD_UP, WORLD_RIGHT] {
            let projected = candidate - dir * candidate.dot(dir);
            if projected.length_squared() > 1e-6 {
                return projected.normalize();
            }
        }
        WORLD_FORWARD
    }

    /// Pose the leg so the tip reaches `target` (character space).
    ///
    /// `weight` blends between the current tip (0) and the target (1). Targets out
    /// of reach are clamped; the result is always finite.
    pub fn solve(&mut self, target: Vec3, weight: f32) -> Option<LegSolve> {
        if !(weight > 0.0) || !target.is_finite() {
            return None;
        }
        let target = self.tip.position.lerp(target, weight.min(1.0));
        let root = self.root.position;

        let to_target = target - root;
        let length = to_target.length();
        let dir = if length > 1e-6 {
            to_target / length
        } else {
            (self.tip.position - root).normalize_or(-WORLD_UP)
        };

        let min = (self.upper - self.lower).abs() + IK_EPSILON;
        let max = (self.upper + self.lower - IK_EPSILON).max(min);
        let distance = length.clamp(min, max);
        let bend = bend_angle(self.upper, self.lower, distance);

        let pole = self.pole_for(dir);
        let axis = dir.cross(pole).normalize_or(WORLD_RIGHT);
        let mid_dir = (Quat::from_axis_angle(axis, bend) * dir).normalize();
        let mid = root + mid_dir * self.upper;
        let reach = root + dir * distance;
        let lower_dir = (reach - mid).normalize_or(dir);

        // Shortest-arc deltas composed onto the existing rotations keep any twist
        let root_dir = (self.root.rotation * self.root_axis).normalize();
        let root_delta = Quat::from_rotation_arc(root_dir, mid_dir);
        self.root.rotation = (root_delta * self.root.rotation).normalize();

        let inherited = root_delta * self.mid.rotation;
        let mid_dir_now = (inherited * self.mid_axis).normalize();
        let mid_delta = Quat::from_rotation_arc(mid_dir_now, lower_dir);
        self.mid.rotation = (mid_delta * inherited).normalize();
        self.mid.position = mid;

        let tip = mid + lower_dir * self.lower;
        self.tip.rotation = (mid_delta * root_delta * self.tip.rotation).normalize();
        self.tip.position = tip;

        Some(LegSolve { bend, mid, tip })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leg() -> LegRig {
        LegRig::bind(&LegBones::standing(0.1)).unwrap()
    }

    #[test]
    fn test_bind_measures_segments() {
        let rig = leg();
        let expected = (0.4f32 * 0.4 + 0.08 * 0.08).sqrt();
        assert!((rig.upper - expected).abs() < 1e-5);
        assert!((rig.lower - expected).abs() < 1e-5);
        // Knee points forward
        assert!(rig.default_pole().z > 0.99);
    }

    #[test]
    fn test_bind_missing_bone() {
        let mut bones = LegBones::standing(0.1);
        bones.mid = None;
        assert_eq!(LegRig::bind(&bones).unwrap_err(), RigError::MissingBone("mid"));
    }

    #[test]
    fn test_bind_straight_leg_falls_back() {
        let bones = LegBones {
            root: Some(JointPose::at(Vec3::new(0.0, 1.0, 0.0))),
            mid: Some(JointPose::at(Vec3::new(0.0, 0.5, 0.0))),
            tip: Some(JointPose::at(Vec3::ZERO)),
        };
        let rig = LegRig::bind(&bones).unwrap();
        let pole = rig.default_pole();
        assert!((pole.length() - 1.0).abs() < 1e-5);
        assert!(pole.dot(Vec3::Y).abs() < 1e-5);
    }

    #[test]
    fn test_full_extension_is_straight() {
        let mut rig = leg();
        let reach = rig.upper + rig.lower;
        let target = rig.root.position + Vec3::new(0.0, -1.0, 0.2).normalize() * reach;
        let solve = rig.solve(target, 1.0).unwrap();
        assert!(solve.bend < 0.03, "bend {}", solve.bend);
        assert!(rig.knee_angle() < 0.05, "knee {}", rig.knee_angle());
    }

    #[test]
    fn test_reachable_target_is_hit() {
        let mut rig = leg();
        let target = Vec3::new(0.1, 0.2, 0.15);
        let solve = rig.solve(target, 1.0).unwrap();
        assert!((solve.tip - target).length() < 1e-4);
        assert!((rig.tip.position - target).length() < 1e-4);
        assert!(((rig.mid.position - rig.root.position).length() - rig.upper).abs() < 1e-4);
        assert!(((rig.tip.position - rig.mid.position).length() - rig.lower).abs() < 1e-4);
    }

    #[test]
    fn test_knee_follows_pole_and_mirror_flips_it() {
        let mut rig = leg();
        let target = Vec3::new(0.1, 0.3, 0.0);
        rig.solve(target, 1.0);
        assert!(rig.mid.position.z > 0.0);

        let mut mirrored = leg();
        mirrored.set_mirrored(true);
        mirrored.solve(target, 1.0);
        assert!(mirrored.mid.position.z < 0.0);
    }

    /// Reach 0.5 units straight along (or against) the knee pole
    fn solve_along_pole(mirrored: bool, side: f32) -> LegRig {
        let mut rig = leg();
        rig.set_mirrored(mirrored);
        let target = rig.root.position + rig.default_pole() * side * 0.5;
        rig.solve(target, 1.0).unwrap();
        rig
    }

    #[test]
    fn test_target_along_pole_uses_fallback_pole() {
        for mirrored in [false, true] {
            for side in [1.0, -1.0] {
                let rig = solve_along_pole(mirrored, side);
                let root = rig.root.position;
                assert!(rig.root.rotation.is_finite());
                assert!(rig.mid.rotation.is_finite());
                assert!(rig.tip.rotation.is_finite());

                // Tip lands at the requested distance, on the pole line
                let to_tip = rig.tip.position - root;
                assert!((to_tip.length() - 0.5).abs() < 1e-4, "{to_tip:?}");
                let line = rig.default_pole() * side;
                assert!(to_tip.normalize().dot(line) > 1.0 - 1e-4);

                // Knee bends off the root->target line, toward world up
                let knee = rig.mid.position - root;
                let off_line = knee - line * knee.dot(line);
                assert!(off_line.length() > 0.2, "mirrored {mirrored} side {side}");
                assert!(off_line.y > 0.2);
                assert!(((rig.mid.position - root).length() - rig.upper).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_out_of_reach_target_is_clamped() {
        let mut rig = leg();
        let solve = rig.solve(Vec3::new(0.1, -5.0, 0.0), 1.0).unwrap();
        let reach = (solve.tip - rig.root.position).length();
        assert!(reach <= rig.upper + rig.lower + 1e-4);
        assert!(solve.tip.y < rig.root.position.y);
    }

    #[test]
    fn test_target_at_root_stays_finite() {
        let mut rig = leg();
        let root = rig.root.position;
        let solve = rig.solve(root, 1.0).unwrap();
        assert!(solve.mid.is_finite() && solve.tip.is_finite());
        assert!(rig.root.rotation.is_finite());
    }

    #[test]
    fn test_zero_weight_is_noop() {
        let mut rig = leg();
        let before = rig.tip;
        assert!(rig.solve(Vec3::new(0.1, 0.5, 0.3), 0.0).is_none());
        assert!(rig.solve(Vec3::new(0.1, 0.5, 0.3), -1.0).is_none());
        assert_eq!(rig.tip, before);
    }

    #[test]
    fn test_partial_weight_blends_from_current_tip() {
        let mut rig = leg();
        let start = rig.tip.position;
        let target = start + Vec3::new(0.0, 0.2, 0.0);
        let solve = rig.solve(target, 0.5).unwrap();
        assert!((solve.tip - (start + Vec3::new(0.0, 0.1, 0.0))).length() < 1e-4);
    }

    #[test]
    fn test_rotations_track_bone_axes_and_keep_twist() {
        // Twist the hip around its own bone axis before binding
        let mut bones = LegBones::standing(0.1);
        let root = bones.root.unwrap();
        let mid = bones.mid.unwrap();
        let axis = (mid.position - root.position).normalize();
        let twist = Quat::from_axis_angle(axis, 0.7);
        bones.root = Some(JointPose {
            rotation: twist,
            ..root
        });
        let mut rig = LegRig::bind(&bones).unwrap();

        rig.solve(Vec3::new(0.1, 0.25, 0.2), 1.0);
        let upper_dir = (rig.mid.position - rig.root.position).normalize();
        assert!((rig.root.rotation * rig.root_axis - upper_dir).length() < 1e-4);
        let lower_dir = (rig.tip.position - rig.mid.position).normalize();
        assert!((rig.mid.rotation * rig.mid_axis - lower_dir).length() < 1e-4);
    }

    #[test]
    fn test_bend_angle_limits() {
        assert!(bend_angle(0.5, 0.5, 1.0).abs() < 1e-3);
        // Degenerate lengths still produce a real angle
        assert!(bend_angle(0.5, 0.5, 5.0).is_finite());
        assert!(bend_angle(0.5, 2.0, 0.1).is_finite());
        assert_eq!(bend_angle(0.0, 0.5, 0.5), 0.0);
    }

    proptest! {
        #[test]
        fn prop_bend_angle_is_real(upper in 0.01f32..2.0, lower in 0.01f32..2.0, distance in 0.0f32..5.0) {
            let angle = bend_angle(upper, lower, distance);
            prop_assert!(angle.is_finite());
            prop_assert!((0.0..=std::f32::consts::PI).contains(&angle));
        }

        #[test]
        fn prop_solve_never_nan(
            x in -3.0f32..3.0,
            y in -3.0f32..3.0,
            z in -3.0f32..3.0,
            weight in 0.0f32..1.0,
            mirrored in any::<bool>(),
        ) {
            let mut rig = leg();
            rig.set_mirrored(mirrored);
            for _ in 0..3 {
                rig.solve(Vec3::new(x, y, z), weight);
            }
            prop_assert!(rig.root.rotation.is_finite());
            prop_assert!(rig.mid.rotation.is_finite());
            prop_assert!(rig.tip.rotation.is_finite());
            prop_assert!(rig.mid.position.is_finite());
            prop_assert!(rig.tip.position.is_finite());
            let reach = (rig.tip.position - rig.root.position).length();
            prop_assert!(reach <= rig.upper + rig.lower + 1e-3);
        }
    }
}

//! Foot placement targets for the leg IK
//!
//! Each foot has a board anchor. On the ground the anchor rides with the board;
//! during a trick it is held in the character's yaw-only frame so the feet don't
//! follow the board through its flip. Per-trick offset curves move the feet
//! through the pop, flick and scoop of each trick.

use std::f32::consts::PI;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::grind::GrindKind;
use super::trick::TrickKind;
use crate::consts::WORLD_UP;
use crate::settings::FeetSettings;
use crate::{approach, wrap_degrees};

/// Resting height of a planted foot above its anchor
const FOOT_REST_Y: f32 = 0.02;

fn ease_out(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// A value per foot
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FootPair {
    pub back: Vec3,
    pub front: Vec3,
}

/// Which offset curves drive the feet this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FootPattern {
    Rest,
    Trick(TrickKind),
    Manual { nose: bool },
    Grind(GrindKind),
}

impl FootPattern {
    /// Grinds take priority over tricks, tricks over manuals
    pub fn select(
        trick: Option<TrickKind>,
        grind: Option<GrindKind>,
        nose_raised: bool,
        tail_raised: bool,
    ) -> Self {
        if let Some(kind) = grind {
            FootPattern::Grind(kind)
        } else if let Some(kind) = trick {
            FootPattern::Trick(kind)
        } else if nose_raised || tail_raised {
            FootPattern::Manual { nose: nose_raised }
        } else {
            FootPattern::Rest
        }
    }

    /// Local offsets (board frame, +Z toward the nose) at `progress` in [0, 1]
    pub fn offsets(&self, progress: f32) -> FootPair {
        let t = progress.clamp(0.0, 1.0);
        match self {
            FootPattern::Rest => FootPair::default(),
            FootPattern::Trick(TrickKind::Kickflip) => FootPair {
                back: pop(t),
                front: flick(t, -1.0),
            },
            FootPattern::Trick(TrickKind::Heelflip) => FootPair {
                back: pop(t),
                front: flick(t, 1.0),
            },
            FootPattern::Trick(TrickKind::Shuvit) => FootPair {
                back: scoop(t),
                front: guide(t),
            },
            FootPattern::Trick(TrickKind::VarialKickflip) => FootPair {
                back: scoop(t),
                front: flick(t, -1.0),
            },
            FootPattern::Trick(TrickKind::VarialHeelflip) => {
                let back = scoop(t);
                FootPair {
                    back: Vec3::new(-back.x, back.y, back.z),
                    front: flick(t, 1.0),
                }
            }
            FootPattern::Manual { nose: true } => FootPair {
                back: Vec3::new(0.0, 0.15, 0.05),
                front: Vec3::new(0.0, -0.05, 0.1),
            },
            FootPattern::Manual { nose: false } => FootPair {
                back: Vec3::new(0.0, -0.05, -0.1),
                front: Vec3::new(0.0, 0.1, -0.05),
            },
            FootPattern::Grind(kind) => grind_stance(*kind),
        }
    }
}

/// Back foot: pop down against the tail, then lift
fn pop(t: f32) -> Vec3 {
    let y = if t < 0.2 {
        -0.15 * (t / 0.2 * PI).sin()
    } else {
        0.3 * ((t - 0.2) / 0.8 * PI * 0.5).sin()
    };
    Vec3::new(0.0, y, 0.0)
}

/// Front foot: slide up the board, flick off the side (`side` = -1 toe side), recover
fn flick(t: f32, side: f32) -> Vec3 {
    const REACH: f32 = 0.5;
    if t < 0.3 {
        let s = t / 0.3;
        Vec3::new(0.0, FOOT_REST_Y + s * 0.05, s * 0.15)
    } else if t < 0.5 {
        let s = (t - 0.3) / 0.2;
        Vec3::new(side * s * REACH, FOOT_REST_Y + s * 0.1, 0.15)
    } else {
        let s = (t - 0.5) / 0.5;
        Vec3::new(
            lerp(side * REACH, 0.0, ease_out(s)),
            lerp(0.15, 0.3 * (1.0 - s), s),
            lerp(0.15, 0.0, ease_out(s)),
        )
    }
}

/// Back foot: scoop back and around for a shuvit
fn scoop(t: f32) -> Vec3 {
    const SCOOP: f32 = 0.25;
    const LIFT: f32 = 0.25;
    if t < 0.3 {
        let s = t / 0.3;
        Vec3::new(0.0, FOOT_REST_Y + 0.05 * s, -SCOOP * s)
    } else if t < 0.6 {
        let s = (t - 0.3) / 0.3;
        Vec3::new(
            SCOOP * 0.3 * (s * PI).sin(),
            FOOT_REST_Y + LIFT * s,
            -SCOOP * (1.0 - s * 0.5),
        )
    } else {
        let s = (t - 0.6) / 0.4;
        Vec3::new(0.0, LIFT * (1.0 - s), -SCOOP * 0.5 * (1.0 - s))
    }
}

/// Front foot on a shuvit: ease back to give the board room, lift throughout
fn guide(t: f32) -> Vec3 {
    let z = if t < 0.4 {
        -0.05 * t / 0.4
    } else {
        -0.05 * (1.0 - (t - 0.4) / 0.6)
    };
    Vec3::new(0.0, 0.25 * (t * PI).sin(), z)
}

fn grind_stance(kind: GrindKind) -> FootPair {
    match kind {
        GrindKind::FiftyFifty => FootPair::default(),
        GrindKind::Nosegrind => FootPair {
            back: Vec3::new(0.0, 0.08, 0.03),
            front: Vec3::new(0.0, -0.03, 0.08),
        },
        GrindKind::Crooked => FootPair {
            back: Vec3::new(0.0, 0.1, 0.05),
            front: Vec3::new(0.0, -0.05, 0.12),
        },
        GrindKind::FiveO => FootPair {
            back: Vec3::new(0.0, -0.03, -0.08),
            front: Vec3::new(0.0, 0.05, -0.05),
        },
        GrindKind::Smith => FootPair {
            back: Vec3::new(0.0, -0.05, -0.12),
            front: Vec3::new(0.0, 0.08, -0.03),
        },
    }
}

/// Where the board and character are this tick
#[derive(Debug, Clone, Copy)]
pub struct FootFrame {
    pub position: Vec3,
    /// Visual board rotation (body rotation plus mesh yaw)
    pub board_rotation: Quat,
    /// Yaw-only character rotation
    pub character_rotation: Quat,
    /// Board yaw relative to the character (degrees)
    pub board_yaw: f32,
}

/// Per-rider foot resolver state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FootResolver {
    /// Trick lift blend in [0, 1]
    pub lift: f32,
    /// Feet have swapped anchors because the board is backwards underfoot
    pub swapped: bool,
    /// Last resolved targets (world space)
    pub targets: FootPair,
}

impl FootResolver {
    /// Resolve world-space foot targets for this tick
    pub fn resolve(
        &mut self,
        frame: &FootFrame,
        pattern: FootPattern,
        progress: f32,
        trick_active: bool,
        tuning: &FeetSettings,
        dt: f32,
    ) -> FootPair {
        let swapped = wrap_degrees(frame.board_yaw).abs() > tuning.swap_yaw_deg;
        if swapped != self.swapped {
            log::debug!("Feet swapped: {swapped}");
            self.swapped = swapped;
        }

        let target_lift = if trick_active { 1.0 } else { 0.0 };
        self.lift = approach(self.lift, target_lift, tuning.lift_rate * dt);

        // Anchor and offset travel together when the feet swap
        let offsets = pattern.offsets(progress);
        let back = tuning.back_anchor + offsets.back;
        let front = tuning.front_anchor + offsets.front;
        let (back, front) = if self.swapped { (front, back) } else { (back, front) };

        let rotation = if trick_active {
            frame.character_rotation
        } else {
            frame.board_rotation
        };
        let lift = WORLD_UP * (self.lift * tuning.lift_height);
        self.targets = FootPair {
            back: frame.position + rotation * back + lift,
            front: frame.position + rotation * front + lift,
        };
        self.targets
    }
}

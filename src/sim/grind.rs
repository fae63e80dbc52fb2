//! Rail grinding
//!
//! A grind locks the rider onto a poly-line rail. Position is parameterised by
//! (segment index, progress along that segment); both only ever move forward.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::WORLD_UP;
use crate::look_rotation;
use crate::settings::GrindSettings;

/// Rail data problems, detected when the path is built
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RailError {
    #[error("rail needs at least 2 points, got {0}")]
    TooFewPoints(usize),
    #[error("rail segment {0} has zero length")]
    DegenerateSegment(usize),
}

/// Ordered rail anchor points (immutable while grinding).
///
/// Serialized as a plain point list; deserializing runs the same checks as
/// [`RailPath::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec3>", into = "Vec<Vec3>")]
pub struct RailPath {
    points: Vec<Vec3>,
}

impl RailPath {
    pub fn new(points: Vec<Vec3>) -> Result<Self, RailError> {
        if points.len() < 2 {
            return Err(RailError::TooFewPoints(points.len()));
        }
        if let Some(i) = points
            .windows(2)
            .position(|w| (w[1] - w[0]).length_squared() < 1e-10)
        {
            return Err(RailError::DegenerateSegment(i));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    /// Start point, unit direction and length of a segment
    pub fn segment(&self, index: usize) -> Option<(Vec3, Vec3, f32)> {
        let a = *self.points.get(index)?;
        let b = *self.points.get(index + 1)?;
        let delta = b - a;
        let length = delta.length();
        Some((a, delta / length, length))
    }

    /// Total length along all segments
    pub fn length(&self) -> f32 {
        self.points.windows(2).map(|w| (w[1] - w[0]).length()).sum()
    }

    /// Closest point on the poly-line to `p`
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        let Some(&first) = self.points.first() else {
            return p;
        };
        let mut best = first;
        let mut best_dist = f32::INFINITY;
        for i in 0..self.segment_count() {
            if let Some((start, dir, length)) = self.segment(i) {
                let t = (p - start).dot(dir).clamp(0.0, length);
                let candidate = start + dir * t;
                let dist = (candidate - p).length_squared();
                if dist < best_dist {
                    best_dist = dist;
                    best = candidate;
                }
            }
        }
        best
    }
}

impl TryFrom<Vec<Vec3>> for RailPath {
    type Error = RailError;

    fn try_from(points: Vec<Vec3>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<RailPath> for Vec<Vec3> {
    fn from(path: RailPath) -> Self {
        path.points
    }
}

/// Grind style, picked from the board's tilt when the rail is caught
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrindKind {
    /// Both trucks
    FiftyFifty,
    /// Back truck only
    FiveO,
    /// Front truck only
    Nosegrind,
    /// Front truck, nose down and angled
    Crooked,
    /// Back truck, tail down and angled
    Smith,
}

impl GrindKind {
    /// Pick a grind from the manual tilt and steering held at entry
    pub fn from_stance(nose_raised: bool, tail_raised: bool, steering: bool) -> Self {
        match (nose_raised, tail_raised, steering) {
            (true, false, false) => GrindKind::FiveO,
            (true, false, true) => GrindKind::Smith,
            (false, true, false) => GrindKind::Nosegrind,
            (false, true, true) => GrindKind::Crooked,
            _ => GrindKind::FiftyFifty,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GrindKind::FiftyFifty => "50-50",
            GrindKind::FiveO => "5-0",
            GrindKind::Nosegrind => "nosegrind",
            GrindKind::Crooked => "crooked",
            GrindKind::Smith => "smith",
        }
    }

    pub fn score(&self) -> u32 {
        match self {
            GrindKind::FiftyFifty => 100,
            GrindKind::FiveO | GrindKind::Nosegrind => 150,
            GrindKind::Crooked | GrindKind::Smith => 200,
        }
    }
}

/// Why a grind ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrindExit {
    /// Ran off the end of the rail
    Exhausted,
    /// Jumped off
    Jumped,
    /// Physics reported the contact ended
    ContactLost,
    /// Hit an obstacle
    Slammed,
}

/// Outcome of one follower step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrindStep {
    /// Still on the rail; `target` is the un-eased rail position
    Riding { target: Vec3, direction: Vec3 },
    /// Passed the end of the last segment
    Exhausted,
}

/// Active rail traversal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrindFollower {
    pub path: RailPath,
    pub kind: GrindKind,
    pub segment: usize,
    pub progress: f32,
}

impl GrindFollower {
    /// Catch `path` from `rider`. Progress starts at the rider's projection onto
    /// the first segment, never behind its start.
    pub fn start(path: RailPath, kind: GrindKind, rider: Vec3) -> Option<Self> {
        let (start, dir, _) = path.segment(0)?;
        let progress = (rider - start).dot(dir).max(0.0);
        Some(Self {
            path,
            kind,
            segment: 0,
            progress,
        })
    }

    /// Current facing along the rail
    pub fn direction(&self) -> Vec3 {
        self.path
            .segment(self.segment)
            .map(|(_, dir, _)| dir)
            .unwrap_or(Vec3::Z)
    }

    /// Advance along the rail, carrying leftover progress into following segments
    pub fn advance(&mut self, dt: f32, speed: f32) -> GrindStep {
        self.progress += (speed * dt).max(0.0);
        loop {
            let Some((start, dir, length)) = self.path.segment(self.segment) else {
                return GrindStep::Exhausted;
            };
            if self.progress < length {
                return GrindStep::Riding {
                    target: start + dir * self.progress,
                    direction: dir,
                };
            }
            if self.segment + 1 >= self.path.segment_count() {
                return GrindStep::Exhausted;
            }
            self.progress -= length;
            self.segment += 1;
        }
    }

    /// Ease a transform toward the rail: position toward `target + up * clearance`,
    /// rotation toward the segment direction.
    pub fn ease_transform(
        position: Vec3,
        rotation: Quat,
        target: Vec3,
        direction: Vec3,
        tuning: &GrindSettings,
        dt: f32,
    ) -> (Vec3, Quat) {
        let goal = target + WORLD_UP * tuning.clearance;
        let position = position.lerp(goal, (tuning.position_ease * dt).clamp(0.0, 1.0));
        let rotation = crate::ease_rotation(
            rotation,
            look_rotation(direction, WORLD_UP),
            tuning.align_speed,
            dt,
        );
        (position, rotation)
    }
}

/// Grind re-entry cooldown
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GrindCooldown {
    remaining: f32,
}

impl GrindCooldown {
    pub fn start(&mut self, seconds: f32) {
        self.remaining = seconds.max(0.0);
    }

    pub fn tick(&mut self, dt: f32) {
        self.remaining = (self.remaining - dt).max(0.0);
    }

    pub fn active(&self) -> bool {
        self.remaining > 0.0
    }
}

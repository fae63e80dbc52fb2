//! Timed 180° turn maneuver
//!
//! The maneuver rotates the visual meshes at a constant rate. When a yaw-spinning
//! trick is already running the board mesh is left alone so the two rotations
//! don't fight, but the remaining angle still counts down and the maneuver
//! finishes on schedule.

use serde::{Deserialize, Serialize};

use super::state::VisualRig;
use crate::settings::TurnSettings;

/// Conditions a turn request is judged against
#[derive(Debug, Clone, Copy)]
pub struct TurnContext {
    pub grounded: bool,
    pub grinding: bool,
    /// A trick that spins the board's yaw is running
    pub spin_active: bool,
    /// Manual-turn state before the maneuver took over
    pub manual_turn: bool,
}

/// In-flight maneuver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnManeuver {
    pub duration: f32,
    /// Signed total angle (degrees)
    pub total: f32,
    /// Signed angle still to rotate (degrees)
    pub remaining: f32,
    /// +1 or -1
    pub direction: f32,
    /// Whether the board mesh rotates along with the character
    pub rotate_board: bool,
    pub prior_manual_turn: bool,
}

impl TurnManeuver {
    /// Begin a maneuver if the rider is airborne, off the rail and not already turning
    pub fn begin(
        slot: &mut Option<TurnManeuver>,
        direction: f32,
        ctx: TurnContext,
        tuning: &TurnSettings,
    ) -> bool {
        if slot.is_some() || ctx.grounded || ctx.grinding {
            log::debug!("Turn maneuver refused");
            return false;
        }
        let direction = if direction < 0.0 { -1.0 } else { 1.0 };
        let total = tuning.angle_deg * direction;
        *slot = Some(TurnManeuver {
            duration: tuning.duration,
            total,
            remaining: total,
            direction,
            rotate_board: !ctx.spin_active,
            prior_manual_turn: ctx.manual_turn,
        });
        true
    }

    /// Constant angular rate (degrees per second)
    pub fn rate(&self) -> f32 {
        self.total / self.duration
    }

    /// Rotate by one tick. Returns true once the full angle has been applied.
    pub fn advance(&mut self, dt: f32, rig: &mut VisualRig) -> bool {
        let step = self.rate() * dt;
        // Never overshoot the remaining angle
        let step = if self.direction > 0.0 {
            step.min(self.remaining)
        } else {
            step.max(self.remaining)
        };
        self.apply(step, rig);
        if self.remaining * self.direction <= 1e-4 {
            self.remaining = 0.0;
            rig.update_mirror();
            return true;
        }
        false
    }

    /// Apply whatever angle is left in one go (landing mid-maneuver)
    pub fn finish(&mut self, rig: &mut VisualRig) {
        let rest = self.remaining;
        self.apply(rest, rig);
        self.remaining = 0.0;
        rig.update_mirror();
    }

    fn apply(&mut self, step: f32, rig: &mut VisualRig) {
        if self.rotate_board {
            rig.board_yaw += step;
        }
        rig.character_yaw += step;
        self.remaining -= step;
    }
}

//! Trick state machine
//!
//! Tricks are air-only rotations interpolated in Euler space. A trick can be
//! redirected into a combo while it is still inside the combo window; the
//! redirect starts from wherever the board currently is, so the spin never
//! restarts from rest.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::settings::TrickSettings;
use crate::{delta_degrees, euler_degrees, rotation_from_euler, snap_degrees, yaw_degrees};

/// Closed trick vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrickKind {
    Kickflip,
    Shuvit,
    Heelflip,
    VarialKickflip,
    VarialHeelflip,
}

impl TrickKind {
    pub const ALL: [TrickKind; 5] = [
        TrickKind::Kickflip,
        TrickKind::Shuvit,
        TrickKind::Heelflip,
        TrickKind::VarialKickflip,
        TrickKind::VarialHeelflip,
    ];

    /// Euler delta in degrees: x = pitch, y = yaw, z = roll
    pub fn euler_delta(&self) -> Vec3 {
        match self {
            TrickKind::Kickflip => Vec3::new(0.0, 0.0, 360.0),
            TrickKind::Shuvit => Vec3::new(0.0, 180.0, 0.0),
            TrickKind::Heelflip => Vec3::new(0.0, 0.0, -360.0),
            TrickKind::VarialKickflip => Vec3::new(0.0, 180.0, 360.0),
            TrickKind::VarialHeelflip => Vec3::new(0.0, -180.0, -360.0),
        }
    }

    pub fn score(&self) -> u32 {
        match self {
            TrickKind::Kickflip | TrickKind::Heelflip => 100,
            TrickKind::Shuvit => 75,
            TrickKind::VarialKickflip | TrickKind::VarialHeelflip => 200,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TrickKind::Kickflip => "kickflip",
            TrickKind::Shuvit => "shuvit",
            TrickKind::Heelflip => "heelflip",
            TrickKind::VarialKickflip => "varial kickflip",
            TrickKind::VarialHeelflip => "varial heelflip",
        }
    }

    /// Whether the trick spins the board around its vertical axis
    pub fn spins_yaw(&self) -> bool {
        self.euler_delta().y != 0.0
    }

    /// Combo produced by pressing `next` while `self` is in flight
    pub fn combo_with(self, next: TrickKind) -> Option<TrickKind> {
        use TrickKind::*;
        match (self, next) {
            (Kickflip, Shuvit) | (Shuvit, Kickflip) => Some(VarialKickflip),
            (Heelflip, Shuvit) | (Shuvit, Heelflip) => Some(VarialHeelflip),
            _ => None,
        }
    }
}

/// Conditions a trick request is judged against
#[derive(Debug, Clone, Copy)]
pub struct TrickContext {
    pub grounded: bool,
    pub grinding: bool,
    /// Simulation clock (seconds)
    pub now: f64,
}

/// In-flight trick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveTrick {
    pub kind: TrickKind,
    /// Fraction in [0, 1]
    pub progress: f32,
    /// Last (re)start time
    pub started_at: f64,
    /// Original start time; the combo window is measured from here
    pub first_started_at: f64,
    /// Attitude at the original take-off; a combo does not move it
    pub first_start_euler: Vec3,
    /// Angles the current (possibly combo) segment lerps from
    pub start_euler: Vec3,
    pub target_euler: Vec3,
    /// Current interpolated Euler angles
    pub euler: Vec3,
}

/// Trick lifecycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum TrickState {
    #[default]
    Idle,
    Active(ActiveTrick),
}

/// Result of advancing a trick by one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrickAdvance {
    Idle,
    Spinning(Quat),
    Completed { kind: TrickKind, rotation: Quat },
}

impl TrickState {
    pub fn is_active(&self) -> bool {
        matches!(self, TrickState::Active(_))
    }

    pub fn active(&self) -> Option<&ActiveTrick> {
        match self {
            TrickState::Active(trick) => Some(trick),
            TrickState::Idle => None,
        }
    }

    pub fn kind(&self) -> Option<TrickKind> {
        self.active().map(|t| t.kind)
    }

    pub fn progress(&self) -> f32 {
        self.active().map(|t| t.progress).unwrap_or(0.0)
    }

    /// Start a trick from the board's current rotation.
    ///
    /// Refused while a trick is active, on the ground, or on a rail.
    pub fn start(&mut self, kind: TrickKind, rotation: Quat, ctx: TrickContext) -> bool {
        if self.is_active() || ctx.grounded || ctx.grinding {
            log::debug!("Trick {} refused", kind.name());
            return false;
        }
        let start_euler = euler_degrees(rotation);
        *self = TrickState::Active(ActiveTrick {
            kind,
            progress: 0.0,
            started_at: ctx.now,
            first_started_at: ctx.now,
            first_start_euler: start_euler,
            start_euler,
            target_euler: start_euler + kind.euler_delta(),
            euler: start_euler,
        });
        true
    }

    /// Redirect the in-flight trick into `kind`, starting from the current angles.
    ///
    /// Only inside the combo window measured from the original start.
    pub fn upgrade_to_combo(&mut self, kind: TrickKind, now: f64, window: f32) -> bool {
        let TrickState::Active(trick) = self else {
            return false;
        };
        if trick.kind == kind || now - trick.first_started_at > window as f64 {
            return false;
        }
        log::debug!("Combo {} -> {}", trick.kind.name(), kind.name());
        trick.kind = kind;
        trick.start_euler = trick.euler;
        trick.target_euler = trick.euler + kind.euler_delta();
        trick.progress = 0.0;
        trick.started_at = now;
        true
    }

    /// Advance the active trick by `dt`; snaps to the exact target on completion
    pub fn advance(&mut self, dt: f32, duration: f32) -> TrickAdvance {
        let TrickState::Active(trick) = self else {
            return TrickAdvance::Idle;
        };
        trick.progress += dt / duration;
        if trick.progress >= 1.0 {
            trick.progress = 1.0;
            trick.euler = trick.target_euler;
            let done = TrickAdvance::Completed {
                kind: trick.kind,
                rotation: rotation_from_euler(trick.target_euler),
            };
            *self = TrickState::Idle;
            return done;
        }
        // Euler-space lerp: per-axis deltas are tuned for this, not slerp
        trick.euler = trick.start_euler.lerp(trick.target_euler, trick.progress);
        TrickAdvance::Spinning(rotation_from_euler(trick.euler))
    }

    /// Abort the trick on landing.
    ///
    /// Returns the cancelled kind and the landing rotation: flip axes revert to
    /// the take-off attitude (before any combo), yaw snaps to the nearest 90°.
    pub fn cancel(&mut self) -> Option<(TrickKind, Quat)> {
        let TrickState::Active(trick) = std::mem::take(self) else {
            return None;
        };
        let landing = Vec3::new(
            trick.first_start_euler.x,
            snap_degrees(trick.euler.y, 90.0),
            trick.first_start_euler.z,
        );
        Some((trick.kind, rotation_from_euler(landing)))
    }
}

/// Lean into the turn while idle: yaw toward the nearer stance base (0° or
/// 180°) offset by the lean angle in the direction of lateral travel.
pub fn stance_lean(rotation: Quat, lateral_velocity: f32, tuning: &TrickSettings, dt: f32) -> Quat {
    let yaw = yaw_degrees(rotation);
    let base = if delta_degrees(yaw, 0.0).abs() <= 90.0 {
        0.0
    } else {
        180.0
    };
    let lean = if lateral_velocity > tuning.lean_threshold {
        tuning.lean_deg
    } else if lateral_velocity < -tuning.lean_threshold {
        -tuning.lean_deg
    } else {
        0.0
    };
    let delta = delta_degrees(yaw, base + lean);
    let step = delta * (tuning.lean_rate * dt).clamp(0.0, 1.0);
    (Quat::from_rotation_y(step.to_radians()) * rotation).normalize()
}

/// Consecutive tricks linked by manuals, for the score multiplier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrickLine {
    pub in_line: bool,
    pub tricks_in_line: u32,
    pub landed_in_manual: bool,
    /// Tricks and grinds since the last ground contact
    pub pending: u32,
    pub multiplier: f32,
}

impl Default for TrickLine {
    fn default() -> Self {
        Self {
            in_line: false,
            tricks_in_line: 0,
            landed_in_manual: false,
            pending: 0,
            multiplier: 1.0,
        }
    }
}

impl TrickLine {
    /// A trick or grind was performed
    pub fn record_move(&mut self) {
        self.pending += 1;
    }

    /// Resolve a landing. Returns the new multiplier if it changed.
    pub fn land(&mut self, manual: bool, grinding: bool, step: f32) -> Option<f32> {
        let before = self.multiplier;
        self.landed_in_manual = manual;
        if manual {
            if self.pending > 0 {
                self.in_line = true;
                self.tricks_in_line += self.pending;
            }
            self.pending = 0;
            if self.tricks_in_line > 0 {
                self.multiplier = 1.0 + step * (self.tricks_in_line - 1) as f32;
            }
        } else if !grinding {
            self.end();
        }
        (self.multiplier != before).then_some(self.multiplier)
    }

    /// Rolling on the ground outside a manual with nothing pending ends the line
    pub fn settle(&mut self, grounded: bool, manual: bool, grinding: bool) -> Option<f32> {
        if self.in_line && grounded && !manual && !grinding && self.pending == 0 {
            let before = self.multiplier;
            self.end();
            return (self.multiplier != before).then_some(self.multiplier);
        }
        None
    }

    pub fn end(&mut self) {
        self.in_line = false;
        self.tricks_in_line = 0;
        self.pending = 0;
        self.multiplier = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn airborne(now: f64) -> TrickContext {
        TrickContext {
            grounded: false,
            grinding: false,
            now,
        }
    }

    #[test]
    fn test_start_rejected_on_ground_or_rail() {
        let mut state = TrickState::Idle;
        let grounded = TrickContext {
            grounded: true,
            ..airborne(0.0)
        };
        assert!(!state.start(TrickKind::Kickflip, Quat::IDENTITY, grounded));
        let grinding = TrickContext {
            grinding: true,
            ..airborne(0.0)
        };
        assert!(!state.start(TrickKind::Kickflip, Quat::IDENTITY, grinding));
        assert!(!state.is_active());
    }

    #[test]
    fn test_start_while_active_is_noop() {
        let mut state = TrickState::Idle;
        assert!(state.start(TrickKind::Kickflip, Quat::IDENTITY, airborne(0.0)));
        state.advance(0.1, 0.5);
        let progress = state.progress();
        assert!(!state.start(TrickKind::Shuvit, Quat::IDENTITY, airborne(0.1)));
        assert_eq!(state.kind(), Some(TrickKind::Kickflip));
        assert_eq!(state.progress(), progress);
    }

    #[test]
    fn test_kickflip_completes_exactly() {
        let start = Quat::from_rotation_y(20f32.to_radians());
        let start_euler = euler_degrees(start);
        let mut state = TrickState::Idle;
        assert!(state.start(TrickKind::Kickflip, start, airborne(0.0)));

        let mut last_euler = Vec3::ZERO;
        let mut completed = None;
        let mut ticks = 0;
        for _ in 0..62 {
            ticks += 1;
            if let TrickState::Active(trick) = &state {
                last_euler = trick.target_euler;
            }
            match state.advance(1.0 / 120.0, 0.5) {
                TrickAdvance::Completed { kind, rotation } => {
                    completed = Some((kind, rotation));
                    break;
                }
                TrickAdvance::Spinning(_) => {}
                TrickAdvance::Idle => panic!("trick went idle without completing"),
            }
        }
        let (kind, rotation) = completed.expect("kickflip should complete after 0.5s");
        // 0.5 s at 120 Hz, give or take float accumulation
        assert!((59..=61).contains(&ticks), "completed after {ticks} ticks");
        assert_eq!(kind, TrickKind::Kickflip);
        assert_eq!(last_euler, start_euler + Vec3::new(0.0, 0.0, 360.0));
        assert!(rotation.angle_between(rotation_from_euler(last_euler)) < 1e-4);
        assert!(!state.is_active());
    }

    #[test]
    fn test_euler_lerp_halfway() {
        let mut state = TrickState::Idle;
        state.start(TrickKind::Shuvit, Quat::IDENTITY, airborne(0.0));
        state.advance(0.25, 0.5);
        let trick = state.active().unwrap();
        assert!((trick.euler.y - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_combo_redirects_from_current_angles() {
        let mut state = TrickState::Idle;
        state.start(TrickKind::Kickflip, Quat::IDENTITY, airborne(0.0));
        state.advance(0.1, 0.5);
        let current = state.active().unwrap().euler;
        assert!(state.upgrade_to_combo(TrickKind::VarialKickflip, 0.1, 0.2));

        let trick = state.active().unwrap();
        assert_eq!(trick.kind, TrickKind::VarialKickflip);
        assert_eq!(trick.start_euler, current);
        assert_eq!(trick.first_start_euler, Vec3::ZERO);
        assert_eq!(trick.target_euler, current + TrickKind::VarialKickflip.euler_delta());
        assert_eq!(trick.progress, 0.0);
        assert_eq!(trick.first_started_at, 0.0);
        assert_eq!(trick.started_at, 0.1);
    }

    #[test]
    fn test_combo_rejected_after_window() {
        let mut state = TrickState::Idle;
        state.start(TrickKind::Kickflip, Quat::IDENTITY, airborne(1.0));
        state.advance(0.25, 0.5);
        assert!(!state.upgrade_to_combo(TrickKind::VarialKickflip, 1.25, 0.2));
        assert_eq!(state.kind(), Some(TrickKind::Kickflip));
    }

    #[test]
    fn test_combo_window_measured_from_first_start() {
        let mut state = TrickState::Idle;
        state.start(TrickKind::Kickflip, Quat::IDENTITY, airborne(0.0));
        assert!(state.upgrade_to_combo(TrickKind::VarialKickflip, 0.15, 0.2));
        // Re-stamped start does not extend the window
        assert!(!state.upgrade_to_combo(TrickKind::VarialHeelflip, 0.25, 0.2));
    }

    #[test]
    fn test_combo_requires_active_trick() {
        let mut state = TrickState::Idle;
        assert!(!state.upgrade_to_combo(TrickKind::VarialKickflip, 0.0, 0.2));
    }

    #[test]
    fn test_cancel_snaps_yaw_to_quarter_turn() {
        let mut state = TrickState::Idle;
        state.start(TrickKind::VarialKickflip, Quat::IDENTITY, airborne(0.0));
        // 60% through: yaw 108°, roll 216°
        state.advance(0.3, 0.5);
        let (kind, rotation) = state.cancel().unwrap();
        assert_eq!(kind, TrickKind::VarialKickflip);
        assert!(!state.is_active());
        let euler = euler_degrees(rotation);
        assert!((euler.y - 90.0).abs() < 1e-3, "{euler:?}");
        assert!(euler.z.abs() < 1e-3);
    }

    #[test]
    fn test_cancel_after_combo_restores_take_off_attitude() {
        let take_off = rotation_from_euler(Vec3::new(10.0, 30.0, 0.0));
        let mut state = TrickState::Idle;
        state.start(TrickKind::Kickflip, take_off, airborne(0.0));
        // 10 ticks into the kickflip the board has rolled 60°
        for _ in 0..10 {
            state.advance(1.0 / 120.0, 0.5);
        }
        let rolled = state.active().unwrap().euler.z;
        assert!((rolled - 60.0).abs() < 1e-2, "{rolled}");
        assert!(state.upgrade_to_combo(TrickKind::VarialKickflip, 10.0 / 120.0, 0.2));
        state.advance(0.05, 0.5);

        let (kind, rotation) = state.cancel().unwrap();
        assert_eq!(kind, TrickKind::VarialKickflip);
        let euler = euler_degrees(rotation);
        assert!((euler.x - 10.0).abs() < 1e-3, "{euler:?}");
        assert!(euler.z.abs() < 1e-3, "{euler:?}");
        // 30° + 18° of varial yaw snaps to a quarter turn
        assert!((euler.y - 90.0).abs() < 1e-3, "{euler:?}");
    }

    #[test]
    fn test_cancel_when_idle() {
        let mut state = TrickState::Idle;
        assert!(state.cancel().is_none());
    }

    #[test]
    fn test_combo_table() {
        assert_eq!(
            TrickKind::Kickflip.combo_with(TrickKind::Shuvit),
            Some(TrickKind::VarialKickflip)
        );
        assert_eq!(
            TrickKind::Shuvit.combo_with(TrickKind::Heelflip),
            Some(TrickKind::VarialHeelflip)
        );
        assert_eq!(TrickKind::Kickflip.combo_with(TrickKind::Heelflip), None);
    }

    #[test]
    fn test_stance_lean_into_turn() {
        let tuning = TrickSettings::default();
        let mut rotation = Quat::IDENTITY;
        for _ in 0..240 {
            rotation = stance_lean(rotation, 2.0, &tuning, 1.0 / 120.0);
        }
        assert!((yaw_degrees(rotation) - tuning.lean_deg).abs() < 0.5);

        // Switch stance leans around 180°
        let mut rotation = Quat::from_rotation_y(170f32.to_radians());
        for _ in 0..240 {
            rotation = stance_lean(rotation, 0.0, &tuning, 1.0 / 120.0);
        }
        assert!(delta_degrees(yaw_degrees(rotation), 180.0).abs() < 0.5);
    }

    #[test]
    fn test_line_multiplier_after_third_trick() {
        let mut line = TrickLine::default();
        line.record_move();
        assert_eq!(line.land(true, false, 0.5), None);
        line.record_move();
        assert_eq!(line.land(true, false, 0.5), Some(1.5));
        line.record_move();
        assert_eq!(line.land(true, false, 0.5), Some(2.0));
        assert_eq!(line.tricks_in_line, 3);
        assert!(line.in_line);
        assert!(line.landed_in_manual);
    }

    #[test]
    fn test_line_ends_outside_manual() {
        let mut line = TrickLine::default();
        line.record_move();
        line.land(true, false, 0.5);
        line.record_move();
        line.land(true, false, 0.5);
        assert_eq!(line.land(false, false, 0.5), Some(1.0));
        assert!(!line.in_line);
        assert_eq!(line.tricks_in_line, 0);
    }

    #[test]
    fn test_line_survives_while_grinding() {
        let mut line = TrickLine::default();
        line.record_move();
        line.land(true, false, 0.5);
        line.record_move();
        line.land(true, false, 0.5);
        assert_eq!(line.land(false, true, 0.5), None);
        assert!(line.in_line);
        assert_eq!(line.settle(true, false, true), None);
        assert_eq!(line.settle(true, false, false), Some(1.0));
    }

    proptest! {
        #[test]
        fn prop_progress_stays_in_unit_range(steps in prop::collection::vec(0.0f32..0.2, 1..50)) {
            let mut state = TrickState::Idle;
            state.start(TrickKind::VarialHeelflip, Quat::IDENTITY, airborne(0.0));
            for dt in steps {
                state.advance(dt, 0.5);
                let p = state.progress();
                prop_assert!((0.0..=1.0).contains(&p));
            }
        }
    }
}

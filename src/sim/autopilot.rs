//! Seeded input generator for headless runs
//!
//! Produces plausible rider intent (pushing, steering, jumps, tricks, manuals)
//! from a seeded RNG, so a run is reproducible from its seed alone.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::state::RiderState;
use super::tick::TickInput;
use super::trick::TrickKind;

/// Ticks spent down before getting back up
const GET_UP_TICKS: u32 = 120;

/// Basic tricks the autopilot presses; varials only come from combos
const BASIC_TRICKS: [TrickKind; 3] =
    [TrickKind::Kickflip, TrickKind::Shuvit, TrickKind::Heelflip];

#[derive(Debug, Clone)]
pub struct Autopilot {
    rng: Pcg32,
    /// -1, 0 or +1 and how long to keep it
    steer: (i8, u32),
    /// Seconds the jump has been held, if held
    jump_hold: Option<f32>,
    jump_release_at: f32,
    /// Remaining manual ticks and which end is up
    manual: (u32, bool),
    slammed_ticks: u32,
}

impl Autopilot {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            steer: (0, 0),
            jump_hold: None,
            jump_release_at: 0.0,
            manual: (0, false),
            slammed_ticks: 0,
        }
    }

    /// Intent for the next tick given the current rider state
    pub fn next_input(&mut self, state: &RiderState, dt: f32) -> TickInput {
        let mut input = TickInput::default();

        if state.slammed {
            self.slammed_ticks += 1;
            if self.slammed_ticks >= GET_UP_TICKS {
                self.slammed_ticks = 0;
                input.respawn = true;
            }
            self.jump_hold = None;
            self.manual = (0, false);
            return input;
        }

        // Mostly pushing, sometimes coasting
        input.forward = self.rng.random_bool(0.8);

        if self.steer.1 == 0 {
            self.steer = (self.rng.random_range(-1..=1), self.rng.random_range(30..180));
        }
        self.steer.1 -= 1;
        input.left = self.steer.0 < 0;
        input.right = self.steer.0 > 0;

        let grounded = state.ground.grounded;
        let grinding = state.grinding();

        let charging = self.jump_hold;
        match charging {
            Some(held) if grounded || grinding => {
                let held = held + dt;
                if held >= self.jump_release_at {
                    input.jump_released = Some(held);
                    self.jump_hold = None;
                } else {
                    self.jump_hold = Some(held);
                }
            }
            // Lost the ground while charging
            Some(_) => self.jump_hold = None,
            None if (grounded && self.rng.random_bool(0.01))
                || (grinding && self.rng.random_bool(0.005)) =>
            {
                self.jump_hold = Some(0.0);
                self.jump_release_at = self.rng.random_range(0.05..0.5);
            }
            None => {}
        }

        if !grounded && !grinding {
            match state.trick.kind() {
                None if self.rng.random_bool(0.05) => {
                    let pick = self.rng.random_range(0..BASIC_TRICKS.len());
                    input.trick = Some(BASIC_TRICKS[pick]);
                }
                Some(TrickKind::Kickflip | TrickKind::Heelflip) if self.rng.random_bool(0.1) => {
                    input.trick = Some(TrickKind::Shuvit);
                }
                _ => {}
            }
            if state.turn.is_none() && self.rng.random_bool(0.004) {
                input.turn = Some(if self.rng.random_bool(0.5) { 1.0 } else { -1.0 });
            }
        }

        if grounded {
            if self.manual.0 == 0 && self.rng.random_bool(0.005) {
                self.manual = (self.rng.random_range(30..150), self.rng.random_bool(0.3));
            }
        } else if !state.trick.is_active() && self.rng.random_bool(0.02) {
            // Set up a manual landing
            self.manual = (self.rng.random_range(60..150), self.rng.random_bool(0.3));
        }
        if self.manual.0 > 0 {
            self.manual.0 -= 1;
            input.manual_nose = self.manual.1;
            input.manual_tail = !self.manual.1;
        }

        input
    }
}

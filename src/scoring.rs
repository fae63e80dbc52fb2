//! Score, multiplier and recent-trick tracking
//!
//! The rider core only ever pushes into a [`ScoreSink`]; it never reads score
//! back. [`ScoreBoard`] is the HUD-side implementation.

use crate::consts::RECENT_TRICKS;
use crate::settings::ScoringSettings;

/// Receiver for scoring updates
pub trait ScoreSink {
    /// Add points (scaled by the current multiplier)
    fn add_score(&mut self, amount: u32);
    fn set_score_multiplier(&mut self, multiplier: f32);
    /// Push a trick or grind name onto the recent queue
    fn enqueue_recent_trick(&mut self, name: &'static str);
    fn set_slammed(&mut self, slammed: bool);
}

/// Running score with an eased display value
#[derive(Debug, Clone)]
pub struct ScoreBoard {
    /// Score the display eases toward
    pub target: f32,
    /// Displayed score
    pub displayed: f32,
    pub multiplier: f32,
    /// Newest first
    pub recent: Vec<&'static str>,
    pub slammed: bool,
    /// Score resets once the rider gets back up after a slam
    reset_pending: bool,
    /// Display lerp speed (per second)
    lerp_speed: f32,
}

impl Default for ScoreBoard {
    fn default() -> Self {
        Self::new(ScoringSettings::default().display_lerp)
    }
}

impl ScoreBoard {
    pub fn new(lerp_speed: f32) -> Self {
        Self {
            target: 0.0,
            displayed: 0.0,
            multiplier: 1.0,
            recent: Vec::with_capacity(RECENT_TRICKS + 1),
            slammed: false,
            reset_pending: false,
            lerp_speed,
        }
    }

    /// Ease the displayed score toward the target
    pub fn update(&mut self, dt: f32) {
        let t = (dt * self.lerp_speed).clamp(0.0, 1.0);
        self.displayed += (self.target - self.displayed) * t;
    }

    /// Score rounded for display
    pub fn score(&self) -> u64 {
        self.target.round().max(0.0) as u64
    }

    /// HUD line, e.g. `Score: 150  Mult: 1.5x`
    pub fn summary(&self) -> String {
        format!(
            "Score: {:.0}  Mult: {:.1}x",
            self.displayed, self.multiplier
        )
    }
}

impl ScoreSink for ScoreBoard {
    fn add_score(&mut self, amount: u32) {
        self.target += amount as f32 * self.multiplier;
    }

    fn set_score_multiplier(&mut self, multiplier: f32) {
        self.multiplier = multiplier;
    }

    fn enqueue_recent_trick(&mut self, name: &'static str) {
        self.recent.insert(0, name);
        self.recent.truncate(RECENT_TRICKS);
    }

    fn set_slammed(&mut self, slammed: bool) {
        if slammed {
            self.reset_pending = true;
        } else if self.reset_pending {
            log::info!("Run over at {} points", self.score());
            self.reset_pending = false;
            self.target = 0.0;
            self.displayed = 0.0;
            self.multiplier = 1.0;
        }
        self.slammed = slammed;
    }
}

//! Animation clip cues
//!
//! Clips are fire-and-forget: the core names a clip when something happens and
//! never waits on playback.

use crate::sim::grind::GrindKind;
use crate::sim::state::RiderEvent;
use crate::sim::trick::TrickKind;

/// Clip types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clip {
    /// Ollie pop
    Jump,
    /// Touchdown
    Land,
    /// Trick started or redirected into a combo
    Trick(TrickKind),
    /// Balance on the nose
    NoseManual,
    /// Balance on the tail
    TailManual,
    /// Back to a neutral stance
    Ride,
    /// Locked onto a rail
    Grind(GrindKind),
    /// 180° body turn
    Turn,
    /// Thrown off the board
    Slam,
    /// Standing back up
    GetUp,
}

impl Clip {
    /// Clip requested by an event, if any
    pub fn for_event(event: &RiderEvent) -> Option<Clip> {
        match *event {
            RiderEvent::Jumped { .. } => Some(Clip::Jump),
            RiderEvent::Landed { .. } => Some(Clip::Land),
            RiderEvent::TrickStarted(kind) => Some(Clip::Trick(kind)),
            RiderEvent::ComboUpgraded { to, .. } => Some(Clip::Trick(to)),
            RiderEvent::ManualStarted { nose: true } => Some(Clip::NoseManual),
            RiderEvent::ManualStarted { nose: false } => Some(Clip::TailManual),
            RiderEvent::ManualEnded => Some(Clip::Ride),
            RiderEvent::GrindStarted(kind) => Some(Clip::Grind(kind)),
            RiderEvent::TurnStarted { .. } => Some(Clip::Turn),
            RiderEvent::Slammed => Some(Clip::Slam),
            RiderEvent::Respawned => Some(Clip::GetUp),
            _ => None,
        }
    }

    /// Name of the clip in the animation set
    pub fn name(&self) -> &'static str {
        match self {
            Clip::Jump => "ollie",
            Clip::Land => "land",
            Clip::Trick(TrickKind::Kickflip) => "kickflip",
            Clip::Trick(TrickKind::Shuvit) => "shuvit",
            Clip::Trick(TrickKind::Heelflip) => "heelflip",
            Clip::Trick(TrickKind::VarialKickflip) => "varial_kickflip",
            Clip::Trick(TrickKind::VarialHeelflip) => "varial_heelflip",
            Clip::NoseManual => "nose_manual",
            Clip::TailManual => "manual",
            Clip::Ride => "ride",
            Clip::Grind(GrindKind::FiftyFifty) => "grind_50_50",
            Clip::Grind(GrindKind::FiveO) => "grind_5_0",
            Clip::Grind(GrindKind::Nosegrind) => "grind_nose",
            Clip::Grind(GrindKind::Crooked) => "grind_crooked",
            Clip::Grind(GrindKind::Smith) => "grind_smith",
            Clip::Turn => "turn_180",
            Clip::Slam => "slam",
            Clip::GetUp => "get_up",
        }
    }
}

/// Receiver for clip requests
pub trait ClipSink {
    fn play_clip(&mut self, name: &'static str);
}

/// Records requested clips (headless runs and tests)
#[derive(Debug, Clone, Default)]
pub struct ClipLog {
    pub played: Vec<&'static str>,
}

impl ClipSink for ClipLog {
    fn play_clip(&mut self, name: &'static str) {
        log::trace!("Clip: {name}");
        self.played.push(name);
    }
}

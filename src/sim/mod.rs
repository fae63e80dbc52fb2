//! Deterministic rider simulation module
//!
//! All motion logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only (autopilot)
//! - World access only through [`PhysicsWorld`]
//! - No rendering, audio or platform dependencies

pub mod autopilot;
pub mod feet;
pub mod grind;
pub mod ground;
pub mod ik;
pub mod locomotion;
pub mod state;
pub mod tick;
pub mod trick;
pub mod turn;
pub mod world;

pub use autopilot::Autopilot;
pub use feet::{FootPair, FootPattern, FootResolver};
pub use grind::{GrindExit, GrindFollower, GrindKind, RailError, RailPath};
pub use ground::{GroundState, GroundTransition};
pub use ik::{LegBones, LegRig, RigError};
pub use locomotion::SkaterBody;
pub use state::{Legs, RiderEvent, RiderState, VisualRig};
pub use tick::{TickInput, dispatch, tick};
pub use trick::{TrickKind, TrickLine, TrickState};
pub use turn::TurnManeuver;
pub use world::{
    BodyId, ContactEvent, ContactPhase, GroundPlane, PhysicsWorld, RayHit, StaticWorld, Surface,
};

//! Fixed timestep simulation tick
//!
//! Advances one rider deterministically. Order matters:
//! ground sensing, landing (which cancels tricks before they can advance),
//! contacts, grind, tricks, turn, locomotion, alignment, then feet and IK.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::feet::{FootFrame, FootPattern};
use super::grind::{GrindExit, GrindFollower, GrindKind, GrindStep};
use super::ground::GroundTransition;
use super::locomotion::{self, DriveIntent};
use super::state::{RiderEvent, RiderState};
use super::trick::{TrickAdvance, TrickContext, TrickKind, stance_lean};
use super::turn::{TurnContext, TurnManeuver};
use super::world::{ContactEvent, ContactPhase, PhysicsWorld, Surface};
use crate::consts::WORLD_FORWARD;
use crate::cues::{Clip, ClipSink};
use crate::scoring::ScoreSink;
use crate::settings::Settings;
use crate::wrap_degrees;

/// Control intent for a single tick (deterministic)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    /// Jump released this tick after being held this many seconds
    pub jump_released: Option<f32>,
    /// Trick key pressed this tick
    pub trick: Option<TrickKind>,
    /// Turn maneuver requested; the sign picks the direction
    pub turn: Option<f32>,
    pub manual_nose: bool,
    pub manual_tail: bool,
    pub pivot_left: bool,
    pub pivot_right: bool,
    /// Get back up after a slam
    pub respawn: bool,
}

impl TickInput {
    fn drive(&self) -> DriveIntent {
        DriveIntent {
            forward: self.forward,
            backward: self.backward,
            left: self.left,
            right: self.right,
        }
    }

    fn steering(&self) -> bool {
        self.left != self.right
    }

    fn pivot(&self) -> f32 {
        match (self.pivot_left, self.pivot_right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }
}

/// Advance the rider by one fixed timestep
pub fn tick(
    state: &mut RiderState,
    input: &TickInput,
    world: &impl PhysicsWorld,
    settings: &Settings,
    dt: f32,
) {
    state.events.clear();
    state.clock += dt as f64;
    state.time_ticks += 1;
    state.grind_cooldown.tick(dt);

    // Slammed riders stay frozen until they get back up
    if state.slammed {
        if input.respawn {
            state.reset_to_spawn(settings.locomotion.cruise_speed);
            state.emit(RiderEvent::Respawned);
            log::info!("Respawned at {:?}", state.spawn);
        }
        return;
    }

    let landed = sense_ground(state, input, world, settings);
    if landed {
        land(state, settings);
    }

    // Copy out so the world can be queried while the state is mutated
    let contacts: Vec<ContactEvent> = world.contacts().to_vec();
    for contact in &contacts {
        match (world.surface(contact.body), contact.phase) {
            (Surface::Obstacle, ContactPhase::Begin) => {
                slam(state, settings);
                return;
            }
            (Surface::Rail, ContactPhase::Begin) => {
                try_start_grind(state, input, world, contact, settings)
            }
            (Surface::Rail, ContactPhase::End) if state.grind_body == Some(contact.body) => {
                end_grind(state, GrindExit::ContactLost, None, settings);
            }
            _ => {}
        }
    }

    if state.grinding() {
        ride_rail(state, input, settings, dt);
    }

    run_tricks(state, input, settings, dt);
    run_turn(state, input, settings, dt);

    // A grind that ended above hands back to physics in the same tick
    let jumped = !state.grinding() && move_body(state, input, world, settings, dt);

    if !state.grinding() && !state.trick.is_active() && !jumped {
        state.body.rotation = state.ground.align(state.body.rotation, &settings.ground, dt);
    }

    let grinding = state.grinding();
    let (grounded, manual) = (state.ground.grounded, state.ground.in_manual());
    if let Some(multiplier) = state.line.settle(grounded, manual, grinding) {
        state.emit(RiderEvent::MultiplierChanged(multiplier));
    }

    pose_legs(state, settings, dt);
}

/// Probe the ground and apply manual/pivot intent. Returns true on landing.
fn sense_ground(
    state: &mut RiderState,
    input: &TickInput,
    world: &impl PhysicsWorld,
    settings: &Settings,
) -> bool {
    // The rail carries the rider; the ground is ignored until the grind ends
    if state.grinding() {
        return false;
    }
    let body = &state.body;
    let transition =
        state
            .ground
            .sense(world, body.position, body.rotation, body.velocity.y, &settings.ground);

    let was_manual = state.ground.in_manual();
    if state.ground.set_manual(input.manual_nose, input.manual_tail) {
        let nose = state.ground.nose_raised;
        state.emit(RiderEvent::ManualStarted { nose });
    } else if was_manual && !state.ground.in_manual() {
        state.emit(RiderEvent::ManualEnded);
    }
    state.ground.set_pivot(input.pivot());

    transition == GroundTransition::Landed
}

/// Touchdown: cancel the trick before it can advance, finish any turn, resolve the line
fn land(state: &mut RiderState, settings: &Settings) {
    if let Some((kind, rotation)) = state.trick.cancel() {
        state.body.rotation = rotation;
        log::debug!("Landed mid-{}", kind.name());
        state.emit(RiderEvent::TrickCancelled(kind));
    }
    finish_turn(state);

    let manual = state.ground.in_manual();
    let grinding = state.grinding();
    state.emit(RiderEvent::Landed { manual });
    if let Some(multiplier) = state
        .line
        .land(manual, grinding, settings.scoring.line_step)
    {
        state.emit(RiderEvent::MultiplierChanged(multiplier));
    }
}

fn finish_turn(state: &mut RiderState) {
    if let Some(mut turn) = state.turn.take() {
        turn.finish(&mut state.visual);
        state.ground.manual_turn = turn.prior_manual_turn;
        let mirrored = state.visual.mirrored;
        state.emit(RiderEvent::TurnCompleted { mirrored });
    }
}

fn try_start_grind(
    state: &mut RiderState,
    input: &TickInput,
    world: &impl PhysicsWorld,
    contact: &ContactEvent,
    settings: &Settings,
) {
    if state.grinding() || state.grind_cooldown.active() {
        log::debug!("Grind refused: busy or cooling down");
        return;
    }
    let Some(path) = world.rail(contact.body) else {
        log::debug!("Grind refused: body {:?} has no rail path", contact.body);
        return;
    };
    let position = state.body.position;
    if position.y < contact.position.y {
        log::debug!("Grind refused: below the rail");
        return;
    }
    let closest = path.closest_point(position);
    let offset = Vec3::new(position.x - closest.x, 0.0, position.z - closest.z);
    if offset.length() > settings.grind.catch_radius {
        log::debug!("Grind refused: {:.2} from the rail", offset.length());
        return;
    }

    let kind = GrindKind::from_stance(input.manual_nose, input.manual_tail, input.steering());
    let Some(follower) = GrindFollower::start(path.clone(), kind, position) else {
        return;
    };

    // Dropping onto a rail lands whatever was in flight
    if let Some((trick, rotation)) = state.trick.cancel() {
        state.body.rotation = rotation;
        state.emit(RiderEvent::TrickCancelled(trick));
    }
    finish_turn(state);

    log::info!("Grind {} on {:?}", kind.name(), contact.body);
    state.body.velocity = follower.direction() * settings.grind.speed;
    state.grind = Some(follower);
    state.grind_body = Some(contact.body);
    state.ground = Default::default();
    state.line.record_move();
    state.emit(RiderEvent::GrindStarted(kind));
}

/// Leave the rail: resume physics with a forward kick, block re-entry for a while
fn end_grind(state: &mut RiderState, exit: GrindExit, jump: Option<f32>, settings: &Settings) {
    let Some(follower) = state.grind.take() else {
        return;
    };
    state.grind_body = None;

    let facing = follower.direction();
    let speed = settings.grind.speed + settings.grind.exit_kick;
    state.body.velocity = facing * speed;
    state.body.forward_speed = speed.min(settings.locomotion.max_speed);
    state.body.steer_speed = 0.0;
    if let Some(impulse) = jump {
        state.body.velocity.y += impulse;
        state.emit(RiderEvent::Jumped { impulse });
    }
    state.grind_cooldown.start(settings.grind.cooldown);
    log::info!("Grind {} ended: {:?}", follower.kind.name(), exit);
    state.emit(RiderEvent::GrindEnded(exit));
}

/// Follow the rail, or jump off it
fn ride_rail(state: &mut RiderState, input: &TickInput, settings: &Settings, dt: f32) {
    if let Some(hold) = input.jump_released {
        let impulse = locomotion::jump_impulse(hold, &settings.locomotion);
        end_grind(state, GrindExit::Jumped, Some(impulse), settings);
        return;
    }
    let Some(follower) = state.grind.as_mut() else {
        return;
    };
    match follower.advance(dt, settings.grind.speed) {
        GrindStep::Riding { target, direction } => {
            let (position, rotation) = GrindFollower::ease_transform(
                state.body.position,
                state.body.rotation,
                target,
                direction,
                &settings.grind,
                dt,
            );
            state.body.position = position;
            state.body.rotation = rotation;
            state.body.velocity = direction * settings.grind.speed;
        }
        GrindStep::Exhausted => end_grind(state, GrindExit::Exhausted, None, settings),
    }
}

/// Trick input, trick progress and idle lean
fn run_tricks(state: &mut RiderState, input: &TickInput, settings: &Settings, dt: f32) {
    if let Some(pressed) = input.trick {
        match state.trick.kind() {
            Some(current) => {
                // Only pairs in the combo table redirect a trick in flight
                if let Some(combo) = current.combo_with(pressed) {
                    if state
                        .trick
                        .upgrade_to_combo(combo, state.clock, settings.trick.combo_window)
                    {
                        state.emit(RiderEvent::ComboUpgraded {
                            from: current,
                            to: combo,
                        });
                    }
                }
            }
            None => {
                let ctx = TrickContext {
                    grounded: state.ground.grounded,
                    grinding: state.grinding(),
                    now: state.clock,
                };
                if state.trick.start(pressed, state.body.rotation, ctx) {
                    state.line.record_move();
                    state.emit(RiderEvent::TrickStarted(pressed));
                }
            }
        }
    }

    match state.trick.advance(dt, settings.trick.duration) {
        TrickAdvance::Spinning(rotation) => state.body.rotation = rotation,
        TrickAdvance::Completed { kind, rotation } => {
            state.body.rotation = rotation;
            state.emit(RiderEvent::TrickCompleted(kind));
        }
        TrickAdvance::Idle => {
            if !state.grinding() && !state.ground.manual_turn {
                state.body.rotation = stance_lean(
                    state.body.rotation,
                    state.body.lateral_velocity(),
                    &settings.trick,
                    dt,
                );
            }
        }
    }
}

fn run_turn(state: &mut RiderState, input: &TickInput, settings: &Settings, dt: f32) {
    if let Some(direction) = input.turn {
        let ctx = TurnContext {
            grounded: state.ground.grounded,
            grinding: state.grinding(),
            spin_active: state.trick.kind().is_some_and(|k| k.spins_yaw()),
            manual_turn: state.ground.manual_turn,
        };
        if TurnManeuver::begin(&mut state.turn, direction, ctx, &settings.turn) {
            state.emit(RiderEvent::TurnStarted { direction });
        }
    }

    let Some(turn) = state.turn.as_mut() else {
        return;
    };
    if turn.advance(dt, &mut state.visual) {
        let prior = turn.prior_manual_turn;
        state.turn = None;
        state.ground.manual_turn = prior;
        let mirrored = state.visual.mirrored;
        state.emit(RiderEvent::TurnCompleted { mirrored });
    }
}

/// Physics step when not on a rail. Returns true if the rider jumped.
fn move_body(
    state: &mut RiderState,
    input: &TickInput,
    world: &impl PhysicsWorld,
    settings: &Settings,
    dt: f32,
) -> bool {
    let tuning = &settings.locomotion;
    let mut grounded = state.ground.grounded;
    let mut jumped = false;

    if grounded {
        locomotion::drive(&mut state.body, input.drive(), tuning, dt);
        if let Some(hold) = input.jump_released {
            let impulse = locomotion::jump_impulse(hold, tuning);
            state.body.velocity.y = impulse;
            grounded = false;
            jumped = true;
            state.emit(RiderEvent::Jumped { impulse });
        }
    }

    locomotion::integrate(
        &mut state.body,
        world,
        grounded,
        tuning,
        settings.ground.ground_mask,
        dt,
    );
    jumped
}

/// Resolve foot targets and solve both legs (cosmetic, runs last)
fn pose_legs(state: &mut RiderState, settings: &Settings, dt: f32) {
    let board_rotation = state.visual.board_rotation(state.body.rotation);
    let character_rotation = state.visual.character_rotation();
    let facing = board_rotation * WORLD_FORWARD;
    let board_heading = facing.x.atan2(facing.z).to_degrees();
    let frame = FootFrame {
        position: state.body.position,
        board_rotation,
        character_rotation,
        board_yaw: wrap_degrees(board_heading - state.visual.character_yaw),
    };
    let pattern = FootPattern::select(
        state.trick.kind(),
        state.grind.as_ref().map(|g| g.kind),
        state.ground.nose_raised,
        state.ground.tail_raised,
    );
    let targets = state.feet.resolve(
        &frame,
        pattern,
        state.trick.progress(),
        state.trick.is_active(),
        &settings.feet,
        dt,
    );

    if !settings.ik.enabled {
        return;
    }
    // Legs are rigged in character space
    let to_local = |p: Vec3| character_rotation.inverse() * (p - frame.position);
    let mirrored = state.visual.mirrored;
    let weight = settings.ik.weight;
    for (leg, target) in [
        (state.legs.back.as_mut(), targets.back),
        (state.legs.front.as_mut(), targets.front),
    ] {
        if let Some(leg) = leg {
            leg.set_mirrored(mirrored);
            leg.solve(to_local(target), weight);
        }
    }
}

/// Obstacle hit: drop everything and freeze
fn slam(state: &mut RiderState, settings: &Settings) {
    if state.grinding() {
        end_grind(state, GrindExit::Slammed, None, settings);
    }
    if let Some((kind, _)) = state.trick.cancel() {
        state.emit(RiderEvent::TrickCancelled(kind));
    }
    state.turn = None;
    state.body.velocity = Vec3::ZERO;
    state.body.forward_speed = 0.0;
    state.body.steer_speed = 0.0;
    if state.line.multiplier != 1.0 {
        state.emit(RiderEvent::MultiplierChanged(1.0));
    }
    state.line.end();
    state.slammed = true;
    log::info!("Slammed at {:?}", state.body.position);
    state.emit(RiderEvent::Slammed);
}

/// Forward a tick's events to the scoring and clip collaborators
pub fn dispatch(events: &[RiderEvent], scores: &mut impl ScoreSink, clips: &mut impl ClipSink) {
    for event in events {
        match *event {
            RiderEvent::TrickStarted(kind) => {
                scores.enqueue_recent_trick(kind.name());
                scores.add_score(kind.score());
            }
            RiderEvent::ComboUpgraded { from, to } => {
                // The combo replaces the trick it grew from
                scores.enqueue_recent_trick(to.name());
                scores.add_score(to.score().saturating_sub(from.score()));
            }
            RiderEvent::GrindStarted(kind) => {
                scores.enqueue_recent_trick(kind.name());
                scores.add_score(kind.score());
            }
            RiderEvent::MultiplierChanged(multiplier) => scores.set_score_multiplier(multiplier),
            RiderEvent::Slammed => scores.set_slammed(true),
            RiderEvent::Respawned => scores.set_slammed(false),
            _ => {}
        }
        if let Some(clip) = Clip::for_event(event) {
            clips.play_clip(clip.name());
        }
    }
}

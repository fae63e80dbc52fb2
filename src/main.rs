//! Skateline entry point
//!
//! Runs a headless session: a seeded autopilot rides a small course with a
//! ramp, a rail and an obstacle, and the run is summarized at the end.
//!
//! Usage: `skateline [settings.json] [seconds] [seed]`

use glam::Vec3;

use skateline::consts::{MAX_SUBSTEPS, SIM_DT};
use skateline::cues::ClipLog;
use skateline::scoring::ScoreBoard;
use skateline::settings::Settings;
use skateline::sim::{
    Autopilot, BodyId, ContactPhase, GroundPlane, LegBones, Legs, RailError, RailPath, RiderState,
    StaticWorld, dispatch, tick,
};

/// Simulated display frame rate
const FRAME_DT: f32 = 1.0 / 60.0;
/// Obstacle across the lane at this distance
const OBSTACLE_Z: f32 = 120.0;
const OBSTACLE_HALF_WIDTH: f32 = 1.5;

fn build_course() -> Result<(StaticWorld, BodyId), RailError> {
    let mut world = StaticWorld::flat(0.0);
    world.add_plane(
        GroundPlane::ramp(Vec3::new(0.0, 0.0, 30.0), 15.0).with_bounds([-3.0, 30.0], [3.0, 38.0]),
    );
    world.add_rail(RailPath::new(vec![
        Vec3::new(0.0, 0.5, 60.0),
        Vec3::new(0.0, 0.5, 68.0),
        Vec3::new(0.5, 0.5, 76.0),
    ])?);
    let obstacle = world.add_obstacle();
    Ok((world, obstacle))
}

fn main() {
    env_logger::init();
    log::info!("Skateline (headless) starting...");

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => Settings::load(&path).unwrap_or_else(|e| {
            log::warn!("Failed to load settings from {path}: {e}, using defaults");
            Settings::default()
        }),
        None => Settings::default(),
    };
    let seconds: f32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(60.0);
    let seed: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(1);

    let (mut world, obstacle) = match build_course() {
        Ok(course) => course,
        Err(e) => {
            log::error!("Failed to build course: {e}");
            return;
        }
    };

    let legs = Legs::bind(&LegBones::standing(-0.12), &LegBones::standing(0.12));
    let spawn = Vec3::new(0.0, settings.locomotion.ride_height, 0.0);
    let mut state = RiderState::new(spawn, settings.locomotion.cruise_speed).with_legs(legs);
    let mut pilot = Autopilot::new(seed);
    let mut scores = ScoreBoard::new(settings.scoring.display_lerp);
    let mut clips = ClipLog::default();
    let mut touching = Vec::new();
    let mut best = 0u64;

    let frames = (seconds / FRAME_DT).ceil() as u32;
    let mut accumulator = 0.0f32;
    for _ in 0..frames {
        accumulator += FRAME_DT;

        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = pilot.next_input(&state, SIM_DT);

            let p = state.body.position;
            world.detect_rail_contacts(p, settings.grind.catch_radius, &mut touching);
            if p.z < OBSTACLE_Z
                && p.z + state.body.velocity.z * SIM_DT >= OBSTACLE_Z
                && p.x.abs() < OBSTACLE_HALF_WIDTH
                && p.y < 1.0
            {
                world.push_contact(ContactPhase::Begin, obstacle, p);
            }

            tick(&mut state, &input, &world, &settings, SIM_DT);
            dispatch(&state.events, &mut scores, &mut clips);
            for event in &state.events {
                log::debug!("t={:.3} {:?}", state.clock, event);
            }
            best = best.max(scores.score());
            world.clear_contacts();

            accumulator -= SIM_DT;
            substeps += 1;
        }
        scores.update(FRAME_DT);
    }

    log::info!(
        "Ran {:.1}s ({} ticks), {} clips played",
        state.clock,
        state.time_ticks,
        clips.played.len()
    );
    println!("{}", scores.summary());
    println!("Best score: {best}");
    println!("Recent: {}", scores.recent.join(", "));
}

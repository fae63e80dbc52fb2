//! Physics/world collaborator
//!
//! The rider core never owns level geometry. It asks the world for ray hits
//! against a layer mask, reads this tick's collision begin/end events, and
//! looks up rail paths by body id. [`StaticWorld`] is a small in-memory world
//! used by the demo binary and the tests.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::grind::RailPath;
use crate::consts::GROUND_LAYER;

/// Identity of a colliding body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u32);

/// What a body is, as far as the rider is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Surface {
    Ground,
    Rail,
    Obstacle,
}

/// Result of a ray query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

/// Collision phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactPhase {
    Begin,
    End,
}

/// Collision event raised by the physics step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactEvent {
    pub phase: ContactPhase,
    pub body: BodyId,
    /// World position of the other body
    pub position: Vec3,
}

/// Everything the rider needs from the physics world for one tick
pub trait PhysicsWorld {
    /// Cast a ray and return the closest hit within `max_distance` on `mask`
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, mask: u32)
    -> Option<RayHit>;

    /// Collision events raised since the previous tick
    fn contacts(&self) -> &[ContactEvent];

    /// Rail path for a rail body
    fn rail(&self, body: BodyId) -> Option<&RailPath>;

    /// Kind of a body (unknown bodies count as ground)
    fn surface(&self, body: BodyId) -> Surface;
}

/// Infinite (or bounded) plane used as ground
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundPlane {
    pub point: Vec3,
    pub normal: Vec3,
    /// Optional `[min, max]` bounds on the hit point, in the XZ plane
    pub bounds: Option<([f32; 2], [f32; 2])>,
    pub layer: u32,
}

impl GroundPlane {
    pub fn flat(height: f32) -> Self {
        Self {
            point: Vec3::new(0.0, height, 0.0),
            normal: Vec3::Y,
            bounds: None,
            layer: GROUND_LAYER,
        }
    }

    /// A ramp rising along +Z by `angle_deg`
    pub fn ramp(origin: Vec3, angle_deg: f32) -> Self {
        let a = angle_deg.to_radians();
        Self {
            point: origin,
            normal: Vec3::new(0.0, a.cos(), -a.sin()),
            bounds: None,
            layer: GROUND_LAYER,
        }
    }

    pub fn with_bounds(mut self, min: [f32; 2], max: [f32; 2]) -> Self {
        self.bounds = Some((min, max));
        self
    }

    fn intersect(&self, origin: Vec3, direction: Vec3) -> Option<(f32, Vec3)> {
        let denom = self.normal.dot(direction);
        if denom.abs() < 1e-6 {
            return None;
        }
        let t = self.normal.dot(self.point - origin) / denom;
        if t < 0.0 {
            return None;
        }
        let hit = origin + direction * t;
        if let Some((min, max)) = self.bounds {
            if hit.x < min[0] || hit.x > max[0] || hit.z < min[1] || hit.z > max[1] {
                return None;
            }
        }
        Some((t, hit))
    }
}

/// A rail or obstacle body
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Body {
    id: BodyId,
    surface: Surface,
    rail: Option<RailPath>,
}

/// Simple in-memory world: planes, rails, obstacles and a contact queue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticWorld {
    pub planes: Vec<GroundPlane>,
    bodies: Vec<Body>,
    contacts: Vec<ContactEvent>,
    next_id: u32,
}

impl StaticWorld {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    /// World with a single flat ground plane at `height`
    pub fn flat(height: f32) -> Self {
        let mut world = Self::new();
        world.planes.push(GroundPlane::flat(height));
        world
    }

    pub fn add_plane(&mut self, plane: GroundPlane) {
        self.planes.push(plane);
    }

    fn allocate(&mut self) -> BodyId {
        let id = BodyId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        id
    }

    pub fn add_rail(&mut self, path: RailPath) -> BodyId {
        let id = self.allocate();
        self.bodies.push(Body {
            id,
            surface: Surface::Rail,
            rail: Some(path),
        });
        id
    }

    pub fn add_obstacle(&mut self) -> BodyId {
        let id = self.allocate();
        self.bodies.push(Body {
            id,
            surface: Surface::Obstacle,
            rail: None,
        });
        id
    }

    /// Queue a contact event for the next tick
    pub fn push_contact(&mut self, phase: ContactPhase, body: BodyId, position: Vec3) {
        self.contacts.push(ContactEvent {
            phase,
            body,
            position,
        });
    }

    /// Drop delivered contact events (call after each tick)
    pub fn clear_contacts(&mut self) {
        self.contacts.clear();
    }

    /// Emit begin/end events for rails the rider is touching, by proximity.
    ///
    /// `touching` tracks which rails were in contact on the previous call.
    pub fn detect_rail_contacts(
        &mut self,
        rider: Vec3,
        radius: f32,
        touching: &mut Vec<BodyId>,
    ) {
        let mut events = Vec::new();
        for body in &self.bodies {
            let Some(rail) = &body.rail else { continue };
            let closest = rail.closest_point(rider);
            let near = (closest - rider).length() <= radius;
            let was = touching.contains(&body.id);
            if near && !was {
                touching.push(body.id);
                events.push((ContactPhase::Begin, body.id, closest));
            } else if !near && was {
                touching.retain(|id| *id != body.id);
                events.push((ContactPhase::End, body.id, closest));
            }
        }
        for (phase, body, position) in events {
            self.push_contact(phase, body, position);
        }
    }
}

impl PhysicsWorld for StaticWorld {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: u32,
    ) -> Option<RayHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }
        self.planes
            .iter()
            .filter(|p| p.layer & mask != 0)
            .filter_map(|p| p.intersect(origin, direction).map(|hit| (hit, p.normal)))
            .filter(|((t, _), _)| *t <= max_distance)
            .min_by(|a, b| a.0.0.total_cmp(&b.0.0))
            .map(|((distance, point), normal)| RayHit {
                point,
                normal,
                distance,
            })
    }

    fn contacts(&self) -> &[ContactEvent] {
        &self.contacts
    }

    fn rail(&self, body: BodyId) -> Option<&RailPath> {
        self.bodies
            .iter()
            .find(|b| b.id == body)
            .and_then(|b| b.rail.as_ref())
    }

    fn surface(&self, body: BodyId) -> Surface {
        self.bodies
            .iter()
            .find(|b| b.id == body)
            .map(|b| b.surface)
            .unwrap_or(Surface::Ground)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::RAIL_LAYER;

    #[test]
    fn test_raycast_flat_ground() {
        let world = StaticWorld::flat(0.0);
        let hit = world
            .raycast(Vec3::new(0.0, 0.2, 0.0), -Vec3::Y, 1.0, GROUND_LAYER)
            .unwrap();
        assert!((hit.distance - 0.2).abs() < 1e-6);
        assert!(hit.point.y.abs() < 1e-6);
    }

    #[test]
    fn test_raycast_respects_distance_and_mask() {
        let world = StaticWorld::flat(0.0);
        assert!(
            world
                .raycast(Vec3::new(0.0, 2.0, 0.0), -Vec3::Y, 1.0, GROUND_LAYER)
                .is_none()
        );
        assert!(
            world
                .raycast(Vec3::new(0.0, 0.2, 0.0), -Vec3::Y, 1.0, RAIL_LAYER)
                .is_none()
        );
    }

    #[test]
    fn test_raycast_picks_closest_plane() {
        let mut world = StaticWorld::flat(0.0);
        world.add_plane(GroundPlane::flat(0.5).with_bounds([-1.0, -1.0], [1.0, 1.0]));
        let hit = world
            .raycast(Vec3::new(0.0, 1.0, 0.0), -Vec3::Y, 5.0, GROUND_LAYER)
            .unwrap();
        assert!((hit.point.y - 0.5).abs() < 1e-6);

        // Outside the bounded plane the lower one is hit
        let hit = world
            .raycast(Vec3::new(3.0, 1.0, 0.0), -Vec3::Y, 5.0, GROUND_LAYER)
            .unwrap();
        assert!(hit.point.y.abs() < 1e-6);
    }

    #[test]
    fn test_rail_lookup_and_contacts() {
        let mut world = StaticWorld::flat(0.0);
        let rail = RailPath::new(vec![Vec3::new(0.0, 0.5, 0.0), Vec3::new(0.0, 0.5, 10.0)]).unwrap();
        let id = world.add_rail(rail);
        assert_eq!(world.surface(id), Surface::Rail);
        assert!(world.rail(id).is_some());

        let mut touching = Vec::new();
        world.detect_rail_contacts(Vec3::new(0.0, 0.6, 2.0), 0.3, &mut touching);
        assert_eq!(world.contacts().len(), 1);
        assert_eq!(world.contacts()[0].phase, ContactPhase::Begin);

        world.clear_contacts();
        world.detect_rail_contacts(Vec3::new(3.0, 0.6, 2.0), 0.3, &mut touching);
        assert_eq!(world.contacts()[0].phase, ContactPhase::End);
        assert!(touching.is_empty());
    }

    #[test]
    fn test_world_json_rejects_broken_rail() {
        let mut world = StaticWorld::flat(0.0);
        let rail = RailPath::new(vec![Vec3::new(0.0, 0.5, 0.0), Vec3::new(0.0, 0.5, 10.0)]).unwrap();
        let id = world.add_rail(rail);

        let mut json = serde_json::to_value(&world).unwrap();
        let restored: StaticWorld = serde_json::from_value(json.clone()).unwrap();
        assert!(restored.rail(id).is_some());

        json["bodies"][0]["rail"] = serde_json::json!([]);
        assert!(serde_json::from_value::<StaticWorld>(json).is_err());
    }
}

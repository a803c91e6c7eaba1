#![warn(missing_docs)]
//! Physics primitives: layered colliders and masked raycasts.

use glam::Vec3;
use parallel_worlds_core::{EntityId, Layer, LayerMask};
use std::collections::BTreeMap;

/// Axis-aligned bounding box used for collisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner (x, y, z).
    pub min: [f32; 3],
    /// Maximum corner (x, y, z).
    pub max: [f32; 3],
}

impl Aabb {
    /// Create a new AABB ensuring min <= max per axis.
    pub fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        debug_assert!(min[0] <= max[0] && min[1] <= max[1] && min[2] <= max[2]);
        Self { min, max }
    }

    /// Box of the given half extents around `center`.
    pub fn around(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(
            (center - half_extents).to_array(),
            (center + half_extents).to_array(),
        )
    }

    /// Slab test. Returns the entry distance along `direction` (unit length)
    /// if the ray enters the box within `max_distance`; a ray starting inside
    /// reports 0.
    pub fn ray_entry(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<f32> {
        let min = Vec3::from_array(self.min);
        let max = Vec3::from_array(self.max);

        let mut t_enter = 0.0_f32;
        let mut t_exit = max_distance;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            if d.abs() < f32::EPSILON {
                if o < min[axis] || o > max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t0 = (min[axis] - o) * inv;
            let mut t1 = (max[axis] - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return None;
            }
        }

        Some(t_enter)
    }
}

/// A box placed on one layer, optionally owned by a player entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider {
    /// Bounds in world space.
    pub bounds: Aabb,
    /// Layer the box lives on.
    pub layer: Layer,
}

/// Result of a masked raycast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Player hit, or `None` for level geometry.
    pub entity: Option<EntityId>,
    /// Distance from the ray origin.
    pub distance: f32,
    /// World-space hit point.
    pub point: Vec3,
    /// Layer of the collider that was hit.
    pub layer: Layer,
}

/// All colliders a hit-scan can resolve against.
///
/// Player colliders are keyed by entity so iteration order is deterministic.
#[derive(Debug, Default, Clone)]
pub struct CollisionWorld {
    bodies: BTreeMap<EntityId, Collider>,
    geometry: Vec<Collider>,
}

impl CollisionWorld {
    /// Empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add static level geometry.
    pub fn add_geometry(&mut self, collider: Collider) {
        self.geometry.push(collider);
    }

    /// Insert or replace a player's collider.
    pub fn set_body(&mut self, entity: EntityId, collider: Collider) {
        self.bodies.insert(entity, collider);
    }

    /// Remove a player's collider (death, despawn).
    pub fn remove_body(&mut self, entity: EntityId) -> Option<Collider> {
        self.bodies.remove(&entity)
    }

    /// Look up a player's collider.
    pub fn body(&self, entity: EntityId) -> Option<&Collider> {
        self.bodies.get(&entity)
    }

    /// Cast a ray against every collider whose layer is in `mask`, ignoring
    /// the collider of `ignore` (the shooter's own body).
    ///
    /// `direction` need not be normalized; a zero direction never hits.
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
        ignore: Option<EntityId>,
    ) -> Option<RayHit> {
        let direction = direction.try_normalize()?;

        let bodies = self
            .bodies
            .iter()
            .filter(|(entity, _)| Some(**entity) != ignore)
            .map(|(entity, collider)| (Some(*entity), collider));
        let geometry = self.geometry.iter().map(|collider| (None, collider));

        bodies
            .chain(geometry)
            .filter(|(_, collider)| mask.includes(collider.layer))
            .filter_map(|(entity, collider)| {
                collider
                    .bounds
                    .ray_entry(origin, direction, max_distance)
                    .map(|distance| RayHit {
                        entity,
                        distance,
                        point: origin + direction * distance,
                        layer: collider.layer,
                    })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

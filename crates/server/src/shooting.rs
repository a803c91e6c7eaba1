//! Hit-scan resolution.

use glam::Vec3;
use parallel_worlds_core::{EntityId, LayerMask};
use parallel_worlds_physics::CollisionWorld;

/// Result of one resolved shot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotOutcome {
    /// Whether the ray struck anything within range.
    pub hit: bool,
    /// Player struck, if the hit was a player.
    pub target: Option<EntityId>,
    /// Impact point, or the end of the ray on a miss.
    pub point: Vec3,
}

/// Cast the shooter's ray against colliders on `shoot_mask`.
///
/// The shooter's own collider never blocks the shot.
pub fn fire_shot(
    world: &CollisionWorld,
    shooter: EntityId,
    origin: Vec3,
    direction: Vec3,
    shoot_mask: LayerMask,
    max_range: f32,
) -> ShotOutcome {
    match world.raycast(origin, direction, max_range, shoot_mask, Some(shooter)) {
        Some(hit) => ShotOutcome {
            hit: true,
            target: hit.entity,
            point: hit.point,
        },
        None => ShotOutcome {
            hit: false,
            target: None,
            point: origin + direction.normalize_or_zero() * max_range,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parallel_worlds_core::{Layer, Universe};
    use parallel_worlds_physics::{Aabb, Collider};

    #[test]
    fn universe_a_shot_passes_through_universe_b_body() {
        let mut world = CollisionWorld::new();
        world.set_body(
            EntityId(2),
            Collider {
                bounds: Aabb::around(Vec3::new(0.0, 0.0, 5.0), Vec3::splat(0.5)),
                layer: Layer::UniverseB,
            },
        );

        let outcome = fire_shot(
            &world,
            EntityId(1),
            Vec3::ZERO,
            Vec3::Z,
            LayerMask::shoot(Universe::A),
            50.0,
        );
        assert!(!outcome.hit);
        assert_eq!(outcome.target, None);
        assert!((outcome.point.z - 50.0).abs() < 1e-4);

        let outcome = fire_shot(
            &world,
            EntityId(1),
            Vec3::ZERO,
            Vec3::Z,
            LayerMask::shoot(Universe::B),
            50.0,
        );
        assert_eq!(outcome.target, Some(EntityId(2)));
    }
}

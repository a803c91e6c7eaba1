//! Rendering layers, culling masks and shoot masks.
//!
//! Each universe owns a home layer plus a collision-echo layer. An echo
//! layer holds an object that physically belongs to one universe but is drawn
//! as if it were in the other; it only appears while a subject is mid-swap and
//! seen by a viewer on the far side.
//!
//! | layer                       | index |
//! |-----------------------------|-------|
//! | `Universe_A`                | 8     |
//! | `Universe_B`                | 9     |
//! | `Universe_A_Collision_B`    | 10    |
//! | `Universe_B_Collision_A`    | 11    |

use crate::universe::{Universe, UniverseState};
use bitflags::bitflags;

/// A single rendering/collision layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Layer {
    /// Home layer of universe A.
    UniverseA = 8,
    /// Home layer of universe B.
    UniverseB = 9,
    /// Echo layer seen from universe A.
    UniverseACollisionB = 10,
    /// Echo layer seen from universe B.
    UniverseBCollisionA = 11,
}

bitflags! {
    /// Set of layers, one bit per layer index.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LayerMask: u32 {
        /// `Universe_A`.
        const UNIVERSE_A = 1 << 8;
        /// `Universe_B`.
        const UNIVERSE_B = 1 << 9;
        /// `Universe_A_Collision_B`.
        const UNIVERSE_A_COLLISION_B = 1 << 10;
        /// `Universe_B_Collision_A`.
        const UNIVERSE_B_COLLISION_A = 1 << 11;
    }
}

impl Layer {
    /// Layer index.
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Single-bit mask for this layer.
    pub const fn mask(self) -> LayerMask {
        LayerMask::from_bits_truncate(1 << self.index())
    }

    /// Canonical layer name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::UniverseA => "Universe_A",
            Self::UniverseB => "Universe_B",
            Self::UniverseACollisionB => "Universe_A_Collision_B",
            Self::UniverseBCollisionA => "Universe_B_Collision_A",
        }
    }

    /// Home layer of `universe`.
    pub const fn home(universe: Universe) -> Option<Self> {
        match universe {
            Universe::A => Some(Self::UniverseA),
            Universe::B => Some(Self::UniverseB),
            Universe::Undefined => None,
        }
    }

    /// Echo layer an off-universe subject is bent into for a viewer in
    /// `viewer`.
    pub const fn echo_seen_from(viewer: Universe) -> Option<Self> {
        match viewer {
            Universe::A => Some(Self::UniverseACollisionB),
            Universe::B => Some(Self::UniverseBCollisionA),
            Universe::Undefined => None,
        }
    }
}

impl LayerMask {
    /// What a camera in `universe` draws: its home layer plus whatever is bent
    /// into it.
    pub const fn culling(universe: Universe) -> Self {
        match universe {
            Universe::A => Self::UNIVERSE_A.union(Self::UNIVERSE_A_COLLISION_B),
            Universe::B => Self::UNIVERSE_B.union(Self::UNIVERSE_B_COLLISION_A),
            Universe::Undefined => Self::empty(),
        }
    }

    /// What a shooter in `universe` can hit: its home layer plus its own
    /// subjects as drawn for the other side.
    pub const fn shoot(universe: Universe) -> Self {
        match universe {
            Universe::A => Self::UNIVERSE_A.union(Self::UNIVERSE_B_COLLISION_A),
            Universe::B => Self::UNIVERSE_B.union(Self::UNIVERSE_A_COLLISION_B),
            Universe::Undefined => Self::empty(),
        }
    }

    /// True when `layer` is part of this mask.
    pub const fn includes(self, layer: Layer) -> bool {
        self.contains(layer.mask())
    }
}

/// Derived layer configuration of one subject as seen by one observer.
///
/// Never stored or transmitted; recompute it whenever either input changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniverseLayerSettings {
    /// Subject's owning universe.
    pub universe: Universe,
    /// Layer the subject's visuals are placed on for this observer.
    pub render_layer: Layer,
    /// Camera culling mask (meaningful for the subject's own camera).
    pub culling_mask: LayerMask,
    /// Hit-scan mask the subject fires with.
    pub shoot_mask: LayerMask,
}

/// Resolve the layer settings of `subject` for an observer whose own state is
/// `viewer`.
///
/// `viewer` is absent when there is no locally controlled player (a dedicated
/// authority); an unassigned viewer counts as absent. Returns `None` until the
/// subject has a universe.
pub fn resolve(
    subject: UniverseState,
    viewer: Option<UniverseState>,
) -> Option<UniverseLayerSettings> {
    let home = Layer::home(subject.universe)?;
    let viewer = viewer.filter(UniverseState::is_assigned);

    let render_layer = match viewer {
        Some(viewer) if subject.transition.is_swapping() && viewer.universe != subject.universe => {
            Layer::echo_seen_from(viewer.universe).unwrap_or(home)
        }
        _ => home,
    };

    Some(UniverseLayerSettings {
        universe: subject.universe,
        render_layer,
        culling_mask: LayerMask::culling(subject.universe),
        shoot_mask: LayerMask::shoot(subject.universe),
    })
}

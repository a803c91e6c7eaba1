//! Universe membership.
//!
//! Every player occupies one of two overlapping worlds. The pair of a
//! universe and a transition phase is the single replicated fact about a
//! player's membership; everything else (layers, masks, effects) is derived
//! from it.

use serde::{Deserialize, Serialize};

/// One of the two parallel worlds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum Universe {
    /// Not yet assigned. Only seen before a player's first spawn.
    #[default]
    Undefined = 0,
    /// Universe A.
    A = 1,
    /// Universe B.
    B = 2,
}

impl Universe {
    /// The two assignable universes, in stable order.
    pub const REAL: [Self; 2] = [Self::A, Self::B];

    /// The other universe.
    ///
    /// Must not be called with [`Universe::Undefined`]; release builds map it
    /// to itself.
    pub const fn opposite(self) -> Self {
        debug_assert!(!matches!(self, Self::Undefined));
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
            Self::Undefined => Self::Undefined,
        }
    }

    /// Whether this is A or B.
    pub const fn is_real(self) -> bool {
        !matches!(self, Self::Undefined)
    }

    /// Canonical string key used in configs/logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::A => "a",
            Self::B => "b",
        }
    }
}

/// Phase of a player's universe swap cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransitionState {
    /// Stable membership.
    #[default]
    Normal = 0,
    /// Leaving the old universe; `universe` still names the old one.
    SwapOut = 1,
    /// Arrived in the new universe and settling.
    SwapIn = 2,
}

impl TransitionState {
    /// True for the two transient phases.
    pub const fn is_swapping(self) -> bool {
        !matches!(self, Self::Normal)
    }

    /// Canonical string key used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::SwapOut => "swap_out",
            Self::SwapIn => "swap_in",
        }
    }
}

/// Authoritative universe membership of one player.
///
/// `universe` is the logical owning universe even mid-transition: it flips
/// exactly on the SwapOut -> SwapIn edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UniverseState {
    /// Owning universe.
    pub universe: Universe,
    /// Current phase.
    pub transition: TransitionState,
}

impl UniverseState {
    /// Construct a state from its parts.
    pub const fn new(universe: Universe, transition: TransitionState) -> Self {
        Self {
            universe,
            transition,
        }
    }

    /// State of a freshly spawned player.
    pub const fn spawned(universe: Universe) -> Self {
        Self::new(universe, TransitionState::Normal)
    }

    /// True when no swap cycle is in flight.
    pub const fn is_normal(&self) -> bool {
        matches!(self.transition, TransitionState::Normal)
    }

    /// True once a real universe has been assigned.
    pub const fn is_assigned(&self) -> bool {
        self.universe.is_real()
    }
}

impl std::fmt::Display for UniverseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.universe.as_str(), self.transition.as_str())
    }
}

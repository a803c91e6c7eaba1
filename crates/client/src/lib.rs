#![warn(missing_docs)]
//! Observer-side session view and presentation glue.
//!
//! A [`ClientView`] consumes server messages, keeps read-only replicas of
//! every player's universe state and pushes the derived layer settings and
//! effects into a [`Presentation`].

mod presentation;
mod swap_effect;
mod view;
mod viewer_bus;

pub use presentation::{NullPresentation, Presentation, PresentationCall, RecordingPresentation};
pub use swap_effect::SwapEffectDriver;
pub use view::{ClientView, PlayerReplica};
pub use viewer_bus::{ViewerBus, ViewerChanged, ViewerSubscription};

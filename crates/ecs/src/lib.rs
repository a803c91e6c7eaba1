#![warn(missing_docs)]
//! ECS schedule helpers wrapping `bevy_ecs` for deterministic staging.

use bevy_ecs::schedule::{IntoSystemSetConfigs, Schedule, ScheduleLabel, Schedules, SystemSet};
use bevy_ecs::world::World;
use parallel_worlds_core::SimTick;

/// Label of the per-tick session schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ScheduleLabel)]
pub struct SessionSchedule;

/// Ordered stages of one session tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SystemSet)]
pub enum SimSet {
    /// Server-side input sources (bots) queue their intents.
    Intake,
    /// In-flight universe transitions advance against the session clock.
    Transitions,
    /// Death/respawn bookkeeping.
    Lifecycle,
}

/// Build the session schedule with its stages chained in order.
pub fn build_session_schedule() -> Schedules {
    let mut schedules = Schedules::default();
    let mut schedule = Schedule::new(SessionSchedule);
    schedule.set_apply_final_deferred(true);
    schedule.configure_sets((SimSet::Intake, SimSet::Transitions, SimSet::Lifecycle).chain());
    schedules.insert(schedule);
    schedules
}

/// Run the session schedule for a given tick.
pub fn run_tick(world: &mut World, schedules: &mut Schedules, tick: SimTick) {
    tracing::trace!(tick = tick.0, "running session schedule");
    if let Some(schedule) = schedules.get_mut(SessionSchedule) {
        schedule.run(world);
    }
}

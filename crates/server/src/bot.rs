//! Server-controlled players.
//!
//! Bots feed the same intent queue as clients: a shot along their facing
//! every fire interval and, when enabled, a swap request every swap
//! interval.

use crate::components::{
    Bot, Dead, Intent, IntentKind, Intents, PlayerId, Pose, Rules, SessionClock,
};
use bevy_ecs::prelude::{Query, Res, ResMut, Without};
use parallel_worlds_core::TIME_EPSILON;

impl Bot {
    /// Schedule for a bot spawned at `now`.
    pub fn new(now: f64, fire_interval: f32, swap_interval: f32) -> Self {
        Self {
            next_fire: now + f64::from(fire_interval),
            next_swap: (swap_interval > 0.0).then(|| now + f64::from(swap_interval)),
        }
    }
}

/// Queue bot intents that are due.
pub fn drive_bots(
    clock: Res<SessionClock>,
    rules: Res<Rules>,
    mut intents: ResMut<Intents>,
    mut bots: Query<(&PlayerId, &Pose, &mut Bot), Without<Dead>>,
) {
    let now = clock.now();
    let fire_interval = f64::from(rules.0.bot.fire_interval);
    let swap_interval = f64::from(rules.0.bot.swap_interval);

    for (id, pose, mut bot) in bots.iter_mut() {
        if let Some(next_swap) = bot.next_swap {
            if now + TIME_EPSILON >= next_swap {
                intents.0.push(Intent {
                    entity: id.0,
                    kind: IntentKind::Swap,
                });
                bot.next_swap = Some(reschedule(next_swap, swap_interval, now));
            }
        }
        if now + TIME_EPSILON >= bot.next_fire {
            intents.0.push(Intent {
                entity: id.0,
                kind: IntentKind::Fire {
                    origin: pose.position,
                    direction: pose.facing,
                },
            });
            bot.next_fire = reschedule(bot.next_fire, fire_interval, now);
        }
    }
}

/// Next due time after `due`, skipping intervals missed while dead.
fn reschedule(due: f64, interval: f64, now: f64) -> f64 {
    let next = due + interval;
    if next <= now {
        now + interval
    } else {
        next
    }
}

//! Session event log for debugging and test assertions.
//!
//! Records authoritative session events as JSON lines.

use anyhow::{Context, Result};
use parallel_worlds_core::{EntityId, Universe, UniverseState};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Authoritative session event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// A player entered the session.
    PlayerSpawned {
        /// Tick when event occurred.
        tick: u64,
        /// Player entity.
        entity: EntityId,
        /// Assigned universe.
        universe: Universe,
        /// Whether the player is server-controlled.
        bot: bool,
    },

    /// A swap request was admitted.
    SwapAccepted {
        /// Tick when event occurred.
        tick: u64,
        /// Player entity.
        entity: EntityId,
    },

    /// A player's universe state changed.
    StateChanged {
        /// Tick when event occurred.
        tick: u64,
        /// Player entity.
        entity: EntityId,
        /// State after the change.
        state: UniverseState,
    },

    /// A shot was accepted and resolved.
    ShotFired {
        /// Tick when event occurred.
        tick: u64,
        /// Player that fired.
        shooter: EntityId,
        /// Player struck, if any.
        target: Option<EntityId>,
    },

    /// A shot reduced a player's health to zero.
    Kill {
        /// Tick when event occurred.
        tick: u64,
        /// Player credited.
        shooter: EntityId,
        /// Player killed.
        victim: EntityId,
    },

    /// A dead player came back.
    Respawned {
        /// Tick when event occurred.
        tick: u64,
        /// Player entity.
        entity: EntityId,
        /// Newly assigned universe.
        universe: Universe,
    },

    /// A player left the session.
    Despawned {
        /// Tick when event occurred.
        tick: u64,
        /// Player entity.
        entity: EntityId,
    },

    /// The match ended.
    GameOver {
        /// Tick when event occurred.
        tick: u64,
        /// Winning player.
        winner: EntityId,
    },
}

impl SessionEvent {
    /// Get the tick of this event.
    pub fn tick(&self) -> u64 {
        match self {
            SessionEvent::PlayerSpawned { tick, .. }
            | SessionEvent::SwapAccepted { tick, .. }
            | SessionEvent::StateChanged { tick, .. }
            | SessionEvent::ShotFired { tick, .. }
            | SessionEvent::Kill { tick, .. }
            | SessionEvent::Respawned { tick, .. }
            | SessionEvent::Despawned { tick, .. }
            | SessionEvent::GameOver { tick, .. } => *tick,
        }
    }
}

/// Event logger that writes session events to JSONL format.
pub struct EventLogger {
    writer: BufWriter<File>,
    events_written: u64,
}

impl std::fmt::Debug for EventLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLogger")
            .field("events_written", &self.events_written)
            .finish()
    }
}

impl EventLogger {
    /// Create a new event logger, truncating any existing file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create event log: {:?}", path.as_ref()))?;
        Ok(Self {
            writer: BufWriter::new(file),
            events_written: 0,
        })
    }

    /// Log a session event.
    pub fn log(&mut self, event: &SessionEvent) -> Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        writeln!(&mut self.writer)?;
        self.events_written += 1;
        Ok(())
    }

    /// Flush buffered writes.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Get number of events written.
    pub fn events_written(&self) -> u64 {
        self.events_written
    }
}

/// Load every event from a JSONL log. Blank lines are skipped.
pub fn load_events(path: impl AsRef<Path>) -> Result<Vec<SessionEvent>> {
    let file = File::open(path.as_ref())
        .with_context(|| format!("Failed to open event log: {:?}", path.as_ref()))?;
    let reader = BufReader::new(file);

    let mut events = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read line")?;
        if line.trim().is_empty() {
            continue;
        }
        let event: SessionEvent = serde_json::from_str(&line)
            .with_context(|| format!("Failed to parse line {}", line_num + 1))?;
        events.push(event);
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parallel_worlds_core::TransitionState;
    use tempfile::tempdir;

    #[test]
    fn test_event_log_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.jsonl");

        let events = vec![
            SessionEvent::PlayerSpawned {
                tick: 0,
                entity: EntityId(1),
                universe: Universe::A,
                bot: false,
            },
            SessionEvent::StateChanged {
                tick: 3,
                entity: EntityId(1),
                state: UniverseState::new(Universe::A, TransitionState::SwapOut),
            },
            SessionEvent::GameOver {
                tick: 9,
                winner: EntityId(1),
            },
        ];

        {
            let mut logger = EventLogger::create(&path).unwrap();
            for event in &events {
                logger.log(event).unwrap();
            }
            logger.flush().unwrap();
            assert_eq!(logger.events_written(), 3);
        }

        let loaded = load_events(&path).unwrap();
        assert_eq!(loaded, events);
        assert_eq!(loaded[1].tick(), 3);
    }

    #[test]
    fn test_event_uses_type_tag() {
        let line = serde_json::to_string(&SessionEvent::Despawned {
            tick: 2,
            entity: EntityId(5),
        })
        .unwrap();
        assert_eq!(line, r#"{"type":"Despawned","tick":2,"entity":5}"#);
    }

    #[test]
    fn test_missing_log_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(load_events(dir.path().join("missing.jsonl")).is_err());
    }
}

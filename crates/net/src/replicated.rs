//! Replicated values with change notification.
//!
//! The authority owns a [`ReplicatedValue`]; each observer holds a
//! [`Replica`] fed with `(seq, value)` writes. Writes may be lost or
//! repeated in transit, so a replica accepts only writes newer than the last
//! one it applied and reports a [`Change`] only when the value differs.

use tracing::trace;

/// Authority-side value. Every effective write bumps the sequence number and
/// marks the value dirty until the replication pass picks it up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicatedValue<T> {
    value: T,
    seq: u32,
    dirty: bool,
}

impl<T: Clone + PartialEq> ReplicatedValue<T> {
    /// Initial value at sequence 1, dirty.
    pub fn new(value: T) -> Self {
        Self {
            value,
            seq: 1,
            dirty: true,
        }
    }

    /// Current value.
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Sequence number of the current value.
    pub fn seq(&self) -> u32 {
        self.seq
    }

    /// Write a value. Returns `false` (and changes nothing) when it equals
    /// the current one.
    pub fn set(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        self.seq = self.seq.wrapping_add(1);
        self.dirty = true;
        true
    }

    /// Clear and return the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

/// An effective change observed by a replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change<T> {
    /// Last applied value, `None` on first delivery.
    pub previous: Option<T>,
    /// Newly applied value.
    pub current: T,
    /// Sequence number of the write.
    pub seq: u32,
}

/// Observer-side copy of a replicated value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replica<T> {
    last: Option<(u32, T)>,
}

impl<T> Default for Replica<T> {
    fn default() -> Self {
        Self { last: None }
    }
}

impl<T: Clone + PartialEq> Replica<T> {
    /// Replica that has not received anything yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last applied value.
    pub fn get(&self) -> Option<&T> {
        self.last.as_ref().map(|(_, value)| value)
    }

    /// Sequence number of the last applied write.
    pub fn seq(&self) -> Option<u32> {
        self.last.as_ref().map(|(seq, _)| *seq)
    }

    /// Apply a delivered write.
    ///
    /// Older-than-applied writes are discarded. A write that carries the
    /// same value as the applied one only advances the sequence. The first
    /// delivery always counts as a change.
    pub fn apply(&mut self, seq: u32, value: T) -> Option<Change<T>> {
        match &mut self.last {
            None => {
                self.last = Some((seq, value.clone()));
                Some(Change {
                    previous: None,
                    current: value,
                    seq,
                })
            }
            Some((last_seq, last_value)) => {
                if seq < *last_seq {
                    trace!(seq, last_seq = *last_seq, "stale replica write discarded");
                    return None;
                }
                *last_seq = seq;
                if *last_value == value {
                    return None;
                }
                let previous = std::mem::replace(last_value, value.clone());
                Some(Change {
                    previous: Some(previous),
                    current: value,
                    seq,
                })
            }
        }
    }
}

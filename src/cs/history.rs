//! Per-context acquisition history.
//!
//! Each context remembers the last [`HISTORY_LEN`] VCI mutex ids it asked
//! for. When a context keeps coming back to the same VCI, it is cheaper to
//! move it to that VCI's stream for good than to offload it every time.

use crate::types::MutexId;

/// Number of remembered acquisitions.
pub const HISTORY_LEN: usize = 8;

/// Fixed ring of the most recent VCI acquisitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VciHistory {
    slots: [Option<MutexId>; HISTORY_LEN],
    head: usize,
}

impl VciHistory {
    /// Creates an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [None; HISTORY_LEN],
            head: 0,
        }
    }

    /// Records an acquisition, evicting the oldest entry.
    pub fn record(&mut self, id: MutexId) {
        self.slots[self.head] = Some(id);
        self.head = (self.head + 1) % HISTORY_LEN;
    }

    /// Number of slots equal to `id`.
    #[must_use]
    pub fn count(&self, id: MutexId) -> usize {
        self.slots.iter().filter(|slot| **slot == Some(id)).count()
    }

    /// True if at least `threshold` of the remembered acquisitions were `id`.
    #[must_use]
    pub fn should_migrate(&self, id: MutexId, threshold: u8) -> bool {
        self.count(id) >= usize::from(threshold)
    }

    /// Records `id`, then decides whether to migrate (the new entry counts).
    pub fn record_and_decide(&mut self, id: MutexId, threshold: u8) -> bool {
        self.record(id);
        self.should_migrate(id, threshold)
    }

    /// Iterates over the remembered ids, most recent first.
    pub fn recent(&self) -> impl Iterator<Item = MutexId> + '_ {
        (1..=HISTORY_LEN)
            .map(move |back| self.slots[(self.head + HISTORY_LEN - back) % HISTORY_LEN])
            .map_while(|slot| slot)
    }

    /// Forgets every entry.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

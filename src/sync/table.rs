//! Fixed table of named and per-VCI mutexes.

use crate::sync::VciMutex;
use crate::types::{MutexId, MAX_VCIS};

/// Well-known GLOBAL-class mutex ids.
pub mod ids {
    use crate::types::MutexId;

    /// Progress engine.
    pub const PROGRESS: MutexId = MutexId::new(-1000);
    /// Utility routines.
    pub const UTIL: MutexId = MutexId::new(-999);
    /// Device-level global state.
    pub const MPIDIG_GLOBAL: MutexId = MutexId::new(-998);
    /// Scheduler list.
    pub const SCHED_LIST: MutexId = MutexId::new(-997);
    /// Thread-safe progress queue.
    pub const TSP_QUEUE: MutexId = MutexId::new(-996);
    /// Hierarchical collectives.
    pub const HCOLL: MutexId = MutexId::new(-995);
    /// Dynamic process management.
    pub const DYNPROC: MutexId = MutexId::new(-994);
    /// Memory allocation.
    pub const ALLOC_MEM: MutexId = MutexId::new(-993);
    /// Debug output.
    pub const DBG: MutexId = MutexId::new(-2000);
    /// Handle allocation.
    pub const HANDLE: MutexId = MutexId::new(-4000);
    /// Context id allocation.
    pub const CTX: MutexId = MutexId::new(-3999);
    /// Process management interface.
    pub const PMI: MutexId = MutexId::new(-3998);
    /// Buffered sends.
    pub const BSEND: MutexId = MutexId::new(-3997);
}

const GLOBALS: [(MutexId, &str); 13] = [
    (ids::PROGRESS, "progress"),
    (ids::UTIL, "util"),
    (ids::MPIDIG_GLOBAL, "mpidig_global"),
    (ids::SCHED_LIST, "sched_list"),
    (ids::TSP_QUEUE, "tsp_queue"),
    (ids::HCOLL, "hcoll"),
    (ids::DYNPROC, "dynproc"),
    (ids::ALLOC_MEM, "alloc_mem"),
    (ids::DBG, "dbg"),
    (ids::HANDLE, "handle"),
    (ids::CTX, "ctx"),
    (ids::PMI, "pmi"),
    (ids::BSEND, "bsend"),
];

/// Names of the per-VCI mutexes, indexed by VCI minus one.
const VCI_NAMES: [&str; MAX_VCIS] = [
    "vci1", "vci2", "vci3", "vci4", "vci5", "vci6", "vci7", "vci8",
    "vci9", "vci10", "vci11", "vci12", "vci13", "vci14", "vci15", "vci16",
    "vci17", "vci18", "vci19", "vci20", "vci21", "vci22", "vci23", "vci24",
    "vci25", "vci26", "vci27", "vci28", "vci29", "vci30", "vci31", "vci32",
    "vci33", "vci34", "vci35", "vci36", "vci37", "vci38", "vci39", "vci40",
    "vci41", "vci42", "vci43", "vci44", "vci45", "vci46", "vci47", "vci48",
    "vci49", "vci50", "vci51", "vci52", "vci53", "vci54", "vci55", "vci56",
    "vci57", "vci58", "vci59", "vci60", "vci61", "vci62", "vci63", "vci64",
];

/// The runtime's mutexes: one per well-known GLOBAL id plus one per VCI.
#[derive(Debug)]
pub struct MutexTable {
    globals: Vec<(MutexId, VciMutex)>,
    vcis: Vec<VciMutex>,
}

impl MutexTable {
    /// Creates the table for VCIs `1..=num_vcis`.
    ///
    /// `num_vcis` is clamped to [`MAX_VCIS`].
    #[must_use]
    pub fn new(num_vcis: usize) -> Self {
        let globals = GLOBALS
            .iter()
            .map(|&(id, name)| (id, VciMutex::new(name)))
            .collect();
        let vcis = VCI_NAMES[..num_vcis.min(MAX_VCIS)]
            .iter()
            .map(|&name| VciMutex::new(name))
            .collect();
        Self { globals, vcis }
    }

    /// Looks up the mutex for `id`.
    #[must_use]
    pub fn get(&self, id: MutexId) -> Option<&VciMutex> {
        match id.vci_index() {
            Some(vci) => self.vci(vci),
            None => self
                .globals
                .iter()
                .find(|(gid, _)| *gid == id)
                .map(|(_, mutex)| mutex),
        }
    }

    /// Returns the mutex protecting VCI `vci` (1-based).
    #[must_use]
    pub fn vci(&self, vci: usize) -> Option<&VciMutex> {
        vci.checked_sub(1).and_then(|index| self.vcis.get(index))
    }

    /// Number of per-VCI mutexes.
    #[must_use]
    pub fn num_vcis(&self) -> usize {
        self.vcis.len()
    }

    /// Iterates over the GLOBAL-class mutexes.
    pub fn globals(&self) -> impl Iterator<Item = (MutexId, &VciMutex)> {
        self.globals.iter().map(|(id, mutex)| (*id, mutex))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_ids_resolve() {
        let table = MutexTable::new(4);
        assert_eq!(table.get(ids::PROGRESS).map(VciMutex::name), Some("progress"));
        assert_eq!(table.get(ids::HANDLE).map(VciMutex::name), Some("handle"));
        assert_eq!(table.get(ids::BSEND).map(VciMutex::name), Some("bsend"));
        assert!(table.get(MutexId::new(-1)).is_none());
        assert_eq!(table.globals().count(), 13);
        assert!(table.globals().all(|(id, _)| id.is_global()));
    }

    #[test]
    fn vci_mutexes_are_one_based() {
        let table = MutexTable::new(3);
        assert_eq!(table.num_vcis(), 3);
        assert!(table.vci(0).is_none());
        assert!(table.vci(1).is_some());
        assert!(table.vci(3).is_some());
        assert!(table.vci(4).is_none());
        assert!(std::ptr::eq(
            table.get(MutexId::vci(2)).expect("vci 2"),
            table.vci(2).expect("vci 2"),
        ));
    }

    #[test]
    fn vci_mutexes_have_distinct_names() {
        let table = MutexTable::new(MAX_VCIS);
        assert_eq!(table.vci(1).map(VciMutex::name), Some("vci1"));
        assert_eq!(table.vci(2).map(VciMutex::name), Some("vci2"));
        assert_eq!(table.vci(MAX_VCIS).map(VciMutex::name), Some("vci64"));
        let mut names: Vec<_> = (1..=MAX_VCIS)
            .filter_map(|vci| table.vci(vci).map(VciMutex::name))
            .collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), MAX_VCIS);
    }

    #[test]
    fn num_vcis_clamped() {
        assert_eq!(MutexTable::new(MAX_VCIS + 10).num_vcis(), MAX_VCIS);
    }
}

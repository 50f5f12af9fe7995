//! Identifier types shared by the critical-section protocol and the runtime.
//!
//! - [`MutexId`]: small signed integer naming a protected resource. Ids `<= 0`
//!   are GLOBAL-class, ids `> 0` are bound to one VCI.
//! - [`ContextId`]: stable identity of an execution context.
//! - [`StreamId`]: index of an execution stream.
//! - [`VciMask`]: set of VCIs a stream handles without locking.

use core::fmt;
use std::num::NonZeroU64;

/// Largest VCI id a [`VciMask`] can represent.
pub const MAX_VCIS: usize = 64;

/// Identifier of a protected resource.
///
/// The mapping from a positive id to its VCI is the identity: mutex id `3`
/// protects the private state of VCI `3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutexId(i32);

impl MutexId {
    /// Creates a mutex id from its raw value.
    #[must_use]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Creates the id of the mutex protecting VCI `vci`.
    ///
    /// # Panics
    ///
    /// Panics if `vci` is zero or larger than [`MAX_VCIS`].
    #[must_use]
    pub const fn vci(vci: usize) -> Self {
        assert!(vci >= 1 && vci <= MAX_VCIS, "vci id out of range");
        Self(vci as i32)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Returns true for process-global, always-locked resources.
    #[must_use]
    pub const fn is_global(self) -> bool {
        self.0 <= 0
    }

    /// Returns the VCI this id is bound to, or `None` for GLOBAL-class ids.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn vci_index(self) -> Option<usize> {
        if self.0 > 0 {
            Some(self.0 as usize)
        } else {
            None
        }
    }
}

impl fmt::Display for MutexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_global() {
            write!(f, "global({})", self.0)
        } else {
            write!(f, "vci({})", self.0)
        }
    }
}

/// Identity of an execution context.
///
/// Zero is reserved for "no owner", so identities are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(NonZeroU64);

impl ContextId {
    /// Creates an identity from a raw value; returns `None` for zero.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Option<Self> {
        match NonZeroU64::new(raw) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Returns the raw value (never zero).
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

/// Index of an execution stream within a runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(usize);

impl StreamId {
    /// Creates a stream id.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the stream index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "es{}", self.0)
    }
}

/// Bitmask of VCIs; bit `i - 1` stands for VCI `i`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VciMask(u64);

impl VciMask {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Creates a mask from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Creates a mask containing exactly the given VCI ids.
    ///
    /// # Panics
    ///
    /// Panics if an id is zero or larger than [`MAX_VCIS`].
    #[must_use]
    pub fn of(vcis: &[usize]) -> Self {
        vcis.iter().fold(Self::EMPTY, |mask, &vci| mask.with(vci))
    }

    /// Returns the mask with `vci` added.
    ///
    /// # Panics
    ///
    /// Panics if `vci` is zero or larger than [`MAX_VCIS`].
    #[must_use]
    pub const fn with(self, vci: usize) -> Self {
        assert!(vci >= 1 && vci <= MAX_VCIS, "vci id out of range");
        Self(self.0 | (1u64 << (vci - 1)))
    }

    /// Round-robin assignment: stream `rank` of `streams` owns VCIs
    /// `rank + 1`, `rank + 1 + streams`, ... up to [`MAX_VCIS`].
    #[must_use]
    pub fn round_robin(rank: usize, streams: usize) -> Self {
        let step = streams.max(1);
        (rank..MAX_VCIS)
            .step_by(step)
            .fold(Self::EMPTY, |mask, bit| Self(mask.0 | (1u64 << bit)))
    }

    /// Returns true if the mask contains the VCI bound to `id`.
    ///
    /// GLOBAL-class ids are never contained.
    #[must_use]
    pub const fn contains(self, id: MutexId) -> bool {
        match id.vci_index() {
            Some(vci) if vci <= MAX_VCIS => self.0 & (1u64 << (vci - 1)) != 0,
            _ => false,
        }
    }

    /// Returns true if the mask contains VCI `vci`.
    #[must_use]
    pub const fn contains_vci(self, vci: usize) -> bool {
        vci >= 1 && vci <= MAX_VCIS && self.0 & (1u64 << (vci - 1)) != 0
    }

    /// Returns true if no VCI is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates over the VCI ids in the mask, ascending.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        (1..=MAX_VCIS).filter(move |&vci| self.contains_vci(vci))
    }
}

impl fmt::Debug for VciMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

//! Error types and error handling strategy for vcilock.
//!
//! Two classes exist:
//!
//! - **Recoverable**: [`ConfigError`], returned while building a runtime from
//!   builder values, environment variables, or a config file.
//! - **Fatal**: [`Invariant`] violations. These are programming errors in a
//!   caller of the critical-section protocol (double release, illegal
//!   re-entry, destroying a held mutex). They are never returned; [`fatal`]
//!   logs them and panics.
//!
//! Protocol operations therefore have no `Result` in their signatures: every
//! Enter/Exit/Yield either completes or aborts.

use core::fmt;

use thiserror::Error;

use crate::tracing_compat::error;
use crate::types::{ContextId, MutexId, StreamId};

/// Errors raised while validating or loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A numeric or boolean value could not be parsed.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Setting name (env variable or builder field).
        field: String,
        /// What was wrong with it.
        reason: String,
    },
    /// A runtime needs at least one execution stream.
    #[error("at least one execution stream is required")]
    NoStreams,
    /// More VCIs requested than a mask can represent.
    #[error("{requested} VCIs requested, at most {max} are supported")]
    TooManyVcis {
        /// Requested VCI count.
        requested: usize,
        /// Supported maximum.
        max: usize,
    },
    /// Explicit masks were given for a different number of streams.
    #[error("{masks} stream masks given for {streams} streams")]
    MaskCountMismatch {
        /// Number of masks supplied.
        masks: usize,
        /// Number of configured streams.
        streams: usize,
    },
    /// No stream handles this VCI.
    #[error("vci {vci} is not owned by any execution stream")]
    UnownedVci {
        /// The orphaned VCI.
        vci: usize,
    },
    /// Two streams claim the same VCI.
    #[error("vci {vci} is claimed by both {first} and {second}")]
    SharedVci {
        /// The contested VCI.
        vci: usize,
        /// First claimant.
        first: StreamId,
        /// Second claimant.
        second: StreamId,
    },
    /// A config file could not be read or parsed.
    #[error("config file {path}: {reason}")]
    File {
        /// File path.
        path: String,
        /// Read or parse failure.
        reason: String,
    },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidValue`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Correctness invariants of the critical-section protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invariant {
    /// The owner re-entered without asking for recursion.
    RecursiveEntry {
        /// Offending mutex.
        mutex: &'static str,
        /// Re-entering context.
        context: ContextId,
    },
    /// Exit on a mutex whose reentrancy count is already zero.
    ReleaseUnheld {
        /// Offending mutex.
        mutex: &'static str,
        /// Mutex id used on the failing call.
        id: MutexId,
    },
    /// A mutex was destroyed while held.
    DestroyHeld {
        /// Offending mutex.
        mutex: &'static str,
        /// Reentrancy count at destruction.
        count: u32,
    },
    /// The underlying lock was released while not engaged.
    RawUnlockUnheld,
    /// The caller does not own a mutex it must own.
    NotOwner {
        /// Offending mutex.
        mutex: &'static str,
        /// Calling context.
        context: ContextId,
    },
    /// Yield on a recursively held lock-free section.
    RecursiveYield {
        /// Offending mutex.
        mutex: &'static str,
        /// Reentrancy count at the yield.
        count: u32,
    },
    /// The lock-free path was taken on a stream that does not own the VCI.
    UnauthorizedFastPath {
        /// Offending mutex.
        mutex: &'static str,
        /// VCI-bound id.
        id: MutexId,
        /// Stream the context was running on.
        stream: StreamId,
    },
    /// A mutex id maps to no execution stream.
    UnknownStream {
        /// Offending id.
        id: MutexId,
    },
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RecursiveEntry { mutex, context } => write!(
                f,
                "recursive entry without recursive flag: {context} already owns {mutex}"
            ),
            Self::ReleaseUnheld { mutex, id } => {
                write!(f, "release of unheld mutex {mutex} ({id})")
            }
            Self::DestroyHeld { mutex, count } => {
                write!(f, "destroy of held mutex {mutex} (count {count})")
            }
            Self::RawUnlockUnheld => write!(f, "unlock of a raw lock that is not locked"),
            Self::NotOwner { mutex, context } => {
                write!(f, "{context} is not the owner of {mutex}")
            }
            Self::RecursiveYield { mutex, count } => {
                write!(f, "yield of recursively held mutex {mutex} (count {count})")
            }
            Self::UnauthorizedFastPath { mutex, id, stream } => write!(
                f,
                "lock-free access to {mutex} ({id}) from {stream}, which does not own it"
            ),
            Self::UnknownStream { id } => write!(f, "no execution stream handles {id}"),
        }
    }
}

/// Reports a violated invariant and aborts the current context.
#[cold]
#[track_caller]
pub fn fatal(invariant: Invariant) -> ! {
    let location = core::panic::Location::caller();
    error!(
        file = location.file(),
        line = location.line(),
        "invariant violated: {invariant}"
    );
    panic!("invariant violated: {invariant}");
}

//! vcilock: VCI-aware critical sections for message-passing runtimes.
//!
//! # Overview
//!
//! Shared runtime state is split into per-channel partitions (VCIs), each
//! protected by its own recursive mutex. Instead of blocking when a mutex
//! belongs to another channel, an execution context is rescheduled onto the
//! execution stream that owns that channel and touches the state there
//! without locking. Contexts that keep coming back to the same channel are
//! migrated there for good.
//!
//! # Core Guarantees
//!
//! - **Mutual exclusion**: at most one logical owner per mutex at a time
//! - **Reentrancy**: recursive entries balance; an extra exit is fatal
//! - **Offload/return symmetry**: an offloaded context returns to its
//!   original stream when its last lock-free section exits
//! - **Hysteresis**: migration only after a channel dominates the last
//!   eight acquisitions
//! - **Zero-cost diagnostics when off**: the trace overlay folds away
//!
//! # Module Structure
//!
//! - [`types`]: Identifiers (mutex ids, contexts, streams, VCI masks)
//! - [`config`]: Discipline selection and runtime configuration
//! - [`error`]: Configuration errors and fatal invariants
//! - [`sync`]: Raw lock, recursive mutex, condition variable, mutex table
//! - [`runtime`]: Execution streams, contexts, channel map, builder
//! - [`cs`]: The enter / enter-or-skip / exit / yield protocol
//! - [`tracing_compat`]: Logging shim over `tracing`
//!
//! # Example
//!
//! ```ignore
//! use vcilock::{MutexId, RuntimeBuilder, StreamId, VciMask};
//!
//! let runtime = RuntimeBuilder::new()
//!     .streams(2)
//!     .vcis(3)
//!     .stream_masks(vec![VciMask::of(&[1, 2]), VciMask::of(&[3])])
//!     .build()?;
//! let mut ctx = runtime.attach(StreamId::new(0));
//! let mutex = runtime.mutexes().vci(3).unwrap();
//!
//! ctx.enter(mutex, MutexId::vci(3)); // runs on stream 1 now
//! ctx.exit(mutex, MutexId::vci(3)); // back on stream 0
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub mod config;
pub mod cs;
pub mod error;
pub mod runtime;
pub mod sync;
pub mod tracing_compat;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{CsConfig, Granularity, Verbosity};
pub use cs::{CriticalSection, CsEvent, Discipline, TraceRecord};
pub use error::{ConfigError, Invariant};
pub use runtime::{ExecContext, Runtime, RuntimeBuilder};
pub use sync::{ids, MutexTable, VciCondvar, VciMutex};
pub use types::{ContextId, MutexId, StreamId, VciMask};

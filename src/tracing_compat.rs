//! Logging shim over `tracing`.
//!
//! With the `tracing-integration` feature the macros below are the `tracing`
//! ones. Without it they expand to nothing, so the protocol hot path pays
//! nothing for events it does not emit.
//!
//! ```rust,ignore
//! use vcilock::tracing_compat::{debug, debug_span};
//!
//! let _span = debug_span!("context", stream = %stream).entered();
//! debug!(streams = 4, "runtime built");
//! ```

#[cfg(feature = "tracing-integration")]
pub use tracing::{debug, debug_span, error, trace};

#[cfg(not(feature = "tracing-integration"))]
mod noop {
    /// Discards a trace-level event.
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    /// Discards a debug-level event.
    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    /// Discards an error-level event.
    #[macro_export]
    macro_rules! error {
        ($($arg:tt)*) => {};
    }

    /// Yields a span that records nothing.
    #[macro_export]
    macro_rules! debug_span {
        ($($arg:tt)*) => {
            $crate::tracing_compat::NoopSpan
        };
    }

    pub use crate::{debug, debug_span, error, trace};
}

#[cfg(not(feature = "tracing-integration"))]
pub use noop::*;

/// Stand-in for `tracing::Span` when logging is compiled out.
#[cfg(not(feature = "tracing-integration"))]
#[derive(Debug, Clone, Copy)]
pub struct NoopSpan;

#[cfg(not(feature = "tracing-integration"))]
impl NoopSpan {
    /// Returns self.
    #[inline]
    #[must_use]
    pub const fn entered(self) -> Self {
        self
    }
}

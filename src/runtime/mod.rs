//! Execution streams, contexts, and the runtime that ties them together.
//!
//! # Execution model
//!
//! A [`Runtime`] owns a fixed set of [`ExecutionStream`]s. Each stream is a
//! cooperative worker that runs at most one [`ExecContext`] at a time;
//! other contexts associated with it wait in its FIFO pool. Each stream
//! handles a set of VCIs exclusively (its [`VciMask`](crate::types::VciMask)),
//! and the [`ChannelMap`] records which stream that is for every VCI.
//!
//! Contexts are created with [`Runtime::attach`] (binds the calling thread)
//! or [`Runtime::spawn`] (starts a named thread). A context suspends only at
//! the protocol's scheduling points: moving to another stream, yielding the
//! stream, or waiting on a blocking-path lock.

pub mod builder;
mod channel_map;
mod context;
pub mod env_config;
mod parker;
mod stream;

pub use builder::{Runtime, RuntimeBuilder};
pub use channel_map::ChannelMap;
pub use context::ExecContext;
pub use stream::ExecutionStream;

//! Runtime builder and handle.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::config::{CsConfig, Granularity};
use crate::cs::{Diagnostics, Discipline, TraceRecord};
use crate::error::ConfigError;
use crate::runtime::channel_map::ChannelMap;
use crate::runtime::context::ExecContext;
use crate::runtime::env_config;
use crate::runtime::stream::ExecutionStream;
use crate::sync::MutexTable;
use crate::tracing_compat::{debug, debug_span};
use crate::types::{ContextId, StreamId, VciMask};

/// Builder for constructing a runtime with custom configuration.
#[derive(Debug, Clone, Default)]
pub struct RuntimeBuilder {
    config: CsConfig,
}

impl RuntimeBuilder {
    /// Create a new builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: CsConfig::default(),
        }
    }

    /// Start from defaults overridden by `VCILOCK_*` environment variables.
    ///
    /// Builder methods called afterwards take precedence over the
    /// environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = CsConfig::default();
        env_config::apply_env_overrides(&mut config)?;
        Ok(Self { config })
    }

    /// Start from a TOML config file, then apply environment overrides.
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let toml = env_config::parse_toml_file(path.as_ref())?;
        let mut config = CsConfig::default();
        env_config::apply_toml_config(&mut config, &toml)?;
        env_config::apply_env_overrides(&mut config)?;
        Ok(Self { config })
    }

    /// Start from a TOML string, then apply environment overrides.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let toml = env_config::parse_toml_str(toml)?;
        let mut config = CsConfig::default();
        env_config::apply_toml_config(&mut config, &toml)?;
        env_config::apply_env_overrides(&mut config)?;
        Ok(Self { config })
    }

    /// Select the locking discipline.
    #[must_use]
    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.config.granularity = granularity;
        self
    }

    /// Set the number of execution streams.
    #[must_use]
    pub fn streams(mut self, n: usize) -> Self {
        self.config.num_streams = n;
        self
    }

    /// Set the number of VCIs.
    #[must_use]
    pub fn vcis(mut self, n: usize) -> Self {
        self.config.num_vcis = n;
        self
    }

    /// Assign VCIs to streams explicitly (one mask per stream).
    #[must_use]
    pub fn stream_masks(mut self, masks: Vec<VciMask>) -> Self {
        self.config.stream_masks = Some(masks);
        self
    }

    /// Allow or forbid the lock-free VCI path for new contexts.
    #[must_use]
    pub fn lock_free(mut self, enable: bool) -> Self {
        self.config.lock_free = enable;
        self
    }

    /// Enable the diagnostics overlay.
    #[must_use]
    pub fn debug(mut self, enable: bool) -> Self {
        self.config.debug_enabled = enable;
        self
    }

    /// Set the diagnostic print level.
    #[must_use]
    pub fn print_level(mut self, level: u8) -> Self {
        self.config.print_level = level;
        self
    }

    /// Keep emitted diagnostic events in memory.
    #[must_use]
    pub fn journal(mut self, enable: bool) -> Self {
        self.config.journal = enable;
        self
    }

    /// Set how many of the last eight acquisitions trigger migration.
    #[must_use]
    pub fn migration_threshold(mut self, threshold: u8) -> Self {
        self.config.migration_threshold = threshold;
        self
    }

    /// Sleep briefly on blocking-path yields.
    #[must_use]
    pub fn heavy_yield(mut self, enable: bool) -> Self {
        self.config.heavy_yield = enable;
        self
    }

    /// Set the context thread name prefix.
    #[must_use]
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    /// Build the runtime.
    pub fn build(self) -> Result<Runtime, ConfigError> {
        Runtime::with_config(self.config)
    }
}

/// Shared runtime state: streams, channel map, mutexes, diagnostics.
///
/// Cloning is cheap and yields a handle to the same runtime.
#[derive(Debug, Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

#[derive(Debug)]
struct RuntimeInner {
    config: CsConfig,
    discipline: Discipline,
    streams: Vec<ExecutionStream>,
    channel_map: ChannelMap,
    mutexes: MutexTable,
    diagnostics: Diagnostics,
    next_context: AtomicU64,
    spawned: AtomicUsize,
}

impl Runtime {
    /// Build a runtime from a configuration.
    pub fn with_config(mut config: CsConfig) -> Result<Self, ConfigError> {
        config.normalize();
        config.validate()?;

        let masks = config.masks();
        let channel_map = ChannelMap::from_masks(&masks, config.num_vcis)?;
        let streams = masks
            .iter()
            .enumerate()
            .map(|(index, mask)| ExecutionStream::new(StreamId::new(index), *mask))
            .collect();
        let diagnostics =
            Diagnostics::new(config.debug_enabled, config.print_level, config.journal);
        let discipline = Discipline::for_granularity(config.granularity);
        let mutexes = MutexTable::new(config.num_vcis);

        debug!(
            granularity = ?config.granularity,
            streams = config.num_streams,
            vcis = config.num_vcis,
            lock_free = config.lock_free,
            debug = diagnostics.enabled(),
            "runtime built"
        );

        Ok(Self {
            inner: Arc::new(RuntimeInner {
                config,
                discipline,
                streams,
                channel_map,
                mutexes,
                diagnostics,
                next_context: AtomicU64::new(1),
                spawned: AtomicUsize::new(0),
            }),
        })
    }

    /// The normalized configuration.
    #[must_use]
    pub fn config(&self) -> &CsConfig {
        &self.inner.config
    }

    /// The selected discipline.
    #[must_use]
    pub fn discipline(&self) -> Discipline {
        self.inner.discipline
    }

    /// The diagnostics overlay.
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.inner.diagnostics
    }

    /// VCI to stream map.
    #[must_use]
    pub fn channel_map(&self) -> &ChannelMap {
        &self.inner.channel_map
    }

    /// The runtime's mutex table.
    #[must_use]
    pub fn mutexes(&self) -> &MutexTable {
        &self.inner.mutexes
    }

    /// Number of execution streams.
    #[must_use]
    pub fn num_streams(&self) -> usize {
        self.inner.streams.len()
    }

    /// Looks up a stream.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a stream of this runtime.
    #[must_use]
    pub fn stream(&self, id: StreamId) -> &ExecutionStream {
        &self.inner.streams[id.index()]
    }

    /// Iterates over the streams.
    pub fn streams(&self) -> impl Iterator<Item = &ExecutionStream> {
        self.inner.streams.iter()
    }

    /// Creates a context for the calling thread on `stream`.
    ///
    /// Blocks until the stream's run slot is free.
    ///
    /// # Panics
    ///
    /// Panics if `stream` is not a stream of this runtime.
    #[must_use]
    pub fn attach(&self, stream: StreamId) -> ExecContext {
        let raw = self.inner.next_context.fetch_add(1, Ordering::Relaxed);
        let id = ContextId::from_raw(raw).unwrap_or_else(|| unreachable!("context ids start at 1"));
        ExecContext::start(self.clone(), id, stream)
    }

    /// Starts a thread running `f` in a fresh context on `stream`.
    pub fn spawn<F, R>(&self, stream: StreamId, f: F) -> std::io::Result<JoinHandle<R>>
    where
        F: FnOnce(&mut ExecContext) -> R + Send + 'static,
        R: Send + 'static,
    {
        let n = self.inner.spawned.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}-{}", self.inner.config.thread_name_prefix, n);
        let runtime = self.clone();
        std::thread::Builder::new().name(name).spawn(move || {
            let _span = debug_span!("context", stream = %stream).entered();
            let mut ctx = runtime.attach(stream);
            f(&mut ctx)
        })
    }

    /// Removes and returns the journaled diagnostic events, oldest first.
    #[must_use]
    pub fn drain_journal(&self) -> Vec<TraceRecord> {
        self.inner.diagnostics.drain()
    }
}

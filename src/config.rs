//! Critical-section configuration.
//!
//! In most cases you should use [`RuntimeBuilder`](crate::runtime::RuntimeBuilder)
//! rather than filling in a [`CsConfig`] directly.
//!
//! # Defaults
//!
//! | Field | Default |
//! |-------|---------|
//! | `granularity` | [`Granularity::Vci`] |
//! | `num_streams` | available CPU parallelism |
//! | `num_vcis` | 1 |
//! | `stream_masks` | `None` (round-robin) |
//! | `lock_free` | true |
//! | `debug_enabled` | false |
//! | `print_level` | 0 |
//! | `journal` | false |
//! | `migration_threshold` | 5 |
//! | `heavy_yield` | false |
//! | `thread_name_prefix` | `"vcilock-ctx"` |

use crate::cs::history::HISTORY_LEN;
use crate::error::ConfigError;
use crate::types::{VciMask, MAX_VCIS};

/// Default number of matching history slots that triggers migration.
pub const DEFAULT_MIGRATION_THRESHOLD: u8 = 5;

/// Which locking discipline protects critical sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    /// The runtime is not threaded; critical sections are no-ops.
    Serial,
    /// Every mutex uses the blocking recursive lock.
    Global,
    /// GLOBAL ids block; VCI ids use the scheduling bridge.
    #[default]
    Vci,
}

impl Granularity {
    /// Parses a granularity name (`serial`, `global`, `vci`).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "serial" | "single" | "none" => Some(Self::Serial),
            "global" => Some(Self::Global),
            "vci" => Some(Self::Vci),
            _ => None,
        }
    }
}

/// Diagnostic verbosity of a protocol call site.
///
/// Events from a call site are emitted when the configured print level is
/// at least the call site's verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Ordinary call sites (print level >= 1).
    Normal = 1,
    /// Hot call sites that only show up in verbose output (print level >= 2).
    Quiet = 2,
}

/// Critical-section and runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsConfig {
    /// Selected discipline.
    pub granularity: Granularity,
    /// Number of execution streams.
    pub num_streams: usize,
    /// Number of VCIs (ids `1..=num_vcis`).
    pub num_vcis: usize,
    /// Explicit per-stream VCI ownership; `None` assigns round-robin.
    pub stream_masks: Option<Vec<VciMask>>,
    /// Whether contexts may use the lock-free VCI path by default.
    pub lock_free: bool,
    /// Enables the diagnostics overlay.
    pub debug_enabled: bool,
    /// 0: silent, 1: light, 2: verbose, 3: very verbose.
    pub print_level: u8,
    /// Keeps emitted diagnostic events in an in-memory journal.
    pub journal: bool,
    /// Matching history slots (of 8) needed to migrate instead of offload.
    pub migration_threshold: u8,
    /// Blocking-path yields sleep off the stream instead of yielding.
    pub heavy_yield: bool,
    /// Name prefix for context threads started by the runtime.
    pub thread_name_prefix: String,
}

impl CsConfig {
    /// Normalize configuration values to safe defaults.
    pub fn normalize(&mut self) {
        if self.num_vcis == 0 {
            self.num_vcis = 1;
        }
        if self.migration_threshold == 0 {
            self.migration_threshold = 1;
        }
        if self.thread_name_prefix.is_empty() {
            self.thread_name_prefix = "vcilock-ctx".to_string();
        }
    }

    /// Validates cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_streams == 0 {
            return Err(ConfigError::NoStreams);
        }
        if self.num_vcis > MAX_VCIS {
            return Err(ConfigError::TooManyVcis {
                requested: self.num_vcis,
                max: MAX_VCIS,
            });
        }
        if usize::from(self.migration_threshold) > HISTORY_LEN {
            return Err(ConfigError::invalid(
                "migration_threshold",
                format!("must be in 1..={HISTORY_LEN}"),
            ));
        }
        if let Some(masks) = &self.stream_masks {
            if masks.len() != self.num_streams {
                return Err(ConfigError::MaskCountMismatch {
                    masks: masks.len(),
                    streams: self.num_streams,
                });
            }
        }
        Ok(())
    }

    /// Returns the VCI mask of each stream.
    #[must_use]
    pub fn masks(&self) -> Vec<VciMask> {
        self.stream_masks.clone().unwrap_or_else(|| {
            (0..self.num_streams)
                .map(|rank| VciMask::round_robin(rank, self.num_streams))
                .collect()
        })
    }

    pub(crate) fn default_streams() -> usize {
        std::thread::available_parallelism()
            .map_or(1, std::num::NonZeroUsize::get)
            .max(1)
    }
}

impl Default for CsConfig {
    fn default() -> Self {
        Self {
            granularity: Granularity::default(),
            num_streams: Self::default_streams(),
            num_vcis: 1,
            stream_masks: None,
            lock_free: true,
            debug_enabled: false,
            print_level: 0,
            journal: false,
            migration_threshold: DEFAULT_MIGRATION_THRESHOLD,
            heavy_yield: false,
            thread_name_prefix: "vcilock-ctx".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_sane() {
        crate::test_utils::init_test_logging();
        crate::test_phase!("default_config_sane");
        let config = CsConfig::default();
        crate::assert_with_log!(
            config.num_streams >= 1,
            "num_streams",
            ">= 1",
            config.num_streams
        );
        assert_eq!(config.granularity, Granularity::Vci);
        assert_eq!(config.migration_threshold, 5);
        assert!(config.lock_free);
        assert!(!config.debug_enabled);
        assert!(config.validate().is_ok());
        crate::test_complete!("default_config_sane");
    }

    #[test]
    fn normalize_fixes_zeroes() {
        let mut config = CsConfig {
            num_vcis: 0,
            migration_threshold: 0,
            thread_name_prefix: String::new(),
            ..CsConfig::default()
        };
        config.normalize();
        assert_eq!(config.num_vcis, 1);
        assert_eq!(config.migration_threshold, 1);
        assert_eq!(config.thread_name_prefix, "vcilock-ctx");
    }

    #[test]
    fn validate_rejects_bad_layouts() {
        let zero = CsConfig {
            num_streams: 0,
            ..CsConfig::default()
        };
        assert_eq!(zero.validate(), Err(ConfigError::NoStreams));

        let too_many = CsConfig {
            num_vcis: 65,
            ..CsConfig::default()
        };
        assert!(matches!(
            too_many.validate(),
            Err(ConfigError::TooManyVcis { requested: 65, .. })
        ));

        let threshold = CsConfig {
            migration_threshold: 9,
            ..CsConfig::default()
        };
        assert!(matches!(
            threshold.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let masks = CsConfig {
            num_streams: 2,
            stream_masks: Some(vec![VciMask::of(&[1])]),
            ..CsConfig::default()
        };
        assert_eq!(
            masks.validate(),
            Err(ConfigError::MaskCountMismatch {
                masks: 1,
                streams: 2
            })
        );
    }

    #[test]
    fn round_robin_masks_by_default() {
        let config = CsConfig {
            num_streams: 2,
            ..CsConfig::default()
        };
        let masks = config.masks();
        assert_eq!(masks.len(), 2);
        assert!(masks[0].contains_vci(1));
        assert!(masks[1].contains_vci(2));
    }

    #[test]
    fn granularity_parse() {
        assert_eq!(Granularity::parse("VCI"), Some(Granularity::Vci));
        assert_eq!(Granularity::parse(" global "), Some(Granularity::Global));
        assert_eq!(Granularity::parse("serial"), Some(Granularity::Serial));
        assert_eq!(Granularity::parse("pobj"), None);
    }
}

//! Environment variable and config file support for [`RuntimeBuilder`](super::RuntimeBuilder).
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic**: values set via builder methods (`streams(4)`)
//! 2. **Environment variables**: values from `VCILOCK_*` env vars
//! 3. **Config file**: values loaded from a TOML file (requires `config-file` feature)
//! 4. **Defaults**: built-in defaults from [`CsConfig::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `VCILOCK_GRANULARITY` | `serial`/`global`/`vci` | `granularity` |
//! | `VCILOCK_NUM_STREAMS` | `usize` | `num_streams` |
//! | `VCILOCK_NUM_VCIS` | `usize` | `num_vcis` |
//! | `VCILOCK_LOCK_FREE` | `bool` | `lock_free` |
//! | `VCILOCK_DEBUG` | `bool` | `debug_enabled` |
//! | `VCILOCK_PRINT_LEVEL` | `u8` | `print_level` |
//! | `VCILOCK_JOURNAL` | `bool` | `journal` |
//! | `VCILOCK_MIGRATION_THRESHOLD` | `u8` | `migration_threshold` |
//! | `VCILOCK_HEAVY_YIELD` | `bool` | `heavy_yield` |
//! | `VCILOCK_THREAD_NAME_PREFIX` | `String` | `thread_name_prefix` |

use crate::config::{CsConfig, Granularity};
use crate::error::ConfigError;

/// Environment variable name for the locking discipline.
pub const ENV_GRANULARITY: &str = "VCILOCK_GRANULARITY";
/// Environment variable name for the execution stream count.
pub const ENV_NUM_STREAMS: &str = "VCILOCK_NUM_STREAMS";
/// Environment variable name for the VCI count.
pub const ENV_NUM_VCIS: &str = "VCILOCK_NUM_VCIS";
/// Environment variable name for the lock-free VCI path toggle.
pub const ENV_LOCK_FREE: &str = "VCILOCK_LOCK_FREE";
/// Environment variable name for the diagnostics overlay toggle.
pub const ENV_DEBUG: &str = "VCILOCK_DEBUG";
/// Environment variable name for the diagnostic print level.
pub const ENV_PRINT_LEVEL: &str = "VCILOCK_PRINT_LEVEL";
/// Environment variable name for the diagnostics journal toggle.
pub const ENV_JOURNAL: &str = "VCILOCK_JOURNAL";
/// Environment variable name for the migration threshold.
pub const ENV_MIGRATION_THRESHOLD: &str = "VCILOCK_MIGRATION_THRESHOLD";
/// Environment variable name for heavy yields on the blocking path.
pub const ENV_HEAVY_YIELD: &str = "VCILOCK_HEAVY_YIELD";
/// Environment variable name for the context thread name prefix.
pub const ENV_THREAD_NAME_PREFIX: &str = "VCILOCK_THREAD_NAME_PREFIX";

/// Apply environment variable overrides to a [`CsConfig`].
///
/// Only variables that are set in the environment are applied.
/// Returns an error if a variable is set but contains an unparseable value.
pub fn apply_env_overrides(config: &mut CsConfig) -> Result<(), ConfigError> {
    if let Some(val) = read_env(ENV_GRANULARITY) {
        config.granularity = Granularity::parse(&val).ok_or_else(|| {
            ConfigError::invalid(
                ENV_GRANULARITY,
                format!("expected serial/global/vci, got {val:?}"),
            )
        })?;
    }
    if let Some(val) = read_env(ENV_NUM_STREAMS) {
        config.num_streams = parse_usize(ENV_NUM_STREAMS, &val)?;
    }
    if let Some(val) = read_env(ENV_NUM_VCIS) {
        config.num_vcis = parse_usize(ENV_NUM_VCIS, &val)?;
    }
    if let Some(val) = read_env(ENV_LOCK_FREE) {
        config.lock_free = parse_bool(ENV_LOCK_FREE, &val)?;
    }
    if let Some(val) = read_env(ENV_DEBUG) {
        config.debug_enabled = parse_bool(ENV_DEBUG, &val)?;
    }
    if let Some(val) = read_env(ENV_PRINT_LEVEL) {
        config.print_level = parse_u8(ENV_PRINT_LEVEL, &val)?;
    }
    if let Some(val) = read_env(ENV_JOURNAL) {
        config.journal = parse_bool(ENV_JOURNAL, &val)?;
    }
    if let Some(val) = read_env(ENV_MIGRATION_THRESHOLD) {
        config.migration_threshold = parse_u8(ENV_MIGRATION_THRESHOLD, &val)?;
    }
    if let Some(val) = read_env(ENV_HEAVY_YIELD) {
        config.heavy_yield = parse_bool(ENV_HEAVY_YIELD, &val)?;
    }
    if let Some(val) = read_env(ENV_THREAD_NAME_PREFIX) {
        config.thread_name_prefix = val;
    }
    Ok(())
}

/// Read an environment variable, returning `None` if unset.
fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_usize(var_name: &str, val: &str) -> Result<usize, ConfigError> {
    val.trim().parse::<usize>().map_err(|e| {
        ConfigError::invalid(
            var_name,
            format!("expected unsigned integer, got {val:?} ({e})"),
        )
    })
}

fn parse_u8(var_name: &str, val: &str) -> Result<u8, ConfigError> {
    val.trim()
        .parse::<u8>()
        .map_err(|e| ConfigError::invalid(var_name, format!("expected u8, got {val:?} ({e})")))
}

fn parse_bool(var_name: &str, val: &str) -> Result<bool, ConfigError> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(
            var_name,
            format!("expected bool (true/false/1/0/yes/no), got {val:?}"),
        )),
    }
}

// =========================================================================
// TOML config file support (feature-gated)
// =========================================================================

/// TOML-deserializable configuration.
///
/// ```toml
/// [runtime]
/// granularity = "vci"
/// num_streams = 4
/// num_vcis = 8
/// lock_free = true
/// heavy_yield = false
/// thread_name_prefix = "myapp-ctx"
///
/// [diagnostics]
/// debug = true
/// print_level = 1
/// journal = false
///
/// [migration]
/// threshold = 5
/// ```
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct CsTomlConfig {
    /// Runtime layout settings.
    #[serde(default)]
    pub runtime: RuntimeToml,
    /// Diagnostics overlay settings.
    #[serde(default)]
    pub diagnostics: DiagnosticsToml,
    /// Migration policy settings.
    #[serde(default)]
    pub migration: MigrationToml,
}

/// Runtime section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct RuntimeToml {
    /// Discipline name.
    pub granularity: Option<String>,
    /// Number of execution streams.
    pub num_streams: Option<usize>,
    /// Number of VCIs.
    pub num_vcis: Option<usize>,
    /// Lock-free VCI path toggle.
    pub lock_free: Option<bool>,
    /// Heavy yields on the blocking path.
    pub heavy_yield: Option<bool>,
    /// Context thread name prefix.
    pub thread_name_prefix: Option<String>,
}

/// Diagnostics section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct DiagnosticsToml {
    /// Overlay toggle.
    pub debug: Option<bool>,
    /// Print level.
    pub print_level: Option<u8>,
    /// Journal toggle.
    pub journal: Option<bool>,
}

/// Migration section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct MigrationToml {
    /// Matching history slots needed to migrate.
    pub threshold: Option<u8>,
}

/// Apply a parsed TOML config to a [`CsConfig`].
///
/// Only fields that are `Some` in the TOML struct override the config.
#[cfg(feature = "config-file")]
pub fn apply_toml_config(config: &mut CsConfig, toml: &CsTomlConfig) -> Result<(), ConfigError> {
    if let Some(ref v) = toml.runtime.granularity {
        config.granularity = Granularity::parse(v).ok_or_else(|| {
            ConfigError::invalid("runtime.granularity", format!("unknown discipline {v:?}"))
        })?;
    }
    if let Some(v) = toml.runtime.num_streams {
        config.num_streams = v;
    }
    if let Some(v) = toml.runtime.num_vcis {
        config.num_vcis = v;
    }
    if let Some(v) = toml.runtime.lock_free {
        config.lock_free = v;
    }
    if let Some(v) = toml.runtime.heavy_yield {
        config.heavy_yield = v;
    }
    if let Some(ref v) = toml.runtime.thread_name_prefix {
        config.thread_name_prefix.clone_from(v);
    }
    if let Some(v) = toml.diagnostics.debug {
        config.debug_enabled = v;
    }
    if let Some(v) = toml.diagnostics.print_level {
        config.print_level = v;
    }
    if let Some(v) = toml.diagnostics.journal {
        config.journal = v;
    }
    if let Some(v) = toml.migration.threshold {
        config.migration_threshold = v;
    }
    Ok(())
}

/// Parse a TOML string into a [`CsTomlConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_str(toml_str: &str) -> Result<CsTomlConfig, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::File {
        path: "<string>".to_string(),
        reason: e.to_string(),
    })
}

/// Read and parse a TOML file into a [`CsTomlConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_file(path: &std::path::Path) -> Result<CsTomlConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::File {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_VARS: &[&str] = &[
        ENV_GRANULARITY,
        ENV_NUM_STREAMS,
        ENV_NUM_VCIS,
        ENV_LOCK_FREE,
        ENV_DEBUG,
        ENV_PRINT_LEVEL,
        ENV_JOURNAL,
        ENV_MIGRATION_THRESHOLD,
        ENV_HEAVY_YIELD,
        ENV_THREAD_NAME_PREFIX,
    ];

    fn with_envs<F, R>(vars: &[(&str, &str)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = crate::test_utils::env_lock();
        for var in ALL_VARS {
            std::env::remove_var(var);
        }
        for (k, v) in vars {
            std::env::set_var(k, v);
        }
        let result = f();
        for (k, _) in vars {
            std::env::remove_var(k);
        }
        result
    }

    #[test]
    fn parse_usize_valid() {
        assert_eq!(super::parse_usize("TEST", "42").unwrap(), 42);
        assert_eq!(super::parse_usize("TEST", " 100 ").unwrap(), 100);
    }

    #[test]
    fn parse_usize_invalid() {
        assert!(super::parse_usize("TEST", "abc").is_err());
        assert!(super::parse_usize("TEST", "-1").is_err());
        assert!(super::parse_usize("TEST", "").is_err());
    }

    #[test]
    fn parse_u8_rejects_overflow() {
        assert_eq!(super::parse_u8("TEST", "3").unwrap(), 3);
        assert!(super::parse_u8("TEST", "256").is_err());
    }

    #[test]
    fn parse_bool_variants() {
        for val in &["true", "1", "yes", "on", "TRUE", "On"] {
            assert!(super::parse_bool("TEST", val).unwrap(), "expected true for {val}");
        }
        for val in &["false", "0", "no", "off", "OFF"] {
            assert!(!super::parse_bool("TEST", val).unwrap(), "expected false for {val}");
        }
        assert!(super::parse_bool("TEST", "maybe").is_err());
    }

    #[test]
    fn no_env_leaves_defaults() {
        with_envs(&[], || {
            let mut config = CsConfig::default();
            let before = config.clone();
            apply_env_overrides(&mut config).unwrap();
            assert_eq!(config, before);
        });
    }

    #[test]
    fn env_overrides_layout_and_diagnostics() {
        with_envs(
            &[
                (ENV_GRANULARITY, "global"),
                (ENV_NUM_STREAMS, "3"),
                (ENV_NUM_VCIS, "6"),
                (ENV_LOCK_FREE, "off"),
                (ENV_DEBUG, "1"),
                (ENV_PRINT_LEVEL, "2"),
                (ENV_JOURNAL, "yes"),
                (ENV_MIGRATION_THRESHOLD, "7"),
                (ENV_HEAVY_YIELD, "true"),
                (ENV_THREAD_NAME_PREFIX, "bench-ctx"),
            ],
            || {
                let mut config = CsConfig::default();
                apply_env_overrides(&mut config).unwrap();
                assert_eq!(config.granularity, Granularity::Global);
                assert_eq!(config.num_streams, 3);
                assert_eq!(config.num_vcis, 6);
                assert!(!config.lock_free);
                assert!(config.debug_enabled);
                assert_eq!(config.print_level, 2);
                assert!(config.journal);
                assert_eq!(config.migration_threshold, 7);
                assert!(config.heavy_yield);
                assert_eq!(config.thread_name_prefix, "bench-ctx");
            },
        );
    }

    #[test]
    fn env_invalid_value_is_reported() {
        with_envs(&[(ENV_NUM_VCIS, "lots")], || {
            let mut config = CsConfig::default();
            let err = apply_env_overrides(&mut config).unwrap_err();
            assert!(err.to_string().contains(ENV_NUM_VCIS), "{err}");
        });
        with_envs(&[(ENV_GRANULARITY, "pobj")], || {
            let mut config = CsConfig::default();
            assert!(apply_env_overrides(&mut config).is_err());
        });
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn toml_sections_apply() {
        let parsed = parse_toml_str(
            r#"
            [runtime]
            granularity = "vci"
            num_streams = 2
            num_vcis = 4

            [diagnostics]
            debug = true
            print_level = 3

            [migration]
            threshold = 6
            "#,
        )
        .unwrap();
        let mut config = CsConfig::default();
        apply_toml_config(&mut config, &parsed).unwrap();
        assert_eq!(config.num_streams, 2);
        assert_eq!(config.num_vcis, 4);
        assert!(config.debug_enabled);
        assert_eq!(config.print_level, 3);
        assert_eq!(config.migration_threshold, 6);
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn toml_parse_error_is_reported() {
        assert!(matches!(
            parse_toml_str("[runtime\nnum_streams = 2"),
            Err(ConfigError::File { .. })
        ));
    }
}

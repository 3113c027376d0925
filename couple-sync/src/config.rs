//! Sync configuration.

use std::str::FromStr;
use std::time::Duration;

use couple_core::prompts::DEFAULT_SEPARATOR;

/// Default debounce for automatic syncs (milliseconds).
const DEFAULT_SYNC_DEBOUNCE_MS: u64 = 100;
/// Default lifetime of a cached mode lookup (milliseconds).
const DEFAULT_MODE_CACHE_MS: u64 = 100;
/// Default quiet period before prompt text is reconciled (milliseconds).
const DEFAULT_PROMPT_DEBOUNCE_MS: u64 = 1000;
/// Default resolution poll interval (milliseconds).
const DEFAULT_RESOLUTION_POLL_MS: u64 = 2000;
/// Default request bus timeout (milliseconds).
const DEFAULT_BUS_TIMEOUT_MS: u64 = 5000;
/// Default position of the mapping in outgoing request parameters.
const DEFAULT_MAPPING_PARAM_INDEX: usize = 0;

/// Timing and wiring for the sync layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Quiet period after the last change before an automatic sync.
    pub sync_debounce: Duration,
    /// How long a mode lookup is trusted.
    pub mode_cache_ttl: Duration,
    /// Quiet period after the last prompt edit before reconciling.
    pub prompt_debounce: Duration,
    /// Interval for polled resolution sources.
    pub resolution_poll: Duration,
    /// Request bus timeout.
    pub bus_timeout: Duration,
    /// Separator between per-region prompts.
    pub prompt_separator: String,
    /// Index of the mapping in outgoing request parameters.
    pub mapping_param_index: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_debounce: Duration::from_millis(DEFAULT_SYNC_DEBOUNCE_MS),
            mode_cache_ttl: Duration::from_millis(DEFAULT_MODE_CACHE_MS),
            prompt_debounce: Duration::from_millis(DEFAULT_PROMPT_DEBOUNCE_MS),
            resolution_poll: Duration::from_millis(DEFAULT_RESOLUTION_POLL_MS),
            bus_timeout: Duration::from_millis(DEFAULT_BUS_TIMEOUT_MS),
            prompt_separator: DEFAULT_SEPARATOR.to_string(),
            mapping_param_index: DEFAULT_MAPPING_PARAM_INDEX,
        }
    }
}

impl SyncConfig {
    /// Create a config from environment variables or defaults.
    ///
    /// Environment variables:
    /// - `COUPLE_SYNC_DEBOUNCE_MS` (default: 100)
    /// - `COUPLE_MODE_CACHE_MS` (default: 100)
    /// - `COUPLE_PROMPT_DEBOUNCE_MS` (default: 1000)
    /// - `COUPLE_RESOLUTION_POLL_MS` (default: 2000)
    /// - `COUPLE_BUS_TIMEOUT_MS` (default: 5000)
    /// - `COUPLE_PROMPT_SEPARATOR` (default: newline; `\n` escapes accepted)
    /// - `COUPLE_MAPPING_PARAM_INDEX` (default: 0)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create a config from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let millis = |key: &str, default: u64| {
            Duration::from_millis(parse_or(lookup(key), default))
        };
        let separator = lookup("COUPLE_PROMPT_SEPARATOR")
            .map(|s| unescape(&s))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SEPARATOR.to_string());

        Self {
            sync_debounce: millis("COUPLE_SYNC_DEBOUNCE_MS", DEFAULT_SYNC_DEBOUNCE_MS),
            mode_cache_ttl: millis("COUPLE_MODE_CACHE_MS", DEFAULT_MODE_CACHE_MS),
            prompt_debounce: millis("COUPLE_PROMPT_DEBOUNCE_MS", DEFAULT_PROMPT_DEBOUNCE_MS),
            resolution_poll: millis("COUPLE_RESOLUTION_POLL_MS", DEFAULT_RESOLUTION_POLL_MS),
            bus_timeout: millis("COUPLE_BUS_TIMEOUT_MS", DEFAULT_BUS_TIMEOUT_MS),
            prompt_separator: separator,
            mapping_param_index: parse_or(
                lookup("COUPLE_MAPPING_PARAM_INDEX"),
                DEFAULT_MAPPING_PARAM_INDEX,
            ),
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn unescape(raw: &str) -> String {
    raw.replace("\\n", "\n").replace("\\t", "\t")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.sync_debounce, Duration::from_millis(100));
        assert_eq!(config.mode_cache_ttl, Duration::from_millis(100));
        assert_eq!(config.prompt_debounce, Duration::from_secs(1));
        assert_eq!(config.resolution_poll, Duration::from_secs(2));
        assert_eq!(config.prompt_separator, "\n");
        assert_eq!(config.mapping_param_index, 0);
    }

    #[test]
    fn test_lookup_overrides() {
        let vars: HashMap<&str, &str> = [
            ("COUPLE_SYNC_DEBOUNCE_MS", "250"),
            ("COUPLE_PROMPT_SEPARATOR", "\\n\\n"),
            ("COUPLE_MAPPING_PARAM_INDEX", "3"),
            ("COUPLE_RESOLUTION_POLL_MS", "soon"),
        ]
        .into_iter()
        .collect();
        let config = SyncConfig::from_lookup(|k| vars.get(k).map(ToString::to_string));
        assert_eq!(config.sync_debounce, Duration::from_millis(250));
        assert_eq!(config.prompt_separator, "\n\n");
        assert_eq!(config.mapping_param_index, 3);
        // Unparsable values fall back to defaults
        assert_eq!(config.resolution_poll, Duration::from_secs(2));
    }

    #[test]
    fn test_from_env_defaults() {
        // Only checks that reading the environment never panics
        let config = SyncConfig::from_env();
        assert!(!config.prompt_separator.is_empty());
    }
}

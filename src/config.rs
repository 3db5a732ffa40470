//! Configuration types for the routing engine.

use std::path::PathBuf;
use std::time::Duration;

use crate::flags::OutputFlag;

/// File name of the audio policy configuration.
pub const DEFAULT_CONFIGURATION_FILE: &str = "audio_policy_configuration.xml";

/// Directories searched for the configuration file, in priority order.
pub const DEFAULT_SEARCH_DIRS: [&str; 4] = [
    "/odm/etc",
    "/vendor/etc/audio",
    "/vendor/etc",
    "/system/etc",
];

/// Where to look for the policy configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorConfig {
    /// File name to look for in each directory.
    ///
    /// Default: `audio_policy_configuration.xml`
    pub file_name: String,

    /// Directories to search, first match wins.
    ///
    /// Default: [`DEFAULT_SEARCH_DIRS`]
    pub search_dirs: Vec<PathBuf>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_CONFIGURATION_FILE.to_string(),
            search_dirs: DEFAULT_SEARCH_DIRS.iter().map(PathBuf::from).collect(),
        }
    }
}

/// Configuration for engine behavior.
///
/// Use [`EngineConfig::default()`] for sensible defaults, or customize as needed.
///
/// # Example
///
/// ```
/// use audio_policy_routing::EngineConfig;
/// use std::time::Duration;
///
/// let config = EngineConfig {
///     device_wait_timeout: Duration::from_secs(2),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How to find the policy file when no explicit source is given.
    pub locator: LocatorConfig,

    /// How long a route check waits for the device-changed notification
    /// after starting a stream.
    ///
    /// Default: 10 seconds
    pub device_wait_timeout: Duration,

    /// Output flags checked by
    /// [`check_performance_modes`](crate::check_performance_modes), in order.
    ///
    /// Default: FAST, DEEP_BUFFER
    pub performance_flags: Vec<OutputFlag>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            locator: LocatorConfig::default(),
            device_wait_timeout: Duration::from_secs(10),
            performance_flags: OutputFlag::PERFORMANCE_MODES.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.device_wait_timeout, Duration::from_secs(10));
        assert_eq!(
            config.performance_flags,
            vec![OutputFlag::Fast, OutputFlag::DeepBuffer]
        );
    }

    #[test]
    fn test_locator_default_search_order() {
        let locator = LocatorConfig::default();
        assert_eq!(locator.file_name, "audio_policy_configuration.xml");
        assert_eq!(locator.search_dirs.first(), Some(&PathBuf::from("/odm/etc")));
        assert_eq!(locator.search_dirs.len(), 4);
    }

    #[test]
    fn test_engine_config_override() {
        let config = EngineConfig {
            performance_flags: vec![OutputFlag::Fast],
            ..Default::default()
        };
        assert_eq!(config.performance_flags.len(), 1);
        assert_eq!(config.locator, LocatorConfig::default());
    }
}

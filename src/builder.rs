//! Builder pattern for `RoutingEngine`.

use std::path::PathBuf;

use crate::engine::{ConfigSource, RoutingEngine};
use crate::{event_callback, ConfigError, Configuration, EngineConfig, EventCallback, RoutingEvent};

/// Builder for configuring and creating a [`RoutingEngine`].
///
/// Use [`RoutingEngine::builder()`] to create a new builder. Without an
/// explicit source the policy file is located with
/// [`EngineConfig::locator`].
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use audio_policy_routing::{EngineConfig, RoutingEngine};
///
/// let engine = RoutingEngine::builder()
///     .from_path("/vendor/etc/audio_policy_configuration.xml")
///     .with_config(EngineConfig {
///         device_wait_timeout: Duration::from_secs(2),
///         ..Default::default()
///     })
///     .on_event(|e| tracing::info!(?e, "routing event"))
///     .build()?;
/// # Ok::<(), audio_policy_routing::ConfigError>(())
/// ```
#[must_use]
pub struct RoutingEngineBuilder {
    /// Where the configuration comes from.
    source: ConfigSource,
    /// Event callback.
    event_callback: Option<EventCallback>,
    /// Engine configuration.
    config: EngineConfig,
}

impl Default for RoutingEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutingEngineBuilder {
    /// Creates a new builder that locates the policy file.
    pub fn new() -> Self {
        Self {
            source: ConfigSource::Locate,
            event_callback: None,
            config: EngineConfig::default(),
        }
    }

    /// Reads the configuration from `path`.
    ///
    /// [`RoutingEngine::reload`] reads the file again.
    pub fn from_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = ConfigSource::Path(path.into());
        self
    }

    /// Parses the configuration from XML text.
    pub fn from_xml(mut self, xml: impl Into<String>) -> Self {
        self.source = ConfigSource::Xml(xml.into());
        self
    }

    /// Uses an already built configuration.
    pub fn with_configuration(mut self, configuration: Configuration) -> Self {
        self.source = ConfigSource::Fixed(configuration);
        self
    }

    /// Locates the policy file in
    /// [`LocatorConfig::search_dirs`](crate::LocatorConfig::search_dirs).
    ///
    /// This is the default.
    pub fn locate(mut self) -> Self {
        self.source = ConfigSource::Locate;
        self
    }

    /// Set a callback to receive routing events.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(RoutingEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(event_callback(callback));
        self
    }

    /// Set custom engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Loads the configuration and creates the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No policy file is found or readable
    /// - The document is malformed or has the wrong root
    /// - An `xi:include` cannot be resolved
    pub fn build(self) -> Result<RoutingEngine, ConfigError> {
        RoutingEngine::new(self.source, self.config, self.event_callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const XML: &str = r#"<audioPolicyConfiguration version="7.0">
      <modules><module name="primary">
        <attachedDevices><item>Speaker</item></attachedDevices>
        <mixPorts><mixPort name="fast" role="source" flags="AUDIO_OUTPUT_FLAG_FAST"/></mixPorts>
        <routes><route type="mix" sink="Speaker" sources="fast"/></routes>
      </module></modules>
    </audioPolicyConfiguration>"#;

    #[test]
    fn test_builder_from_xml() {
        let engine = RoutingEngine::builder().from_xml(XML).build().unwrap();
        assert_eq!(engine.snapshot().version(), "7.0");
    }

    #[test]
    fn test_builder_with_config() {
        let engine = RoutingEngine::builder()
            .from_xml(XML)
            .with_config(EngineConfig {
                device_wait_timeout: Duration::from_millis(250),
                ..Default::default()
            })
            .build()
            .unwrap();
        assert_eq!(engine.config().device_wait_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_builder_emits_loaded_event() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let _engine = RoutingEngine::builder()
            .from_xml(XML)
            .on_event(move |event| {
                if matches!(event, RoutingEvent::ConfigurationLoaded { .. }) {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build()
            .unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_builder_locate_missing_fails() {
        let mut config = EngineConfig::default();
        config.locator.search_dirs = vec![PathBuf::from("/nonexistent/audio-policy-routing")];
        let result = RoutingEngine::builder().locate().with_config(config).build();
        assert!(matches!(result, Err(ConfigError::Unreadable { path: None, .. })));
    }

    #[test]
    fn test_builder_malformed_xml_fails() {
        let result = RoutingEngine::builder().from_xml("<audioPolicyConfiguration>").build();
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}

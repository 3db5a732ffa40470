//! The routing engine: current configuration plus resolution.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::flags::{InputSource, OutputFlag};
use crate::model::{locate_configuration_file, Configuration, Device};
use crate::resolver::{self, RoutingDecision};
use crate::{
    ConfigError, EngineConfig, EventCallback, ResolveError, RoutingEngineBuilder, RoutingEvent,
};

/// Where an engine's configuration comes from.
#[derive(Debug, Clone)]
pub(crate) enum ConfigSource {
    /// Search [`LocatorConfig::search_dirs`](crate::LocatorConfig::search_dirs).
    Locate,
    /// A specific file.
    Path(PathBuf),
    /// In-memory XML text.
    Xml(String),
    /// A configuration built by the caller.
    Fixed(Configuration),
}

impl ConfigSource {
    /// Builds a fresh configuration, returning the file it came from, if any.
    fn load(&self, config: &EngineConfig) -> Result<(Configuration, Option<PathBuf>), ConfigError> {
        match self {
            Self::Locate => {
                let path = locate_configuration_file(&config.locator)?;
                Ok((Configuration::load(&path)?, Some(path)))
            }
            Self::Path(path) => Ok((Configuration::load(path)?, Some(path.clone()))),
            Self::Xml(xml) => Ok((Configuration::from_xml_str(xml)?, None)),
            Self::Fixed(configuration) => Ok((configuration.clone(), None)),
        }
    }
}

/// Resolves stream requests against the current audio policy configuration.
///
/// The configuration is held as an immutable snapshot. [`reload`](Self::reload)
/// and [`replace`](Self::replace) swap in a new one atomically; callers that
/// took a [`snapshot`](Self::snapshot) keep theirs until they drop it.
///
/// The engine is `Send + Sync` and is normally shared behind an `Arc`.
///
/// # Example
///
/// ```
/// use audio_policy_routing::{OutputFlag, RoutingEngine};
///
/// let engine = RoutingEngine::builder()
///     .from_xml(r#"<audioPolicyConfiguration>
///       <modules><module name="primary">
///         <attachedDevices><item>Speaker</item></attachedDevices>
///         <mixPorts><mixPort name="fast" role="source" flags="AUDIO_OUTPUT_FLAG_FAST"/></mixPorts>
///         <routes><route type="mix" sink="Speaker" sources="fast"/></routes>
///       </module></modules>
///     </audioPolicyConfiguration>"#)
///     .build()?;
///
/// let decision = engine.resolve_output_route(OutputFlag::Fast).unwrap();
/// assert_eq!(decision.device.name, "Speaker");
/// assert!(engine.resolve_output_route(OutputFlag::DeepBuffer).is_err());
/// # Ok::<(), audio_policy_routing::ConfigError>(())
/// ```
pub struct RoutingEngine {
    config: EngineConfig,
    source: ConfigSource,
    current: ArcSwap<Configuration>,
    generation: AtomicU64,
    event_callback: Option<EventCallback>,
}

impl std::fmt::Debug for RoutingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingEngine")
            .field("config", &self.config)
            .field("source", &self.source)
            .field("generation", &self.generation())
            .field("has_event_callback", &self.event_callback.is_some())
            .finish_non_exhaustive()
    }
}

impl RoutingEngine {
    /// Creates a new builder.
    pub fn builder() -> RoutingEngineBuilder {
        RoutingEngineBuilder::new()
    }

    pub(crate) fn new(
        source: ConfigSource,
        config: EngineConfig,
        event_callback: Option<EventCallback>,
    ) -> Result<Self, ConfigError> {
        let (configuration, path) = source.load(&config)?;
        let engine = Self {
            config,
            source,
            current: ArcSwap::from_pointee(configuration),
            generation: AtomicU64::new(0),
            event_callback,
        };
        engine.emit_loaded(&engine.snapshot(), path);
        Ok(engine)
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the current configuration snapshot.
    pub fn snapshot(&self) -> Arc<Configuration> {
        self.current.load_full()
    }

    /// Returns how many times the configuration has been swapped.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Rebuilds the configuration from the engine's source and swaps it in.
    ///
    /// On error the current snapshot stays in place.
    ///
    /// # Errors
    ///
    /// Returns any [`ConfigError`] from locating, reading or building the
    /// configuration.
    pub fn reload(&self) -> Result<Arc<Configuration>, ConfigError> {
        let (configuration, path) = self.source.load(&self.config).inspect_err(|e| {
            tracing::warn!(error = %e, "configuration reload failed, keeping current snapshot");
        })?;
        let next = Arc::new(configuration);
        self.swap(Arc::clone(&next));
        tracing::info!(generation = self.generation(), "configuration reloaded");
        self.emit_loaded(&next, path);
        Ok(next)
    }

    /// Swaps in `configuration` and returns the previous snapshot.
    pub fn replace(&self, configuration: Configuration) -> Arc<Configuration> {
        let next = Arc::new(configuration);
        let previous = self.swap(Arc::clone(&next));
        tracing::info!(generation = self.generation(), "configuration replaced");
        self.emit_loaded(&next, None);
        previous
    }

    fn swap(&self, next: Arc<Configuration>) -> Arc<Configuration> {
        let previous = self.current.swap(next);
        self.generation.fetch_add(1, Ordering::AcqRel);
        previous
    }

    /// Resolves the route a playback stream requesting `flag` must take.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotFound`] if the current configuration has no
    /// usable route for `flag`.
    pub fn resolve_output_route(&self, flag: OutputFlag) -> Result<RoutingDecision, ResolveError> {
        let outcome = resolver::resolve_output_route(&self.current.load(), flag);
        self.emit_resolution(&outcome);
        outcome
    }

    /// Resolves each flag in order against one snapshot.
    pub fn resolve_output_routes(
        &self,
        flags: &[OutputFlag],
    ) -> Vec<(OutputFlag, Result<RoutingDecision, ResolveError>)> {
        let outcomes = resolver::resolve_output_routes(&self.current.load(), flags);
        for (_, outcome) in &outcomes {
            self.emit_resolution(outcome);
        }
        outcomes
    }

    /// Resolves [`EngineConfig::performance_flags`].
    pub fn performance_plan(&self) -> Vec<(OutputFlag, Result<RoutingDecision, ResolveError>)> {
        self.resolve_output_routes(&self.config.performance_flags)
    }

    /// Resolves the attached device a capture from `source` must use.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotFound`] if no attached device carries the
    /// source's device tag.
    pub fn resolve_input_route(&self, source: InputSource) -> Result<Device, ResolveError> {
        let outcome = resolver::resolve_input_route(&self.current.load(), source);
        if let Err(e) = &outcome {
            self.emit_event(RoutingEvent::RouteNotFound {
                capability: e.capability(),
            });
        }
        outcome
    }

    /// Delivers an event to the registered callback, if any.
    pub(crate) fn emit_event(&self, event: RoutingEvent) {
        if let Some(callback) = &self.event_callback {
            callback(event);
        }
    }

    fn emit_resolution(&self, outcome: &Result<RoutingDecision, ResolveError>) {
        let event = match outcome {
            Ok(decision) => RoutingEvent::RouteResolved {
                flag: decision.flag,
                mix_port: decision.mix_port.name.clone(),
                device: decision.device.name.clone(),
            },
            Err(e) => RoutingEvent::RouteNotFound {
                capability: e.capability(),
            },
        };
        self.emit_event(event);
    }

    fn emit_loaded(&self, configuration: &Configuration, path: Option<PathBuf>) {
        self.emit_event(RoutingEvent::ConfigurationLoaded {
            path,
            mix_ports: configuration.mix_ports().len(),
            routes: configuration.routes().len(),
            attached_devices: configuration.attached_devices().len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Capability;
    use crate::model::{FlagSet, MixPort, Name, Route};
    use crate::patch::PortRole;
    use parking_lot::Mutex;

    fn configuration(flags: &str) -> Configuration {
        Configuration::from_parts(
            "7.0",
            vec![Device::named("deviceX")],
            vec![MixPort {
                name: Name::from("mixA"),
                module: Name::from("primary"),
                role: PortRole::Source,
                flags: FlagSet::parse(flags),
            }],
            vec![Route {
                name: Name::from("r1"),
                sources: Route::parse_sources("mixA"),
                sink: Name::from("deviceX"),
            }],
        )
    }

    fn engine(flags: &str) -> RoutingEngine {
        RoutingEngine::builder()
            .with_configuration(configuration(flags))
            .build()
            .unwrap()
    }

    #[test]
    fn test_engine_resolves_against_snapshot() {
        let engine = engine("AUDIO_OUTPUT_FLAG_FAST");
        let decision = engine.resolve_output_route(OutputFlag::Fast).unwrap();
        assert_eq!(decision.mix_port.name, "mixA");
        assert!(engine.resolve_output_route(OutputFlag::DeepBuffer).is_err());
    }

    #[test]
    fn test_replace_keeps_held_snapshot() {
        let engine = engine("AUDIO_OUTPUT_FLAG_FAST");
        let held = engine.snapshot();
        assert_eq!(engine.generation(), 0);

        let previous = engine.replace(configuration("AUDIO_OUTPUT_FLAG_DEEP_BUFFER"));
        assert!(Arc::ptr_eq(&previous, &held));
        assert_eq!(engine.generation(), 1);

        assert!(resolver::resolve_output_route(&held, OutputFlag::Fast).is_ok());
        assert!(engine.resolve_output_route(OutputFlag::Fast).is_err());
        assert!(engine.resolve_output_route(OutputFlag::DeepBuffer).is_ok());
    }

    #[test]
    fn test_reload_fixed_source_bumps_generation() {
        let engine = engine("AUDIO_OUTPUT_FLAG_FAST");
        let before = engine.snapshot();
        let after = engine.reload().unwrap();
        assert_eq!(*before, *after);
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(engine.generation(), 1);
    }

    #[test]
    fn test_failed_reload_keeps_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio_policy_configuration.xml");
        std::fs::write(
            &path,
            r#"<audioPolicyConfiguration version="1.0"><modules/></audioPolicyConfiguration>"#,
        )
        .unwrap();

        let engine = RoutingEngine::builder().from_path(&path).build().unwrap();
        std::fs::write(&path, "<broken").unwrap();
        assert!(engine.reload().is_err());
        assert_eq!(engine.snapshot().version(), "1.0");
        assert_eq!(engine.generation(), 0);
    }

    #[test]
    fn test_performance_plan_follows_config_order() {
        let engine = engine("AUDIO_OUTPUT_FLAG_DEEP_BUFFER");
        let plan = engine.performance_plan();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].0, OutputFlag::Fast);
        assert!(plan[0].1.is_err());
        assert_eq!(plan[1].0, OutputFlag::DeepBuffer);
        assert!(plan[1].1.is_ok());
    }

    #[test]
    fn test_resolution_events() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let engine = RoutingEngine::builder()
            .with_configuration(configuration("AUDIO_OUTPUT_FLAG_FAST"))
            .on_event(move |event| sink.lock().push(event))
            .build()
            .unwrap();

        engine.resolve_output_route(OutputFlag::Fast).unwrap();
        engine.resolve_input_route(InputSource::RemoteSubmix).unwrap_err();

        let events = events.lock();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], RoutingEvent::ConfigurationLoaded { mix_ports: 1, .. }));
        assert!(matches!(events[1], RoutingEvent::RouteResolved { flag: OutputFlag::Fast, .. }));
        assert_eq!(
            events[2],
            RoutingEvent::RouteNotFound {
                capability: Capability::Input(InputSource::RemoteSubmix)
            }
        );
    }
}

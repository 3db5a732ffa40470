//! Route resolution over a [`Configuration`].
//!
//! Both directions are pure lookups. Output resolution walks
//! mix port → route → attached device and takes the first fit in document
//! order; input resolution looks the source's device tag up among attached
//! devices.

use crate::error::{Capability, ResolveError};
use crate::flags::{InputSource, OutputFlag};
use crate::model::{Configuration, Device, MixPort, Route};
use crate::patch::PortRole;

/// The route a playback stream requesting a flag must take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    /// The flag that was requested.
    pub flag: OutputFlag,
    /// First source mix port declaring the flag with a usable route.
    pub mix_port: MixPort,
    /// First route from that mix port to an attached device.
    pub route: Route,
    /// The attached device the route sinks into.
    pub device: Device,
}

impl std::fmt::Display for RoutingDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} via mix port '{}' [{}] route '{}' -> '{}'",
            self.flag, self.mix_port.name, self.mix_port.flags, self.route.name, self.device.name
        )
    }
}

/// Resolves the device a playback stream requesting `flag` must reach.
///
/// For each source mix port declaring `flag`, in order, and each route listing
/// that port as a source, in order, the first route whose sink is attached
/// wins.
///
/// # Errors
///
/// Returns [`ResolveError::NotFound`] if no mix port, route and attached
/// device line up. This is expected on hardware without that output path.
pub fn resolve_output_route(
    config: &Configuration,
    flag: OutputFlag,
) -> Result<RoutingDecision, ResolveError> {
    let found = config
        .mix_ports()
        .iter()
        .filter(|port| port.role == PortRole::Source && port.flags.contains(flag))
        .find_map(|port| {
            config
                .routes()
                .iter()
                .filter(|route| route.has_source(port.name.as_str()))
                .find_map(|route| {
                    config
                        .device(route.sink.as_str())
                        .map(|device| (port, route, device))
                })
        });

    match found {
        Some((port, route, device)) => {
            tracing::debug!(
                %flag,
                mix_port = %port.name,
                flags = %port.flags,
                route = %route.name,
                sink = %route.sink,
                "resolved output route"
            );
            Ok(RoutingDecision {
                flag,
                mix_port: port.clone(),
                route: route.clone(),
                device: device.clone(),
            })
        }
        None => {
            tracing::debug!(%flag, "no output route");
            Err(ResolveError::NotFound {
                capability: Capability::Output(flag),
            })
        }
    }
}

/// Resolves each flag in order, keeping every outcome.
pub fn resolve_output_routes(
    config: &Configuration,
    flags: &[OutputFlag],
) -> Vec<(OutputFlag, Result<RoutingDecision, ResolveError>)> {
    flags
        .iter()
        .map(|&flag| (flag, resolve_output_route(config, flag)))
        .collect()
}

/// Resolves the attached device a capture from `source` must use.
///
/// Attached devices are searched in order for a name containing the source's
/// device tag, so "Remote Submix In" matches remote submix. Devices whose
/// port declares them as sinks are skipped.
///
/// # Errors
///
/// Returns [`ResolveError::NotFound`] if no attached device carries the tag.
pub fn resolve_input_route(
    config: &Configuration,
    source: InputSource,
) -> Result<Device, ResolveError> {
    let tag = source.device_tag();
    let found = config
        .attached_devices()
        .iter()
        .filter(|device| device.role != Some(PortRole::Sink))
        .find(|device| device.name.as_str().contains(tag));

    match found {
        Some(device) => {
            tracing::debug!(%source, device = %device.name, "resolved input device");
            Ok(device.clone())
        }
        None => {
            tracing::debug!(%source, tag, "no input device");
            Err(ResolveError::NotFound {
                capability: Capability::Input(source),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FlagSet, Name};

    fn port(name: &str, flags: &str) -> MixPort {
        MixPort {
            name: Name::from(name),
            module: Name::from("primary"),
            role: PortRole::Source,
            flags: FlagSet::parse(flags),
        }
    }

    fn route(name: &str, sources: &str, sink: &str) -> Route {
        Route {
            name: Name::from(name),
            sources: Route::parse_sources(sources),
            sink: Name::from(sink),
        }
    }

    fn scenario_config() -> Configuration {
        Configuration::from_parts(
            "",
            vec![Device::named("deviceX")],
            vec![port("mixA", "AUDIO_OUTPUT_FLAG_FAST")],
            vec![route("r1", "mixA", "deviceX")],
        )
    }

    #[test]
    fn test_resolve_fast_first_fit() {
        let decision = resolve_output_route(&scenario_config(), OutputFlag::Fast).unwrap();
        assert_eq!(decision.mix_port.name, "mixA");
        assert_eq!(decision.route.name, "r1");
        assert_eq!(decision.device.name, "deviceX");
    }

    #[test]
    fn test_resolve_missing_flag_not_found() {
        let result = resolve_output_route(&scenario_config(), OutputFlag::DeepBuffer);
        assert_eq!(
            result,
            Err(ResolveError::NotFound {
                capability: Capability::Output(OutputFlag::DeepBuffer)
            })
        );
    }

    #[test]
    fn test_resolve_skips_unattached_sink() {
        let config = Configuration::from_parts(
            "",
            vec![Device::named("Speaker")],
            vec![
                port("hdmi", "AUDIO_OUTPUT_FLAG_FAST"),
                port("fast", "AUDIO_OUTPUT_FLAG_FAST|AUDIO_OUTPUT_FLAG_PRIMARY"),
            ],
            vec![
                route("to-hdmi", "hdmi", "HDMI"),
                route("to-speaker", "primary,fast", "Speaker"),
            ],
        );

        let decision = resolve_output_route(&config, OutputFlag::Fast).unwrap();
        assert_eq!(decision.mix_port.name, "fast");
        assert_eq!(decision.route.name, "to-speaker");
        assert!(config.is_attached(decision.device.name.as_str()));
    }

    #[test]
    fn test_resolve_prefers_insertion_order() {
        let config = Configuration::from_parts(
            "",
            vec![Device::named("Speaker"), Device::named("Earpiece")],
            vec![
                port("first", "AUDIO_OUTPUT_FLAG_FAST"),
                port("second", "AUDIO_OUTPUT_FLAG_FAST"),
            ],
            vec![
                route("b", "second", "Earpiece"),
                route("a1", "first", "Earpiece"),
                route("a2", "first", "Speaker"),
            ],
        );

        let decision = resolve_output_route(&config, OutputFlag::Fast).unwrap();
        assert_eq!(decision.mix_port.name, "first");
        assert_eq!(decision.route.name, "a1");

        for _ in 0..3 {
            assert_eq!(resolve_output_route(&config, OutputFlag::Fast).unwrap(), decision);
        }
    }

    #[test]
    fn test_resolve_no_prefix_collision() {
        let config = Configuration::from_parts(
            "",
            vec![Device::named("Speaker")],
            vec![port("direct pcm", "AUDIO_OUTPUT_FLAG_DIRECT_PCM")],
            vec![route("r", "direct pcm", "Speaker")],
        );
        assert!(resolve_output_route(&config, OutputFlag::Direct).is_err());
        assert!(resolve_output_route(&config, OutputFlag::DirectPcm).is_ok());
    }

    #[test]
    fn test_resolve_source_name_must_match_exactly() {
        let config = Configuration::from_parts(
            "",
            vec![Device::named("Speaker")],
            vec![port("fast", "AUDIO_OUTPUT_FLAG_FAST")],
            vec![route("r", "fast mixer", "Speaker")],
        );
        assert!(resolve_output_route(&config, OutputFlag::Fast).is_err());
    }

    #[test]
    fn test_resolve_route_without_sink_not_found() {
        let config = Configuration::from_xml_str(
            r#"<audioPolicyConfiguration>
              <modules><module name="primary">
                <attachedDevices><item/></attachedDevices>
                <mixPorts>
                  <mixPort name="fast" role="source" flags="AUDIO_OUTPUT_FLAG_FAST"/>
                </mixPorts>
                <routes><route type="mix" sources="fast"/></routes>
              </module></modules>
            </audioPolicyConfiguration>"#,
        )
        .unwrap();

        assert!(!config.is_attached(""));
        assert!(!config.is_usable(&config.routes()[0]));
        assert_eq!(
            resolve_output_route(&config, OutputFlag::Fast),
            Err(ResolveError::NotFound {
                capability: Capability::Output(OutputFlag::Fast)
            })
        );
    }

    #[test]
    fn test_resolve_output_routes_keeps_order() {
        let outcomes = resolve_output_routes(
            &scenario_config(),
            &[OutputFlag::DeepBuffer, OutputFlag::Fast],
        );
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].0, OutputFlag::DeepBuffer);
        assert!(outcomes[0].1.is_err());
        assert!(outcomes[1].1.is_ok());
    }

    #[test]
    fn test_resolve_input_by_tag() {
        let mut out = Device::named("Remote Submix Out");
        out.role = Some(PortRole::Sink);
        let config = Configuration::from_parts(
            "",
            vec![Device::named("Speaker"), out, Device::named("Remote Submix In")],
            Vec::new(),
            Vec::new(),
        );

        let device = resolve_input_route(&config, InputSource::RemoteSubmix).unwrap();
        assert_eq!(device.name, "Remote Submix In");
    }

    #[test]
    fn test_resolve_input_unknown_role_matches() {
        let config = Configuration::from_parts(
            "",
            vec![Device::named("Remote Submix Out")],
            Vec::new(),
            Vec::new(),
        );
        assert!(resolve_input_route(&config, InputSource::RemoteSubmix).is_ok());
    }

    #[test]
    fn test_resolve_input_not_found() {
        let result = resolve_input_route(&scenario_config(), InputSource::RemoteSubmix);
        assert!(matches!(
            result,
            Err(ResolveError::NotFound {
                capability: Capability::Input(InputSource::RemoteSubmix)
            })
        ));
    }
}

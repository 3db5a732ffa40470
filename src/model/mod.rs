//! In-memory audio policy configuration.
//!
//! A [`Configuration`] is built once from a parsed policy document and is
//! read-only afterwards. Reloading means building a new one; see
//! [`RoutingEngine::reload`](crate::RoutingEngine::reload).
//!
//! Entities keep the order in which they appear in the document. Route
//! resolution is first-fit over that order, so it is observable.

mod locate;
mod name;
mod walk;

pub use locate::locate_configuration_file;
pub use name::Name;

use std::path::Path;

use crate::error::ConfigError;
use crate::flags::{OutputFlag, OutputFlags};
use crate::patch::{DeviceType, PortRole};

/// Root element tag of a policy document.
pub(crate) const ROOT_TAG: &str = "audioPolicyConfiguration";

/// Separator between flag tokens in a `flags` attribute.
const FLAG_SEPARATOR: char = '|';

/// Separator between names in a route's `sources` attribute.
const SOURCE_SEPARATOR: char = ',';

/// The capability flags declared on a mix port.
///
/// Stored as exact tokens, so `AUDIO_OUTPUT_FLAG_DIRECT` never matches a port
/// declaring only `AUDIO_OUTPUT_FLAG_DIRECT_PCM`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    tokens: Vec<String>,
}

impl FlagSet {
    /// Splits a `flags` attribute into tokens. Empty tokens are dropped and
    /// duplicates are kept once, in first-seen order.
    pub fn parse(raw: &str) -> Self {
        let mut tokens: Vec<String> = Vec::new();
        for token in raw.split(FLAG_SEPARATOR).map(str::trim) {
            if !token.is_empty() && !tokens.iter().any(|t| t == token) {
                tokens.push(token.to_string());
            }
        }
        Self { tokens }
    }

    /// Returns true if the exact token is declared.
    pub fn contains_token(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Returns true if `flag`'s canonical token is declared.
    pub fn contains(&self, flag: OutputFlag) -> bool {
        self.contains_token(flag.canonical_name())
    }

    /// Returns the declared tokens.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Returns true if no flag is declared.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Returns the mask of recognised output flags; unknown tokens are ignored.
    pub fn output_flags(&self) -> OutputFlags {
        self.tokens
            .iter()
            .filter_map(|t| OutputFlag::from_token(t))
            .collect()
    }
}

impl std::fmt::Display for FlagSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.tokens.join("|"))
    }
}

/// A mix port retained from the configuration. Always a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixPort {
    /// Port name, unique within its module.
    pub name: Name,
    /// Name of the module declaring the port.
    pub module: Name,
    /// Declared role; always [`PortRole::Source`] for retained ports.
    pub role: PortRole,
    /// Declared capability flags.
    pub flags: FlagSet,
}

/// A named connection from candidate sources to one sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Route name; usually empty in real configurations.
    pub name: Name,
    /// Candidate source names, in declared order.
    pub sources: Vec<Name>,
    /// Sink device name.
    pub sink: Name,
}

impl Route {
    /// Splits a `sources` attribute into names.
    pub fn parse_sources(raw: &str) -> Vec<Name> {
        raw.split(SOURCE_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Name::from)
            .collect()
    }

    /// Returns true if `name` is one of the route's candidate sources.
    pub fn has_source(&self, name: &str) -> bool {
        self.sources.iter().any(|source| source == name)
    }
}

/// An attached device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Device name as listed under `attachedDevices`.
    pub name: Name,
    /// Role from the matching `devicePort`, if one is declared.
    pub role: Option<PortRole>,
    /// Type from the matching `devicePort`, if declared and recognised.
    pub device_type: Option<DeviceType>,
}

impl Device {
    /// Creates a device with no port information.
    pub fn named(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            role: None,
            device_type: None,
        }
    }
}

/// Immutable audio policy configuration.
///
/// # Example
///
/// ```
/// use audio_policy_routing::Configuration;
///
/// let config = Configuration::from_xml_str(r#"
///     <audioPolicyConfiguration version="7.0">
///       <modules>
///         <module name="primary">
///           <attachedDevices><item>Speaker</item></attachedDevices>
///           <mixPorts>
///             <mixPort name="fast" role="source" flags="AUDIO_OUTPUT_FLAG_FAST"/>
///           </mixPorts>
///           <routes><route type="mix" sink="Speaker" sources="fast"/></routes>
///         </module>
///       </modules>
///     </audioPolicyConfiguration>"#)?;
///
/// assert_eq!(config.mix_ports().len(), 1);
/// assert!(config.is_attached("Speaker"));
/// # Ok::<(), audio_policy_routing::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    version: String,
    devices: Vec<Device>,
    mix_ports: Vec<MixPort>,
    routes: Vec<Route>,
}

impl Configuration {
    /// Builds a configuration from an already parsed document.
    ///
    /// `xi:include` elements are skipped because there is no directory to
    /// resolve them against; use [`Configuration::load`] for files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedRoot`] if the root is not
    /// `audioPolicyConfiguration`.
    pub fn from_document(document: &roxmltree::Document<'_>) -> Result<Self, ConfigError> {
        walk::build(document, None)
    }

    /// Parses and builds a configuration from XML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed XML, or any error from
    /// [`Configuration::from_document`].
    pub fn from_xml_str(xml: &str) -> Result<Self, ConfigError> {
        let document = roxmltree::Document::parse(xml).map_err(|source| ConfigError::Parse {
            origin: "<memory>".to_string(),
            source,
        })?;
        Self::from_document(&document)
    }

    /// Reads, parses and builds a configuration file, resolving `xi:include`
    /// elements relative to the file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Unreadable`] if the file cannot be read, and
    /// any parse, root or include error otherwise.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::unreadable(path, &e))?;
        let document = roxmltree::Document::parse(&text).map_err(|source| ConfigError::Parse {
            origin: path.display().to_string(),
            source,
        })?;
        let config = walk::build(&document, path.parent())?;
        tracing::info!(
            path = %path.display(),
            version = %config.version,
            mix_ports = config.mix_ports.len(),
            routes = config.routes.len(),
            devices = config.devices.len(),
            "loaded audio policy configuration"
        );
        Ok(config)
    }

    /// Assembles a configuration from parts, keeping only source mix ports.
    pub fn from_parts(
        version: impl Into<String>,
        devices: Vec<Device>,
        mix_ports: Vec<MixPort>,
        routes: Vec<Route>,
    ) -> Self {
        Self {
            version: version.into(),
            devices,
            mix_ports: mix_ports
                .into_iter()
                .filter(|port| port.role == PortRole::Source)
                .collect(),
            routes,
        }
    }

    /// Returns the document's `version` attribute, empty if absent.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns attached devices in document order.
    pub fn attached_devices(&self) -> &[Device] {
        &self.devices
    }

    /// Returns retained (source) mix ports in document order.
    pub fn mix_ports(&self) -> &[MixPort] {
        &self.mix_ports
    }

    /// Returns routes in document order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Returns the first attached device called `name`.
    ///
    /// The empty (unset) name never matches, so routes without a sink and
    /// empty `item` entries stay inert.
    pub fn device(&self, name: &str) -> Option<&Device> {
        if name.is_empty() {
            return None;
        }
        self.devices.iter().find(|device| device.name == name)
    }

    /// Returns true if a device called `name` is attached.
    pub fn is_attached(&self, name: &str) -> bool {
        self.device(name).is_some()
    }

    /// Returns true if the route's sink is an attached device.
    pub fn is_usable(&self, route: &Route) -> bool {
        self.is_attached(route.sink.as_str())
    }
}

//! Recursive-descent walk over a parsed policy document.
//!
//! Each element is classified once into an [`Element`] and dispatched on
//! `(Scope, Element)`. An element that is unknown, or known but out of place,
//! is skipped together with its subtree.

use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use super::{Configuration, Device, FlagSet, MixPort, Name, Route, ROOT_TAG};
use crate::error::ConfigError;
use crate::patch::{DeviceType, PortRole};

const XINCLUDE_NS: &str = "http://www.w3.org/2001/XInclude";

/// Nested `xi:include` depth before the walk gives up.
const MAX_INCLUDE_DEPTH: usize = 8;

/// Element kinds the walk understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    Modules,
    Module,
    MixPorts,
    MixPort,
    DevicePorts,
    DevicePort,
    AttachedDevices,
    Item,
    Routes,
    Route,
    Include,
    Unknown,
}

impl Element {
    fn classify(node: Node<'_, '_>) -> Self {
        let tag = node.tag_name();
        if tag.namespace() == Some(XINCLUDE_NS) {
            return if tag.name() == "include" {
                Self::Include
            } else {
                Self::Unknown
            };
        }
        match tag.name() {
            "modules" => Self::Modules,
            "module" => Self::Module,
            "mixPorts" => Self::MixPorts,
            "mixPort" => Self::MixPort,
            "devicePorts" => Self::DevicePorts,
            "devicePort" => Self::DevicePort,
            "attachedDevices" => Self::AttachedDevices,
            "item" => Self::Item,
            "routes" => Self::Routes,
            "route" => Self::Route,
            _ => Self::Unknown,
        }
    }
}

/// Where in the document the walk currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Root,
    Modules,
    Module,
    MixPorts,
    DevicePorts,
    AttachedDevices,
    Routes,
}

/// A `devicePort` declaration, joined with attached devices after the walk.
#[derive(Debug)]
struct DevicePortDecl {
    tag_name: String,
    role: Option<PortRole>,
    device_type: Option<DeviceType>,
}

struct Collector {
    base_dir: Option<PathBuf>,
    include_depth: usize,
    module: Name,
    mix_ports: Vec<MixPort>,
    device_ports: Vec<DevicePortDecl>,
    attached: Vec<Name>,
    routes: Vec<Route>,
}

/// Walks `document` and assembles a configuration.
pub(super) fn build(
    document: &Document<'_>,
    base_dir: Option<&Path>,
) -> Result<Configuration, ConfigError> {
    let root = document.root_element();
    if root.tag_name().name() != ROOT_TAG {
        return Err(ConfigError::MalformedRoot {
            found: root.tag_name().name().to_string(),
        });
    }

    let mut collector = Collector {
        base_dir: base_dir.map(Path::to_path_buf),
        include_depth: 0,
        module: Name::from(""),
        mix_ports: Vec::new(),
        device_ports: Vec::new(),
        attached: Vec::new(),
        routes: Vec::new(),
    };
    collector.descend(Scope::Root, root)?;

    Ok(collector.finish(attribute(root, "version")))
}

/// Returns an attribute's value, or the empty string when absent.
fn attribute(node: Node<'_, '_>, name: &str) -> String {
    node.attribute(name).unwrap_or_default().to_string()
}

/// Concatenated text content of an element, trimmed.
fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect::<String>()
        .trim()
        .to_string()
}

impl Collector {
    fn descend(&mut self, scope: Scope, node: Node<'_, '_>) -> Result<(), ConfigError> {
        for child in node.children().filter(Node::is_element) {
            self.visit(scope, child)?;
        }
        Ok(())
    }

    fn visit(&mut self, scope: Scope, node: Node<'_, '_>) -> Result<(), ConfigError> {
        match (scope, Element::classify(node)) {
            (Scope::Root, Element::Modules) => self.descend(Scope::Modules, node),
            (Scope::Modules, Element::Module) => {
                self.module = Name::from(attribute(node, "name"));
                self.descend(Scope::Module, node)
            }
            (Scope::Modules, Element::Include) => self.include(node),
            (Scope::Module, Element::MixPorts) => self.descend(Scope::MixPorts, node),
            (Scope::Module, Element::DevicePorts) => self.descend(Scope::DevicePorts, node),
            (Scope::Module, Element::AttachedDevices) => {
                self.descend(Scope::AttachedDevices, node)
            }
            (Scope::Module, Element::Routes) => self.descend(Scope::Routes, node),
            (Scope::MixPorts, Element::MixPort) => {
                self.collect_mix_port(node);
                Ok(())
            }
            (Scope::DevicePorts, Element::DevicePort) => {
                self.collect_device_port(node);
                Ok(())
            }
            (Scope::AttachedDevices, Element::Item) => {
                self.attached.push(Name::from(text_content(node)));
                Ok(())
            }
            (Scope::Routes, Element::Route) => {
                self.collect_route(node);
                Ok(())
            }
            (_, element) => {
                tracing::trace!(
                    tag = node.tag_name().name(),
                    ?element,
                    ?scope,
                    "skipping element"
                );
                Ok(())
            }
        }
    }

    fn collect_mix_port(&mut self, node: Node<'_, '_>) {
        let role = attribute(node, "role");
        if PortRole::from_attribute(&role) != Some(PortRole::Source) {
            return;
        }
        self.mix_ports.push(MixPort {
            name: Name::from(attribute(node, "name")),
            module: self.module.clone(),
            role: PortRole::Source,
            flags: FlagSet::parse(&attribute(node, "flags")),
        });
    }

    fn collect_device_port(&mut self, node: Node<'_, '_>) {
        let type_token = attribute(node, "type");
        let device_type = DeviceType::from_token(&type_token);
        if device_type.is_none() && !type_token.is_empty() {
            tracing::trace!(device_type = %type_token, "unrecognised device type");
        }
        self.device_ports.push(DevicePortDecl {
            tag_name: attribute(node, "tagName"),
            role: PortRole::from_attribute(&attribute(node, "role")),
            device_type,
        });
    }

    fn collect_route(&mut self, node: Node<'_, '_>) {
        self.routes.push(Route {
            name: Name::from(attribute(node, "name")),
            sources: Route::parse_sources(&attribute(node, "sources")),
            sink: Name::from(attribute(node, "sink")),
        });
    }

    /// Resolves an `xi:include` in module position and walks the included
    /// root element as if it were written in place.
    fn include(&mut self, node: Node<'_, '_>) -> Result<(), ConfigError> {
        let href = attribute(node, "href");
        let Some(base_dir) = self.base_dir.clone() else {
            tracing::warn!(%href, "xi:include without a base directory, skipping");
            return Ok(());
        };
        if href.is_empty() {
            return Err(ConfigError::Include {
                href,
                reason: "missing href".to_string(),
            });
        }
        if self.include_depth >= MAX_INCLUDE_DEPTH {
            return Err(ConfigError::Include {
                href,
                reason: format!("nested deeper than {MAX_INCLUDE_DEPTH} levels"),
            });
        }

        let path = base_dir.join(&href);
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Include {
            href: href.clone(),
            reason: format!("{}: {e}", path.display()),
        })?;
        let document = Document::parse(&text).map_err(|e| ConfigError::Include {
            href: href.clone(),
            reason: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "resolving xi:include");

        self.include_depth += 1;
        self.base_dir = path.parent().map(Path::to_path_buf);
        let result = self.visit(Scope::Modules, document.root_element());
        self.base_dir = Some(base_dir);
        self.include_depth -= 1;
        result
    }

    fn finish(self, version: String) -> Configuration {
        let devices = self
            .attached
            .into_iter()
            .map(|name| {
                let port = self
                    .device_ports
                    .iter()
                    .find(|decl| decl.tag_name == name.as_str());
                Device {
                    role: port.and_then(|decl| decl.role),
                    device_type: port.and_then(|decl| decl.device_type),
                    name,
                }
            })
            .collect();

        Configuration {
            version,
            devices,
            mix_ports: self.mix_ports,
            routes: self.routes,
        }
    }
}

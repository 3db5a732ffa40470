//! Diagnostic events emitted by the routing engine.
//!
//! Events are non-fatal notifications about resolution and checks. A missing
//! route or a patch mismatch is reported here and returned to the caller;
//! the engine keeps working after any event.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Capability;
use crate::flags::OutputFlag;
use crate::model::Name;
use crate::patch::IoHandle;
use crate::verifier::Verdict;

/// Events emitted by a [`RoutingEngine`](crate::RoutingEngine).
///
/// # Example
///
/// ```
/// use audio_policy_routing::RoutingEvent;
///
/// fn handle_event(event: RoutingEvent) {
///     match event {
///         RoutingEvent::ConfigurationLoaded { path, mix_ports, routes, .. } => {
///             eprintln!("loaded {:?}: {} mix ports, {} routes", path, mix_ports, routes);
///         }
///         RoutingEvent::RouteResolved { flag, mix_port, device } => {
///             eprintln!("{} -> {} -> {}", flag, mix_port, device);
///         }
///         RoutingEvent::RouteNotFound { capability } => {
///             eprintln!("skipping {}: not supported", capability);
///         }
///         RoutingEvent::DeviceWaitTimedOut { timeout } => {
///             eprintln!("no device callback within {:?}", timeout);
///         }
///         RoutingEvent::PatchVerified { io_handle, verdict } => {
///             eprintln!("{}: {}", io_handle, verdict);
///         }
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingEvent {
    /// A configuration snapshot was built and installed.
    ConfigurationLoaded {
        /// File it was read from, if any.
        path: Option<PathBuf>,
        /// Number of source mix ports retained.
        mix_ports: usize,
        /// Number of routes retained.
        routes: usize,
        /// Number of attached devices.
        attached_devices: usize,
    },

    /// An output flag resolved to a device.
    RouteResolved {
        /// Requested flag.
        flag: OutputFlag,
        /// Chosen mix port.
        mix_port: Name,
        /// Attached device the route sinks into.
        device: Name,
    },

    /// The configuration has no route for a capability.
    ///
    /// Expected on hardware without the output path or input device; checks
    /// for the capability are skipped.
    RouteNotFound {
        /// What was asked for.
        capability: Capability,
    },

    /// A started stream got no device-changed notification in time.
    DeviceWaitTimedOut {
        /// How long the check waited.
        timeout: Duration,
    },

    /// An observed patch was compared against the expected routing.
    PatchVerified {
        /// The mix the stream played through.
        io_handle: IoHandle,
        /// Outcome of the comparison.
        verdict: Verdict,
    },
}

/// Callback type for receiving routing events.
///
/// Register one via [`RoutingEngineBuilder::on_event()`].
///
/// [`RoutingEngineBuilder::on_event()`]: crate::RoutingEngineBuilder::on_event
pub type EventCallback = Arc<dyn Fn(RoutingEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use audio_policy_routing::{event_callback, RoutingEvent};
///
/// let callback = event_callback(|event: RoutingEvent| {
///     println!("Got event: {:?}", event);
/// });
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(RoutingEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

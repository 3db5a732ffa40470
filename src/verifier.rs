//! Checking an observed hardware patch against the expected routing.

use crate::flags::{OutputFlag, OutputFlags};
use crate::patch::{AudioPort, IoHandle, ObservedPatch, PortId};
use crate::resolver::RoutingDecision;
use crate::waiter::DeviceChange;

/// Everything a playback patch is checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedRouting {
    /// The resolver's prediction.
    pub decision: RoutingDecision,
    /// The device-changed notification: correlation io handle and routed device.
    pub change: DeviceChange,
    /// Port id the service reports for the expected sink device, when the
    /// device's type is known and could be looked up.
    pub sink_port: Option<PortId>,
}

/// Outcome of a patch verification.
///
/// Mismatches are values for the caller to report, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The patch matches the expected routing.
    Match,
    /// The mix source is present but lacks the requested flag.
    FlagMismatch {
        /// The flag that should be set.
        expected: OutputFlag,
        /// The flags that are set.
        actual: OutputFlags,
    },
    /// The stream was routed to a different device.
    DeviceMismatch {
        /// The device the stream should reach.
        expected: PortId,
        /// The device observed, if any.
        actual: Option<PortId>,
    },
    /// No mix source in the patch plays through the stream's io handle.
    NoMatchingSource {
        /// The io handle that was looked for.
        io_handle: IoHandle,
    },
}

impl Verdict {
    /// Returns true for [`Verdict::Match`].
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Match => f.write_str("patch matches"),
            Self::FlagMismatch { expected, actual } => {
                write!(f, "expected output flag {expected} is absent (have {actual})")
            }
            Self::DeviceMismatch {
                expected,
                actual: Some(actual),
            } => write!(f, "routed to {actual}, expected {expected}"),
            Self::DeviceMismatch {
                expected,
                actual: None,
            } => write!(f, "no sink device in patch, expected {expected}"),
            Self::NoMatchingSource { io_handle } => {
                write!(f, "no mix source for {io_handle} in patch")
            }
        }
    }
}

/// Verifies an observed patch against the expected playback routing.
///
/// The mix source playing through the notification's io handle must carry
/// the requested flag (checked first). Then the routed device must be the
/// expected sink port, when known, and must appear among the patch's sinks.
pub fn verify(expected: &ExpectedRouting, observed: &ObservedPatch) -> Verdict {
    let io_handle = expected.change.io_handle;
    let flag = expected.decision.flag;

    let Some(source) = observed.mix_source(io_handle) else {
        tracing::warn!(%io_handle, "no matching mix source in patch");
        return Verdict::NoMatchingSource { io_handle };
    };

    let verdict = if !source.has_flag(flag) {
        Verdict::FlagMismatch {
            expected: flag,
            actual: source.flags,
        }
    } else {
        let routed = expected.change.device_id;
        match expected.sink_port {
            Some(sink) if sink != routed => Verdict::DeviceMismatch {
                expected: sink,
                actual: Some(routed),
            },
            _ if !observed.has_sink_device(routed) => Verdict::DeviceMismatch {
                expected: routed,
                actual: observed.sinks.iter().find_map(|sink| sink.device_id()),
            },
            _ => Verdict::Match,
        }
    };

    if verdict.is_match() {
        tracing::debug!(%io_handle, %flag, "patch verified");
    } else {
        tracing::warn!(%io_handle, %flag, %verdict, "patch mismatch");
    }
    verdict
}

/// Verifies that a capture or playback stream was routed to the port the
/// service reports for the expected device.
pub fn verify_device_routing(expected: &AudioPort, routed: PortId) -> Verdict {
    if expected.id == routed {
        Verdict::Match
    } else {
        tracing::warn!(
            port = %expected.name,
            expected = %expected.id,
            %routed,
            "stream not routed on expected port"
        );
        Verdict::DeviceMismatch {
            expected: expected.id,
            actual: Some(routed),
        }
    }
}

//! Error types for audio-policy-routing.
//!
//! Errors are split by how a caller is expected to react:
//! - **Fatal errors** ([`ConfigError`]): the policy configuration cannot be used at all
//! - **Expected outcomes** ([`ResolveError`], [`WaitError::TimedOut`]): normal results of
//!   querying real hardware, reported and skipped or failed by the caller
//! - **Usage errors** ([`WaitError::AlreadyArmed`], [`WaitError::NotArmed`]): bugs in the caller
//!
//! Patch verification mismatches are not errors; see [`Verdict`](crate::Verdict).

use std::path::PathBuf;
use std::time::Duration;

use crate::flags::{InputSource, OutputFlag};
use crate::patch::{DeviceType, IoHandle, PortRole};
use crate::service::StreamHandle;

/// Errors raised while building a [`Configuration`](crate::Configuration).
///
/// A build either succeeds completely or fails with one of these; no partially
/// populated configuration is ever returned.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No source document is available.
    #[error("audio policy configuration unreadable: {reason}")]
    Unreadable {
        /// Path that was tried, if any.
        path: Option<PathBuf>,
        /// Why the document could not be read.
        reason: String,
    },

    /// The document root is not an audio policy configuration.
    #[error("malformed root element <{found}>, expected <audioPolicyConfiguration>")]
    MalformedRoot {
        /// Tag name of the root element that was found.
        found: String,
    },

    /// The document is not well-formed XML.
    #[error("malformed XML in {origin}: {source}")]
    Parse {
        /// File path or `<memory>` for in-memory documents.
        origin: String,
        /// The underlying parser error.
        #[source]
        source: roxmltree::Error,
    },

    /// An `xi:include` could not be resolved.
    #[error("cannot include '{href}': {reason}")]
    Include {
        /// The `href` attribute of the include element.
        href: String,
        /// Why the include failed.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an unreadable error for a file that failed to open or read.
    pub fn unreadable(path: impl Into<PathBuf>, source: &std::io::Error) -> Self {
        let path = path.into();
        Self::Unreadable {
            reason: format!("{}: {source}", path.display()),
            path: Some(path),
        }
    }
}

/// The capability a resolution was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// A playback stream requesting an output flag.
    Output(OutputFlag),
    /// A capture stream from an input source.
    Input(InputSource),
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Output(flag) => write!(f, "output flag {flag}"),
            Self::Input(source) => write!(f, "input source {source}"),
        }
    }
}

/// Route resolution found nothing usable.
///
/// This is an expected outcome (the device class may not exist on the current
/// hardware), not a configuration fault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// No mix port, route and attached device satisfy the request.
    #[error("no attached route for {capability}")]
    NotFound {
        /// What was requested.
        capability: Capability,
    },
}

impl ResolveError {
    /// Returns the capability that could not be resolved.
    pub fn capability(&self) -> Capability {
        match self {
            Self::NotFound { capability } => *capability,
        }
    }
}

/// Errors from the [`DeviceChangeWaiter`](crate::DeviceChangeWaiter).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WaitError {
    /// The waiter is already armed; a second stream start was issued without
    /// the first reaching a terminal state.
    #[error("device-change waiter already armed")]
    AlreadyArmed,

    /// `wait` was called without arming first.
    #[error("device-change waiter not armed")]
    NotArmed,

    /// No device-changed notification arrived in time.
    #[error("no device-changed notification within {timeout:?}")]
    TimedOut {
        /// The timeout that elapsed.
        timeout: Duration,
    },
}

/// Failures reported by an [`AudioService`](crate::AudioService).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The service has no port matching the requested attributes.
    #[error("no {role:?} port of type {device_type}")]
    PortNotFound {
        /// Requested port role.
        role: PortRole,
        /// Requested device type.
        device_type: DeviceType,
    },

    /// The service has no patch for the given mix.
    #[error("no patch for output mix {io_handle}")]
    NoPatch {
        /// The io handle that was queried.
        io_handle: IoHandle,
    },

    /// The stream handle is not known to the service.
    #[error("unknown stream {stream}")]
    UnknownStream {
        /// The unknown handle.
        stream: StreamHandle,
    },

    /// Any other service-side failure.
    #[error("{operation} failed: {reason}")]
    CallFailed {
        /// Name of the failed operation.
        operation: &'static str,
        /// Description of what went wrong.
        reason: String,
    },
}

impl ServiceError {
    /// Creates a generic call failure.
    pub fn call_failed(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::CallFailed {
            operation,
            reason: reason.into(),
        }
    }
}

/// Errors from the end-to-end route checks.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// The requested route does not exist on this configuration.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The device-changed handshake failed.
    #[error(transparent)]
    Wait(#[from] WaitError),

    /// The audio service rejected a call.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl CheckError {
    /// Returns true if the check should be skipped rather than failed.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Resolve(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_root_display() {
        let err = ConfigError::MalformedRoot {
            found: "policy".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed root element <policy>, expected <audioPolicyConfiguration>"
        );
    }

    #[test]
    fn test_unreadable_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::unreadable("/vendor/etc/policy.xml", &io_err);
        assert!(err.to_string().contains("/vendor/etc/policy.xml"));
        assert!(matches!(err, ConfigError::Unreadable { path: Some(_), .. }));
    }

    #[test]
    fn test_not_found_display() {
        let err = ResolveError::NotFound {
            capability: Capability::Output(OutputFlag::DeepBuffer),
        };
        assert_eq!(
            err.to_string(),
            "no attached route for output flag AUDIO_OUTPUT_FLAG_DEEP_BUFFER"
        );
    }

    #[test]
    fn test_timed_out_display() {
        let err = WaitError::TimedOut {
            timeout: Duration::from_millis(250),
        };
        assert_eq!(
            err.to_string(),
            "no device-changed notification within 250ms"
        );
    }

    #[test]
    fn test_check_error_skip() {
        let skip = CheckError::from(ResolveError::NotFound {
            capability: Capability::Input(InputSource::RemoteSubmix),
        });
        assert!(skip.is_skip());

        let fail = CheckError::from(WaitError::AlreadyArmed);
        assert!(!fail.is_skip());
    }

    #[test]
    fn test_service_error_call_failed() {
        let err = ServiceError::call_failed("start_playback", "track creation failed");
        assert_eq!(err.to_string(), "start_playback failed: track creation failed");
    }
}

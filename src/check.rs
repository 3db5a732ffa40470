//! End-to-end routing checks against an [`AudioService`].
//!
//! A check resolves the expected route, starts a stream, waits for the
//! device-changed notification and compares what the service did with what
//! the configuration predicts. Streams are always stopped when a check
//! returns, whatever the outcome.

use crate::error::{CheckError, ServiceError, WaitError};
use crate::flags::{InputSource, OutputFlag, OutputFlags};
use crate::model::Device;
use crate::patch::{DeviceType, PortId, PortRole, PortType};
use crate::resolver::RoutingDecision;
use crate::service::{AudioService, CaptureRequest, PlaybackRequest, StreamHandle};
use crate::verifier::{verify, verify_device_routing, ExpectedRouting, Verdict};
use crate::waiter::{DeviceChange, DeviceChangeWaiter};
use crate::{RoutingEngine, RoutingEvent};

/// Sample rate used for remote submix streams.
const REMOTE_SUBMIX_SAMPLE_RATE: u32 = 48000;

/// Stops a stream on drop.
struct StreamGuard<'a> {
    service: &'a dyn AudioService,
    stream: StreamHandle,
}

impl<'a> StreamGuard<'a> {
    fn new(service: &'a dyn AudioService, stream: StreamHandle) -> Self {
        tracing::trace!(%stream, "stream started");
        Self { service, stream }
    }
}

impl Drop for StreamGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.service.stop(self.stream) {
            tracing::warn!(stream = %self.stream, error = %e, "failed to stop stream");
        }
    }
}

/// Outcome of [`check_playback_route`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackCheck {
    /// The route the configuration predicts.
    pub decision: RoutingDecision,
    /// The device-changed notification the stream produced.
    pub change: DeviceChange,
    /// Output flags the service granted the stream.
    pub granted_flags: OutputFlags,
    /// How the observed patch compares to the prediction.
    pub verdict: Verdict,
}

impl PlaybackCheck {
    /// Returns true if the patch matched.
    pub fn is_match(&self) -> bool {
        self.verdict.is_match()
    }
}

impl std::fmt::Display for PlaybackCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.decision, self.verdict)
    }
}

/// Outcome of [`check_remote_submix`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSubmixCheck {
    /// The attached remote submix input device.
    pub input_device: Device,
    /// Capture routing against the remote submix input port.
    pub capture: Verdict,
    /// Playback routing against the remote submix output port.
    pub playback: Verdict,
}

impl RemoteSubmixCheck {
    /// Returns true if both directions matched.
    pub fn is_match(&self) -> bool {
        self.capture.is_match() && self.playback.is_match()
    }
}

/// Plays a stream requesting `flag` and verifies the resulting patch.
///
/// The request asks for the flag through its attributes only, so the check
/// also covers the service's attribute-to-flag mapping. The stream itself
/// must have been granted `flag`; otherwise the verdict is
/// [`Verdict::FlagMismatch`] carrying the granted flags, whatever the patch
/// shows.
///
/// # Errors
///
/// - [`CheckError::Resolve`] if the configuration has no route for `flag`;
///   callers should skip, see [`CheckError::is_skip`]
/// - [`CheckError::Wait`] with [`WaitError::TimedOut`] if no device-changed
///   notification arrived within
///   [`EngineConfig::device_wait_timeout`](crate::EngineConfig::device_wait_timeout)
/// - [`CheckError::Service`] if a service call failed
pub fn check_playback_route(
    engine: &RoutingEngine,
    service: &dyn AudioService,
    flag: OutputFlag,
) -> Result<PlaybackCheck, CheckError> {
    let decision = engine.resolve_output_route(flag)?;

    let waiter = DeviceChangeWaiter::new();
    waiter.arm()?;
    let request = PlaybackRequest::performance_mode(flag);
    let stream = StreamGuard::new(
        service,
        service.start_playback(&request, waiter.callback())?,
    );

    let change = wait_for_device(engine, &waiter)?;
    let granted_flags = service.stream_output_flags(stream.stream)?;
    tracing::debug!(
        %flag,
        io_handle = %change.io_handle,
        device_id = %change.device_id,
        granted = %granted_flags,
        "playback stream routed"
    );

    let sink_port = match decision.device.device_type {
        Some(device_type) => lookup_port(service, PortRole::Sink, device_type)?,
        None => None,
    };
    let expected = ExpectedRouting {
        decision,
        change,
        sink_port,
    };
    let verdict = if granted_flags.contains(flag) {
        let patch = service.get_patch_for_output_mix(change.io_handle)?;
        verify(&expected, &patch)
    } else {
        tracing::warn!(%flag, granted = %granted_flags, "stream not granted the requested flag");
        Verdict::FlagMismatch {
            expected: flag,
            actual: granted_flags,
        }
    };
    engine.emit_event(RoutingEvent::PatchVerified {
        io_handle: change.io_handle,
        verdict,
    });

    Ok(PlaybackCheck {
        decision: expected.decision,
        change,
        granted_flags,
        verdict,
    })
}

/// Runs [`check_playback_route`] for each of
/// [`EngineConfig::performance_flags`](crate::EngineConfig::performance_flags),
/// in order.
///
/// One flag failing does not stop the others.
pub fn check_performance_modes(
    engine: &RoutingEngine,
    service: &dyn AudioService,
) -> Vec<(OutputFlag, Result<PlaybackCheck, CheckError>)> {
    engine
        .config()
        .performance_flags
        .iter()
        .map(|&flag| {
            let outcome = check_playback_route(engine, service, flag);
            match &outcome {
                Ok(check) => {
                    tracing::info!(%flag, verdict = %check.verdict, "performance mode checked");
                }
                Err(e) if e.is_skip() => {
                    tracing::info!(%flag, "performance mode not supported, skipped");
                }
                Err(e) => tracing::warn!(%flag, error = %e, "performance mode check failed"),
            }
            (flag, outcome)
        })
        .collect()
}

/// Captures from remote submix while playing media, and checks both streams
/// are routed through the remote submix device ports.
///
/// # Errors
///
/// - [`CheckError::Resolve`] if no remote submix input device is attached;
///   callers should skip
/// - [`CheckError::Service`] if a remote submix port is missing or a service
///   call failed
/// - [`CheckError::Wait`] if the playback stream was never routed
pub fn check_remote_submix(
    engine: &RoutingEngine,
    service: &dyn AudioService,
) -> Result<RemoteSubmixCheck, CheckError> {
    let input_device = engine.resolve_input_route(InputSource::RemoteSubmix)?;

    let in_port = service.get_port_by_attributes(
        PortRole::Source,
        PortType::Device,
        DeviceType::IN_REMOTE_SUBMIX,
    )?;
    let out_port = service.get_port_by_attributes(
        PortRole::Sink,
        PortType::Device,
        DeviceType::OUT_REMOTE_SUBMIX,
    )?;

    let capture_stream = StreamGuard::new(
        service,
        service.start_capture(&CaptureRequest::new(
            InputSource::RemoteSubmix,
            REMOTE_SUBMIX_SAMPLE_RATE,
        ))?,
    );
    let capture = verify_device_routing(&in_port, service.routed_device_id(capture_stream.stream)?);

    let waiter = DeviceChangeWaiter::new();
    waiter.arm()?;
    let playback_stream = StreamGuard::new(
        service,
        service.start_playback(
            &PlaybackRequest::media(REMOTE_SUBMIX_SAMPLE_RATE),
            waiter.callback(),
        )?,
    );
    let change = wait_for_device(engine, &waiter)?;
    let playback = verify_device_routing(&out_port, change.device_id);
    engine.emit_event(RoutingEvent::PatchVerified {
        io_handle: change.io_handle,
        verdict: playback,
    });

    drop(playback_stream);
    drop(capture_stream);

    Ok(RemoteSubmixCheck {
        input_device,
        capture,
        playback,
    })
}

fn wait_for_device(
    engine: &RoutingEngine,
    waiter: &DeviceChangeWaiter,
) -> Result<DeviceChange, CheckError> {
    waiter
        .wait(engine.config().device_wait_timeout)
        .map_err(|e| {
            if let WaitError::TimedOut { timeout } = e {
                engine.emit_event(RoutingEvent::DeviceWaitTimedOut { timeout });
            }
            CheckError::from(e)
        })
}

/// Looks a device port up, treating an unknown port as "no expectation".
fn lookup_port(
    service: &dyn AudioService,
    role: PortRole,
    device_type: DeviceType,
) -> Result<Option<PortId>, ServiceError> {
    match service.get_port_by_attributes(role, PortType::Device, device_type) {
        Ok(port) => Ok(Some(port.id)),
        Err(ServiceError::PortNotFound { .. }) => {
            tracing::debug!(%device_type, "no port for expected device, checking patch sinks only");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

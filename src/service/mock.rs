//! Mock audio service for testing without hardware.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;

use super::{AudioService, CaptureRequest, PlaybackRequest, StreamHandle};
use crate::error::ServiceError;
use crate::flags::OutputFlags;
use crate::patch::{
    AudioPort, DeviceType, IoHandle, ObservedPatch, PortConfig, PortId, PortRole, PortType,
};
use crate::waiter::{DeviceCallback, DeviceChange};

/// First io handle the mock hands out.
const FIRST_IO_HANDLE: i32 = 13;

#[derive(Debug, Clone, Copy)]
struct MockStream {
    io_handle: IoHandle,
    device: PortId,
    flags: OutputFlags,
    playback: bool,
}

#[derive(Debug)]
struct MockState {
    ports: Vec<AudioPort>,
    playback_device: Option<PortId>,
    capture_device: Option<PortId>,
    notify_delay: Option<Duration>,
    grant_flags: bool,
    next_stream: u32,
    next_io: i32,
    streams: HashMap<StreamHandle, MockStream>,
}

/// An in-memory [`AudioService`].
///
/// Playback streams are routed to a configured device and get the output
/// flags their attributes ask for. The device-changed notification is
/// delivered from a separate thread after a configurable delay, like a real
/// service would.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use audio_policy_routing::{
///     AudioPort, DeviceType, MockAudioService, PortId, PortRole,
/// };
///
/// let service = MockAudioService::new()
///     .with_port(AudioPort::device(PortId(2), PortRole::Sink, DeviceType::OUT_SPEAKER, "Speaker"))
///     .route_playback_to(PortId(2))
///     .notify_after(Duration::from_millis(5));
/// # let _ = service;
/// ```
#[derive(Debug)]
pub struct MockAudioService {
    state: Mutex<MockState>,
}

impl Default for MockAudioService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAudioService {
    /// Creates a service with no ports that notifies immediately.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                ports: Vec::new(),
                playback_device: None,
                capture_device: None,
                notify_delay: Some(Duration::ZERO),
                grant_flags: true,
                next_stream: 1,
                next_io: FIRST_IO_HANDLE,
                streams: HashMap::new(),
            }),
        }
    }

    /// Adds a port.
    #[must_use]
    pub fn with_port(self, port: AudioPort) -> Self {
        self.state.lock().ports.push(port);
        self
    }

    /// Routes playback streams to the device port `id`.
    #[must_use]
    pub fn route_playback_to(self, id: PortId) -> Self {
        self.state.lock().playback_device = Some(id);
        self
    }

    /// Routes capture streams to the device port `id`.
    #[must_use]
    pub fn route_capture_to(self, id: PortId) -> Self {
        self.state.lock().capture_device = Some(id);
        self
    }

    /// Delivers device-changed notifications `delay` after a playback start.
    #[must_use]
    pub fn notify_after(self, delay: Duration) -> Self {
        self.state.lock().notify_delay = Some(delay);
        self
    }

    /// Never delivers device-changed notifications.
    #[must_use]
    pub fn silent(self) -> Self {
        self.state.lock().notify_delay = None;
        self
    }

    /// Grants no output flags to playback streams.
    #[must_use]
    pub fn deny_output_flags(self) -> Self {
        self.state.lock().grant_flags = false;
        self
    }

    /// Returns the number of started, not yet stopped streams.
    pub fn active_streams(&self) -> usize {
        self.state.lock().streams.len()
    }

    fn stream(&self, stream: StreamHandle) -> Result<MockStream, ServiceError> {
        self.state
            .lock()
            .streams
            .get(&stream)
            .copied()
            .ok_or(ServiceError::UnknownStream { stream })
    }
}

impl MockState {
    fn open(
        &mut self,
        device: PortId,
        flags: OutputFlags,
        playback: bool,
    ) -> (StreamHandle, IoHandle) {
        let handle = StreamHandle(self.next_stream);
        let io_handle = IoHandle(self.next_io);
        self.next_stream += 1;
        self.next_io += 8;
        self.streams.insert(
            handle,
            MockStream {
                io_handle,
                device,
                flags,
                playback,
            },
        );
        (handle, io_handle)
    }
}

impl AudioService for MockAudioService {
    fn start_playback(
        &self,
        request: &PlaybackRequest,
        callback: DeviceCallback,
    ) -> Result<StreamHandle, ServiceError> {
        let (handle, change, delay) = {
            let mut state = self.state.lock();
            let device = state.playback_device.ok_or_else(|| {
                ServiceError::call_failed("start_playback", "no playback device configured")
            })?;
            let flags = if state.grant_flags {
                request.flags | request.attributes.flags.implied_output_flags()
            } else {
                OutputFlags::NONE
            };
            let (handle, io_handle) = state.open(device, flags, true);
            (handle, DeviceChange::new(io_handle, device), state.notify_delay)
        };

        if let Some(delay) = delay {
            std::thread::Builder::new()
                .name("mock-audio-notify".to_string())
                .spawn(move || {
                    std::thread::sleep(delay);
                    callback(change);
                })
                .map_err(|e| ServiceError::call_failed("start_playback", e.to_string()))?;
        }
        Ok(handle)
    }

    fn start_capture(&self, _request: &CaptureRequest) -> Result<StreamHandle, ServiceError> {
        let mut state = self.state.lock();
        let device = state.capture_device.ok_or_else(|| {
            ServiceError::call_failed("start_capture", "no capture device configured")
        })?;
        let (handle, _) = state.open(device, OutputFlags::NONE, false);
        Ok(handle)
    }

    fn stop(&self, stream: StreamHandle) -> Result<(), ServiceError> {
        self.state
            .lock()
            .streams
            .remove(&stream)
            .map(|_| ())
            .ok_or(ServiceError::UnknownStream { stream })
    }

    fn routed_device_id(&self, stream: StreamHandle) -> Result<PortId, ServiceError> {
        self.stream(stream).map(|s| s.device)
    }

    fn stream_output_flags(&self, stream: StreamHandle) -> Result<OutputFlags, ServiceError> {
        self.stream(stream).map(|s| s.flags)
    }

    fn get_port_by_attributes(
        &self,
        role: PortRole,
        port_type: PortType,
        device_type: DeviceType,
    ) -> Result<AudioPort, ServiceError> {
        self.state
            .lock()
            .ports
            .iter()
            .find(|port| port.matches(role, port_type, device_type))
            .cloned()
            .ok_or(ServiceError::PortNotFound { role, device_type })
    }

    fn get_patch_for_output_mix(
        &self,
        io_handle: IoHandle,
    ) -> Result<ObservedPatch, ServiceError> {
        let state = self.state.lock();
        let stream = state
            .streams
            .values()
            .find(|s| s.playback && s.io_handle == io_handle)
            .ok_or(ServiceError::NoPatch { io_handle })?;
        let device_type = state
            .ports
            .iter()
            .find(|port| port.id == stream.device)
            .and_then(|port| port.device_type)
            .unwrap_or(DeviceType::from_bits(0));

        Ok(ObservedPatch::new()
            .with_source(PortConfig::mix(stream.io_handle, stream.flags))
            .with_sink(PortConfig::device(stream.device, device_type)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::OutputFlag;
    use crate::waiter::DeviceChangeWaiter;

    fn speaker() -> AudioPort {
        AudioPort::device(PortId(2), PortRole::Sink, DeviceType::OUT_SPEAKER, "Speaker")
    }

    #[test]
    fn test_mock_playback_notifies() {
        let service = MockAudioService::new()
            .with_port(speaker())
            .route_playback_to(PortId(2))
            .notify_after(Duration::from_millis(5));

        let waiter = DeviceChangeWaiter::new();
        waiter.arm().unwrap();
        let stream = service
            .start_playback(&PlaybackRequest::performance_mode(OutputFlag::Fast), waiter.callback())
            .unwrap();

        let change = waiter.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(change.device_id, PortId(2));
        assert_eq!(service.routed_device_id(stream).unwrap(), PortId(2));
        assert!(service
            .stream_output_flags(stream)
            .unwrap()
            .contains(OutputFlag::Fast));
    }

    #[test]
    fn test_mock_patch_for_playback() {
        let service = MockAudioService::new()
            .with_port(speaker())
            .route_playback_to(PortId(2))
            .silent();

        let stream = service
            .start_playback(
                &PlaybackRequest::performance_mode(OutputFlag::DeepBuffer),
                crate::waiter::device_callback(|_| {}),
            )
            .unwrap();
        assert_eq!(service.active_streams(), 1);

        let patch = service
            .get_patch_for_output_mix(IoHandle(FIRST_IO_HANDLE))
            .unwrap();
        assert!(patch
            .mix_source(IoHandle(FIRST_IO_HANDLE))
            .unwrap()
            .has_flag(OutputFlag::DeepBuffer));
        assert!(patch.has_sink_device(PortId(2)));

        service.stop(stream).unwrap();
        assert_eq!(service.active_streams(), 0);
        assert!(service.stop(stream).is_err());
    }

    #[test]
    fn test_mock_deny_flags() {
        let service = MockAudioService::new()
            .route_playback_to(PortId(2))
            .silent()
            .deny_output_flags();
        let stream = service
            .start_playback(
                &PlaybackRequest::performance_mode(OutputFlag::Fast),
                crate::waiter::device_callback(|_| {}),
            )
            .unwrap();
        assert!(service.stream_output_flags(stream).unwrap().is_empty());
    }

    #[test]
    fn test_mock_port_lookup() {
        let service = MockAudioService::new().with_port(speaker());
        let port = service
            .get_port_by_attributes(PortRole::Sink, PortType::Device, DeviceType::OUT_SPEAKER)
            .unwrap();
        assert_eq!(port.id, PortId(2));

        let missing = service.get_port_by_attributes(
            PortRole::Source,
            PortType::Device,
            DeviceType::IN_REMOTE_SUBMIX,
        );
        assert!(matches!(missing, Err(ServiceError::PortNotFound { .. })));
    }

    #[test]
    fn test_mock_without_route_fails() {
        let service = MockAudioService::new();
        let result = service.start_capture(&CaptureRequest::new(
            crate::flags::InputSource::RemoteSubmix,
            48000,
        ));
        assert!(matches!(result, Err(ServiceError::CallFailed { .. })));
    }
}

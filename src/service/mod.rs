//! The audio service the engine talks to.
//!
//! The service owns hardware arbitration: it opens streams, decides where
//! they are routed, reports ports and patches, and delivers device-changed
//! notifications from its own thread. The crate only consumes it through the
//! [`AudioService`] trait.
//!
//! - [`MockAudioService`]: in-memory service for tests and demos

mod mock;

pub use mock::MockAudioService;

use crate::error::ServiceError;
use crate::flags::{AudioAttributes, InputSource, OutputFlag, OutputFlags};
use crate::patch::{AudioPort, DeviceType, IoHandle, ObservedPatch, PortId, PortRole, PortType};
use crate::waiter::DeviceCallback;

/// Handle of a stream opened through an [`AudioService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamHandle(pub u32);

impl std::fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stream#{}", self.0)
    }
}

/// Parameters of a playback stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackRequest {
    /// Stream intent.
    pub attributes: AudioAttributes,
    /// Output flags requested directly.
    pub flags: OutputFlags,
    /// Sample rate in Hz, 0 for the output's native rate.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
}

impl PlaybackRequest {
    /// Stereo media playback asking for `flag` through its attributes.
    ///
    /// No output flag is requested directly; the service has to derive it
    /// from the attributes.
    pub fn performance_mode(flag: OutputFlag) -> Self {
        Self {
            attributes: AudioAttributes::media_for(flag),
            flags: OutputFlags::NONE,
            sample_rate: 0,
            channels: 2,
        }
    }

    /// Plain stereo media playback at `sample_rate`.
    pub fn media(sample_rate: u32) -> Self {
        Self {
            attributes: AudioAttributes::default(),
            flags: OutputFlags::NONE,
            sample_rate,
            channels: 2,
        }
    }
}

/// Parameters of a capture stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    /// Where to record from.
    pub source: InputSource,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
}

impl CaptureRequest {
    /// Stereo capture from `source` at `sample_rate`.
    pub fn new(source: InputSource, sample_rate: u32) -> Self {
        Self {
            source,
            sample_rate,
            channels: 2,
        }
    }
}

/// Access to the platform audio service.
///
/// # Implementation Notes
///
/// - Methods take `&self`; use interior mutability if needed
/// - `start_playback` must eventually invoke `callback` with the stream's io
///   handle and routed device, typically from another thread
/// - Ids are opaque to the engine and only compared
pub trait AudioService: Send + Sync {
    /// Opens and starts a playback stream.
    fn start_playback(
        &self,
        request: &PlaybackRequest,
        callback: DeviceCallback,
    ) -> Result<StreamHandle, ServiceError>;

    /// Opens and starts a capture stream.
    fn start_capture(&self, request: &CaptureRequest) -> Result<StreamHandle, ServiceError>;

    /// Stops a stream and unregisters its device callback.
    fn stop(&self, stream: StreamHandle) -> Result<(), ServiceError>;

    /// Returns the device port a started stream is routed to.
    fn routed_device_id(&self, stream: StreamHandle) -> Result<PortId, ServiceError>;

    /// Returns the output flags the service granted a playback stream.
    fn stream_output_flags(&self, stream: StreamHandle) -> Result<OutputFlags, ServiceError>;

    /// Finds a port by role, type and device type.
    fn get_port_by_attributes(
        &self,
        role: PortRole,
        port_type: PortType,
        device_type: DeviceType,
    ) -> Result<AudioPort, ServiceError>;

    /// Returns the patch the output mix `io_handle` currently plays through.
    fn get_patch_for_output_mix(&self, io_handle: IoHandle)
        -> Result<ObservedPatch, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{AttributeFlags, Usage};

    #[test]
    fn test_performance_mode_request() {
        let request = PlaybackRequest::performance_mode(OutputFlag::Fast);
        assert_eq!(request.attributes.usage, Usage::Media);
        assert_eq!(request.attributes.flags, AttributeFlags::LOW_LATENCY);
        assert!(request.flags.is_empty());
    }

    #[test]
    fn test_stream_handle_display() {
        assert_eq!(StreamHandle(4).to_string(), "stream#4");
    }
}

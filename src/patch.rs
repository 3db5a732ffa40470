//! Ports and patches as reported by the audio service.
//!
//! These types describe live hardware state. Ids are assigned by the service
//! and are only ever compared, never computed here.

use crate::flags::{OutputFlag, OutputFlags};

/// Whether a port produces or consumes audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortRole {
    /// Produces audio (input devices, playback mixes).
    Source,
    /// Consumes audio (output devices, capture mixes).
    Sink,
}

impl PortRole {
    /// Parses a `role` attribute value.
    pub fn from_attribute(value: &str) -> Option<Self> {
        match value.trim() {
            "source" => Some(Self::Source),
            "sink" => Some(Self::Sink),
            _ => None,
        }
    }
}

/// What kind of entity a port is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortType {
    /// A physical or virtual device.
    Device,
    /// A software mix inside the audio module.
    Mix,
    /// An audio session.
    Session,
}

/// A device type mask value.
///
/// Input device types carry [`DeviceType::BIT_IN`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceType(u32);

impl DeviceType {
    /// Bit set on every input device type.
    pub const BIT_IN: u32 = 0x8000_0000;

    /// Earpiece.
    pub const OUT_EARPIECE: DeviceType = DeviceType(0x1);
    /// Loudspeaker.
    pub const OUT_SPEAKER: DeviceType = DeviceType(0x2);
    /// Wired headset (with mic).
    pub const OUT_WIRED_HEADSET: DeviceType = DeviceType(0x4);
    /// Wired headphones.
    pub const OUT_WIRED_HEADPHONE: DeviceType = DeviceType(0x8);
    /// Bluetooth SCO.
    pub const OUT_BLUETOOTH_SCO: DeviceType = DeviceType(0x10);
    /// Bluetooth A2DP.
    pub const OUT_BLUETOOTH_A2DP: DeviceType = DeviceType(0x80);
    /// HDMI.
    pub const OUT_HDMI: DeviceType = DeviceType(0x400);
    /// USB device.
    pub const OUT_USB_DEVICE: DeviceType = DeviceType(0x4000);
    /// Remote submix output.
    pub const OUT_REMOTE_SUBMIX: DeviceType = DeviceType(0x8000);
    /// Telephony uplink.
    pub const OUT_TELEPHONY_TX: DeviceType = DeviceType(0x1_0000);
    /// Automotive bus.
    pub const OUT_BUS: DeviceType = DeviceType(0x100_0000);

    /// Built-in microphone.
    pub const IN_BUILTIN_MIC: DeviceType = DeviceType(Self::BIT_IN | 0x4);
    /// Wired headset microphone.
    pub const IN_WIRED_HEADSET: DeviceType = DeviceType(Self::BIT_IN | 0x10);
    /// Telephony downlink.
    pub const IN_TELEPHONY_RX: DeviceType = DeviceType(Self::BIT_IN | 0x40);
    /// Back microphone.
    pub const IN_BACK_MIC: DeviceType = DeviceType(Self::BIT_IN | 0x80);
    /// Remote submix input.
    pub const IN_REMOTE_SUBMIX: DeviceType = DeviceType(Self::BIT_IN | 0x100);
    /// Automotive bus input.
    pub const IN_BUS: DeviceType = DeviceType(Self::BIT_IN | 0x10_0000);

    const TOKENS: [(&'static str, DeviceType); 17] = [
        ("AUDIO_DEVICE_OUT_EARPIECE", Self::OUT_EARPIECE),
        ("AUDIO_DEVICE_OUT_SPEAKER", Self::OUT_SPEAKER),
        ("AUDIO_DEVICE_OUT_WIRED_HEADSET", Self::OUT_WIRED_HEADSET),
        ("AUDIO_DEVICE_OUT_WIRED_HEADPHONE", Self::OUT_WIRED_HEADPHONE),
        ("AUDIO_DEVICE_OUT_BLUETOOTH_SCO", Self::OUT_BLUETOOTH_SCO),
        ("AUDIO_DEVICE_OUT_BLUETOOTH_A2DP", Self::OUT_BLUETOOTH_A2DP),
        ("AUDIO_DEVICE_OUT_HDMI", Self::OUT_HDMI),
        ("AUDIO_DEVICE_OUT_USB_DEVICE", Self::OUT_USB_DEVICE),
        ("AUDIO_DEVICE_OUT_REMOTE_SUBMIX", Self::OUT_REMOTE_SUBMIX),
        ("AUDIO_DEVICE_OUT_TELEPHONY_TX", Self::OUT_TELEPHONY_TX),
        ("AUDIO_DEVICE_OUT_BUS", Self::OUT_BUS),
        ("AUDIO_DEVICE_IN_BUILTIN_MIC", Self::IN_BUILTIN_MIC),
        ("AUDIO_DEVICE_IN_WIRED_HEADSET", Self::IN_WIRED_HEADSET),
        ("AUDIO_DEVICE_IN_TELEPHONY_RX", Self::IN_TELEPHONY_RX),
        ("AUDIO_DEVICE_IN_BACK_MIC", Self::IN_BACK_MIC),
        ("AUDIO_DEVICE_IN_REMOTE_SUBMIX", Self::IN_REMOTE_SUBMIX),
        ("AUDIO_DEVICE_IN_BUS", Self::IN_BUS),
    ];

    /// Creates a device type from its raw mask value.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw mask value.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true for input device types.
    pub const fn is_input(self) -> bool {
        self.0 & Self::BIT_IN != 0
    }

    /// Parses a `type` attribute token such as `AUDIO_DEVICE_OUT_SPEAKER`.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::TOKENS
            .iter()
            .find(|(name, _)| *name == token)
            .map(|(_, device_type)| *device_type)
    }

    /// Returns the configuration token for known types.
    pub fn token(self) -> Option<&'static str> {
        Self::TOKENS
            .iter()
            .find(|(_, device_type)| *device_type == self)
            .map(|(name, _)| *name)
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.token() {
            Some(token) => f.write_str(token),
            None => write!(f, "{:#010x}", self.0),
        }
    }
}

/// Port id assigned by the audio service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(pub u32);

impl std::fmt::Display for PortId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "port#{}", self.0)
    }
}

/// Stream io handle identifying the mix a stream plays through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IoHandle(pub i32);

impl std::fmt::Display for IoHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "io#{}", self.0)
    }
}

/// A port known to the audio service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPort {
    /// Service-assigned id.
    pub id: PortId,
    /// Source or sink.
    pub role: PortRole,
    /// Device, mix or session.
    pub port_type: PortType,
    /// Device type for device ports.
    pub device_type: Option<DeviceType>,
    /// Human readable name.
    pub name: String,
}

impl AudioPort {
    /// Creates a device port.
    pub fn device(
        id: PortId,
        role: PortRole,
        device_type: DeviceType,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            role,
            port_type: PortType::Device,
            device_type: Some(device_type),
            name: name.into(),
        }
    }

    /// Returns true if this port matches the lookup attributes.
    pub fn matches(&self, role: PortRole, port_type: PortType, device_type: DeviceType) -> bool {
        self.role == role && self.port_type == port_type && self.device_type == Some(device_type)
    }
}

/// The endpoint a patch entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortEndpoint {
    /// A software mix, identified by its stream io handle.
    Mix {
        /// The mix's io handle.
        handle: IoHandle,
    },
    /// A device port.
    Device {
        /// Service-assigned device port id.
        id: PortId,
        /// The device's type.
        device_type: DeviceType,
    },
}

/// One source or sink entry of a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortConfig {
    /// What the entry connects.
    pub endpoint: PortEndpoint,
    /// Output flags active on this entry.
    pub flags: OutputFlags,
}

impl PortConfig {
    /// Creates a mix entry.
    pub fn mix(handle: IoHandle, flags: OutputFlags) -> Self {
        Self {
            endpoint: PortEndpoint::Mix { handle },
            flags,
        }
    }

    /// Creates a device entry.
    pub fn device(id: PortId, device_type: DeviceType) -> Self {
        Self {
            endpoint: PortEndpoint::Device { id, device_type },
            flags: OutputFlags::NONE,
        }
    }

    /// Returns the io handle if this entry is a mix.
    pub fn mix_handle(&self) -> Option<IoHandle> {
        match self.endpoint {
            PortEndpoint::Mix { handle } => Some(handle),
            PortEndpoint::Device { .. } => None,
        }
    }

    /// Returns the device port id if this entry is a device.
    pub fn device_id(&self) -> Option<PortId> {
        match self.endpoint {
            PortEndpoint::Device { id, .. } => Some(id),
            PortEndpoint::Mix { .. } => None,
        }
    }

    /// Returns true if `flag` is active on this entry.
    pub fn has_flag(&self, flag: OutputFlag) -> bool {
        self.flags.contains(flag)
    }
}

/// A hardware patch: which sources are currently connected to which sinks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedPatch {
    /// Source entries.
    pub sources: Vec<PortConfig>,
    /// Sink entries.
    pub sinks: Vec<PortConfig>,
}

impl ObservedPatch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source entry.
    #[must_use]
    pub fn with_source(mut self, source: PortConfig) -> Self {
        self.sources.push(source);
        self
    }

    /// Adds a sink entry.
    #[must_use]
    pub fn with_sink(mut self, sink: PortConfig) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Returns the first mix source playing through `handle`.
    pub fn mix_source(&self, handle: IoHandle) -> Option<&PortConfig> {
        self.sources
            .iter()
            .find(|source| source.mix_handle() == Some(handle))
    }

    /// Returns true if any sink entry is the device `id`.
    pub fn has_sink_device(&self, id: PortId) -> bool {
        self.sinks.iter().any(|sink| sink.device_id() == Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_role_from_attribute() {
        assert_eq!(PortRole::from_attribute("source"), Some(PortRole::Source));
        assert_eq!(PortRole::from_attribute("sink"), Some(PortRole::Sink));
        assert_eq!(PortRole::from_attribute(""), None);
        assert_eq!(PortRole::from_attribute("Source"), None);
    }

    #[test]
    fn test_device_type_tokens() {
        assert_eq!(
            DeviceType::from_token("AUDIO_DEVICE_IN_REMOTE_SUBMIX"),
            Some(DeviceType::IN_REMOTE_SUBMIX)
        );
        assert!(DeviceType::IN_REMOTE_SUBMIX.is_input());
        assert!(!DeviceType::OUT_REMOTE_SUBMIX.is_input());
        assert_eq!(DeviceType::from_token("AUDIO_DEVICE_OUT_FM"), None);
    }

    #[test]
    fn test_device_type_display() {
        assert_eq!(DeviceType::OUT_SPEAKER.to_string(), "AUDIO_DEVICE_OUT_SPEAKER");
        assert_eq!(DeviceType::from_bits(0x20).to_string(), "0x00000020");
    }

    #[test]
    fn test_patch_mix_source_lookup() {
        let patch = ObservedPatch::new()
            .with_source(PortConfig::mix(IoHandle(3), OutputFlags::NONE))
            .with_source(PortConfig::mix(IoHandle(7), OutputFlag::Fast.into()))
            .with_sink(PortConfig::device(PortId(42), DeviceType::OUT_SPEAKER));

        let source = patch.mix_source(IoHandle(7)).unwrap();
        assert!(source.has_flag(OutputFlag::Fast));
        assert!(patch.mix_source(IoHandle(8)).is_none());
        assert!(patch.has_sink_device(PortId(42)));
        assert!(!patch.has_sink_device(PortId(41)));
    }

    #[test]
    fn test_audio_port_matches() {
        let port = AudioPort::device(
            PortId(12),
            PortRole::Source,
            DeviceType::IN_REMOTE_SUBMIX,
            "Remote Submix In",
        );
        assert!(port.matches(PortRole::Source, PortType::Device, DeviceType::IN_REMOTE_SUBMIX));
        assert!(!port.matches(PortRole::Sink, PortType::Device, DeviceType::IN_REMOTE_SUBMIX));
    }
}

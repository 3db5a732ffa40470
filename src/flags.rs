//! Output flags, stream attributes and input sources.
//!
//! Flags appear in two forms: as string tokens in the policy configuration
//! (`AUDIO_OUTPUT_FLAG_FAST|AUDIO_OUTPUT_FLAG_PRIMARY`) and as bits in the
//! masks reported by the audio service. [`OutputFlag`] ties the two together.

use std::ops::BitOr;

/// A single output flag a playback stream can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFlag {
    /// Direct output to the hardware, no software mixing.
    Direct,
    /// The primary output of the device.
    Primary,
    /// Low latency output.
    Fast,
    /// Large buffers for power-efficient playback.
    DeepBuffer,
    /// Compressed data offloaded to the hardware decoder.
    CompressOffload,
    /// Non-blocking writes.
    NonBlocking,
    /// Hardware A/V sync.
    HwAvSync,
    /// Text-to-speech output.
    Tts,
    /// Raw output without effects.
    Raw,
    /// Synchronised with other outputs.
    Sync,
    /// IEC958 non-audio data.
    Iec958NonAudio,
    /// Direct PCM output.
    DirectPcm,
    /// Memory-mapped output without IRQ.
    MmapNoIrq,
    /// VoIP playback.
    VoipRx,
    /// Music injected into a voice call.
    IncallMusic,
    /// Gapless offload playback.
    GaplessOffload,
    /// Spatializer output.
    Spatializer,
    /// Ultrasound output.
    Ultrasound,
    /// Bit-perfect output.
    BitPerfect,
}

impl OutputFlag {
    /// Every known flag, in bit order.
    pub const ALL: [OutputFlag; 19] = [
        Self::Direct,
        Self::Primary,
        Self::Fast,
        Self::DeepBuffer,
        Self::CompressOffload,
        Self::NonBlocking,
        Self::HwAvSync,
        Self::Tts,
        Self::Raw,
        Self::Sync,
        Self::Iec958NonAudio,
        Self::DirectPcm,
        Self::MmapNoIrq,
        Self::VoipRx,
        Self::IncallMusic,
        Self::GaplessOffload,
        Self::Spatializer,
        Self::Ultrasound,
        Self::BitPerfect,
    ];

    /// The flags exercised by a performance-mode check.
    pub const PERFORMANCE_MODES: [OutputFlag; 2] = [Self::Fast, Self::DeepBuffer];

    /// Returns the token used for this flag in policy configuration files.
    pub fn canonical_name(self) -> &'static str {
        match self {
            Self::Direct => "AUDIO_OUTPUT_FLAG_DIRECT",
            Self::Primary => "AUDIO_OUTPUT_FLAG_PRIMARY",
            Self::Fast => "AUDIO_OUTPUT_FLAG_FAST",
            Self::DeepBuffer => "AUDIO_OUTPUT_FLAG_DEEP_BUFFER",
            Self::CompressOffload => "AUDIO_OUTPUT_FLAG_COMPRESS_OFFLOAD",
            Self::NonBlocking => "AUDIO_OUTPUT_FLAG_NON_BLOCKING",
            Self::HwAvSync => "AUDIO_OUTPUT_FLAG_HW_AV_SYNC",
            Self::Tts => "AUDIO_OUTPUT_FLAG_TTS",
            Self::Raw => "AUDIO_OUTPUT_FLAG_RAW",
            Self::Sync => "AUDIO_OUTPUT_FLAG_SYNC",
            Self::Iec958NonAudio => "AUDIO_OUTPUT_FLAG_IEC958_NONAUDIO",
            Self::DirectPcm => "AUDIO_OUTPUT_FLAG_DIRECT_PCM",
            Self::MmapNoIrq => "AUDIO_OUTPUT_FLAG_MMAP_NOIRQ",
            Self::VoipRx => "AUDIO_OUTPUT_FLAG_VOIP_RX",
            Self::IncallMusic => "AUDIO_OUTPUT_FLAG_INCALL_MUSIC",
            Self::GaplessOffload => "AUDIO_OUTPUT_FLAG_GAPLESS_OFFLOAD",
            Self::Spatializer => "AUDIO_OUTPUT_FLAG_SPATIALIZER",
            Self::Ultrasound => "AUDIO_OUTPUT_FLAG_ULTRASOUND",
            Self::BitPerfect => "AUDIO_OUTPUT_FLAG_BIT_PERFECT",
        }
    }

    /// Returns the bit this flag occupies in an output flag mask.
    pub fn bit(self) -> u32 {
        match self {
            Self::Direct => 0x1,
            Self::Primary => 0x2,
            Self::Fast => 0x4,
            Self::DeepBuffer => 0x8,
            Self::CompressOffload => 0x10,
            Self::NonBlocking => 0x20,
            Self::HwAvSync => 0x40,
            Self::Tts => 0x80,
            Self::Raw => 0x100,
            Self::Sync => 0x200,
            Self::Iec958NonAudio => 0x400,
            Self::DirectPcm => 0x2000,
            Self::MmapNoIrq => 0x4000,
            Self::VoipRx => 0x8000,
            Self::IncallMusic => 0x1_0000,
            Self::GaplessOffload => 0x2_0000,
            Self::Spatializer => 0x4_0000,
            Self::Ultrasound => 0x8_0000,
            Self::BitPerfect => 0x10_0000,
        }
    }

    /// Parses a configuration token. Matching is exact; surrounding
    /// whitespace is ignored.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL
            .into_iter()
            .find(|flag| flag.canonical_name() == token)
    }

    /// Returns the attribute flag a stream sets to ask for this output flag,
    /// if the output flag can be requested through attributes.
    pub fn attribute_flag(self) -> Option<AttributeFlags> {
        match self {
            Self::Fast => Some(AttributeFlags::LOW_LATENCY),
            Self::DeepBuffer => Some(AttributeFlags::DEEP_BUFFER),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutputFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// A mask of output flags as reported by the audio service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OutputFlags(u32);

impl OutputFlags {
    /// No flags set.
    pub const NONE: OutputFlags = OutputFlags(0);

    /// Creates a mask from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if `flag`'s bit is set.
    pub fn contains(self, flag: OutputFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    /// Returns true if no bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns this mask with `flag` added.
    #[must_use]
    pub fn with(self, flag: OutputFlag) -> Self {
        Self(self.0 | flag.bit())
    }

    /// Iterates the known flags set in this mask.
    pub fn iter(self) -> impl Iterator<Item = OutputFlag> {
        OutputFlag::ALL
            .into_iter()
            .filter(move |flag| self.contains(*flag))
    }
}

impl From<OutputFlag> for OutputFlags {
    fn from(flag: OutputFlag) -> Self {
        Self(flag.bit())
    }
}

impl FromIterator<OutputFlag> for OutputFlags {
    fn from_iter<I: IntoIterator<Item = OutputFlag>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, Self::with)
    }
}

impl BitOr for OutputFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::fmt::Display for OutputFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return f.write_str("AUDIO_OUTPUT_FLAG_NONE");
        }
        let mut first = true;
        for flag in self.iter() {
            if !first {
                f.write_str("|")?;
            }
            f.write_str(flag.canonical_name())?;
            first = false;
        }
        Ok(())
    }
}

/// Attribute flags carried by a stream's [`AudioAttributes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AttributeFlags(u32);

impl AttributeFlags {
    /// No flags set.
    pub const NONE: AttributeFlags = AttributeFlags(0);
    /// Request a low latency path.
    pub const LOW_LATENCY: AttributeFlags = AttributeFlags(0x100);
    /// Request a deep buffer path.
    pub const DEEP_BUFFER: AttributeFlags = AttributeFlags(0x200);

    /// Returns the raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every bit of `other` is set in `self`.
    pub const fn contains(self, other: AttributeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the output flags the service grants for these attribute flags.
    pub fn implied_output_flags(self) -> OutputFlags {
        let mut flags = OutputFlags::NONE;
        if self.contains(Self::LOW_LATENCY) {
            flags = flags.with(OutputFlag::Fast);
        }
        if self.contains(Self::DEEP_BUFFER) {
            flags = flags.with(OutputFlag::DeepBuffer);
        }
        flags
    }
}

impl BitOr for AttributeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Why a stream is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Usage {
    /// Not specified.
    #[default]
    Unknown,
    /// Music, movies, podcasts.
    Media,
    /// Voice or video calls.
    VoiceCommunication,
    /// Alarms.
    Alarm,
    /// Notifications.
    Notification,
    /// Game audio.
    Game,
}

/// What a stream is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    /// Not specified.
    #[default]
    Unknown,
    /// Spoken content.
    Speech,
    /// Music.
    Music,
    /// Movie or video soundtrack.
    Movie,
    /// UI sounds and tones.
    Sonification,
}

/// Usage, content type and flags describing a stream's intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioAttributes {
    /// Why the stream plays.
    pub usage: Usage,
    /// What the stream plays.
    pub content_type: ContentType,
    /// Routing hints.
    pub flags: AttributeFlags,
}

impl AudioAttributes {
    /// Media/music attributes requesting `flag` through the attribute flags.
    ///
    /// Flags with no attribute equivalent leave the attribute flags empty.
    pub fn media_for(flag: OutputFlag) -> Self {
        Self {
            usage: Usage::Media,
            content_type: ContentType::Music,
            flags: flag.attribute_flag().unwrap_or(AttributeFlags::NONE),
        }
    }
}

/// Where a capture stream records from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSource {
    /// Platform default source.
    Default,
    /// Microphone.
    Mic,
    /// Voice communication, with echo cancellation.
    VoiceCommunication,
    /// Unprocessed microphone signal.
    Unprocessed,
    /// The remote submix virtual device.
    RemoteSubmix,
}

impl InputSource {
    /// Returns the device-name tag attached devices carry for this source.
    pub fn device_tag(self) -> &'static str {
        match self {
            Self::Default | Self::Mic | Self::VoiceCommunication | Self::Unprocessed => {
                "Built-In Mic"
            }
            Self::RemoteSubmix => "Remote Submix",
        }
    }
}

impl std::fmt::Display for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Default => "AUDIO_SOURCE_DEFAULT",
            Self::Mic => "AUDIO_SOURCE_MIC",
            Self::VoiceCommunication => "AUDIO_SOURCE_VOICE_COMMUNICATION",
            Self::Unprocessed => "AUDIO_SOURCE_UNPROCESSED",
            Self::RemoteSubmix => "AUDIO_SOURCE_REMOTE_SUBMIX",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_token_exact() {
        assert_eq!(
            OutputFlag::from_token("AUDIO_OUTPUT_FLAG_FAST"),
            Some(OutputFlag::Fast)
        );
        assert_eq!(
            OutputFlag::from_token(" AUDIO_OUTPUT_FLAG_DEEP_BUFFER "),
            Some(OutputFlag::DeepBuffer)
        );
        assert_eq!(OutputFlag::from_token("AUDIO_OUTPUT_FLAG"), None);
        assert_eq!(OutputFlag::from_token("AUDIO_OUTPUT_FLAG_DIRECT_PC"), None);
    }

    #[test]
    fn test_tokens_round_trip() {
        for flag in OutputFlag::ALL {
            assert_eq!(OutputFlag::from_token(flag.canonical_name()), Some(flag));
        }
    }

    #[test]
    fn test_bits_are_distinct() {
        let all: OutputFlags = OutputFlag::ALL.into_iter().collect();
        assert_eq!(all.iter().count(), OutputFlag::ALL.len());
    }

    #[test]
    fn test_output_flags_contains() {
        let flags = OutputFlags::from(OutputFlag::Fast).with(OutputFlag::Primary);
        assert!(flags.contains(OutputFlag::Fast));
        assert!(flags.contains(OutputFlag::Primary));
        assert!(!flags.contains(OutputFlag::DeepBuffer));
        assert_eq!(flags.bits(), 0x6);
    }

    #[test]
    fn test_output_flags_display() {
        let flags = OutputFlags::from(OutputFlag::Primary).with(OutputFlag::Fast);
        assert_eq!(
            flags.to_string(),
            "AUDIO_OUTPUT_FLAG_PRIMARY|AUDIO_OUTPUT_FLAG_FAST"
        );
        assert_eq!(OutputFlags::NONE.to_string(), "AUDIO_OUTPUT_FLAG_NONE");
    }

    #[test]
    fn test_attribute_flags_imply_output_flags() {
        let implied = AttributeFlags::LOW_LATENCY.implied_output_flags();
        assert!(implied.contains(OutputFlag::Fast));
        assert!(!implied.contains(OutputFlag::DeepBuffer));

        assert!(AttributeFlags::NONE.implied_output_flags().is_empty());
    }

    #[test]
    fn test_media_attributes_for_flag() {
        let attributes = AudioAttributes::media_for(OutputFlag::DeepBuffer);
        assert_eq!(attributes.usage, Usage::Media);
        assert_eq!(attributes.content_type, ContentType::Music);
        assert_eq!(attributes.flags, AttributeFlags::DEEP_BUFFER);

        let plain = AudioAttributes::media_for(OutputFlag::Direct);
        assert_eq!(plain.flags, AttributeFlags::NONE);
    }

    #[test]
    fn test_input_source_device_tag() {
        assert_eq!(InputSource::RemoteSubmix.device_tag(), "Remote Submix");
        assert_eq!(InputSource::Mic.device_tag(), "Built-In Mic");
    }
}

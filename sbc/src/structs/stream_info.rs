//! Stream configuration carried by every frame header.
//!
//! A [`StreamInfo`] fixes the channel mode, sampling frequency, allocation
//! method, block and sub-band counts and the bitpool. Everything else about a
//! frame (its byte length, the PCM it expands to, the bit rate) derives from it.

use std::fmt::Display;

use crate::utils::errors::ParameterError;
use crate::utils::tables::SAMPLING_FREQUENCIES;

/// Largest bitpool representable in a frame header.
pub const MAX_BITPOOL: u8 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelMode {
    Mono = 0,
    DualChannel = 1,
    Stereo = 2,
    JointStereo = 3,
}

impl ChannelMode {
    pub const fn channels(self) -> usize {
        match self {
            ChannelMode::Mono => 1,
            _ => 2,
        }
    }

    /// Mono and dual channel frames allocate each channel independently.
    pub const fn is_independent(self) -> bool {
        matches!(self, ChannelMode::Mono | ChannelMode::DualChannel)
    }
}

impl TryFrom<u8> for ChannelMode {
    type Error = ParameterError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => ChannelMode::Mono,
            1 => ChannelMode::DualChannel,
            2 => ChannelMode::Stereo,
            3 => ChannelMode::JointStereo,
            _ => return Err(ParameterError::ChannelMode(value)),
        })
    }
}

impl Display for ChannelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelMode::Mono => write!(f, "Mono"),
            ChannelMode::DualChannel => write!(f, "Dual channel"),
            ChannelMode::Stereo => write!(f, "Stereo"),
            ChannelMode::JointStereo => write!(f, "Joint stereo"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocationMethod {
    Loudness = 0,
    Snr = 1,
}

impl TryFrom<u8> for AllocationMethod {
    type Error = ParameterError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AllocationMethod::Loudness),
            1 => Ok(AllocationMethod::Snr),
            _ => Err(ParameterError::AllocationMethod(value)),
        }
    }
}

impl Display for AllocationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationMethod::Loudness => write!(f, "Loudness"),
            AllocationMethod::Snr => write!(f, "SNR"),
        }
    }
}

/// Stream parameters shared by the encoder, the decoder and the frame codec.
///
/// The fields are public so callers can describe a stream directly; every
/// codec entry point runs [`StreamInfo::validate`] before trusting them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamInfo {
    pub channel_mode: ChannelMode,
    /// Index into 16, 32, 44.1 and 48 kHz.
    pub sample_rate_index: u8,
    pub allocation: AllocationMethod,
    /// 4, 8, 12 or 16.
    pub blocks: u8,
    /// 4 or 8.
    pub subbands: u8,
    pub bitpool: u8,
}

impl Default for StreamInfo {
    fn default() -> Self {
        Self {
            channel_mode: ChannelMode::JointStereo,
            sample_rate_index: 2,
            allocation: AllocationMethod::Loudness,
            blocks: 16,
            subbands: 8,
            bitpool: 53,
        }
    }
}

impl StreamInfo {
    /// Builds a descriptor from raw field values, validating each of them.
    pub fn from_raw(
        channel_mode: u8,
        sample_rate_index: u8,
        allocation: u8,
        blocks: u8,
        subbands: u8,
        bitpool: u8,
    ) -> Result<Self, ParameterError> {
        let info = Self {
            channel_mode: ChannelMode::try_from(channel_mode)?,
            sample_rate_index,
            allocation: AllocationMethod::try_from(allocation)?,
            blocks,
            subbands,
            bitpool,
        };
        info.validate()?;

        Ok(info)
    }

    /// Maps a sampling frequency in Hz to its rate index.
    pub fn sample_rate_index_of(sampling_frequency: u32) -> Result<u8, ParameterError> {
        SAMPLING_FREQUENCIES
            .iter()
            .position(|&fs| fs == sampling_frequency)
            .map(|i| i as u8)
            .ok_or(ParameterError::SamplingFrequency(sampling_frequency))
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.sample_rate_index > 3 {
            return Err(ParameterError::SampleRate(self.sample_rate_index));
        }
        if !matches!(self.blocks, 4 | 8 | 12 | 16) {
            return Err(ParameterError::Blocks(self.blocks));
        }
        if !matches!(self.subbands, 4 | 8) {
            return Err(ParameterError::Subbands(self.subbands));
        }
        let max = self.max_bitpool();
        if self.bitpool == 0 || self.bitpool > max {
            return Err(ParameterError::Bitpool {
                bitpool: self.bitpool,
                max,
            });
        }

        Ok(())
    }

    /// Upper bound of the bitpool for this channel mode and sub-band count.
    ///
    /// The allocator can place at most 16 bits per sub-band, so a larger
    /// bitpool could never be consumed.
    pub fn max_bitpool(&self) -> u8 {
        let per_subband = if self.channel_mode.is_independent() { 16 } else { 32 };
        (per_subband * self.subbands as usize).min(MAX_BITPOOL as usize) as u8
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channel_mode.channels()
    }

    #[inline]
    pub fn subband_count(&self) -> usize {
        self.subbands as usize
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks as usize
    }

    pub fn sampling_frequency(&self) -> u32 {
        SAMPLING_FREQUENCIES[(self.sample_rate_index & 3) as usize]
    }

    /// PCM samples per channel carried by one frame.
    pub fn samples_per_frame(&self) -> usize {
        self.block_count() * self.subband_count()
    }

    /// Interleaved 16-bit PCM bytes produced or consumed by one frame.
    pub fn pcm_bytes_per_frame(&self) -> usize {
        self.samples_per_frame() * self.channels() * 2
    }

    /// Bits used by the joint-stereo bitmap.
    pub fn join_bits(&self) -> usize {
        if self.channel_mode == ChannelMode::JointStereo {
            self.subband_count()
        } else {
            0
        }
    }

    /// Bits from the start of the frame through the last scale factor.
    pub fn side_info_bits(&self) -> usize {
        32 + self.join_bits() + 4 * self.channels() * self.subband_count()
    }

    /// Bits occupied by the quantized sample codes and, for stereo modes, the
    /// joint bitmap.
    pub fn payload_bits(&self) -> usize {
        let blocks = self.block_count();
        let bitpool = self.bitpool as usize;
        if self.channel_mode.is_independent() {
            blocks * self.channels() * bitpool
        } else {
            self.join_bits() + blocks * bitpool
        }
    }

    /// Length in bytes of every frame of this stream.
    pub fn frame_length(&self) -> usize {
        4 + (4 * self.subband_count() * self.channels()) / 8 + self.payload_bits().div_ceil(8)
    }

    /// Encoded bit rate in bits per second.
    pub fn bit_rate(&self) -> u32 {
        let bits = 8 * self.frame_length() as u64 * self.sampling_frequency() as u64;
        (bits / self.samples_per_frame() as u64) as u32
    }
}

impl Display for StreamInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} Hz, {}, {} sub-bands, {} blocks, {} allocation, bitpool {}",
            self.sampling_frequency(),
            self.channel_mode,
            self.subbands,
            self.blocks,
            self.allocation,
            self.bitpool
        )
    }
}

//! Frame header, joint-stereo bitmap and scale factors.
//!
//! ## Layout
//!
//! | Bits | Field |
//! |---|---|
//! | 8 | sync word `0x9C` |
//! | 2 | sample rate index |
//! | 2 | block count code (4, 8, 12, 16) |
//! | 2 | channel mode |
//! | 1 | allocation method |
//! | 1 | sub-band count flag (4, 8) |
//! | 8 | bitpool |
//! | 8 | CRC-8 |
//! | M | joint flags (joint stereo only, last flag always 0) |
//! | 4 × channels × M | scale factors |
//!
//! The quantized sample codes follow immediately, without byte alignment.

use std::io;

use log::trace;

use crate::structs::allocation::{BitAllocation, ScaleFactors};
use crate::structs::stream_info::{AllocationMethod, ChannelMode, StreamInfo};
use crate::utils::bitstream_io::{BitstreamIoWriter, BsIoSliceReader};
use crate::utils::crc::FRAME_CRC;
use crate::utils::errors::{HeaderError, SbcError};

pub const SYNC_WORD: u8 = 0x9c;
pub const HEADER_LEN: usize = 4;

pub const MAX_BLOCKS: usize = 16;
pub const MAX_CHANNELS: usize = 2;
pub const MAX_SUBBANDS: usize = 8;

/// Sub-band samples of one frame, indexed by `[block][channel][subband]`.
pub type SubbandMatrix<S> = [[[S; MAX_SUBBANDS]; MAX_CHANNELS]; MAX_BLOCKS];

/// Packs the fields of byte 1 of the header.
pub fn header_flags(info: &StreamInfo) -> u8 {
    ((info.sample_rate_index & 3) << 6)
        | ((info.blocks / 4 - 1) << 4)
        | ((info.channel_mode as u8) << 2)
        | ((info.allocation as u8) << 1)
        | u8::from(info.subbands == 8)
}

/// Parses the first four bytes of a frame.
///
/// Every bit pattern of byte 1 names a valid configuration, so the only
/// header field that can be rejected is the bitpool.
pub fn parse_header(bytes: &[u8]) -> Result<StreamInfo, SbcError> {
    if bytes.len() < HEADER_LEN {
        return Err(HeaderError::Truncated(bytes.len()).into());
    }
    if bytes[0] != SYNC_WORD {
        return Err(HeaderError::SyncWord(bytes[0]).into());
    }

    let flags = bytes[1];
    let info = StreamInfo {
        channel_mode: ChannelMode::try_from((flags >> 2) & 3)?,
        sample_rate_index: flags >> 6,
        allocation: AllocationMethod::try_from((flags >> 1) & 1)?,
        blocks: (((flags >> 4) & 3) + 1) * 4,
        subbands: if flags & 1 == 0 { 4 } else { 8 },
        bitpool: bytes[2],
    };

    let max = info.max_bitpool();
    if info.bitpool == 0 || info.bitpool > max {
        return Err(HeaderError::Bitpool {
            bitpool: info.bitpool,
            max,
        }
        .into());
    }

    trace!("Frame header: {info}");

    Ok(info)
}

/// Per-frame scratch state: scale factors, allocation, joint flags and samples.
#[derive(Debug, Clone)]
pub struct FrameState<S> {
    pub scale_factors: ScaleFactors,
    pub bits: BitAllocation,
    pub join: [bool; MAX_SUBBANDS],
    pub samples: SubbandMatrix<S>,
}

impl<S: Copy + Default> Default for FrameState<S> {
    fn default() -> Self {
        Self {
            scale_factors: [[0; MAX_SUBBANDS]; MAX_CHANNELS],
            bits: [[0; MAX_SUBBANDS]; MAX_CHANNELS],
            join: [false; MAX_SUBBANDS],
            samples: [[[S::default(); MAX_SUBBANDS]; MAX_CHANNELS]; MAX_BLOCKS],
        }
    }
}

impl<S> FrameState<S> {
    /// Writes the header with a zero CRC placeholder, the joint bitmap and the
    /// scale factors.
    pub fn write_side_info(
        &self,
        info: &StreamInfo,
        writer: &mut BitstreamIoWriter,
    ) -> io::Result<()> {
        writer.put_n(8, SYNC_WORD)?;
        writer.put_n(8, header_flags(info))?;
        writer.put_n(8, info.bitpool)?;
        writer.put_n(8, 0u8)?;

        let subbands = info.subband_count();
        if info.channel_mode == ChannelMode::JointStereo {
            for sb in 0..subbands {
                writer.put(sb + 1 < subbands && self.join[sb])?;
            }
        }

        for ch in 0..info.channels() {
            for &scale_factor in &self.scale_factors[ch][..subbands] {
                writer.put_n(4, scale_factor)?;
            }
        }

        Ok(())
    }

    /// Reads the joint bitmap and scale factors that follow the 4-byte header.
    /// Leaves `reader` positioned at the first sample code.
    pub fn read_side_info(
        &mut self,
        info: &StreamInfo,
        reader: &mut BsIoSliceReader,
    ) -> io::Result<()> {
        let subbands = info.subband_count();
        let position = reader.position()?;
        reader.skip_n((HEADER_LEN as u64 * 8).saturating_sub(position) as u32)?;

        self.join = [false; MAX_SUBBANDS];
        if info.channel_mode == ChannelMode::JointStereo {
            for sb in 0..subbands {
                let flag = reader.get()?;
                self.join[sb] = flag && sb + 1 < subbands;
            }
        }

        for ch in 0..info.channels() {
            for sb in 0..subbands {
                self.scale_factors[ch][sb] = reader.get_n(4)?;
            }
        }

        Ok(())
    }
}

/// Computes the frame check sequence over bytes 1 and 2, the joint bitmap and
/// the scale factors. `frame` must hold at least the side information.
pub fn frame_checksum(frame: &[u8], info: &StreamInfo) -> io::Result<u8> {
    let crc = &FRAME_CRC;
    let mut reader = BsIoSliceReader::from_slice(frame);

    let checksum = reader.crc8_check(crc, crc.init, 8, 16)?;
    let covered = (info.side_info_bits() - HEADER_LEN * 8) as u64;
    reader.crc8_check(crc, checksum, HEADER_LEN as u64 * 8, covered)
}

/// Bytes that must be available before the CRC of a frame can be checked.
pub fn side_info_len(info: &StreamInfo) -> usize {
    info.side_info_bits().div_ceil(8)
}

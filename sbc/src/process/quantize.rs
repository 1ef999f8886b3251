//! Scale factors, the joint-stereo pre-pass and sample code packing.

use std::io;

use crate::structs::frame::{FrameState, MAX_BLOCKS};
use crate::structs::stream_info::{ChannelMode, StreamInfo};
use crate::utils::bitstream_io::{BitstreamIoWriter, BsIoSliceReader};
use crate::utils::numeric::{Backend, scale_factor_index};

fn scale_factor_of<B: Backend>(samples: impl Iterator<Item = B::Sample>) -> u8 {
    scale_factor_index(samples.fold(0, |acc, s| acc | B::magnitude(s)))
}

/// Picks, per channel and sub-band, the smallest scale factor whose range
/// covers every sample of the frame.
pub fn compute_scale_factors<B: Backend>(info: &StreamInfo, state: &mut FrameState<B::Sample>) {
    let blocks = &state.samples[..info.block_count()];

    for ch in 0..info.channels() {
        for sb in 0..info.subband_count() {
            state.scale_factors[ch][sb] =
                scale_factor_of::<B>(blocks.iter().map(|block| block[ch][sb]));
        }
    }
}

/// Replaces left/right pairs by half-sum and half-difference wherever that
/// lowers the combined scale factor. The last sub-band is always coded as L/R.
pub fn joint_prepass<B: Backend>(info: &StreamInfo, state: &mut FrameState<B::Sample>) {
    let blocks = info.block_count();
    let subbands = info.subband_count();

    state.join = Default::default();
    if info.channel_mode != ChannelMode::JointStereo {
        return;
    }

    for sb in 0..subbands - 1 {
        let mut mid = [B::Sample::default(); MAX_BLOCKS];
        let mut side = [B::Sample::default(); MAX_BLOCKS];
        for (blk, block) in state.samples[..blocks].iter().enumerate() {
            let left = B::halve(block[0][sb]);
            let right = B::halve(block[1][sb]);
            mid[blk] = left + right;
            side[blk] = left - right;
        }

        let sf_mid = scale_factor_of::<B>(mid[..blocks].iter().copied());
        let sf_side = scale_factor_of::<B>(side[..blocks].iter().copied());
        let independent = state.scale_factors[0][sb] + state.scale_factors[1][sb];

        if sf_mid + sf_side < independent {
            state.join[sb] = true;
            state.scale_factors[0][sb] = sf_mid;
            state.scale_factors[1][sb] = sf_side;
            for (blk, block) in state.samples[..blocks].iter_mut().enumerate() {
                block[0][sb] = mid[blk];
                block[1][sb] = side[blk];
            }
        }
    }
}

/// Restores left/right from the joint-coded sub-bands of a decoded frame.
pub fn unmix_joint<B: Backend>(info: &StreamInfo, state: &mut FrameState<B::Sample>) {
    if info.channel_mode != ChannelMode::JointStereo {
        return;
    }

    let subbands = info.subband_count();
    for block in state.samples[..info.block_count()].iter_mut() {
        for sb in (0..subbands).filter(|&sb| state.join[sb]) {
            let (mid, side) = (block[0][sb], block[1][sb]);
            block[0][sb] = mid + side;
            block[1][sb] = mid - side;
        }
    }
}

/// Quantizes the sample matrix and appends the codes, block by block, channel
/// by channel, sub-band by sub-band.
pub fn pack_samples<B: Backend>(
    info: &StreamInfo,
    state: &FrameState<B::Sample>,
    writer: &mut BitstreamIoWriter,
) -> io::Result<()> {
    let subbands = info.subband_count();

    for block in &state.samples[..info.block_count()] {
        for ch in 0..info.channels() {
            for sb in 0..subbands {
                let bits = state.bits[ch][sb];
                let code = B::quantize(block[ch][sb], state.scale_factors[ch][sb], bits);
                writer.put_n(bits as u32, code)?;
            }
        }
    }

    Ok(())
}

/// Reads and dequantizes the sample codes that follow the scale factors.
pub fn unpack_samples<B: Backend>(
    info: &StreamInfo,
    state: &mut FrameState<B::Sample>,
    reader: &mut BsIoSliceReader,
) -> io::Result<()> {
    let subbands = info.subband_count();
    let channels = info.channels();
    let FrameState {
        scale_factors,
        bits,
        samples,
        ..
    } = state;

    for block in samples[..info.block_count()].iter_mut() {
        for ch in 0..channels {
            for sb in 0..subbands {
                let width = bits[ch][sb];
                let code: u16 = if width == 0 {
                    0
                } else {
                    reader.get_n(width as u32)?
                };
                block[ch][sb] = B::dequantize(code, scale_factors[ch][sb], width);
            }
        }
    }

    Ok(())
}

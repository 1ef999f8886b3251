//! Bit allocation.
//!
//! Distributes the bitpool over the sub-bands of one block. The bit need of a
//! sub-band comes from its scale factor (SNR) or from the scale factor biased by
//! a per-rate loudness offset (Loudness). Bits are then handed out slice by slice
//! from the neediest sub-band down, and whatever the slicing cannot place exactly
//! is distributed in two round-robin passes.
//!
//! The order of the round-robin passes is part of the bitstream: mono walks the
//! sub-bands in order, stereo walks them sub-band-major with channel 0 before
//! channel 1, checking the budget between the two.

use crate::structs::frame::{MAX_CHANNELS, MAX_SUBBANDS};
use crate::structs::stream_info::{AllocationMethod, ChannelMode, StreamInfo};
use crate::utils::tables::{LOUDNESS_OFFSET_4, LOUDNESS_OFFSET_8};

pub type ScaleFactors = [[u8; MAX_SUBBANDS]; MAX_CHANNELS];
pub type BitAllocation = [[u8; MAX_SUBBANDS]; MAX_CHANNELS];

/// Widest code a single sub-band sample may use.
pub const MAX_BITS: u8 = 16;

/// Bit need of the given sub-band.
pub fn bit_need(info: &StreamInfo, scale_factor: u8, subband: usize) -> i32 {
    let scale_factor = scale_factor as i32;

    match info.allocation {
        AllocationMethod::Snr => scale_factor,
        AllocationMethod::Loudness => {
            if scale_factor == 0 {
                return -5;
            }

            let rate = (info.sample_rate_index & 3) as usize;
            let offset = if info.subbands == 4 {
                LOUDNESS_OFFSET_4[rate][subband]
            } else {
                LOUDNESS_OFFSET_8[rate][subband]
            };

            let loudness = scale_factor - offset as i32;
            if loudness > 0 { loudness >> 1 } else { loudness }
        }
    }
}

/// Computes the bit widths of every channel and sub-band of a frame.
pub fn allocate(info: &StreamInfo, scale_factors: &ScaleFactors, bits: &mut BitAllocation) {
    let subbands = info.subband_count();
    let bitpool = info.bitpool as i32;

    *bits = [[0; MAX_SUBBANDS]; MAX_CHANNELS];

    match info.channel_mode {
        ChannelMode::Mono | ChannelMode::DualChannel => {
            for ch in 0..info.channels() {
                let mut needs = [0i32; MAX_SUBBANDS];
                for (sb, need) in needs[..subbands].iter_mut().enumerate() {
                    *need = bit_need(info, scale_factors[ch][sb], sb);
                }

                distribute(&needs[..subbands], bitpool, &mut bits[ch][..subbands]);
            }
        }
        ChannelMode::Stereo | ChannelMode::JointStereo => {
            // Interleaved sub-band-major: [sb0 ch0, sb0 ch1, sb1 ch0, ...]
            let mut needs = [0i32; MAX_SUBBANDS * MAX_CHANNELS];
            for sb in 0..subbands {
                for ch in 0..MAX_CHANNELS {
                    needs[sb * 2 + ch] = bit_need(info, scale_factors[ch][sb], sb);
                }
            }

            let mut flat = [0u8; MAX_SUBBANDS * MAX_CHANNELS];
            distribute(&needs[..subbands * 2], bitpool, &mut flat[..subbands * 2]);

            for sb in 0..subbands {
                for ch in 0..MAX_CHANNELS {
                    bits[ch][sb] = flat[sb * 2 + ch];
                }
            }
        }
    }
}

/// Allocates `bitpool` bits over `needs`, walking leftovers in slice order.
fn distribute(needs: &[i32], bitpool: i32, bits: &mut [u8]) {
    let Some(&max_bit_need) = needs.iter().max() else {
        return;
    };
    let min_bit_need = needs.iter().copied().min().unwrap_or(max_bit_need);

    let mut bit_slice = max_bit_need + 1;
    let mut bit_count = 0;
    let mut slice_count = 0;

    loop {
        bit_slice -= 1;
        bit_count += slice_count;
        slice_count = needs
            .iter()
            .map(|&need| {
                if need > bit_slice + 1 && need < bit_slice + 16 {
                    1
                } else if need == bit_slice + 1 {
                    2
                } else {
                    0
                }
            })
            .sum::<i32>();

        // Every sub-band saturated: nothing left to slice.
        if bit_count + slice_count >= bitpool || bit_slice + 16 < min_bit_need {
            break;
        }
    }

    if bit_count + slice_count == bitpool {
        bit_count += slice_count;
        bit_slice -= 1;
    }

    for (bits, &need) in bits.iter_mut().zip(needs) {
        *bits = if need < bit_slice + 2 {
            0
        } else {
            (need - bit_slice).min(MAX_BITS as i32) as u8
        };
    }

    let mut i = 0;
    while bit_count < bitpool && i < needs.len() {
        if bits[i] >= 2 && bits[i] < MAX_BITS {
            bits[i] += 1;
            bit_count += 1;
        } else if needs[i] == bit_slice + 1 && bitpool > bit_count + 1 {
            bits[i] = 2;
            bit_count += 2;
        }
        i += 1;
    }

    let mut i = 0;
    while bit_count < bitpool && i < needs.len() {
        if bits[i] < MAX_BITS {
            bits[i] += 1;
            bit_count += 1;
        }
        i += 1;
    }
}

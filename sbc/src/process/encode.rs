use log::{error, trace};

use crate::process::analysis::Analysis;
use crate::process::quantize::{compute_scale_factors, joint_prepass, pack_samples};
use crate::process::{Progress, Status};
use crate::structs::allocation::allocate;
use crate::structs::frame::{FrameState, MAX_SUBBANDS, frame_checksum};
use crate::structs::stream_info::StreamInfo;
use crate::utils::bitstream_io::BitstreamIoWriter;
use crate::utils::errors::SbcError;
use crate::utils::numeric::{Backend, Float};

/// Encodes interleaved 16-bit little-endian PCM into SBC frames.
///
/// The analysis history carries over between calls, so consecutive calls with
/// the same [`StreamInfo`] produce one continuous stream.
#[derive(Debug)]
pub struct Encoder<B: Backend = Float> {
    analysis: Option<Analysis<B>>,
    state: FrameState<B::Sample>,
}

impl<B: Backend> Default for Encoder<B> {
    fn default() -> Self {
        Self {
            analysis: None,
            state: FrameState::default(),
        }
    }
}

impl<B: Backend> Encoder<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the filter history.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Encodes as many whole frames as both `pcm` and `out` can hold.
    ///
    /// Returns [`Status::Continue`] when `pcm` holds less than one frame of
    /// samples. Every frame occupies exactly [`StreamInfo::frame_length`] bytes.
    pub fn encode(&mut self, pcm: &[u8], info: &StreamInfo, out: &mut [u8]) -> Progress {
        if let Err(e) = info.validate() {
            return Progress::failed(0, 0, e);
        }

        let frame_len = info.frame_length();
        let pcm_len = info.pcm_bytes_per_frame();

        if out.len() < frame_len {
            return Progress::failed(
                0,
                0,
                SbcError::BufferTooSmall {
                    needed: frame_len,
                    available: out.len(),
                },
            );
        }
        if pcm.len() < pcm_len {
            return Progress::new(0, 0, Status::Continue);
        }

        let mut consumed = 0;
        let mut produced = 0;

        while pcm.len() - consumed >= pcm_len && out.len() - produced >= frame_len {
            let frame = &mut out[produced..produced + frame_len];
            if let Err(e) = self.encode_frame(info, &pcm[consumed..consumed + pcm_len], frame) {
                return Progress::failed(consumed, produced, e);
            }

            consumed += pcm_len;
            produced += frame_len;
        }

        Progress::new(consumed, produced, Status::Success)
    }

    fn encode_frame(&mut self, info: &StreamInfo, pcm: &[u8], frame: &mut [u8]) -> Result<(), SbcError> {
        let subbands = info.subband_count();
        let channels = info.channels();

        if self.analysis.as_ref().is_none_or(|a| a.subbands() != subbands) {
            self.analysis = Some(Analysis::new(subbands));
        }
        let analysis = self.analysis.get_or_insert_with(|| Analysis::new(subbands));

        let mut block_pcm = [0i16; MAX_SUBBANDS];
        for (blk, block) in self.state.samples[..info.block_count()].iter_mut().enumerate() {
            for (ch, out) in block[..channels].iter_mut().enumerate() {
                for (n, sample) in block_pcm[..subbands].iter_mut().enumerate() {
                    let offset = ((blk * subbands + n) * channels + ch) * 2;
                    *sample = i16::from_le_bytes([pcm[offset], pcm[offset + 1]]);
                }
                analysis.process(ch, &block_pcm[..subbands], &mut out[..subbands]);
            }
        }

        compute_scale_factors::<B>(info, &mut self.state);
        joint_prepass::<B>(info, &mut self.state);
        allocate(info, &self.state.scale_factors, &mut self.state.bits);

        let available = frame.len();
        let overflow = |needed| SbcError::BufferTooSmall { needed, available };

        let mut writer = BitstreamIoWriter::with_capacity(frame.len());
        let packed = self
            .state
            .write_side_info(info, &mut writer)
            .and_then(|_| pack_samples::<B>(info, &self.state, &mut writer))
            .and_then(|_| writer.into_bytes());
        let mut bytes = match packed {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Frame packing failed: {e}");
                return Err(overflow(frame.len()));
            }
        };
        if bytes.len() > frame.len() {
            return Err(overflow(bytes.len()));
        }
        bytes.resize(frame.len(), 0);

        bytes[3] = frame_checksum(&bytes, info).map_err(|e| {
            error!("Frame checksum failed: {e}");
            overflow(frame.len())
        })?;
        frame.copy_from_slice(&bytes);

        trace!(
            "Encoded frame: join {:?}, bits {:?}",
            &self.state.join[..subbands],
            &self.state.bits[..channels]
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::frame::{SYNC_WORD, parse_header};
    use crate::structs::stream_info::{AllocationMethod, ChannelMode};
    use crate::utils::errors::ParameterError;
    use crate::utils::numeric::Fixed;

    fn sine(samples: usize, channels: usize, amplitude: f64) -> Vec<u8> {
        (0..samples)
            .flat_map(|n| {
                let t = n as f64 / 44100.0;
                (0..channels).map(move |ch| {
                    let freq = 440.0 * (ch + 1) as f64;
                    (amplitude * (2.0 * std::f64::consts::PI * freq * t).sin()).round() as i16
                })
            })
            .flat_map(i16::to_le_bytes)
            .collect()
    }

    #[test]
    fn silent_mono_frame() -> anyhow::Result<()> {
        let info = StreamInfo::from_raw(0, 2, 0, 16, 8, 26)?;
        assert_eq!(info.frame_length(), 60);

        let pcm = vec![0u8; info.pcm_bytes_per_frame()];
        let mut out = [0xffu8; 60];
        let progress = Encoder::<Float>::new().encode(&pcm, &info, &mut out);

        assert_eq!(progress, Progress::new(pcm.len(), 60, Status::Success));
        assert_eq!(out[0], SYNC_WORD);
        assert_eq!(out[1], (2 << 6) | (3 << 4) | 1);
        assert_eq!(out[2], 26);
        // Silence needs only the smallest scale factor.
        assert_eq!(out[4..8], [0; 4]);
        assert_eq!(parse_header(&out)?, info);
        Ok(())
    }

    #[test]
    fn frame_length_matches_output_for_every_configuration() -> anyhow::Result<()> {
        let pcm = sine(16 * 8 * 3, 2, 12000.0);

        for mode in 0..4u8 {
            for allocation in 0..2u8 {
                for blocks in [4u8, 8, 12, 16] {
                    for subbands in [4u8, 8] {
                        let mut info = StreamInfo::from_raw(mode, 2, allocation, blocks, subbands, 2)?;
                        for bitpool in [2, info.max_bitpool() / 2, info.max_bitpool()] {
                            info.bitpool = bitpool;
                            let frame_len = info.frame_length();
                            let mut out = vec![0u8; frame_len * 2 + 3];
                            let mut encoder = Encoder::<Fixed>::new();
                            let progress = encoder.encode(&pcm, &info, &mut out);

                            assert_eq!(progress.status, Status::Success, "{info:?}");
                            assert_eq!(progress.produced, frame_len * 2, "{info:?}");
                            assert_eq!(progress.consumed, info.pcm_bytes_per_frame() * 2);
                            assert_eq!(out[frame_len], SYNC_WORD);
                            assert_eq!(parse_header(&out[frame_len..])?, info);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    #[test]
    fn encoder_reports_short_buffers() {
        let info = StreamInfo::default();
        let pcm = vec![0u8; info.pcm_bytes_per_frame()];
        let mut encoder = Encoder::<Float>::new();

        let mut small = vec![0u8; info.frame_length() - 1];
        assert_eq!(
            encoder.encode(&pcm, &info, &mut small),
            Progress::failed(
                0,
                0,
                SbcError::BufferTooSmall {
                    needed: info.frame_length(),
                    available: info.frame_length() - 1
                }
            )
        );

        let mut out = vec![0u8; info.frame_length()];
        assert_eq!(
            encoder.encode(&pcm[1..], &info, &mut out),
            Progress::new(0, 0, Status::Continue)
        );
    }

    #[test]
    fn encoder_rejects_invalid_parameters() {
        let info = StreamInfo {
            channel_mode: ChannelMode::Mono,
            allocation: AllocationMethod::Snr,
            blocks: 6,
            ..StreamInfo::default()
        };
        let mut out = [0u8; 512];
        assert_eq!(
            Encoder::<Float>::new().encode(&[0; 512], &info, &mut out),
            Progress::failed(0, 0, ParameterError::Blocks(6))
        );
    }

    #[test]
    fn joint_stereo_marks_identical_channels() {
        let info = StreamInfo::default();
        let mut seed = 0x1234_5678u32;
        let pcm: Vec<u8> = (0..info.samples_per_frame())
            .flat_map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                let sample = ((seed % 16000) as i16 - 8000).to_le_bytes();
                [sample[0], sample[1], sample[0], sample[1]]
            })
            .collect();

        let mut out = vec![0u8; info.frame_length()];
        let progress = Encoder::<Float>::new().encode(&pcm, &info, &mut out);
        assert_eq!(progress.status, Status::Success);

        // Every sub-band but the last is joint coded.
        assert_eq!(out[4], 0b1111_1110);
    }
}

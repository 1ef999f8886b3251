use std::collections::VecDeque;

use log::{debug, trace, warn};

use crate::process::quantize::{unmix_joint, unpack_samples};
use crate::process::synthesis::Synthesis;
use crate::process::{Progress, Status};
use crate::structs::allocation::allocate;
use crate::structs::frame::{
    FrameState, HEADER_LEN, MAX_CHANNELS, MAX_SUBBANDS, SYNC_WORD, frame_checksum, parse_header,
    side_info_len,
};
use crate::structs::stream_info::StreamInfo;
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::{HeaderError, SbcError};
use crate::utils::numeric::{Backend, Float};

/// Consecutive all-sync headers tolerated before reporting [`SbcError::SyncLost`].
pub const MAX_SYNC_PADDING: usize = 32;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    #[default]
    Sync,
    Header,
    ScaleFactors,
    Samples,
}

/// Restartable SBC frame decoder.
///
/// [`Decoder::decode`] accepts the byte stream in chunks of any size, down to a
/// single byte, and writes interleaved 16-bit little-endian PCM. Bytes that have
/// been consumed but not yet decoded are kept inside the decoder, so the next
/// call continues with the input that follows `consumed`.
///
/// Corrupt frames are muted: their PCM length is filled with silence, the call
/// returns [`Status::Failed`] and the decoder resynchronizes on the next call.
/// Resynchronization searches again from the byte after the rejected sync word,
/// since a corrupt header cannot be trusted for the frame length. Candidates
/// rejected while resynchronizing are dropped without further muting.
#[derive(Debug)]
pub struct Decoder<B: Backend = Float> {
    state: ParseState,
    stage: Vec<u8>,
    pending: VecDeque<u8>,
    info: Option<StreamInfo>,
    frame: FrameState<B::Sample>,
    synthesis: Option<Synthesis<B>>,
    last_pcm_len: usize,
    padding: usize,
    resyncing: bool,
}

impl<B: Backend> Default for Decoder<B> {
    fn default() -> Self {
        Self {
            state: ParseState::default(),
            stage: Vec::with_capacity(512),
            pending: VecDeque::new(),
            info: None,
            frame: FrameState::default(),
            synthesis: None,
            last_pcm_len: 0,
            padding: 0,
            resyncing: false,
        }
    }
}

impl<B: Backend> Decoder<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops staged bytes, the filter history and the last stream descriptor.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Descriptor of the most recently parsed header.
    pub fn stream_info(&self) -> Option<&StreamInfo> {
        self.info.as_ref()
    }

    /// Finds the first valid frame header in `input` without decoding anything.
    ///
    /// Returns the offset of its sync word. Candidates whose side information is
    /// complete in `input` must also pass the frame check.
    pub fn probe(input: &[u8]) -> Result<(usize, StreamInfo), SbcError> {
        let mut truncated = None;

        for offset in input
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| (b == SYNC_WORD).then_some(i))
        {
            let candidate = &input[offset..];
            let info = match parse_header(candidate) {
                Ok(info) => info,
                Err(e @ SbcError::HeaderCorrupt(HeaderError::Truncated(_))) => {
                    truncated.get_or_insert(e);
                    continue;
                }
                Err(_) => continue,
            };

            if candidate.len() >= side_info_len(&info) {
                match frame_checksum(candidate, &info) {
                    Ok(checksum) if checksum == candidate[3] => {}
                    _ => continue,
                }
            }

            return Ok((offset, info));
        }

        Err(truncated.unwrap_or(SbcError::SyncLost))
    }

    /// Decodes frames from `input` into `pcm` until one of them runs out.
    ///
    /// - [`Status::Success`]: `pcm` cannot hold another frame
    /// - [`Status::Continue`]: `input` is exhausted
    /// - [`Status::Failed`]: a frame was muted or could not start; call again
    ///   with `input[consumed..]`
    pub fn decode(&mut self, input: &[u8], pcm: &mut [u8]) -> Progress {
        let mut consumed = 0;
        let mut produced = 0;
        let mut frames = 0;

        loop {
            match self.state {
                ParseState::Sync => {
                    if !self.find_sync(input, &mut consumed) {
                        return Progress::new(consumed, produced, Status::Continue);
                    }
                    self.stage.clear();
                    self.stage.push(SYNC_WORD);
                    self.state = ParseState::Header;
                }
                ParseState::Header => {
                    if !self.fill(input, &mut consumed, HEADER_LEN) {
                        return Progress::new(consumed, produced, Status::Continue);
                    }

                    if self.stage.iter().all(|&b| b == SYNC_WORD) {
                        self.padding += 1;
                        if self.padding > MAX_SYNC_PADDING {
                            debug!("Sync lost after {} padding headers", self.padding);
                            self.padding = 0;
                            self.restart(false);
                            return Progress::failed(consumed, produced, SbcError::SyncLost);
                        }
                        self.restart(true);
                        continue;
                    }

                    let info = match parse_header(&self.stage) {
                        Ok(info) => info,
                        Err(e) if self.resyncing => {
                            trace!("Rejected sync candidate: {e}");
                            self.restart(true);
                            continue;
                        }
                        Err(e) => {
                            warn!("Muting frame: {e}");
                            produced += self.mute(pcm, produced, self.last_pcm_len);
                            self.resyncing = true;
                            self.restart(true);
                            return Progress::failed(consumed, produced, e);
                        }
                    };
                    self.padding = 0;

                    // A resync candidate's length is unproven until its CRC passes.
                    if !self.resyncing {
                        if let Some(status) = Self::check_output(&info, pcm.len() - produced, frames) {
                            return Progress::new(consumed, produced, status);
                        }
                    }

                    self.info = Some(info);
                    self.state = ParseState::ScaleFactors;
                }
                ParseState::ScaleFactors => {
                    let Some(info) = self.info else {
                        self.restart(false);
                        continue;
                    };
                    if !self.fill(input, &mut consumed, side_info_len(&info)) {
                        return Progress::new(consumed, produced, Status::Continue);
                    }

                    match self.parse_side_info(&info) {
                        Ok(()) => {}
                        Err(e) if self.resyncing => {
                            trace!("Rejected sync candidate: {e}");
                            self.restart(true);
                            continue;
                        }
                        Err(e) => {
                            warn!("Muting frame: {e}");
                            produced += self.mute(pcm, produced, self.last_pcm_len);
                            self.resyncing = true;
                            self.restart(true);
                            return Progress::failed(consumed, produced, e);
                        }
                    }

                    self.resyncing = false;
                    self.last_pcm_len = info.pcm_bytes_per_frame();
                    self.state = ParseState::Samples;
                }
                ParseState::Samples => {
                    let Some(info) = self.info else {
                        self.restart(false);
                        continue;
                    };
                    if let Some(status) = Self::check_output(&info, pcm.len() - produced, frames) {
                        return Progress::new(consumed, produced, status);
                    }
                    if !self.fill(input, &mut consumed, info.frame_length()) {
                        return Progress::new(consumed, produced, Status::Continue);
                    }

                    let pcm_len = info.pcm_bytes_per_frame();
                    if let Err(e) = self.synthesize(&info, &mut pcm[produced..produced + pcm_len]) {
                        warn!("Muting frame: {e}");
                        produced += self.mute(pcm, produced, pcm_len);
                        self.restart(false);
                        return Progress::failed(consumed, produced, e);
                    }

                    trace!("Decoded frame of {} bytes", self.stage.len());
                    produced += pcm_len;
                    frames += 1;
                    self.restart(false);

                    if pcm.len() - produced < pcm_len {
                        return Progress::new(consumed, produced, Status::Success);
                    }
                }
            }
        }
    }

    /// Stops before a frame whose PCM does not fit in the `available` output bytes.
    fn check_output(info: &StreamInfo, available: usize, frames: usize) -> Option<Status> {
        let needed = info.pcm_bytes_per_frame();
        if available >= needed {
            return None;
        }

        Some(if frames > 0 {
            Status::Success
        } else {
            Status::Failed(SbcError::BufferTooSmall { needed, available })
        })
    }

    /// Advances past the next sync word, pending bytes first.
    fn find_sync(&mut self, input: &[u8], consumed: &mut usize) -> bool {
        while let Some(byte) = self.pending.pop_front() {
            if byte == SYNC_WORD {
                return true;
            }
        }

        match input[*consumed..].iter().position(|&b| b == SYNC_WORD) {
            Some(position) => {
                if position > 0 {
                    debug!("Skipped {position} bytes before sync");
                }
                *consumed += position + 1;
                true
            }
            None => {
                *consumed = input.len();
                false
            }
        }
    }

    /// Stages bytes until `target` are held. Returns `false` when the input runs out.
    fn fill(&mut self, input: &[u8], consumed: &mut usize, target: usize) -> bool {
        while self.stage.len() < target {
            if let Some(byte) = self.pending.pop_front() {
                self.stage.push(byte);
                continue;
            }

            let take = (target - self.stage.len()).min(input.len() - *consumed);
            if take == 0 {
                return false;
            }
            self.stage.extend_from_slice(&input[*consumed..*consumed + take]);
            *consumed += take;
        }

        true
    }

    /// Returns to sync search. With `rescan`, the staged bytes after the sync
    /// word are searched again.
    fn restart(&mut self, rescan: bool) {
        if rescan {
            for &byte in self.stage[1..].iter().rev() {
                self.pending.push_front(byte);
            }
        }
        self.stage.clear();
        self.state = ParseState::Sync;
    }

    fn mute(&self, pcm: &mut [u8], produced: usize, len: usize) -> usize {
        let len = len.min(pcm.len() - produced);
        pcm[produced..produced + len].fill(0);
        len
    }

    /// Verifies the frame check sequence, then reads the scale factors and
    /// derives the bit allocation.
    fn parse_side_info(&mut self, info: &StreamInfo) -> Result<(), SbcError> {
        let truncated = |_| HeaderError::Truncated(self.stage.len());

        let expected = self.stage[3];
        let computed = frame_checksum(&self.stage, info).map_err(truncated)?;
        if computed != expected {
            return Err(SbcError::ChecksumMismatch { expected, computed });
        }

        let mut reader = BsIoSliceReader::from_slice(&self.stage);
        self.frame
            .read_side_info(info, &mut reader)
            .map_err(truncated)?;
        allocate(info, &self.frame.scale_factors, &mut self.frame.bits);

        Ok(())
    }

    /// Dequantizes the staged frame and writes its interleaved PCM to `pcm`.
    fn synthesize(&mut self, info: &StreamInfo, pcm: &mut [u8]) -> Result<(), SbcError> {
        let subbands = info.subband_count();
        let channels = info.channels();
        let frame_len = self.stage.len();

        let mut reader = BsIoSliceReader::from_slice(&self.stage);
        reader
            .skip_n(info.side_info_bits() as u32)
            .and_then(|_| unpack_samples::<B>(info, &mut self.frame, &mut reader))
            .map_err(|_| HeaderError::Truncated(frame_len))?;
        unmix_joint::<B>(info, &mut self.frame);

        if self.synthesis.as_ref().is_none_or(|s| s.subbands() != subbands) {
            self.synthesis = Some(Synthesis::new(subbands));
        }
        let synthesis = self.synthesis.get_or_insert_with(|| Synthesis::new(subbands));

        let mut block_pcm = [[0i16; MAX_SUBBANDS]; MAX_CHANNELS];
        for (blk, block) in self.frame.samples[..info.block_count()].iter().enumerate() {
            for ch in 0..channels {
                synthesis.process(ch, &block[ch][..subbands], &mut block_pcm[ch][..subbands]);
            }
            for n in 0..subbands {
                for (ch, samples) in block_pcm[..channels].iter().enumerate() {
                    let offset = ((blk * subbands + n) * channels + ch) * 2;
                    pcm[offset..offset + 2].copy_from_slice(&samples[n].to_le_bytes());
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::encode::Encoder;
    use crate::structs::stream_info::{AllocationMethod, ChannelMode};
    use crate::utils::numeric::Fixed;

    fn info(channel_mode: ChannelMode, subbands: u8, bitpool: u8) -> StreamInfo {
        StreamInfo {
            channel_mode,
            sample_rate_index: 2,
            allocation: AllocationMethod::Loudness,
            blocks: 16,
            subbands,
            bitpool,
        }
    }

    fn tone(info: &StreamInfo, frames: usize) -> Vec<u8> {
        let channels = info.channels();
        (0..info.samples_per_frame() * frames)
            .flat_map(|n| {
                let t = n as f64 / 44100.0;
                (0..channels).map(move |ch| {
                    let a = 9000.0 * (2.0 * std::f64::consts::PI * 440.0 * t).sin();
                    let b = 3000.0 * (2.0 * std::f64::consts::PI * 2500.0 * t).sin();
                    (a + b * (1.0 - 0.3 * ch as f64)).round() as i16
                })
            })
            .flat_map(i16::to_le_bytes)
            .collect()
    }

    fn encode(info: &StreamInfo, pcm: &[u8]) -> Vec<u8> {
        let frames = pcm.len() / info.pcm_bytes_per_frame();
        let mut out = vec![0u8; frames * info.frame_length()];
        let progress = Encoder::<Float>::new().encode(pcm, info, &mut out);
        assert_eq!(progress.status, Status::Success);
        assert_eq!(progress.produced, out.len());
        out
    }

    fn samples(pcm: &[u8]) -> Vec<i16> {
        pcm.chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    #[test]
    fn single_mono_frame() {
        let info = info(ChannelMode::Mono, 4, 20);
        let stream = encode(&info, &tone(&info, 1));

        let mut pcm = vec![0u8; 16 * 4 * 2];
        let mut decoder = Decoder::<Float>::new();
        let progress = decoder.decode(&stream, &mut pcm);

        assert_eq!(progress, Progress::new(info.frame_length(), 128, Status::Success));
        assert_eq!(decoder.stream_info(), Some(&info));
    }

    #[test]
    fn silence_round_trip() {
        for mode in [ChannelMode::Mono, ChannelMode::JointStereo] {
            let info = info(mode, 8, 30);
            let stream = encode(&info, &vec![0u8; info.pcm_bytes_per_frame() * 3]);

            let mut pcm = vec![0x55u8; info.pcm_bytes_per_frame() * 3];
            let progress = Decoder::<Fixed>::new().decode(&stream, &mut pcm);
            assert_eq!(progress.status, Status::Success);
            assert_eq!(progress.produced, pcm.len());
            assert!(pcm.iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn byte_at_a_time_matches_whole_stream() {
        let info = info(ChannelMode::Stereo, 8, 35);
        let stream = encode(&info, &tone(&info, 4));

        let mut whole = vec![0u8; info.pcm_bytes_per_frame() * 5];
        let progress = Decoder::<Float>::new().decode(&stream, &mut whole);
        assert_eq!(progress.status, Status::Continue);
        assert_eq!(progress.consumed, stream.len());
        assert_eq!(progress.produced, info.pcm_bytes_per_frame() * 4);

        let mut split = vec![0u8; whole.len()];
        let mut decoder = Decoder::<Float>::new();
        let mut produced = 0;
        for byte in stream.chunks(1) {
            let progress = decoder.decode(byte, &mut split[produced..]);
            assert_eq!(progress.consumed, 1);
            assert_eq!(progress.status, Status::Continue);
            produced += progress.produced;
        }

        assert_eq!(produced, progress.produced);
        assert_eq!(split, whole);
    }

    #[test]
    fn corrupted_checksum_mutes_one_frame() {
        let info = info(ChannelMode::JointStereo, 8, 40);
        let frame_len = info.frame_length();
        let pcm_len = info.pcm_bytes_per_frame();
        let stream = encode(&info, &tone(&info, 3));

        let mut corrupted = stream.clone();
        let transmitted = stream[frame_len + 3];
        corrupted[frame_len + 3] ^= 0x5a;

        let mut out = vec![0xffu8; pcm_len * 3];
        let mut decoder = Decoder::<Float>::new();
        let first = decoder.decode(&corrupted, &mut out);
        assert_eq!(
            first,
            Progress::failed(
                frame_len + side_info_len(&info),
                pcm_len * 2,
                SbcError::ChecksumMismatch {
                    expected: transmitted ^ 0x5a,
                    computed: transmitted,
                }
            )
        );

        let second = decoder.decode(&corrupted[first.consumed..], &mut out[first.produced..]);
        assert_eq!(second.status, Status::Success);
        assert_eq!(first.consumed + second.consumed, corrupted.len());
        assert_eq!(second.produced, pcm_len);

        let expected = without_second_frame(&info, &stream);
        assert_eq!(out[..pcm_len], expected[..pcm_len]);
        assert!(out[pcm_len..2 * pcm_len].iter().all(|&b| b == 0));
        assert_eq!(out[2 * pcm_len..], expected[pcm_len..]);
    }

    /// Decodes all of `stream`, calling again after every muted frame.
    /// Returns the PCM bytes written and the number of muted frames.
    fn decode_through_errors(stream: &[u8], out: &mut [u8]) -> (usize, usize) {
        let mut decoder = Decoder::<Float>::new();
        let (mut consumed, mut produced, mut muted) = (0, 0, 0);
        loop {
            let progress = decoder.decode(&stream[consumed..], &mut out[produced..]);
            consumed += progress.consumed;
            produced += progress.produced;
            match progress.status {
                Status::Failed(SbcError::ChecksumMismatch { .. } | SbcError::HeaderCorrupt(_)) => {
                    muted += 1
                }
                Status::Failed(e) => panic!("{e:?}"),
                Status::Success | Status::Continue => return (produced, muted),
            }
        }
    }

    /// PCM of frames one and three of `stream` decoded back to back.
    fn without_second_frame(info: &StreamInfo, stream: &[u8]) -> Vec<u8> {
        let frame_len = info.frame_length();
        let mut skipped = stream[..frame_len].to_vec();
        skipped.extend_from_slice(&stream[2 * frame_len..3 * frame_len]);
        let mut expected = vec![0u8; info.pcm_bytes_per_frame() * 2];
        let progress = Decoder::<Float>::new().decode(&skipped, &mut expected);
        assert_eq!(progress.produced, expected.len());
        expected
    }

    #[test]
    fn bitpool_error_does_not_hide_the_next_frame() {
        let info = info(ChannelMode::JointStereo, 8, 40);
        let frame_len = info.frame_length();
        let pcm_len = info.pcm_bytes_per_frame();
        let stream = encode(&info, &tone(&info, 3));

        // Bitpool 104 advertises a frame that runs past the start of frame three.
        let mut corrupted = stream.clone();
        corrupted[frame_len + 2] ^= 0x40;

        let mut out = vec![0xffu8; pcm_len * 3];
        let first = Decoder::<Float>::new().decode(&corrupted, &mut out);
        assert!(matches!(first.status, Status::Failed(SbcError::ChecksumMismatch { .. })));
        assert_eq!(first.produced, pcm_len * 2);

        let (produced, muted) = decode_through_errors(&corrupted, &mut out);
        assert_eq!((produced, muted), (pcm_len * 3, 1));

        let expected = without_second_frame(&info, &stream);
        assert_eq!(out[..pcm_len], expected[..pcm_len]);
        assert!(out[pcm_len..2 * pcm_len].iter().all(|&b| b == 0));
        assert_eq!(out[2 * pcm_len..], expected[pcm_len..]);
    }

    #[test]
    fn single_bit_errors_mute_only_their_frame() {
        let info = info(ChannelMode::DualChannel, 8, 24);
        let frame_len = info.frame_length();
        let pcm_len = info.pcm_bytes_per_frame();
        let stream = encode(&info, &tone(&info, 3));
        let expected = without_second_frame(&info, &stream);

        for bit in 8..side_info_len(&info) * 8 {
            let (byte, mask) = (bit / 8, 0x80u8 >> (bit % 8));
            // Mode and sub-band flips change the side information layout.
            if byte == 1 && mask & 0b0000_1101 != 0 {
                continue;
            }

            let mut corrupted = stream.clone();
            corrupted[frame_len + byte] ^= mask;

            let mut out = vec![0xffu8; pcm_len * 3];
            let (produced, muted) = decode_through_errors(&corrupted, &mut out);
            assert_eq!((produced, muted), (pcm_len * 3, 1), "bit {bit}");
            assert_eq!(out[..pcm_len], expected[..pcm_len], "bit {bit}");
            assert!(out[pcm_len..2 * pcm_len].iter().all(|&b| b == 0), "bit {bit}");
            assert_eq!(out[2 * pcm_len..], expected[pcm_len..], "bit {bit}");
        }
    }

    #[test]
    fn corrupt_header_mutes_with_previous_length() {
        let info = info(ChannelMode::Mono, 8, 31);
        let pcm_len = info.pcm_bytes_per_frame();
        let frames = encode(&info, &tone(&info, 2));
        let (first, second) = frames.split_at(info.frame_length());

        let mut stream = first.to_vec();
        stream.extend_from_slice(&[SYNC_WORD, 0x00, 0x00, 0x00]);
        stream.extend_from_slice(second);

        let mut out = vec![0xffu8; pcm_len * 3];
        let mut decoder = Decoder::<Float>::new();
        let progress = decoder.decode(&stream, &mut out);
        assert_eq!(
            progress,
            Progress::failed(
                first.len() + 4,
                pcm_len * 2,
                HeaderError::Bitpool { bitpool: 0, max: 64 }
            )
        );
        assert!(out[pcm_len..2 * pcm_len].iter().all(|&b| b == 0));

        let rest = decoder.decode(&stream[progress.consumed..], &mut out[progress.produced..]);
        assert_eq!(rest, Progress::new(second.len(), pcm_len, Status::Success));
    }

    #[test]
    fn sync_padding_run_loses_sync() {
        let stream = [SYNC_WORD; MAX_SYNC_PADDING + 8];
        let mut out = [0u8; 64];
        let progress = Decoder::<Float>::new().decode(&stream, &mut out);

        assert_eq!(progress.status, Status::Failed(SbcError::SyncLost));
        assert_eq!(progress.produced, 0);
        assert_eq!(progress.consumed, MAX_SYNC_PADDING + 4);
    }

    #[test]
    fn output_limits_stop_at_frame_boundaries() {
        let info = info(ChannelMode::Stereo, 4, 30);
        let pcm_len = info.pcm_bytes_per_frame();
        let stream = encode(&info, &tone(&info, 3));
        let mut decoder = Decoder::<Float>::new();

        let mut small = vec![0u8; pcm_len - 1];
        assert_eq!(
            decoder.decode(&stream, &mut small),
            Progress::failed(
                HEADER_LEN,
                0,
                SbcError::BufferTooSmall {
                    needed: pcm_len,
                    available: pcm_len - 1
                }
            )
        );

        let mut out = vec![0u8; pcm_len * 2 + 10];
        let progress = decoder.decode(&stream[HEADER_LEN..], &mut out);
        assert_eq!(
            progress,
            Progress::new(2 * info.frame_length() - HEADER_LEN, 2 * pcm_len, Status::Success)
        );
    }

    #[test]
    fn probe_skips_false_sync_words() -> anyhow::Result<()> {
        let info = info(ChannelMode::JointStereo, 8, 53);
        let frame = encode(&info, &tone(&info, 1));

        let mut stream = vec![0x00, SYNC_WORD, 0x00, 0x00, 0x00, 0x12];
        stream.extend_from_slice(&frame);
        assert_eq!(Decoder::<Float>::probe(&stream)?, (6, info));

        assert_eq!(Decoder::<Float>::probe(&[1, 2, 3]), Err(SbcError::SyncLost));
        assert_eq!(
            Decoder::<Float>::probe(&frame[..2]),
            Err(SbcError::HeaderCorrupt(HeaderError::Truncated(2)))
        );
        Ok(())
    }

    fn decode_all<B: Backend>(stream: &[u8], pcm_len: usize) -> Vec<i16> {
        let mut out = vec![0u8; pcm_len];
        let progress = Decoder::<B>::new().decode(stream, &mut out);
        assert_eq!(progress.produced, pcm_len);
        samples(&out)
    }

    fn rms(samples: impl Iterator<Item = f64>) -> f64 {
        let (sum, count) = samples.fold((0.0, 0), |(sum, count), s| (sum + s * s, count + 1));
        (sum / count as f64).sqrt()
    }

    #[test]
    fn fixed_and_float_decoders_agree() {
        let info = info(ChannelMode::JointStereo, 8, 45);
        let pcm_len = info.pcm_bytes_per_frame() * 4;
        let stream = encode(&info, &tone(&info, 4));

        let float = decode_all::<Float>(&stream, pcm_len);
        let fixed = decode_all::<Fixed>(&stream, pcm_len);
        let worst = float
            .iter()
            .zip(&fixed)
            .map(|(&a, &b)| (a as i32 - b as i32).abs())
            .max();
        assert!(worst.is_some_and(|w| w <= 8), "{worst:?}");
    }

    #[test]
    fn sine_round_trip_keeps_energy() {
        for subbands in [4u8, 8] {
            let info = info(ChannelMode::Mono, subbands, 32);
            let input = tone(&info, 10);
            let stream = encode(&info, &input);
            let output = decode_all::<Float>(&stream, input.len());

            let skip = info.samples_per_frame() * 2;
            let source = rms(samples(&input)[skip..].iter().map(|&s| s as f64));
            let decoded = rms(output[skip..].iter().map(|&s| s as f64));
            let ratio = decoded / source;
            assert!((0.9..1.1).contains(&ratio), "{subbands} sub-bands: {ratio}");
        }
    }

    #[test]
    fn joint_coding_tracks_independent_coding() {
        let joint = info(ChannelMode::JointStereo, 8, 53);
        let stereo = StreamInfo {
            channel_mode: ChannelMode::Stereo,
            ..joint
        };
        let input = tone(&joint, 6);

        let joint_stream = encode(&joint, &input);
        assert_ne!(joint_stream[4], 0, "no sub-band was joint coded");
        let joint_out = decode_all::<Float>(&joint_stream, input.len());
        let stereo_out = decode_all::<Float>(&encode(&stereo, &input), input.len());

        let skip = joint.samples_per_frame() * 2 * 2;
        let signal = rms(stereo_out[skip..].iter().map(|&s| s as f64));
        let difference = rms(
            joint_out[skip..]
                .iter()
                .zip(&stereo_out[skip..])
                .map(|(&a, &b)| a as f64 - b as f64),
        );
        assert!(difference < signal * 0.05, "{difference} vs {signal}");
    }
}

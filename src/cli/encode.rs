use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::command::{Cli, EncodeArgs};
use crate::input::InputReader;
use crate::riff::{WAVE_FORMAT_PCM, WavReader};
use crate::timestamp::duration_str;
use sbc::process::Status;
use sbc::process::encode::Encoder;
use sbc::structs::stream_info::{ChannelMode, StreamInfo};
use sbc::utils::numeric::{Backend, Fixed, Float};

/// Frames encoded per call into the output buffer.
const FRAMES_PER_CALL: usize = 64;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSummary {
    pub frames: u64,
    /// Samples per channel taken from the input, padding excluded.
    pub samples: u64,
    pub bytes: u64,
}

pub fn cmd_encode(args: &EncodeArgs, _cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Encoding WAV file: {}", args.input.display());

    let mut wav = WavReader::new(InputReader::new(&args.input)?)?;
    let format = wav.format().clone();
    if format.format_tag != WAVE_FORMAT_PCM || format.bits_per_sample != 16 {
        bail!(
            "Input must be 16-bit PCM, got format {:#06X} with {} bits",
            format.format_tag,
            format.bits_per_sample
        );
    }

    let info = stream_info_for(args, format.channels, format.sample_rate)?;
    log::info!(
        "Stream: {info} ({} bytes per frame, {} kbps)",
        info.frame_length(),
        info.bit_rate() / 1000
    );

    let output: Box<dyn Write> = if args.output.as_os_str() == "-" {
        Box::new(io::stdout().lock())
    } else {
        log::info!("Creating SBC file: {}", args.output.display());
        Box::new(File::create(&args.output)?)
    };
    let mut output = BufWriter::new(output);

    let pb = match multi {
        Some(multi) => {
            let pb = multi.add(ProgressBar::new_spinner());
            pb.set_style(ProgressStyle::with_template(
                "{spinner:.green} {pos} frames\n{msg} | elapsed: {elapsed_precise}",
            )?);
            pb.enable_steady_tick(Duration::from_millis(100));
            Some(pb)
        }
        None => None,
    };

    let start_time = Instant::now();
    let summary = if args.fixed {
        encode_stream::<Fixed, _, _>(&mut wav, &info, &mut output, pb.as_ref())?
    } else {
        encode_stream::<Float, _, _>(&mut wav, &info, &mut output, pb.as_ref())?
    };
    output.flush()?;

    let duration = duration_str(summary.samples, info.sampling_frequency());
    if let Some(pb) = &pb {
        pb.finish_with_message(format!("timestamp: {duration}"));
    }
    log::info!(
        "Encoding completed: {} frames, {} bytes, {duration} in {:.3}s",
        summary.frames,
        summary.bytes,
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Resolves the stream parameters from the options and the input format.
fn stream_info_for(args: &EncodeArgs, channels: u16, sample_rate: u32) -> Result<StreamInfo> {
    let channel_mode = match (args.mode, channels) {
        (Some(mode), _) => ChannelMode::from(mode),
        (None, 1) => ChannelMode::Mono,
        (None, 2) => ChannelMode::JointStereo,
        (None, n) => bail!("Unsupported channel count: {n}"),
    };
    if channel_mode.channels() != channels as usize {
        bail!("Mode {channel_mode} needs {} channels, input has {channels}", channel_mode.channels());
    }

    let bitpool = args
        .bitpool
        .unwrap_or(if channel_mode.is_independent() { 31 } else { 53 });

    let info = StreamInfo {
        channel_mode,
        sample_rate_index: StreamInfo::sample_rate_index_of(sample_rate)?,
        allocation: args.allocation.into(),
        blocks: args.blocks,
        subbands: args.subbands,
        bitpool,
    };
    info.validate()?;

    Ok(info)
}

/// Encodes every frame readable from `reader`. A trailing partial frame is
/// padded with silence.
pub fn encode_stream<B, R, W>(
    reader: &mut R,
    info: &StreamInfo,
    writer: &mut W,
    pb: Option<&ProgressBar>,
) -> Result<EncodeSummary>
where
    B: Backend,
    R: Read,
    W: Write,
{
    let pcm_len = info.pcm_bytes_per_frame();
    let frame_len = info.frame_length();

    let mut encoder = Encoder::<B>::new();
    let mut pcm = Vec::with_capacity(pcm_len * FRAMES_PER_CALL);
    let mut out = vec![0u8; frame_len * FRAMES_PER_CALL];
    let mut chunk = vec![0u8; pcm_len * FRAMES_PER_CALL];
    let mut summary = EncodeSummary::default();

    let mut bytes_read = 0u64;
    let mut eof = false;
    while !eof {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            eof = true;
            if pcm.is_empty() {
                break;
            }
            log::debug!("Padding final frame with {} bytes of silence", pcm_len - pcm.len());
            pcm.resize(pcm_len, 0);
        } else {
            bytes_read += n as u64;
            pcm.extend_from_slice(&chunk[..n]);
        }

        let mut start = 0;
        loop {
            let progress = encoder.encode(&pcm[start..], info, &mut out);
            writer.write_all(&out[..progress.produced])?;
            start += progress.consumed;

            let frames = (progress.produced / frame_len) as u64;
            summary.frames += frames;
            summary.bytes += progress.produced as u64;
            if let Some(pb) = pb {
                pb.inc(frames);
            }

            match progress.status {
                Status::Success if pcm.len() - start >= pcm_len => {}
                Status::Success | Status::Continue => break,
                Status::Failed(e) => return Err(e.into()),
            }
        }
        pcm.drain(..start);
    }

    summary.samples = bytes_read / (2 * info.channels() as u64);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::command::{Allocation, Mode};
    use sbc::process::decode::Decoder;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn args(mode: Option<Mode>, bitpool: Option<u8>) -> EncodeArgs {
        EncodeArgs {
            input: PathBuf::from("in.wav"),
            output: PathBuf::from("out.sbc"),
            subbands: 8,
            blocks: 16,
            mode,
            allocation: Allocation::Loudness,
            bitpool,
            fixed: false,
        }
    }

    #[test]
    fn defaults_follow_the_input_channels() -> anyhow::Result<()> {
        let mono = stream_info_for(&args(None, None), 1, 16000)?;
        assert_eq!(mono.channel_mode, ChannelMode::Mono);
        assert_eq!((mono.sample_rate_index, mono.bitpool), (0, 31));

        let stereo = stream_info_for(&args(None, None), 2, 48000)?;
        assert_eq!(stereo.channel_mode, ChannelMode::JointStereo);
        assert_eq!((stereo.sample_rate_index, stereo.bitpool), (3, 53));

        let dual = stream_info_for(&args(Some(Mode::Dual), None), 2, 44100)?;
        assert_eq!(dual.bitpool, 31);
        Ok(())
    }

    #[test]
    fn mismatched_or_unsupported_inputs_fail() {
        assert!(stream_info_for(&args(Some(Mode::Stereo), None), 1, 44100).is_err());
        assert!(stream_info_for(&args(None, None), 6, 44100).is_err());
        assert!(stream_info_for(&args(None, None), 2, 22050).is_err());
        assert!(stream_info_for(&args(Some(Mode::Mono), Some(200)), 1, 44100).is_err());
    }

    #[test]
    fn partial_frame_is_padded() -> anyhow::Result<()> {
        let info = stream_info_for(&args(None, None), 2, 44100)?;
        let samples = info.samples_per_frame() * 5 / 2;
        let pcm: Vec<u8> = (0..samples * 2)
            .flat_map(|n| (((n * 131) % 4000) as i16 - 2000).to_le_bytes())
            .collect();

        let mut out = Vec::new();
        let summary = encode_stream::<Float, _, _>(&mut Cursor::new(pcm), &info, &mut out, None)?;

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.samples, samples as u64);
        assert_eq!(out.len(), 3 * info.frame_length());
        assert_eq!(summary.bytes, out.len() as u64);

        let mut decoded = vec![0u8; 3 * info.pcm_bytes_per_frame()];
        let progress = Decoder::<Float>::new().decode(&out, &mut decoded);
        assert_eq!(progress.produced, decoded.len());
        Ok(())
    }

    #[test]
    fn short_reads_keep_frame_alignment() -> anyhow::Result<()> {
        struct Trickle(Cursor<Vec<u8>>);
        impl Read for Trickle {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                let len = buf.len().min(3);
                self.0.read(&mut buf[..len])
            }
        }

        let info = stream_info_for(&args(None, Some(20)), 1, 32000)?;
        let pcm: Vec<u8> = (0..info.samples_per_frame() * 4)
            .flat_map(|n| ((n as i16 % 300) * 50).to_le_bytes())
            .collect();

        let mut whole = Vec::new();
        encode_stream::<Fixed, _, _>(&mut Cursor::new(pcm.clone()), &info, &mut whole, None)?;
        let mut trickled = Vec::new();
        let summary =
            encode_stream::<Fixed, _, _>(&mut Trickle(Cursor::new(pcm)), &info, &mut trickled, None)?;

        assert_eq!(summary.frames, 4);
        assert_eq!(whole, trickled);
        Ok(())
    }
}

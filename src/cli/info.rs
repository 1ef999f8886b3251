use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;

use super::command::{Cli, InfoArgs};
use super::scan::FrameScanner;
use crate::input::InputReader;
use crate::timestamp::duration_str;
use sbc::process::decode::Decoder;
use sbc::structs::stream_info::StreamInfo;
use sbc::utils::errors::SbcError;
use sbc::utils::numeric::Float;

/// Stream summary printed by `info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamSummary {
    pub sample_rate: u32,
    pub channel_mode: String,
    pub subbands: u8,
    pub blocks: u8,
    pub allocation: String,
    pub bitpool: u8,
    pub frame_length: usize,
    pub bit_rate: u32,
    pub frames: u64,
    pub duration: String,
    pub checksum_errors: u64,
    pub bytes: u64,
}

impl StreamSummary {
    fn new(info: &StreamInfo, frames: u64, checksum_errors: u64, bytes: u64) -> Self {
        Self {
            sample_rate: info.sampling_frequency(),
            channel_mode: info.channel_mode.to_string(),
            subbands: info.subbands,
            blocks: info.blocks,
            allocation: info.allocation.to_string(),
            bitpool: info.bitpool,
            frame_length: info.frame_length(),
            bit_rate: info.bit_rate(),
            frames,
            duration: duration_str(
                frames * info.samples_per_frame() as u64,
                info.sampling_frequency(),
            ),
            checksum_errors,
            bytes,
        }
    }
}

pub fn cmd_info(args: &InfoArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Analyzing SBC stream: {}", args.input.display());

    let pb = match multi {
        Some(multi) => {
            let pb = multi.add(ProgressBar::new_spinner());
            pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
            pb.enable_steady_tick(Duration::from_millis(100));
            pb.set_message("Analyzing frames...");
            Some(pb)
        }
        None => None,
    };

    let summary = analyze_stream(&args.input, cli, args.yaml, pb.as_ref())?;
    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }

    match summary {
        Some(summary) if args.yaml => print!("{}", serde_yaml_ng::to_string(&summary)?),
        Some(summary) => display_summary(&summary),
        None => {
            println!("No SBC frame header found in the file.");
            println!("This doesn't appear to be a valid SBC stream.");
        }
    }

    Ok(())
}

fn analyze_stream(
    input_path: &Path,
    cli: &Cli,
    quiet: bool,
    pb: Option<&ProgressBar>,
) -> Result<Option<StreamSummary>> {
    let mut input_reader = InputReader::new(input_path)?;
    let mut scanner = FrameScanner::default();
    let mut first: Option<StreamInfo> = None;
    let mut total_bytes = 0u64;
    let mut index = 0u64;

    input_reader.process_chunks(64 * 1024, |chunk| {
        total_bytes += chunk.len() as u64;

        if first.is_none() {
            if let Ok((offset, info)) = Decoder::<Float>::probe(chunk) {
                let offset = total_bytes - chunk.len() as u64 + offset as u64;
                log::debug!("First frame header at offset {offset}");
                if !quiet {
                    with_suspended(pb, || display_stream_info(&info));
                }
                first = Some(info);
            }
        }

        scanner.push_bytes(chunk);
        for frame in scanner.by_ref() {
            index += 1;
            match frame {
                Ok(frame) => {
                    if first.is_some_and(|info| info != frame.info) {
                        log::warn!("Stream parameters change at offset {}: {}", frame.offset, frame.info);
                    }
                    first.get_or_insert(frame.info);
                }
                Err(e @ SbcError::ChecksumMismatch { .. }) if cli.strict => return Err(e.into()),
                Err(e) => log::warn!("Frame {index}: {e}"),
            }
        }

        if let Some(pb) = pb {
            pb.set_message(format!("Analyzing frames...       {}", scanner.frames()));
        }
        Ok(true)
    })?;

    Ok(first.map(|info| {
        StreamSummary::new(&info, scanner.frames(), scanner.checksum_errors(), total_bytes)
    }))
}

fn with_suspended<F: FnOnce()>(pb: Option<&ProgressBar>, f: F) {
    match pb {
        Some(pb) => pb.suspend(f),
        None => f(),
    }
}

fn display_stream_info(info: &StreamInfo) {
    println!();
    println!("SBC Stream Information");
    println!("======================");
    println!();
    println!("  Sampling rate             {} Hz", info.sampling_frequency());
    println!("  Channel mode              {}", info.channel_mode);
    println!("  Sub-bands                 {}", info.subbands);
    println!("  Blocks                    {}", info.blocks);
    println!("  Allocation                {}", info.allocation);
    println!("  Bitpool                   {}", info.bitpool);
    println!("  Frame length              {} bytes", info.frame_length());
    println!("  Bit rate                  {:.1} kbps", info.bit_rate() as f64 / 1000.0);
    println!();
}

fn display_summary(summary: &StreamSummary) {
    println!("Analysis Summary");
    println!("  Frames processed          {}", summary.frames);
    println!("  Checksum errors           {}", summary.checksum_errors);
    let size_mb = summary.bytes as f64 / 1_000_000.0;
    println!("  Size                      {size_mb:.2} MB ({} bytes)", summary.bytes);
    println!("  Duration                  {}", summary.duration);
    println!();
}

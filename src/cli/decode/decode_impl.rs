use std::sync::mpsc;
use std::time::Instant;

use anyhow::Result;
use indicatif::MultiProgress;

use super::decoder_thread::{DecoderThreadConfig, spawn_decoder_thread};
use super::output::AudioWriter;
use super::progress::{create_progress_bar, estimate_total_frames, finalize_progress_bar, speed_message};
use crate::cli::command::{Cli, DecodeArgs};
use sbc::utils::numeric::{Fixed, Float};

pub fn cmd_decode(args: &DecodeArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!(
        "Decoding SBC stream: {} (strict mode: {}, arithmetic: {})",
        args.input.display(),
        cli.strict,
        if args.fixed { "fixed" } else { "float" }
    );

    let is_pipe = args.input.as_os_str() == "-";
    if let Some(ref path) = args.output {
        log::info!("Output path specified: {}", path.display());
    } else {
        log::info!("No output path given; decoding without writing audio");
    }

    let should_estimate = !args.no_estimate_progress && !is_pipe && multi.is_some();
    let total_frames = if should_estimate {
        Some(estimate_total_frames(&args.input)?)
    } else {
        if is_pipe {
            log::debug!("Skipping progress estimation for pipe input");
        } else if args.no_estimate_progress {
            log::debug!("Progress estimation disabled by --no-estimate-progress flag");
        }
        None
    };

    let pb = match multi {
        Some(multi) => Some(create_progress_bar(multi, total_frames)?),
        None => None,
    };

    let (tx, rx) = mpsc::channel();
    let config = DecoderThreadConfig {
        input_path: args.input.clone(),
        strict_mode: cli.strict,
        tx,
        pb_clone: pb.clone(),
    };
    let decode_thread = if args.fixed {
        spawn_decoder_thread::<Fixed>(config)
    } else {
        spawn_decoder_thread::<Float>(config)
    };

    let start_time = Instant::now();
    let mut writer: Option<AudioWriter> = None;
    let mut current_info = None;
    let mut decoded_frames = 0u64;
    let mut decoded_samples = 0u64;
    let mut sample_rate = 0u32;

    while let Ok(result) = rx.recv() {
        let decoded = match result {
            Ok(decoded) => decoded,
            Err(e) => {
                if let Some(pb) = &pb {
                    pb.finish_with_message("decode failed");
                }
                return Err(e);
            }
        };

        if current_info.is_none() {
            log::info!("Stream: {}", decoded.info);
        } else if current_info != Some(decoded.info) {
            log::warn!("Stream parameters changed: {}", decoded.info);
        }
        current_info = Some(decoded.info);

        if writer.is_none() {
            if let Some(ref base_path) = args.output {
                writer = Some(AudioWriter::create(base_path, args.format, &decoded.info)?);
            }
        }
        if let Some(ref mut writer) = writer {
            writer.write_pcm(&decoded.pcm)?;
        }

        let channels = decoded.info.channels() as u64;
        decoded_samples += decoded.pcm.len() as u64 / (2 * channels);
        decoded_frames += decoded.frames;
        sample_rate = decoded.info.sampling_frequency();

        if let Some(pb) = &pb {
            if decoded.muted {
                pb.set_message("decoding (some frames muted)");
            } else if decoded_frames % 30 < decoded.frames {
                pb.set_message(speed_message(decoded_samples, sample_rate, start_time));
            }
        }
    }

    if let Some(writer) = writer {
        writer.finish()?;
    }

    match decode_thread.join() {
        Ok(Ok(())) => {
            finalize_progress_bar(&pb, decoded_samples, sample_rate, start_time);
            if current_info.is_none() {
                log::warn!("No SBC frames found in the input");
            }
            log::info!("Decoding completed successfully: {decoded_frames} frames");
        }
        Ok(Err(e)) => {
            if let Some(pb) = &pb {
                pb.finish_with_message("decode failed");
            }
            return Err(e);
        }
        Err(_) => {
            if let Some(pb) = &pb {
                pb.finish_with_message("decode thread panicked");
            }
            return Err(anyhow::anyhow!("Decode thread panicked"));
        }
    }

    Ok(())
}

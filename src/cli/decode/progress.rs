use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::cli::scan::FrameScanner;
use crate::input::InputReader;
use crate::timestamp::duration_str;

const BAR_TEMPLATE: &str =
    "{bar:40.cyan/blue} {pos}/{len} frames ({percent}%)\n{msg} | elapsed: {elapsed_precise} | ETA: {eta_precise}";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {pos} frames\n{msg} | elapsed: {elapsed_precise}";

/// Walks the whole input once to count checked frames.
pub fn estimate_total_frames(input_path: &Path) -> Result<u64> {
    log::info!("Counting frames for progress estimation");
    let count_start = Instant::now();

    let mut input_reader = InputReader::new(input_path)?;
    let mut scanner = FrameScanner::default();
    let mut bytes_read = 0u64;

    input_reader.process_chunks(64 * 1024, |chunk| {
        bytes_read += chunk.len() as u64;
        scanner.push_bytes(chunk);
        scanner.by_ref().for_each(drop);
        Ok(true)
    })?;

    let frames = scanner.frames();
    let count_elapsed = count_start.elapsed();
    let read_speed_mbps = if count_elapsed.as_secs_f64() > 0.0 {
        (bytes_read as f64) / 1_000_000.0 / count_elapsed.as_secs_f64()
    } else {
        0.0
    };

    log::info!(
        "Found {frames} frames in {:.3}s ({:.1} MB/s, {} bytes)",
        count_elapsed.as_secs_f64(),
        read_speed_mbps,
        bytes_read
    );

    Ok(frames)
}

pub fn create_progress_bar(multi: &MultiProgress, total_frames: Option<u64>) -> Result<ProgressBar> {
    let pb = if let Some(total) = total_frames {
        let pb = multi.add(ProgressBar::new(total));
        pb.set_style(ProgressStyle::with_template(BAR_TEMPLATE)?);
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    } else {
        let pb = multi.add(ProgressBar::new_spinner());
        pb.set_style(ProgressStyle::with_template(SPINNER_TEMPLATE)?);
        pb
    };
    pb.set_message("initializing decoder");
    Ok(pb)
}

/// Formats decoding speed relative to real time and the stream position.
pub fn speed_message(decoded_samples: u64, sample_rate: u32, start_time: Instant) -> String {
    let elapsed = start_time.elapsed().as_secs_f64();
    let audio_secs = decoded_samples as f64 / sample_rate.max(1) as f64;
    let realtime_multiplier = if elapsed > 0.0 { audio_secs / elapsed } else { 0.0 };

    format!(
        "speed: {realtime_multiplier:.1}x | timestamp: {}",
        duration_str(decoded_samples, sample_rate)
    )
}

pub fn finalize_progress_bar(
    pb: &Option<ProgressBar>,
    decoded_samples: u64,
    sample_rate: u32,
    start_time: Instant,
) {
    if let Some(pb) = pb {
        pb.finish_with_message(speed_message(decoded_samples, sample_rate, start_time));
    }
}

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use anyhow::{Result, anyhow};
use indicatif::ProgressBar;

use crate::input::InputReader;
use sbc::process::Status;
use sbc::process::decode::Decoder;
use sbc::structs::stream_info::StreamInfo;
use sbc::utils::errors::SbcError;
use sbc::utils::numeric::Backend;

/// Output buffer handed to the decoder per call; holds 64 of the largest frames.
const PCM_BUFFER_LEN: usize = 64 * 16 * 8 * 2 * 2;

/// PCM produced by one decoder call.
pub struct DecodedChunk {
    pub info: StreamInfo,
    pub pcm: Vec<u8>,
    /// Frames covered by `pcm`, muted ones included.
    pub frames: u64,
    pub muted: bool,
}

pub struct DecoderThreadConfig {
    pub input_path: PathBuf,
    pub strict_mode: bool,
    pub tx: mpsc::Sender<Result<DecodedChunk>>,
    pub pb_clone: Option<ProgressBar>,
}

pub fn spawn_decoder_thread<B: Backend>(config: DecoderThreadConfig) -> thread::JoinHandle<Result<()>> {
    thread::spawn(move || -> Result<()> {
        let DecoderThreadConfig {
            input_path,
            strict_mode,
            tx,
            pb_clone,
        } = config;

        let mut decoder = Decoder::<B>::new();
        let mut pcm = vec![0u8; PCM_BUFFER_LEN];
        let mut frame_count = 0u64;
        let mut muted_count = 0u64;

        let mut input_reader = InputReader::new(&input_path)?;

        input_reader.process_chunks(64 * 1024, |chunk| {
            let mut input = chunk;

            loop {
                let progress = decoder.decode(input, &mut pcm);
                input = &input[progress.consumed..];

                let muted = matches!(progress.status, Status::Failed(_));
                if progress.produced > 0 {
                    if let Some(info) = decoder.stream_info().copied() {
                        let frames = (progress.produced / info.pcm_bytes_per_frame()).max(1) as u64;
                        frame_count += frames;
                        if let Some(pb) = &pb_clone {
                            pb.inc(frames);
                        }

                        let decoded = DecodedChunk {
                            info,
                            pcm: pcm[..progress.produced].to_vec(),
                            frames,
                            muted,
                        };
                        if tx.send(Ok(decoded)).is_err() {
                            return Ok(false);
                        }
                    }
                }

                match progress.status {
                    Status::Continue => break,
                    Status::Success => {}
                    Status::Failed(e @ SbcError::BufferTooSmall { .. }) => return Err(e.into()),
                    Status::Failed(e) => {
                        muted_count += 1;
                        if strict_mode {
                            let _ = tx.send(Err(anyhow!("Decode error after frame {frame_count}: {e}")));
                            return Ok(false);
                        }
                        log::warn!("Decode error after frame {frame_count}: {e}");
                    }
                }
            }

            Ok(true)
        })?;

        log::info!("Processing complete: {frame_count} frames, {muted_count} muted");
        Ok(())
    })
}

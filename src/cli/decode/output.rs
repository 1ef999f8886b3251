use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::cli::command::AudioFormat;
use crate::riff::{FormatChunk, WavWriter};
use sbc::structs::stream_info::StreamInfo;

/// Appends `expected_ext` unless the path already ends with it.
pub fn create_path_with_extension(base_path: &Path, expected_ext: &str) -> PathBuf {
    match base_path.extension() {
        Some(ext) if ext == expected_ext => base_path.to_path_buf(),
        Some(_) => {
            let mut name = base_path.as_os_str().to_os_string();
            name.push(".");
            name.push(expected_ext);
            PathBuf::from(name)
        }
        None => base_path.with_extension(expected_ext),
    }
}

pub enum AudioWriter {
    Pcm(BufWriter<Box<dyn Write>>),
    Wav(WavWriter<BufWriter<File>>),
}

impl AudioWriter {
    /// Opens the output for a stream described by `info`. `-` writes raw PCM
    /// to stdout.
    pub fn create(base_path: &Path, format: AudioFormat, info: &StreamInfo) -> Result<Self> {
        if base_path.as_os_str() == "-" {
            if format == AudioFormat::Wav {
                bail!("WAV output needs a seekable file; use --format pcm for stdout");
            }
            log::info!("Writing raw PCM to stdout");
            return Ok(AudioWriter::Pcm(BufWriter::new(Box::new(io::stdout().lock()))));
        }

        let ext = match format {
            AudioFormat::Wav => "wav",
            AudioFormat::Pcm => "pcm",
        };
        let path = create_path_with_extension(base_path, ext);
        log::info!("Creating audio file: {}", path.display());
        let file = File::create(&path)?;

        Ok(match format {
            AudioFormat::Wav => {
                let fmt = FormatChunk::pcm16(info.sampling_frequency(), info.channels() as u16);
                AudioWriter::Wav(WavWriter::new(BufWriter::new(file), &fmt)?)
            }
            AudioFormat::Pcm => AudioWriter::Pcm(BufWriter::new(Box::new(file))),
        })
    }

    pub fn write_pcm(&mut self, pcm: &[u8]) -> Result<()> {
        match self {
            AudioWriter::Pcm(writer) => writer.write_all(pcm)?,
            AudioWriter::Wav(writer) => writer.write_pcm(pcm)?,
        }
        Ok(())
    }

    pub fn finish(self) -> Result<()> {
        match self {
            AudioWriter::Pcm(mut writer) => writer.flush()?,
            AudioWriter::Wav(writer) => {
                let data_written = writer.data_written();
                writer.finish()?;
                log::debug!("WAV data chunk holds {data_written} bytes");
            }
        }
        Ok(())
    }
}

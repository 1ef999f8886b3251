//! RIFF/WAVE container for 16-bit PCM.

use std::io::{self, Read, Seek, SeekFrom, Write};

use anyhow::{Context, Result, bail};
use log::debug;

use crate::byteorder::WriteBytesLe;
use sbcd_macros::{ToBytes, riff_chunk_type};

pub const WAVE_FORMAT_PCM: u16 = 0x0001;
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Trailing 14 bytes of `KSDATAFORMAT_SUBTYPE_PCM`; the first two carry the format tag.
const SUBTYPE_GUID_TAIL: [u8; 14] = [
    0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71,
];

const HEADER_LEN: u64 = 12;
const CHUNK_HEADER_LEN: u64 = 8;
/// Largest `fmt ` body accepted; extensible headers need 40 bytes.
const MAX_FORMAT_LEN: u32 = 1024;

pub trait RiffChunk {
    fn chunk_id(&self) -> &[u8; 4];
    fn chunk_data(&self) -> Vec<u8>;

    fn write_all<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let data = self.chunk_data();
        let len = u32::try_from(data.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "RIFF chunk too large"))?;

        writer.write_all(self.chunk_id())?;
        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(&data)?;
        if len % 2 == 1 {
            writer.write_all(&[0])?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, ToBytes)]
#[riff_chunk_type(b"fmt ")]
pub struct FormatChunk {
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

impl FormatChunk {
    pub fn pcm16(sample_rate: u32, channels: u16) -> Self {
        Self {
            format_tag: WAVE_FORMAT_PCM,
            channels,
            sample_rate,
            byte_rate: sample_rate * channels as u32 * 2,
            block_align: channels * 2,
            bits_per_sample: 16,
        }
    }

    /// Parses a `fmt ` chunk body. Extensible headers are folded to their
    /// sub-format tag.
    pub fn parse(body: &[u8]) -> Result<Self> {
        if body.len() < 16 {
            bail!("fmt chunk too short: {} bytes", body.len());
        }

        let u16_at = |i: usize| u16::from_le_bytes([body[i], body[i + 1]]);
        let u32_at = |i: usize| u32::from_le_bytes([body[i], body[i + 1], body[i + 2], body[i + 3]]);

        let mut format_tag = u16_at(0);
        if format_tag == WAVE_FORMAT_EXTENSIBLE {
            if body.len() < 40 {
                bail!("extensible fmt chunk too short: {} bytes", body.len());
            }
            if body[26..40] != SUBTYPE_GUID_TAIL {
                bail!("unknown extensible sub-format");
            }
            format_tag = u16_at(24);
        }

        Ok(Self {
            format_tag,
            channels: u16_at(2),
            sample_rate: u32_at(4),
            byte_rate: u32_at(8),
            block_align: u16_at(12),
            bits_per_sample: u16_at(14),
        })
    }
}

/// Writes a RIFF/WAVE file whose sizes are patched in [`WavWriter::finish`].
pub struct WavWriter<W: Write + Seek> {
    writer: W,
    data_size_position: u64,
    data_written: u64,
}

impl<W: Write + Seek> WavWriter<W> {
    pub fn new(mut writer: W, format: &FormatChunk) -> io::Result<Self> {
        writer.write_all(b"RIFF")?;
        writer.write_all(&0u32.to_le_bytes())?;
        writer.write_all(b"WAVE")?;
        format.write_all(&mut writer)?;

        writer.write_all(b"data")?;
        let data_size_position = writer.stream_position()?;
        writer.write_all(&0u32.to_le_bytes())?;

        Ok(Self {
            writer,
            data_size_position,
            data_written: 0,
        })
    }

    pub fn write_pcm(&mut self, pcm: &[u8]) -> io::Result<()> {
        self.writer.write_all(pcm)?;
        self.data_written += pcm.len() as u64;
        Ok(())
    }

    pub fn data_written(&self) -> u64 {
        self.data_written
    }

    /// Pads the data chunk and fills in the RIFF and data sizes.
    pub fn finish(mut self) -> io::Result<W> {
        if self.data_written % 2 == 1 {
            self.writer.write_all(&[0])?;
        }
        let end = self.writer.stream_position()?;

        let too_large = |_| io::Error::new(io::ErrorKind::InvalidData, "WAV data exceeds 4 GiB");
        let data_size = u32::try_from(self.data_written).map_err(too_large)?;
        let riff_size = u32::try_from(end - CHUNK_HEADER_LEN).map_err(too_large)?;

        self.writer.seek(SeekFrom::Start(4))?;
        self.writer.write_all(&riff_size.to_le_bytes())?;
        self.writer.seek(SeekFrom::Start(self.data_size_position))?;
        self.writer.write_all(&data_size.to_le_bytes())?;
        self.writer.seek(SeekFrom::Start(end))?;
        self.writer.flush()?;

        Ok(self.writer)
    }
}

/// Reads the header of a RIFF/WAVE stream and then yields the bytes of its
/// `data` chunk through [`Read`].
pub struct WavReader<R: Read> {
    reader: R,
    format: FormatChunk,
    remaining: u64,
}

impl<R: Read> WavReader<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let mut header = [0u8; HEADER_LEN as usize];
        reader
            .read_exact(&mut header)
            .context("Input is too short for a RIFF header")?;
        if &header[0..4] != b"RIFF" || &header[8..12] != b"WAVE" {
            bail!("Input is not a RIFF/WAVE file");
        }

        let mut format = None;
        loop {
            let mut chunk = [0u8; CHUNK_HEADER_LEN as usize];
            reader
                .read_exact(&mut chunk)
                .context("RIFF file has no data chunk")?;
            let size = u32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
            let padded = size as u64 + (size as u64 & 1);

            match &chunk[0..4] {
                b"fmt " => {
                    if size > MAX_FORMAT_LEN {
                        bail!("fmt chunk too large: {size} bytes");
                    }
                    let mut body = vec![0u8; padded as usize];
                    reader.read_exact(&mut body)?;
                    format = Some(FormatChunk::parse(&body[..size as usize])?);
                }
                b"data" => {
                    let Some(format) = format else {
                        bail!("RIFF data chunk precedes the fmt chunk");
                    };
                    let remaining = if size == u32::MAX {
                        u64::MAX
                    } else {
                        size as u64
                    };

                    return Ok(Self {
                        reader,
                        format,
                        remaining,
                    });
                }
                id => {
                    debug!("Skipping RIFF chunk {:?} ({size} bytes)", String::from_utf8_lossy(id));
                    io::copy(&mut (&mut reader).take(padded), &mut io::sink())?;
                }
            }
        }
    }

    pub fn format(&self) -> &FormatChunk {
        &self.format
    }
}

impl<R: Read> Read for WavReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let max = buf.len().min(self.remaining.try_into().unwrap_or(usize::MAX));
        let n = self.reader.read(&mut buf[..max])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn writer_and_reader_agree() -> Result<()> {
        let format = FormatChunk::pcm16(44100, 2);
        let pcm: Vec<u8> = (0..=250u8).collect();

        let mut writer = WavWriter::new(Cursor::new(Vec::new()), &format)?;
        writer.write_pcm(&pcm[..100])?;
        writer.write_pcm(&pcm[100..])?;
        assert_eq!(writer.data_written(), 251);
        let bytes = writer.finish()?.into_inner();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize, bytes.len() - 8);
        assert_eq!(bytes.len(), 44 + 252);

        let mut reader = WavReader::new(Cursor::new(bytes))?;
        assert_eq!(reader.format(), &format);
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        assert_eq!(data, pcm);
        Ok(())
    }

    #[test]
    fn format_chunk_layout() {
        let format = FormatChunk::pcm16(48000, 1);
        assert_eq!(format.chunk_id(), b"fmt ");
        assert_eq!(
            format.chunk_data(),
            [1, 0, 1, 0, 0x80, 0xBB, 0, 0, 0x00, 0x77, 0x01, 0, 2, 0, 16, 0]
        );
    }

    #[test]
    fn reader_accepts_extensible_and_skips_unknown_chunks() -> Result<()> {
        let mut fmt = Vec::new();
        FormatChunk {
            format_tag: WAVE_FORMAT_EXTENSIBLE,
            ..FormatChunk::pcm16(32000, 2)
        }
        .write_le(&mut fmt);
        fmt.extend_from_slice(&22u16.to_le_bytes());
        fmt.extend_from_slice(&16u16.to_le_bytes());
        fmt.extend_from_slice(&3u32.to_le_bytes());
        fmt.extend_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
        fmt.extend_from_slice(&SUBTYPE_GUID_TAIL);

        let mut file = b"RIFF\0\0\0\0WAVE".to_vec();
        file.extend_from_slice(b"LIST");
        file.extend_from_slice(&3u32.to_le_bytes());
        file.extend_from_slice(&[1, 2, 3, 0]);
        file.extend_from_slice(b"fmt ");
        file.extend_from_slice(&(fmt.len() as u32).to_le_bytes());
        file.extend_from_slice(&fmt);
        file.extend_from_slice(b"data");
        file.extend_from_slice(&4u32.to_le_bytes());
        file.extend_from_slice(&[9, 8, 7, 6, 5, 4]);

        let mut reader = WavReader::new(Cursor::new(file))?;
        assert_eq!(reader.format(), &FormatChunk::pcm16(32000, 2));
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        assert_eq!(data, [9, 8, 7, 6]);
        Ok(())
    }

    #[test]
    fn reader_rejects_other_containers() {
        assert!(WavReader::new(Cursor::new(b"caff\0\x01\0\0".to_vec())).is_err());
        assert!(WavReader::new(Cursor::new(b"RIFF\0\0\0\0WAVE".to_vec())).is_err());
    }

    #[test]
    fn reader_rejects_oversized_format_chunk() {
        let mut file = b"RIFF\0\0\0\0WAVE".to_vec();
        file.extend_from_slice(b"fmt ");
        file.extend_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        file.extend_from_slice(&[0u8; 16]);

        let err = WavReader::new(Cursor::new(file)).err();
        assert!(err.is_some_and(|e| e.to_string().contains("too large")));
    }
}

use std::collections::VecDeque;

use sbc::structs::frame::{SYNC_WORD, frame_checksum, parse_header, side_info_len};
use sbc::structs::stream_info::StreamInfo;
use sbc::utils::errors::{HeaderError, SbcError};

/// A checked frame found by the [`FrameScanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedFrame {
    /// Byte offset of the sync word from the start of the stream.
    pub offset: u64,
    pub info: StreamInfo,
}

/// Walks frame boundaries of an SBC stream without synthesizing audio.
///
/// Bytes are fed with [`push_bytes`](FrameScanner::push_bytes) and frames
/// are pulled through [`Iterator`]. The iterator returns `None` once the
/// buffered bytes hold no further complete frame.
///
/// A frame length is only trusted after the frame check passes. On a mismatch
/// the scanner moves one byte past the sync word and searches again. Further
/// mismatches before the next good frame are not reported.
#[derive(Debug, Default)]
pub struct FrameScanner {
    buffer: VecDeque<u8>,
    offset: u64,
    frames: u64,
    checksum_errors: u64,
    resyncing: bool,
}

impl FrameScanner {
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend(data);
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn checksum_errors(&self) -> u64 {
        self.checksum_errors
    }

    fn advance(&mut self, n: usize) {
        self.buffer.drain(..n);
        self.offset += n as u64;
    }
}

impl Iterator for FrameScanner {
    type Item = Result<ScannedFrame, SbcError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(start) = self.buffer.iter().position(|&b| b == SYNC_WORD) else {
                let len = self.buffer.len();
                self.advance(len);
                return None;
            };
            self.advance(start);

            let head: Vec<u8> = self.buffer.iter().take(4).copied().collect();
            let info = match parse_header(&head) {
                Ok(info) => info,
                Err(SbcError::HeaderCorrupt(HeaderError::Truncated(_))) => return None,
                Err(_) => {
                    self.advance(1);
                    continue;
                }
            };

            let side_len = side_info_len(&info);
            if self.buffer.len() < side_len {
                return None;
            }

            let side_info = &self.buffer.make_contiguous()[..side_len];
            let expected = side_info[3];
            let offset = self.offset;
            let computed = match frame_checksum(side_info, &info) {
                Ok(computed) => computed,
                Err(_) => return None,
            };

            if computed != expected {
                self.advance(1);
                if self.resyncing {
                    continue;
                }
                self.resyncing = true;
                self.checksum_errors += 1;
                log::debug!("Checksum mismatch in frame at offset {offset}");
                return Some(Err(SbcError::ChecksumMismatch { expected, computed }));
            }

            let frame_len = info.frame_length();
            if self.buffer.len() < frame_len {
                return None;
            }
            self.advance(frame_len);

            self.resyncing = false;
            self.frames += 1;
            return Some(Ok(ScannedFrame { offset, info }));
        }
    }
}

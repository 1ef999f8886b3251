#![doc = include_str!("../README.md")]
//!
//! ## Technical Overview
//!
//! Encoder and decoder for the low-complexity sub-band codec used by
//! short-range audio links.
//!
//! ### Frame Organization
//!
//! **Side information**: a 4-byte header (sync word, configuration, bitpool,
//! CRC-8), an optional joint-stereo bitmap and one 4-bit scale factor per
//! channel and sub-band.
//! **Payload**: quantized sub-band samples, block by block, with widths derived
//! from the scale factors by the bit allocation. Nothing in the payload is
//! covered by the CRC.
//!
//! ### Configurations
//!
//! - 16, 32, 44.1 or 48 kHz
//! - mono, dual channel, stereo or joint stereo
//! - 4 or 8 sub-bands, 4 to 16 blocks per frame
//! - loudness or SNR bit allocation
//!
//! ### Numeric Back-ends
//!
//! The filterbanks and the quantizer are generic over
//! [`utils::numeric::Backend`]: [`utils::numeric::Float`] (the default) or
//! [`utils::numeric::Fixed`] 32-bit integer arithmetic.
//!
//! ## Quick Start
//!
//! ```rust
//! use sbc::process::{Status, decode::Decoder, encode::Encoder};
//! use sbc::structs::stream_info::StreamInfo;
//!
//! let info = StreamInfo::default();
//! let pcm = vec![0u8; info.pcm_bytes_per_frame() * 4];
//!
//! // Encode four frames of silence
//! let mut encoder = Encoder::<sbc::utils::numeric::Float>::new();
//! let mut stream = vec![0u8; sbc::frame_length(&info) * 4];
//! let progress = encoder.encode(&pcm, &info, &mut stream);
//! assert_eq!(progress.status, Status::Success);
//!
//! // Decode them again, feeding arbitrary chunks
//! let mut decoder = Decoder::<sbc::utils::numeric::Float>::new();
//! let mut out = vec![0u8; pcm.len()];
//! let mut produced = 0;
//! for chunk in stream.chunks(100) {
//!     let mut input = chunk;
//!     while !input.is_empty() {
//!         let progress = decoder.decode(input, &mut out[produced..]);
//!         input = &input[progress.consumed..];
//!         produced += progress.produced;
//!         if let Status::Failed(ref e) = progress.status {
//!             eprintln!("Muted frame: {e}");
//!         }
//!         if progress.status == Status::Success {
//!             break;
//!         }
//!     }
//! }
//! assert_eq!(produced, pcm.len());
//! ```

use crate::structs::stream_info::StreamInfo;

/// Encoding and decoding pipelines.
///
/// 1. **Analysis** ([`process::analysis`]): PCM to sub-band samples.
///
/// 2. **Quantization** ([`process::quantize`]): Scale factors, joint stereo and
///    code packing.
///
/// 3. **Synthesis** ([`process::synthesis`]): Sub-band samples to PCM.
///
/// 4. **Drivers** ([`process::encode`], [`process::decode`]): Frame-level encoder
///    and restartable decoder.
pub mod process;

/// Data structures of the SBC bitstream.
///
/// - **Stream Info** ([`structs::stream_info`]): Per-stream configuration
/// - **Frames** ([`structs::frame`]): Header, joint bitmap and scale factors
/// - **Bit Allocation** ([`structs::allocation`]): Bitpool distribution
pub mod structs;

/// Utility functions and supporting infrastructure.
///
/// - **Bitstream I/O** ([`utils::bitstream_io`]): Bit-level reading/writing
/// - **CRC Validation** ([`utils::crc`]): Frame check sequence
/// - **Error Handling** ([`utils::errors`]): Error types
/// - **Numeric Back-ends** ([`utils::numeric`]): Floating and fixed-point arithmetic
/// - **History** ([`utils::ring`]): Filter delay lines
/// - **Tables** ([`utils::tables`]): Prototype windows and allocation offsets
pub mod utils;

/// Length in bytes of every frame described by `info`.
pub fn frame_length(info: &StreamInfo) -> usize {
    info.frame_length()
}

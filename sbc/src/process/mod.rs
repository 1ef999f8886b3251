use crate::utils::errors::SbcError;

/// Polyphase analysis filterbank used by the encoder.
pub mod analysis;

/// Polyphase synthesis filterbank used by the decoder.
pub mod synthesis;

/// Scale factors, joint-stereo coding and sample code packing.
pub mod quantize;

/// PCM to SBC frames.
///
/// Provides the [`Encoder`](encode::Encoder), which turns interleaved 16-bit PCM
/// into complete frames for a given [`StreamInfo`](crate::structs::stream_info::StreamInfo).
pub mod encode;

/// SBC frames to PCM.
///
/// Provides the restartable [`Decoder`](decode::Decoder) state machine with
/// checksum verification and frame muting.
pub mod decode;

/// Outcome of one encode or decode call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Work stopped at a frame boundary because the output is full or the
    /// input holds no further complete frame.
    Success,
    /// All input was consumed; call again with more data.
    Continue,
    Failed(SbcError),
}

/// Bytes consumed from the input and produced into the output by one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub consumed: usize,
    pub produced: usize,
    pub status: Status,
}

impl Progress {
    pub(crate) fn new(consumed: usize, produced: usize, status: Status) -> Self {
        Self {
            consumed,
            produced,
            status,
        }
    }

    pub(crate) fn failed(consumed: usize, produced: usize, error: impl Into<SbcError>) -> Self {
        Self::new(consumed, produced, Status::Failed(error.into()))
    }
}

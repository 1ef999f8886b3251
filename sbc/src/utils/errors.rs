/// Errors reported through [`Status::Failed`](crate::process::Status::Failed).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SbcError {
    #[error("Invalid stream parameter: {0}")]
    InvalidParameter(#[from] ParameterError),

    #[error("Lost frame sync: too many consecutive sync padding bytes")]
    SyncLost,

    #[error("Corrupt frame header: {0}")]
    HeaderCorrupt(#[from] HeaderError),

    #[error("Frame check sequence mismatch: transmitted {expected:#04X}, computed {computed:#04X}")]
    ChecksumMismatch { expected: u8, computed: u8 },

    #[error("Buffer too small: {needed} bytes needed, {available} available")]
    BufferTooSmall { needed: usize, available: usize },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    #[error("channel mode must be 0-3. Got {0}")]
    ChannelMode(u8),

    #[error("sample rate index must be 0-3. Got {0}")]
    SampleRate(u8),

    #[error("allocation method must be 0 (loudness) or 1 (SNR). Got {0}")]
    AllocationMethod(u8),

    #[error("block count must be 4, 8, 12 or 16. Got {0}")]
    Blocks(u8),

    #[error("sub-band count must be 4 or 8. Got {0}")]
    Subbands(u8),

    #[error("bitpool must be between 1 and {max}. Got {bitpool}")]
    Bitpool { bitpool: u8, max: u8 },

    #[error("unsupported sample rate: {0} Hz")]
    SamplingFrequency(u32),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("missing sync word, found {0:#04X}")]
    SyncWord(u8),

    #[error("bitpool {bitpool} out of range for this mode (1..={max})")]
    Bitpool { bitpool: u8, max: u8 },

    #[error("frame header truncated: {0} bytes")]
    Truncated(usize),
}

//! Data structures describing SBC streams and frames.

pub mod allocation;
pub mod frame;
pub mod stream_info;

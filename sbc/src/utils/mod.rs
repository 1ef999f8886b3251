//! Utility functions and supporting infrastructure.
//!
//! Provides bitstream I/O, CRC validation, error types, numeric back-ends,
//! history windows and constant tables.

pub mod bitstream_io;
pub mod crc;
pub mod errors;
pub mod numeric;
pub mod ring;
pub mod tables;

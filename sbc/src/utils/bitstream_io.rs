//! Bitstream I/O utilities for frame parsing and packing.
//!
//! SBC frames are big-endian bit streams: the joint bitmap, the scale factors and
//! the quantized sample codes follow each other without byte alignment, so both
//! directions track a running bit cursor.

use std::io;
use std::io::SeekFrom;

use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter, UnsignedInteger};

use crate::utils::crc::Crc8;

#[derive(Debug)]
pub struct BitstreamIoReader<R: io::Read + io::Seek> {
    bs: BitReader<R, BigEndian>,
    len: u64,
}

pub type BsIoSliceReader<'a> = BitstreamIoReader<io::Cursor<&'a [u8]>>;

impl<R> BitstreamIoReader<R>
where
    R: io::Read + io::Seek,
{
    pub fn new(read: R, len_bytes: u64) -> Self {
        Self {
            bs: BitReader::new(read),
            len: len_bytes << 3,
        }
    }

    #[inline(always)]
    pub fn get(&mut self) -> io::Result<bool> {
        self.bs.read_bit()
    }

    #[inline(always)]
    pub fn get_n<I: UnsignedInteger>(&mut self, n: u32) -> io::Result<I> {
        match self.bs.read_unsigned_var(n) {
            Ok(val) => Ok(val),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "get_n({}): out of bounds bits at {}",
                    n,
                    self.bs.position_in_bits().unwrap_or(0)
                ),
            )),
            Err(e) => Err(e),
        }
    }

    /// Computes a CRC-8 over `len` bits starting at bit `start`, continuing from
    /// `checksum`. The read position is restored afterwards.
    pub fn crc8_check(
        &mut self,
        crc: &Crc8,
        mut checksum: u8,
        start: u64,
        len: u64,
    ) -> io::Result<u8> {
        let position = self.position()?;

        if start + len > self.len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "crc8_check: out of bounds bits",
            ));
        }

        self.bs.seek_bits(SeekFrom::Start(start))?;

        let prefix_len = ((8 - (start & 7)) & 7).min(len);
        let suffix_len = (len - prefix_len) & 7;
        let bytes_len = ((len - prefix_len - suffix_len) >> 3) as usize;

        if prefix_len != 0 {
            let prefix: u8 = self.bs.read_unsigned_var(prefix_len as u32)?;
            checksum = crc.update_bits(checksum, prefix << (8 - prefix_len), prefix_len as u32);
        }

        for _ in 0..bytes_len {
            let byte: u8 = self.bs.read_unsigned_var(8)?;
            checksum = crc.update(checksum, &[byte]);
        }

        if suffix_len != 0 {
            let suffix: u8 = self.bs.read_unsigned_var(suffix_len as u32)?;
            checksum = crc.update_bits(checksum, suffix << (8 - suffix_len), suffix_len as u32);
        }

        self.bs.seek_bits(SeekFrom::Start(position))?;

        Ok(checksum)
    }

    #[inline(always)]
    pub fn available(&mut self) -> io::Result<u64> {
        self.bs.position_in_bits().map(|pos| self.len - pos)
    }

    #[inline(always)]
    pub fn skip_n(&mut self, n: u32) -> io::Result<()> {
        self.available().and_then(|avail| {
            if n as u64 > avail {
                Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "skip_n: out of bounds bits",
                ))
            } else {
                self.bs.skip(n)
            }
        })
    }

    #[inline(always)]
    pub fn position(&mut self) -> io::Result<u64> {
        self.bs.position_in_bits()
    }
}

impl<'a> BsIoSliceReader<'a> {
    pub fn from_slice(buf: &'a [u8]) -> Self {
        let len = buf.len() as u64;
        let read = io::Cursor::new(buf);

        Self::new(read, len)
    }
}

impl Default for BsIoSliceReader<'_> {
    fn default() -> Self {
        Self::from_slice(&[])
    }
}

/// MSB-first bit packer backed by a growable byte buffer.
pub struct BitstreamIoWriter {
    bs: BitWriter<Vec<u8>, BigEndian>,
    bits: u64,
}

impl Default for BitstreamIoWriter {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl BitstreamIoWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bs: BitWriter::new(Vec::with_capacity(capacity)),
            bits: 0,
        }
    }

    #[inline(always)]
    pub fn put(&mut self, bit: bool) -> io::Result<()> {
        self.bits += 1;
        self.bs.write_bit(bit)
    }

    #[inline(always)]
    pub fn put_n<I: UnsignedInteger>(&mut self, n: u32, value: I) -> io::Result<()> {
        if n == 0 {
            return Ok(());
        }
        self.bits += n as u64;
        self.bs.write_unsigned_var(n, value)
    }

    /// Number of bits written so far.
    #[inline(always)]
    pub fn position(&self) -> u64 {
        self.bits
    }

    /// Pads with zero bits up to the next byte boundary and returns the bytes.
    pub fn into_bytes(mut self) -> io::Result<Vec<u8>> {
        self.bs.byte_align()?;
        Ok(self.bs.into_writer())
    }
}

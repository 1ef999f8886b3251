/// Little-endian serialization used by RIFF chunk payloads.
pub trait WriteBytesLe {
    fn write_le(&self, dst: &mut Vec<u8>);
}

macro_rules! impl_num_le {
    ($($t:ty),+) => { $(
        impl WriteBytesLe for $t { #[inline] fn write_le(&self, dst: &mut Vec<u8>) { dst.extend_from_slice(&self.to_le_bytes()); }}
    )+ }
}

impl_num_le!(u8, u16, i16, u32, u64);

impl<T: WriteBytesLe, const N: usize> WriteBytesLe for [T; N] {
    #[inline]
    fn write_le(&self, dst: &mut Vec<u8>) {
        self.iter().for_each(|item| item.write_le(dst));
    }
}

#[cfg(test)]
mod tests {
    use crate::byteorder::WriteBytesLe;
    use sbcd_macros::ToBytes;

    #[derive(ToBytes)]
    struct Mini {
        a: u16,
        b: u32,
        tag: [u8; 4],
    }

    #[derive(ToBytes)]
    struct Pair(i16, u8);

    #[test]
    fn derived_fields_are_little_endian() {
        let mini = Mini {
            a: 0x1234,
            b: 0xABCDEF01,
            tag: *b"data",
        };
        let mut bytes = Vec::new();
        mini.write_le(&mut bytes);
        assert_eq!(bytes, [0x34, 0x12, 0x01, 0xEF, 0xCD, 0xAB, b'd', b'a', b't', b'a']);

        bytes.clear();
        Pair(-2, 7).write_le(&mut bytes);
        assert_eq!(bytes, [0xFE, 0xFF, 7]);
    }
}

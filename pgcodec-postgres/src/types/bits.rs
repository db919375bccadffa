use pgcodec_core::error::{BoxDynError, Error};
use pgcodec_core::io::BufExt;

use crate::arguments::PgArgumentBuffer;
use crate::types::WireValue;

/// A `BIT(n)` or `BIT VARYING` string.
///
/// Bits are packed most significant first; unused trailing bits of the last byte are zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PgBits {
    pub bytes: Vec<u8>,
    pub len: i32,
}

crate::impl_host_scalar!(PgBits);

impl PgBits {
    /// Bit `i`, counting from the most significant bit of the first byte.
    pub fn get(&self, i: usize) -> Option<bool> {
        if i >= self.bit_len() {
            return None;
        }

        Some(self.bytes.get(i / 8)? & (0x80 >> (i % 8)) != 0)
    }

    fn bit_len(&self) -> usize {
        usize::try_from(self.len).unwrap_or_default()
    }

    fn check(&self) -> Result<(), BoxDynError> {
        if self.len < 0 || self.bytes.len() != self.bit_len().div_ceil(8) {
            return Err(Error::protocol(format!(
                "bit string of {} bits does not fit in {} bytes",
                self.len,
                self.bytes.len()
            ))
            .into());
        }

        Ok(())
    }
}

impl FromIterator<bool> for PgBits {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut bits = PgBits::default();
        let mut n = 0_usize;

        for bit in iter {
            if n % 8 == 0 {
                bits.bytes.push(0);
            }

            if bit {
                if let Some(last) = bits.bytes.last_mut() {
                    *last |= 0x80 >> (n % 8);
                }
            }

            n += 1;
        }

        bits.len = i32::try_from(n).unwrap_or(i32::MAX);
        bits
    }
}

impl WireValue for PgBits {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        self.check()?;

        buf.extend(&self.len.to_be_bytes());
        buf.extend_from_slice(&self.bytes);

        Ok(())
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        self.check()?;

        let s: String = (0..self.bit_len())
            .map(|i| if self.get(i) == Some(true) { '1' } else { '0' })
            .collect();

        buf.put_str(&s);
        Ok(())
    }

    fn decode_binary(mut src: &[u8]) -> Result<Self, BoxDynError> {
        let len = src.try_get_i32()?;

        let bits = PgBits {
            bytes: src.to_vec(),
            len,
        };

        bits.check()?;
        Ok(bits)
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        src.chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                _ => Err(format!("invalid bit string: {src:?}").into()),
            })
            .collect()
    }
}

scalar_codec!(
    /// `bit` and `varbit`.
    BitsCodec, PgBits, Bits
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_binary() {
        let bits = PgBits::decode_text("1010000011").unwrap();
        assert_eq!(bits.bytes, [0b1010_0000, 0b1100_0000]);
        assert_eq!(bits.len, 10);

        let mut buf = PgArgumentBuffer::new();
        bits.encode_binary(&mut buf).unwrap();
        assert_eq!(&buf[..], [0, 0, 0, 10, 0b1010_0000, 0b1100_0000]);

        assert!(PgBits::decode_binary(&[0, 0, 0, 9, 0xff]).is_err());
    }

    #[test]
    fn test_bits_text() {
        let bits = PgBits {
            bytes: vec![0b0110_0000],
            len: 3,
        };

        let mut buf = PgArgumentBuffer::new();
        bits.encode_text(&mut buf).unwrap();
        assert_eq!(&buf[..], b"011");

        assert!(PgBits::decode_text("012").is_err());
        assert_eq!(PgBits::decode_text("").unwrap(), PgBits::default());
    }
}

use std::ops::{Deref, DerefMut};

use pgcodec_core::error::BoxDynError;
use pgcodec_core::IsNull;

/// Append-only output buffer handed to every [`EncodePlan`][crate::EncodePlan].
///
/// A plan that returns [`IsNull::Yes`] must not have written anything; the caller writes the
/// protocol-level `NULL` marker (a length of `-1`) instead of a payload.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct PgArgumentBuffer {
    buffer: Vec<u8>,
}

impl PgArgumentBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    pub fn put_str(&mut self, s: &str) {
        self.buffer.extend_from_slice(s.as_bytes());
    }

    /// Reserve an `int4` length prefix, run `f`, then patch the prefix with the number of bytes
    /// `f` wrote, or with `-1` if `f` reported `NULL`.
    pub fn encode_len_prefixed<F>(&mut self, f: F) -> Result<IsNull, BoxDynError>
    where
        F: FnOnce(&mut PgArgumentBuffer) -> Result<IsNull, BoxDynError>,
    {
        let offset = self.len();
        self.extend_from_slice(&[0; 4]);

        let len = match f(self)? {
            IsNull::No => value_size_int4_checked(self.len() - offset - 4)?,
            IsNull::Yes => {
                // It is illegal for a plan to write any data for NULL
                debug_assert_eq!(self.len(), offset + 4);
                self.truncate(offset + 4);
                -1_i32
            }
        };

        self[offset..(offset + 4)].copy_from_slice(&len.to_be_bytes());

        Ok(IsNull::No)
    }
}

impl From<Vec<u8>> for PgArgumentBuffer {
    fn from(buffer: Vec<u8>) -> Self {
        Self { buffer }
    }
}

impl Deref for PgArgumentBuffer {
    type Target = Vec<u8>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl DerefMut for PgArgumentBuffer {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer
    }
}

pub(crate) fn value_size_int4_checked(size: usize) -> Result<i32, String> {
    i32::try_from(size).map_err(|_| {
        format!(
            "value size would overflow in the binary protocol encoding: {size} > {}",
            i32::MAX
        )
    })
}

/// Write an `int4` count or length after checking it fits.
pub(crate) fn put_len(buf: &mut PgArgumentBuffer, len: usize) -> Result<(), BoxDynError> {
    buf.extend_from_slice(&value_size_int4_checked(len)?.to_be_bytes());
    Ok(())
}

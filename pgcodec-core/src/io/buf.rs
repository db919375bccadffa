use bytes::Buf;

use crate::error::Error;

/// Bounds-checked reads over a borrowed wire payload.
///
/// [`Buf`] panics when asked for more bytes than remain; every read here returns a
/// [`Error::Protocol`] instead so a truncated payload never decodes partially.
#[allow(clippy::module_name_repetitions)]
pub trait BufExt<'a>: Sized {
    fn try_get_bytes(&mut self, n: usize) -> Result<&'a [u8], Error>;

    fn try_get_u8(&mut self) -> Result<u8, Error>;

    fn try_get_i16(&mut self) -> Result<i16, Error>;

    fn try_get_u16(&mut self) -> Result<u16, Error>;

    fn try_get_i32(&mut self) -> Result<i32, Error>;

    fn try_get_u32(&mut self) -> Result<u32, Error>;

    fn try_get_i64(&mut self) -> Result<i64, Error>;

    fn try_get_f64(&mut self) -> Result<f64, Error>;

    /// Read an `int4` length followed by that many bytes; a length of `-1` is `NULL`.
    fn try_get_len_prefixed(&mut self) -> Result<Option<&'a [u8]>, Error>;
}

fn ensure(buf: &[u8], n: usize) -> Result<(), Error> {
    if buf.len() < n {
        return Err(err_protocol!(
            "payload truncated: expected {} more bytes, found {}",
            n,
            buf.len()
        ));
    }

    Ok(())
}

impl<'a> BufExt<'a> for &'a [u8] {
    fn try_get_bytes(&mut self, n: usize) -> Result<&'a [u8], Error> {
        ensure(self, n)?;

        let buf: &'a [u8] = *self;
        let (head, tail) = buf.split_at(n);
        *self = tail;

        Ok(head)
    }

    fn try_get_u8(&mut self) -> Result<u8, Error> {
        ensure(self, 1)?;
        Ok(self.get_u8())
    }

    fn try_get_i16(&mut self) -> Result<i16, Error> {
        ensure(self, 2)?;
        Ok(self.get_i16())
    }

    fn try_get_u16(&mut self) -> Result<u16, Error> {
        ensure(self, 2)?;
        Ok(self.get_u16())
    }

    fn try_get_i32(&mut self) -> Result<i32, Error> {
        ensure(self, 4)?;
        Ok(self.get_i32())
    }

    fn try_get_u32(&mut self) -> Result<u32, Error> {
        ensure(self, 4)?;
        Ok(self.get_u32())
    }

    fn try_get_i64(&mut self) -> Result<i64, Error> {
        ensure(self, 8)?;
        Ok(self.get_i64())
    }

    fn try_get_f64(&mut self) -> Result<f64, Error> {
        ensure(self, 8)?;
        Ok(self.get_f64())
    }

    fn try_get_len_prefixed(&mut self) -> Result<Option<&'a [u8]>, Error> {
        let len = BufExt::try_get_i32(self)?;

        if len == -1 {
            return Ok(None);
        }

        let len = usize::try_from(len)
            .map_err(|_| err_protocol!("invalid negative length prefix: {}", len))?;

        self.try_get_bytes(len).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::BufExt;

    #[test]
    fn test_len_prefixed() {
        let data = hex::decode("00000003616263ffffffff").unwrap();
        let mut buf = &data[..];

        assert_eq!(buf.try_get_len_prefixed().unwrap(), Some(&b"abc"[..]));
        assert_eq!(buf.try_get_len_prefixed().unwrap(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_truncated_payload_is_an_error() {
        let mut buf = &[0_u8, 0, 0, 5, b'a'][..];

        let err = buf.try_get_len_prefixed().unwrap_err();
        assert!(err.to_string().contains("truncated"), "{err}");

        let mut short = &[1_u8, 2, 3][..];
        assert!(short.try_get_i32().is_err());
    }

    #[test]
    fn test_negative_length_is_rejected() {
        let mut buf = &[0xff_u8, 0xff, 0xff, 0xfe][..];
        assert!(buf.try_get_len_prefixed().is_err());
    }
}

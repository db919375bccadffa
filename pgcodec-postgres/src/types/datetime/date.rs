use byteorder::{BigEndian, ByteOrder};
use chrono::{NaiveDate, TimeDelta};
use pgcodec_core::error::{BoxDynError, Error};

use super::{infinite, parse_ymd, postgres_epoch_date, strip_era, write_ymd};
use crate::arguments::PgArgumentBuffer;
use crate::plan::expect_len;
use crate::types::WireValue;

/// A `DATE`, including the special values `infinity` and `-infinity`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PgDate {
    Finite(NaiveDate),
    Infinity,
    NegativeInfinity,
}

impl Default for PgDate {
    fn default() -> Self {
        PgDate::Finite(NaiveDate::default())
    }
}

crate::impl_host_scalar!(PgDate);

impl From<NaiveDate> for PgDate {
    fn from(date: NaiveDate) -> Self {
        PgDate::Finite(date)
    }
}

impl TryFrom<PgDate> for NaiveDate {
    type Error = BoxDynError;

    fn try_from(date: PgDate) -> Result<Self, Self::Error> {
        match date {
            PgDate::Finite(date) => Ok(date),
            _ => Err(infinite("date", "NaiveDate")),
        }
    }
}

impl WireValue for PgDate {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        // DATE is encoded as the days since epoch
        let days = match self {
            PgDate::Finite(date) => {
                let days = (*date - postgres_epoch_date()).num_days();
                i32::try_from(days)
                    .map_err(|_| Error::overflow(format!("{date} is out of range for date")))?
            }
            PgDate::Infinity => i32::MAX,
            PgDate::NegativeInfinity => i32::MIN,
        };

        buf.extend(&days.to_be_bytes());
        Ok(())
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        match self {
            PgDate::Finite(date) => {
                let mut out = String::with_capacity(13);
                if write_ymd(&mut out, *date) {
                    out.push_str(" BC");
                }
                buf.put_str(&out);
            }
            PgDate::Infinity => buf.put_str("infinity"),
            PgDate::NegativeInfinity => buf.put_str("-infinity"),
        }

        Ok(())
    }

    fn decode_binary(src: &[u8]) -> Result<Self, BoxDynError> {
        expect_len(src, 4, "date")?;

        Ok(match BigEndian::read_i32(src) {
            i32::MAX => PgDate::Infinity,
            i32::MIN => PgDate::NegativeInfinity,
            days => postgres_epoch_date()
                .checked_add_signed(TimeDelta::days(days.into()))
                .map(PgDate::Finite)
                .ok_or_else(|| Error::overflow(format!("date offset {days} is out of range")))?,
        })
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        match src {
            "infinity" => Ok(PgDate::Infinity),
            "-infinity" => Ok(PgDate::NegativeInfinity),
            _ => {
                let (src, bc) = strip_era(src);
                parse_ymd(src, bc).map(PgDate::Finite)
            }
        }
    }
}

scalar_codec!(
    /// `date`.
    DateCodec, PgDate, Date
);

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> PgDate {
        PgDate::Finite(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_encode_date() {
        let mut buf = PgArgumentBuffer::new();
        date(2000, 1, 1).encode_binary(&mut buf).unwrap();
        assert_eq!(&buf[..], [0, 0, 0, 0]);
        buf.clear();

        date(2001, 1, 2).encode_binary(&mut buf).unwrap();
        assert_eq!(&buf[..], [0, 0, 1, 111]);
        buf.clear();

        PgDate::Infinity.encode_binary(&mut buf).unwrap();
        assert_eq!(&buf[..], [0x7f, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_decode_date() {
        assert_eq!(
            PgDate::decode_binary(&[0xff, 0xff, 0xff, 0xff]).unwrap(),
            date(1999, 12, 31)
        );
        assert_eq!(PgDate::decode_text("2020-02-29").unwrap(), date(2020, 2, 29));
        assert_eq!(PgDate::decode_text("0044-03-15 BC").unwrap(), date(-43, 3, 15));
        assert_eq!(
            PgDate::decode_text("-infinity").unwrap(),
            PgDate::NegativeInfinity
        );
        assert!(PgDate::decode_text("2021-02-29").is_err());
    }

    #[test]
    fn test_date_text_bc() {
        let mut buf = PgArgumentBuffer::new();
        date(-43, 3, 15).encode_text(&mut buf).unwrap();
        assert_eq!(&buf[..], b"0044-03-15 BC");
    }
}

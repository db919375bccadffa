use byteorder::{BigEndian, ByteOrder};
use chrono::{NaiveTime, Timelike};
use pgcodec_core::error::{BoxDynError, Error};

use super::{parse_time_of_day, write_time_of_day, MICROS_PER_DAY, MICROS_PER_SECOND};
use crate::arguments::PgArgumentBuffer;
use crate::plan::expect_len;
use crate::types::WireValue;

/// A `TIME` (without time zone): microseconds since midnight, from `00:00:00` up to and
/// including `24:00:00`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct PgTime {
    pub microseconds: i64,
}

crate::impl_host_scalar!(PgTime);

impl PgTime {
    fn checked(microseconds: i64) -> Result<Self, BoxDynError> {
        if !(0..=MICROS_PER_DAY).contains(&microseconds) {
            return Err(Error::overflow(format!("{microseconds} is out of range for time")).into());
        }

        Ok(PgTime { microseconds })
    }
}

impl From<NaiveTime> for PgTime {
    fn from(time: NaiveTime) -> Self {
        PgTime {
            microseconds: i64::from(time.num_seconds_from_midnight()) * MICROS_PER_SECOND
                + i64::from(time.nanosecond() / 1_000),
        }
    }
}

impl TryFrom<PgTime> for NaiveTime {
    type Error = BoxDynError;

    fn try_from(time: PgTime) -> Result<Self, Self::Error> {
        let secs = u32::try_from(time.microseconds / MICROS_PER_SECOND)?;
        let nanos = u32::try_from(time.microseconds % MICROS_PER_SECOND)? * 1_000;

        NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos).ok_or_else(|| {
            Error::overflow(format!(
                "{} microseconds is out of range for NaiveTime",
                time.microseconds
            ))
            .into()
        })
    }
}

impl WireValue for PgTime {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        // TIME is encoded as the microseconds since midnight
        buf.extend(&Self::checked(self.microseconds)?.microseconds.to_be_bytes());
        Ok(())
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        let mut out = String::with_capacity(15);
        write_time_of_day(&mut out, Self::checked(self.microseconds)?.microseconds);
        buf.put_str(&out);
        Ok(())
    }

    fn decode_binary(src: &[u8]) -> Result<Self, BoxDynError> {
        expect_len(src, 8, "time")?;
        Self::checked(BigEndian::read_i64(src))
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        Self::checked(parse_time_of_day(src)?)
    }
}

scalar_codec!(
    /// `time`.
    TimeCodec, PgTime, Time
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_conversions() {
        let time = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap();
        let pg = PgTime::from(time);

        assert_eq!(pg.microseconds, MICROS_PER_DAY - 1);
        assert_eq!(NaiveTime::try_from(pg).unwrap(), time);

        // 24:00:00 is valid for postgres but has no `NaiveTime`
        let midnight = PgTime::decode_text("24:00:00").unwrap();
        assert!(NaiveTime::try_from(midnight).is_err());
    }

    #[test]
    fn test_time_out_of_range() {
        let mut buf = PgArgumentBuffer::new();
        let late = PgTime {
            microseconds: MICROS_PER_DAY + 1,
        };

        assert!(late.encode_binary(&mut buf).is_err());
        assert!(PgTime::decode_text("25:00:00").is_err());
    }
}

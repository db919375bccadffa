use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use pgcodec_core::error::{BoxDynError, Error};

use super::{
    infinite, parse_time_of_day, parse_ymd, postgres_epoch_datetime, strip_era,
    write_time_of_day, write_ymd, PgTime, MICROS_PER_SECOND,
};
use crate::arguments::PgArgumentBuffer;
use crate::plan::expect_len;
use crate::types::WireValue;

/// A `TIMESTAMP` (without time zone), including `infinity` and `-infinity`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PgTimestamp {
    Finite(NaiveDateTime),
    Infinity,
    NegativeInfinity,
}

/// A `TIMESTAMPTZ`, including `infinity` and `-infinity`.
///
/// The server stores an instant; its text output is always rendered in UTC here.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PgTimestamptz {
    Finite(DateTime<Utc>),
    Infinity,
    NegativeInfinity,
}

impl Default for PgTimestamp {
    fn default() -> Self {
        PgTimestamp::Finite(NaiveDateTime::default())
    }
}

impl Default for PgTimestamptz {
    fn default() -> Self {
        PgTimestamptz::Finite(DateTime::default())
    }
}

crate::impl_host_scalar!(PgTimestamp, PgTimestamptz);

impl From<NaiveDateTime> for PgTimestamp {
    fn from(ts: NaiveDateTime) -> Self {
        PgTimestamp::Finite(ts)
    }
}

impl From<DateTime<Utc>> for PgTimestamptz {
    fn from(ts: DateTime<Utc>) -> Self {
        PgTimestamptz::Finite(ts)
    }
}

impl TryFrom<PgTimestamp> for NaiveDateTime {
    type Error = BoxDynError;

    fn try_from(ts: PgTimestamp) -> Result<Self, Self::Error> {
        match ts {
            PgTimestamp::Finite(ts) => Ok(ts),
            _ => Err(infinite("timestamp", "NaiveDateTime")),
        }
    }
}

impl TryFrom<PgTimestamptz> for DateTime<Utc> {
    type Error = BoxDynError;

    fn try_from(ts: PgTimestamptz) -> Result<Self, Self::Error> {
        match ts {
            PgTimestamptz::Finite(ts) => Ok(ts),
            _ => Err(infinite("timestamptz", "DateTime<Utc>")),
        }
    }
}

/// The three states both timestamp types share, so the wire code is written once.
enum Instant {
    Finite(NaiveDateTime),
    Infinity,
    NegativeInfinity,
}

fn encode_binary(ts: Instant, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
    // TIMESTAMP is encoded as the microseconds since the epoch
    let micros = match ts {
        Instant::Finite(ts) => (ts - postgres_epoch_datetime())
            .num_microseconds()
            .ok_or_else(|| Error::overflow(format!("{ts} is out of range for timestamp")))?,
        Instant::Infinity => i64::MAX,
        Instant::NegativeInfinity => i64::MIN,
    };

    buf.extend(&micros.to_be_bytes());
    Ok(())
}

fn decode_binary(src: &[u8]) -> Result<Instant, BoxDynError> {
    expect_len(src, 8, "timestamp")?;

    Ok(match BigEndian::read_i64(src) {
        i64::MAX => Instant::Infinity,
        i64::MIN => Instant::NegativeInfinity,
        micros => postgres_epoch_datetime()
            .checked_add_signed(TimeDelta::microseconds(micros))
            .map(Instant::Finite)
            .ok_or_else(|| Error::overflow(format!("timestamp offset {micros} is out of range")))?,
    })
}

fn encode_text(ts: Instant, utc_suffix: bool, buf: &mut PgArgumentBuffer) {
    let ts = match ts {
        Instant::Finite(ts) => ts,
        Instant::Infinity => return buf.put_str("infinity"),
        Instant::NegativeInfinity => return buf.put_str("-infinity"),
    };

    let mut out = String::with_capacity(32);
    let bc = write_ymd(&mut out, ts.date());

    out.push(' ');

    write_time_of_day(&mut out, PgTime::from(ts.time()).microseconds);

    if utc_suffix {
        out.push_str("+00");
    }

    if bc {
        out.push_str(" BC");
    }

    buf.put_str(&out);
}

/// Parse `YYYY-MM-DD HH:MM:SS[.f][offset][ BC]`; returns the local time and the offset in
/// seconds east of UTC, if one was given.
fn decode_text(src: &str) -> Result<(Instant, Option<i64>), BoxDynError> {
    match src {
        "infinity" => return Ok((Instant::Infinity, None)),
        "-infinity" => return Ok((Instant::NegativeInfinity, None)),
        _ => {}
    }

    let (s, bc) = strip_era(src);

    let (date, time) = s
        .split_once([' ', 'T'])
        .ok_or_else(|| format!("invalid timestamp: {src:?}"))?;

    let (time, offset) = match time.find(['+', '-', 'Z']) {
        Some(at) => (&time[..at], Some(parse_offset(&time[at..])?)),
        None => (time, None),
    };

    let micros = parse_time_of_day(time)?;
    let local = parse_ymd(date, bc)?
        .and_time(NaiveTime::default())
        .checked_add_signed(TimeDelta::microseconds(micros))
        .ok_or_else(|| format!("invalid timestamp: {src:?}"))?;

    Ok((Instant::Finite(local), offset))
}

/// Parse `Z` or `±HH[:MM[:SS]]` into seconds east of UTC.
fn parse_offset(s: &str) -> Result<i64, BoxDynError> {
    let invalid = || BoxDynError::from(format!("invalid time zone offset: {s:?}"));

    if s == "Z" {
        return Ok(0);
    }

    let (sign, rest) = match s.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(invalid()),
    };

    let mut seconds = 0;
    let mut unit = 3600;
    for part in rest.split(':') {
        if unit == 0 || part.len() != 2 {
            return Err(invalid());
        }

        seconds += part.parse::<i64>().map_err(|_| invalid())? * unit;
        unit /= 60;
    }

    Ok(sign * seconds)
}

impl WireValue for PgTimestamp {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        encode_binary(self.into(), buf)
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        encode_text(self.into(), false, buf);
        Ok(())
    }

    fn decode_binary(src: &[u8]) -> Result<Self, BoxDynError> {
        Ok(decode_binary(src)?.into())
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        // an offset is accepted and ignored, as the server does for `timestamp` input
        Ok(decode_text(src)?.0.into())
    }
}

impl WireValue for PgTimestamptz {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        encode_binary(self.into(), buf)
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        encode_text(self.into(), true, buf);
        Ok(())
    }

    fn decode_binary(src: &[u8]) -> Result<Self, BoxDynError> {
        Ok(decode_binary(src)?.into())
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        let (local, offset) = decode_text(src)?;

        let utc = match (local, offset) {
            (Instant::Finite(local), Some(offset)) => Instant::Finite(
                local
                    .checked_sub_signed(TimeDelta::microseconds(offset * MICROS_PER_SECOND))
                    .ok_or_else(|| format!("invalid timestamptz: {src:?}"))?,
            ),
            (local, _) => local,
        };

        Ok(utc.into())
    }
}

impl From<&PgTimestamp> for Instant {
    fn from(ts: &PgTimestamp) -> Self {
        match *ts {
            PgTimestamp::Finite(ts) => Instant::Finite(ts),
            PgTimestamp::Infinity => Instant::Infinity,
            PgTimestamp::NegativeInfinity => Instant::NegativeInfinity,
        }
    }
}

impl From<&PgTimestamptz> for Instant {
    fn from(ts: &PgTimestamptz) -> Self {
        match *ts {
            PgTimestamptz::Finite(ts) => Instant::Finite(ts.naive_utc()),
            PgTimestamptz::Infinity => Instant::Infinity,
            PgTimestamptz::NegativeInfinity => Instant::NegativeInfinity,
        }
    }
}

impl From<Instant> for PgTimestamp {
    fn from(ts: Instant) -> Self {
        match ts {
            Instant::Finite(ts) => PgTimestamp::Finite(ts),
            Instant::Infinity => PgTimestamp::Infinity,
            Instant::NegativeInfinity => PgTimestamp::NegativeInfinity,
        }
    }
}

impl From<Instant> for PgTimestamptz {
    fn from(ts: Instant) -> Self {
        match ts {
            Instant::Finite(ts) => PgTimestamptz::Finite(ts.and_utc()),
            Instant::Infinity => PgTimestamptz::Infinity,
            Instant::NegativeInfinity => PgTimestamptz::NegativeInfinity,
        }
    }
}

scalar_codec!(
    /// `timestamp`.
    TimestampCodec, PgTimestamp, Timestamp
);

scalar_codec!(
    /// `timestamptz`.
    TimestamptzCodec, PgTimestamptz, Timestamptz, database_value = native
);

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn datetime(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, us: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_micro_opt(h, mi, s, us)
            .unwrap()
    }

    #[test]
    fn test_encode_timestamp() {
        let mut buf = PgArgumentBuffer::new();
        PgTimestamp::Finite(datetime(2000, 1, 1, 0, 0, 1, 0))
            .encode_binary(&mut buf)
            .unwrap();
        assert_eq!(&buf[..], 1_000_000_i64.to_be_bytes());
        buf.clear();

        PgTimestamp::NegativeInfinity.encode_binary(&mut buf).unwrap();
        assert_eq!(&buf[..], i64::MIN.to_be_bytes());
        buf.clear();

        PgTimestamp::Finite(datetime(2024, 2, 29, 13, 5, 9, 250_000))
            .encode_text(&mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"2024-02-29 13:05:09.25");
    }

    #[test]
    fn test_decode_timestamp() {
        assert_eq!(
            PgTimestamp::decode_binary(&(-1_i64).to_be_bytes()).unwrap(),
            PgTimestamp::Finite(datetime(1999, 12, 31, 23, 59, 59, 999_999))
        );

        assert_eq!(
            PgTimestamp::decode_text("2024-02-29T13:05:09.25").unwrap(),
            PgTimestamp::Finite(datetime(2024, 2, 29, 13, 5, 9, 250_000))
        );

        assert_eq!(
            PgTimestamp::decode_text("infinity").unwrap(),
            PgTimestamp::Infinity
        );

        assert!(PgTimestamp::decode_text("2024-02-29").is_err());
    }

    #[test]
    fn test_timestamptz_text_offsets() {
        let expected = PgTimestamptz::Finite(datetime(2024, 1, 1, 10, 0, 0, 0).and_utc());

        assert_eq!(
            PgTimestamptz::decode_text("2024-01-01 10:00:00+00").unwrap(),
            expected
        );
        assert_eq!(
            PgTimestamptz::decode_text("2024-01-01 12:30:00+02:30").unwrap(),
            expected
        );
        assert_eq!(
            PgTimestamptz::decode_text("2024-01-01 05:00:00-05").unwrap(),
            expected
        );

        let mut buf = PgArgumentBuffer::new();
        expected.encode_text(&mut buf).unwrap();
        assert_eq!(&buf[..], b"2024-01-01 10:00:00+00");
    }

    #[test]
    fn test_timestamp_bc() {
        let ts = PgTimestamp::decode_text("0044-03-15 12:00:00 BC").unwrap();
        assert_eq!(ts, PgTimestamp::Finite(datetime(-43, 3, 15, 12, 0, 0, 0)));

        let mut buf = PgArgumentBuffer::new();
        PgTimestamptz::Finite(datetime(-43, 3, 15, 12, 0, 0, 0).and_utc())
            .encode_text(&mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"0044-03-15 12:00:00+00 BC");
    }
}

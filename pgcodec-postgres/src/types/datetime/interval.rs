use std::fmt::Write;

use byteorder::{BigEndian, ByteOrder};
use chrono::TimeDelta;
use pgcodec_core::error::{BoxDynError, Error};

use super::{
    parse_seconds, parse_time_of_day, write_time_of_day, MICROS_PER_DAY, MICROS_PER_SECOND,
};
use crate::arguments::PgArgumentBuffer;
use crate::plan::expect_len;
use crate::types::WireValue;

/// PostgreSQL `INTERVAL`.
///
/// Months, days and microseconds are kept apart because their lengths vary: a month is not a
/// fixed number of days and a day is not always 24 hours across a DST change.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct PgInterval {
    pub months: i32,
    pub days: i32,
    pub microseconds: i64,
}

crate::impl_host_scalar!(PgInterval);

impl TryFrom<TimeDelta> for PgInterval {
    type Error = BoxDynError;

    /// The whole duration is stored in `microseconds`; sub-microsecond precision is dropped.
    fn try_from(delta: TimeDelta) -> Result<Self, Self::Error> {
        let microseconds = delta
            .num_microseconds()
            .ok_or_else(|| Error::overflow(format!("{delta} is out of range for interval")))?;

        Ok(PgInterval {
            months: 0,
            days: 0,
            microseconds,
        })
    }
}

impl TryFrom<PgInterval> for TimeDelta {
    type Error = BoxDynError;

    fn try_from(interval: PgInterval) -> Result<Self, Self::Error> {
        if interval.months != 0 {
            return Err("an interval with months has no fixed duration".into());
        }

        i64::from(interval.days)
            .checked_mul(MICROS_PER_DAY)
            .and_then(|days| days.checked_add(interval.microseconds))
            .map(TimeDelta::microseconds)
            .ok_or_else(|| {
                Error::overflow(format!("{interval:?} is out of range for TimeDelta")).into()
            })
    }
}

fn plural(n: impl Into<i64>) -> &'static str {
    if n.into() == 1 {
        ""
    } else {
        "s"
    }
}

impl WireValue for PgInterval {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        buf.extend(&self.microseconds.to_be_bytes());
        buf.extend(&self.days.to_be_bytes());
        buf.extend(&self.months.to_be_bytes());
        Ok(())
    }

    /// Writes the server's default `postgres` interval style, e.g.
    /// `1 year 2 mons 3 days 04:05:06.5`.
    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        let mut out = String::new();

        let years = self.months / 12;
        let months = self.months % 12;

        for (n, unit) in [(years, "year"), (months, "mon"), (self.days, "day")] {
            if n != 0 {
                if !out.is_empty() {
                    out.push(' ');
                }
                let _ = write!(out, "{n} {unit}{}", plural(n));
            }
        }

        if self.microseconds != 0 || out.is_empty() {
            if !out.is_empty() {
                out.push(' ');

                // a positive time after a negative date part needs an explicit sign
                if self.microseconds > 0 && (years < 0 || months < 0 || self.days < 0) {
                    out.push('+');
                }
            }

            if self.microseconds < 0 {
                out.push('-');
            }

            let magnitude = self
                .microseconds
                .checked_abs()
                .ok_or_else(|| Error::overflow("interval microseconds out of range"))?;

            write_time_of_day(&mut out, magnitude);
        }

        buf.put_str(&out);
        Ok(())
    }

    fn decode_binary(src: &[u8]) -> Result<Self, BoxDynError> {
        expect_len(src, 16, "interval")?;

        Ok(PgInterval {
            microseconds: BigEndian::read_i64(&src[..8]),
            days: BigEndian::read_i32(&src[8..12]),
            months: BigEndian::read_i32(&src[12..]),
        })
    }

    /// Parses the `postgres` and `postgres_verbose` interval styles.
    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        parse_interval(src).ok_or_else(|| format!("invalid interval: {src:?}").into())
    }
}

fn parse_interval(src: &str) -> Option<PgInterval> {
    let mut interval = PgInterval::default();
    let mut tokens = src.split_whitespace().peekable();

    if tokens.peek() == Some(&"@") {
        tokens.next();
    }

    let mut ago = false;

    while let Some(token) = tokens.next() {
        if token == "ago" {
            ago = true;
            continue;
        }

        if token.contains(':') {
            let (negative, time) = split_sign(token);
            let micros = parse_time_of_day(time).ok()?;
            let micros = if negative { -micros } else { micros };

            interval.microseconds = interval.microseconds.checked_add(micros)?;
            continue;
        }

        let unit = tokens.next()?;
        add_unit(&mut interval, token, unit)?;
    }

    if ago {
        interval.months = interval.months.checked_neg()?;
        interval.days = interval.days.checked_neg()?;
        interval.microseconds = interval.microseconds.checked_neg()?;
    }

    Some(interval)
}

fn split_sign(s: &str) -> (bool, &str) {
    if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else {
        (false, s.strip_prefix('+').unwrap_or(s))
    }
}

fn add_unit(interval: &mut PgInterval, quantity: &str, unit: &str) -> Option<()> {
    let unit = unit.trim_end_matches(',');
    let unit = unit.strip_suffix('s').unwrap_or(unit);

    let micros_per_unit = match unit {
        "microsecond" | "u" => 1,
        "millisecond" | "m" => 1_000,
        "second" | "sec" => MICROS_PER_SECOND,
        "minute" | "min" => 60 * MICROS_PER_SECOND,
        "hour" => 3600 * MICROS_PER_SECOND,
        _ => {
            let n: i32 = quantity.parse().ok()?;

            match unit {
                "day" => interval.days = interval.days.checked_add(n)?,
                "week" => interval.days = interval.days.checked_add(n.checked_mul(7)?)?,
                "mon" | "month" => interval.months = interval.months.checked_add(n)?,
                "year" => interval.months = interval.months.checked_add(n.checked_mul(12)?)?,
                _ => return None,
            }

            return Some(());
        }
    };

    // `parse_seconds` yields microseconds for a quantity of whole units plus a fraction
    let (negative, quantity) = split_sign(quantity);
    let scaled = i128::from(parse_seconds(quantity).ok()?) * i128::from(micros_per_unit)
        / i128::from(MICROS_PER_SECOND);
    let micros = i64::try_from(scaled).ok()?;
    let micros = if negative { -micros } else { micros };

    interval.microseconds = interval.microseconds.checked_add(micros)?;

    Some(())
}

scalar_codec!(
    /// `interval`.
    IntervalCodec, PgInterval, Interval
);

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(months: i32, days: i32, microseconds: i64) -> PgInterval {
        PgInterval {
            months,
            days,
            microseconds,
        }
    }

    fn text(i: PgInterval) -> String {
        let mut buf = PgArgumentBuffer::new();
        i.encode_text(&mut buf).unwrap();
        String::from_utf8(buf.into_inner()).unwrap()
    }

    #[test]
    fn test_encode_interval() {
        let mut buf = PgArgumentBuffer::new();

        interval(0, 0, 1_000).encode_binary(&mut buf).unwrap();
        assert_eq!(&buf[..], [0, 0, 0, 0, 0, 0, 3, 232, 0, 0, 0, 0, 0, 0, 0, 0]);
        buf.clear();

        interval(0, 0, 3_600_000_000).encode_binary(&mut buf).unwrap();
        assert_eq!(&buf[..], [0, 0, 0, 0, 214, 147, 164, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        buf.clear();

        interval(0, 1, 0).encode_binary(&mut buf).unwrap();
        assert_eq!(&buf[..], [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0]);
        buf.clear();

        interval(1, 0, 0).encode_binary(&mut buf).unwrap();
        assert_eq!(&buf[..], [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_interval_text_output() {
        assert_eq!(text(interval(0, 0, 0)), "00:00:00");
        assert_eq!(text(interval(14, 3, 14_706_500_000)), "1 year 2 mons 3 days 04:05:06.5");
        assert_eq!(text(interval(-1, -1, 0)), "-1 mons -1 days");
        assert_eq!(text(interval(0, -2, 60_000_000)), "-2 days +00:01:00");
        assert_eq!(text(interval(0, 0, -90_000_000)), "-00:01:30");
    }

    #[test]
    fn test_interval_text_input() {
        assert_eq!(
            PgInterval::decode_text("1 year 2 mons 3 days 04:05:06.5").unwrap(),
            interval(14, 3, 14_706_500_000)
        );
        assert_eq!(
            PgInterval::decode_text("@ 1 day 2 hours ago").unwrap(),
            interval(0, -1, -7_200_000_000)
        );
        assert_eq!(
            PgInterval::decode_text("-2 days +00:01:00").unwrap(),
            interval(0, -2, 60_000_000)
        );
        assert_eq!(
            PgInterval::decode_text("1.5 secs 2 weeks").unwrap(),
            interval(0, 14, 1_500_000)
        );
        assert!(PgInterval::decode_text("3 fortnights").is_err());
        assert!(PgInterval::decode_text("3").is_err());
    }

    #[test]
    fn test_timedelta_conversions() {
        let delta = TimeDelta::days(2) + TimeDelta::microseconds(5);

        assert_eq!(
            PgInterval::try_from(delta).unwrap(),
            interval(0, 0, 2 * MICROS_PER_DAY + 5)
        );
        assert_eq!(TimeDelta::try_from(interval(0, 2, 5)).unwrap(), delta);
        assert!(TimeDelta::try_from(interval(1, 0, 0)).is_err());
    }
}

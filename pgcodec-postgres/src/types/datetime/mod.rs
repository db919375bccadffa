//! `date`, `time`, `timestamp`, `timestamptz` and `interval`.
//!
//! Binary values count from the PostgreSQL epoch, 2000-01-01 00:00:00. Text values use the
//! server's default `ISO, YMD` date style with years before 1 AD written as `... BC`.
use std::fmt::Write;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use pgcodec_core::error::{BoxDynError, Error};

mod date;
mod interval;
mod time;
mod timestamp;

pub use date::{DateCodec, PgDate};
pub use interval::{IntervalCodec, PgInterval};
pub use time::{PgTime, TimeCodec};
pub use timestamp::{PgTimestamp, PgTimestamptz, TimestampCodec, TimestamptzCodec};

pub(crate) const MICROS_PER_SECOND: i64 = 1_000_000;
pub(crate) const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;

#[inline]
fn postgres_epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).expect("expected 2000-01-01 to be a valid NaiveDate")
}

#[inline]
fn postgres_epoch_datetime() -> NaiveDateTime {
    postgres_epoch_date()
        .and_hms_opt(0, 0, 0)
        .expect("expected 2000-01-01T00:00:00 to be a valid NaiveDateTime")
}

/// Split a trailing ` BC` era marker off `s`.
fn strip_era(s: &str) -> (&str, bool) {
    match s.strip_suffix(" BC") {
        Some(s) => (s, true),
        None => (s, false),
    }
}

/// Parse `YYYY-MM-DD`, where a BC year `n` is the proleptic year `1 - n`.
fn parse_ymd(s: &str, bc: bool) -> Result<NaiveDate, BoxDynError> {
    let invalid = || BoxDynError::from(format!("invalid date: {s:?}"));

    let mut parts = s.splitn(3, '-');
    let (Some(year), Some(month), Some(day)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };

    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    let day: u32 = day.parse().map_err(|_| invalid())?;

    let year = if bc { 1 - year } else { year };

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Write `date` as `YYYY-MM-DD`, returning whether the caller must append ` BC`.
fn write_ymd(out: &mut String, date: NaiveDate) -> bool {
    let bc = date.year() <= 0;
    let year = if bc { 1 - date.year() } else { date.year() };

    // writing to a `String` cannot fail
    let _ = write!(out, "{year:04}-{:02}-{:02}", date.month(), date.day());

    bc
}

/// Parse `HH:MM:SS[.ffffff]` into microseconds since midnight. `24:00:00` is allowed.
fn parse_time_of_day(s: &str) -> Result<i64, BoxDynError> {
    let invalid = || BoxDynError::from(format!("invalid time: {s:?}"));

    let mut parts = s.splitn(3, ':');
    let (Some(hours), Some(minutes)) = (parts.next(), parts.next()) else {
        return Err(invalid());
    };

    let hours: i64 = hours.parse().map_err(|_| invalid())?;
    let minutes: i64 = minutes.parse().map_err(|_| invalid())?;
    let seconds = parts.next().map_or(Ok(0), parse_seconds).map_err(|_| invalid())?;

    if !(0..60).contains(&minutes) || !(0..=60 * MICROS_PER_SECOND).contains(&seconds) {
        return Err(invalid());
    }

    Ok((hours * 60 + minutes) * 60 * MICROS_PER_SECOND + seconds)
}

/// Parse `SS[.ffffff]` into microseconds, truncating digits past the sixth.
fn parse_seconds(s: &str) -> Result<i64, BoxDynError> {
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));

    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid seconds: {s:?}").into());
    }

    let mut micros = 0;
    let mut scale = 100_000;
    for digit in frac.bytes().take(6) {
        micros += i64::from(digit - b'0') * scale;
        scale /= 10;
    }

    Ok(whole.parse::<i64>()? * MICROS_PER_SECOND + micros)
}

/// Write a non-negative duration as `HH:MM:SS[.ffffff]` with trailing fractional zeros
/// trimmed. Hours may exceed 24.
fn write_time_of_day(out: &mut String, micros: i64) {
    let seconds = micros / MICROS_PER_SECOND;
    let frac = micros % MICROS_PER_SECOND;

    let _ = write!(
        out,
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        seconds / 60 % 60,
        seconds % 60
    );

    if frac != 0 {
        let digits = format!("{frac:06}");
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
}

fn infinite(what: &str, target: &str) -> BoxDynError {
    Error::overflow(format!("cannot convert an infinite {what} to {target}")).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_of_day() {
        assert_eq!(parse_time_of_day("04:05:06.789").unwrap(), 14_706_789_000);
        assert_eq!(parse_time_of_day("24:00:00").unwrap(), MICROS_PER_DAY);
        assert_eq!(parse_time_of_day("00:00:00.1234567").unwrap(), 123_456);
        assert!(parse_time_of_day("12:60:00").is_err());
        assert!(parse_time_of_day("noon").is_err());

        let mut out = String::new();
        write_time_of_day(&mut out, 14_706_789_000);
        assert_eq!(out, "04:05:06.789");
    }

    #[test]
    fn test_bc_dates() {
        let date = parse_ymd("0001-02-29", true).unwrap();
        assert_eq!(date.year(), 0);

        let mut out = String::new();
        assert!(write_ymd(&mut out, date));
        assert_eq!(out, "0001-02-29");
    }
}

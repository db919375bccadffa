//! The geometric types: `point`, `line`, `lseg`, `box`, `path`, `polygon` and `circle`.
//!
//! Every binary layout is a sequence of big-endian `float8` values, prefixed with a flag and a
//! point count for the variable-length `path` and `polygon`. Text literals are read leniently:
//! the delimiters `()[]<>{}` are ignored and the numbers are taken in order, which accepts
//! every syntax the server documents for each type.
use pgcodec_core::error::{BoxDynError, Error};
use pgcodec_core::io::BufExt;

use crate::arguments::PgArgumentBuffer;
use crate::types::WireValue;

mod r#box;
mod circle;
mod line;
mod lseg;
mod path;
mod point;
mod polygon;

pub use self::r#box::{BoxCodec, PgBox};
pub use circle::{CircleCodec, PgCircle};
pub use line::{LineCodec, PgLine};
pub use lseg::{LsegCodec, PgLSeg};
pub use path::{PathCodec, PgPath};
pub use point::{PgPoint, PointCodec};
pub use polygon::{PgPolygon, PolygonCodec};

/// Parse the numbers of a geometric literal, ignoring grouping delimiters.
fn parse_floats(s: &str, what: &str) -> Result<Vec<f64>, BoxDynError> {
    let sanitised = s.replace(['(', ')', '[', ']', '<', '>', '{', '}'], "");

    sanitised
        .split(',')
        .map(|n| {
            <f64 as WireValue>::decode_text(n.trim())
                .map_err(|_| format!("error decoding {what}: invalid number in {s:?}").into())
        })
        .collect()
}

/// Parse exactly `N` numbers.
fn parse_fixed<const N: usize>(s: &str, what: &str) -> Result<[f64; N], BoxDynError> {
    let floats = parse_floats(s, what)?;
    let count = floats.len();

    floats.try_into().map_err(|_| {
        format!("error decoding {what}: expected {N} numbers, found {count} in {s:?}").into()
    })
}

/// Read exactly `N` binary `float8` values.
fn read_fixed<const N: usize>(mut src: &[u8], what: &str) -> Result<[f64; N], BoxDynError> {
    let mut out = [0.0; N];

    for v in &mut out {
        *v = src.try_get_f64()?;
    }

    if !src.is_empty() {
        return Err(Error::protocol(format!("{} trailing bytes after {what}", src.len())).into());
    }

    Ok(out)
}

fn put_floats(buf: &mut PgArgumentBuffer, floats: &[f64]) {
    for v in floats {
        buf.extend_from_slice(&v.to_be_bytes());
    }
}

fn put_float_text(buf: &mut PgArgumentBuffer, v: f64) -> Result<(), BoxDynError> {
    v.encode_text(buf)
}

/// Write `(x,y)`.
fn put_point_text(buf: &mut PgArgumentBuffer, point: &PgPoint) -> Result<(), BoxDynError> {
    buf.push(b'(');
    put_float_text(buf, point.x)?;
    buf.push(b',');
    put_float_text(buf, point.y)?;
    buf.push(b')');
    Ok(())
}

fn pairs_to_points(floats: &[f64], what: &str) -> Result<Vec<PgPoint>, BoxDynError> {
    if floats.len() % 2 != 0 {
        return Err(format!("error decoding {what}: unmatched pair of coordinates").into());
    }

    Ok(floats
        .chunks_exact(2)
        .map(|xy| PgPoint { x: xy[0], y: xy[1] })
        .collect())
}

/// Read a point count followed by that many points.
fn read_points(src: &mut &[u8], what: &str) -> Result<Vec<PgPoint>, BoxDynError> {
    let count = src.try_get_i32()?;
    let count = usize::try_from(count)
        .map_err(|_| Error::protocol(format!("invalid {what} point count {count}")))?;

    if src.len() != count.saturating_mul(16) {
        return Err(Error::protocol(format!(
            "expected {count} points for {what}, found {} bytes",
            src.len()
        ))
        .into());
    }

    let mut points = Vec::with_capacity(count);
    for _ in 0..count {
        points.push(PgPoint {
            x: src.try_get_f64()?,
            y: src.try_get_f64()?,
        });
    }

    Ok(points)
}

fn put_points(buf: &mut PgArgumentBuffer, points: &[PgPoint]) -> Result<(), BoxDynError> {
    crate::arguments::put_len(buf, points.len())?;

    for point in points {
        put_floats(buf, &[point.x, point.y]);
    }

    Ok(())
}

/// Write points as `(x,y),(x,y)`.
fn put_points_text(buf: &mut PgArgumentBuffer, points: &[PgPoint]) -> Result<(), BoxDynError> {
    for (i, point) in points.iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        put_point_text(buf, point)?;
    }

    Ok(())
}

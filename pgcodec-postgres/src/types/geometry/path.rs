use pgcodec_core::error::BoxDynError;
use pgcodec_core::io::BufExt;

use super::{pairs_to_points, parse_floats, put_points, put_points_text, read_points, PgPoint};
use crate::arguments::PgArgumentBuffer;
use crate::types::WireValue;

/// ## Postgres Geometric Path type
///
/// Description: Open path or Closed path (similar to polygon)
/// Representation: Open `[(x1,y1),...]`, Closed `((x1,y1),...)`
///
/// Paths are represented by lists of connected points. Paths can be open, where the first and
/// last points in the list are considered not connected, or closed, where the first and last
/// points are considered connected.
///
/// See [Postgres Manual, Section 8.8.5, Geometric Types - Paths][PG.S.8.8.5] for details.
///
/// [PG.S.8.8.5]: https://www.postgresql.org/docs/current/datatype-geometric.html#DATATYPE-GEOMETRIC-PATHS
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PgPath {
    pub closed: bool,
    pub points: Vec<PgPoint>,
}

crate::impl_host_scalar!(PgPath);

impl WireValue for PgPath {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        buf.push(u8::from(self.closed));
        put_points(buf, &self.points)
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        let (open, close) = if self.closed { (b'(', b')') } else { (b'[', b']') };

        buf.push(open);
        put_points_text(buf, &self.points)?;
        buf.push(close);
        Ok(())
    }

    fn decode_binary(mut src: &[u8]) -> Result<Self, BoxDynError> {
        let closed = src.try_get_u8()? != 0;
        let points = read_points(&mut src, "PATH")?;

        Ok(PgPath { closed, points })
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        let closed = !src.trim_start().starts_with('[');
        let points = pairs_to_points(&parse_floats(src, "PATH")?, "PATH")?;

        if points.is_empty() {
            return Err(format!("could not get path from {src:?}").into());
        }

        Ok(PgPath { closed, points })
    }
}

scalar_codec!(
    /// `path`.
    PathCodec, PgPath, Path
);

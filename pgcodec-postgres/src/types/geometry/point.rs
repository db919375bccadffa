use pgcodec_core::error::BoxDynError;

use super::{parse_fixed, put_floats, put_point_text, read_fixed};
use crate::arguments::PgArgumentBuffer;
use crate::types::WireValue;

/// ## Postgres Geometric Point type
///
/// Description: Point on a plane
/// Representation: `(x, y)`
///
/// Points are the fundamental two-dimensional building block for geometric types. Values of
/// type point are specified using either of the following syntaxes:
/// ```text
/// ( x , y )
///  x , y
/// ```
/// where x and y are the respective coordinates, as floating-point numbers.
///
/// See [Postgres Manual, Section 8.8.1, Geometric Types - Points][PG.S.8.8.1] for details.
///
/// [PG.S.8.8.1]: https://www.postgresql.org/docs/current/datatype-geometric.html#DATATYPE-GEOMETRIC-POINTS
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PgPoint {
    pub x: f64,
    pub y: f64,
}

crate::impl_host_scalar!(PgPoint);

impl WireValue for PgPoint {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        put_floats(buf, &[self.x, self.y]);
        Ok(())
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        put_point_text(buf, self)
    }

    fn decode_binary(src: &[u8]) -> Result<Self, BoxDynError> {
        let [x, y] = read_fixed(src, "POINT")?;
        Ok(PgPoint { x, y })
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        let [x, y] = parse_fixed(src, "POINT")?;
        Ok(PgPoint { x, y })
    }
}

scalar_codec!(
    /// `point`.
    PointCodec, PgPoint, Point
);

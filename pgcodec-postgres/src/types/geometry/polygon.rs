use pgcodec_core::error::BoxDynError;

use super::{pairs_to_points, parse_floats, put_points, put_points_text, read_points, PgPoint};
use crate::arguments::PgArgumentBuffer;
use crate::types::WireValue;

/// Postgres Geometric Polygon type
///
/// Description: Polygon (similar to closed path)
/// Representation: `((x1,y1),...)`
///
/// See <https://www.postgresql.org/docs/16/datatype-geometric.html#DATATYPE-POLYGON>
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PgPolygon {
    pub points: Vec<PgPoint>,
}

crate::impl_host_scalar!(PgPolygon);

impl WireValue for PgPolygon {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        put_points(buf, &self.points)
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        buf.push(b'(');
        put_points_text(buf, &self.points)?;
        buf.push(b')');
        Ok(())
    }

    fn decode_binary(mut src: &[u8]) -> Result<Self, BoxDynError> {
        Ok(PgPolygon {
            points: read_points(&mut src, "POLYGON")?,
        })
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        let points = pairs_to_points(&parse_floats(src, "POLYGON")?, "POLYGON")?;

        if points.is_empty() {
            return Err(format!("could not get polygon from {src:?}").into());
        }

        Ok(PgPolygon { points })
    }
}

scalar_codec!(
    /// `polygon`.
    PolygonCodec, PgPolygon, Polygon
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon() {
        let polygon = PgPolygon::decode_text("((0,0),(0,1),(1,0))").unwrap();
        assert_eq!(polygon.points.len(), 3);

        let mut buf = PgArgumentBuffer::new();
        polygon.encode_binary(&mut buf).unwrap();
        assert_eq!(&buf[..4], [0, 0, 0, 3]);
        assert_eq!(buf.len(), 4 + 3 * 16);
        assert_eq!(PgPolygon::decode_binary(&buf).unwrap(), polygon);
        buf.clear();

        polygon.encode_text(&mut buf).unwrap();
        assert_eq!(&buf[..], b"((0,0),(0,1),(1,0))");

        assert!(PgPolygon::decode_text("((0,0),(0").is_err());
    }
}

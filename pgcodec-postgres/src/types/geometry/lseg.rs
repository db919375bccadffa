use pgcodec_core::error::BoxDynError;

use super::{parse_fixed, put_floats, put_points_text, read_fixed, PgPoint};
use crate::arguments::PgArgumentBuffer;
use crate::types::WireValue;

/// ## Postgres Geometric Line Segment type
///
/// Description: Finite line segment
/// Representation: `[(x1,y1),(x2,y2)]`
///
/// Line segments are represented by pairs of points that are the endpoints of the segment.
/// Values of type lseg are specified using any of the following syntaxes:
/// ```text
/// [ ( x1 , y1 ) , ( x2 , y2 ) ]
/// ( ( x1 , y1 ) , ( x2 , y2 ) )
///   ( x1 , y1 ) , ( x2 , y2 )
///     x1 , y1   ,   x2 , y2
/// ```
///
/// See <https://www.postgresql.org/docs/16/datatype-geometric.html#DATATYPE-LSEG>
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PgLSeg {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

crate::impl_host_scalar!(PgLSeg);

impl WireValue for PgLSeg {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        put_floats(buf, &[self.x1, self.y1, self.x2, self.y2]);
        Ok(())
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        let ends = [
            PgPoint {
                x: self.x1,
                y: self.y1,
            },
            PgPoint {
                x: self.x2,
                y: self.y2,
            },
        ];

        buf.push(b'[');
        put_points_text(buf, &ends)?;
        buf.push(b']');
        Ok(())
    }

    fn decode_binary(src: &[u8]) -> Result<Self, BoxDynError> {
        let [x1, y1, x2, y2] = read_fixed(src, "LSEG")?;
        Ok(PgLSeg { x1, y1, x2, y2 })
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        let [x1, y1, x2, y2] = parse_fixed(src, "LSEG")?;
        Ok(PgLSeg { x1, y1, x2, y2 })
    }
}

scalar_codec!(
    /// `lseg`.
    LsegCodec, PgLSeg, Lseg
);

#[cfg(test)]
mod tests {
    use super::*;

    const LSEG_BYTES: &[u8] = &[
        63, 241, 153, 153, 153, 153, 153, 154, 64, 1, 153, 153, 153, 153, 153, 154, 64, 10, 102,
        102, 102, 102, 102, 102, 64, 17, 153, 153, 153, 153, 153, 154,
    ];

    const LSEG: PgLSeg = PgLSeg {
        x1: 1.1,
        y1: 2.2,
        x2: 3.3,
        y2: 4.4,
    };

    #[test]
    fn can_deserialise_lseg() {
        assert_eq!(PgLSeg::decode_binary(LSEG_BYTES).unwrap(), LSEG);

        for syntax in [
            "[(1.1, 2.2), (3.3, 4.4)]",
            "((1.1, 2.2), (3.3, 4.4))",
            "(1.1, 2.2), (3.3, 4.4)",
            "1.1, 2.2, 3.3, 4.4",
        ] {
            assert_eq!(PgLSeg::decode_text(syntax).unwrap(), LSEG, "{syntax}");
        }
    }

    #[test]
    fn can_serialise_lseg() {
        let mut buf = PgArgumentBuffer::new();
        LSEG.encode_binary(&mut buf).unwrap();
        assert_eq!(&buf[..], LSEG_BYTES);
        buf.clear();

        LSEG.encode_text(&mut buf).unwrap();
        assert_eq!(&buf[..], b"[(1.1,2.2),(3.3,4.4)]");
    }
}

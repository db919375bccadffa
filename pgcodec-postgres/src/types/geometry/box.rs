use pgcodec_core::error::BoxDynError;

use super::{parse_fixed, put_floats, put_points_text, read_fixed, PgPoint};
use crate::arguments::PgArgumentBuffer;
use crate::types::WireValue;

/// Postgres Geometric Box type
///
/// Storage size: 32 bytes
/// Description: Rectangular box
/// Representation: `(x1,y1),(x2,y2)`
///
/// The server stores opposite corners upper-right first; any two opposite corners are accepted
/// on input and reordered.
///
/// See <https://www.postgresql.org/docs/16/datatype-geometric.html#DATATYPE-GEOMETRIC-BOXES>
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PgBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

crate::impl_host_scalar!(PgBox);

impl PgBox {
    /// Reorder the corners to upper-right, lower-left.
    fn normalized(self) -> Self {
        PgBox {
            x1: self.x1.max(self.x2),
            y1: self.y1.max(self.y2),
            x2: self.x1.min(self.x2),
            y2: self.y1.min(self.y2),
        }
    }
}

impl WireValue for PgBox {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        let b = self.normalized();
        put_floats(buf, &[b.x1, b.y1, b.x2, b.y2]);
        Ok(())
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        let b = self.normalized();
        put_points_text(
            buf,
            &[PgPoint { x: b.x1, y: b.y1 }, PgPoint { x: b.x2, y: b.y2 }],
        )
    }

    fn decode_binary(src: &[u8]) -> Result<Self, BoxDynError> {
        let [x1, y1, x2, y2] = read_fixed(src, "BOX")?;
        Ok(PgBox { x1, y1, x2, y2 })
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        let [x1, y1, x2, y2] = parse_fixed(src, "BOX")?;
        Ok(PgBox { x1, y1, x2, y2 }.normalized())
    }
}

scalar_codec!(
    /// `box`.
    BoxCodec, PgBox, Box
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_deserialise_box_str() {
        let expected = PgBox {
            x1: 3.0,
            y1: 4.0,
            x2: 1.0,
            y2: 2.0,
        };

        assert_eq!(PgBox::decode_text("(1, 2), (3, 4)").unwrap(), expected);
        assert_eq!(PgBox::decode_text("((3,4),(1,2))").unwrap(), expected);
        assert!(PgBox::decode_text("(1, 2), (3)").is_err());
    }

    #[test]
    fn can_serialise_box() {
        let b = PgBox {
            x1: 1.0,
            y1: 2.0,
            x2: 3.0,
            y2: 4.0,
        };

        let mut buf = PgArgumentBuffer::new();
        b.encode_text(&mut buf).unwrap();
        assert_eq!(&buf[..], b"(3,4),(1,2)");
        buf.clear();

        b.encode_binary(&mut buf).unwrap();
        assert_eq!(&buf[..8], 3.0_f64.to_be_bytes());
        assert_eq!(buf.len(), 32);
    }
}

use pgcodec_core::error::BoxDynError;

use super::{parse_fixed, put_float_text, put_floats, put_point_text, read_fixed, PgPoint};
use crate::arguments::PgArgumentBuffer;
use crate::types::WireValue;

/// ## Postgres Geometric Circle type
///
/// Description: Circle
/// Representation: `< (x, y), r >` (center point and radius)
///
/// ```text
/// < ( x , y ) , r >
/// ( ( x , y ) , r )
///   ( x , y ) , r
///     x , y   , r
/// ```
/// where `(x,y)` is the center point and r is the radius of the circle.
///
/// See <https://www.postgresql.org/docs/16/datatype-geometric.html#DATATYPE-CIRCLE>
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PgCircle {
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

crate::impl_host_scalar!(PgCircle);

impl WireValue for PgCircle {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        put_floats(buf, &[self.x, self.y, self.r]);
        Ok(())
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        buf.push(b'<');
        put_point_text(buf, &PgPoint { x: self.x, y: self.y })?;
        buf.push(b',');
        put_float_text(buf, self.r)?;
        buf.push(b'>');
        Ok(())
    }

    fn decode_binary(src: &[u8]) -> Result<Self, BoxDynError> {
        let [x, y, r] = read_fixed(src, "CIRCLE")?;
        Ok(PgCircle { x, y, r })
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        let [x, y, r] = parse_fixed(src, "CIRCLE")?;

        if r < 0.0 {
            return Err(format!("error decoding CIRCLE: negative radius in {src:?}").into());
        }

        Ok(PgCircle { x, y, r })
    }
}

scalar_codec!(
    /// `circle`.
    CircleCodec, PgCircle, Circle
);

#[cfg(test)]
mod tests {
    use super::*;

    const CIRCLE: PgCircle = PgCircle {
        x: 1.0,
        y: 2.0,
        r: 3.0,
    };

    #[test]
    fn can_deserialise_circle_str() {
        for syntax in ["<(1, 2), 3 >", "((1, 2), 3 )", "(1, 2), 3", "1, 2, 3"] {
            assert_eq!(PgCircle::decode_text(syntax).unwrap(), CIRCLE, "{syntax}");
        }

        assert!(PgCircle::decode_text("<(1, 2), -3>").is_err());
    }

    #[test]
    fn can_serialise_circle() {
        let mut buf = PgArgumentBuffer::new();
        CIRCLE.encode_text(&mut buf).unwrap();
        assert_eq!(&buf[..], b"<(1,2),3>");
        buf.clear();

        CIRCLE.encode_binary(&mut buf).unwrap();
        assert_eq!(PgCircle::decode_binary(&buf).unwrap(), CIRCLE);
    }
}

use pgcodec_core::error::BoxDynError;

use super::{parse_fixed, put_float_text, put_floats, read_fixed};
use crate::arguments::PgArgumentBuffer;
use crate::types::WireValue;

/// ## Postgres Geometric Line type
///
/// Description: Infinite line
/// Representation: `{A, B, C}`
///
/// Lines are represented by the linear equation `Ax + By + C = 0`, where `A` and `B` are not
/// both zero.
///
/// See <https://www.postgresql.org/docs/16/datatype-geometric.html#DATATYPE-LINE>
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PgLine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

crate::impl_host_scalar!(PgLine);

impl WireValue for PgLine {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        put_floats(buf, &[self.a, self.b, self.c]);
        Ok(())
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        buf.push(b'{');
        put_float_text(buf, self.a)?;
        buf.push(b',');
        put_float_text(buf, self.b)?;
        buf.push(b',');
        put_float_text(buf, self.c)?;
        buf.push(b'}');
        Ok(())
    }

    fn decode_binary(src: &[u8]) -> Result<Self, BoxDynError> {
        let [a, b, c] = read_fixed(src, "LINE")?;
        Ok(PgLine { a, b, c })
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        let [a, b, c] = parse_fixed(src, "LINE")?;
        Ok(PgLine { a, b, c })
    }
}

scalar_codec!(
    /// `line`.
    LineCodec, PgLine, Line
);

#[cfg(test)]
mod tests {
    use super::*;

    const LINE_BYTES: &[u8] = &[
        63, 241, 153, 153, 153, 153, 153, 154, 64, 1, 153, 153, 153, 153, 153, 154, 64, 10, 102,
        102, 102, 102, 102, 102,
    ];

    #[test]
    fn can_deserialise_line_type_bytes() {
        let line = PgLine::decode_binary(LINE_BYTES).unwrap();
        assert_eq!(
            line,
            PgLine {
                a: 1.1,
                b: 2.2,
                c: 3.3
            }
        );
    }

    #[test]
    fn can_deserialise_line_type_str() {
        let line = PgLine::decode_text("{ 1, 2, 3 }").unwrap();
        assert_eq!(
            line,
            PgLine {
                a: 1.0,
                b: 2.0,
                c: 3.0
            }
        );
    }

    #[test]
    fn cannot_deserialise_line_wrong_count() {
        let err = PgLine::decode_text("{ 1, 2 }").unwrap_err();
        assert_eq!(
            err.to_string(),
            "error decoding LINE: expected 3 numbers, found 2 in \"{ 1, 2 }\""
        );

        assert!(PgLine::decode_text("{ 1, 2, 3, 4 }").is_err());
        assert!(PgLine::decode_text("{ 1, 2, three }").is_err());
    }

    #[test]
    fn can_serialise_line_type() {
        let line = PgLine {
            a: 1.1,
            b: 2.2,
            c: 3.3,
        };

        let mut buf = PgArgumentBuffer::new();
        line.encode_binary(&mut buf).unwrap();
        assert_eq!(&buf[..], LINE_BYTES);
        buf.clear();

        line.encode_text(&mut buf).unwrap();
        assert_eq!(&buf[..], b"{1.1,2.2,3.3}");
    }
}

/// Receives the raw bytes of any value, in whatever format they arrived.
///
/// Scanning into `UndecodedBytes` never consults a codec; `None` is SQL `NULL`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndecodedBytes(pub Option<Vec<u8>>);

crate::impl_host_scalar!(UndecodedBytes);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::PgTypeMap;
    use crate::value::PgValueFormat;

    #[test]
    fn it_keeps_raw_bytes() {
        let map = PgTypeMap::new();
        let mut raw = UndecodedBytes::default();

        // an OID nothing is registered for
        map.scan(424_242, PgValueFormat::Binary, Some(b"\x01\x02"), &mut raw)
            .unwrap();
        assert_eq!(raw, UndecodedBytes(Some(vec![1, 2])));

        map.scan(424_242, PgValueFormat::Text, None, &mut raw)
            .unwrap();
        assert_eq!(raw, UndecodedBytes(None));
    }
}

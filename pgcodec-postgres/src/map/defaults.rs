//! The built-in types and the shared default registry.
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use ipnetwork::IpNetwork;
use mac_address::MacAddress;
use once_cell::sync::OnceCell;
use uuid::Uuid;

use crate::codec::Codec;
use crate::oid;
use crate::type_info::PgType;
use crate::types::{
    ArrayCodec, BitsCodec, BoolCodec, BoxCodec, ByteaCodec, CircleCodec, DateCodec,
    Float4Codec, Float8Codec, InetCodec, Int2Codec, Int4Codec, Int8Codec, IntervalCodec,
    JsonCodec, JsonbCodec, LineCodec, LsegCodec, MacaddrCodec, MultirangeCodec, NumericCodec,
    PathCodec, PgBits, PgBox, PgCircle, PgDate, PgInterval, PgLSeg, PgLine, PgMultirange,
    PgNumeric, PgPath, PgPoint, PgPolygon, PgRange, PgTime, PgTimestamp, PgTimestamptz,
    PointCodec, PolygonCodec, QCharCodec, RangeCodec, RecordCodec, TextCodec, TimeCodec,
    TimestampCodec, TimestamptzCodec, Uint32Codec, Uint64Codec, UuidCodec, XmlCodec,
};

use super::{MapOptions, PgTypeMap};

static SHARED_DEFAULT: OnceCell<Arc<PgTypeMap>> = OnceCell::new();

/// The registry every [`PgTypeMap::new`] falls back to, built on first use.
pub fn shared_default() -> Arc<PgTypeMap> {
    Arc::clone(SHARED_DEFAULT.get_or_init(|| Arc::new(build_default_registry())))
}

/// A fresh registry holding every built-in type, with no fallback of its own.
pub fn build_default_registry() -> PgTypeMap {
    let mut map = PgTypeMap::without_defaults(MapOptions::default());

    register_base_types(&mut map);
    register_range_types(&mut map);
    register_default_host_types(&mut map);

    map
}

/// Register `name` and its array type `_name`.
fn register_with_array(
    map: &mut PgTypeMap,
    name: &str,
    oid: u32,
    array_oid: u32,
    codec: impl Codec + 'static,
) {
    let element = Arc::new(PgType::new(name, oid, codec));
    let array_codec = if oid == oid::BOX {
        ArrayCodec::new(Arc::clone(&element)).with_delimiter(';')
    } else {
        ArrayCodec::new(Arc::clone(&element))
    };

    map.register_type(PgType::clone(&element));
    map.register_type(PgType::new(format!("_{name}"), array_oid, array_codec));
}

fn register_base_types(map: &mut PgTypeMap) {
    register_with_array(map, "bool", oid::BOOL, oid::BOOL_ARRAY, BoolCodec);
    register_with_array(map, "bytea", oid::BYTEA, oid::BYTEA_ARRAY, ByteaCodec);
    register_with_array(map, "char", oid::QCHAR, oid::QCHAR_ARRAY, QCharCodec);
    register_with_array(map, "name", oid::NAME, oid::NAME_ARRAY, TextCodec);
    register_with_array(map, "int8", oid::INT8, oid::INT8_ARRAY, Int8Codec);
    register_with_array(map, "int2", oid::INT2, oid::INT2_ARRAY, Int2Codec);
    register_with_array(map, "int4", oid::INT4, oid::INT4_ARRAY, Int4Codec);
    register_with_array(map, "text", oid::TEXT, oid::TEXT_ARRAY, TextCodec);
    register_with_array(map, "oid", oid::OID, oid::OID_ARRAY, Uint32Codec);
    register_with_array(map, "xid", oid::XID, oid::XID_ARRAY, Uint32Codec);
    register_with_array(map, "cid", oid::CID, oid::CID_ARRAY, Uint32Codec);
    register_with_array(map, "json", oid::JSON, oid::JSON_ARRAY, JsonCodec);
    register_with_array(map, "xml", oid::XML, oid::XML_ARRAY, XmlCodec);
    register_with_array(map, "point", oid::POINT, oid::POINT_ARRAY, PointCodec);
    register_with_array(map, "lseg", oid::LSEG, oid::LSEG_ARRAY, LsegCodec);
    register_with_array(map, "path", oid::PATH, oid::PATH_ARRAY, PathCodec);
    register_with_array(map, "box", oid::BOX, oid::BOX_ARRAY, BoxCodec);
    register_with_array(map, "polygon", oid::POLYGON, oid::POLYGON_ARRAY, PolygonCodec);
    register_with_array(map, "line", oid::LINE, oid::LINE_ARRAY, LineCodec);
    register_with_array(map, "cidr", oid::CIDR, oid::CIDR_ARRAY, InetCodec);
    register_with_array(map, "float4", oid::FLOAT4, oid::FLOAT4_ARRAY, Float4Codec);
    register_with_array(map, "float8", oid::FLOAT8, oid::FLOAT8_ARRAY, Float8Codec);
    register_with_array(map, "circle", oid::CIRCLE, oid::CIRCLE_ARRAY, CircleCodec);
    register_with_array(map, "macaddr", oid::MACADDR, oid::MACADDR_ARRAY, MacaddrCodec);
    register_with_array(map, "inet", oid::INET, oid::INET_ARRAY, InetCodec);
    register_with_array(map, "aclitem", oid::ACLITEM, oid::ACLITEM_ARRAY, TextCodec);
    register_with_array(map, "bpchar", oid::BPCHAR, oid::BPCHAR_ARRAY, TextCodec);
    register_with_array(map, "varchar", oid::VARCHAR, oid::VARCHAR_ARRAY, TextCodec);
    register_with_array(map, "date", oid::DATE, oid::DATE_ARRAY, DateCodec);
    register_with_array(map, "time", oid::TIME, oid::TIME_ARRAY, TimeCodec);
    register_with_array(map, "timestamp", oid::TIMESTAMP, oid::TIMESTAMP_ARRAY, TimestampCodec);
    register_with_array(
        map,
        "timestamptz",
        oid::TIMESTAMPTZ,
        oid::TIMESTAMPTZ_ARRAY,
        TimestamptzCodec,
    );
    register_with_array(map, "interval", oid::INTERVAL, oid::INTERVAL_ARRAY, IntervalCodec);
    register_with_array(map, "bit", oid::BIT, oid::BIT_ARRAY, BitsCodec);
    register_with_array(map, "varbit", oid::VARBIT, oid::VARBIT_ARRAY, BitsCodec);
    register_with_array(map, "numeric", oid::NUMERIC, oid::NUMERIC_ARRAY, NumericCodec);
    register_with_array(map, "record", oid::RECORD, oid::RECORD_ARRAY, RecordCodec);
    register_with_array(map, "uuid", oid::UUID, oid::UUID_ARRAY, UuidCodec);
    register_with_array(map, "jsonb", oid::JSONB, oid::JSONB_ARRAY, JsonbCodec);
    register_with_array(map, "jsonpath", oid::JSONPATH, oid::JSONPATH_ARRAY, TextCodec);
    register_with_array(map, "xid8", oid::XID8, oid::XID8_ARRAY, Uint64Codec);

    map.register_type(PgType::new("unknown", oid::UNKNOWN, TextCodec));
}

fn register_range_types(map: &mut PgTypeMap) {
    // (range, oid, element, array, multirange, oid, array)
    let ranges = [
        (
            "int4range",
            oid::INT4_RANGE,
            oid::INT4,
            oid::INT4_RANGE_ARRAY,
            "int4multirange",
            oid::INT4_MULTIRANGE,
            oid::INT4_MULTIRANGE_ARRAY,
        ),
        (
            "numrange",
            oid::NUM_RANGE,
            oid::NUMERIC,
            oid::NUM_RANGE_ARRAY,
            "nummultirange",
            oid::NUM_MULTIRANGE,
            oid::NUM_MULTIRANGE_ARRAY,
        ),
        (
            "tsrange",
            oid::TS_RANGE,
            oid::TIMESTAMP,
            oid::TS_RANGE_ARRAY,
            "tsmultirange",
            oid::TS_MULTIRANGE,
            oid::TS_MULTIRANGE_ARRAY,
        ),
        (
            "tstzrange",
            oid::TSTZ_RANGE,
            oid::TIMESTAMPTZ,
            oid::TSTZ_RANGE_ARRAY,
            "tstzmultirange",
            oid::TSTZ_MULTIRANGE,
            oid::TSTZ_MULTIRANGE_ARRAY,
        ),
        (
            "daterange",
            oid::DATE_RANGE,
            oid::DATE,
            oid::DATE_RANGE_ARRAY,
            "datemultirange",
            oid::DATE_MULTIRANGE,
            oid::DATE_MULTIRANGE_ARRAY,
        ),
        (
            "int8range",
            oid::INT8_RANGE,
            oid::INT8,
            oid::INT8_RANGE_ARRAY,
            "int8multirange",
            oid::INT8_MULTIRANGE,
            oid::INT8_MULTIRANGE_ARRAY,
        ),
    ];

    for (name, range_oid, element, array_oid, multi_name, multi_oid, multi_array_oid) in ranges {
        let Some(element) = map.type_for_oid(element) else {
            tracing::error!(name, element, "range element type is not registered");
            continue;
        };

        register_with_array(map, name, range_oid, array_oid, RangeCodec::new(element));

        let Some(range) = map.type_for_oid(range_oid) else {
            continue;
        };

        register_with_array(
            map,
            multi_name,
            multi_oid,
            multi_array_oid,
            MultirangeCodec::new(range),
        );
    }
}

fn register_default_host_types(map: &mut PgTypeMap) {
    map.register_default_type_variants::<bool>("bool");
    map.register_default_type_variants::<i8>("char");
    map.register_default_type_variants::<i16>("int2");
    map.register_default_type_variants::<i32>("int4");
    map.register_default_type_variants::<i64>("int8");
    map.register_default_type_variants::<u32>("oid");
    map.register_default_type_variants::<u64>("xid8");
    map.register_default_type_variants::<f32>("float4");
    map.register_default_type_variants::<f64>("float8");
    map.register_default_type_variants::<String>("text");
    map.register_default_type_variants::<&'static str>("text");
    map.register_default_type_variants::<Vec<u8>>("bytea");

    map.register_default_type_variants::<PgNumeric>("numeric");
    map.register_default_type_variants::<Uuid>("uuid");
    map.register_default_type_variants::<PgDate>("date");
    map.register_default_type_variants::<PgTime>("time");
    map.register_default_type_variants::<PgTimestamp>("timestamp");
    map.register_default_type_variants::<PgTimestamptz>("timestamptz");
    map.register_default_type_variants::<PgInterval>("interval");
    map.register_default_type_variants::<PgBits>("varbit");
    map.register_default_type_variants::<serde_json::Value>("jsonb");
    map.register_default_type_variants::<PgPoint>("point");
    map.register_default_type_variants::<PgLine>("line");
    map.register_default_type_variants::<PgLSeg>("lseg");
    map.register_default_type_variants::<PgBox>("box");
    map.register_default_type_variants::<PgPath>("path");
    map.register_default_type_variants::<PgPolygon>("polygon");
    map.register_default_type_variants::<PgCircle>("circle");

    map.register_default_type_variants::<NaiveDate>("date");
    map.register_default_type_variants::<NaiveTime>("time");
    map.register_default_type_variants::<NaiveDateTime>("timestamp");
    map.register_default_type_variants::<DateTime<Utc>>("timestamptz");

    // no `Default`, so no `Option` or `Vec` host impls either
    map.register_default_type::<TimeDelta>("interval");
    map.register_default_type::<IpAddr>("inet");
    map.register_default_type::<IpNetwork>("inet");
    map.register_default_type::<MacAddress>("macaddr");

    map.register_default_type_variants::<PgRange<i32>>("int4range");
    map.register_default_type_variants::<PgRange<i64>>("int8range");
    map.register_default_type_variants::<PgRange<PgNumeric>>("numrange");
    map.register_default_type_variants::<PgRange<PgDate>>("daterange");
    map.register_default_type_variants::<PgRange<PgTimestamp>>("tsrange");
    map.register_default_type_variants::<PgRange<PgTimestamptz>>("tstzrange");

    map.register_default_type_variants::<PgMultirange<i32>>("int4multirange");
    map.register_default_type_variants::<PgMultirange<i64>>("int8multirange");
    map.register_default_type_variants::<PgMultirange<PgNumeric>>("nummultirange");
    map.register_default_type_variants::<PgMultirange<PgDate>>("datemultirange");
    map.register_default_type_variants::<PgMultirange<PgTimestamp>>("tsmultirange");
    map.register_default_type_variants::<PgMultirange<PgTimestamptz>>("tstzmultirange");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostValue;

    #[test]
    fn shared_default_is_built_once() {
        assert!(Arc::ptr_eq(&shared_default(), &shared_default()));
    }

    #[test]
    fn every_base_type_has_an_array() {
        let map = build_default_registry();

        for (name, array) in [
            ("int4", oid::INT4_ARRAY),
            ("text", oid::TEXT_ARRAY),
            ("int4range", oid::INT4_RANGE_ARRAY),
            ("int4multirange", oid::INT4_MULTIRANGE_ARRAY),
            ("record", oid::RECORD_ARRAY),
        ] {
            let ty = map.type_for_oid(array).unwrap();
            assert_eq!(ty.name(), format!("_{name}"));
            assert_eq!(map.type_for_name(&format!("_{name}")).unwrap().oid(), array);
        }

        assert_eq!(map.type_for_oid(oid::UNKNOWN).unwrap().name(), "unknown");
    }

    #[test]
    fn host_types_have_default_types() {
        let map = build_default_registry();

        let cases: [(&dyn HostValue, &str); 6] = [
            (&1_i32, "int4"),
            (&Some(1_i64), "int8"),
            (&vec![1.5_f64], "_float8"),
            (&"text", "text"),
            (&PgRange::from(1_i32..2), "int4range"),
            (&NaiveDate::default(), "date"),
        ];

        for (value, name) in cases {
            assert_eq!(map.type_for_value(value).unwrap().name(), name);
        }
    }

    #[test]
    fn box_arrays_use_semicolons() {
        let map = build_default_registry();
        let mut buf = crate::PgArgumentBuffer::new();

        let boxes = vec![
            PgBox {
                x1: 1.0,
                y1: 1.0,
                x2: 0.0,
                y2: 0.0,
            },
            PgBox {
                x1: 2.0,
                y1: 2.0,
                x2: 1.0,
                y2: 1.0,
            },
        ];

        map.encode(
            oid::BOX_ARRAY,
            crate::PgValueFormat::Text,
            &boxes,
            &mut buf,
        )
        .unwrap();

        assert_eq!(&buf[..], b"{(1,1),(0,0);(2,2),(1,1)}");
    }
}

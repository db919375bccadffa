use std::collections::HashMap;
use std::ops::Bound;

use pgcodec::host::ArrayDimension;
use pgcodec::types::{
    ArrayCodec, CompositeCodec, CompositeField, HstoreCodec, Json, PgArray, PgHstore,
    PgMultirange, PgNumeric, PgRange,
};
use pgcodec::{
    impl_host_struct, oid, BoundType, Error, HostValue, PgArgumentBuffer, PgType, PgTypeMap,
    PgValueFormat, Value,
};
use serde::{Deserialize, Serialize};

const INVENTORY_ITEM: u32 = 90_001;
const INVENTORY_ITEM_ARRAY: u32 = 90_002;
const HSTORE: u32 = 90_020;

const FORMATS: [PgValueFormat; 2] = [PgValueFormat::Binary, PgValueFormat::Text];

#[derive(Debug, Default, Clone, PartialEq)]
struct InventoryItem {
    name: String,
    supplier_id: i32,
    price: Option<PgNumeric>,
}

impl_host_struct!(InventoryItem {
    name,
    supplier_id,
    price
});

fn registry() -> PgTypeMap {
    pgcodec_test::setup_if_needed();

    let mut map = PgTypeMap::new();

    let fields = vec![
        CompositeField::new("name", map.type_for_name("text").unwrap()),
        CompositeField::new("supplier_id", map.type_for_name("int4").unwrap()),
        CompositeField::new("price", map.type_for_name("numeric").unwrap()),
    ];
    map.register_type(PgType::new(
        "inventory_item",
        INVENTORY_ITEM,
        CompositeCodec::new(fields),
    ));

    let element = map.type_for_oid(INVENTORY_ITEM).unwrap();
    map.register_type(PgType::new(
        "_inventory_item",
        INVENTORY_ITEM_ARRAY,
        ArrayCodec::new(element),
    ));

    map.register_type(PgType::new("hstore", HSTORE, HstoreCodec));

    map
}

fn encode(map: &PgTypeMap, oid: u32, format: PgValueFormat, value: &dyn HostValue) -> Vec<u8> {
    let mut buf = PgArgumentBuffer::new();
    map.encode(oid, format, value, &mut buf).unwrap();
    buf.into_inner()
}

fn items() -> Vec<InventoryItem> {
    vec![
        InventoryItem {
            name: "fuzzy dice".into(),
            supplier_id: 42,
            price: Some(PgNumeric::new(199, -2)),
        },
        InventoryItem {
            name: "".into(),
            supplier_id: -1,
            price: None,
        },
    ]
}

#[test]
fn it_round_trips_composites() {
    let map = registry();

    for format in FORMATS {
        for item in items() {
            let bytes = encode(&map, INVENTORY_ITEM, format, &item);

            let mut out = InventoryItem::default();
            map.scan(INVENTORY_ITEM, format, Some(&bytes), &mut out)
                .unwrap();

            assert_eq!(out, item, "{format}");
        }
    }
}

#[test]
fn it_writes_composite_text() {
    let map = registry();

    let bytes = encode(&map, INVENTORY_ITEM, PgValueFormat::Text, &items()[0]);
    assert_eq!(bytes, br#"("fuzzy dice",42,1.99)"#);

    let bytes = encode(&map, INVENTORY_ITEM, PgValueFormat::Text, &items()[1]);
    assert_eq!(bytes, br#"("",-1,)"#);
}

#[test]
fn it_round_trips_arrays_of_composites() {
    let map = registry();

    for format in FORMATS {
        let bytes = encode(&map, INVENTORY_ITEM_ARRAY, format, &items());

        let mut out: Vec<InventoryItem> = Vec::new();
        map.scan(INVENTORY_ITEM_ARRAY, format, Some(&bytes), &mut out)
            .unwrap();

        assert_eq!(out, items(), "{format}");
    }
}

#[test]
fn it_round_trips_multi_dimensional_arrays() {
    let map = registry();
    let grid = vec![vec![Some(1_i32), None, Some(3)], vec![Some(4), Some(5), None]];

    assert_eq!(
        encode(&map, oid::INT4_ARRAY, PgValueFormat::Text, &grid),
        b"{{1,NULL,3},{4,5,NULL}}"
    );

    for format in FORMATS {
        let bytes = encode(&map, oid::INT4_ARRAY, format, &grid);

        let mut out: Vec<Vec<Option<i32>>> = Vec::new();
        map.scan(oid::INT4_ARRAY, format, Some(&bytes), &mut out)
            .unwrap();

        assert_eq!(out, grid, "{format}");
    }
}

#[test]
fn it_rejects_ragged_arrays_before_writing() {
    let map = registry();
    let ragged = vec![vec![1_i32, 2], vec![3]];

    for format in FORMATS {
        let mut buf = PgArgumentBuffer::new();
        buf.extend_from_slice(b"keep");

        assert!(map
            .encode(oid::INT4_ARRAY, format, &ragged, &mut buf)
            .is_err());
        assert_eq!(&buf[..], b"keep", "{format}");
    }
}

#[test]
fn it_keeps_array_lower_bounds() {
    let map = registry();

    let mut array = PgArray::<i32>::default();
    map.scan(
        oid::INT4_ARRAY,
        PgValueFormat::Text,
        Some(b"[0:1]={5,6}"),
        &mut array,
    )
    .unwrap();

    assert_eq!(
        array.dimensions,
        [ArrayDimension {
            length: 2,
            lower_bound: 0
        }]
    );
    assert_eq!(array.elements, [5, 6]);

    for format in FORMATS {
        let bytes = encode(&map, oid::INT4_ARRAY, format, &array);

        let mut out = PgArray::<i32>::default();
        map.scan(oid::INT4_ARRAY, format, Some(&bytes), &mut out)
            .unwrap();

        assert_eq!(out, array, "{format}");
    }

    assert_eq!(
        encode(&map, oid::INT4_ARRAY, PgValueFormat::Text, &array),
        b"[0:1]={5,6}"
    );
}

#[test]
fn it_parses_quoted_array_elements() {
    let map = registry();
    let mut out: Vec<Option<String>> = Vec::new();

    map.scan(
        oid::TEXT_ARRAY,
        PgValueFormat::Text,
        Some(br#"{plain,"with space","esc\"aped",NULL,"NULL",null}"#),
        &mut out,
    )
    .unwrap();

    assert_eq!(
        out,
        [
            Some("plain".to_owned()),
            Some("with space".to_owned()),
            Some("esc\"aped".to_owned()),
            None,
            Some("NULL".to_owned()),
            None,
        ]
    );
}

#[test]
fn it_rejects_truncated_arrays() {
    let map = registry();
    let bytes = encode(&map, oid::INT4_ARRAY, PgValueFormat::Binary, &vec![1_i32, 2]);

    let mut out: Vec<i32> = Vec::new();
    let err = map
        .scan(
            oid::INT4_ARRAY,
            PgValueFormat::Binary,
            Some(&bytes[..bytes.len() - 1]),
            &mut out,
        )
        .unwrap_err();

    assert!(matches!(err, Error::Scan { .. }), "{err}");
}

#[test]
fn it_round_trips_range_bounds() {
    let map = registry();

    let kinds = [
        BoundType::Inclusive,
        BoundType::Exclusive,
        BoundType::Unbounded,
    ];

    let bound = |kind: BoundType, v: i64| match kind {
        BoundType::Inclusive => Bound::Included(v),
        BoundType::Exclusive => Bound::Excluded(v),
        _ => Bound::Unbounded,
    };

    let mut ranges = vec![PgRange::<i64>::empty()];
    for lower in kinds {
        for upper in kinds {
            ranges.push(PgRange::new(bound(lower, -5), bound(upper, 9)));
        }
    }

    for format in FORMATS {
        for range in &ranges {
            let bytes = encode(&map, oid::INT8_RANGE, format, range);

            let mut out = PgRange::<i64>::default();
            map.scan(oid::INT8_RANGE, format, Some(&bytes), &mut out)
                .unwrap();

            assert_eq!(&out, range, "{format}");
        }
    }
}

#[test]
fn it_writes_range_text() {
    let map = registry();

    assert_eq!(
        encode(&map, oid::INT4_RANGE, PgValueFormat::Text, &PgRange::from(1_i32..10)),
        b"[1,10)"
    );
    assert_eq!(
        encode(&map, oid::INT4_RANGE, PgValueFormat::Text, &PgRange::from(..=3_i32)),
        b"(,3]"
    );
    assert_eq!(
        encode(
            &map,
            oid::INT4_RANGE,
            PgValueFormat::Text,
            &PgRange::<i32>::empty()
        ),
        b"empty"
    );
}

#[test]
fn it_never_mixes_empty_bounds() {
    let map = registry();

    let mixed = PgRange {
        lower: 1_i32,
        upper: 2,
        lower_type: BoundType::Empty,
        upper_type: BoundType::Inclusive,
    };

    for format in FORMATS {
        let mut buf = PgArgumentBuffer::new();
        assert!(map
            .encode(oid::INT4_RANGE, format, &mixed, &mut buf)
            .is_err());
        assert!(buf.is_empty());
    }
}

#[test]
fn it_round_trips_multiranges() {
    let map = registry();

    let multirange = PgMultirange(vec![
        PgRange::from(1_i64..3),
        PgRange::from(5_i64..=7),
        PgRange::from(10_i64..),
    ]);

    for format in FORMATS {
        let bytes = encode(&map, oid::INT8_MULTIRANGE, format, &multirange);

        let mut out = PgMultirange::<i64>::default();
        map.scan(oid::INT8_MULTIRANGE, format, Some(&bytes), &mut out)
            .unwrap();

        assert_eq!(out, multirange, "{format}");
    }

    assert_eq!(
        encode(&map, oid::INT8_MULTIRANGE, PgValueFormat::Text, &multirange),
        b"{[1,3),[5,7],[10,)}"
    );
}

#[test]
fn it_scans_anonymous_records() {
    let map = registry();

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&2_i32.to_be_bytes());
    bytes.extend_from_slice(&oid::INT4.to_be_bytes());
    bytes.extend_from_slice(&4_i32.to_be_bytes());
    bytes.extend_from_slice(&7_i32.to_be_bytes());
    bytes.extend_from_slice(&oid::TEXT.to_be_bytes());
    bytes.extend_from_slice(&(-1_i32).to_be_bytes());

    let mut out: (i32, Option<String>) = (0, Some("stale".into()));
    map.scan(oid::RECORD, PgValueFormat::Binary, Some(&bytes), &mut out)
        .unwrap();
    assert_eq!(out, (7, None));

    let mut value = Value::Null;
    map.scan(oid::RECORD, PgValueFormat::Binary, Some(&bytes), &mut value)
        .unwrap();
    assert_eq!(value, Value::Record(vec![Value::Int4(7), Value::Null]));
}

#[test]
fn it_round_trips_hstore() {
    let map = registry();

    let store: PgHstore = [
        ("a".to_owned(), Some("1".to_owned())),
        ("b".to_owned(), None),
        ("quoted \"key\"".to_owned(), Some("x=>y".to_owned())),
    ]
    .into_iter()
    .collect();

    for format in FORMATS {
        let bytes = encode(&map, HSTORE, format, &store);

        let mut out = PgHstore::default();
        map.scan(HSTORE, format, Some(&bytes), &mut out).unwrap();

        assert_eq!(out, store, "{format}");
    }

    let map_value: HashMap<String, Option<String>> =
        [("k".to_owned(), Some("v".to_owned()))].into_iter().collect();

    let bytes = encode(&map, HSTORE, PgValueFormat::Text, &map_value);
    assert_eq!(bytes, br#""k"=>"v""#);
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct Settings {
    theme: String,
    width: u32,
}

#[test]
fn it_round_trips_json_wrappers() {
    let map = registry();

    let settings = Json(Settings {
        theme: "dark".into(),
        width: 80,
    });

    for oid in [oid::JSON, oid::JSONB] {
        for format in FORMATS {
            let bytes = encode(&map, oid, format, &settings);

            let mut out = Json(Settings::default());
            map.scan(oid, format, Some(&bytes), &mut out).unwrap();

            assert_eq!(out, settings, "{oid} {format}");
        }
    }

    let bytes = encode(&map, oid::JSONB, PgValueFormat::Binary, &settings);
    assert_eq!(bytes[0], 1);
}

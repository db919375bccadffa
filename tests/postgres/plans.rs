use std::sync::Arc;

use pgcodec::host::{DatabaseValuer, DynamicScanner, NullableValue, Shape};
use pgcodec::types::{EnumCodec, UndecodedBytes};
use pgcodec::{
    impl_host_newtype, impl_host_struct, oid, BoxDynError, Error, HostValue, IsNull, MapOptions,
    NullSearch, PgArgumentBuffer, PgType, PgTypeMap, PgValueFormat, Value,
};

const UNKNOWN_OID: u32 = 999_999;

#[derive(Debug, Default, PartialEq)]
struct UserId(i64);

impl_host_newtype!(UserId);

#[derive(Debug, Default, PartialEq)]
struct Dimensions {
    width: i32,
    height: i32,
}

impl_host_struct!(Dimensions { width, height });

#[derive(Debug)]
struct Celsius(f64);

impl DatabaseValuer for Celsius {
    fn database_value(&self) -> Result<Value, BoxDynError> {
        Ok(Value::Float8(self.0))
    }
}

impl HostValue for Celsius {
    pgcodec::impl_host_any!();

    fn as_database_valuer(&self) -> Option<&dyn DatabaseValuer> {
        Some(self)
    }
}

// Encodes as its field; the delegate is only a fallback.
#[derive(Debug)]
struct Tagged(i32);

impl DatabaseValuer for Tagged {
    fn database_value(&self) -> Result<Value, BoxDynError> {
        Ok(Value::Text("tagged".into()))
    }
}

impl HostValue for Tagged {
    pgcodec::impl_host_any!();

    fn shape(&self) -> Shape<'_> {
        Shape::Newtype(&self.0)
    }

    fn as_database_valuer(&self) -> Option<&dyn DatabaseValuer> {
        Some(self)
    }
}

// A nullable priority where "unset" is stored as -1.
#[derive(Debug)]
struct Priority(Option<i32>);

impl NullableValue for Priority {
    fn get(&self) -> Option<&dyn HostValue> {
        self.0.as_ref().map(|p| p as &dyn HostValue)
    }

    fn sample(&self) -> Box<dyn HostValue> {
        Box::new(0_i32)
    }
}

impl DatabaseValuer for Priority {
    fn database_value(&self) -> Result<Value, BoxDynError> {
        Ok(Value::Int4(self.0.unwrap_or(-1)))
    }
}

impl HostValue for Priority {
    pgcodec::impl_host_any!();

    fn shape(&self) -> Shape<'_> {
        Shape::Nullable(self)
    }

    fn as_database_valuer(&self) -> Option<&dyn DatabaseValuer> {
        Some(self)
    }
}

// Hands back text that parses as text again.
#[derive(Debug)]
struct Looping;

impl DatabaseValuer for Looping {
    fn database_value(&self) -> Result<Value, BoxDynError> {
        Ok(Value::Text("(1,2)".into()))
    }
}

impl HostValue for Looping {
    pgcodec::impl_host_any!();

    fn as_database_valuer(&self) -> Option<&dyn DatabaseValuer> {
        Some(self)
    }
}

#[derive(Debug, Default)]
struct Collector(Vec<Value>);

impl DynamicScanner for Collector {
    fn scan_value(&mut self, value: Value) -> Result<(), BoxDynError> {
        self.0.push(value);
        Ok(())
    }
}

impl HostValue for Collector {
    pgcodec::impl_host_any!();

    fn as_dynamic_scanner(&mut self) -> Option<&mut dyn DynamicScanner> {
        Some(self)
    }
}

fn setup() -> PgTypeMap {
    pgcodec_test::setup_if_needed();
    PgTypeMap::new()
}

#[test]
fn it_rejects_null_into_plain_integers() {
    let map = setup();
    let mut n = 5_i32;

    let err = map
        .scan(oid::INT4, PgValueFormat::Binary, None, &mut n)
        .unwrap_err();

    assert!(err.is_unexpected_null(), "{err}");
    assert_eq!(n, 5);
}

#[test]
fn it_clears_nullable_targets_on_null() {
    let map = setup();

    let mut n = Some(5_i32);
    map.scan(oid::INT4, PgValueFormat::Binary, None, &mut n)
        .unwrap();
    assert_eq!(n, None);

    let mut s = Some("stale".to_owned());
    map.scan(oid::TEXT, PgValueFormat::Text, None, &mut s).unwrap();
    assert_eq!(s, None);
}

#[test]
fn it_rejects_short_binary_integers() {
    let map = setup();
    let mut n = 0_i32;

    let err = map
        .scan(oid::INT4, PgValueFormat::Binary, Some(&[0, 0, 1]), &mut n)
        .unwrap_err();

    assert!(matches!(err, Error::Scan { oid: oid::INT4, .. }), "{err}");
}

#[test]
fn it_rejects_unsigned_overflow_into_int8() {
    let map = setup();
    let mut buf = PgArgumentBuffer::new();
    buf.extend_from_slice(b"prefix");

    let err = map
        .encode(oid::INT8, PgValueFormat::Binary, &u64::MAX, &mut buf)
        .unwrap_err();

    let Error::Encode {
        oid: oid::INT8,
        source,
        ..
    } = &err
    else {
        panic!("expected an encode error, got {err}");
    };
    assert!(
        matches!(source.downcast_ref::<Error>(), Some(Error::Overflow(_))),
        "{source}"
    );

    // nothing from the failed encode is left behind
    assert_eq!(&buf[..], b"prefix");

    map.encode(oid::INT8, PgValueFormat::Binary, &42_u64, &mut buf)
        .unwrap();
    assert_eq!(&buf[6..], 42_i64.to_be_bytes());
}

#[test]
fn it_encodes_absent_values_as_null() {
    let map = setup();
    let mut buf = PgArgumentBuffer::new();

    let is_null = map
        .encode(oid::INT4, PgValueFormat::Binary, &None::<i32>, &mut buf)
        .unwrap();

    assert!(matches!(is_null, IsNull::Yes));
    assert!(buf.is_empty());

    let is_null = map
        .encode(oid::INT4, PgValueFormat::Binary, &Value::Null, &mut buf)
        .unwrap();

    assert!(matches!(is_null, IsNull::Yes));
    assert!(buf.is_empty());
}

#[test]
fn it_searches_for_a_plan_that_scans_untyped_null() {
    let map = setup();

    // nothing can scan a composite from an unknown type
    let mut dims = Some(Dimensions {
        width: 1,
        height: 2,
    });

    let err = map
        .scan(
            UNKNOWN_OID,
            PgValueFormat::Binary,
            Some(&[0, 0, 0, 0]),
            &mut dims,
        )
        .unwrap_err();
    assert!(matches!(err, Error::Resolution { oid: UNKNOWN_OID, .. }), "{err}");

    // but some registered type can scan NULL into it
    map.scan(UNKNOWN_OID, PgValueFormat::Binary, None, &mut dims)
        .unwrap();
    assert_eq!(dims, None);
}

#[test]
fn it_reports_untyped_null_when_search_is_disabled() {
    pgcodec_test::setup_if_needed();

    let map = PgTypeMap::with_options(MapOptions::new().null_search(NullSearch::Disabled));
    let mut dims = Some(Dimensions::default());

    let err = map
        .scan(UNKNOWN_OID, PgValueFormat::Binary, None, &mut dims)
        .unwrap_err();

    assert!(matches!(err, Error::Resolution { .. }), "{err}");
    assert!(dims.is_some());
}

#[test]
fn it_infers_the_type_of_unknown_oids_from_the_value() {
    let map = setup();
    let mut buf = PgArgumentBuffer::new();

    map.encode(0, PgValueFormat::Binary, &7_i32, &mut buf)
        .unwrap();
    assert_eq!(&buf[..], [0, 0, 0, 7]);

    buf.clear();
    map.encode(0, PgValueFormat::Text, &vec![Some(1_i64), None], &mut buf)
        .unwrap();
    assert_eq!(&buf[..], b"{1,NULL}");

    assert!(map
        .plan_encode(0, PgValueFormat::Binary, &Dimensions::default())
        .is_none());
}

#[test]
fn it_converts_newtypes_as_their_field() {
    let map = setup();
    let mut buf = PgArgumentBuffer::new();

    map.encode(oid::INT8, PgValueFormat::Binary, &UserId(42), &mut buf)
        .unwrap();
    assert_eq!(&buf[..], 42_i64.to_be_bytes());

    let mut id = UserId::default();
    map.scan(oid::INT8, PgValueFormat::Binary, Some(&buf), &mut id)
        .unwrap();
    assert_eq!(id, UserId(42));

    let mut ids: Vec<UserId> = Vec::new();
    map.scan(oid::INT8_ARRAY, PgValueFormat::Text, Some(b"{1,2}"), &mut ids)
        .unwrap();
    assert_eq!(ids, [UserId(1), UserId(2)]);
}

#[test]
fn it_delegates_encoding_to_database_values() {
    let map = setup();
    let mut buf = PgArgumentBuffer::new();

    map.encode(oid::FLOAT8, PgValueFormat::Binary, &Celsius(21.5), &mut buf)
        .unwrap();
    assert_eq!(&buf[..], 21.5_f64.to_be_bytes());

    buf.clear();
    map.encode(oid::FLOAT8, PgValueFormat::Text, &Celsius(-3.0), &mut buf)
        .unwrap();
    assert_eq!(&buf[..], b"-3");
}

#[test]
fn it_prefers_wrapping_over_delegation() {
    let map = setup();
    let mut buf = PgArgumentBuffer::new();

    map.encode(oid::INT4, PgValueFormat::Binary, &Tagged(7), &mut buf)
        .unwrap();
    assert_eq!(&buf[..], [0, 0, 0, 7]);
}

#[test]
fn it_delegates_absent_values() {
    let map = setup();
    let mut buf = PgArgumentBuffer::new();

    let is_null = map
        .encode(oid::INT4, PgValueFormat::Binary, &Priority(Some(3)), &mut buf)
        .unwrap();
    assert!(matches!(is_null, IsNull::No));
    assert_eq!(&buf[..], 3_i32.to_be_bytes());

    buf.clear();
    let is_null = map
        .encode(oid::INT4, PgValueFormat::Binary, &Priority(None), &mut buf)
        .unwrap();
    assert!(matches!(is_null, IsNull::No));
    assert_eq!(&buf[..], (-1_i32).to_be_bytes());
}

#[test]
fn it_rejects_delegation_cycles() {
    let map = setup();
    let mut buf = PgArgumentBuffer::new();

    let err = map
        .encode(oid::RECORD, PgValueFormat::Binary, &Looping, &mut buf)
        .unwrap_err();

    let Error::Encode { source, .. } = &err else {
        panic!("expected an encode error, got {err}");
    };
    assert!(
        matches!(source.downcast_ref::<Error>(), Some(Error::DelegationCycle(_))),
        "{source}"
    );
    assert!(buf.is_empty());
}

#[test]
fn it_notifies_dynamic_scanners() {
    let map = setup();
    let mut collector = Collector::default();

    map.scan(
        oid::INT4,
        PgValueFormat::Binary,
        Some(&7_i32.to_be_bytes()),
        &mut collector,
    )
    .unwrap();
    map.scan(oid::INT4, PgValueFormat::Binary, None, &mut collector)
        .unwrap();

    assert_eq!(collector.0, [Value::Int4(7), Value::Null]);
}

#[test]
fn it_decodes_into_values() {
    let map = setup();

    let mut value = Value::Null;
    map.scan(
        oid::INT4,
        PgValueFormat::Binary,
        Some(&7_i32.to_be_bytes()),
        &mut value,
    )
    .unwrap();
    assert_eq!(value, Value::Int4(7));

    map.scan(oid::INT4, PgValueFormat::Binary, None, &mut value)
        .unwrap();
    assert_eq!(value, Value::Null);

    // unknown types come back raw
    let value = map
        .decode_database_value(UNKNOWN_OID, PgValueFormat::Binary, Some(&[1, 2]))
        .unwrap();
    assert_eq!(value, Value::Bytes(vec![1, 2]));

    // integers widen to int8
    let value = map
        .decode_database_value(oid::INT2, PgValueFormat::Text, Some(b"12"))
        .unwrap();
    assert_eq!(value, Value::Int8(12));
}

#[test]
fn it_passes_undecoded_bytes_through() {
    let map = setup();
    let mut raw = UndecodedBytes::default();

    map.scan(oid::INT4, PgValueFormat::Binary, Some(&[0, 0, 0, 1]), &mut raw)
        .unwrap();
    assert_eq!(raw.0.as_deref(), Some(&[0, 0, 0, 1][..]));

    map.scan(oid::INT4, PgValueFormat::Binary, None, &mut raw)
        .unwrap();
    assert_eq!(raw.0, None);
}

#[test]
fn it_registers_user_types_over_the_default_registry() {
    let mut map = setup();
    map.register_type(PgType::new("mood", 90_010, EnumCodec));

    assert_eq!(map.type_for_oid(90_010).unwrap().name(), "mood");
    assert_eq!(map.type_for_name("int4").unwrap().oid(), oid::INT4);
    assert!(pgcodec::shared_default().type_for_oid(90_010).is_none());

    let mut buf = PgArgumentBuffer::new();
    map.encode(90_010, PgValueFormat::Binary, &"happy", &mut buf)
        .unwrap();
    assert_eq!(&buf[..], b"happy");

    let mut mood = String::new();
    map.scan(90_010, PgValueFormat::Binary, Some(b"sad"), &mut mood)
        .unwrap();
    assert_eq!(mood, "sad");

    // a copy keeps local registrations
    let copy = map.copy();
    assert_eq!(copy.type_for_oid(90_010).unwrap().name(), "mood");
}

#[test]
fn it_reports_preferred_formats() {
    let map = setup();

    assert_eq!(map.format_code_for_oid(oid::INT4), PgValueFormat::Binary);
    assert_eq!(map.format_code_for_oid(UNKNOWN_OID), PgValueFormat::Text);
}

#[test]
fn it_memoizes_plans_per_host_type() {
    let map = setup();

    let first = map
        .plan_encode(oid::INT4, PgValueFormat::Binary, &1_i32)
        .unwrap();
    let second = map
        .plan_encode(oid::INT4, PgValueFormat::Binary, &2_i32)
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let mut a = 0_i64;
    let mut b = 0_i64;
    let first = map.plan_scan(oid::INT8, PgValueFormat::Text, &mut a);
    let second = map.plan_scan(oid::INT8, PgValueFormat::Text, &mut b);
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn it_bounds_wrapping_depth() {
    pgcodec_test::setup_if_needed();

    let shallow = PgTypeMap::with_options(MapOptions::new().max_depth(0));
    assert!(shallow
        .plan_encode(oid::INT4_ARRAY, PgValueFormat::Binary, &vec![1_i32])
        .is_none());

    let map = PgTypeMap::new();
    assert!(map
        .plan_encode(oid::INT4_ARRAY, PgValueFormat::Binary, &vec![1_i32])
        .is_some());
}

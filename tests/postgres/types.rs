use std::net::IpAddr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use ipnetwork::IpNetwork;
use pgcodec::{oid, PgArgumentBuffer, PgTypeMap, PgValueFormat};
use pgcodec::types::{PgBits, PgCircle, PgDate, PgInterval, PgNumeric, PgPoint, PgTimestamp};
use pgcodec_test::{test_decode_text, test_type};
use serde_json::json;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn datetime(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, us: u32) -> NaiveDateTime {
    date(y, mo, d).and_hms_micro_opt(h, mi, s, us).unwrap()
}

fn numeric(s: &str) -> PgNumeric {
    s.parse().unwrap()
}

test_type!(null<Option<i16>>(oid::INT2,
    "10" == Some(10_i16),
    "-1" == Some(-1_i16),
));

test_type!(null_vec<Vec<Option<i16>>>(oid::INT2_ARRAY,
    "{10,NULL,50}" == vec![Some(10_i16), None, Some(50)],
));

test_type!(null_array<[Option<i16>; 3]>(oid::INT2_ARRAY,
    "{10,NULL,50}" == [Some(10_i16), None, Some(50)],
));

test_type!(bool<bool>(oid::BOOL,
    "f" == false,
    "t" == true,
));

test_type!(bool_vec<Vec<bool>>(oid::BOOL_ARRAY,
    "{t,f,t}" == vec![true, false, true],
));

test_type!(bool_array<[bool; 3]>(oid::BOOL_ARRAY,
    "{t,f,t}" == [true, false, true],
));

test_type!(byte_vec<Vec<u8>>(oid::BYTEA,
    r"\xdeadbeef" == vec![0xDE_u8, 0xAD, 0xBE, 0xEF],
    r"\x" == Vec::<u8>::new(),
    r"\x0000000052" == vec![0_u8, 0, 0, 0, 0x52],
));

test_type!(i16(oid::INT2,
    "-32768" == i16::MIN,
    "0" == 0_i16,
    "32767" == i16::MAX,
));

test_type!(i32(oid::INT4,
    "-2147483648" == i32::MIN,
    "94101" == 94101_i32,
    "2147483647" == i32::MAX,
));

test_type!(i64(oid::INT8,
    "-9223372036854775808" == i64::MIN,
    "0" == 0_i64,
    "9223372036854775807" == i64::MAX,
));

test_type!(i32_as_int8<i32>(oid::INT8,
    "-5" == -5_i32,
    "2147483647" == i32::MAX,
));

test_type!(oid<u32>(oid::OID,
    "0" == 0_u32,
    "4294967295" == u32::MAX,
));

test_type!(xid8<u64>(oid::XID8,
    "18446744073709551615" == u64::MAX,
));

test_type!(f32(oid::FLOAT4,
    "3.5" == 3.5_f32,
    "-0.25" == -0.25_f32,
));

test_type!(f64(oid::FLOAT8,
    "939399419.1225182" == 939399419.1225182_f64,
    "0" == 0.0_f64,
));

test_type!(numeric<PgNumeric>(oid::NUMERIC,
    "0" == PgNumeric::new(0, 0),
    "12.50" == PgNumeric::new(1250, -2),
    "100" == PgNumeric::new(1, 2),
    "-0.0001" == PgNumeric::new(-1, -4),
    "NaN" == PgNumeric::NaN,
    "Infinity" == PgNumeric::Infinity,
    "-Infinity" == PgNumeric::NegativeInfinity,
    "123456789012345678901234567890.000000000000000000001"
        == numeric("123456789012345678901234567890.000000000000000000001"),
    "10000000000000000000000000000000000000000" == PgNumeric::new(1, 40),
));

test_type!(numeric_vec<Vec<PgNumeric>>(oid::NUMERIC_ARRAY,
    "{1.5,NaN,-3}" == vec![PgNumeric::new(15, -1), PgNumeric::NaN, PgNumeric::new(-3, 0)],
));

test_type!(string<String>(oid::TEXT,
    "hello, world" == "hello, world".to_owned(),
    "" == String::new(),
));

test_type!(varchar<String>(oid::VARCHAR,
    "this is foo" == "this is foo".to_owned(),
));

test_type!(string_vec<Vec<String>>(oid::TEXT_ARRAY,
    r#"{"a b",c,"","\"quoted\"","NULL"}"#
        == vec!["a b".to_owned(), "c".into(), "".into(), "\"quoted\"".into(), "NULL".into()],
));

test_type!(uuid<Uuid>(oid::UUID,
    "a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11"
        == Uuid::parse_str("a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11").unwrap(),
    "00000000-0000-0000-0000-000000000000" == Uuid::nil(),
));

test_type!(pg_date<PgDate>(oid::DATE,
    "2020-02-29" == PgDate::Finite(date(2020, 2, 29)),
    "0044-03-15 BC" == PgDate::Finite(date(-43, 3, 15)),
    "infinity" == PgDate::Infinity,
    "-infinity" == PgDate::NegativeInfinity,
));

test_type!(chrono_date<NaiveDate>(oid::DATE,
    "2001-01-05" == date(2001, 1, 5),
    "2050-11-23" == date(2050, 11, 23),
));

test_type!(chrono_date_time<NaiveDateTime>(oid::TIMESTAMP,
    "2019-01-02 05:10:20" == datetime(2019, 1, 2, 5, 10, 20, 0),
    "2024-02-29 13:05:09.25" == datetime(2024, 2, 29, 13, 5, 9, 250_000),
));

test_type!(pg_timestamp<PgTimestamp>(oid::TIMESTAMP,
    "infinity" == PgTimestamp::Infinity,
    "2019-01-02 05:10:20" == PgTimestamp::Finite(datetime(2019, 1, 2, 5, 10, 20, 0)),
));

test_type!(chrono_date_time_tz<DateTime<Utc>>(oid::TIMESTAMPTZ,
    "2024-01-01 10:00:00+00" == datetime(2024, 1, 1, 10, 0, 0, 0).and_utc(),
    "2024-01-01 12:30:00+02:30" == datetime(2024, 1, 1, 10, 0, 0, 0).and_utc(),
));

test_type!(chrono_time<NaiveTime>(oid::TIME,
    "05:10:20.115100" == NaiveTime::from_hms_micro_opt(5, 10, 20, 115_100).unwrap(),
    "00:00:00" == NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
));

test_type!(interval<PgInterval>(oid::INTERVAL,
    "1 year 2 mons 3 days 04:05:06.5" == PgInterval { months: 14, days: 3, microseconds: 14_706_500_000 },
    "-2 days +00:01:00" == PgInterval { months: 0, days: -2, microseconds: 60_000_000 },
    "00:00:00" == PgInterval::default(),
));

test_type!(varbit<PgBits>(oid::VARBIT,
    "1010000011" == [true, false, true, false, false, false, false, false, true, true]
        .into_iter()
        .collect::<PgBits>(),
    "" == PgBits::default(),
));

test_type!(jsonb<serde_json::Value>(oid::JSONB,
    r#"{"a": [1, 2]}"# == json!({ "a": [1, 2] }),
    r#""text""# == json!("text"),
));

test_type!(point<PgPoint>(oid::POINT,
    "(1.5,-2)" == PgPoint { x: 1.5, y: -2.0 },
));

test_type!(circle<PgCircle>(oid::CIRCLE,
    "<(1,2),3>" == PgCircle { x: 1.0, y: 2.0, r: 3.0 },
));

test_decode_text!(bool_spellings<bool>(oid::BOOL,
    "true" == true,
    "yes" == true,
    "off" == false,
));

test_decode_text!(timestamp_t_separator<NaiveDateTime>(oid::TIMESTAMP,
    "2024-02-29T13:05:09.25" == datetime(2024, 2, 29, 13, 5, 9, 250_000),
));

test_decode_text!(interval_postgres_style<PgInterval>(oid::INTERVAL,
    "@ 1 day 2 hours ago" == PgInterval { months: 0, days: -1, microseconds: -7_200_000_000 },
    "1.5 secs 2 weeks" == PgInterval { months: 0, days: 14, microseconds: 1_500_000 },
));

test_decode_text!(int_array_with_bounds<Vec<i32>>(oid::INT4_ARRAY,
    "[0:2]={1,2,3}" == vec![1, 2, 3],
));

#[test]
fn test_inet_and_cidr() -> anyhow::Result<()> {
    pgcodec_test::setup_if_needed();

    let map = PgTypeMap::new();

    for oid in [oid::INET, oid::CIDR] {
        for text in ["192.168.0.1", "10.0.0.0/8", "2001:db8::/32"] {
            let mut net: IpNetwork = "0.0.0.0".parse()?;
            map.scan(oid, PgValueFormat::Text, Some(text.as_bytes()), &mut net)?;
            assert_eq!(net, text.parse::<IpNetwork>()?);

            let mut buf = PgArgumentBuffer::new();
            map.encode(oid, PgValueFormat::Text, &net, &mut buf)?;
            assert_eq!(&buf[..], text.as_bytes());

            buf.clear();
            map.encode(oid, PgValueFormat::Binary, &net, &mut buf)?;

            let mut out: IpNetwork = "0.0.0.0".parse()?;
            map.scan(oid, PgValueFormat::Binary, Some(&buf), &mut out)?;
            assert_eq!(out, net);
        }
    }

    Ok(())
}

#[test]
fn test_ip_addr_through_inet() -> anyhow::Result<()> {
    pgcodec_test::setup_if_needed();

    let map = PgTypeMap::new();
    let addr: IpAddr = "10.1.2.3".parse()?;

    // no OID: inferred as inet
    let mut buf = PgArgumentBuffer::new();
    map.encode(0, PgValueFormat::Binary, &addr, &mut buf)?;
    assert_eq!(&buf[..], [2, 32, 0, 4, 10, 1, 2, 3]);

    let mut out: IpAddr = [0, 0, 0, 0].into();
    map.scan(oid::INET, PgValueFormat::Binary, Some(&buf), &mut out)?;
    assert_eq!(out, addr);

    let mut out: IpAddr = [0, 0, 0, 0].into();
    map.scan(oid::INET, PgValueFormat::Text, Some(b"::1"), &mut out)?;
    assert_eq!(out, "::1".parse::<IpAddr>()?);

    // a network with a prefix is not a single address
    assert!(map
        .scan(oid::CIDR, PgValueFormat::Text, Some(b"10.0.0.0/8"), &mut out)
        .is_err());

    Ok(())
}

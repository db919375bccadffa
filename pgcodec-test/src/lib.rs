use std::fmt::Debug;

use anyhow::{ensure, Context};
use pgcodec::{HostValue, IsNull, PgArgumentBuffer, PgTypeMap, PgValueFormat};

#[doc(hidden)]
pub use {anyhow, paste, pgcodec};

pub fn setup_if_needed() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Scan the literal, then encode the expected value as text and scan it back
pub fn check_text<T>(map: &PgTypeMap, oid: u32, text: &str, expected: &T) -> anyhow::Result<()>
where
    T: HostValue + Default + PartialEq + Debug,
{
    check_decode_text(map, oid, text, expected)?;

    let encoded = encode(map, oid, PgValueFormat::Text, expected)?;

    let mut decoded = T::default();
    map.scan(oid, PgValueFormat::Text, Some(&encoded), &mut decoded)
        .with_context(|| {
            format!(
                "scanning back {:?} as OID {oid}",
                String::from_utf8_lossy(&encoded)
            )
        })?;

    ensure!(
        decoded == *expected,
        "text round trip of {expected:?} through {:?} produced {decoded:?}",
        String::from_utf8_lossy(&encoded)
    );

    Ok(())
}

pub fn check_decode_text<T>(
    map: &PgTypeMap,
    oid: u32,
    text: &str,
    expected: &T,
) -> anyhow::Result<()>
where
    T: HostValue + Default + PartialEq + Debug,
{
    let mut decoded = T::default();
    map.scan(oid, PgValueFormat::Text, Some(text.as_bytes()), &mut decoded)
        .with_context(|| format!("scanning {text:?} as OID {oid}"))?;

    ensure!(
        decoded == *expected,
        "scanning {text:?} produced {decoded:?}, expected {expected:?}"
    );

    Ok(())
}

pub fn check_binary<T>(map: &PgTypeMap, oid: u32, expected: &T) -> anyhow::Result<()>
where
    T: HostValue + Default + PartialEq + Debug,
{
    let encoded = encode(map, oid, PgValueFormat::Binary, expected)?;

    let mut decoded = T::default();
    map.scan(oid, PgValueFormat::Binary, Some(&encoded), &mut decoded)
        .with_context(|| format!("scanning back {encoded:02x?} as OID {oid}"))?;

    ensure!(
        decoded == *expected,
        "binary round trip of {expected:?} produced {decoded:?}"
    );

    Ok(())
}

fn encode(
    map: &PgTypeMap,
    oid: u32,
    format: PgValueFormat,
    value: &dyn HostValue,
) -> anyhow::Result<Vec<u8>> {
    let mut buf = PgArgumentBuffer::new();

    let is_null = map
        .encode(oid, format, value, &mut buf)
        .with_context(|| format!("encoding {value:?} as OID {oid} in {format} format"))?;

    ensure!(
        matches!(is_null, IsNull::No),
        "{value:?} encoded as NULL in {format} format"
    );

    Ok(buf.into_inner())
}

// Test type encoding and decoding in both formats
#[macro_export]
macro_rules! test_type {
    ($name:ident<$ty:ty>($oid:expr, $($text:literal == $value:expr),+ $(,)?)) => {
        $crate::paste::paste! {
            #[test]
            fn [< test_type_ $name >]() -> $crate::anyhow::Result<()> {
                $crate::setup_if_needed();

                let map = $crate::pgcodec::PgTypeMap::new();

                $(
                    let expected: $ty = $value;

                    $crate::check_text(&map, $oid, $text, &expected)?;
                    $crate::check_binary(&map, $oid, &expected)?;
                )+

                Ok(())
            }
        }
    };

    ($name:ident($oid:expr, $($text:literal == $value:expr),+ $(,)?)) => {
        $crate::test_type!($name<$name>($oid, $($text == $value),+));
    };
}

// Test text decoding only
#[macro_export]
macro_rules! test_decode_text {
    ($name:ident<$ty:ty>($oid:expr, $($text:literal == $value:expr),+ $(,)?)) => {
        $crate::paste::paste! {
            #[test]
            fn [< test_decode_text_ $name >]() -> $crate::anyhow::Result<()> {
                $crate::setup_if_needed();

                let map = $crate::pgcodec::PgTypeMap::new();

                $(
                    let expected: $ty = $value;

                    $crate::check_decode_text(&map, $oid, $text, &expected)?;
                )+

                Ok(())
            }
        }
    };
}

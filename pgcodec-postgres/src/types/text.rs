use std::sync::Arc;

use pgcodec_core::error::BoxDynError;
use pgcodec_core::IsNull;

use crate::codec::Codec;
use crate::host::HostValue;
use crate::map::PgTypeMap;
use crate::plan::{self, text, value_ref, EncodeFn, EncodePlan, ScanPlan};
use crate::value::{PgValueFormat, Value};

// The binary and text encodings of every text-like type are the UTF-8 bytes.

fn plan_text_encode(value: &dyn HostValue) -> Option<Arc<dyn EncodePlan>> {
    if value.is::<String>() || value.is::<&'static str>() {
        return Some(plan::string_text_encode_plan());
    }

    if value.is::<Vec<u8>>() {
        return Some(EncodeFn::arc("Vec<u8> to any text", |_, value, buf| {
            let bytes = value_ref::<Vec<u8>>(value)?;
            std::str::from_utf8(bytes)?;

            buf.extend_from_slice(bytes);
            Ok(IsNull::No)
        }));
    }

    if value.as_text_valuer().is_some() {
        return Some(plan::text_valuer_encode_plan());
    }

    None
}

fn plan_text_scan(target: &mut dyn HostValue) -> Option<Arc<dyn ScanPlan>> {
    if target.is::<String>() {
        return Some(plan::string_scan_plan());
    }

    if target.is::<Vec<u8>>() {
        return Some(plan::text_to_bytes_scan_plan());
    }

    if target.as_text_scanner().is_some() {
        return Some(plan::text_scanner_scan_plan());
    }

    None
}

fn decode_text_value(src: Option<&[u8]>) -> Result<Value, BoxDynError> {
    Ok(match src {
        Some(src) => Value::Text(text(src)?.to_owned()),
        None => Value::Null,
    })
}

macro_rules! text_codec {
    ($(#[$meta:meta])* $codec:ident) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $codec;

        impl Codec for $codec {
            fn format_supported(&self, _: PgValueFormat) -> bool {
                true
            }

            fn preferred_format(&self) -> PgValueFormat {
                PgValueFormat::Text
            }

            fn plan_encode(
                &self,
                _: &PgTypeMap,
                _: u32,
                _: PgValueFormat,
                value: &dyn HostValue,
            ) -> Option<Arc<dyn EncodePlan>> {
                plan_text_encode(value)
            }

            fn plan_scan(
                &self,
                _: &PgTypeMap,
                _: u32,
                _: PgValueFormat,
                target: &mut dyn HostValue,
            ) -> Option<Arc<dyn ScanPlan>> {
                plan_text_scan(target)
            }

            fn decode_value(
                &self,
                _: &PgTypeMap,
                _: u32,
                _: PgValueFormat,
                src: Option<&[u8]>,
            ) -> Result<Value, BoxDynError> {
                decode_text_value(src)
            }

            fn decode_database_value(
                &self,
                _: &PgTypeMap,
                _: u32,
                _: PgValueFormat,
                src: Option<&[u8]>,
            ) -> Result<Value, BoxDynError> {
                decode_text_value(src)
            }
        }
    };
}

text_codec!(
    /// `text` and the other character types: `varchar`, `bpchar`, `name`, `unknown`.
    TextCodec
);

text_codec!(
    /// A user-defined enum. Labels travel as text in both formats.
    EnumCodec
);

text_codec!(
    /// `xml`, passed through as text.
    XmlCodec
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_utf8_is_rejected() {
        assert!(decode_text_value(Some(&[0xff, 0xfe])).is_err());
        assert_eq!(
            decode_text_value(Some(b"hello")).unwrap(),
            Value::Text("hello".into())
        );
        assert_eq!(decode_text_value(None).unwrap(), Value::Null);
    }
}

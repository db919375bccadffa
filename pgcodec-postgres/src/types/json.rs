// <https://www.postgresql.org/docs/current/datatype-json.html>
//
// `json` is its text in both formats. `jsonb` is the same text in text format and prefixed with a
// single version byte in binary format.
use std::fmt::Debug;
use std::sync::Arc;

use pgcodec_core::error::{unexpected_null, BoxDynError, Error};
use pgcodec_core::IsNull;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::codec::Codec;
use crate::host::{HostValue, JsonScanner, JsonValuer};
use crate::map::PgTypeMap;
use crate::plan::{
    missing_capability, not_null, target_mut, text, value_ref, EncodeFn, EncodePlan, ScanFn,
    ScanPlan,
};
use crate::value::{PgValueFormat, Value};

/// JSONB version (as of PostgreSQL 16)
const JSONB_VERSION: u8 = 1;

/// Stores any `serde` type as `json` or `jsonb`.
///
/// ```rust,ignore
/// #[derive(Debug, Default, Serialize, Deserialize)]
/// struct Settings { theme: String }
///
/// let mut target = Json(Settings::default());
/// map.scan(oid::JSONB, PgValueFormat::Binary, Some(bytes), &mut target)?;
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Json<T: ?Sized>(pub T);

impl<T> JsonValuer for Json<T>
where
    T: Serialize,
{
    fn json_value(&self) -> Result<Option<Vec<u8>>, BoxDynError> {
        Ok(Some(serde_json::to_vec(&self.0)?))
    }
}

impl<T> JsonScanner for Json<T>
where
    T: DeserializeOwned,
{
    fn scan_json(&mut self, v: Option<&[u8]>) -> Result<(), BoxDynError> {
        let v = v.ok_or_else(unexpected_null::<Self>)?;
        self.0 = serde_json::from_slice(v)?;
        Ok(())
    }
}

impl<T> HostValue for Json<T>
where
    T: Serialize + DeserializeOwned + Debug + 'static,
{
    crate::impl_host_any!();

    fn as_json_valuer(&self) -> Option<&dyn JsonValuer> {
        Some(self)
    }

    fn as_json_scanner(&mut self) -> Option<&mut dyn JsonScanner> {
        Some(self)
    }
}

impl JsonValuer for JsonValue {
    fn json_value(&self) -> Result<Option<Vec<u8>>, BoxDynError> {
        Ok(Some(serde_json::to_vec(self)?))
    }
}

// SQL `NULL` becomes JSON `null`; use `Option<JsonValue>` to tell them apart.
impl JsonScanner for JsonValue {
    fn scan_json(&mut self, v: Option<&[u8]>) -> Result<(), BoxDynError> {
        *self = match v {
            Some(v) => serde_json::from_slice(v)?,
            None => JsonValue::Null,
        };

        Ok(())
    }
}

impl HostValue for JsonValue {
    crate::impl_host_any!();

    fn as_json_valuer(&self) -> Option<&dyn JsonValuer> {
        Some(self)
    }

    fn as_json_scanner(&mut self) -> Option<&mut dyn JsonScanner> {
        Some(self)
    }
}

/// Strip the `jsonb` version byte from a binary payload.
fn jsonb_payload(src: &[u8]) -> Result<&[u8], BoxDynError> {
    match src.split_first() {
        Some((&JSONB_VERSION, rest)) => Ok(rest),
        Some((version, _)) => {
            Err(Error::protocol(format!("unsupported JSONB format version {version}")).into())
        }
        None => Err(Error::protocol("empty JSONB payload").into()),
    }
}

/// The JSON text of a payload, whichever of the two types and formats it arrived in.
fn payload(versioned: bool, src: &[u8]) -> Result<&[u8], BoxDynError> {
    if versioned {
        jsonb_payload(src)
    } else {
        Ok(src)
    }
}

fn plan_encode(versioned: bool, value: &dyn HostValue) -> Option<Arc<dyn EncodePlan>> {
    macro_rules! plan {
        ($name:literal, |$value:ident| $json:expr) => {
            if versioned {
                EncodeFn::arc($name, |_, $value, buf| {
                    let Some(json) = $json else {
                        return Ok(IsNull::Yes);
                    };
                    buf.push(JSONB_VERSION);
                    buf.extend_from_slice(&json[..]);
                    Ok(IsNull::No)
                })
            } else {
                EncodeFn::arc($name, |_, $value, buf| {
                    let Some(json) = $json else {
                        return Ok(IsNull::Yes);
                    };
                    buf.extend_from_slice(&json[..]);
                    Ok(IsNull::No)
                })
            }
        };
    }

    // strings and bytes are taken to already hold JSON text
    if value.is::<String>() {
        return Some(plan!("String to json", |value| Some(
            value_ref::<String>(value)?.as_bytes()
        )));
    }

    if value.is::<&'static str>() {
        return Some(plan!("&str to json", |value| Some(
            value_ref::<&'static str>(value)?.as_bytes()
        )));
    }

    if value.is::<Vec<u8>>() {
        return Some(plan!("Vec<u8> to json", |value| Some(value_ref::<Vec<u8>>(
            value
        )?)));
    }

    if value.as_json_valuer().is_some() {
        return Some(plan!("JsonValuer to json", |value| value
            .as_json_valuer()
            .ok_or_else(|| missing_capability(value.type_name(), "JsonValuer"))?
            .json_value()?));
    }

    None
}

fn plan_scan(versioned: bool, target: &mut dyn HostValue) -> Option<Arc<dyn ScanPlan>> {
    macro_rules! plan {
        ($name:literal, |$json:ident, $target:ident| $body:expr) => {
            if versioned {
                ScanFn::arc($name, |_, src, $target| {
                    let $json = src.map(jsonb_payload).transpose()?;
                    $body
                })
            } else {
                ScanFn::arc($name, |_, src, $target| {
                    let $json = src;
                    $body
                })
            }
        };
    }

    if target.is::<String>() {
        return Some(plan!("json to String", |json, target| {
            let json = text(not_null::<String>(json)?)?;
            let s = target_mut::<String>(target)?;
            s.clear();
            s.push_str(json);
            Ok(())
        }));
    }

    if target.is::<Vec<u8>>() {
        return Some(plan!("json to Vec<u8>", |json, target| {
            let json = not_null::<Vec<u8>>(json)?;
            let bytes = target_mut::<Vec<u8>>(target)?;
            bytes.clear();
            bytes.extend_from_slice(json);
            Ok(())
        }));
    }

    if target.as_json_scanner().is_some() {
        return Some(plan!("json to JsonScanner", |json, target| {
            let host = target.type_name();
            target
                .as_json_scanner()
                .ok_or_else(|| missing_capability(host, "JsonScanner"))?
                .scan_json(json)
        }));
    }

    None
}

fn decode_value(versioned: bool, src: Option<&[u8]>) -> Result<Value, BoxDynError> {
    let Some(src) = src else {
        return Ok(Value::Null);
    };

    Ok(Value::Json(serde_json::from_slice(payload(versioned, src)?)?))
}

fn decode_database_value(versioned: bool, src: Option<&[u8]>) -> Result<Value, BoxDynError> {
    let Some(src) = src else {
        return Ok(Value::Null);
    };

    Ok(Value::Text(text(payload(versioned, src)?)?.to_owned()))
}

/// `json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
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
        plan_encode(false, value)
    }

    fn plan_scan(
        &self,
        _: &PgTypeMap,
        _: u32,
        _: PgValueFormat,
        target: &mut dyn HostValue,
    ) -> Option<Arc<dyn ScanPlan>> {
        plan_scan(false, target)
    }

    fn decode_value(
        &self,
        _: &PgTypeMap,
        _: u32,
        _: PgValueFormat,
        src: Option<&[u8]>,
    ) -> Result<Value, BoxDynError> {
        decode_value(false, src)
    }

    fn decode_database_value(
        &self,
        _: &PgTypeMap,
        _: u32,
        _: PgValueFormat,
        src: Option<&[u8]>,
    ) -> Result<Value, BoxDynError> {
        decode_database_value(false, src)
    }
}

/// `jsonb`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonbCodec;

impl Codec for JsonbCodec {
    fn format_supported(&self, _: PgValueFormat) -> bool {
        true
    }

    fn preferred_format(&self) -> PgValueFormat {
        PgValueFormat::Binary
    }

    fn plan_encode(
        &self,
        _: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        value: &dyn HostValue,
    ) -> Option<Arc<dyn EncodePlan>> {
        plan_encode(format == PgValueFormat::Binary, value)
    }

    fn plan_scan(
        &self,
        _: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        target: &mut dyn HostValue,
    ) -> Option<Arc<dyn ScanPlan>> {
        plan_scan(format == PgValueFormat::Binary, target)
    }

    fn decode_value(
        &self,
        _: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        src: Option<&[u8]>,
    ) -> Result<Value, BoxDynError> {
        decode_value(format == PgValueFormat::Binary, src)
    }

    fn decode_database_value(
        &self,
        _: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        src: Option<&[u8]>,
    ) -> Result<Value, BoxDynError> {
        decode_database_value(format == PgValueFormat::Binary, src)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Settings {
        theme: String,
        width: u32,
    }

    #[test]
    fn test_jsonb_version_byte() {
        assert_eq!(jsonb_payload(b"\x01{}").unwrap(), b"{}");
        assert!(jsonb_payload(b"\x02{}").is_err());
        assert!(jsonb_payload(b"").is_err());
    }

    #[test]
    fn test_json_wrapper() {
        let settings = Json(Settings {
            theme: "dark".into(),
            width: 80,
        });

        let json = settings.json_value().unwrap().unwrap();
        assert_eq!(json, br#"{"theme":"dark","width":80}"#);

        let mut target = Json(Settings::default());
        target.scan_json(Some(&json)).unwrap();
        assert_eq!(target, settings);

        assert!(target.scan_json(None).is_err());
    }

    #[test]
    fn test_json_value_null() {
        let mut value = serde_json::json!({ "a": 1 });
        value.scan_json(None).unwrap();
        assert_eq!(value, JsonValue::Null);
    }
}

//! Encode and scan plans, plus the plans the registry builds itself.
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use pgcodec_core::error::{
    unexpected_null, BoxDynError, Direction, Error, UnexpectedNullError,
};
use pgcodec_core::IsNull;

use crate::arguments::PgArgumentBuffer;
use crate::host::HostValue;
use crate::map::PgTypeMap;
use crate::type_info::PgType;
use crate::types::UndecodedBytes;
use crate::value::{PgValueFormat, Value};

/// Converts one host type into one wire type and format.
///
/// Resolved once by [`PgTypeMap::plan_encode`] and reused for every value of the same host type.
pub trait EncodePlan: Send + Sync + fmt::Debug {
    /// Append the encoding of `value` to `buf`, or return [`IsNull::Yes`] without writing
    /// anything for SQL `NULL`.
    fn encode(
        &self,
        map: &PgTypeMap,
        value: &dyn HostValue,
        buf: &mut PgArgumentBuffer,
    ) -> Result<IsNull, BoxDynError>;
}

/// Converts one wire type and format into one host type.
pub trait ScanPlan: Send + Sync + fmt::Debug {
    /// Overwrite `target` with the value in `src`; `None` is SQL `NULL`.
    fn scan(
        &self,
        map: &PgTypeMap,
        src: Option<&[u8]>,
        target: &mut dyn HostValue,
    ) -> Result<(), BoxDynError>;

    /// `true` for the plan returned when nothing could be resolved.
    fn is_failure(&self) -> bool {
        false
    }
}

pub(crate) type EncodeFnPtr =
    fn(&PgTypeMap, &dyn HostValue, &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError>;

pub(crate) type ScanFnPtr =
    fn(&PgTypeMap, Option<&[u8]>, &mut dyn HostValue) -> Result<(), BoxDynError>;

/// A stateless encode plan backed by a function.
pub(crate) struct EncodeFn {
    name: &'static str,
    f: EncodeFnPtr,
}

impl EncodeFn {
    pub(crate) fn arc(name: &'static str, f: EncodeFnPtr) -> Arc<dyn EncodePlan> {
        Arc::new(EncodeFn { name, f })
    }
}

impl fmt::Debug for EncodeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EncodeFn").field(&self.name).finish()
    }
}

impl EncodePlan for EncodeFn {
    fn encode(
        &self,
        map: &PgTypeMap,
        value: &dyn HostValue,
        buf: &mut PgArgumentBuffer,
    ) -> Result<IsNull, BoxDynError> {
        (self.f)(map, value, buf)
    }
}

/// A stateless scan plan backed by a function.
pub(crate) struct ScanFn {
    name: &'static str,
    f: ScanFnPtr,
}

impl ScanFn {
    pub(crate) fn arc(name: &'static str, f: ScanFnPtr) -> Arc<dyn ScanPlan> {
        Arc::new(ScanFn { name, f })
    }
}

impl fmt::Debug for ScanFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScanFn").field(&self.name).finish()
    }
}

impl ScanPlan for ScanFn {
    fn scan(
        &self,
        map: &PgTypeMap,
        src: Option<&[u8]>,
        target: &mut dyn HostValue,
    ) -> Result<(), BoxDynError> {
        (self.f)(map, src, target)
    }
}

/// Downcast an encode input to the type its plan was built for.
pub(crate) fn value_ref<'v, T: Any>(value: &'v dyn HostValue) -> Result<&'v T, BoxDynError> {
    value.downcast_ref::<T>().ok_or_else(|| {
        format!(
            "encode plan for {} received {}",
            type_name::<T>(),
            value.type_name()
        )
        .into()
    })
}

/// Downcast a scan target to the type its plan was built for.
pub(crate) fn target_mut<'t, T: Any>(
    target: &'t mut dyn HostValue,
) -> Result<&'t mut T, BoxDynError> {
    target.downcast_mut::<T>().ok_or_else(|| {
        Box::new(Error::ScanTargetChanged {
            expected: type_name::<T>(),
        }) as BoxDynError
    })
}

pub(crate) fn missing_capability(host_type: &'static str, capability: &str) -> BoxDynError {
    format!("{host_type} does not provide {capability}").into()
}

/// Borrow `src` as UTF-8.
pub(crate) fn text(src: &[u8]) -> Result<&str, BoxDynError> {
    Ok(std::str::from_utf8(src)?)
}

/// Borrow a non-`NULL` payload, or fail with an unexpected `NULL` for `T`.
pub(crate) fn not_null<T: ?Sized>(src: Option<&[u8]>) -> Result<&[u8], BoxDynError> {
    src.ok_or_else(unexpected_null::<T>)
}

/// Borrow a non-`NULL` payload for a target only known at runtime.
pub(crate) fn not_null_for<'a>(
    src: Option<&'a [u8]>,
    host_type: &'static str,
) -> Result<&'a [u8], BoxDynError> {
    src.ok_or_else(|| Box::new(UnexpectedNullError { host_type }) as BoxDynError)
}

/// Check a fixed-width binary payload.
pub(crate) fn expect_len(src: &[u8], len: usize, what: &str) -> Result<(), BoxDynError> {
    if src.len() != len {
        return Err(Error::Protocol(format!(
            "invalid length for {what}: expected {len} bytes, found {}",
            src.len()
        ))
        .into());
    }

    Ok(())
}

/// Run `plan` for one element of a structural value. `NULL` elements skip the plan.
pub(crate) fn encode_element(
    map: &PgTypeMap,
    plan: &dyn EncodePlan,
    value: &dyn HostValue,
    buf: &mut PgArgumentBuffer,
) -> Result<IsNull, BoxDynError> {
    if value.is_null() && value.as_database_valuer().is_none() {
        return Ok(IsNull::Yes);
    }

    plan.encode(map, value, buf)
}

/// Run a text-format `plan` for one element and return what it wrote, or `None` for `NULL`.
pub(crate) fn render_element(
    map: &PgTypeMap,
    plan: &dyn EncodePlan,
    value: &dyn HostValue,
) -> Result<Option<String>, BoxDynError> {
    let mut buf = PgArgumentBuffer::new();

    if encode_element(map, plan, value, &mut buf)?.is_null() {
        return Ok(None);
    }

    Ok(Some(String::from_utf8(buf.into_inner())?))
}

// Plans built by the registry.

pub(crate) fn undecoded_scan_plan() -> Arc<dyn ScanPlan> {
    ScanFn::arc("undecoded bytes", |_, src, target| {
        *target_mut::<UndecodedBytes>(target)? = UndecodedBytes(src.map(<[u8]>::to_vec));
        Ok(())
    })
}

pub(crate) fn string_scan_plan() -> Arc<dyn ScanPlan> {
    ScanFn::arc("any text to String", |_, src, target| {
        let src = not_null::<String>(src)?;
        let s = target_mut::<String>(target)?;

        s.clear();
        s.push_str(text(src)?);

        Ok(())
    })
}

pub(crate) fn text_to_bytes_scan_plan() -> Arc<dyn ScanPlan> {
    ScanFn::arc("any text to Vec<u8>", |_, src, target| {
        let src = not_null::<Vec<u8>>(src)?;
        let bytes = target_mut::<Vec<u8>>(target)?;

        bytes.clear();
        bytes.extend_from_slice(src);

        Ok(())
    })
}

pub(crate) fn text_scanner_scan_plan() -> Arc<dyn ScanPlan> {
    ScanFn::arc("any text to TextScanner", |_, src, target| {
        let host = target.type_name();
        let scanner = target
            .as_text_scanner()
            .ok_or_else(|| missing_capability(host, "TextScanner"))?;

        match src {
            None => scanner.scan_text(None),
            Some(src) => scanner.scan_text(Some(text(src)?)),
        }
    })
}

pub(crate) fn string_text_encode_plan() -> Arc<dyn EncodePlan> {
    EncodeFn::arc("string to any text", |_, value, buf| {
        if let Some(s) = value.downcast_ref::<String>() {
            buf.put_str(s);
        } else {
            buf.put_str(value_ref::<&'static str>(value)?);
        }

        Ok(IsNull::No)
    })
}

pub(crate) fn text_valuer_encode_plan() -> Arc<dyn EncodePlan> {
    EncodeFn::arc("TextValuer to any text", |_, value, buf| {
        let valuer = value
            .as_text_valuer()
            .ok_or_else(|| missing_capability(value.type_name(), "TextValuer"))?;

        match valuer.text_value()? {
            Some(s) => {
                buf.put_str(&s);
                Ok(IsNull::No)
            }
            None => Ok(IsNull::Yes),
        }
    })
}

/// Resolves a plan for whatever a [`Value`] holds each time it runs.
#[derive(Debug)]
pub(crate) struct DynamicEncodePlan {
    pub(crate) oid: u32,
    pub(crate) format: PgValueFormat,
}

impl EncodePlan for DynamicEncodePlan {
    fn encode(
        &self,
        map: &PgTypeMap,
        value: &dyn HostValue,
        buf: &mut PgArgumentBuffer,
    ) -> Result<IsNull, BoxDynError> {
        let Some(inner) = value_ref::<Value>(value)?.as_host() else {
            return Ok(IsNull::Yes);
        };

        let plan = map
            .plan_encode(self.oid, self.format, inner)
            .ok_or_else(|| map.resolution_error(Direction::Encode, self.oid, self.format, inner))?;

        plan.encode(map, inner, buf)
    }
}

/// Decodes with the column's codec and stores the result in a [`Value`] target.
#[derive(Debug)]
pub(crate) struct DecodeValuePlan {
    pub(crate) ty: Arc<PgType>,
    pub(crate) oid: u32,
    pub(crate) format: PgValueFormat,
}

impl ScanPlan for DecodeValuePlan {
    fn scan(
        &self,
        map: &PgTypeMap,
        src: Option<&[u8]>,
        target: &mut dyn HostValue,
    ) -> Result<(), BoxDynError> {
        let value = self
            .ty
            .codec()
            .decode_value(map, self.oid, self.format, src)?;

        *target_mut::<Value>(target)? = value;

        Ok(())
    }
}

/// Hands a decoded [`Value`] to a [`DynamicScanner`][crate::host::DynamicScanner].
///
/// Without a registered type the raw payload is passed on as text or bytes.
#[derive(Debug)]
pub(crate) struct DynamicScanPlan {
    pub(crate) ty: Option<Arc<PgType>>,
    pub(crate) oid: u32,
    pub(crate) format: PgValueFormat,
}

impl ScanPlan for DynamicScanPlan {
    fn scan(
        &self,
        map: &PgTypeMap,
        src: Option<&[u8]>,
        target: &mut dyn HostValue,
    ) -> Result<(), BoxDynError> {
        let value = match (&self.ty, src) {
            (Some(ty), _) => ty.codec().decode_value(map, self.oid, self.format, src)?,
            (None, None) => Value::Null,
            (None, Some(src)) => match self.format {
                PgValueFormat::Text => Value::Text(text(src)?.to_owned()),
                PgValueFormat::Binary => Value::Bytes(src.to_vec()),
            },
        };

        let host = target.type_name();
        target
            .as_dynamic_scanner()
            .ok_or_else(|| missing_capability(host, "DynamicScanner"))?
            .scan_value(value)
    }
}

/// Encodes whatever a [`DatabaseValuer`][crate::host::DatabaseValuer] hands back.
///
/// A text result that the column cannot take directly is parsed in text format and the parsed
/// value is encoded instead.
#[derive(Debug)]
pub(crate) struct DatabaseValuerPlan {
    pub(crate) oid: u32,
    pub(crate) format: PgValueFormat,
}

impl EncodePlan for DatabaseValuerPlan {
    fn encode(
        &self,
        map: &PgTypeMap,
        value: &dyn HostValue,
        buf: &mut PgArgumentBuffer,
    ) -> Result<IsNull, BoxDynError> {
        let delegated = value
            .as_database_valuer()
            .ok_or_else(|| missing_capability(value.type_name(), "DatabaseValuer"))?
            .database_value()?;

        if delegated.is_null() {
            return Ok(IsNull::Yes);
        }

        let start = buf.len();

        let err = match map.encode_raw(self.oid, self.format, &delegated, buf) {
            Ok(is_null) => return Ok(is_null),
            Err(err) => err,
        };

        buf.truncate(start);

        let Value::Text(s) = &delegated else {
            return Err(err);
        };

        let mut scanned = Value::Null;
        if map
            .scan_raw(self.oid, PgValueFormat::Text, Some(s.as_bytes()), &mut scanned)
            .is_err()
        {
            return Err(err);
        }

        if matches!(scanned, Value::Text(_)) {
            return Err(Error::DelegationCycle(format!("{delegated:?}")).into());
        }

        map.encode_raw(self.oid, self.format, &scanned, buf)
            .inspect_err(|_| buf.truncate(start))
            .map_err(|_| err)
    }
}

/// The plan returned when nothing can scan into a target.
///
/// Scanning SQL `NULL` still succeeds if any registered type can scan `NULL` into the target;
/// the protocol reports an untyped `NULL` with an arbitrary placeholder OID.
#[derive(Debug)]
pub(crate) struct FailScanPlan {
    pub(crate) oid: u32,
    pub(crate) format: PgValueFormat,
    pub(crate) type_name: String,
    pub(crate) host_type: &'static str,
}

impl FailScanPlan {
    fn error(&self) -> Error {
        Error::Resolution {
            direction: Direction::Scan,
            oid: self.oid,
            type_name: self.type_name.clone(),
            format: self.format.as_str(),
            host_type: self.host_type,
        }
    }
}

impl ScanPlan for FailScanPlan {
    fn scan(
        &self,
        map: &PgTypeMap,
        src: Option<&[u8]>,
        target: &mut dyn HostValue,
    ) -> Result<(), BoxDynError> {
        if src.is_none() && map.scan_null_by_search(self.format, target) {
            return Ok(());
        }

        Err(self.error().into())
    }

    fn is_failure(&self) -> bool {
        true
    }
}

//! User-defined composite types.
//!
//! Binary layout: `count: int4`, then per field `oid: oid, len: int4, payload`. Text layout:
//! `(a,,"b c")`, where an empty field is `NULL`.
use std::sync::Arc;

use pgcodec_core::error::{BoxDynError, Error};
use pgcodec_core::io::BufExt;
use pgcodec_core::IsNull;

use crate::arguments::{put_len, PgArgumentBuffer};
use crate::codec::Codec;
use crate::host::{CompositeGetter, HostValue};
use crate::map::PgTypeMap;
use crate::plan::{
    encode_element, missing_capability, not_null, not_null_for, render_element, target_mut,
    text, EncodePlan, ScanPlan,
};
use crate::type_info::PgType;
use crate::value::{PgValueFormat, Value};

/// One field of a composite type.
#[derive(Debug, Clone)]
pub struct CompositeField {
    pub name: String,
    pub ty: Arc<PgType>,
}

impl CompositeField {
    pub fn new(name: impl Into<String>, ty: Arc<PgType>) -> Self {
        CompositeField {
            name: name.into(),
            ty,
        }
    }
}

/// A decoded composite value: its fields by name, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PgComposite {
    pub fields: Vec<(String, Value)>,
}

impl PgComposite {
    /// The value of the field called `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find_map(|(field, value)| (field == name).then_some(value))
    }
}

impl CompositeGetter for PgComposite {
    fn field_count(&self) -> usize {
        self.fields.len()
    }

    fn field(&self, i: usize) -> Option<&dyn HostValue> {
        self.fields.get(i).map(|(_, value)| value as &dyn HostValue)
    }
}

impl HostValue for PgComposite {
    crate::impl_host_any!();

    fn as_composite_getter(&self) -> Option<&dyn CompositeGetter> {
        Some(self)
    }
}

/// Codec for a composite type with a fixed list of fields.
///
/// Any host value exposing [`CompositeGetter`] (including plain structs and tuples through the
/// wrapping chain) encodes if it has one value per field; targets exposing
/// [`CompositeScanner`][crate::host::CompositeScanner] scan field by field.
#[derive(Debug, Clone)]
pub struct CompositeCodec {
    fields: Vec<CompositeField>,
}

impl CompositeCodec {
    pub fn new(fields: Vec<CompositeField>) -> Self {
        CompositeCodec { fields }
    }

    pub fn fields(&self) -> &[CompositeField] {
        &self.fields
    }

    fn decode_fields(
        &self,
        format: PgValueFormat,
        src: &[u8],
    ) -> Result<Vec<Option<Vec<u8>>>, BoxDynError> {
        let fields = match format {
            PgValueFormat::Binary => {
                let mut reader = BinaryFields::new(src, self.fields.len())?;
                let mut fields = Vec::with_capacity(self.fields.len());

                while let Some((_, field)) = reader.next_field()? {
                    fields.push(field.map(<[u8]>::to_vec));
                }

                reader.finish()?;
                fields
            }

            PgValueFormat::Text => parse_composite(text(src)?, self.fields.len())?
                .into_iter()
                .map(|field| field.map(String::into_bytes))
                .collect(),
        };

        Ok(fields)
    }
}

impl Codec for CompositeCodec {
    fn format_supported(&self, format: PgValueFormat) -> bool {
        self.fields
            .iter()
            .all(|field| field.ty.codec().format_supported(format))
    }

    fn preferred_format(&self) -> PgValueFormat {
        if self.format_supported(PgValueFormat::Binary) {
            PgValueFormat::Binary
        } else {
            PgValueFormat::Text
        }
    }

    fn plan_encode(
        &self,
        map: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        value: &dyn HostValue,
    ) -> Option<Arc<dyn EncodePlan>> {
        let getter = value.as_composite_getter()?;

        if getter.field_count() != self.fields.len() {
            tracing::trace!(
                expected = self.fields.len(),
                found = getter.field_count(),
                "composite field count mismatch"
            );
            return None;
        }

        let mut field_plans = Vec::with_capacity(self.fields.len());
        for (i, field) in self.fields.iter().enumerate() {
            field_plans.push(map.plan_encode(field.ty.oid(), format, getter.field(i)?)?);
        }

        Some(Arc::new(CompositeEncodePlan {
            field_oids: self.fields.iter().map(|field| field.ty.oid()).collect(),
            format,
            field_plans,
        }))
    }

    fn plan_scan(
        &self,
        map: &PgTypeMap,
        oid: u32,
        format: PgValueFormat,
        target: &mut dyn HostValue,
    ) -> Option<Arc<dyn ScanPlan>> {
        if target.is::<PgComposite>() {
            return Some(Arc::new(PgCompositeScanPlan {
                codec: self.clone(),
                oid,
                format,
            }));
        }

        let scanner = target.as_composite_scanner()?;

        if scanner.field_count() != self.fields.len() {
            return None;
        }

        let mut field_plans = Vec::with_capacity(self.fields.len());
        for (i, field) in self.fields.iter().enumerate() {
            let slot = scanner.scan_field(i)?;
            field_plans.push(map.try_plan_scan(field.ty.oid(), format, slot)?);
        }

        Some(Arc::new(CompositeScanPlan {
            field_count: self.fields.len(),
            format,
            field_plans,
        }))
    }

    fn decode_value(
        &self,
        map: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        src: Option<&[u8]>,
    ) -> Result<Value, BoxDynError> {
        let Some(src) = src else {
            return Ok(Value::Null);
        };

        let raw = self.decode_fields(format, src)?;

        let mut fields = Vec::with_capacity(raw.len());
        for (field, raw) in self.fields.iter().zip(raw) {
            let value = field
                .ty
                .codec()
                .decode_value(map, field.ty.oid(), format, raw.as_deref())?;

            fields.push((field.name.clone(), value));
        }

        Ok(Value::Composite(PgComposite { fields }))
    }
}

#[derive(Debug)]
struct CompositeEncodePlan {
    field_oids: Vec<u32>,
    format: PgValueFormat,
    field_plans: Vec<Arc<dyn EncodePlan>>,
}

impl EncodePlan for CompositeEncodePlan {
    fn encode(
        &self,
        map: &PgTypeMap,
        value: &dyn HostValue,
        buf: &mut PgArgumentBuffer,
    ) -> Result<IsNull, BoxDynError> {
        let getter = value
            .as_composite_getter()
            .ok_or_else(|| missing_capability(value.type_name(), "CompositeGetter"))?;

        if getter.field_count() != self.field_plans.len() {
            return Err(format!(
                "composite has {} fields but {} were given",
                self.field_plans.len(),
                getter.field_count()
            )
            .into());
        }

        let field = |i: usize| {
            getter
                .field(i)
                .ok_or_else(|| BoxDynError::from(format!("composite field {i} is missing")))
        };

        match self.format {
            PgValueFormat::Binary => {
                put_len(buf, self.field_plans.len())?;

                let fields = self.field_oids.iter().zip(&self.field_plans);

                for (i, (oid, plan)) in fields.enumerate() {
                    let value = field(i)?;

                    buf.extend_from_slice(&oid.to_be_bytes());
                    buf.encode_len_prefixed(|buf| encode_element(map, &**plan, value, buf))?;
                }
            }

            PgValueFormat::Text => {
                let mut out = String::from("(");

                for (i, plan) in self.field_plans.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }

                    if let Some(rendered) = render_element(map, &**plan, field(i)?)? {
                        write_field(&rendered, &mut out);
                    }
                }

                out.push(')');
                buf.put_str(&out);
            }
        }

        Ok(IsNull::No)
    }
}

#[derive(Debug)]
struct CompositeScanPlan {
    field_count: usize,
    format: PgValueFormat,
    field_plans: Vec<Arc<dyn ScanPlan>>,
}

impl ScanPlan for CompositeScanPlan {
    fn scan(
        &self,
        map: &PgTypeMap,
        src: Option<&[u8]>,
        target: &mut dyn HostValue,
    ) -> Result<(), BoxDynError> {
        let host = target.type_name();
        let src = not_null_for(src, host)?;

        let scanner = target
            .as_composite_scanner()
            .ok_or_else(|| missing_capability(host, "CompositeScanner"))?;

        let mut scan_field = |i: usize, field: Option<&[u8]>| -> Result<(), BoxDynError> {
            let slot = scanner
                .scan_field(i)
                .ok_or_else(|| format!("composite target has no field {i}"))?;

            self.field_plans[i].scan(map, field, slot)
        };

        match self.format {
            PgValueFormat::Binary => {
                let mut reader = BinaryFields::new(src, self.field_count)?;
                let mut i = 0;

                while let Some((_, field)) = reader.next_field()? {
                    scan_field(i, field)?;
                    i += 1;
                }

                reader.finish()
            }

            PgValueFormat::Text => {
                let fields = parse_composite(text(src)?, self.field_count)?;

                for (i, field) in fields.iter().enumerate() {
                    scan_field(i, field.as_deref().map(str::as_bytes))?;
                }

                Ok(())
            }
        }
    }
}

#[derive(Debug)]
struct PgCompositeScanPlan {
    codec: CompositeCodec,
    oid: u32,
    format: PgValueFormat,
}

impl ScanPlan for PgCompositeScanPlan {
    fn scan(
        &self,
        map: &PgTypeMap,
        src: Option<&[u8]>,
        target: &mut dyn HostValue,
    ) -> Result<(), BoxDynError> {
        let src = not_null::<PgComposite>(src)?;

        match self.codec.decode_value(map, self.oid, self.format, Some(src))? {
            Value::Composite(composite) => {
                *target_mut::<PgComposite>(target)? = composite;
                Ok(())
            }
            other => Err(format!("composite decoded to {other:?}").into()),
        }
    }
}

/// Reads the binary field list shared by composites and anonymous records.
pub(crate) struct BinaryFields<'a> {
    buf: &'a [u8],
    remaining: usize,
}

impl<'a> BinaryFields<'a> {
    /// Read the field count, failing unless it is `expected`.
    pub(crate) fn new(src: &'a [u8], expected: usize) -> Result<Self, BoxDynError> {
        let reader = Self::any(src)?;

        if reader.remaining != expected {
            return Err(Error::protocol(format!(
                "expected {expected} fields, found {}",
                reader.remaining
            ))
            .into());
        }

        Ok(reader)
    }

    /// Read the field count, accepting any number of fields.
    pub(crate) fn any(mut src: &'a [u8]) -> Result<Self, BoxDynError> {
        let count = src.try_get_i32()?;

        let remaining = usize::try_from(count)
            .map_err(|_| Error::protocol(format!("invalid field count: {count}")))?;

        Ok(BinaryFields {
            buf: src,
            remaining,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.remaining
    }

    /// The next field's OID and payload.
    pub(crate) fn next_field(&mut self) -> Result<Option<(u32, Option<&'a [u8]>)>, BoxDynError> {
        if self.remaining == 0 {
            return Ok(None);
        }

        self.remaining -= 1;

        let oid = self.buf.try_get_u32()?;
        let field = self.buf.try_get_len_prefixed()?;

        Ok(Some((oid, field)))
    }

    pub(crate) fn finish(self) -> Result<(), BoxDynError> {
        if !self.buf.is_empty() {
            return Err(Error::protocol(format!(
                "{} unexpected trailing bytes after composite fields",
                self.buf.len()
            ))
            .into());
        }

        Ok(())
    }
}

/// Parse `(a,"b",)` into exactly `expected` fields, `None` for `NULL`.
fn parse_composite(src: &str, expected: usize) -> Result<Vec<Option<String>>, BoxDynError> {
    let malformed = |msg: &str| -> BoxDynError {
        Error::protocol(format!("malformed record literal {src:?}: {msg}")).into()
    };

    let body = src
        .trim_matches(|c: char| c.is_ascii_whitespace())
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| malformed("missing parentheses"))?;

    // `()` is the only literal of a type without fields
    if expected == 0 {
        if !body.is_empty() {
            return Err(malformed("too many columns"));
        }

        return Ok(Vec::new());
    }

    let mut fields = Vec::with_capacity(expected);
    let mut field = String::new();
    let mut is_null = true;
    let mut in_quotes = false;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            '"' => {
                in_quotes = !in_quotes;
                is_null = false;
            }
            '\\' => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| malformed("unexpected end of input"))?;

                field.push(escaped);
                is_null = false;
            }
            ',' if !in_quotes => {
                fields.push((!is_null).then(|| std::mem::take(&mut field)));
                is_null = true;
            }
            c => {
                field.push(c);
                is_null = false;
            }
        }
    }

    if in_quotes {
        return Err(malformed("unterminated quoted string"));
    }

    fields.push((!is_null).then_some(field));

    if fields.len() != expected {
        return Err(malformed(&format!(
            "expected {expected} columns, found {}",
            fields.len()
        )));
    }

    Ok(fields)
}

/// Append one field to a record literal, quoting it when needed.
pub(crate) fn write_field(field: &str, out: &mut String) {
    let needs_quotes = field.is_empty()
        || field
            .chars()
            .any(|c| matches!(c, '(' | ')' | ',' | '"' | '\\') || c.is_ascii_whitespace());

    if !needs_quotes {
        out.push_str(field);
        return;
    }

    out.push('"');
    for c in field.chars() {
        if c == '"' || c == '\\' {
            out.push(c);
        }
        out.push(c);
    }
    out.push('"');
}

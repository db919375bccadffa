//! Plan resolution.
//!
//! Both directions follow the same order: fast paths that need no type lookup, then the codec
//! registered for the OID (or inferred from the host type), then the wrapping chain, then the
//! capability fallbacks. The wrapping chain re-enters here with `depth + 1`.
use std::sync::Arc;

use crate::host::{HostValue, Shape, ShapeMut};
use crate::oid;
use crate::plan::{
    self, DatabaseValuerPlan, DecodeValuePlan, DynamicEncodePlan, DynamicScanPlan, EncodePlan,
    ScanPlan,
};
use crate::type_info::PgType;
use crate::types::UndecodedBytes;
use crate::value::PgValueFormat;
use crate::wrap;

use super::PgTypeMap;

impl PgTypeMap {
    /// The type for `oid`, or the default type of the host value when `oid` is unknown.
    ///
    /// The returned OID is the one nested resolution must use.
    fn resolve_type(&self, oid: u32, value: &dyn HostValue) -> (u32, Option<Arc<PgType>>) {
        if let Some(ty) = self.type_for_oid(oid) {
            return (oid, Some(ty));
        }

        match self.type_for_value(value) {
            Some(ty) => (ty.oid(), Some(ty)),
            None => (oid, None),
        }
    }

    pub(crate) fn resolve_encode(
        &self,
        oid: u32,
        format: PgValueFormat,
        value: &dyn HostValue,
        depth: usize,
    ) -> Option<Arc<dyn EncodePlan>> {
        if depth > self.options.max_depth {
            tracing::trace!(oid, depth, "encode plan resolution exceeded maximum depth");
            return None;
        }

        if format == PgValueFormat::Text {
            if value.is::<String>() || value.is::<&'static str>() {
                return Some(plan::string_text_encode_plan());
            }

            if value.as_text_valuer().is_some() {
                return Some(plan::text_valuer_encode_plan());
            }
        }

        if let Shape::Dynamic(_) = value.shape() {
            return Some(Arc::new(DynamicEncodePlan { oid, format }));
        }

        let (oid, ty) = self.resolve_type(oid, value);

        if let Some(plan) = ty
            .as_ref()
            .and_then(|ty| ty.codec().plan_encode(self, oid, format, value))
        {
            return Some(plan);
        }

        if let Some(plan) = wrap::try_wrap_encode(self, oid, format, value, depth) {
            return Some(plan);
        }

        if value.as_database_valuer().is_some() {
            tracing::trace!(oid, host_type = value.type_name(), "delegating encode");
            return Some(Arc::new(DatabaseValuerPlan { oid, format }));
        }

        None
    }

    pub(crate) fn resolve_scan(
        &self,
        oid: u32,
        format: PgValueFormat,
        target: &mut dyn HostValue,
        depth: usize,
    ) -> Option<Arc<dyn ScanPlan>> {
        if depth > self.options.max_depth {
            tracing::trace!(oid, depth, "scan plan resolution exceeded maximum depth");
            return None;
        }

        if target.is::<UndecodedBytes>() {
            return Some(plan::undecoded_scan_plan());
        }

        match format {
            PgValueFormat::Binary => {
                if (oid == oid::TEXT || oid == oid::VARCHAR) && target.is::<String>() {
                    return Some(plan::string_scan_plan());
                }
            }

            PgValueFormat::Text => {
                if target.is::<String>() {
                    return Some(plan::string_scan_plan());
                }

                if oid != oid::BYTEA && target.is::<Vec<u8>>() {
                    return Some(plan::text_to_bytes_scan_plan());
                }

                if target.as_text_scanner().is_some() {
                    return Some(plan::text_scanner_scan_plan());
                }
            }
        }

        let (oid, ty) = self.resolve_type(oid, target);

        if let Some(ty) = &ty {
            if let Some(plan) = ty.codec().plan_scan(self, oid, format, target) {
                return Some(plan);
            }
        }

        if target.as_dynamic_scanner().is_some() {
            return Some(Arc::new(DynamicScanPlan { ty, oid, format }));
        }

        if let Some(plan) = wrap::try_wrap_scan(self, oid, format, target, depth) {
            return Some(plan);
        }

        match (ty, target.shape_mut()) {
            (Some(ty), ShapeMut::Dynamic) => Some(Arc::new(DecodeValuePlan { ty, oid, format })),
            _ => None,
        }
    }
}

//! The type registry.
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use pgcodec_core::error::{BoxDynError, Direction, Error};
use pgcodec_core::IsNull;

use crate::arguments::PgArgumentBuffer;
use crate::host::HostValue;
use crate::plan::{EncodePlan, FailScanPlan, ScanPlan};
use crate::type_info::PgType;
use crate::value::{PgValueFormat, Value};

mod cache;
mod defaults;
mod options;
mod resolve;

use cache::{PlanCache, PlanKey};

pub use defaults::{build_default_registry, shared_default};
pub use options::{MapOptions, NullSearch};

/// Maps OIDs to [`PgType`]s and host types to their default PostgreSQL type, and resolves
/// encode and scan plans.
///
/// A map built with [`PgTypeMap::new`] starts without local registrations and falls back to
/// the shared default registry for every type lookup, so per-connection customizations do not
/// have to re-register the built-in types.
///
/// Registration takes `&mut self`; planning, encoding and scanning take `&self` and may run
/// concurrently once registration is done.
#[derive(Debug)]
pub struct PgTypeMap {
    oid_to_type: HashMap<u32, Arc<PgType>>,
    name_to_type: HashMap<String, Arc<PgType>>,
    oid_to_format: HashMap<u32, PgValueFormat>,
    host_type_to_name: HashMap<TypeId, String>,

    // built from `host_type_to_name` on first use
    host_type_to_type: OnceCell<HashMap<TypeId, Arc<PgType>>>,

    encode_plans: PlanCache<dyn EncodePlan>,
    scan_plans: PlanCache<dyn ScanPlan>,

    fallback: Option<Arc<PgTypeMap>>,
    options: MapOptions,
}

impl Default for PgTypeMap {
    fn default() -> Self {
        Self::new()
    }
}

impl PgTypeMap {
    /// An empty map that falls back to [`shared_default`].
    pub fn new() -> Self {
        Self::with_options(MapOptions::default())
    }

    pub fn with_options(options: MapOptions) -> Self {
        let mut map = Self::without_defaults(options);
        map.fallback = Some(shared_default());
        map
    }

    /// A map with no registrations and no fallback.
    pub fn without_defaults(options: MapOptions) -> Self {
        Self {
            oid_to_type: HashMap::new(),
            name_to_type: HashMap::new(),
            oid_to_format: HashMap::new(),
            host_type_to_name: HashMap::new(),
            host_type_to_type: OnceCell::new(),
            encode_plans: PlanCache::new(options.plan_cache_capacity),
            scan_plans: PlanCache::new(options.plan_cache_capacity),
            fallback: None,
            options,
        }
    }

    /// Consult `fallback` for any type this map does not register itself.
    pub fn with_fallback(mut self, fallback: Arc<PgTypeMap>) -> Self {
        self.fallback = Some(fallback);
        self.invalidate();
        self
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    /// A copy of the local registrations with empty plan caches.
    pub fn copy(&self) -> Self {
        Self {
            oid_to_type: self.oid_to_type.clone(),
            name_to_type: self.name_to_type.clone(),
            oid_to_format: self.oid_to_format.clone(),
            host_type_to_name: self.host_type_to_name.clone(),
            host_type_to_type: OnceCell::new(),
            encode_plans: PlanCache::new(self.options.plan_cache_capacity),
            scan_plans: PlanCache::new(self.options.plan_cache_capacity),
            fallback: self.fallback.clone(),
            options: self.options.clone(),
        }
    }

    /// Register `ty`, replacing any type with the same OID or name.
    pub fn register_type(&mut self, ty: PgType) {
        tracing::debug!(name = ty.name(), oid = ty.oid(), "registering type");

        let ty = Arc::new(ty);

        self.oid_to_format
            .insert(ty.oid(), ty.codec().preferred_format());
        self.name_to_type.insert(ty.name().to_owned(), Arc::clone(&ty));
        self.oid_to_type.insert(ty.oid(), ty);

        self.invalidate();
    }

    pub fn register_types(&mut self, types: impl IntoIterator<Item = PgType>) {
        for ty in types {
            self.register_type(ty);
        }
    }

    /// Make `name` the type inferred for values of host type `T` when no OID is known.
    pub fn register_default_type<T: 'static>(&mut self, name: &str) {
        self.host_type_to_name
            .insert(TypeId::of::<T>(), name.to_owned());

        self.invalidate();
    }

    /// Register `T`, `Option<T>` as `name`, and `Vec<T>`, `Vec<Option<T>>` as the array type
    /// `_name`.
    pub fn register_default_type_variants<T>(&mut self, name: &str)
    where
        T: HostValue + Default + 'static,
    {
        let array_name = format!("_{name}");

        self.register_default_type::<T>(name);
        self.register_default_type::<Option<T>>(name);
        self.register_default_type::<Vec<T>>(&array_name);
        self.register_default_type::<Vec<Option<T>>>(&array_name);
    }

    fn invalidate(&mut self) {
        tracing::debug!("invalidating plan caches");

        self.host_type_to_type = OnceCell::new();
        self.encode_plans.clear();
        self.scan_plans.clear();
    }

    pub fn type_for_oid(&self, oid: u32) -> Option<Arc<PgType>> {
        self.oid_to_type
            .get(&oid)
            .cloned()
            .or_else(|| self.fallback.as_ref()?.type_for_oid(oid))
    }

    pub fn type_for_name(&self, name: &str) -> Option<Arc<PgType>> {
        self.name_to_type
            .get(name)
            .cloned()
            .or_else(|| self.fallback.as_ref()?.type_for_name(name))
    }

    /// The default type registered for the host type of `value`.
    pub fn type_for_value(&self, value: &dyn HostValue) -> Option<Arc<PgType>> {
        let host_type = value.host_type_id()?;

        let host_types = self.host_type_to_type.get_or_init(|| {
            self.host_type_to_name
                .iter()
                .filter_map(|(id, name)| Some((*id, self.type_for_name(name)?)))
                .collect()
        });

        host_types
            .get(&host_type)
            .cloned()
            .or_else(|| self.fallback.as_ref()?.type_for_value(value))
    }

    /// The format the codec for `oid` prefers, or text for unknown OIDs.
    pub fn format_code_for_oid(&self, oid: u32) -> PgValueFormat {
        match self.oid_to_format.get(&oid) {
            Some(format) => *format,
            None => self
                .fallback
                .as_ref()
                .map_or(PgValueFormat::Text, |fallback| {
                    fallback.format_code_for_oid(oid)
                }),
        }
    }

    pub(crate) fn type_name_for_oid(&self, oid: u32) -> String {
        self.type_for_oid(oid)
            .map_or_else(|| "unknown type".to_owned(), |ty| ty.name().to_owned())
    }

    /// Every registered OID, including the fallback's, in ascending order.
    pub(crate) fn all_oids(&self) -> Vec<u32> {
        let mut oids: Vec<u32> = self.oid_to_type.keys().copied().collect();

        if let Some(fallback) = &self.fallback {
            oids.extend(fallback.all_oids());
        }

        oids.sort_unstable();
        oids.dedup();
        oids
    }

    /// Resolve the plan that encodes values of `value`'s host type into `oid` and `format`.
    ///
    /// Returns `None` if no codec, wrapper or delegation applies.
    pub fn plan_encode(
        &self,
        oid: u32,
        format: PgValueFormat,
        value: &dyn HostValue,
    ) -> Option<Arc<dyn EncodePlan>> {
        let key = value.host_type_id().map(|host_type| PlanKey {
            oid,
            host_type,
            format,
        });

        if let Some(plan) = key.as_ref().and_then(|key| self.encode_plans.get(key)) {
            return Some(plan);
        }

        tracing::trace!(oid, %format, host_type = value.type_name(), "resolving encode plan");

        let plan = self.resolve_encode(oid, format, value, 0)?;

        if let Some(key) = key {
            self.encode_plans.insert(key, Arc::clone(&plan));
        }

        Some(plan)
    }

    /// Resolve the plan that scans `oid` in `format` into targets of `target`'s host type.
    ///
    /// Never fails: when nothing applies the failure plan is returned, which reports the
    /// resolution error when run (see [`NullSearch`] for its one exception).
    pub fn plan_scan(
        &self,
        oid: u32,
        format: PgValueFormat,
        target: &mut dyn HostValue,
    ) -> Arc<dyn ScanPlan> {
        let key = target.host_type_id().map(|host_type| PlanKey {
            oid,
            host_type,
            format,
        });

        if let Some(plan) = key.as_ref().and_then(|key| self.scan_plans.get(key)) {
            return plan;
        }

        tracing::trace!(oid, %format, host_type = target.type_name(), "resolving scan plan");

        let plan = self
            .resolve_scan(oid, format, target, 0)
            .unwrap_or_else(|| self.fail_plan(oid, format, target));

        if let Some(key) = key {
            self.scan_plans.insert(key, Arc::clone(&plan));
        }

        plan
    }

    /// Like [`plan_scan`][Self::plan_scan] but `None` instead of the failure plan.
    pub(crate) fn try_plan_scan(
        &self,
        oid: u32,
        format: PgValueFormat,
        target: &mut dyn HostValue,
    ) -> Option<Arc<dyn ScanPlan>> {
        let plan = self.plan_scan(oid, format, target);
        (!plan.is_failure()).then_some(plan)
    }

    fn fail_plan(
        &self,
        oid: u32,
        format: PgValueFormat,
        target: &dyn HostValue,
    ) -> Arc<dyn ScanPlan> {
        Arc::new(FailScanPlan {
            oid,
            format,
            type_name: self.type_name_for_oid(oid),
            host_type: target.type_name(),
        })
    }

    /// Encode `value` as `oid` in `format`, appending to `buf`.
    ///
    /// A `NULL` value (an absent `Option`, [`Value::Null`]) is reported as [`IsNull::Yes`]
    /// without planning, unless the value delegates its encoding through
    /// [`DatabaseValuer`][crate::host::DatabaseValuer]. On error `buf` is left as it was.
    pub fn encode(
        &self,
        oid: u32,
        format: PgValueFormat,
        value: &dyn HostValue,
        buf: &mut PgArgumentBuffer,
    ) -> Result<IsNull, Error> {
        if value.is_null() && value.as_database_valuer().is_none() {
            return Ok(IsNull::Yes);
        }

        let plan = self
            .plan_encode(oid, format, value)
            .ok_or_else(|| self.resolution_error(Direction::Encode, oid, format, value))?;

        let start = buf.len();

        plan.encode(self, value, buf).map_err(|source| {
            buf.truncate(start);

            Error::Encode {
                value: format!("{value:?}"),
                oid,
                type_name: self.type_name_for_oid(oid),
                format: format.as_str(),
                source,
            }
        })
    }

    /// Scan `src` (`None` for SQL `NULL`) as `oid` in `format` into `target`.
    pub fn scan(
        &self,
        oid: u32,
        format: PgValueFormat,
        src: Option<&[u8]>,
        target: &mut dyn HostValue,
    ) -> Result<(), Error> {
        let plan = self.plan_scan(oid, format, target);

        plan.scan(self, src, target).map_err(|source| {
            match source.downcast::<Error>() {
                Ok(err) if matches!(*err, Error::Resolution { .. }) => *err,
                Ok(err) => self.scan_error(oid, format, target, err),
                Err(source) => self.scan_error(oid, format, target, source),
            }
        })
    }

    /// Decode `src` into the restricted set of [`Value`]s a generic database interface
    /// carries.
    ///
    /// Unknown OIDs decode to [`Value::Text`] in text format and [`Value::Bytes`] in binary.
    pub fn decode_database_value(
        &self,
        oid: u32,
        format: PgValueFormat,
        src: Option<&[u8]>,
    ) -> Result<Value, Error> {
        let decoded = match (self.type_for_oid(oid), src) {
            (_, None) => return Ok(Value::Null),
            (Some(ty), src) => ty.codec().decode_database_value(self, oid, format, src),
            (None, Some(src)) => match format {
                PgValueFormat::Text => crate::plan::text(src).map(|s| Value::Text(s.to_owned())),
                PgValueFormat::Binary => Ok(Value::Bytes(src.to_vec())),
            },
        };

        decoded.map_err(Error::Decode)
    }

    /// [`encode`][Self::encode] without the error context, for use inside plans.
    pub(crate) fn encode_raw(
        &self,
        oid: u32,
        format: PgValueFormat,
        value: &dyn HostValue,
        buf: &mut PgArgumentBuffer,
    ) -> Result<IsNull, BoxDynError> {
        if value.is_null() && value.as_database_valuer().is_none() {
            return Ok(IsNull::Yes);
        }

        let plan = self
            .plan_encode(oid, format, value)
            .ok_or_else(|| self.resolution_error(Direction::Encode, oid, format, value))?;

        plan.encode(self, value, buf)
    }

    /// [`scan`][Self::scan] without the error context, for use inside plans.
    pub(crate) fn scan_raw(
        &self,
        oid: u32,
        format: PgValueFormat,
        src: Option<&[u8]>,
        target: &mut dyn HostValue,
    ) -> Result<(), BoxDynError> {
        self.plan_scan(oid, format, target).scan(self, src, target)
    }

    pub(crate) fn resolution_error(
        &self,
        direction: Direction,
        oid: u32,
        format: PgValueFormat,
        value: &dyn HostValue,
    ) -> Error {
        Error::Resolution {
            direction,
            oid,
            type_name: self.type_name_for_oid(oid),
            format: format.as_str(),
            host_type: value.type_name(),
        }
    }

    fn scan_error(
        &self,
        oid: u32,
        format: PgValueFormat,
        target: &dyn HostValue,
        source: BoxDynError,
    ) -> Error {
        Error::Scan {
            oid,
            type_name: self.type_name_for_oid(oid),
            format: format.as_str(),
            host_type: target.type_name(),
            source,
        }
    }

    /// Search every registered type for one that scans `NULL` into `target`.
    pub(crate) fn scan_null_by_search(
        &self,
        format: PgValueFormat,
        target: &mut dyn HostValue,
    ) -> bool {
        if self.options.null_search == NullSearch::Disabled {
            return false;
        }

        for oid in self.all_oids() {
            let Some(plan) = self.resolve_scan(oid, format, target, 0) else {
                continue;
            };

            if plan.scan(self, None, target).is_ok() {
                tracing::trace!(oid, host_type = target.type_name(), "scanned untyped NULL");
                return true;
            }
        }

        false
    }

    #[cfg(test)]
    pub(crate) fn cached_plan_count(&self) -> (usize, usize) {
        (self.encode_plans.len(), self.scan_plans.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::types::EnumCodec;

    #[test]
    fn registration_discards_cached_plans() {
        let mut map = PgTypeMap::new();
        let mut n = 0_i32;

        assert!(map.plan_encode(oid::INT4, PgValueFormat::Binary, &1_i32).is_some());
        map.plan_scan(oid::INT4, PgValueFormat::Binary, &mut n);

        let (encode, scan) = map.cached_plan_count();
        assert!(encode > 0 && scan > 0);

        map.register_type(PgType::new("mood", 90_010, EnumCodec));
        assert_eq!(map.cached_plan_count(), (0, 0));

        map.register_default_type::<i32>("int8");
        assert_eq!(map.type_for_value(&1_i32).unwrap().oid(), oid::INT8);
    }

    #[test]
    fn zero_capacity_disables_caching() {
        let map = PgTypeMap::with_options(MapOptions::new().plan_cache_capacity(0));
        let mut n = 0_i64;

        let first = map.plan_scan(oid::INT8, PgValueFormat::Text, &mut n);
        let second = map.plan_scan(oid::INT8, PgValueFormat::Text, &mut n);

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(map.cached_plan_count(), (0, 0));
    }

    #[test]
    fn copies_keep_registrations_but_not_plans() {
        let mut map = PgTypeMap::new();
        map.register_type(PgType::new("mood", 90_010, EnumCodec));
        assert!(map.plan_encode(90_010, PgValueFormat::Text, &"ok").is_some());

        let copy = map.copy();
        assert_eq!(copy.type_for_name("mood").unwrap().oid(), 90_010);
        assert_eq!(copy.cached_plan_count(), (0, 0));
        assert_eq!(copy.format_code_for_oid(90_010), PgValueFormat::Text);
    }
}

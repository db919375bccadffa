//! Plan-based conversion between Rust values and PostgreSQL's binary and text wire formats.
//!
//! A [`PgTypeMap`] maps type OIDs to codecs. Asking it to encode or scan a value resolves a
//! plan for the `(oid, host type, format)` combination once and caches it; every later
//! conversion of the same combination runs the plan with no further type inspection.
//!
//! ```rust
//! use pgcodec::{oid, PgArgumentBuffer, PgTypeMap, PgValueFormat};
//!
//! # fn main() -> pgcodec::Result<()> {
//! let map = PgTypeMap::new();
//!
//! let mut buf = PgArgumentBuffer::new();
//! map.encode(oid::INT4_ARRAY, PgValueFormat::Text, &vec![1_i32, 2, 3], &mut buf)?;
//! assert_eq!(&buf[..], b"{1,2,3}");
//!
//! let mut out: Vec<Option<i64>> = Vec::new();
//! map.scan(oid::INT8_ARRAY, PgValueFormat::Text, Some(b"{7,NULL}"), &mut out)?;
//! assert_eq!(out, [Some(7), None]);
//! # Ok(())
//! # }
//! ```
//!
//! Values without a native codec reach one through the wrapping chain: `Option<T>` becomes a
//! nullable value, `Vec<T>` and `[T; N]` become arrays, tuples and types declared with
//! [`impl_host_struct!`] become composites, and newtypes declared with [`impl_host_newtype!`]
//! convert as the type they wrap.
//!
//! ## Registering types
//!
//! A fresh map falls back to a shared registry of the built-in types. User-defined composites,
//! enums, domains and extension types such as `hstore` are registered on the map with the OID
//! the database assigned them:
//!
//! ```rust
//! use pgcodec::types::{CompositeCodec, CompositeField, EnumCodec};
//! use pgcodec::{PgType, PgTypeMap};
//!
//! let mut map = PgTypeMap::new();
//!
//! map.register_type(PgType::new("mood", 90_010, EnumCodec));
//!
//! let fields = vec![
//!     CompositeField::new("name", map.type_for_name("text").unwrap()),
//!     CompositeField::new("mood", map.type_for_name("mood").unwrap()),
//! ];
//! map.register_type(PgType::new("person", 90_011, CompositeCodec::new(fields)));
//!
//! assert_eq!(map.type_for_oid(90_011).unwrap().name(), "person");
//! ```
#![forbid(unsafe_code)]

pub use pgcodec_core::{BoxDynError, Error, IsNull, Result};

pub use pgcodec_postgres::{
    build_default_registry, host, impl_host_newtype, impl_host_scalar, impl_host_struct, oid,
    shared_default, types, BoundType, Codec, EncodePlan, HostValue, MapOptions, NullSearch,
    PgArgumentBuffer, PgType, PgTypeMap, PgValueFormat, ScanPlan, Value,
};

#[doc(hidden)]
pub use pgcodec_postgres::impl_host_any;

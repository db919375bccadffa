//! **PostgreSQL** value codecs, plan resolution and the type registry.
//!
//! Not for direct use; see the `pgcodec` crate for details.
#![forbid(unsafe_code)]
#![warn(future_incompatible, rust_2018_idioms)]

#[macro_use]
extern crate pgcodec_core;

mod arguments;
mod codec;
mod map;
mod plan;
mod type_info;
mod value;
mod wrap;

pub mod host;
pub mod oid;
pub mod types;

pub use arguments::PgArgumentBuffer;
pub use codec::Codec;
pub use map::{build_default_registry, shared_default, MapOptions, NullSearch, PgTypeMap};
pub use plan::{EncodePlan, ScanPlan};
pub use type_info::PgType;
pub use value::{PgValueFormat, Value};

pub use host::{BoundType, HostValue};
pub use types::{
    ArrayCodec, CompositeCodec, CompositeField, EnumCodec, Json, MultirangeCodec, PgArray,
    PgComposite, PgMultirange, PgRange, RangeCodec, UndecodedBytes,
};

//! Core of pgcodec: the error type, [`IsNull`] and checked byte readers.
//!
//! Not for direct use; see the `pgcodec` crate for details.
#![allow(clippy::module_name_repetitions)]

#[macro_use]
pub mod error;

pub mod encode;
pub mod io;

pub use bytes;

#[doc(inline)]
pub use self::{
    encode::IsNull,
    error::{BoxDynError, Error, Result},
};

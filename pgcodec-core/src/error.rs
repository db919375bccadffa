//! Error and result types shared by every codec.
use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::result::Result as StdResult;

/// A specialized `Result` type for pgcodec.
pub type Result<T> = StdResult<T, Error>;

/// Boxed error returned by codecs and plans.
///
/// The registry entry points wrap these into [`Error`] with the OID, format and host type
/// attached.
pub type BoxDynError = Box<dyn StdError + 'static + Send + Sync>;

/// The direction of a conversion.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Host value to wire bytes.
    Encode,

    /// Wire bytes to host value.
    Scan,
}

impl Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Encode => "encode",
            Direction::Scan => "scan",
        })
    }
}

/// An unexpected `NULL` was encountered while scanning.
///
/// Returned when the target cannot represent absence; scan into an `Option` instead.
#[derive(thiserror::Error, Debug)]
#[error("cannot scan NULL into {host_type}")]
pub struct UnexpectedNullError {
    pub host_type: &'static str,
}

/// Represents all the ways a conversion can fail.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No codec, wrapper or delegation path exists for the requested combination.
    #[error("cannot find {direction} plan for {host_type} with {type_name} (OID {oid}) in {format} format")]
    Resolution {
        direction: Direction,
        oid: u32,
        type_name: String,
        format: &'static str,
        host_type: &'static str,
    },

    /// A plan was found but encoding the value failed.
    #[error("unable to encode {value} into {format} format for {type_name} (OID {oid}): {source}")]
    Encode {
        value: String,
        oid: u32,
        type_name: String,
        format: &'static str,

        #[source]
        source: BoxDynError,
    },

    /// A plan was found but scanning the wire bytes failed.
    #[error("can't scan into {host_type} from {type_name} (OID {oid}) in {format} format: {source}")]
    Scan {
        oid: u32,
        type_name: String,
        format: &'static str,
        host_type: &'static str,

        #[source]
        source: BoxDynError,
    },

    /// Unexpected or invalid data encountered in a wire payload.
    ///
    /// Truncated payloads, unbalanced delimiters, bad escapes and fixed-width length
    /// mismatches all land here.
    #[error("encountered unexpected or invalid data: {0}")]
    Protocol(String),

    /// A wire `NULL` was scanned into a target that cannot represent it.
    #[error(transparent)]
    UnexpectedNull(#[from] UnexpectedNullError),

    /// A narrowing conversion would lose information.
    #[error("{0}")]
    Overflow(String),

    /// Encoding through the database-value delegation produced the type it started from.
    #[error("tried to encode {0} via encoding to text and scanning but failed due to receiving same type back")]
    DelegationCycle(String),

    /// The host type of a scan target differs from the one the plan was built for.
    #[error("scan target type changed: plan was built for {expected}")]
    ScanTargetChanged { expected: &'static str },

    /// Error occurred while decoding a value.
    #[error("error occurred while decoding: {0}")]
    Decode(#[source] BoxDynError),
}

impl Error {
    #[inline]
    pub fn protocol(err: impl Display) -> Self {
        Error::Protocol(err.to_string())
    }

    #[inline]
    pub fn overflow(err: impl Display) -> Self {
        Error::Overflow(err.to_string())
    }

    /// Returns `true` if this error, or the source it wraps, is an unexpected `NULL`.
    pub fn is_unexpected_null(&self) -> bool {
        match self {
            Error::UnexpectedNull(_) => true,
            Error::Scan { source, .. } | Error::Decode(source) => {
                source.downcast_ref::<UnexpectedNullError>().is_some()
                    || source
                        .downcast_ref::<Error>()
                        .is_some_and(Error::is_unexpected_null)
            }
            _ => false,
        }
    }
}

/// Build an [`UnexpectedNullError`] for `T`.
pub fn unexpected_null<T: ?Sized>() -> BoxDynError {
    Box::new(UnexpectedNullError {
        host_type: std::any::type_name::<T>(),
    })
}

// Format an error message as a `Protocol` error
#[macro_export]
macro_rules! err_protocol {
    ($expr:expr) => {
        $crate::error::Error::Protocol($expr.into())
    };

    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::Error::Protocol(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_message_names_everything() {
        let err = Error::Resolution {
            direction: Direction::Scan,
            oid: 23,
            type_name: "int4".into(),
            format: "binary",
            host_type: "alloc::string::String",
        };

        assert_eq!(
            err.to_string(),
            "cannot find scan plan for alloc::string::String with int4 (OID 23) in binary format"
        );
    }

    #[test]
    fn unexpected_null_is_detected_through_scan_wrapper() {
        let err = Error::Scan {
            oid: 23,
            type_name: "unknown type".into(),
            format: "text",
            host_type: "i32",
            source: unexpected_null::<i32>(),
        };

        assert!(err.is_unexpected_null());
        assert!(err.to_string().contains("cannot scan NULL into i32"));
        assert!(err.to_string().contains("unknown type"));
    }
}

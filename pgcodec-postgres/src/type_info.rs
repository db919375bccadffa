use std::fmt::{self, Display};
use std::sync::Arc;

use crate::codec::Codec;

/// A registered PostgreSQL type: its OID, its name and the codec that converts it.
///
/// Types are immutable once built and shared between registries through [`Arc`].
#[derive(Debug, Clone)]
pub struct PgType {
    name: String,
    oid: u32,
    codec: Arc<dyn Codec>,
}

impl PgType {
    pub fn new(name: impl Into<String>, oid: u32, codec: impl Codec + 'static) -> Self {
        Self::with_codec(name, oid, Arc::new(codec))
    }

    pub fn with_codec(name: impl Into<String>, oid: u32, codec: Arc<dyn Codec>) -> Self {
        Self {
            name: name.into(),
            oid,
            codec,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn oid(&self) -> u32 {
        self.oid
    }

    pub fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }
}

impl Display for PgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

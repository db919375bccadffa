//! Types shared by every encode plan.

/// The return type of an encode plan.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IsNull {
    /// The value is null; no data was written.
    Yes,

    /// The value is not null.
    ///
    /// This does not mean that data was written.
    No,
}

impl IsNull {
    pub fn is_null(&self) -> bool {
        matches!(self, IsNull::Yes)
    }
}

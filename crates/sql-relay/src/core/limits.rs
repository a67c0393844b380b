pub const DEFAULT_LIMIT: i64 = 20;

/// Sentinel meaning "return every row, but still report the total".
pub const NO_LIMIT: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Unbounded,
    /// Forwarded literally, including zero and negatives other than the sentinel.
    Rows(i64),
}

impl Limit {
    pub fn from_raw(raw: i64) -> Self {
        if raw == NO_LIMIT {
            Limit::Unbounded
        } else {
            Limit::Rows(raw)
        }
    }

    /// Absent and `null` both fall back to the default page size.
    pub fn requested(raw: Option<i64>) -> Self {
        Self::from_raw(raw.unwrap_or(DEFAULT_LIMIT))
    }
}

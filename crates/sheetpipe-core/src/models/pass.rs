use serde::Serialize;

/// Outcome counters for one bounded import pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportPassSummary {
    /// Uploads fully imported (rows persisted, total_rows set).
    pub succeeded: u64,
    /// Uploads marked error (parse or insertion failure).
    pub failed: u64,
    /// Uploads skipped because another pass won the race for them.
    pub skipped: u64,
}

impl ImportPassSummary {
    pub fn total(&self) -> u64 {
        self.succeeded + self.failed + self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Outcome counters for one bounded process pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessPassSummary {
    /// Rows transformed and marked processed.
    pub succeeded: u64,
    /// Rows rejected as duplicates. A policy outcome, not a system fault.
    pub duplicate: u64,
    /// Rows marked error by a failed transform.
    pub failed: u64,
    /// Rows skipped (lost claim race or parent upload gone).
    pub skipped: u64,
}

impl ProcessPassSummary {
    pub fn total(&self) -> u64 {
        self.succeeded + self.duplicate + self.failed + self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

//! Scan results in serializable form

use serde::{Deserialize, Serialize};

/// Outcome of one scan, as rendered by `--json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanReport {
    /// Pattern as given on the command line
    pub pattern: String,
    /// Directory that was listed
    pub root: String,
    /// Number of paths tested against the pattern
    pub scanned: usize,
    /// Matching paths, in sorted order
    pub matched: Vec<String>,
    /// Paths whose match attempt failed with an error (invalid UTF-8, backtrack limit)
    pub match_errors: u64,
}

impl ScanReport {
    pub fn match_count(&self) -> usize {
        self.matched.len()
    }
}

//! Test Helper Functions for Corpus-Based Testing
//!
//! The corpus under `tests/corpus/library` is a small media library laid out
//! the way rxls is typically pointed at one.

use rxls::{ScanConfig, ScanReport, Scanner, WalkLister};
use std::path::Path;

pub const CORPUS_ROOT: &str = "tests/corpus/library";

/// Scan the corpus with default settings
pub fn scan_corpus(pattern: &str) -> ScanReport {
    scan_corpus_with(pattern, ScanConfig::default())
}

/// Scan the corpus with a custom config (its root is replaced with the corpus)
pub fn scan_corpus_with(pattern: &str, config: ScanConfig) -> ScanReport {
    let config = ScanConfig {
        root: CORPUS_ROOT.into(),
        ..config
    };
    Scanner::new(config.root.clone(), WalkLister::new(&config))
        .scan(pattern)
        .expect("Scan failed")
}

/// Matched paths relative to the corpus root, in report order
pub fn relative_matches(report: &ScanReport) -> Vec<String> {
    report
        .matched
        .iter()
        .map(|p| {
            Path::new(p)
                .strip_prefix(CORPUS_ROOT)
                .expect("match outside corpus")
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}

/// Assert the relative matches are exactly `expected`, in order
pub fn assert_matches(report: &ScanReport, expected: &[&str]) {
    let actual = relative_matches(report);
    assert_eq!(
        actual, expected,
        "Pattern '{}' matched {:?}, expected {:?}",
        report.pattern, actual, expected
    );
}

//! Scan driver: list, sort, filter
//!
//! The pattern is compiled before anything is listed, so a bad pattern is
//! reported as an error instead of silently producing no output.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::listing::FileLister;
use crate::matcher::PatternMatcher;
use crate::models::ScanReport;

/// How a [`ScanReport`] is written out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One matching path per line
    Lines,
    /// Only the number of matches
    Count,
    /// The full report as JSON
    Json { pretty: bool },
}

/// Runs scans of one root using a [`FileLister`]
pub struct Scanner<L: FileLister> {
    root: PathBuf,
    lister: L,
}

impl<L: FileLister> Scanner<L> {
    pub fn new(root: impl Into<PathBuf>, lister: L) -> Self {
        Self {
            root: root.into(),
            lister,
        }
    }

    pub fn lister(&self) -> &L {
        &self.lister
    }

    /// Compile `pattern`, list the root, and collect matching paths in
    /// byte-lexicographic order
    pub fn scan(&self, pattern: &str) -> Result<ScanReport> {
        let mut matcher = PatternMatcher::new(pattern);
        if !matcher.is_ready() {
            anyhow::bail!("Invalid pattern '{}': {}", pattern, matcher.error_message());
        }

        let mut paths = self
            .lister
            .list(&self.root)
            .with_context(|| format!("Failed to list {}", self.root.display()))?;
        sort_paths(&mut paths);

        log::info!("Testing {} paths against {:?}", paths.len(), pattern);

        let mut matched = Vec::new();
        for path in &paths {
            let failures_before = matcher.match_failures();

            if path_matches(&mut matcher, path) {
                matched.push(path.display().to_string());
            } else if matcher.match_failures() > failures_before {
                log::debug!(
                    "Could not match {}: {}",
                    path.display(),
                    matcher.error_message()
                );
            }
        }

        log::info!("{} of {} paths matched", matched.len(), paths.len());

        Ok(ScanReport {
            pattern: pattern.to_string(),
            root: self.root.display().to_string(),
            scanned: paths.len(),
            matched,
            match_errors: matcher.match_failures(),
        })
    }
}

/// Sort by the raw OS string, so ordering is byte-wise rather than per component
pub fn sort_paths(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
}

#[cfg(unix)]
fn path_matches(matcher: &mut PatternMatcher, path: &Path) -> bool {
    use std::os::unix::ffi::OsStrExt;
    matcher.matches_bytes(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_matches(matcher: &mut PatternMatcher, path: &Path) -> bool {
    matcher.matches(&path.to_string_lossy())
}

/// Write `report` to `out` in the requested format
pub fn write_report<W: Write>(report: &ScanReport, format: OutputFormat, out: &mut W) -> Result<()> {
    match format {
        OutputFormat::Lines => {
            for path in &report.matched {
                writeln!(out, "{}", path)?;
            }
        }
        OutputFormat::Count => {
            writeln!(out, "{}", report.match_count())?;
        }
        OutputFormat::Json { pretty } => {
            let json_output = if pretty {
                serde_json::to_string_pretty(report)?
            } else {
                serde_json::to_string(report)?
            };
            writeln!(out, "{}", json_output)?;
        }
    }

    out.flush()?;
    Ok(())
}

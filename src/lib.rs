//! rxls: list files whose path matches a regular expression
//!
//! rxls walks a scan root (by default `/video`), sorts the file paths it
//! finds, and prints the ones matching a PCRE-style pattern.
//!
//! # Architecture
//!
//! - **Matcher**: compiles the pattern once and answers match queries
//! - **Dialect**: maps PCRE-style syntax onto the Rust regex engines
//! - **Listing**: pluggable source of candidate paths (`FileLister`)
//! - **Scanner**: sorts, filters, and reports
//!
//! # Example Usage
//!
//! ```no_run
//! use rxls::{ScanConfig, Scanner, WalkLister};
//!
//! let config = ScanConfig::default();
//! let scanner = Scanner::new(config.root.clone(), WalkLister::new(&config));
//! let report = scanner.scan(r"\.mp4$").unwrap();
//!
//! for path in &report.matched {
//!     println!("{}", path);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod dialect;
pub mod listing;
pub mod matcher;
pub mod models;
pub mod output;
pub mod scan;

// Re-export commonly used types
pub use config::ScanConfig;
pub use listing::{FileLister, WalkLister};
pub use matcher::{EngineKind, PatternMatcher};
pub use models::ScanReport;
pub use scan::{OutputFormat, Scanner};

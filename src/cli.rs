//! CLI argument parsing and command handling

use anyhow::Result;
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::config::{self, ScanConfig};
use crate::listing::WalkLister;
use crate::output;
use crate::scan::{write_report, OutputFormat, Scanner};

/// rxls: list files whose path matches a PCRE-style pattern
#[derive(Parser, Debug)]
#[command(
    name = "rxls",
    version,
    about = "List files under a directory whose paths match a regular expression",
    long_about = "Lists every file under the scan root (default: /video), sorted, and prints \
                  those whose full path matches PATTERN.\n\n\
                  Matching is case-insensitive and Unicode-aware; \\d, \\w and \\s stay \
                  ASCII-only. Backreferences and look-around are supported."
)]
pub struct Cli {
    /// Enable verbose logging (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Regular expression tested against each path (unanchored)
    ///
    /// Examples:
    ///   rxls '\.mp4$'              # all MP4 files
    ///   rxls 'season\s?0?1/'       # files inside a season 1 directory
    ///   rxls '(\w)\1'              # paths containing a doubled character
    #[arg(value_name = "PATTERN")]
    pub pattern: Option<String>,

    /// Directory to scan (overrides config file and RXLS_ROOT)
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Config file to read instead of ~/.rxls/config.toml
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Maximum directory depth (1 = direct children only)
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Follow symbolic links
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories
    #[arg(long)]
    pub no_hidden: bool,

    /// Skip files excluded by .gitignore / .ignore rules
    #[arg(long)]
    pub respect_ignore: bool,

    /// Only print the number of matching paths
    #[arg(short, long, conflicts_with = "json")]
    pub count: bool,

    /// Output format as JSON
    #[arg(long)]
    pub json: bool,

    /// Pretty-print JSON output (only with --json)
    #[arg(long, requires = "json")]
    pub pretty: bool,
}

impl Cli {
    /// Execute the command, writing results to stdout
    pub fn execute(self) -> Result<()> {
        // Setup logging based on verbosity
        let log_level = match self.verbose {
            0 => "warn",   // Default: only warnings and errors
            1 => "info",   // -v: show info messages
            2 => "debug",  // -vv: show debug messages
            _ => "trace",  // -vvv: show trace messages
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
            .init();

        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.run(&mut out)
    }

    /// Run the command against `out`
    ///
    /// With no pattern, prints the usage line and returns without listing.
    pub fn run<W: Write>(self, out: &mut W) -> Result<()> {
        let Some(pattern) = self.pattern.as_deref() else {
            writeln!(out, "{}", usage_line(&program_name()))?;
            return Ok(());
        };

        let config = self.resolve_config()?;
        log::debug!("Scan config: {:?}", config);

        let scanner = Scanner::new(config.root.clone(), WalkLister::new(&config));
        let report = scanner.scan(pattern)?;

        if report.match_errors > 0 {
            output::warn(&match_error_notice(report.match_errors));
        }

        write_report(&report, self.output_format(), out)
    }

    /// Merge config file, environment, and command-line flags
    pub fn resolve_config(&self) -> Result<ScanConfig> {
        let mut config = config::load_config(self.config.as_deref())?;
        config.apply_env();

        if let Some(root) = &self.root {
            config.root = root.clone();
        }
        if let Some(depth) = self.max_depth {
            config.max_depth = Some(depth);
        }
        if self.follow_symlinks {
            config.follow_symlinks = true;
        }
        if self.no_hidden {
            config.include_hidden = false;
        }
        if self.respect_ignore {
            config.respect_ignore = true;
        }

        Ok(config)
    }

    fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json { pretty: self.pretty }
        } else if self.count {
            OutputFormat::Count
        } else {
            OutputFormat::Lines
        }
    }
}

/// Warning shown when some paths failed to match with an error. The cause
/// varies (invalid UTF-8, backtrack limit), and -vv logs each one.
fn match_error_notice(count: u64) -> String {
    format!(
        "{} path(s) could not be tested against the pattern. Run with -vv for details.",
        count
    )
}

pub fn usage_line(program: &str) -> String {
    format!("usage: {} <pcre pattern>", program)
}

fn program_name() -> String {
    std::env::args_os()
        .next()
        .map(|arg| arg.to_string_lossy().into_owned())
        .unwrap_or_else(|| "rxls".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_usage_without_pattern() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing");
        let cli = parse(&["rxls", "--root", missing.to_str().unwrap()]);

        let mut out = Vec::new();
        cli.run(&mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("usage: "));
        assert!(text.trim_end().ends_with(" <pcre pattern>"));
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_match_error_notice_does_not_name_a_cause() {
        let notice = match_error_notice(3);
        assert!(notice.starts_with("3 path(s) could not be tested"));
        assert!(!notice.contains("UTF-8"));
    }

    #[test]
    fn test_usage_line() {
        assert_eq!(usage_line("rxls"), "usage: rxls <pcre pattern>");
    }

    #[test]
    fn test_flags_override_config_file() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");
        fs::write(
            &config_path,
            "[scan]\nroot = \"/from/file\"\nmax_depth = 3\ninclude_hidden = true\n",
        )
        .unwrap();

        let cli = parse(&[
            "rxls",
            "--config",
            config_path.to_str().unwrap(),
            "--root",
            "/from/flag",
            "--no-hidden",
            "--respect-ignore",
            "x",
        ]);
        let config = cli.resolve_config().unwrap();

        assert_eq!(config.root, PathBuf::from("/from/flag"));
        assert_eq!(config.max_depth, Some(3));
        assert!(!config.include_hidden);
        assert!(config.respect_ignore);
        assert!(!config.follow_symlinks);
    }

    #[test]
    fn test_output_format_selection() {
        assert_eq!(parse(&["rxls", "x"]).output_format(), OutputFormat::Lines);
        assert_eq!(parse(&["rxls", "-c", "x"]).output_format(), OutputFormat::Count);
        assert_eq!(
            parse(&["rxls", "--json", "--pretty", "x"]).output_format(),
            OutputFormat::Json { pretty: true }
        );
    }

    #[test]
    fn test_conflicting_flags_rejected() {
        assert!(Cli::try_parse_from(["rxls", "--json", "--count", "x"]).is_err());
        assert!(Cli::try_parse_from(["rxls", "--pretty", "x"]).is_err());
    }

    #[test]
    fn test_run_lists_matches() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("b.mp4"), "").unwrap();
        fs::write(root.join("a.MP4"), "").unwrap();
        fs::write(root.join("c.txt"), "").unwrap();

        let cli = parse(&["rxls", "--root", root.to_str().unwrap(), r"\.mp4$"]);
        let mut out = Vec::new();
        cli.run(&mut out).unwrap();

        let expected = format!(
            "{}\n{}\n",
            root.join("a.MP4").display(),
            root.join("b.mp4").display()
        );
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_run_invalid_pattern_is_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.mp4"), "").unwrap();

        let cli = parse(&["rxls", "--root", temp.path().to_str().unwrap(), "("]);
        let mut out = Vec::new();
        let err = cli.run(&mut out).unwrap_err();

        assert!(err.to_string().contains("Invalid pattern"));
        assert!(out.is_empty());
    }
}

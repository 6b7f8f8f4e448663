//! Scan configuration
//!
//! Settings come from, in increasing priority:
//! 1. Built-in defaults
//! 2. The `[scan]` table of `~/.rxls/config.toml` (or the file given with `--config`)
//! 3. The `RXLS_ROOT` environment variable (scan root only)
//! 4. Command-line flags

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Per-user config directory name (under the home directory)
pub const CONFIG_DIR: &str = ".rxls";
pub const CONFIG_TOML: &str = "config.toml";

/// Environment variable that overrides the scan root
pub const ROOT_ENV: &str = "RXLS_ROOT";

pub const DEFAULT_ROOT: &str = "/video";

/// Where to scan and how to walk it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanConfig {
    /// Directory whose files are listed
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Maximum walk depth (1 = direct children only, None = unlimited)
    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Follow symbolic links while walking
    #[serde(default)]
    pub follow_symlinks: bool,

    /// List dotfiles and files inside dot-directories
    #[serde(default = "default_include_hidden")]
    pub include_hidden: bool,

    /// Skip files excluded by .gitignore / .ignore rules
    #[serde(default)]
    pub respect_ignore: bool,
}

fn default_root() -> PathBuf {
    PathBuf::from(DEFAULT_ROOT)
}

fn default_include_hidden() -> bool {
    true
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            max_depth: None,
            follow_symlinks: false,
            include_hidden: true,
            respect_ignore: false,
        }
    }
}

impl ScanConfig {
    /// Apply the `RXLS_ROOT` environment variable, if set
    pub fn apply_env(&mut self) {
        self.apply_root_override(std::env::var_os(ROOT_ENV));
    }

    /// Replace the root with `value` unless it is missing or empty
    pub fn apply_root_override(&mut self, value: Option<OsString>) {
        if let Some(root) = value.filter(|v| !v.is_empty()) {
            log::debug!("Scan root overridden to {:?}", root);
            self.root = PathBuf::from(root);
        }
    }
}

/// Load scan config
///
/// An explicit path must exist. Without one, `~/.rxls/config.toml` is read
/// when present; otherwise defaults are returned.
pub fn load_config(explicit: Option<&Path>) -> Result<ScanConfig> {
    let config_path = match explicit {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            path.to_path_buf()
        }
        None => match user_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                log::debug!("No user config found, using default scan config");
                return Ok(ScanConfig::default());
            }
        },
    };

    log::debug!("Loading config from {}", config_path.display());

    let config_str = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;

    parse_config(&config_str).with_context(|| format!("Failed to parse {}", config_path.display()))
}

/// Parse config TOML, reading only the `[scan]` table
pub fn parse_config(config_str: &str) -> Result<ScanConfig> {
    let toml_value: toml::Value = toml::from_str(config_str).context("Invalid TOML")?;

    if let Some(scan_table) = toml_value.get("scan") {
        let config: ScanConfig = scan_table
            .clone()
            .try_into()
            .context("Failed to parse [scan] section")?;
        Ok(config)
    } else {
        log::debug!("No [scan] section in config, using defaults");
        Ok(ScanConfig::default())
    }
}

fn user_config_path() -> Option<PathBuf> {
    match dirs::home_dir() {
        Some(home) => Some(home.join(CONFIG_DIR).join(CONFIG_TOML)),
        None => {
            log::debug!("Could not determine home directory");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.root, PathBuf::from("/video"));
        assert_eq!(config.max_depth, None);
        assert!(config.include_hidden);
        assert!(!config.follow_symlinks);
        assert!(!config.respect_ignore);
    }

    #[test]
    fn test_parse_scan_section() {
        let config = parse_config(
            r#"
[scan]
root = "/srv/media"
max_depth = 2
respect_ignore = true
"#,
        )
        .unwrap();

        assert_eq!(config.root, PathBuf::from("/srv/media"));
        assert_eq!(config.max_depth, Some(2));
        assert!(config.respect_ignore);
        // Unset fields keep their defaults
        assert!(config.include_hidden);
        assert!(!config.follow_symlinks);
    }

    #[test]
    fn test_missing_section_uses_defaults() {
        let config = parse_config("[other]\nkey = 1\n").unwrap();
        assert_eq!(config, ScanConfig::default());

        let config = parse_config("").unwrap();
        assert_eq!(config, ScanConfig::default());
    }

    #[test]
    fn test_bad_toml_is_error() {
        assert!(parse_config("[scan\nroot = ").is_err());
        assert!(parse_config("[scan]\nmax_depth = \"deep\"\n").is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("rxls.toml");
        std::fs::write(&path, "[scan]\nroot = \"/mnt/films\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.root, PathBuf::from("/mnt/films"));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let temp = TempDir::new().unwrap();
        let err = load_config(Some(&temp.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_root_override() {
        let mut config = ScanConfig::default();

        config.apply_root_override(None);
        assert_eq!(config.root, PathBuf::from(DEFAULT_ROOT));

        config.apply_root_override(Some(OsString::new()));
        assert_eq!(config.root, PathBuf::from(DEFAULT_ROOT));

        config.apply_root_override(Some(OsString::from("/data")));
        assert_eq!(config.root, PathBuf::from("/data"));
    }
}

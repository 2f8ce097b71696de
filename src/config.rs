use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::report::ReportOptions;

pub const CONFIG_FILE: &str = "prism.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub command: CommandConfig,
    pub report: ReportConfig,
}

/// How to invoke the test harness
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandConfig {
    pub program: String,
    /// Always passed, before any user arguments
    pub args: Vec<String>,
    /// Used when the user passes no arguments of their own
    pub default_targets: Vec<String>,
    pub cwd: Option<String>,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            program: "go".to_string(),
            args: vec!["test".to_string(), "-json".to_string()],
            default_targets: vec!["./...".to_string()],
            cwd: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportConfig {
    /// Show output lines of failed tests
    pub verbose: bool,
    /// Stripped from test names for display and sorting
    pub name_prefix: String,
    /// Output lines starting with one of these are harness framing
    pub delimiters: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let options = ReportOptions::default();
        Self {
            verbose: options.verbose,
            name_prefix: options.name_prefix,
            delimiters: options.delimiters,
        }
    }
}

impl ReportConfig {
    pub fn to_options(&self) -> ReportOptions {
        ReportOptions {
            verbose: self.verbose,
            name_prefix: self.name_prefix.clone(),
            delimiters: self.delimiters.clone(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load an explicit config file, or `prism.toml` from `dir` if present,
    /// or fall back to defaults
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let default_path = dir.join(CONFIG_FILE);
        if default_path.is_file() {
            tracing::debug!(path = %default_path.display(), "loading config");
            Self::load(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if self.command.program.trim().is_empty() {
            anyhow::bail!("[command] program must not be empty");
        }

        if self.report.delimiters.iter().any(|d| d.is_empty()) {
            anyhow::bail!("[report] delimiters must not contain empty strings");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[command]
program = "gotestsum"
args = ["--format", "standard-json", "--"]
cwd = "backend"

[report]
verbose = true
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.command.program, "gotestsum");
        assert_eq!(config.command.args.len(), 3);
        assert_eq!(config.command.default_targets, vec!["./..."]);
        assert_eq!(config.command.cwd.as_deref(), Some("backend"));
        assert!(config.report.verbose);
        assert_eq!(config.report.name_prefix, "Test");
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.command, CommandConfig::default());
        assert_eq!(config.report, ReportConfig::default());
    }

    #[test]
    fn test_discover_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::discover(None, dir.path()).unwrap();
        assert_eq!(config.command.program, "go");
    }

    #[test]
    fn test_discover_reads_default_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[report]\nverbose = true\n").unwrap();

        let config = Config::discover(None, dir.path()).unwrap();
        assert!(config.report.verbose);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::discover(Some(&missing), dir.path()).is_err());
    }

    #[test]
    fn test_empty_program_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[command]\nprogram = \"\"\n").unwrap();
        assert!(Config::load(&path).is_err());
    }
}

// ==============================================================================
// config.rs - Run Configuration
// ==============================================================================
// Description: Lab list, service endpoint, credentials and table naming
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Legacy config file format (key=value, '#' comments):
//   labs=AMC,NKI,UMCG
//   url=https://vkgl.molgeniscloud.org/api/
//   account=admin
//   password=secret
// ==============================================================================

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_TABLE_PREFIX: &str = "VKGL_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config line {line}: expected key=value")]
    InvalidLine { line: usize },

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("No labs configured")]
    NoLabs,
}

/// Settings that may come from a config file, the environment or the CLI
#[derive(Default, Clone)]
pub struct PartialConfig {
    pub labs: Option<String>,
    pub url: Option<String>,
    pub account: Option<String>,
    pub password: Option<String>,
}

impl PartialConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Parse `key=value` lines; unknown keys are ignored
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (idx, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .ok_or(ConfigError::InvalidLine { line: idx + 1 })?;
            let value = Some(value.trim().to_string());

            match key.trim() {
                "labs" => config.labs = value,
                "url" => config.url = value,
                "account" => config.account = value,
                "password" => config.password = value,
                _ => {}
            }
        }

        Ok(config)
    }

    /// Values set in `other` take precedence
    pub fn merge(self, other: PartialConfig) -> PartialConfig {
        PartialConfig {
            labs: other.labs.or(self.labs),
            url: other.url.or(self.url),
            account: other.account.or(self.account),
            password: other.password.or(self.password),
        }
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        let labs = parse_labs(&self.labs.ok_or(ConfigError::Missing("labs"))?);
        if labs.is_empty() {
            return Err(ConfigError::NoLabs);
        }

        Ok(Config {
            labs,
            url: self.url.ok_or(ConfigError::Missing("url"))?,
            account: self.account.ok_or(ConfigError::Missing("account"))?,
            password: self.password.ok_or(ConfigError::Missing("password"))?,
        })
    }
}

/// Comma-separated lab names, trimmed, empty entries dropped
pub fn parse_labs(labs: &str) -> Vec<String> {
    labs.split(',')
        .map(str::trim)
        .filter(|lab| !lab.is_empty())
        .map(str::to_string)
        .collect()
}

/// Validated configuration for one run
#[derive(Clone)]
pub struct Config {
    /// Labs in processing order; the first lab reporting a variant seeds its attributes
    pub labs: Vec<String>,
    pub url: String,
    pub account: String,
    pub password: String,
}

// Never print credentials
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("labs", &self.labs)
            .field("url", &self.url)
            .field("account", &self.account)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Names of the tables read and written by a refresh
#[derive(Debug, Clone, PartialEq)]
pub struct TableNames {
    prefix: String,
}

impl TableNames {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Source table of one lab (e.g., "VKGL_UMCG")
    pub fn lab(&self, lab: &str) -> String {
        format!("{}{}", self.prefix, lab)
    }

    pub fn consensus(&self) -> String {
        format!("{}consensus", self.prefix)
    }

    pub fn comments(&self) -> String {
        format!("{}comments", self.prefix)
    }
}

impl Default for TableNames {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_legacy_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "# VKGL\nlabs = AMC, NKI,,UMCG \nurl=https://vkgl.example.org/api/\naccount=admin\npassword=a=b\nextra=1\n"
        )
        .unwrap();

        let config = PartialConfig::from_file(file.path()).unwrap().build().unwrap();
        assert_eq!(config.labs, vec!["AMC", "NKI", "UMCG"]);
        assert_eq!(config.url, "https://vkgl.example.org/api/");
        assert_eq!(config.password, "a=b");
    }

    #[test]
    fn test_invalid_line() {
        let result = PartialConfig::parse("labs=AMC\nnot a setting\n");
        assert!(matches!(result, Err(ConfigError::InvalidLine { line: 2 })));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let file = PartialConfig::parse("labs=AMC\nurl=http://a\naccount=x\npassword=y\n").unwrap();
        let cli = PartialConfig {
            url: Some("http://b".to_string()),
            ..Default::default()
        };

        let config = file.merge(cli).build().unwrap();
        assert_eq!(config.url, "http://b");
        assert_eq!(config.labs, vec!["AMC"]);
    }

    #[test]
    fn test_missing_settings() {
        let result = PartialConfig::parse("labs=AMC\nurl=http://a\naccount=x\n").unwrap().build();
        assert!(matches!(result, Err(ConfigError::Missing("password"))));

        let result = PartialConfig::parse("labs= , \nurl=u\naccount=a\npassword=p\n").unwrap().build();
        assert!(matches!(result, Err(ConfigError::NoLabs)));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = PartialConfig::parse("labs=AMC\nurl=u\naccount=a\npassword=hunter2\n")
            .unwrap()
            .build()
            .unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_table_names() {
        let tables = TableNames::default();
        assert_eq!(tables.lab("UMCG"), "VKGL_UMCG");
        assert_eq!(tables.consensus(), "VKGL_consensus");
        assert_eq!(tables.comments(), "VKGL_comments");
    }
}

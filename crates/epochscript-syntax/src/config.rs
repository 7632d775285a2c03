//! Parser configuration loaded from `epochscript.toml`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

pub(crate) const CONFIG_FILES: &[&str] = &["epochscript.toml", ".epochscript.toml"];

/// Options that affect lexing and reparsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseConfig {
    /// Column a tab advances to the next multiple of when measuring indentation.
    pub tab_width: u32,
    /// Which incremental strategies `reparse` may use.
    pub incremental: IncrementalConfig,
}

/// Switches for the incremental reparse strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncrementalConfig {
    /// Relex a single edited token in place.
    pub relex_tokens: bool,
    /// Reparse only the top-level statements around an edit.
    pub reuse_statements: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            tab_width: 8,
            incremental: IncrementalConfig::default(),
        }
    }
}

impl Default for IncrementalConfig {
    fn default() -> Self {
        Self {
            relex_tokens: true,
            reuse_statements: true,
        }
    }
}

/// Errors from reading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file is not valid TOML or has unexpected keys.
    #[error("invalid epochscript config: {0}")]
    Toml(#[from] toml::de::Error),
    /// `tab-width` must be at least one column.
    #[error("tab-width must be at least 1, got {0}")]
    InvalidTabWidth(u32),
}

impl ParseConfig {
    /// Parses the `[syntax]` table of a config file.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let parsed: ConfigFile = toml::from_str(contents)?;
        let mut config = Self::default();
        let syntax = parsed.syntax;
        if let Some(tab_width) = syntax.tab_width {
            if tab_width == 0 {
                return Err(ConfigError::InvalidTabWidth(tab_width));
            }
            config.tab_width = tab_width;
        }
        if let Some(relex) = syntax.incremental.relex_tokens {
            config.incremental.relex_tokens = relex;
        }
        if let Some(reuse) = syntax.incremental.reuse_statements {
            config.incremental.reuse_statements = reuse;
        }
        Ok(config)
    }

    /// Loads configuration for a project directory.
    ///
    /// Missing files yield the defaults. Unreadable or invalid files are
    /// logged and also fall back to the defaults.
    pub fn load(root: &Path) -> Self {
        let Some(path) = find_config_file(root) else {
            return Self::default();
        };
        let Ok(contents) = std::fs::read_to_string(&path) else {
            warn!("Failed to read epochscript config at {}", path.display());
            return Self::default();
        };
        match Self::from_toml_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                warn!("Failed to parse epochscript config at {}: {err}", path.display());
                Self::default()
            }
        }
    }
}

pub(crate) fn find_config_file(root: &Path) -> Option<PathBuf> {
    CONFIG_FILES
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    syntax: SyntaxSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct SyntaxSection {
    tab_width: Option<u32>,
    #[serde(default)]
    incremental: IncrementalSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct IncrementalSection {
    relex_tokens: Option<bool>,
    reuse_statements: Option<bool>,
}

//! Configuration loading.
//!
//! Settings come from an optional `unitgraph.toml`; search paths and the
//! temp directory also fall back to the `DELPHI_SEARCH` and `DELPHI_TEMP`
//! environment variables.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Result, UnitGraphError};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "unitgraph.toml";

/// `;`-separated list of source directories.
pub const SEARCH_ENV: &str = "DELPHI_SEARCH";
pub const TEMP_ENV: &str = "DELPHI_TEMP";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UnitGraphConfig {
    /// Directories scanned for units and include files.
    pub search: Vec<PathBuf>,
    /// Extensions (without dot) of unit and project sources.
    pub unit_extensions: Vec<String>,
    /// Extensions (without dot) of include files.
    pub include_extensions: Vec<String>,
    /// Ignore `uses` in implementation sections.
    pub interface_only: bool,
    /// Nesting limit for `{$I}` directives.
    pub max_include_depth: usize,
}

impl Default for UnitGraphConfig {
    fn default() -> Self {
        Self {
            search: Vec::new(),
            unit_extensions: vec!["pas".to_string(), "dpr".to_string()],
            include_extensions: vec!["inc".to_string()],
            interface_only: false,
            max_include_depth: 16,
        }
    }
}

impl UnitGraphConfig {
    /// Loads the config, falling back to defaults when the file is missing or
    /// invalid.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Self::default();
        }
        match Self::try_load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "ignoring config file");
                Self::default()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| UnitGraphError::io(path, e))?;
        toml::from_str(&text).map_err(|e| UnitGraphError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Configured search directories, or `DELPHI_SEARCH` when none are set.
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        if !self.search.is_empty() {
            return self.search.clone();
        }
        std::env::var(SEARCH_ENV)
            .map(|value| split_path_list(&value))
            .unwrap_or_default()
    }

    pub fn is_unit_file(&self, path: &Path) -> bool {
        has_extension(path, &self.unit_extensions)
    }

    pub fn is_include_file(&self, path: &Path) -> bool {
        has_extension(path, &self.include_extensions)
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
}

/// Splits a `;`-separated path list, dropping empty entries.
pub fn split_path_list(list: &str) -> Vec<PathBuf> {
    list.split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Makes every entry of a `;`-separated path list absolute. Entries that
/// cannot be resolved are kept as they are.
pub fn abs_path_list(list: &str) -> String {
    list.split(';')
        .map(|p| match std::path::absolute(p) {
            Ok(abs) => abs.to_string_lossy().into_owned(),
            Err(_) => p.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Scratch directory: `DELPHI_TEMP`, or the system temp directory.
pub fn temp_dir() -> PathBuf {
    std::env::var_os(TEMP_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
}

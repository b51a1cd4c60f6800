// Export configuration
//
// Loaded once at startup from (in order):
// - Default values
// - Config file (explicit path, or ~/.config/queryexport/config.yaml)
// - Environment variables

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_QUERY_DIR: &str = "/app/superset/custom_plugins/save_query_export/queries";
pub const DEFAULT_DATASET_DIR: &str = "/app/superset/custom_plugins/save_query_export/datasets";
pub const DEFAULT_EXAMPLE_SCHEMA_PERM: &str = "[examples].[public]";

pub const ENV_QUERY_DIR: &str = "QUERYEXPORT_QUERY_DIR";
pub const ENV_DATASET_DIR: &str = "QUERYEXPORT_DATASET_DIR";
pub const ENV_EXAMPLE_SCHEMA_PERM: &str = "QUERYEXPORT_EXAMPLE_SCHEMA_PERM";

/// How record fields are turned into file names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileNaming {
    /// Embed fields verbatim, path separators included
    Raw,
    /// Replace path separators and NUL with `_`
    #[default]
    Sanitized,
}

/// What deleting a dataset does when its file is already gone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetDelete {
    /// Missing file is not an error (same as saved queries)
    #[default]
    Tolerant,
    /// Missing file is reported as a failed removal
    Strict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory receiving `<id>_<label>.sql` files
    pub query_dir: PathBuf,

    /// Directory receiving `<table_name>.sql` files
    pub dataset_dir: PathBuf,

    /// Datasets with exactly this schema_perm are never exported
    pub example_schema_perm: String,

    pub file_names: FileNaming,

    pub dataset_delete: DatasetDelete,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            query_dir: PathBuf::from(DEFAULT_QUERY_DIR),
            dataset_dir: PathBuf::from(DEFAULT_DATASET_DIR),
            example_schema_perm: DEFAULT_EXAMPLE_SCHEMA_PERM.to_string(),
            file_names: FileNaming::default(),
            dataset_delete: DatasetDelete::default(),
        }
    }
}

impl ExportConfig {
    /// Config rooted at a single base directory (`<base>/queries`, `<base>/datasets`)
    pub fn rooted_at<P: AsRef<Path>>(base: P) -> Self {
        let base = base.as_ref();
        Self {
            query_dir: base.join("queries"),
            dataset_dir: base.join("datasets"),
            ..Self::default()
        }
    }

    /// Default location of the user config file
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("queryexport/config.yaml"))
            .unwrap_or_else(|| PathBuf::from("queryexport.yaml"))
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the default path is used if
    /// present, otherwise defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = Self::default_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    debug!(path = ?default_path, "No config file, using defaults");
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a YAML config file; absent keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!(path = ?path, "Loaded config file");
        Ok(config)
    }

    /// Apply overrides from a variable lookup (normally the process environment)
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_QUERY_DIR).filter(|v| !v.is_empty()) {
            self.query_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_DATASET_DIR).filter(|v| !v.is_empty()) {
            self.dataset_dir = PathBuf::from(dir);
        }
        if let Some(perm) = lookup(ENV_EXAMPLE_SCHEMA_PERM).filter(|v| !v.is_empty()) {
            self.example_schema_perm = perm;
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }
}

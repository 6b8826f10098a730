//! Batch run configuration
//!
//! Loaded from YAML. Paths of sources and outputs are resolved against
//! `base_dir` when one is given, else against the config file's directory.

use crate::flatten::IndexKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("configuration lists no sources")]
    NoSources,

    #[error("duplicate source name '{0}'")]
    DuplicateSource(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Alphabetic term index
    Index,
    /// Column table (neoplasm, drug)
    Table,
    /// Tabular list of categories
    Tabular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    #[default]
    Primary,
    Secondary,
}

impl From<Family> for IndexKind {
    fn from(family: Family) -> Self {
        match family {
            Family::Primary => IndexKind::Primary,
            Family::Secondary => IndexKind::Secondary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub path: PathBuf,
    pub kind: SourceKind,
    /// Ignored for tabular sources, whose projection is always primary
    #[serde(default)]
    pub family: Family,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub primary: PathBuf,
    pub secondary: PathBuf,
    pub categories: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            primary: PathBuf::from("data_cm_index.json"),
            secondary: PathBuf::from("data_pcs_index.json"),
            categories: PathBuf::from("data_tabular_index.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub outputs: OutputConfig,
}

impl RunConfig {
    /// The 2023 ICD-10-CM / ICD-10-PCS release, file names as CMS ships them
    pub fn default_icd10() -> Self {
        let source = |name: &str, path: &str, kind, family| SourceConfig {
            name: name.to_string(),
            path: PathBuf::from(path),
            kind,
            family,
        };
        RunConfig {
            base_dir: None,
            sources: vec![
                source("Index", "icd10cm_index_2023.xml", SourceKind::Index, Family::Primary),
                source("Neoplasm", "icd10cm_neoplasm_2023.xml", SourceKind::Table, Family::Primary),
                source("Drug", "icd10cm_drug_2023.xml", SourceKind::Table, Family::Primary),
                source("E-Index", "icd10cm_eindex_2023.xml", SourceKind::Index, Family::Primary),
                source("Tabular", "icd10cm_tabular_2023.xml", SourceKind::Tabular, Family::Primary),
                source("PCS Index", "icd10pcs_index_2023.xml", SourceKind::Index, Family::Secondary),
            ],
            outputs: OutputConfig::default(),
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file; a relative or missing `base_dir` is taken
    /// relative to the file's own directory
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let mut config = Self::from_yaml(&contents)?;

        let config_dir = path.parent().unwrap_or_else(|| Path::new(""));
        config.base_dir = Some(match config.base_dir.take() {
            Some(base) => config_dir.join(base),
            None => config_dir.to_path_buf(),
        });
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.name.as_str()) {
                return Err(ConfigError::DuplicateSource(source.name.clone()));
            }
        }
        Ok(())
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) => base.join(path),
            None => path.to_path_buf(),
        }
    }
}

use crate::domain::model::{DatasetHandle, DatasetKind, DatasetSource, FileDataset, TabularDataset};
use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_url, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Registered datasets of a local workspace.
///
/// ```toml
/// [[datasets]]
/// name = "iris"
/// type = "tabular"
/// source = "data/iris.csv"
///
/// [[datasets]]
/// name = "images"
/// type = "file"
/// source = "${DATA_ROOT}/images.zip"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRegistry {
    #[serde(default)]
    pub datasets: Vec<DatasetEntry>,
    /// Directory relative sources are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub name: String,
    pub r#type: DatasetKind,
    pub source: String,
    pub description: Option<String>,
}

impl DatasetRegistry {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::ConfigError {
            message: format!("Cannot read dataset registry {}: {}", path.display(), e),
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        Self::from_toml_str(&content, base_dir)
    }

    pub fn from_toml_str(content: &str, base_dir: PathBuf) -> Result<Self> {
        let processed_content = substitute_env_vars(content)?;

        let mut registry: Self =
            toml::from_str(&processed_content).map_err(|e| PipelineError::ConfigError {
                message: format!("Dataset registry parsing error: {}", e),
            })?;
        registry.base_dir = base_dir;
        registry.validate()?;
        Ok(registry)
    }

    pub fn find(&self, name: &str) -> Option<&DatasetEntry> {
        self.datasets.iter().find(|d| d.name == name)
    }

    pub fn handle(&self, name: &str) -> Option<DatasetHandle> {
        self.find(name).map(|entry| entry.to_handle(&self.base_dir))
    }

    pub fn names(&self) -> Vec<&str> {
        self.datasets.iter().map(|d| d.name.as_str()).collect()
    }
}

impl DatasetEntry {
    pub fn to_handle(&self, base_dir: &Path) -> DatasetHandle {
        let source = DatasetSource::parse(&self.source, base_dir);
        match self.r#type {
            DatasetKind::Tabular => DatasetHandle::Tabular(TabularDataset {
                name: self.name.clone(),
                source,
            }),
            DatasetKind::File => DatasetHandle::File(FileDataset {
                name: self.name.clone(),
                source,
            }),
        }
    }

    fn is_remote(&self) -> bool {
        let source = self.source.trim_start();
        source.starts_with("http://") || source.starts_with("https://")
    }
}

impl Validate for DatasetRegistry {
    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.datasets {
            validate_non_empty_string("datasets.name", &entry.name)?;
            validate_non_empty_string("datasets.source", &entry.source)?;

            if !seen.insert(entry.name.as_str()) {
                return Err(PipelineError::InvalidConfigValueError {
                    field: "datasets.name".to_string(),
                    value: entry.name.clone(),
                    reason: "Dataset names must be unique".to_string(),
                });
            }

            if entry.is_remote() {
                if entry.r#type == DatasetKind::Tabular {
                    return Err(PipelineError::InvalidConfigValueError {
                        field: "datasets.source".to_string(),
                        value: entry.source.clone(),
                        reason: "Tabular datasets must point at a local CSV file".to_string(),
                    });
                }
                for url in entry.source.split(',').map(str::trim).filter(|u| !u.is_empty()) {
                    validate_url("datasets.source", url)?;
                }
            }
        }
        Ok(())
    }
}

/// Replaces `${VAR}` with the environment value; unknown variables are kept verbatim.
fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| PipelineError::ConfigError {
        message: format!("Invalid substitution pattern: {}", e),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = r#"
[[datasets]]
name = "iris"
type = "tabular"
source = "data/iris.csv"
description = "Fisher's iris"

[[datasets]]
name = "images"
type = "file"
source = "https://data.test/a.png,https://data.test/b.png"
"#;

    #[test]
    fn test_parse_registry() {
        let registry = DatasetRegistry::from_toml_str(REGISTRY, PathBuf::from("/proj")).unwrap();
        assert_eq!(registry.names(), vec!["iris", "images"]);

        match registry.handle("iris").unwrap() {
            DatasetHandle::Tabular(t) => {
                assert_eq!(t.source, DatasetSource::LocalFile(PathBuf::from("/proj/data/iris.csv")))
            }
            other => panic!("expected tabular, got {:?}", other),
        }
        assert_eq!(registry.handle("images").unwrap().kind(), DatasetKind::File);
        assert!(registry.handle("missing").is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let toml = r#"
[[datasets]]
name = "iris"
type = "tabular"
source = "a.csv"

[[datasets]]
name = "iris"
type = "tabular"
source = "b.csv"
"#;
        assert!(DatasetRegistry::from_toml_str(toml, PathBuf::from(".")).is_err());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let toml = r#"
[[datasets]]
name = "blobs"
type = "blob"
source = "a"
"#;
        let err = DatasetRegistry::from_toml_str(toml, PathBuf::from(".")).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError { .. }));
    }

    #[test]
    fn test_remote_tabular_rejected() {
        let toml = r#"
[[datasets]]
name = "iris"
type = "tabular"
source = "https://data.test/iris.csv"
"#;
        assert!(DatasetRegistry::from_toml_str(toml, PathBuf::from(".")).is_err());
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("PIPELINE_STAGES_TEST_ROOT", "/mnt/data");
        let toml = r#"
[[datasets]]
name = "scans"
type = "file"
source = "${PIPELINE_STAGES_TEST_ROOT}/scans"
"#;
        let registry = DatasetRegistry::from_toml_str(toml, PathBuf::from(".")).unwrap();
        assert_eq!(registry.find("scans").unwrap().source, "/mnt/data/scans");

        let kept = substitute_env_vars("${PIPELINE_STAGES_TEST_UNSET_VAR}").unwrap();
        assert_eq!(kept, "${PIPELINE_STAGES_TEST_UNSET_VAR}");
    }
}

use crate::domain::model::Workspace;
use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_path, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const CONFIG_DIR_NAME: &str = ".azureml";
pub const DEFAULT_REGISTRY_FILE: &str = "datasets.toml";

/// Workspace `config.json`, as downloaded from the platform portal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub subscription_id: String,
    pub resource_group: String,
    pub workspace_name: String,
    /// Dataset registry, relative to the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_registry: Option<String>,
}

impl WorkspaceConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| PipelineError::ConfigError {
                message: format!("Invalid workspace config: {}", e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Looks for `config.json` or `.azureml/config.json` in `start` and each of
    /// its ancestors, nearest first.
    pub fn discover(start: &Path) -> Result<PathBuf> {
        let mut searched = Vec::new();
        for dir in start.ancestors() {
            for candidate in [
                dir.join(CONFIG_FILE_NAME),
                dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME),
            ] {
                if candidate.is_file() {
                    tracing::debug!("Found workspace config at {}", candidate.display());
                    return Ok(candidate);
                }
                searched.push(candidate.display().to_string());
            }
        }
        Err(PipelineError::WorkspaceNotFoundError {
            searched: searched.join(", "),
        })
    }

    pub fn workspace(&self) -> Workspace {
        Workspace {
            subscription_id: self.subscription_id.clone(),
            resource_group: self.resource_group.clone(),
            workspace_name: self.workspace_name.clone(),
        }
    }

    pub fn registry_path(&self, config_path: &Path) -> PathBuf {
        let base = config_path.parent().unwrap_or_else(|| Path::new("."));
        base.join(
            self.dataset_registry
                .as_deref()
                .unwrap_or(DEFAULT_REGISTRY_FILE),
        )
    }
}

impl Validate for WorkspaceConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("subscription_id", &self.subscription_id)?;
        validate_non_empty_string("resource_group", &self.resource_group)?;
        validate_non_empty_string("workspace_name", &self.workspace_name)?;
        if let Some(registry) = &self.dataset_registry {
            validate_path("dataset_registry", registry)?;
        }
        Ok(())
    }
}

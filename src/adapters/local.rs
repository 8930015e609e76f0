use crate::config::{DatasetRegistry, WorkspaceConfig};
use crate::domain::model::{
    DatasetHandle, DatasetSource, FileDataset, InputDataset, ManagedRun, RunContext, Workspace,
};
use crate::domain::ports::{DatasetPlatform, MountSession};
use crate::utils::error::{PipelineError, Result};
use crate::utils::fs::{copy_tree, ensure_dir, list_dir, remove_entry};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use url::Url;

pub const ENV_RUN_ID: &str = "AZUREML_RUN_ID";
pub const ENV_EXPERIMENT: &str = "AZUREML_ARM_PROJECT_NAME";
pub const ENV_SUBSCRIPTION: &str = "AZUREML_ARM_SUBSCRIPTION";
pub const ENV_RESOURCE_GROUP: &str = "AZUREML_ARM_RESOURCEGROUP";
pub const ENV_WORKSPACE: &str = "AZUREML_ARM_WORKSPACE_NAME";
/// Overrides the registry named by the workspace config.
pub const ENV_DATASET_REGISTRY: &str = "PIPELINE_DATASET_REGISTRY";
/// `AZUREML_DATAREFERENCE_<input>=<path>`: input already mounted by the platform.
pub const ENV_DATAREFERENCE_PREFIX: &str = "AZUREML_DATAREFERENCE_";
/// `AZUREML_DATASET_<input>=<registered name>`: input passed as a dataset object.
pub const ENV_DATASET_PREFIX: &str = "AZUREML_DATASET_";

/// Platform adapter backed by local files and environment variables.
///
/// The workspace comes from `config.json`, datasets from the TOML registry it
/// points at, and the run context from the variables a managed run exports.
pub struct LocalPlatform {
    search_root: PathBuf,
    workspace_config: Option<PathBuf>,
    env: HashMap<String, String>,
    client: Client,
}

impl LocalPlatform {
    pub fn new(search_root: impl Into<PathBuf>) -> Self {
        Self {
            search_root: search_root.into(),
            workspace_config: None,
            env: HashMap::new(),
            client: Client::new(),
        }
    }

    /// Current directory and process environment.
    pub fn from_process_env() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Ok(Self::new(cwd).with_env_vars(std::env::vars()))
    }

    pub fn with_workspace_config(mut self, path: Option<PathBuf>) -> Self {
        self.workspace_config = path;
        self
    }

    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    fn env_var(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    fn config_path(&self) -> Result<PathBuf> {
        match &self.workspace_config {
            Some(path) if path.is_file() => Ok(path.clone()),
            Some(path) => Err(PipelineError::WorkspaceNotFoundError {
                searched: path.display().to_string(),
            }),
            None => WorkspaceConfig::discover(&self.search_root),
        }
    }

    fn load_config(&self) -> Result<(WorkspaceConfig, PathBuf)> {
        let path = self.config_path()?;
        let config = WorkspaceConfig::from_file(&path)?;
        Ok((config, path))
    }

    fn load_registry(&self) -> Result<DatasetRegistry> {
        if let Some(path) = self.env_var(ENV_DATASET_REGISTRY) {
            return DatasetRegistry::from_file(path);
        }
        let (config, path) = self.load_config()?;
        DatasetRegistry::from_file(config.registry_path(&path))
    }

    fn managed_run(&self, run_id: &str) -> Result<ManagedRun> {
        let workspace = Workspace {
            subscription_id: self.env_var(ENV_SUBSCRIPTION).unwrap_or_default().to_string(),
            resource_group: self.env_var(ENV_RESOURCE_GROUP).unwrap_or_default().to_string(),
            workspace_name: self
                .env_var(ENV_WORKSPACE)
                .ok_or_else(|| PipelineError::RunContextError {
                    message: format!("{} is set but {} is missing", ENV_RUN_ID, ENV_WORKSPACE),
                })?
                .to_string(),
        };

        let mut input_datasets = HashMap::new();
        for (key, value) in &self.env {
            if let Some(input) = key.strip_prefix(ENV_DATAREFERENCE_PREFIX) {
                input_datasets.insert(
                    input.to_string(),
                    InputDataset::MountedPath(PathBuf::from(value)),
                );
            } else if let Some(input) = key.strip_prefix(ENV_DATASET_PREFIX) {
                // Looked up in the registry only when this input is requested.
                input_datasets.insert(input.to_string(), InputDataset::Registered(value.clone()));
            }
        }

        Ok(ManagedRun {
            run_id: run_id.to_string(),
            experiment: self.env_var(ENV_EXPERIMENT).unwrap_or("default").to_string(),
            workspace,
            input_datasets,
        })
    }
}

#[async_trait]
impl DatasetPlatform for LocalPlatform {
    async fn workspace_from_config(&self) -> Result<Workspace> {
        let (config, path) = self.load_config()?;
        tracing::debug!("Loaded workspace config from {}", path.display());
        Ok(config.workspace())
    }

    async fn resolve_by_name(&self, workspace: &Workspace, name: &str) -> Result<DatasetHandle> {
        let registry = self.load_registry()?;
        registry
            .handle(name)
            .ok_or_else(|| PipelineError::DatasetNotFoundError {
                name: name.to_string(),
                scope: format!("workspace {}", workspace),
            })
    }

    async fn current_run_context(&self) -> Result<RunContext> {
        match self.env_var(ENV_RUN_ID) {
            Some(run_id) => Ok(RunContext::Managed(self.managed_run(run_id)?)),
            None => Ok(RunContext::Offline),
        }
    }

    async fn mount(&self, dataset: &FileDataset, mount_point: &Path) -> Result<Box<dyn MountSession>> {
        Ok(Box::new(LocalMount::new(
            dataset.clone(),
            mount_point.to_path_buf(),
            self.client.clone(),
        )))
    }
}

/// Materialises a file dataset into its mount point on `start` and removes
/// what it created on `stop`.
pub struct LocalMount {
    dataset: FileDataset,
    mount_point: PathBuf,
    client: Client,
    created: Vec<PathBuf>,
    started: bool,
}

impl LocalMount {
    pub fn new(dataset: FileDataset, mount_point: PathBuf, client: Client) -> Self {
        Self {
            dataset,
            mount_point,
            client,
            created: Vec::new(),
            started: false,
        }
    }

    fn mount_error(&self, message: impl Into<String>) -> PipelineError {
        PipelineError::MountError {
            mount_point: self.mount_point.display().to_string(),
            message: message.into(),
        }
    }

    fn require_exists(&self, path: &Path) -> Result<()> {
        if path.exists() {
            Ok(())
        } else {
            Err(self.mount_error(format!(
                "source of dataset '{}' does not exist: {}",
                self.dataset.name,
                path.display()
            )))
        }
    }

    fn extract_archive(&self, archive_path: &Path) -> Result<()> {
        let file = std::fs::File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        archive.extract(&self.mount_point)?;
        tracing::debug!(
            "Extracted {} entries from {}",
            archive.len(),
            archive_path.display()
        );
        Ok(())
    }

    async fn download(&self, urls: &[String]) -> Result<()> {
        let mut used: HashSet<String> = HashSet::new();
        for (index, raw) in urls.iter().enumerate() {
            let base_name = Url::parse(raw)
                .ok()
                .and_then(|url| url.path_segments().and_then(|s| s.last()).map(str::to_string))
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| format!("file_{}", index));
            let file_name = unique_file_name(&mut used, base_name, index);

            tracing::debug!("Downloading {} -> {}", raw, file_name);
            let response = self.client.get(raw).send().await?.error_for_status()?;
            let bytes = response.bytes().await?;
            std::fs::write(self.mount_point.join(&file_name), &bytes)?;
        }
        Ok(())
    }
}

/// Keeps the URL's own file name unless an earlier URL of the same dataset
/// already took it; then the position in the list is prefixed.
fn unique_file_name(used: &mut HashSet<String>, name: String, index: usize) -> String {
    let mut candidate = name.clone();
    let mut attempt = 0;
    while used.contains(&candidate) {
        candidate = if attempt == 0 {
            format!("{}_{}", index, name)
        } else {
            format!("{}_{}_{}", index, attempt, name)
        };
        attempt += 1;
    }
    used.insert(candidate.clone());
    candidate
}

#[async_trait]
impl MountSession for LocalMount {
    fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    fn is_started(&self) -> bool {
        self.started
    }

    async fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(self.mount_error("mount session already started"));
        }
        ensure_dir(&self.mount_point)?;
        let before: HashSet<String> = list_dir(&self.mount_point)?.into_iter().collect();

        match &self.dataset.source {
            DatasetSource::Directory(dir) => {
                self.require_exists(dir)?;
                copy_tree(dir, &self.mount_point)?;
            }
            DatasetSource::Archive(path) => {
                self.require_exists(path)?;
                self.extract_archive(path)?;
            }
            DatasetSource::LocalFile(path) => {
                self.require_exists(path)?;
                let file_name = path
                    .file_name()
                    .ok_or_else(|| self.mount_error("dataset source has no file name"))?;
                std::fs::copy(path, self.mount_point.join(file_name))?;
            }
            DatasetSource::Remote(urls) => self.download(urls).await?,
        }

        self.created = list_dir(&self.mount_point)?
            .into_iter()
            .filter(|name| !before.contains(name))
            .map(|name| self.mount_point.join(name))
            .collect();
        self.started = true;
        tracing::info!(
            "Mounted dataset '{}' ({} entries) at {}",
            self.dataset.name,
            self.created.len(),
            self.mount_point.display()
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if !self.started {
            return Ok(());
        }
        for path in self.created.drain(..) {
            remove_entry(&path)?;
        }
        self.started = false;
        tracing::debug!("Unmounted dataset '{}'", self.dataset.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_file_name_prefixes_repeated_names() {
        let mut used = HashSet::new();
        assert_eq!(unique_file_name(&mut used, "data.csv".to_string(), 0), "data.csv");
        assert_eq!(unique_file_name(&mut used, "data.csv".to_string(), 1), "1_data.csv");
        assert_eq!(unique_file_name(&mut used, "other.csv".to_string(), 2), "other.csv");
    }

    #[test]
    fn test_unique_file_name_skips_taken_prefixed_name() {
        let mut used = HashSet::new();
        unique_file_name(&mut used, "1_data.csv".to_string(), 0);
        unique_file_name(&mut used, "data.csv".to_string(), 1);
        assert_eq!(unique_file_name(&mut used, "data.csv".to_string(), 1), "1_1_data.csv");
    }
}

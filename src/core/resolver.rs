use crate::core::mount::MountHandle;
use crate::domain::model::{DatasetHandle, ExecutionMode, InputDataset, RunContext};
use crate::domain::ports::DatasetPlatform;
use crate::utils::error::{PipelineError, Result};
use crate::utils::fs::list_dir;
use crate::utils::validation::validate_non_empty_string;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Outcome of resolving a dataset name.
///
/// `dataset` is `None` when a managed run handed over an already mounted
/// path. `mount_path` is `None` when no mount exists (tabular data, or an
/// unmounted dataset object in a managed run).
#[derive(Debug)]
pub struct ResolvedDataset {
    pub dataset: Option<DatasetHandle>,
    mount_path: Option<PathBuf>,
    mount: Option<MountHandle>,
}

impl ResolvedDataset {
    pub fn mount_path(&self) -> Option<&Path> {
        self.mount_path.as_deref()
    }

    pub fn is_mounted_here(&self) -> bool {
        self.mount.is_some()
    }

    /// Stops a mount started by this process. Platform-provided mounts are left alone.
    pub fn release(mut self) -> Result<()> {
        match self.mount.take() {
            Some(mount) => mount.unmount(),
            None => Ok(()),
        }
    }
}

pub struct DatasetResolver<'a, P: DatasetPlatform + ?Sized> {
    platform: &'a P,
}

impl<'a, P: DatasetPlatform + ?Sized> DatasetResolver<'a, P> {
    pub fn new(platform: &'a P) -> Self {
        Self { platform }
    }

    pub async fn resolve(&self, name: &str, mode: ExecutionMode) -> Result<ResolvedDataset> {
        validate_non_empty_string("input_dataset", name)?;

        match mode {
            ExecutionMode::Local => self.resolve_offline(name).await,
            ExecutionMode::Managed => self.resolve_managed(name).await,
        }
    }

    async fn resolve_offline(&self, name: &str) -> Result<ResolvedDataset> {
        let workspace = self.platform.workspace_from_config().await?;
        tracing::debug!("Using workspace {} from local config", workspace);

        let dataset = self.platform.resolve_by_name(&workspace, name).await?;

        let file_dataset = match &dataset {
            DatasetHandle::File(file_dataset) => file_dataset.clone(),
            DatasetHandle::Tabular(_) => {
                tracing::info!("Dataset '{}' is tabular, nothing to mount", name);
                return Ok(ResolvedDataset {
                    dataset: Some(dataset),
                    mount_path: None,
                    mount: None,
                });
            }
        };

        let temp_dir = TempDir::new()?;
        let mount_point = temp_dir.path().to_path_buf();
        tracing::info!(
            "This is a file dataset and therefore mounting to {}",
            mount_point.display()
        );

        let mut session = self.platform.mount(&file_dataset, &mount_point).await?;
        session.start().await?;
        let mount = MountHandle::new(session, Some(temp_dir));

        Ok(ResolvedDataset {
            dataset: Some(dataset),
            mount_path: Some(mount_point),
            mount: Some(mount),
        })
    }

    async fn resolve_managed(&self, name: &str) -> Result<ResolvedDataset> {
        let run = match self.platform.current_run_context().await? {
            RunContext::Managed(run) => run,
            RunContext::Offline => {
                return Err(PipelineError::RunContextError {
                    message: "managed execution requested but no platform run is active".to_string(),
                })
            }
        };
        tracing::debug!(
            "Run {} of experiment '{}' in workspace {}",
            run.run_id,
            run.experiment,
            run.workspace
        );
        tracing::info!("dataset name {}", name);

        let input = run.input_datasets.get(name).cloned().ok_or_else(|| {
            PipelineError::DatasetNotFoundError {
                name: name.to_string(),
                scope: format!("inputs of run {}", run.run_id),
            }
        })?;

        match input {
            InputDataset::MountedPath(path) => {
                tracing::info!(
                    "This is a file dataset and therefore it has already been mounted to {}",
                    path.display()
                );
                match list_dir(&path) {
                    Ok(entries) => tracing::info!("contents of folder: {:?}", entries),
                    Err(e) => tracing::warn!("Could not list {}: {}", path.display(), e),
                }
                Ok(ResolvedDataset {
                    dataset: None,
                    mount_path: Some(path),
                    mount: None,
                })
            }
            InputDataset::Dataset(dataset) => Ok(Self::dataset_object(name, dataset)),
            InputDataset::Registered(registered) => {
                let dataset = self.platform.resolve_by_name(&run.workspace, &registered).await?;
                Ok(Self::dataset_object(name, dataset))
            }
        }
    }

    fn dataset_object(name: &str, dataset: DatasetHandle) -> ResolvedDataset {
        tracing::info!("Input '{}' is a {} dataset object", name, dataset.kind());
        ResolvedDataset {
            dataset: Some(dataset),
            mount_path: None,
            mount: None,
        }
    }
}

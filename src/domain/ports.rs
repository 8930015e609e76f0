use crate::domain::model::{DatasetHandle, FileDataset, RunContext, Workspace};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// The slice of the ML platform the stages depend on.
#[async_trait]
pub trait DatasetPlatform: Send + Sync {
    /// Workspace described by local configuration. Only used for offline runs.
    async fn workspace_from_config(&self) -> Result<Workspace>;

    async fn resolve_by_name(&self, workspace: &Workspace, name: &str) -> Result<DatasetHandle>;

    async fn current_run_context(&self) -> Result<RunContext>;

    /// Prepares a mount of `dataset` at `mount_point`. Nothing is visible
    /// until the returned session is started.
    async fn mount(&self, dataset: &FileDataset, mount_point: &Path) -> Result<Box<dyn MountSession>>;
}

#[async_trait]
pub trait MountSession: Send + Sync {
    fn mount_point(&self) -> &Path;

    fn is_started(&self) -> bool;

    async fn start(&mut self) -> Result<()>;

    /// Must be safe to call more than once; it runs from `Drop`.
    fn stop(&mut self) -> Result<()>;
}

#![allow(dead_code)]

use async_trait::async_trait;
use pipeline_stages::domain::model::{
    DatasetHandle, DatasetSource, FileDataset, InputDataset, ManagedRun, RunContext,
    TabularDataset, Workspace,
};
use pipeline_stages::domain::ports::{DatasetPlatform, MountSession};
use pipeline_stages::{PipelineError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const MOUNTED_FILE: &str = "part-00000.txt";

#[derive(Debug, Default)]
pub struct Calls {
    pub workspace: AtomicUsize,
    pub resolve: AtomicUsize,
    pub mount: AtomicUsize,
    pub stop: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// In-memory stand-in for the ML platform.
pub struct FakePlatform {
    pub workspace: Option<Workspace>,
    pub datasets: HashMap<String, DatasetHandle>,
    pub run: RunContext,
    pub calls: Arc<Calls>,
}

pub fn workspace() -> Workspace {
    Workspace {
        subscription_id: "sub".to_string(),
        resource_group: "rg".to_string(),
        workspace_name: "ws".to_string(),
    }
}

impl FakePlatform {
    pub fn offline() -> Self {
        Self {
            workspace: Some(workspace()),
            datasets: HashMap::new(),
            run: RunContext::Offline,
            calls: Arc::new(Calls::default()),
        }
    }

    pub fn managed(inputs: Vec<(&str, InputDataset)>) -> Self {
        let input_datasets = inputs
            .into_iter()
            .map(|(name, input)| (name.to_string(), input))
            .collect();
        Self {
            run: RunContext::Managed(ManagedRun {
                run_id: "run-1".to_string(),
                experiment: "exp".to_string(),
                workspace: workspace(),
                input_datasets,
            }),
            ..Self::offline()
        }
    }

    pub fn without_workspace(mut self) -> Self {
        self.workspace = None;
        self
    }

    pub fn with_tabular(mut self, name: &str, csv_path: &Path) -> Self {
        self.datasets.insert(
            name.to_string(),
            DatasetHandle::Tabular(TabularDataset {
                name: name.to_string(),
                source: DatasetSource::LocalFile(csv_path.to_path_buf()),
            }),
        );
        self
    }

    pub fn with_file(mut self, name: &str) -> Self {
        self.datasets.insert(name.to_string(), file_handle(name));
        self
    }
}

pub fn file_handle(name: &str) -> DatasetHandle {
    DatasetHandle::File(FileDataset {
        name: name.to_string(),
        source: DatasetSource::Remote(vec!["https://data.test/part-00000.txt".to_string()]),
    })
}

#[async_trait]
impl DatasetPlatform for FakePlatform {
    async fn workspace_from_config(&self) -> Result<Workspace> {
        self.calls.workspace.fetch_add(1, Ordering::SeqCst);
        self.workspace
            .clone()
            .ok_or_else(|| PipelineError::WorkspaceNotFoundError {
                searched: "config.json".to_string(),
            })
    }

    async fn resolve_by_name(&self, workspace: &Workspace, name: &str) -> Result<DatasetHandle> {
        self.calls.resolve.fetch_add(1, Ordering::SeqCst);
        self.datasets
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::DatasetNotFoundError {
                name: name.to_string(),
                scope: format!("workspace {}", workspace),
            })
    }

    async fn current_run_context(&self) -> Result<RunContext> {
        Ok(self.run.clone())
    }

    async fn mount(&self, _dataset: &FileDataset, mount_point: &Path) -> Result<Box<dyn MountSession>> {
        self.calls.mount.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeMount {
            mount_point: mount_point.to_path_buf(),
            started: false,
            calls: Arc::clone(&self.calls),
        }))
    }
}

pub struct FakeMount {
    mount_point: PathBuf,
    started: bool,
    calls: Arc<Calls>,
}

#[async_trait]
impl MountSession for FakeMount {
    fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    fn is_started(&self) -> bool {
        self.started
    }

    async fn start(&mut self) -> Result<()> {
        std::fs::write(self.mount_point.join(MOUNTED_FILE), "hello")?;
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if self.started {
            self.started = false;
            self.calls.stop.fetch_add(1, Ordering::SeqCst);
            let _ = std::fs::remove_file(self.mount_point.join(MOUNTED_FILE));
        }
        Ok(())
    }
}

pub fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

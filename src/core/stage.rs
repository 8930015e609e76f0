use crate::utils::error::Result;
use crate::utils::monitor::StageMonitor;
use async_trait::async_trait;
use std::path::PathBuf;

/// What a finished stage leaves behind for the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub stage: String,
    pub output_folder: PathBuf,
    pub artifacts: Vec<PathBuf>,
}

#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self) -> Result<StageReport>;
}

pub struct StageEngine<S: Stage> {
    stage: S,
    monitor: StageMonitor,
}

impl<S: Stage> StageEngine<S> {
    pub fn new(stage: S) -> Self {
        Self::new_with_monitoring(stage, false)
    }

    pub fn new_with_monitoring(stage: S, monitor_enabled: bool) -> Self {
        Self {
            stage,
            monitor: StageMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<StageReport> {
        let name = self.stage.name();
        tracing::info!("Starting stage '{}'", name);
        self.monitor.log_stats("Start");

        let report = self.stage.run().await?;

        self.monitor.log_stats(name);
        tracing::info!(
            "Stage '{}' wrote {} artifact(s) to {}",
            name,
            report.artifacts.len(),
            report.output_folder.display()
        );
        self.monitor.log_final_stats();

        Ok(report)
    }
}

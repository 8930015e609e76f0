use crate::core::resolver::DatasetResolver;
use crate::core::stage::{Stage, StageReport};
use crate::domain::model::{DatasetHandle, DatasetKind, ExecutionMode};
use crate::domain::ports::DatasetPlatform;
use crate::utils::error::Result;
use crate::utils::fs::{ensure_dir, list_dir};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, Validate,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_FOLDER: &str = "outputs";
pub const TRAINING_DATA_FILE: &str = "training_data.csv";
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone)]
pub struct DataPrepOptions {
    pub input_dataset: String,
    pub output_folder: PathBuf,
    /// `None` lets the platform's run context decide.
    pub mode: Option<ExecutionMode>,
    /// Only copy the first N rows of a tabular dataset.
    pub take: Option<usize>,
}

impl DataPrepOptions {
    pub fn new(input_dataset: impl Into<String>, output_folder: impl Into<PathBuf>) -> Self {
        Self {
            input_dataset: input_dataset.into(),
            output_folder: output_folder.into(),
            mode: None,
            take: None,
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_take(mut self, take: usize) -> Self {
        self.take = Some(take);
        self
    }
}

impl Validate for DataPrepOptions {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("input_dataset", &self.input_dataset)?;
        validate_path("output_folder", &self.output_folder.to_string_lossy())?;
        if let Some(take) = self.take {
            validate_positive_number("take", take, 1)?;
        }
        Ok(())
    }
}

/// Written next to the prepared data so the next stage (and humans) can see
/// what was resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPrepManifest {
    pub dataset_name: String,
    pub dataset_kind: Option<DatasetKind>,
    pub execution_mode: ExecutionMode,
    /// Empty when nothing was mounted.
    pub mount_path: String,
    pub mounted_files: Vec<String>,
    pub rows_written: Option<usize>,
    pub created_at: DateTime<Utc>,
}

impl DataPrepManifest {
    pub fn read_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

pub struct DataPrepStage<P: DatasetPlatform> {
    platform: P,
    options: DataPrepOptions,
}

impl<P: DatasetPlatform> DataPrepStage<P> {
    pub fn new(platform: P, options: DataPrepOptions) -> Self {
        Self { platform, options }
    }

    pub fn options(&self) -> &DataPrepOptions {
        &self.options
    }

    async fn execution_mode(&self) -> Result<ExecutionMode> {
        match self.options.mode {
            Some(mode) => Ok(mode),
            None => {
                let run = self.platform.current_run_context().await?;
                let mode = ExecutionMode::detect(&run);
                tracing::debug!("Detected {} execution", mode);
                Ok(mode)
            }
        }
    }

    /// Resolves the input, creates the output folder and writes the prepared
    /// artifacts. A mount started here is stopped before returning, on success
    /// and on error.
    pub async fn prepare(&self) -> Result<(DataPrepManifest, Vec<PathBuf>)> {
        self.options.validate()?;
        let mode = self.execution_mode().await?;

        let resolved = DatasetResolver::new(&self.platform)
            .resolve(&self.options.input_dataset, mode)
            .await?;

        let output_folder = ensure_dir(&self.options.output_folder)?;
        let mut artifacts = Vec::new();

        let rows_written = match resolved.dataset.as_ref().and_then(DatasetHandle::as_tabular) {
            Some(tabular) => {
                let table = match self.options.take {
                    Some(n) => tabular.take(n)?,
                    None => tabular.to_table()?,
                };
                let path = output_folder.join(TRAINING_DATA_FILE);
                table.write_csv(&path)?;
                tracing::info!("Wrote {} rows to {}", table.row_count(), path.display());
                artifacts.push(path);
                Some(table.row_count())
            }
            None => None,
        };

        let mounted_files = match resolved.mount_path() {
            Some(path) => list_dir(path)?,
            None => Vec::new(),
        };

        let manifest = DataPrepManifest {
            dataset_name: self.options.input_dataset.clone(),
            dataset_kind: resolved.dataset.as_ref().map(DatasetHandle::kind),
            execution_mode: mode,
            mount_path: resolved
                .mount_path()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            mounted_files,
            rows_written,
            created_at: Utc::now(),
        };

        let manifest_path = output_folder.join(MANIFEST_FILE);
        std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;
        artifacts.push(manifest_path);

        resolved.release()?;
        Ok((manifest, artifacts))
    }
}

#[async_trait]
impl<P: DatasetPlatform> Stage for DataPrepStage<P> {
    fn name(&self) -> &str {
        "data-prep"
    }

    async fn run(&self) -> Result<StageReport> {
        let (_, artifacts) = self.prepare().await?;
        Ok(StageReport {
            stage: self.name().to_string(),
            output_folder: self.options.output_folder.clone(),
            artifacts,
        })
    }
}

use crate::core::data_prep::TRAINING_DATA_FILE;
use crate::core::stage::{Stage, StageReport};
use crate::domain::model::Table;
use crate::utils::error::Result;
use crate::utils::fs::ensure_dir;
use crate::utils::validation::{validate_finite, validate_path, Validate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_TRAINING_DATA: &str = "../01-data-prep/outputs/training_data.csv";
pub const DEFAULT_OUTPUT_FOLDER: &str = ".outputs";
pub const DEFAULT_PARAM1: f64 = 1.0;
pub const SUMMARY_FILE: &str = "training_summary.json";

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub training_data: PathBuf,
    pub param1: f64,
    pub output_folder: PathBuf,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            training_data: PathBuf::from(DEFAULT_TRAINING_DATA),
            param1: DEFAULT_PARAM1,
            output_folder: PathBuf::from(DEFAULT_OUTPUT_FOLDER),
        }
    }
}

impl Validate for TrainOptions {
    fn validate(&self) -> Result<()> {
        validate_path("training_data", &self.training_data.to_string_lossy())?;
        validate_path("output_folder", &self.output_folder.to_string_lossy())?;
        validate_finite("param1", self.param1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub training_data: String,
    pub param1: f64,
    pub data_found: bool,
    pub rows: usize,
    pub columns: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Stage B. Loads the prepared data and records what a model would be fitted
/// on; no model is fitted.
pub struct TrainStage {
    options: TrainOptions,
}

impl TrainStage {
    pub fn new(options: TrainOptions) -> Self {
        Self { options }
    }

    /// A directory input is taken to be the data-prep output folder.
    fn data_file(&self) -> PathBuf {
        let path = &self.options.training_data;
        if path.is_dir() {
            path.join(TRAINING_DATA_FILE)
        } else {
            path.clone()
        }
    }

    fn load_training_data(path: &Path) -> Result<Option<Table>> {
        if !path.is_file() {
            tracing::warn!("Training data not found at {}, nothing to train on", path.display());
            return Ok(None);
        }
        let table = Table::from_csv_path(path, None)?;
        tracing::info!(
            "Loaded training data {}: {} rows x {} columns",
            path.display(),
            table.row_count(),
            table.column_count()
        );
        Ok(Some(table))
    }

    pub async fn train(&self) -> Result<(TrainingSummary, PathBuf)> {
        self.options.validate()?;
        let output_folder = ensure_dir(&self.options.output_folder)?;

        let data_file = self.data_file();
        let table = Self::load_training_data(&data_file)?;
        tracing::debug!("param1 = {}", self.options.param1);

        let summary = TrainingSummary {
            training_data: data_file.to_string_lossy().into_owned(),
            param1: self.options.param1,
            data_found: table.is_some(),
            rows: table.as_ref().map_or(0, Table::row_count),
            columns: table.map(|t| t.headers).unwrap_or_default(),
            created_at: Utc::now(),
        };

        let summary_path = output_folder.join(SUMMARY_FILE);
        std::fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
        Ok((summary, summary_path))
    }
}

#[async_trait]
impl Stage for TrainStage {
    fn name(&self) -> &str {
        "train"
    }

    async fn run(&self) -> Result<StageReport> {
        let (_, summary_path) = self.train().await?;
        Ok(StageReport {
            stage: self.name().to_string(),
            output_folder: self.options.output_folder.clone(),
            artifacts: vec![summary_path],
        })
    }
}

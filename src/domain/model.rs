use crate::utils::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Identity of the workspace that owns datasets and runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub subscription_id: String,
    pub resource_group: String,
    pub workspace_name: String,
}

impl fmt::Display for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_group, self.workspace_name)
    }
}

/// How a stage is being executed. Passed explicitly into the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Local,
    Managed,
}

impl ExecutionMode {
    pub fn detect(run: &RunContext) -> Self {
        match run {
            RunContext::Offline => ExecutionMode::Local,
            RunContext::Managed(_) => ExecutionMode::Managed,
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Local => f.write_str("local"),
            ExecutionMode::Managed => f.write_str("managed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Tabular,
    File,
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Tabular => f.write_str("tabular"),
            DatasetKind::File => f.write_str("file"),
        }
    }
}

impl FromStr for DatasetKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tabular" => Ok(DatasetKind::Tabular),
            "file" => Ok(DatasetKind::File),
            other => Err(PipelineError::InvalidConfigValueError {
                field: "type".to_string(),
                value: other.to_string(),
                reason: "Dataset type must be 'tabular' or 'file'".to_string(),
            }),
        }
    }
}

/// Where the bytes of a dataset live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    Directory(PathBuf),
    Archive(PathBuf),
    LocalFile(PathBuf),
    Remote(Vec<String>),
}

impl DatasetSource {
    /// Classifies a registry source string. URLs are comma separated.
    pub fn parse(source: &str, base_dir: &Path) -> Self {
        let trimmed = source.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let urls = trimmed
                .split(',')
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
                .collect();
            return DatasetSource::Remote(urls);
        }

        let path = base_dir.join(trimmed);
        let is_zip = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        if is_zip {
            DatasetSource::Archive(path)
        } else if path.is_dir() {
            DatasetSource::Directory(path)
        } else {
            DatasetSource::LocalFile(path)
        }
    }
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSource::Directory(p) | DatasetSource::Archive(p) | DatasetSource::LocalFile(p) => {
                write!(f, "{}", p.display())
            }
            DatasetSource::Remote(urls) => f.write_str(&urls.join(",")),
        }
    }
}

/// In-memory rows of a tabular dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn from_csv_reader<R: std::io::Read>(reader: R, limit: Option<usize>) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            if limit.is_some_and(|n| rows.len() >= n) {
                break;
            }
            rows.push(record?.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn from_csv_path(path: &Path, limit: Option<usize>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file, limit)
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        // An empty record would be written as `""` and read back as one column.
        if !self.headers.is_empty() {
            writer.write_record(&self.headers)?;
        }
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// A dataset exposed as rows and columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularDataset {
    pub name: String,
    pub source: DatasetSource,
}

impl TabularDataset {
    pub fn to_table(&self) -> Result<Table> {
        self.read(None)
    }

    /// First `n` rows of the dataset.
    pub fn take(&self, n: usize) -> Result<Table> {
        self.read(Some(n))
    }

    fn read(&self, limit: Option<usize>) -> Result<Table> {
        match &self.source {
            DatasetSource::LocalFile(path) => Table::from_csv_path(path, limit),
            other => Err(PipelineError::ProcessingError {
                message: format!(
                    "Tabular dataset '{}' must be backed by a local CSV file, got {}",
                    self.name, other
                ),
            }),
        }
    }
}

/// A dataset exposed as a collection of files; needs a mount to be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDataset {
    pub name: String,
    pub source: DatasetSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetHandle {
    Tabular(TabularDataset),
    File(FileDataset),
}

impl DatasetHandle {
    pub fn name(&self) -> &str {
        match self {
            DatasetHandle::Tabular(d) => &d.name,
            DatasetHandle::File(d) => &d.name,
        }
    }

    pub fn kind(&self) -> DatasetKind {
        match self {
            DatasetHandle::Tabular(_) => DatasetKind::Tabular,
            DatasetHandle::File(_) => DatasetKind::File,
        }
    }

    pub fn as_tabular(&self) -> Option<&TabularDataset> {
        match self {
            DatasetHandle::Tabular(d) => Some(d),
            DatasetHandle::File(_) => None,
        }
    }
}

/// A declared input of a managed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputDataset {
    Dataset(DatasetHandle),
    /// Name of a registered dataset, looked up when the input is requested.
    Registered(String),
    /// The platform mounted the data before the stage started.
    MountedPath(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedRun {
    pub run_id: String,
    pub experiment: String,
    pub workspace: Workspace,
    pub input_datasets: HashMap<String, InputDataset>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunContext {
    Offline,
    Managed(ManagedRun),
}

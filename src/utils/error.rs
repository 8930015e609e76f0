use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value:?}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Workspace configuration not found (searched: {searched})")]
    WorkspaceNotFoundError { searched: String },

    #[error("Dataset '{name}' not found in {scope}")]
    DatasetNotFoundError { name: String, scope: String },

    #[error("Run context error: {message}")]
    RunContextError { message: String },

    #[error("Mount error at {mount_point}: {message}")]
    MountError {
        mount_point: String,
        message: String,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Validation,
    Platform,
    Storage,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PipelineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::ConfigError { .. } | PipelineError::WorkspaceNotFoundError { .. } => {
                ErrorCategory::Configuration
            }
            PipelineError::InvalidConfigValueError { .. } => ErrorCategory::Validation,
            PipelineError::HttpError(_)
            | PipelineError::DatasetNotFoundError { .. }
            | PipelineError::RunContextError { .. }
            | PipelineError::MountError { .. } => ErrorCategory::Platform,
            PipelineError::IoError(_) | PipelineError::ZipError(_) => ErrorCategory::Storage,
            PipelineError::CsvError(_)
            | PipelineError::SerializationError(_)
            | PipelineError::ProcessingError { .. } => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Storage => ErrorSeverity::Critical,
            ErrorCategory::Validation | ErrorCategory::Platform | ErrorCategory::Processing => {
                ErrorSeverity::High
            }
        }
    }

    /// Process exit code for this failure. There is no retryable class, every
    /// error terminates the stage.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    /// Logs the failure with its classification and prints the short form to stderr.
    pub fn report(&self) {
        tracing::error!(
            "❌ Stage failed: {} (Category: {:?}, Severity: {:?})",
            self,
            self.category(),
            self.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", self.recovery_suggestion());
        eprintln!("❌ {}", self.user_friendly_message());
        eprintln!("💡 {}", self.recovery_suggestion());
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            PipelineError::InvalidConfigValueError { field, reason, .. } => {
                format!("Argument '{}' is invalid: {}", field, reason)
            }
            PipelineError::WorkspaceNotFoundError { .. } => {
                "No workspace configuration is available for this offline run".to_string()
            }
            PipelineError::DatasetNotFoundError { name, .. } => {
                format!("Dataset '{}' could not be resolved", name)
            }
            PipelineError::MountError { message, .. } => {
                format!("Mounting the dataset failed: {}", message)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            PipelineError::InvalidConfigValueError { .. } => {
                "Check the command line arguments passed to this stage"
            }
            PipelineError::WorkspaceNotFoundError { .. } => {
                "Place a config.json (or .azureml/config.json) in the working directory or pass --workspace_config"
            }
            PipelineError::ConfigError { .. } => {
                "Check the workspace config and dataset registry files"
            }
            PipelineError::DatasetNotFoundError { .. } => {
                "Register the dataset or declare it as an input of the pipeline step"
            }
            PipelineError::RunContextError { .. } => {
                "Run with --run_mode local, or check the run environment variables"
            }
            PipelineError::MountError { .. } | PipelineError::ZipError(_) => {
                "Check that the dataset source exists and is readable"
            }
            PipelineError::HttpError(_) => "Check network access to the dataset source",
            PipelineError::IoError(_) => "Check file permissions and available disk space",
            PipelineError::CsvError(_) | PipelineError::ProcessingError { .. } => {
                "Check that the input data is well-formed CSV"
            }
            PipelineError::SerializationError(_) => "Check the JSON content being read or written",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

pub mod data_prep;
pub mod mount;
pub mod resolver;
pub mod stage;
pub mod train;

pub use crate::domain::model::{DatasetHandle, ExecutionMode, RunContext, Table};
pub use crate::domain::ports::{DatasetPlatform, MountSession};
pub use crate::utils::error::Result;

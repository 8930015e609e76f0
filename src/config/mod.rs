#[cfg(feature = "cli")]
pub mod cli;
pub mod registry;
pub mod workspace;

#[cfg(feature = "cli")]
pub use cli::{parse_known_args, DataPrepArgs, RunModeArg, TrainArgs};
pub use registry::{DatasetEntry, DatasetRegistry};
pub use workspace::WorkspaceConfig;

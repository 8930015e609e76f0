pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{parse_known_args, DataPrepArgs, TrainArgs};

pub use adapters::LocalPlatform;
pub use core::{
    data_prep::{DataPrepOptions, DataPrepStage},
    resolver::{DatasetResolver, ResolvedDataset},
    stage::{Stage, StageEngine, StageReport},
    train::{TrainOptions, TrainStage},
};
pub use utils::error::{PipelineError, Result};

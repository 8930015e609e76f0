use crate::core::data_prep::{DataPrepOptions, DEFAULT_OUTPUT_FOLDER as PREP_OUTPUT_FOLDER};
use crate::core::train::{
    TrainOptions, DEFAULT_OUTPUT_FOLDER as TRAIN_OUTPUT_FOLDER, DEFAULT_PARAM1,
    DEFAULT_TRAINING_DATA,
};
use crate::domain::model::ExecutionMode;
use clap::{CommandFactory, Parser, ValueEnum};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunModeArg {
    /// Ask the platform whether a managed run is active
    Auto,
    Local,
    Managed,
}

impl RunModeArg {
    pub fn execution_mode(self) -> Option<ExecutionMode> {
        match self {
            RunModeArg::Auto => None,
            RunModeArg::Local => Some(ExecutionMode::Local),
            RunModeArg::Managed => Some(ExecutionMode::Managed),
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "data_prep")]
#[command(about = "Resolve an input dataset and prepare training data for the next stage")]
pub struct DataPrepArgs {
    /// The input dataset name
    #[arg(long = "input_dataset", alias = "input-dataset", default_value = "")]
    pub input_dataset: String,

    /// The folder name where you want to place outputs
    #[arg(long = "output_folder", alias = "output-folder", default_value = PREP_OUTPUT_FOLDER)]
    pub output_folder: PathBuf,

    /// Workspace config.json; searched upwards from the working directory when omitted
    #[arg(long = "workspace_config", alias = "workspace-config")]
    pub workspace_config: Option<PathBuf>,

    #[arg(long = "run_mode", alias = "run-mode", value_enum, default_value_t = RunModeArg::Auto)]
    pub run_mode: RunModeArg,

    /// Only keep the first N rows of a tabular dataset
    #[arg(long)]
    pub take: Option<usize>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage")]
    pub monitor: bool,
}

impl DataPrepArgs {
    pub fn to_options(&self) -> DataPrepOptions {
        DataPrepOptions {
            input_dataset: self.input_dataset.clone(),
            output_folder: self.output_folder.clone(),
            mode: self.run_mode.execution_mode(),
            take: self.take,
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "train")]
#[command(about = "Training stage: load prepared data and record the run")]
pub struct TrainArgs {
    /// File path for the prepared training data
    #[arg(long = "training_data", alias = "training-data", default_value = DEFAULT_TRAINING_DATA)]
    pub training_data: PathBuf,

    /// A parameter for an ML model
    #[arg(long, default_value_t = DEFAULT_PARAM1)]
    pub param1: f64,

    #[arg(long = "output_folder", alias = "output-folder", default_value = TRAIN_OUTPUT_FOLDER)]
    pub output_folder: PathBuf,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage")]
    pub monitor: bool,
}

impl TrainArgs {
    pub fn to_options(&self) -> TrainOptions {
        TrainOptions {
            training_data: self.training_data.clone(),
            param1: self.param1,
            output_folder: self.output_folder.clone(),
        }
    }
}

/// Parses the flags `P` declares and hands back everything else, the way
/// argparse's `parse_known_args` does. An unknown `--flag` also swallows a
/// following token that does not look like a flag.
pub fn parse_known_args<P, I>(args: I) -> Result<(P, Vec<String>), clap::Error>
where
    P: Parser,
    I: IntoIterator<Item = String>,
{
    let mut command = P::command();
    command.build();

    let mut takes_value: HashMap<String, bool> = HashMap::new();
    for arg in command.get_arguments() {
        let takes = arg.get_action().takes_values();
        if let Some(long) = arg.get_long() {
            takes_value.insert(format!("--{}", long), takes);
        }
        for alias in arg.get_all_aliases().unwrap_or_default() {
            takes_value.insert(format!("--{}", alias), takes);
        }
        if let Some(short) = arg.get_short() {
            takes_value.insert(format!("-{}", short), takes);
        }
    }

    let mut tokens = args.into_iter().peekable();
    let mut known: Vec<String> = tokens.next().into_iter().collect();
    let mut unknown = Vec::new();

    while let Some(token) = tokens.next() {
        if token == "--" {
            unknown.push(token);
            unknown.extend(tokens.by_ref());
            break;
        }

        let (flag, inline_value) = match token.split_once('=') {
            Some((flag, value)) if flag.starts_with('-') => (flag.to_string(), Some(value.to_string())),
            _ => (token.clone(), None),
        };

        match takes_value.get(&flag) {
            Some(true) => match inline_value.or_else(|| tokens.next()) {
                // Joined so clap never mistakes a negative number for a flag.
                Some(value) => known.push(format!("{}={}", flag, value)),
                None => known.push(flag),
            },
            Some(false) => known.push(token),
            None => {
                unknown.push(token);
                if flag.starts_with('-') && inline_value.is_none() {
                    if let Some(value) = tokens.next_if(|next| !next.starts_with('-')) {
                        unknown.push(value);
                    }
                }
            }
        }
    }

    if !unknown.is_empty() {
        tracing::debug!("Ignoring unrecognized arguments: {:?}", unknown);
    }

    let parsed = P::try_parse_from(known)?;
    Ok((parsed, unknown))
}

use pipeline_stages::adapters::local::ENV_RUN_ID;
use pipeline_stages::utils::logger;
use pipeline_stages::{parse_known_args, DataPrepArgs, DataPrepStage, LocalPlatform, StageEngine};

#[tokio::main]
async fn main() {
    let argv = std::env::args_os().map(|a| a.to_string_lossy().into_owned());
    let (args, _) = parse_known_args::<DataPrepArgs, _>(argv).unwrap_or_else(|e| e.exit());

    let managed = std::env::var_os(ENV_RUN_ID).is_some();
    logger::init_stage_logger(args.verbose, managed);

    tracing::info!("Starting data preparation stage");
    tracing::debug!("Arguments: {:?}", args);

    let platform = match LocalPlatform::from_process_env() {
        Ok(platform) => platform.with_workspace_config(args.workspace_config.clone()),
        Err(e) => {
            e.report();
            std::process::exit(e.exit_code());
        }
    };

    let stage = DataPrepStage::new(platform, args.to_options());
    let engine = StageEngine::new_with_monitoring(stage, args.monitor);

    // Dropping the stage future on Ctrl-C releases any mount it holds.
    tokio::select! {
        result = engine.run() => match result {
            Ok(report) => {
                tracing::info!("✅ Data preparation completed");
                println!("✅ Data preparation completed");
                println!("📁 Outputs written to: {}", report.output_folder.display());
            }
            Err(e) => {
                e.report();
                std::process::exit(e.exit_code());
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, mounts released");
            std::process::exit(130);
        }
    }
}

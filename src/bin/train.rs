use pipeline_stages::adapters::local::ENV_RUN_ID;
use pipeline_stages::utils::logger;
use pipeline_stages::{parse_known_args, StageEngine, TrainArgs, TrainStage};

#[tokio::main]
async fn main() {
    let argv = std::env::args_os().map(|a| a.to_string_lossy().into_owned());
    let (args, _) = parse_known_args::<TrainArgs, _>(argv).unwrap_or_else(|e| e.exit());

    let managed = std::env::var_os(ENV_RUN_ID).is_some();
    logger::init_stage_logger(args.verbose, managed);

    tracing::info!("Starting training stage");
    tracing::debug!("Arguments: {:?}", args);

    let engine = StageEngine::new_with_monitoring(TrainStage::new(args.to_options()), args.monitor);

    match engine.run().await {
        Ok(report) => {
            // Model fitting goes here once a model exists for this pipeline.
            tracing::info!("✅ Training stage completed");
            println!("✅ Training stage completed");
            println!("📁 Outputs written to: {}", report.output_folder.display());
        }
        Err(e) => {
            e.report();
            std::process::exit(e.exit_code());
        }
    }
}

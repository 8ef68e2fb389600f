use std::process::ExitCode;

use anyhow::Context;
use tracing_subscriber::{
    EnvFilter, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use archive_stats::{
    Cli, ConfigManager, EXIT_FAILURE, Output, Pipeline, VerbosityLevel, exit_code,
};

fn init_log(verbosity: VerbosityLevel) -> anyhow::Result<()> {
    let level = match verbosity {
        VerbosityLevel::Quiet => LevelFilter::ERROR,
        VerbosityLevel::Normal => LevelFilter::WARN,
        VerbosityLevel::Verbose => LevelFilter::INFO,
        VerbosityLevel::Debug => LevelFilter::DEBUG,
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init()
        .context("error initializing logging")?;

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    if let Err(message) = cli.validate() {
        eprintln!("{}", message);
        return ExitCode::from(EXIT_FAILURE);
    }

    let config = match ConfigManager::load_config(&cli).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    if let Err(e) = init_log(config.verbosity()) {
        eprintln!("{:#}", e);
    }

    let outcome = match Pipeline::new(&cli.path, &config) {
        Ok(pipeline) => pipeline.run().await,
        Err(e) => Err(e),
    };

    match &outcome {
        Ok(summary) => {
            let report = Output::new(config.verbosity()).format_results(summary);
            if !report.is_empty() {
                eprint!("{}", report);
            }
        }
        Err(e) => eprintln!("{}", e),
    }

    ExitCode::from(exit_code(&outcome))
}

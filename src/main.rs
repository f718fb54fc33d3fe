use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use html_angular_validate::{
    Cli, ConfigManager, NuHtmlChecker, Output, ProgressCallback, ValidationEngine,
    ValidationProgress,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(&cli);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// `RUST_LOG` wins over the level implied by `--verbose`/`--quiet`
fn init_logging(cli: &Cli) {
    let default_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

/// Returns whether every file passed
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = ConfigManager::load_config(&cli)
        .await
        .context("Failed to load configuration")?;

    let checker = NuHtmlChecker::new(config.checker_config())
        .context("Failed to create checker client")?;
    let engine = ValidationEngine::from_config(&config, Arc::new(checker))
        .context("Invalid validation rules")?;

    let output = Arc::new(Output::new(config.verbosity()));
    let printer = Arc::clone(&output);
    let progress: ProgressCallback = Arc::new(move |progress: ValidationProgress| {
        if let Some(lines) = printer.format_task(&progress.task) {
            println!("{}", lines);
        }
    });

    let results = engine
        .run_with_progress(&config.files.patterns, Some(progress))
        .await?;

    println!("{}", output.format_summary(&results));
    Ok(results.success())
}

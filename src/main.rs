use clap::Parser;
use hyperspace_sampler::config::toml_config::TomlConfig;
use hyperspace_sampler::core::Pipeline;
use hyperspace_sampler::utils::{logger, validation::Validate};
use hyperspace_sampler::{
    Cli, CliConfig, Command, LocalStorage, RunConfig, SamplerError, SamplingEngine,
    SamplingPipeline,
};

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            // Usage errors are configuration errors.
            let _ = e.print();
            std::process::exit(1);
        }
        Err(e) => e.exit(),
    };

    let Command::Run(args) = cli.command;

    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting hyperspace-sampler");

    let config = match resolve_config(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
    };
    if args.verbose {
        tracing::debug!("Run config: {:?}", config);
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::default();
    let pipeline = SamplingPipeline::new(storage, config);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No sampling will occur");
        match pipeline.extract().await {
            Ok(problem) => {
                println!(
                    "✅ {} constraints over {} dimensions, seed is feasible",
                    problem.constraints.len(),
                    problem.ndims()
                );
                return;
            }
            Err(e) => fail(e),
        }
    }

    let engine = SamplingEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(summary) => {
            tracing::info!("✅ Sampling completed successfully!");
            tracing::info!(
                "📈 Acceptance rate: {:.1}% over {} candidates",
                summary.stats.acceptance_rate() * 100.0,
                summary.stats.attempts
            );
            println!("✅ Wrote {} points", summary.points);
            println!("📁 Output saved to: {}", summary.output_path);
        }
        Err(e) => fail(e),
    }
}

/// Loads the optional settings file and merges it under the command line.
fn resolve_config(args: &CliConfig) -> Result<RunConfig, SamplerError> {
    let file = match &args.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            let file = TomlConfig::from_file(path)?;
            file.validate()?;
            Some(file)
        }
        None => None,
    };

    let config = args.into_run_config(file.as_ref())?;
    config.validate()?;
    Ok(config)
}

fn fail(e: SamplerError) -> ! {
    tracing::error!(
        "❌ Sampling failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    std::process::exit(e.exit_code());
}

use crate::config::toml_config::TomlConfig;
use crate::config::RunConfig;
use crate::domain::model::{OutputFormat, SamplingStrategy};
use crate::utils::error::Result;
use crate::utils::validation::parse_count;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "hyperspace-sampler")]
#[command(about = "Sample feasible points from a region defined by constraints")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sample points and write them to a file
    Run(CliConfig),
}

#[derive(Debug, Clone, Args)]
pub struct CliConfig {
    /// Constraint file: dimension count, seed point, then one constraint per line
    pub input_file: String,

    /// Where the sampled points are written
    pub output_file: String,

    /// Number of points to produce
    #[arg(allow_hyphen_values = true)]
    pub n_results: String,

    /// Random seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Path to a TOML settings file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    #[arg(long, value_enum)]
    pub strategy: Option<SamplingStrategy>,

    /// Number of independent walks run in parallel
    #[arg(long)]
    pub walks: Option<usize>,

    /// Never emit the same point twice
    #[arg(long)]
    pub distinct: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, help = "Report time and memory per phase")]
    pub monitor: bool,

    /// Parse and check the input without sampling
    #[arg(long)]
    pub dry_run: bool,
}

impl CliConfig {
    /// Merges the command line over the settings file. Flags given on the
    /// command line win, then values from the file, then defaults.
    pub fn into_run_config(&self, file: Option<&TomlConfig>) -> Result<RunConfig> {
        let n_results = parse_count("n_results", &self.n_results)?;
        let mut config = RunConfig::new(self.input_file.clone(), self.output_file.clone(), n_results);

        if let Some(file) = file {
            config.sampler = file.sampler_config();
            let output = file.output_config();
            if let Some(format) = output.format {
                config.format = format;
            }
            if let Some(distinct) = output.distinct {
                config.distinct = distinct;
            }
            if let Some(walks) = output.walks {
                config.walks = walks;
            }
            config.monitor = file.monitoring_enabled();
        }

        if let Some(seed) = self.seed {
            config.sampler = config.sampler.with_seed(seed);
        }
        if let Some(strategy) = self.strategy {
            config.sampler = config.sampler.with_strategy(strategy);
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(walks) = self.walks {
            config.walks = walks;
        }
        config.distinct |= self.distinct;
        config.monitor |= self.monitor;

        Ok(config)
    }
}

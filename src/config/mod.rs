#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::sampler::SamplerConfig;
use crate::domain::ports::ConfigProvider;
use crate::domain::model::OutputFormat;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_path, validate_positive_number, validate_positive_real, validate_range, Validate,
};
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
pub use cli::{Cli, CliConfig, Command};
pub use toml_config::TomlConfig;

/// Settings for one run after the command line and the optional TOML file
/// have been merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub input_file: String,
    pub output_file: String,
    pub n_results: usize,
    pub format: OutputFormat,
    pub sampler: SamplerConfig,
    pub walks: usize,
    pub distinct: bool,
    pub monitor: bool,
}

impl RunConfig {
    pub fn new(input_file: impl Into<String>, output_file: impl Into<String>, n_results: usize) -> Self {
        Self {
            input_file: input_file.into(),
            output_file: output_file.into(),
            n_results,
            format: OutputFormat::default(),
            sampler: SamplerConfig::default(),
            walks: 1,
            distinct: false,
            monitor: false,
        }
    }
}

impl ConfigProvider for RunConfig {
    fn input_file(&self) -> &str {
        &self.input_file
    }

    fn output_file(&self) -> &str {
        &self.output_file
    }

    fn n_results(&self) -> usize {
        self.n_results
    }

    fn output_format(&self) -> OutputFormat {
        self.format
    }

    fn sampler_config(&self) -> SamplerConfig {
        self.sampler.clone()
    }

    fn walks(&self) -> usize {
        self.walks
    }

    fn distinct(&self) -> bool {
        self.distinct
    }
}

impl Validate for RunConfig {
    fn validate(&self) -> Result<()> {
        validate_path("input_file", &self.input_file)?;
        validate_path("output_file", &self.output_file)?;
        validate_positive_number("walks", self.walks, 1)?;
        self.sampler.validate()
    }
}

impl Validate for SamplerConfig {
    fn validate(&self) -> Result<()> {
        validate_range("sampler.initial_step", self.initial_step, f64::MIN_POSITIVE, 1.0)?;
        validate_positive_number("sampler.window", self.window, 1)?;
        validate_range("sampler.min_accept_rate", self.min_accept_rate, 0.0, 1.0)?;
        validate_range(
            "sampler.max_accept_rate",
            self.max_accept_rate,
            self.min_accept_rate,
            1.0,
        )?;
        validate_range("sampler.step_factor", self.step_factor, f64::MIN_POSITIVE, 0.999)?;
        validate_positive_number("sampler.max_rejections", self.max_rejections, 1)?;
        validate_positive_real("sampler.collapse_threshold", self.collapse_threshold)?;
        validate_range("sampler.max_growth", self.max_growth, 1.0, 1e12)?;
        validate_positive_number("sampler.thin", self.thin, 1)?;
        Ok(())
    }
}

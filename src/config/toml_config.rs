use crate::core::sampler::SamplerConfig;
use crate::domain::model::OutputFormat;
use crate::utils::error::{Result, SamplerError};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Optional run settings file passed with `--config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub sampler: Option<SamplerConfig>,
    pub output: Option<OutputConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    pub format: Option<OutputFormat>,
    pub distinct: Option<bool>,
    pub walks: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl TomlConfig {
    /// Loads settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| SamplerError::ConfigError {
            message: format!(
                "cannot read config file '{}': {}",
                path.as_ref().display(),
                e
            ),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses settings from TOML text after environment substitution.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| SamplerError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the value of `VAR`; unset variables are left as written.
    fn substitute_env_vars(content: &str) -> String {
        let re = Regex::new(r"\$\{([^}]+)\}").expect("env pattern is valid");

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        self.sampler.clone().unwrap_or_default()
    }

    pub fn output_config(&self) -> OutputConfig {
        self.output.clone().unwrap_or_default()
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        if let Some(sampler) = &self.sampler {
            sampler.validate()?;
        }
        if let Some(walks) = self.output.as_ref().and_then(|o| o.walks) {
            crate::utils::validation::validate_positive_number("output.walks", walks, 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::SamplingStrategy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[sampler]
initial_step = 0.05
window = 50
seed = 42
strategy = "box"
thin = 2

[output]
format = "csv"
distinct = true
walks = 3

[monitoring]
enabled = true
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        let sampler = config.sampler_config();
        assert_eq!(sampler.initial_step, 0.05);
        assert_eq!(sampler.window, 50);
        assert_eq!(sampler.seed, Some(42));
        assert_eq!(sampler.strategy, SamplingStrategy::Box);
        assert_eq!(sampler.thin, 2);
        // Unset keys keep their defaults.
        assert_eq!(sampler.step_factor, 0.5);
        assert_eq!(sampler.max_rejections, 7000);

        let output = config.output_config();
        assert_eq!(output.format, Some(OutputFormat::Csv));
        assert_eq!(output.distinct, Some(true));
        assert_eq!(output.walks, Some(3));
        assert!(config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.sampler_config(), SamplerConfig::default());
        assert!(!config.monitoring_enabled());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("HYPERSPACE_TEST_SEED", "1234");

        let config = TomlConfig::from_toml_str("[sampler]\nseed = ${HYPERSPACE_TEST_SEED}\n").unwrap();
        assert_eq!(config.sampler_config().seed, Some(1234));

        std::env::remove_var("HYPERSPACE_TEST_SEED");
    }

    #[test]
    fn test_unset_env_var_is_left_as_written() {
        let text = "seed = ${HYPERSPACE_NEVER_SET_VAR}";
        assert_eq!(TomlConfig::substitute_env_vars(text), text);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = TomlConfig::from_toml_str("[sampler]\nstep = 0.1\n").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_config_validation() {
        let config = TomlConfig::from_toml_str("[sampler]\nstep_factor = 1.5\n").unwrap();
        assert!(config.validate().is_err());

        let config = TomlConfig::from_toml_str("[output]\nwalks = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[output]\nformat = \"json\"\n").unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.output_config().format, Some(OutputFormat::Json));

        assert!(TomlConfig::from_file("/definitely/not/here.toml").is_err());
    }
}

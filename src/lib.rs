pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::LocalStorage;
#[cfg(feature = "cli")]
pub use config::{Cli, CliConfig, Command};
pub use config::{RunConfig, TomlConfig};

pub use core::{
    collector::ResultCollector,
    engine::{RunSummary, SamplingEngine},
    pipeline::SamplingPipeline,
    problem::Problem,
    sampler::{AdaptiveWalk, BoxSampler, SamplerConfig},
};
pub use utils::error::{Result, SamplerError};

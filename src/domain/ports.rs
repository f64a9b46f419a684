use crate::domain::model::{OutputFormat, Point, ResultSet, SamplerConfig, SamplingStats, Stall};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_file(&self) -> &str;
    fn output_file(&self) -> &str;
    fn n_results(&self) -> usize;
    fn output_format(&self) -> OutputFormat;
    fn sampler_config(&self) -> SamplerConfig;
    fn walks(&self) -> usize;
    fn distinct(&self) -> bool;
}

/// A lazy source of feasible points.
pub trait Sampler {
    /// Draws until a feasible point can be emitted, or reports why it cannot.
    fn next_point(&mut self) -> std::result::Result<Point, Stall>;

    fn stats(&self) -> SamplingStats;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    /// Whatever `extract` loads and `transform` samples from.
    type Problem: Send;

    async fn extract(&self) -> Result<Self::Problem>;
    async fn transform(&self, problem: Self::Problem) -> Result<ResultSet>;
    async fn load(&self, results: ResultSet) -> Result<String>;
}

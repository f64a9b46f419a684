use crate::core::collector::ResultCollector;
use crate::core::output;
use crate::core::problem::Problem;
use crate::core::sampler::build_sampler;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::ResultSet;
use crate::utils::error::{Result, SamplerError};

/// Reads the constraint file, samples it and writes the points.
pub struct SamplingPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> SamplingPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    fn collector(&self) -> ResultCollector {
        let collector = ResultCollector::new();
        if self.config.distinct() {
            collector.with_distinct(self.config.sampler_config().max_rejections)
        } else {
            collector
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for SamplingPipeline<S, C> {
    type Problem = Problem;

    async fn extract(&self) -> Result<Problem> {
        let path = self.config.input_file();
        tracing::debug!("Reading constraint file: {}", path);

        // An unreadable input is a bad argument, not a failed run.
        let raw = self
            .storage
            .read_file(path)
            .await
            .map_err(|e| SamplerError::ConfigError {
                message: format!("cannot read input file '{}': {}", path, e),
            })?;
        let content = String::from_utf8(raw).map_err(|_| SamplerError::InputFormatError {
            line: 1,
            message: format!("'{}' is not valid UTF-8 text", path),
        })?;

        let problem = Problem::parse(&content)?;
        tracing::info!(
            "Loaded {} constraints over {} dimensions",
            problem.constraints.len(),
            problem.ndims()
        );
        Ok(problem)
    }

    async fn transform(&self, problem: Problem) -> Result<ResultSet> {
        let n_results = self.config.n_results();
        let sampler_config = self.config.sampler_config();
        let walks = self.config.walks();
        let collector = self.collector();

        tracing::debug!(
            "Sampling {} points with {:?} strategy ({} walk(s))",
            n_results,
            sampler_config.strategy,
            walks
        );

        if walks > 1 {
            return collector
                .collect_parallel(&problem, &sampler_config, n_results, walks)
                .await;
        }

        tokio::task::spawn_blocking(move || -> Result<ResultSet> {
            let mut sampler = build_sampler(&problem, &sampler_config)?;
            collector.collect(sampler.as_mut(), problem.ndims(), n_results)
        })
        .await
        .map_err(|e| SamplerError::TaskError {
            message: e.to_string(),
        })?
    }

    async fn load(&self, results: ResultSet) -> Result<String> {
        let format = self.config.output_format();
        let data = output::render(&results, format)?;
        let path = self.config.output_file();

        self.storage.write_file(path, &data).await?;
        tracing::debug!("Wrote {} bytes as {}", data.len(), format);
        Ok(path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::domain::model::OutputFormat;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn with_file(path: &str, content: &str) -> Self {
            let mut files = HashMap::new();
            files.insert(path.to_string(), content.as_bytes().to_vec());
            Self {
                files: Arc::new(Mutex::new(files)),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                SamplerError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    const TRIANGLE: &str = "2\n0.1 0.1\nx[0] + x[1] <= 1\nx[0] >= 0\nx[1] >= 0\n";

    fn config(n_results: usize) -> RunConfig {
        let mut config = RunConfig::new("input.txt", "output.txt", n_results);
        config.sampler = config.sampler.with_seed(7);
        config
    }

    #[tokio::test]
    async fn test_full_pipeline() {
        let storage = MockStorage::with_file("input.txt", TRIANGLE);
        let pipeline = SamplingPipeline::new(storage.clone(), config(10));

        let problem = pipeline.extract().await.unwrap();
        assert_eq!(problem.ndims(), 2);

        let results = pipeline.transform(problem).await.unwrap();
        assert_eq!(results.len(), 10);

        let path = pipeline.load(results).await.unwrap();
        assert_eq!(path, "output.txt");

        let written = storage.get_file("output.txt").await.unwrap();
        let text = String::from_utf8(written).unwrap();
        assert_eq!(text.lines().count(), 10);
        for line in text.lines() {
            let coords: Vec<f64> = line.split(' ').map(|c| c.parse().unwrap()).collect();
            assert_eq!(coords.len(), 2);
            assert!(coords[0] + coords[1] <= 1.0);
            assert!(coords[0] >= 0.0 && coords[1] >= 0.0);
        }
    }

    #[tokio::test]
    async fn test_missing_input_is_configuration_error() {
        let storage = MockStorage::with_file("other.txt", TRIANGLE);
        let pipeline = SamplingPipeline::new(storage, config(1));

        let err = pipeline.extract().await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_single_walk_stall_surfaces_from_blocking_task() {
        let storage = MockStorage::with_file("input.txt", "1\n2.0\nx[0] >= 2\nx[0] <= 2\n");
        let pipeline = SamplingPipeline::new(storage.clone(), config(3));

        let problem = pipeline.extract().await.unwrap();
        let err = pipeline.transform(problem).await.unwrap_err();
        assert!(matches!(
            err,
            SamplerError::ProgressError {
                found: 0,
                requested: 3,
                ..
            }
        ));
        assert!(storage.get_file("output.txt").await.is_none());
    }

    #[tokio::test]
    async fn test_parallel_walks_fill_the_quota() {
        let storage = MockStorage::with_file("input.txt", TRIANGLE);
        let mut run = config(9);
        run.walks = 3;
        run.format = OutputFormat::Csv;
        let pipeline = SamplingPipeline::new(storage.clone(), run);

        let problem = pipeline.extract().await.unwrap();
        let results = pipeline.transform(problem).await.unwrap();
        assert_eq!(results.len(), 9);

        pipeline.load(results).await.unwrap();
        let written = storage.get_file("output.txt").await.unwrap();
        let points = output::read_points(&written, OutputFormat::Csv).unwrap();
        assert_eq!(points.len(), 9);
    }
}

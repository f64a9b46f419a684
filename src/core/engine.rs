use crate::core::Pipeline;
use crate::domain::model::SamplingStats;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output_path: String,
    pub points: usize,
    pub stats: SamplingStats,
}

pub struct SamplingEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> SamplingEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn monitor(&self) -> &SystemMonitor {
        &self.monitor
    }

    pub async fn run(&self) -> Result<RunSummary> {
        tracing::info!("Starting sampling run");

        let problem = self.pipeline.extract().await?;
        self.monitor.end_phase("load");

        let results = self.pipeline.transform(problem).await?;
        self.monitor.end_phase("sample");
        tracing::info!(
            "Sampled {} points ({} candidates, {} accepted)",
            results.len(),
            results.stats.attempts,
            results.stats.accepted
        );

        let points = results.len();
        let stats = results.stats.clone();
        let output_path = self.pipeline.load(results).await?;
        self.monitor.end_phase("write");
        self.monitor.log_final_stats();

        Ok(RunSummary {
            output_path,
            points,
            stats,
        })
    }
}

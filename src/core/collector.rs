use crate::core::problem::Problem;
use crate::core::sampler::{build_sampler, SamplerConfig, Stall, StallReason};
use crate::domain::model::{Point, ResultSet, SamplingStats};
use crate::domain::ports::Sampler;
use crate::utils::error::{Result, SamplerError};
use std::collections::HashSet;
use tokio::task::JoinSet;

/// Pulls points from a sampler until the requested count is reached.
#[derive(Debug, Clone)]
pub struct ResultCollector {
    distinct: bool,
    max_duplicates: usize,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self {
            distinct: false,
            max_duplicates: SamplerConfig::default().max_rejections,
        }
    }

    /// Skip points already collected. `max_duplicates` in a row count as a stall.
    pub fn with_distinct(mut self, max_duplicates: usize) -> Self {
        self.distinct = true;
        self.max_duplicates = max_duplicates.max(1);
        self
    }

    pub fn collect<S: Sampler + ?Sized>(
        &self,
        sampler: &mut S,
        ndims: usize,
        n_results: usize,
    ) -> Result<ResultSet> {
        let mut points = Vec::with_capacity(n_results);
        let mut seen = HashSet::new();
        self.fill(sampler, &mut points, &mut seen, n_results)?;

        let stats = sampler.stats();
        tracing::info!(
            "Collected {} points from {} candidates (acceptance {:.1}%)",
            points.len(),
            stats.attempts,
            stats.acceptance_rate() * 100.0
        );

        Ok(ResultSet {
            ndims,
            points,
            stats,
        })
    }

    /// Draws into `points` until it holds `n_results`. With `distinct` set,
    /// `seen` holds the keys of every point already in `points`.
    fn fill<S: Sampler + ?Sized>(
        &self,
        sampler: &mut S,
        points: &mut Vec<Point>,
        seen: &mut HashSet<Vec<u64>>,
        n_results: usize,
    ) -> Result<()> {
        let mut duplicate_streak = 0;

        while points.len() < n_results {
            let point = sampler
                .next_point()
                .map_err(|stall| stall.into_error(points.len(), n_results))?;

            if self.distinct && !seen.insert(point_key(&point)) {
                duplicate_streak += 1;
                if duplicate_streak >= self.max_duplicates {
                    let stats = sampler.stats();
                    let stall = Stall {
                        reason: StallReason::TooManyDuplicates {
                            limit: self.max_duplicates,
                        },
                        anchor: point,
                        step_scale: stats.step_scale,
                    };
                    return Err(stall.into_error(points.len(), n_results));
                }
                continue;
            }

            duplicate_streak = 0;
            points.push(point);
        }
        Ok(())
    }

    /// Runs `walks` independent samplers on the blocking pool and concatenates
    /// their points in walk order.
    pub async fn collect_parallel(
        &self,
        problem: &Problem,
        config: &SamplerConfig,
        n_results: usize,
        walks: usize,
    ) -> Result<ResultSet> {
        let walks = walks.clamp(1, n_results.max(1));
        let ndims = problem.ndims();
        let mut tasks = JoinSet::new();

        for (index, quota) in split_quota(n_results, walks).into_iter().enumerate() {
            let problem = problem.clone();
            let config = config.for_walk(index);
            let collector = self.clone();
            tasks.spawn_blocking(move || {
                let result = build_sampler(&problem, &config)
                    .and_then(|mut sampler| collector.collect(sampler.as_mut(), ndims, quota));
                (index, result)
            });
        }

        let mut parts: Vec<Option<ResultSet>> = vec![None; walks];
        let mut failure: Option<SamplerError> = None;
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined.map_err(|e| SamplerError::TaskError {
                message: e.to_string(),
            })?;
            match result {
                Ok(part) => parts[index] = Some(part),
                Err(e) => {
                    tracing::warn!("Walk {} failed: {}", index, e);
                    failure.get_or_insert(e);
                }
            }
        }

        if let Some(err) = failure {
            let found = parts.iter().flatten().map(ResultSet::len).sum::<usize>();
            return Err(match err {
                SamplerError::ProgressError {
                    found: walk_found,
                    reason,
                    anchor,
                    step_scale,
                    ..
                } => SamplerError::ProgressError {
                    found: found + walk_found,
                    requested: n_results,
                    reason,
                    anchor,
                    step_scale,
                },
                other => other,
            });
        }

        let mut merged = ResultSet {
            ndims,
            points: Vec::with_capacity(n_results),
            stats: SamplingStats::default(),
        };
        let mut seen = HashSet::new();
        for part in parts.into_iter().flatten() {
            merged.stats.merge(&part.stats);
            if self.distinct {
                let fresh = part.points.into_iter().filter(|p| seen.insert(point_key(p)));
                merged.points.extend(fresh);
            } else {
                merged.points.extend(part.points);
            }
        }

        if merged.points.len() < n_results {
            tracing::debug!(
                "{} points repeated across walks, topping up with one more walk",
                n_results - merged.points.len()
            );
            let (points, stats) = self
                .top_up(problem, config.for_walk(walks), merged.points, seen, n_results)
                .await?;
            merged.points = points;
            merged.stats.merge(&stats);
        }
        Ok(merged)
    }

    /// Runs one extra walk until `points` holds `n_results` distinct points.
    async fn top_up(
        &self,
        problem: &Problem,
        config: SamplerConfig,
        mut points: Vec<Point>,
        mut seen: HashSet<Vec<u64>>,
        n_results: usize,
    ) -> Result<(Vec<Point>, SamplingStats)> {
        let problem = problem.clone();
        let collector = self.clone();
        tokio::task::spawn_blocking(move || -> Result<(Vec<Point>, SamplingStats)> {
            let mut sampler = build_sampler(&problem, &config)?;
            collector.fill(sampler.as_mut(), &mut points, &mut seen, n_results)?;
            Ok((points, sampler.stats()))
        })
        .await
        .map_err(|e| SamplerError::TaskError {
            message: e.to_string(),
        })?
    }
}

impl Default for ResultCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn point_key(point: &Point) -> Vec<u64> {
    point.iter().map(|c| c.to_bits()).collect()
}

/// Splits `total` into `parts` quotas that differ by at most one.
fn split_quota(total: usize, parts: usize) -> Vec<usize> {
    let base = total / parts;
    let extra = total % parts;
    (0..parts).map(|i| base + usize::from(i < extra)).collect()
}

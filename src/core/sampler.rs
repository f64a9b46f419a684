//! # Feasible-point samplers
//!
//! [`AdaptiveWalk`] is the default strategy: a random walk anchored at the last
//! accepted point whose per-dimension step scale follows the acceptance rate
//! over a sliding window. A low rate shrinks the steps and a high rate grows
//! them, up to each dimension's span.
//!
//! [`BoxSampler`] draws uniformly from the bounding box declared by the
//! constraints and keeps what lands inside the region.
//!
//! Neither sampler loops forever: both report a [`Stall`] once they stop making
//! progress.

use crate::core::constraints::ConstraintSet;
use crate::core::problem::Problem;
use crate::domain::model::{Point, SamplingStats, SamplingStrategy};
use crate::domain::ports::Sampler;
use crate::utils::error::{Result, SamplerError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::Arc;

pub use crate::domain::model::{SamplerConfig, Stall, StallReason};

/// Largest step scale a walk may use. Keeps `anchor ± step` and the width of
/// the proposal range finite.
const MAX_STEP: f64 = f64::MAX / 4.0;

/// Owned RNG for one sampler: seeded when the config pins a seed.
fn seeded_rng(config: &SamplerConfig) -> StdRng {
    match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Lazy view of a sampler: yields points until the first stall, then ends.
pub struct Draws<'a, S: ?Sized> {
    sampler: &'a mut S,
    finished: bool,
}

impl<'a, S: Sampler + ?Sized> Draws<'a, S> {
    pub fn new(sampler: &'a mut S) -> Self {
        Self {
            sampler,
            finished: false,
        }
    }
}

impl<S: Sampler + ?Sized> Iterator for Draws<'_, S> {
    type Item = std::result::Result<Point, Stall>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.sampler.next_point() {
            Ok(point) => Some(Ok(point)),
            Err(stall) => {
                self.finished = true;
                Some(Err(stall))
            }
        }
    }
}

/// Adaptive-step random walk anchored at the last accepted point.
pub struct AdaptiveWalk {
    constraints: Arc<ConstraintSet>,
    config: SamplerConfig,
    rng: StdRng,
    anchor: Point,
    scale: Vec<f64>,
    max_scale: Vec<f64>,
    window: VecDeque<bool>,
    consecutive_rejections: usize,
    burn_in_remaining: usize,
    accepted_since_emit: usize,
    attempts: u64,
    accepted: u64,
    emitted: u64,
}

impl AdaptiveWalk {
    pub fn new(constraints: Arc<ConstraintSet>, seed: Point, config: SamplerConfig) -> Self {
        let magnitude = seed.magnitude();
        let base = if magnitude > 0.0 { magnitude } else { 1.0 };

        let (scale, max_scale): (Vec<f64>, Vec<f64>) = constraints
            .bounds()
            .iter()
            .map(|interval| match interval.span() {
                Some(span) => {
                    let span = span.min(MAX_STEP);
                    (config.initial_step * span, span)
                }
                None => {
                    let initial = (config.initial_step * base).min(MAX_STEP);
                    (initial, (initial * config.max_growth).min(MAX_STEP))
                }
            })
            .unzip();

        tracing::debug!("Random walk starts at {:?} with step {:?}", seed.as_slice(), scale);

        Self {
            rng: seeded_rng(&config),
            burn_in_remaining: config.burn_in,
            window: VecDeque::with_capacity(config.window),
            constraints,
            config,
            anchor: seed,
            scale,
            max_scale,
            consecutive_rejections: 0,
            accepted_since_emit: 0,
            attempts: 0,
            accepted: 0,
            emitted: 0,
        }
    }

    pub fn anchor(&self) -> &Point {
        &self.anchor
    }

    pub fn step_scale(&self) -> &[f64] {
        &self.scale
    }

    fn propose(&mut self) -> Vec<f64> {
        let bounds = self.constraints.bounds();
        let mut candidate = Vec::with_capacity(self.anchor.ndims());
        for (i, interval) in bounds.iter().enumerate() {
            let step = self.scale[i];
            let moved = if step > 0.0 {
                self.anchor[i] + self.rng.gen_range(-step..=step)
            } else {
                self.anchor[i]
            };
            candidate.push(interval.reflect(moved));
        }
        candidate
    }

    fn record(&mut self, accepted: bool) {
        self.window.push_back(accepted);
        if self.window.len() < self.config.window {
            return;
        }

        let hits = self.window.iter().filter(|&&hit| hit).count();
        let rate = hits as f64 / self.window.len() as f64;
        if rate < self.config.min_accept_rate {
            self.rescale(self.config.step_factor);
            self.window.clear();
        } else if rate > self.config.max_accept_rate {
            self.rescale(1.0 / self.config.step_factor);
            self.window.clear();
        } else {
            self.window.pop_front();
        }
    }

    fn rescale(&mut self, multiplier: f64) {
        for (scale, cap) in self.scale.iter_mut().zip(&self.max_scale) {
            *scale = (*scale * multiplier).min(*cap);
        }
        tracing::debug!(
            "Step scale x{} after {} draws, now {:?}",
            multiplier,
            self.attempts,
            self.scale
        );
    }

    fn is_collapsed(&self) -> bool {
        self.scale
            .iter()
            .zip(self.anchor.iter())
            .all(|(scale, x)| *scale < self.config.collapse_threshold * x.abs().max(1.0))
    }

    fn stall(&self, reason: StallReason) -> Stall {
        tracing::warn!(
            "Random walk stalled after {} draws: {}",
            self.attempts,
            reason
        );
        Stall {
            reason,
            anchor: self.anchor.clone(),
            step_scale: self.scale.clone(),
        }
    }
}

impl Sampler for AdaptiveWalk {
    fn next_point(&mut self) -> std::result::Result<Point, Stall> {
        loop {
            if self.is_collapsed() {
                return Err(self.stall(StallReason::StepCollapsed));
            }
            if self.consecutive_rejections >= self.config.max_rejections {
                return Err(self.stall(StallReason::TooManyRejections {
                    limit: self.config.max_rejections,
                }));
            }

            let candidate = self.propose();
            self.attempts += 1;
            let accepted = candidate.iter().all(|c| c.is_finite())
                && self.constraints.feasible_coords(&candidate);
            self.record(accepted);

            if !accepted {
                self.consecutive_rejections += 1;
                continue;
            }

            self.consecutive_rejections = 0;
            self.accepted += 1;
            self.anchor = Point::new(candidate);

            if self.burn_in_remaining > 0 {
                self.burn_in_remaining -= 1;
                continue;
            }
            self.accepted_since_emit += 1;
            if self.accepted_since_emit < self.config.thin {
                continue;
            }

            self.accepted_since_emit = 0;
            self.emitted += 1;
            return Ok(self.anchor.clone());
        }
    }

    fn stats(&self) -> SamplingStats {
        SamplingStats {
            attempts: self.attempts,
            accepted: self.accepted,
            emitted: self.emitted,
            step_scale: self.scale.clone(),
        }
    }
}

/// Rejection sampling over the declared bounding box.
pub struct BoxSampler {
    constraints: Arc<ConstraintSet>,
    rng: StdRng,
    max_rejections: usize,
    last: Point,
    attempts: u64,
    accepted: u64,
}

impl BoxSampler {
    pub fn new(constraints: Arc<ConstraintSet>, seed: Point, config: &SamplerConfig) -> Result<Self> {
        if let Some(dim) = constraints.bounds().iter().position(|b| !b.is_bounded()) {
            return Err(SamplerError::ConfigValidationError {
                field: "strategy".to_string(),
                message: format!(
                    "box sampling needs lower and upper bounds on every dimension, x[{}] has none",
                    dim
                ),
            });
        }

        Ok(Self {
            rng: seeded_rng(config),
            max_rejections: config.max_rejections,
            constraints,
            last: seed,
            attempts: 0,
            accepted: 0,
        })
    }

    fn spans(&self) -> Vec<f64> {
        self.constraints
            .bounds()
            .iter()
            .map(|b| b.span().unwrap_or(0.0))
            .collect()
    }
}

impl Sampler for BoxSampler {
    fn next_point(&mut self) -> std::result::Result<Point, Stall> {
        for _ in 0..self.max_rejections {
            let candidate: Vec<f64> = self
                .constraints
                .bounds()
                .iter()
                .map(|b| {
                    let (lo, hi) = (b.lower.unwrap_or(0.0), b.upper.unwrap_or(0.0));
                    if hi <= lo {
                        lo
                    } else if (hi - lo).is_finite() {
                        self.rng.gen_range(lo..=hi)
                    } else {
                        // The width overflows; interpolate between the ends instead.
                        let t: f64 = self.rng.gen();
                        lo * (1.0 - t) + hi * t
                    }
                })
                .collect();
            self.attempts += 1;

            if self.constraints.feasible_coords(&candidate) {
                self.accepted += 1;
                self.last = Point::new(candidate);
                return Ok(self.last.clone());
            }
        }

        tracing::warn!("Box sampler gave up after {} draws", self.attempts);
        Err(Stall {
            reason: StallReason::TooManyRejections {
                limit: self.max_rejections,
            },
            anchor: self.last.clone(),
            step_scale: self.spans(),
        })
    }

    fn stats(&self) -> SamplingStats {
        SamplingStats {
            attempts: self.attempts,
            accepted: self.accepted,
            emitted: self.accepted,
            step_scale: self.spans(),
        }
    }
}

/// Builds the sampler selected by `config.strategy`.
pub fn build_sampler(problem: &Problem, config: &SamplerConfig) -> Result<Box<dyn Sampler + Send>> {
    let constraints = Arc::clone(&problem.constraints);
    let seed = problem.seed.clone();
    match config.strategy {
        SamplingStrategy::Walk => Ok(Box::new(AdaptiveWalk::new(constraints, seed, config.clone()))),
        SamplingStrategy::Box => Ok(Box::new(BoxSampler::new(constraints, seed, config)?)),
    }
}

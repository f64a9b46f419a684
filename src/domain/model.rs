use crate::utils::error::SamplerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

/// One location in the sampled space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Point {
    coords: Vec<f64>,
}

impl Point {
    pub fn new(coords: Vec<f64>) -> Self {
        Self { coords }
    }

    pub fn ndims(&self) -> usize {
        self.coords.len()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.coords
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.coords.iter()
    }

    /// Euclidean norm, scaled by the largest coordinate so that large
    /// coordinates do not overflow when squared.
    pub fn magnitude(&self) -> f64 {
        let largest = self.coords.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
        if largest == 0.0 || !largest.is_finite() {
            return largest;
        }
        let sum: f64 = self.coords.iter().map(|c| (c / largest).powi(2)).sum();
        largest * sum.sqrt()
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.coords
    }
}

impl From<Vec<f64>> for Point {
    fn from(coords: Vec<f64>) -> Self {
        Self::new(coords)
    }
}

impl Index<usize> for Point {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.coords[index]
    }
}

/// Per-dimension bounds derived from constraints like `x[0] >= 0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Interval {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl Interval {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn tighten_lower(&mut self, value: f64) {
        self.lower = Some(self.lower.map_or(value, |l| l.max(value)));
    }

    pub fn tighten_upper(&mut self, value: f64) {
        self.upper = Some(self.upper.map_or(value, |u| u.min(value)));
    }

    /// Width of the interval when both ends are declared.
    pub fn span(&self) -> Option<f64> {
        match (self.lower, self.upper) {
            (Some(l), Some(u)) => Some((u - l).max(0.0)),
            _ => None,
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.span().is_some()
    }

    /// Mirrors `value` back inside the interval. Open ends are left alone.
    pub fn reflect(&self, value: f64) -> f64 {
        match (self.lower, self.upper) {
            (Some(lo), Some(hi)) => {
                let width = hi - lo;
                if width <= 0.0 {
                    return lo;
                }
                if !width.is_finite() {
                    return value.clamp(lo, hi);
                }
                let period = 2.0 * width;
                let mut offset = (value - lo).rem_euclid(period);
                if offset > width {
                    offset = period - offset;
                }
                (lo + offset).clamp(lo, hi)
            }
            (Some(lo), None) if value < lo => 2.0 * lo - value,
            (None, Some(hi)) if value > hi => 2.0 * hi - value,
            _ => value,
        }
    }
}

/// Counters exposed by every sampler.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SamplingStats {
    pub attempts: u64,
    pub accepted: u64,
    pub emitted: u64,
    pub step_scale: Vec<f64>,
}

impl SamplingStats {
    pub fn acceptance_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.accepted as f64 / self.attempts as f64
        }
    }

    /// Sums the counters of independent walks.
    pub fn merge(&mut self, other: &SamplingStats) {
        self.attempts += other.attempts;
        self.accepted += other.accepted;
        self.emitted += other.emitted;
        if self.step_scale.is_empty() {
            self.step_scale = other.step_scale.clone();
        }
    }
}

/// Accepted points in emission order.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub ndims: usize,
    pub points: Vec<Point>,
    pub stats: SamplingStats,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Txt,
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(OutputFormat::Txt),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Txt => "txt",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum SamplingStrategy {
    /// Adaptive-step random walk from the seed.
    #[default]
    Walk,
    /// Rejection sampling over the declared bounding box.
    Box,
}

impl FromStr for SamplingStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "walk" => Ok(SamplingStrategy::Walk),
            "box" => Ok(SamplingStrategy::Box),
            other => Err(format!("unknown sampling strategy '{}'", other)),
        }
    }
}

/// Tuning knobs shared by both samplers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplerConfig {
    /// Initial step as a fraction of each dimension's span (or of the seed's
    /// magnitude for dimensions without bounds)
    pub initial_step: f64,
    /// Number of recent draws used to measure the acceptance rate
    pub window: usize,
    /// Below this acceptance rate the step shrinks
    pub min_accept_rate: f64,
    /// Above this acceptance rate the step grows
    pub max_accept_rate: f64,
    /// Multiplier applied when shrinking (its inverse when growing), in (0, 1)
    pub step_factor: f64,
    /// Consecutive rejections tolerated before giving up
    pub max_rejections: usize,
    /// Relative step size under which the walk counts as collapsed
    pub collapse_threshold: f64,
    /// Largest multiple of the initial step for dimensions without bounds
    pub max_growth: f64,
    /// Accepted points discarded before the first emission
    pub burn_in: usize,
    /// Emit every `thin`-th accepted point
    pub thin: usize,
    /// Random seed for reproducibility (None = entropy)
    pub seed: Option<u64>,
    pub strategy: SamplingStrategy,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            initial_step: 0.01,
            window: 100,
            min_accept_rate: 0.2,
            max_accept_rate: 0.8,
            step_factor: 0.5,
            max_rejections: 7000,
            collapse_threshold: 1e-12,
            max_growth: 1e6,
            burn_in: 0,
            thin: 1,
            seed: None,
            strategy: SamplingStrategy::Walk,
        }
    }
}

impl SamplerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_initial_step(mut self, step: f64) -> Self {
        self.initial_step = step;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    pub fn with_accept_rates(mut self, min: f64, max: f64) -> Self {
        self.min_accept_rate = min;
        self.max_accept_rate = max;
        self
    }

    pub fn with_max_rejections(mut self, limit: usize) -> Self {
        self.max_rejections = limit.max(1);
        self
    }

    pub fn with_burn_in(mut self, burn_in: usize) -> Self {
        self.burn_in = burn_in;
        self
    }

    pub fn with_thin(mut self, thin: usize) -> Self {
        self.thin = thin.max(1);
        self
    }

    pub fn with_strategy(mut self, strategy: SamplingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Configuration for the `index`-th of several independent walks.
    pub fn for_walk(&self, index: usize) -> Self {
        let mut config = self.clone();
        config.seed = self.seed.map(|s| s.wrapping_add(index as u64));
        config
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StallReason {
    /// Every step scale fell under the collapse threshold.
    StepCollapsed,
    /// Too many candidates in a row were rejected.
    TooManyRejections { limit: usize },
    /// Too many emitted points in a row were already collected.
    TooManyDuplicates { limit: usize },
}

impl fmt::Display for StallReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StallReason::StepCollapsed => write!(f, "step scale collapsed"),
            StallReason::TooManyRejections { limit } => {
                write!(f, "{} consecutive candidates rejected", limit)
            }
            StallReason::TooManyDuplicates { limit } => {
                write!(f, "{} consecutive duplicate points", limit)
            }
        }
    }
}

/// Why a sampler stopped, and where it was at the time.
#[derive(Debug, Clone, PartialEq)]
pub struct Stall {
    pub reason: StallReason,
    pub anchor: Point,
    pub step_scale: Vec<f64>,
}

impl Stall {
    /// Turns the stall into the run-level error once the collector knows how
    /// many points it already has.
    pub fn into_error(self, found: usize, requested: usize) -> SamplerError {
        SamplerError::ProgressError {
            found,
            requested,
            reason: self.reason.to_string(),
            anchor: self.anchor.into_vec(),
            step_scale: self.step_scale,
        }
    }
}

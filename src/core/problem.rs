use crate::core::constraints::ConstraintSet;
use crate::core::expr::Constraint;
use crate::domain::model::Point;
use crate::utils::error::{Result, SamplerError};
use regex::Regex;
use std::sync::{Arc, OnceLock};

/// A loaded input file: the constraint set and its feasible seed.
#[derive(Debug, Clone)]
pub struct Problem {
    pub constraints: Arc<ConstraintSet>,
    pub seed: Point,
}

fn separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"[\s,]+").expect("separator pattern is valid"))
}

impl Problem {
    /// Line 1 is the dimension count, line 2 the seed point, every later line a
    /// constraint. Blank lines and lines starting with `#` are skipped.
    pub fn parse(content: &str) -> Result<Self> {
        let mut lines = content
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()));

        let (ndims_line, ndims_text) = lines
            .by_ref()
            .find(|(_, line)| !line.is_empty())
            .ok_or_else(|| SamplerError::InputFormatError {
                line: 1,
                message: "input file is empty".to_string(),
            })?;
        let ndims = ndims_text
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| SamplerError::InputFormatError {
                line: ndims_line,
                message: format!(
                    "dimension count must be a positive integer, found '{}'",
                    ndims_text
                ),
            })?;

        let (seed_line, seed_text) =
            lines
                .by_ref()
                .find(|(_, line)| !line.is_empty())
                .ok_or_else(|| SamplerError::InputFormatError {
                    line: ndims_line + 1,
                    message: "missing seed point".to_string(),
                })?;
        let seed = Self::parse_seed(seed_line, seed_text, ndims)?;

        let mut constraints = Vec::new();
        for (line_no, line) in lines {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let constraint =
                Constraint::parse(line).map_err(|e| SamplerError::ExpressionError {
                    line: line_no,
                    column: e.column,
                    expression: line.to_string(),
                    message: e.message,
                })?;
            constraints.push(constraint);
        }

        let constraints = ConstraintSet::new(ndims, constraints, &seed)?;
        Ok(Self {
            constraints: Arc::new(constraints),
            seed,
        })
    }

    fn parse_seed(line: usize, text: &str, ndims: usize) -> Result<Point> {
        let coords = separator()
            .split(text)
            .filter(|field| !field.is_empty())
            .map(|field| {
                field
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| SamplerError::InputFormatError {
                        line,
                        message: format!("seed coordinate '{}' is not a finite real number", field),
                    })
            })
            .collect::<Result<Vec<f64>>>()?;

        if coords.len() != ndims {
            return Err(SamplerError::InputFormatError {
                line,
                message: format!(
                    "seed point has {} coordinates but the space has {} dimensions",
                    coords.len(),
                    ndims
                ),
            });
        }

        Ok(Point::new(coords))
    }

    pub fn ndims(&self) -> usize {
        self.constraints.ndims()
    }
}

use crate::core::expr::{BoundDecl, Constraint};
use crate::domain::model::{Interval, Point};
use crate::utils::error::{Result, SamplerError};

/// The constraints of one run, validated against its seed point.
#[derive(Debug, Clone)]
pub struct ConstraintSet {
    ndims: usize,
    bounds: Vec<Interval>,
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    /// Builds the set and checks that `seed` lies in the feasible region.
    pub fn new(ndims: usize, constraints: Vec<Constraint>, seed: &Point) -> Result<Self> {
        if ndims == 0 {
            return Err(SamplerError::InvalidConfigValueError {
                field: "ndims".to_string(),
                value: ndims.to_string(),
                reason: "the space needs at least one dimension".to_string(),
            });
        }

        for constraint in &constraints {
            if let Some(index) = constraint.max_index() {
                if index >= ndims {
                    return Err(SamplerError::IndexOutOfRangeError {
                        expression: constraint.source().to_string(),
                        index,
                        ndims,
                    });
                }
            }
        }

        if seed.ndims() != ndims {
            return Err(SamplerError::InvalidConfigValueError {
                field: "seed".to_string(),
                value: format!("{:?}", seed.as_slice()),
                reason: format!("expected {} coordinates, found {}", ndims, seed.ndims()),
            });
        }

        let mut bounds = vec![Interval::unbounded(); ndims];
        for constraint in &constraints {
            match constraint.bound() {
                Some(BoundDecl::Lower { index, value }) => bounds[index].tighten_lower(value),
                Some(BoundDecl::Upper { index, value }) => bounds[index].tighten_upper(value),
                Some(BoundDecl::Fixed { index, value }) => {
                    bounds[index].tighten_lower(value);
                    bounds[index].tighten_upper(value);
                }
                None => {}
            }
        }

        let set = Self {
            ndims,
            bounds,
            constraints,
        };

        if let Some(violated) = set.first_violation(seed) {
            let margin = violated.evaluate(seed.as_slice()).margin;
            return Err(SamplerError::InfeasibleSeedError {
                constraint: violated.source().to_string(),
                margin,
            });
        }

        tracing::debug!(
            "Loaded {} constraints over {} dimensions ({} bounded)",
            set.constraints.len(),
            ndims,
            set.bounds.iter().filter(|b| b.is_bounded()).count()
        );

        Ok(set)
    }

    pub fn ndims(&self) -> usize {
        self.ndims
    }

    pub fn bounds(&self) -> &[Interval] {
        &self.bounds
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// True when every dimension has both a lower and an upper bound.
    pub fn is_fully_bounded(&self) -> bool {
        self.bounds.iter().all(Interval::is_bounded)
    }

    /// Stops at the first violated constraint.
    pub fn feasible(&self, point: &Point) -> bool {
        self.feasible_coords(point.as_slice())
    }

    pub(crate) fn feasible_coords(&self, coords: &[f64]) -> bool {
        coords.len() == self.ndims && self.constraints.iter().all(|c| c.is_satisfied(coords))
    }

    pub fn first_violation(&self, point: &Point) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|c| !c.is_satisfied(point.as_slice()))
    }

    /// Margin of every constraint at `point`, in declaration order.
    pub fn margins(&self, point: &Point) -> Vec<f64> {
        self.constraints
            .iter()
            .map(|c| c.evaluate(point.as_slice()).margin)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(sources: &[&str]) -> Vec<Constraint> {
        sources.iter().map(|s| Constraint::parse(s).unwrap()).collect()
    }

    #[test]
    fn test_feasible_example_region() {
        let seed = Point::new(vec![0.5, 0.5]);
        let set = ConstraintSet::new(2, parse_all(&["x[0] + x[1] - 1.0 <= 0.0"]), &seed).unwrap();

        assert!(set.feasible(&seed));
        assert!(set.feasible(&Point::new(vec![-3.0, 2.0])));
        assert!(!set.feasible(&Point::new(vec![0.6, 0.6])));
        assert!(!set.feasible(&Point::new(vec![0.1])));
    }

    #[test]
    fn test_infeasible_seed_is_rejected() {
        let seed = Point::new(vec![2.0, 2.0]);
        let err = ConstraintSet::new(2, parse_all(&["x[0] + x[1] - 1.0 <= 0.0"]), &seed).unwrap_err();
        match err {
            SamplerError::InfeasibleSeedError { constraint, margin } => {
                assert_eq!(constraint, "x[0] + x[1] - 1.0 <= 0.0");
                assert!((margin + 3.0).abs() < 1e-12);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_seed_with_undefined_constraint_is_rejected() {
        let seed = Point::new(vec![0.0]);
        let err = ConstraintSet::new(1, parse_all(&["1 / x[0] >= 0"]), &seed).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_out_of_range_index() {
        let seed = Point::new(vec![0.0, 0.0]);
        let err = ConstraintSet::new(2, parse_all(&["x[2] >= 0"]), &seed).unwrap_err();
        assert!(matches!(
            err,
            SamplerError::IndexOutOfRangeError { index: 2, ndims: 2, .. }
        ));
    }

    #[test]
    fn test_zero_dimensions_and_wrong_seed_length() {
        let empty = Point::new(vec![]);
        assert!(ConstraintSet::new(0, vec![], &empty).is_err());

        let short = Point::new(vec![1.0]);
        let err = ConstraintSet::new(2, vec![], &short).unwrap_err();
        assert!(matches!(err, SamplerError::InvalidConfigValueError { ref field, .. } if field == "seed"));
    }

    #[test]
    fn test_bounds_are_intersected() {
        let seed = Point::new(vec![0.5, 5.0, 1.0]);
        let set = ConstraintSet::new(
            3,
            parse_all(&[
                "x[0] >= 0",
                "x[0] <= 1",
                "x[0] >= -4",
                "x[1] == 5",
                "10 >= x[2]",
                "x[0] * x[2] <= 100",
            ]),
            &seed,
        )
        .unwrap();

        let bounds = set.bounds();
        assert_eq!(bounds[0].span(), Some(1.0));
        assert_eq!(bounds[1].span(), Some(0.0));
        assert_eq!(bounds[2].upper, Some(10.0));
        assert_eq!(bounds[2].lower, None);
        assert!(!set.is_fully_bounded());
    }

    #[test]
    fn test_margins_and_first_violation() {
        let seed = Point::new(vec![1.0]);
        let set = ConstraintSet::new(1, parse_all(&["x[0] >= 0", "x[0] <= 2"]), &seed).unwrap();

        assert_eq!(set.margins(&seed), vec![1.0, 1.0]);
        let outside = Point::new(vec![3.0]);
        assert_eq!(set.first_violation(&outside).unwrap().source(), "x[0] <= 2");
        assert_eq!(set.margins(&outside), vec![3.0, -1.0]);
    }
}

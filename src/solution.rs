//! Solution representation, from-scratch evaluation and feasibility check.

use crate::error::Result;
use crate::graph::{Length, INFINITE_DISTANCE};
use crate::heuristics::tabu_search::{StopReason, WorkerOutcome};
use crate::problem::Problem;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use thiserror::Error as ThisError;

/// Represents a solution to the p-center problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Instance the solution belongs to
    pub instance: String,
    /// Open centers, 0-indexed and sorted
    pub centers: Vec<usize>,
    /// Coverage radius in integral distance units
    pub cover_radius: Length,
    /// Coverage radius in instance units
    pub objective: f64,
    /// Whether the solution passed the feasibility check
    pub feasible: bool,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Number of iterations of the winning worker (if applicable)
    pub iterations: Option<u64>,
    /// Winning worker
    pub worker: Option<usize>,
    /// Seed of the winning worker
    pub seed: Option<u64>,
    #[serde(default)]
    pub stop_reason: Option<StopReason>,
}

/// Reasons a center set is not a valid p-center solution
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum FeasibilityError {
    #[error("expected {expected} centers, found {found}")]
    WrongCenterCount { expected: usize, found: usize },
    #[error("center {0} is out of range")]
    UnknownNode(usize),
    #[error("center {0} appears more than once")]
    DuplicateCenter(usize),
    #[error("reported radius {reported} differs from recomputed radius {actual}")]
    RadiusMismatch { reported: Length, actual: Length },
}

impl Solution {
    /// Create a new empty solution
    pub fn new() -> Self {
        Solution {
            instance: String::new(),
            centers: Vec::new(),
            cover_radius: INFINITE_DISTANCE,
            objective: f64::INFINITY,
            feasible: false,
            algorithm: String::new(),
            computation_time: 0.0,
            iterations: None,
            worker: None,
            seed: None,
            stop_reason: None,
        }
    }

    /// Create a solution from a center set, evaluated from scratch
    pub fn from_centers(problem: &Problem, mut centers: Vec<usize>, algorithm: &str) -> Self {
        centers.sort_unstable();
        let mut solution = Solution {
            instance: problem.name.clone(),
            centers,
            algorithm: algorithm.to_string(),
            ..Self::new()
        };
        solution.validate(problem);
        solution
    }

    /// Solution of a finished worker
    pub fn from_outcome(problem: &Problem, outcome: &WorkerOutcome, algorithm: &str) -> Self {
        let mut solution = Self::from_centers(problem, outcome.centers.clone(), algorithm);
        solution.computation_time = outcome.elapsed;
        solution.iterations = Some(outcome.iterations);
        solution.worker = Some(outcome.worker);
        solution.seed = Some(outcome.seed);
        solution.stop_reason = Some(outcome.stop_reason);
        solution
    }

    /// Recompute radius, objective and feasibility
    pub fn validate(&mut self, problem: &Problem) {
        let ids_ok = self.centers.iter().all(|&c| c < problem.node_count());
        self.cover_radius = if ids_ok {
            problem.cover_radius(&self.centers)
        } else {
            INFINITE_DISTANCE
        };
        self.objective = problem.scaled(self.cover_radius);
        self.feasible = self.check(problem).is_ok();
    }

    /// Verify |centers| = P, ids in range and distinct, and the reported radius.
    ///
    /// Returns the recomputed radius.
    pub fn check(&self, problem: &Problem) -> std::result::Result<Length, FeasibilityError> {
        if self.centers.len() != problem.center_count {
            return Err(FeasibilityError::WrongCenterCount {
                expected: problem.center_count,
                found: self.centers.len(),
            });
        }
        let mut seen = HashSet::with_capacity(self.centers.len());
        for &c in &self.centers {
            if c >= problem.node_count() {
                return Err(FeasibilityError::UnknownNode(c));
            }
            if !seen.insert(c) {
                return Err(FeasibilityError::DuplicateCenter(c));
            }
        }
        let actual = problem.cover_radius(&self.centers);
        if actual != self.cover_radius {
            return Err(FeasibilityError::RadiusMismatch {
                reported: self.cover_radius,
                actual,
            });
        }
        Ok(actual)
    }

    /// For every node, the index of its closest center and the distance to it
    pub fn assignment(&self, problem: &Problem) -> Vec<(usize, Length)> {
        let distances = problem.distances();
        (0..problem.node_count())
            .map(|v| {
                self.centers
                    .iter()
                    .map(|&c| (c, distances.get(c, v)))
                    .min_by_key(|&(c, d)| (d, c))
                    .unwrap_or((v, INFINITE_DISTANCE))
            })
            .collect()
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl Default for Solution {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Instance: {}", self.instance)?;
        writeln!(f, "  Objective: {} (radius {})", self.objective, self.cover_radius)?;
        writeln!(f, "  Feasible: {}", self.feasible)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        if let Some(iter) = self.iterations {
            writeln!(f, "  Iterations: {}", iter)?;
        }
        if let (Some(worker), Some(seed)) = (self.worker, self.seed) {
            writeln!(f, "  Worker: {} (seed {})", worker, seed)?;
        }
        if let Some(reason) = self.stop_reason {
            writeln!(f, "  Stopped on: {}", reason)?;
        }
        writeln!(f, "  Centers: {:?}", self.centers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::scenario_problem;

    #[test]
    fn test_solution_creation() {
        let sol = Solution::new();
        assert!(sol.centers.is_empty());
        assert!(!sol.feasible);
        assert_eq!(sol.cover_radius, INFINITE_DISTANCE);
    }

    #[test]
    fn test_from_centers_sorts_and_evaluates() {
        let problem = scenario_problem(2);
        let sol = Solution::from_centers(&problem, vec![2, 1], "test");
        assert_eq!(sol.centers, vec![1, 2]);
        assert_eq!(sol.cover_radius, 2);
        assert_eq!(sol.objective, 2.0);
        assert!(sol.feasible);
        assert_eq!(sol.check(&problem), Ok(2));
    }

    #[test]
    fn test_check_rejects_bad_sets() {
        let problem = scenario_problem(2);

        let sol = Solution::from_centers(&problem, vec![1], "test");
        assert!(!sol.feasible);
        assert_eq!(
            sol.check(&problem),
            Err(FeasibilityError::WrongCenterCount { expected: 2, found: 1 })
        );

        let sol = Solution::from_centers(&problem, vec![1, 1], "test");
        assert_eq!(sol.check(&problem), Err(FeasibilityError::DuplicateCenter(1)));

        let sol = Solution::from_centers(&problem, vec![1, 9], "test");
        assert_eq!(sol.check(&problem), Err(FeasibilityError::UnknownNode(9)));

        let mut sol = Solution::from_centers(&problem, vec![1, 2], "test");
        sol.cover_radius = 1;
        assert_eq!(
            sol.check(&problem),
            Err(FeasibilityError::RadiusMismatch { reported: 1, actual: 2 })
        );
    }

    #[test]
    fn test_assignment_picks_closest_center() {
        let problem = scenario_problem(2);
        let sol = Solution::from_centers(&problem, vec![0, 3], "test");
        assert_eq!(sol.assignment(&problem), vec![(0, 0), (0, 1), (3, 2), (3, 0)]);
    }

    #[test]
    fn test_json_round_trip() {
        let problem = scenario_problem(2);
        let sol = Solution::from_centers(&problem, vec![0, 2], "test");
        let path = std::env::temp_dir().join(format!("p-center-solution-{}.json", std::process::id()));
        sol.save_json(&path).unwrap();
        let loaded = Solution::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, sol);
    }
}

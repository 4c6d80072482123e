//! Single-worker tabu search over swap moves.
//!
//! A worker goes through three phases: it builds an initial set of P
//! facilities, iterates swap moves under the tabu rule, and stops on the
//! first of deadline, iteration limit or target radius.

use super::assignment::Assignment;
use super::construction::ConstructionStrategy;
use super::neighborhood::SwapNeighborhood;
use super::tabu::{TabuMemory, TenureConfig};
use crate::graph::Length;
use crate::problem::Problem;
use crate::references::{target_radius, TargetLookup};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use thiserror::Error as ThisError;

/// Per-worker search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabuSearchConfig {
    /// Stop after this many swap iterations
    pub max_iterations: Option<u64>,
    /// Stop as soon as the best radius is at most this value (integral units).
    ///
    /// Usually resolved from a [`TargetLookup`] with [`TabuSearchConfig::target_from`].
    pub target: Option<Length>,
    pub tenure: TenureConfig,
    pub construction: ConstructionStrategy,
}

impl Default for TabuSearchConfig {
    fn default() -> Self {
        TabuSearchConfig {
            max_iterations: None,
            target: None,
            tenure: TenureConfig::default(),
            construction: ConstructionStrategy::default(),
        }
    }
}

impl TabuSearchConfig {
    /// Set the stop target to the reference objective `lookup` knows for
    /// `problem` (by name and P).
    ///
    /// Returns the reference in instance units; the target is left untouched
    /// when there is none.
    pub fn target_from<L: TargetLookup + ?Sized>(&mut self, lookup: &L, problem: &Problem) -> Option<f64> {
        let reference = lookup.reference(&problem.name, problem.center_count)?;
        self.target = Some(target_radius(reference, problem.objective_scale));
        Some(reference)
    }
}

/// Why a worker left its iteration loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    TimeLimit,
    IterationLimit,
    TargetReached,
    /// The bottleneck node is already served at distance 0
    NoCandidates,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::TimeLimit => "time limit",
            StopReason::IterationLimit => "iteration limit",
            StopReason::TargetReached => "target reached",
            StopReason::NoCandidates => "no candidates",
        };
        write!(f, "{}", s)
    }
}

/// Result of one successful worker
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerOutcome {
    pub worker: usize,
    pub seed: u64,
    /// Best center set found, sorted
    pub centers: Vec<usize>,
    pub radius: Length,
    /// Radius right after construction
    pub initial_radius: Length,
    pub iterations: u64,
    /// Iteration at which `radius` was first reached (0 = construction)
    pub best_iteration: u64,
    pub stop_reason: StopReason,
    /// Seconds from worker start to stop
    pub elapsed: f64,
}

/// Why a worker produced no solution
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum WorkerFailure {
    #[error("worker {worker}: deadline passed after opening {opened} of {required} centers")]
    DeadlineDuringConstruction {
        worker: usize,
        opened: usize,
        required: usize,
    },
    #[error("worker {worker} panicked: {message}")]
    Panicked { worker: usize, message: String },
    #[error("worker {worker} could not be started: {message}")]
    Spawn { worker: usize, message: String },
}

/// Tabu search over one problem, shared read-only by all workers
pub struct TabuSearch<'p> {
    problem: &'p Problem,
    config: TabuSearchConfig,
}

impl<'p> TabuSearch<'p> {
    pub fn new(problem: &'p Problem, config: TabuSearchConfig) -> Self {
        TabuSearch { problem, config }
    }

    /// Run one worker with its own seed until a stop condition holds
    pub fn run(&self, worker: usize, seed: u64, deadline: Instant) -> Result<WorkerOutcome, WorkerFailure> {
        let start = Instant::now();
        let problem = self.problem;
        let n = problem.node_count();
        let p = problem.center_count;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut state = Assignment::new(problem.distances());

        let heuristic = self.config.construction.heuristic();
        if !heuristic.construct(problem, &mut state, &mut rng, deadline) {
            log::warn!(
                "worker {}: deadline reached during {} construction ({}/{} centers)",
                worker,
                heuristic.name(),
                state.len(),
                p
            );
            return Err(WorkerFailure::DeadlineDuringConstruction {
                worker,
                opened: state.len(),
                required: p,
            });
        }

        let initial_radius = state.radius();
        let mut best_radius = initial_radius;
        let mut best_centers = state.snapshot();
        let mut best_iteration = 0;
        log::debug!(
            "worker {}: {} construction radius {} in {:.3}s",
            worker,
            heuristic.name(),
            initial_radius,
            start.elapsed().as_secs_f64()
        );

        let tenure = self.config.tenure.draw(n, p, &mut rng);
        let mut tabu = TabuMemory::new(n);
        let mut neighborhood = SwapNeighborhood::new(n);
        let mut step: u64 = 0;

        let stop_reason = loop {
            if Instant::now() >= deadline {
                break StopReason::TimeLimit;
            }
            if self.config.max_iterations.map_or(false, |max| step >= max) {
                break StopReason::IterationLimit;
            }
            if self.config.target.map_or(false, |target| best_radius <= target) {
                break StopReason::TargetReached;
            }

            let Some(mv) = neighborhood.find_move(problem, &mut state, &tabu, step, best_radius, &mut rng)
            else {
                break StopReason::NoCandidates;
            };
            state.add_facility(mv.add);
            state.remove_facility(mv.remove, &mut rng);
            debug_assert_eq!(state.len(), p);
            tabu.forbid(mv.add, mv.remove, step + tenure);
            step += 1;

            if state.radius() < best_radius {
                best_radius = state.radius();
                best_centers = state.snapshot();
                best_iteration = step;
                log::debug!(
                    "worker {}: iteration {} radius {} ({:.3}s)",
                    worker,
                    step,
                    best_radius,
                    start.elapsed().as_secs_f64()
                );
            }
        };

        log::debug!(
            "worker {}: stopped on {} after {} iterations, best radius {}",
            worker,
            stop_reason,
            step,
            best_radius
        );

        Ok(WorkerOutcome {
            worker,
            seed,
            centers: best_centers,
            radius: best_radius,
            initial_radius,
            iterations: step,
            best_iteration,
            stop_reason,
            elapsed: start.elapsed().as_secs_f64(),
        })
    }
}

//! Multi-worker orchestration.
//!
//! Every worker is an independent [`TabuSearch`] run on its own OS thread with
//! its own random stream. Workers share the read-only [`Problem`] and the
//! deadline, nothing else; the smallest radius wins once all have joined.

use super::tabu_search::{TabuSearch, WorkerFailure, WorkerOutcome};
use crate::config::SolverConfig;
use crate::error::{Error, Result};
use crate::problem::Problem;
use crate::solution::Solution;
use std::any::Any;
use std::thread;
use std::time::{Duration, Instant};

/// Longest time budget honored, in seconds
const MAX_TIME_LIMIT: f64 = 1.0e9;

/// Deadline `seconds` from now; negative or NaN budgets mean "now"
pub fn deadline_after(seconds: f64) -> Instant {
    let seconds = if seconds.is_nan() {
        0.0
    } else {
        seconds.clamp(0.0, MAX_TIME_LIMIT)
    };
    Instant::now() + Duration::from_secs_f64(seconds)
}

/// Per-worker results of one solve
#[derive(Debug, Clone)]
pub struct SolveReport {
    pub outcomes: Vec<std::result::Result<WorkerOutcome, WorkerFailure>>,
    /// Wall-clock seconds from launch to join
    pub elapsed: f64,
}

impl SolveReport {
    /// Successful worker with the smallest radius (lowest worker id on ties)
    pub fn best(&self) -> Option<&WorkerOutcome> {
        self.successes().min_by_key(|o| (o.radius, o.worker))
    }

    pub fn successes(&self) -> impl Iterator<Item = &WorkerOutcome> {
        self.outcomes.iter().filter_map(|r| r.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &WorkerFailure> {
        self.outcomes.iter().filter_map(|r| r.as_ref().err())
    }

    /// Swap iterations summed over all successful workers
    pub fn total_iterations(&self) -> u64 {
        self.successes().map(|o| o.iterations).sum()
    }
}

/// Runs several tabu search workers in parallel
pub struct ParallelTabuSearch<'p> {
    problem: &'p Problem,
    config: SolverConfig,
}

impl<'p> ParallelTabuSearch<'p> {
    pub fn new(problem: &'p Problem, config: SolverConfig) -> Self {
        ParallelTabuSearch { problem, config }
    }

    /// Launch all workers, wait for every one of them and collect their results
    pub fn run(&self) -> SolveReport {
        let start = Instant::now();
        let deadline = deadline_after(self.config.time_limit);
        let workers = self.config.effective_workers();
        let search = TabuSearch::new(self.problem, self.config.search.clone());

        log::info!(
            "{}: {} workers, N = {}, P = {}, time limit {}s",
            self.problem.name,
            workers,
            self.problem.node_count(),
            self.problem.center_count,
            self.config.time_limit
        );

        let outcomes = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let search = &search;
                    let seed = self.config.worker_seed(worker);
                    thread::Builder::new()
                        .name(format!("tabu-worker-{}", worker))
                        .spawn_scoped(scope, move || search.run(worker, seed, deadline))
                })
                .collect();

            handles
                .into_iter()
                .enumerate()
                .map(|(worker, handle)| match handle {
                    Ok(handle) => handle.join().unwrap_or_else(|payload| {
                        Err(WorkerFailure::Panicked {
                            worker,
                            message: panic_message(&*payload),
                        })
                    }),
                    Err(e) => Err(WorkerFailure::Spawn {
                        worker,
                        message: e.to_string(),
                    }),
                })
                .collect::<Vec<_>>()
        });

        let report = SolveReport {
            outcomes,
            elapsed: start.elapsed().as_secs_f64(),
        };
        for failure in report.failures() {
            log::warn!("{}", failure);
        }
        report
    }

    /// Run all workers and return the best solution found
    pub fn solve(&self) -> Result<Solution> {
        let report = self.run();
        let Some(best) = report.best() else {
            log::error!("{}: all {} workers failed", self.problem.name, report.outcomes.len());
            return Err(Error::NoFeasibleSolution);
        };

        let mut solution = Solution::from_outcome(self.problem, best, "TabuSearch");
        solution.computation_time = report.elapsed;
        log::info!(
            "{}: best radius {} (objective {}) from worker {} in {:.3}s, {} iterations over all workers",
            self.problem.name,
            solution.cover_radius,
            solution.objective,
            best.worker,
            report.elapsed,
            report.total_iterations()
        );
        Ok(solution)
    }
}

/// Solve `problem` with the given configuration
pub fn solve(problem: &Problem, config: &SolverConfig) -> Result<Solution> {
    ParallelTabuSearch::new(problem, config.clone()).solve()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

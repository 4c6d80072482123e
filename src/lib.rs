//! p-center Solver Library
//!
//! A tabu search solver for the p-center problem: open P facilities among the
//! N nodes of a graph so that the largest node-to-nearest-facility distance
//! (the coverage radius) is as small as possible.
//!
//! # Features
//!
//! - OR-Library pmed, TSPLIB coordinate and JSON instance readers
//! - Dense shortest-path / scaled Euclidean distance matrices
//! - Incremental nearest / second-nearest facility bookkeeping
//! - Swap-based tabu search with aspiration, run on several threads
//! - Benchmarking against reference values and SVG visualization
//!
//! # Example
//!
//! ```no_run
//! use p_center_solver::{solve, PCenterInstance, Problem, SolverConfig};
//!
//! let instance = PCenterInstance::from_file("pmed1.txt").unwrap();
//! let problem = Problem::from_instance(&instance).unwrap();
//!
//! let config = SolverConfig {
//!     time_limit: 10.0,
//!     workers: 4,
//!     ..Default::default()
//! };
//! let solution = solve(&problem, &config).unwrap();
//!
//! println!("Radius: {} with centers {:?}", solution.objective, solution.centers);
//! ```

pub mod error;
pub mod instance;
pub mod graph;
pub mod problem;
pub mod solution;
pub mod config;
pub mod references;
pub mod heuristics;
pub mod benchmark;
pub mod visualization;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::SolverConfig;
pub use error::{Error, Result};
pub use heuristics::parallel::solve;
pub use instance::PCenterInstance;
pub use problem::Problem;
pub use solution::Solution;

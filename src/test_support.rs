//! Small problems shared by the unit tests.

use crate::graph::{DistanceMatrix, Length, GEOMETRIC_OBJECTIVE_SCALE};
use crate::instance::Node;
use crate::problem::Problem;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Four nodes whose optimal 2-center radius is 2
pub(crate) fn scenario_matrix() -> DistanceMatrix {
    DistanceMatrix::from_rows(vec![
        vec![0, 1, 4, 6],
        vec![1, 0, 3, 5],
        vec![4, 3, 0, 2],
        vec![6, 5, 2, 0],
    ])
    .unwrap()
}

pub(crate) fn scenario_problem(center_count: usize) -> Problem {
    Problem::from_matrix("scenario", scenario_matrix(), center_count).unwrap()
}

/// Nodes on a line at positions 2^i: every pairwise distance is distinct
pub(crate) fn distinct_distance_problem(n: usize, center_count: usize) -> Problem {
    let rows: Vec<Vec<Length>> = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| ((1u32 << i) as i64 - (1u32 << j) as i64).unsigned_abs() as Length)
                .collect()
        })
        .collect();
    Problem::from_matrix("line", DistanceMatrix::from_rows(rows).unwrap(), center_count).unwrap()
}

/// Uniform random points in a 100x100 square
pub(crate) fn random_geometric_problem(n: usize, center_count: usize, seed: u64) -> Problem {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let nodes: Vec<Node> = (0..n)
        .map(|i| Node::new(i, rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)))
        .collect();
    let matrix = DistanceMatrix::from_coordinates(&nodes, GEOMETRIC_OBJECTIVE_SCALE);
    let mut problem = Problem::from_matrix("random", matrix, center_count).unwrap();
    problem.objective_scale = GEOMETRIC_OBJECTIVE_SCALE;
    problem
}

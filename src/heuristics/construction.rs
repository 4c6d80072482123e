//! Initial solution construction.
//!
//! Both heuristics open one random facility first, then keep opening
//! candidates around the bottleneck node until P facilities are open.

use super::assignment::Assignment;
use super::neighborhood::collect_candidates;
use crate::graph::INFINITE_DISTANCE;
use crate::problem::Problem;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub trait ConstructionHeuristic {
    /// Open facilities until `problem.center_count` are open.
    ///
    /// Returns `false` when the deadline passed before the set was complete.
    fn construct(
        &self,
        problem: &Problem,
        state: &mut Assignment,
        rng: &mut ChaCha8Rng,
        deadline: Instant,
    ) -> bool;

    fn name(&self) -> &str;
}

/// Which construction heuristic a worker runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstructionStrategy {
    #[default]
    Greedy,
    Random,
}

impl ConstructionStrategy {
    pub fn heuristic(self) -> Box<dyn ConstructionHeuristic + Send + Sync> {
        match self {
            ConstructionStrategy::Greedy => Box::new(GreedyConstruction),
            ConstructionStrategy::Random => Box::new(RandomConstruction),
        }
    }
}

impl std::str::FromStr for ConstructionStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "greedy" => Ok(ConstructionStrategy::Greedy),
            "random" => Ok(ConstructionStrategy::Random),
            other => Err(format!("unknown construction strategy '{}'", other)),
        }
    }
}

/// Open a uniformly random closed node
fn open_random_closed(state: &mut Assignment, rng: &mut ChaCha8Rng) {
    let closed = state.node_count() - state.len();
    if closed == 0 {
        return;
    }
    let pick = rng.gen_range(0..closed);
    if let Some(f) = (0..state.node_count()).filter(|&v| !state.is_open(v)).nth(pick) {
        state.add_facility(f);
    }
}

/// Best-improvement construction.
///
/// Each step tries every candidate around a bottleneck node and opens the one
/// giving the smallest radius (random among ties).
pub struct GreedyConstruction;

impl ConstructionHeuristic for GreedyConstruction {
    fn construct(
        &self,
        problem: &Problem,
        state: &mut Assignment,
        rng: &mut ChaCha8Rng,
        deadline: Instant,
    ) -> bool {
        let mut candidates = Vec::new();
        let mut ties = Vec::new();

        if state.is_empty() {
            open_random_closed(state, rng);
        }
        while state.len() < problem.center_count {
            if Instant::now() >= deadline {
                return false;
            }
            collect_candidates(problem, state, rng, &mut candidates);
            if candidates.is_empty() {
                open_random_closed(state, rng);
                continue;
            }

            let mut best = INFINITE_DISTANCE;
            ties.clear();
            for &c in &candidates {
                state.add_facility(c);
                let radius = state.radius();
                state.remove_facility(c, rng);
                if radius < best {
                    best = radius;
                    ties.clear();
                    ties.push(c);
                } else if radius == best {
                    ties.push(c);
                }
            }
            if let Some(&c) = ties.choose(rng) {
                state.add_facility(c);
            }
        }
        true
    }

    fn name(&self) -> &str {
        "Greedy"
    }
}

/// Opens a random candidate around the bottleneck node at each step
pub struct RandomConstruction;

impl ConstructionHeuristic for RandomConstruction {
    fn construct(
        &self,
        problem: &Problem,
        state: &mut Assignment,
        rng: &mut ChaCha8Rng,
        deadline: Instant,
    ) -> bool {
        let mut candidates = Vec::new();

        if state.is_empty() {
            open_random_closed(state, rng);
        }
        while state.len() < problem.center_count {
            if Instant::now() >= deadline {
                return false;
            }
            collect_candidates(problem, state, rng, &mut candidates);
            match candidates.choose(rng) {
                Some(&c) => state.add_facility(c),
                None => open_random_closed(state, rng),
            }
        }
        true
    }

    fn name(&self) -> &str {
        "Random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{random_geometric_problem, scenario_problem};
    use std::time::Duration;

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    #[test]
    fn test_greedy_opens_p_facilities() {
        let problem = random_geometric_problem(60, 7, 3);
        for seed in 0..5 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut state = Assignment::new(problem.distances());
            assert!(GreedyConstruction.construct(&problem, &mut state, &mut rng, far_deadline()));
            assert_eq!(state.len(), 7);
            let centers = state.snapshot();
            assert!(centers.windows(2).all(|w| w[0] < w[1]));
            assert_eq!(state.radius(), problem.cover_radius(&centers));
        }
    }

    #[test]
    fn test_random_opens_p_facilities() {
        let problem = random_geometric_problem(40, 5, 8);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut state = Assignment::new(problem.distances());
        assert!(RandomConstruction.construct(&problem, &mut state, &mut rng, far_deadline()));
        assert_eq!(state.len(), 5);
    }

    #[test]
    fn test_greedy_second_facility_is_best_candidate() {
        let problem = scenario_problem(2);
        for seed in 0..10 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut state = Assignment::new(problem.distances());
            GreedyConstruction.construct(&problem, &mut state, &mut rng, far_deadline());
            // every first facility admits a second one reaching the optimum
            assert_eq!(state.radius(), 2, "seed {} gave {:?}", seed, state.snapshot());
        }
    }

    #[test]
    fn test_expired_deadline_stops_construction() {
        let problem = random_geometric_problem(30, 5, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut state = Assignment::new(problem.distances());
        let expired = Instant::now() - Duration::from_millis(1);
        assert!(!GreedyConstruction.construct(&problem, &mut state, &mut rng, expired));
        assert!(state.len() < 5);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("greedy".parse::<ConstructionStrategy>(), Ok(ConstructionStrategy::Greedy));
        assert_eq!("Random".parse::<ConstructionStrategy>(), Ok(ConstructionStrategy::Random));
        assert!("best".parse::<ConstructionStrategy>().is_err());
        assert_eq!(ConstructionStrategy::default().heuristic().name(), "Greedy");
    }
}

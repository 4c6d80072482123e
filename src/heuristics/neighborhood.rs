//! Swap neighborhood around the bottleneck node.
//!
//! A move opens one candidate facility `c` and closes one open facility `f`.
//! Candidates are the closed nodes strictly closer to a bottleneck node (a
//! node whose service distance equals the current radius) than its current
//! server. With `c` tentatively open, the radius after closing `f` is
//! `max(radius with c, removal radius of f)`, so every (c, f) pair is scored
//! from one O(N) pass per candidate.

use super::assignment::Assignment;
use super::tabu::TabuMemory;
use crate::graph::{Length, INFINITE_DISTANCE};
use crate::problem::Problem;
use rand::seq::SliceRandom;
use rand::Rng;

/// Open `add`, close `remove`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SwapMove {
    pub add: usize,
    pub remove: usize,
}

impl SwapMove {
    pub fn new(add: usize, remove: usize) -> Self {
        SwapMove { add, remove }
    }
}

/// Pick a node whose service distance equals the radius, uniformly among them
pub fn bottleneck_node<R: Rng + ?Sized>(state: &Assignment, rng: &mut R) -> Option<usize> {
    if state.is_empty() {
        return None;
    }
    let radius = state.radius();
    let count = state.nearest_distances().iter().filter(|&&d| d == radius).count();
    if count == 0 {
        return None;
    }
    let pick = rng.gen_range(0..count);
    state
        .nearest_distances()
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d == radius)
        .nth(pick)
        .map(|(v, _)| v)
}

/// Collect into `out` the closed nodes strictly closer to a random bottleneck
/// node than its current server, nearest first.
///
/// With no facility open every node is a candidate. An empty result means the
/// bottleneck node cannot be served any better (radius 0).
pub fn collect_candidates<R: Rng + ?Sized>(
    problem: &Problem,
    state: &Assignment,
    rng: &mut R,
    out: &mut Vec<usize>,
) {
    out.clear();
    if state.is_empty() {
        out.extend(0..problem.node_count());
        return;
    }
    let Some(v) = bottleneck_node(state, rng) else {
        return;
    };
    let (_, served_at) = state.nearest(v);
    out.extend(
        problem
            .neighbors()
            .within(problem.distances(), v, served_at)
            .filter(|&u| !state.is_open(u)),
    );
}

/// Best moves of one iteration, split by tabu status.
///
/// Each list holds every move reaching its best value.
#[derive(Debug, Clone)]
pub struct MoveEvaluation {
    pub best_tabu: Length,
    pub tabu_moves: Vec<SwapMove>,
    pub best_free: Length,
    pub free_moves: Vec<SwapMove>,
}

impl MoveEvaluation {
    pub fn new() -> Self {
        MoveEvaluation {
            best_tabu: INFINITE_DISTANCE,
            tabu_moves: Vec::new(),
            best_free: INFINITE_DISTANCE,
            free_moves: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.best_tabu = INFINITE_DISTANCE;
        self.tabu_moves.clear();
        self.best_free = INFINITE_DISTANCE;
        self.free_moves.clear();
    }

    pub fn record(&mut self, mv: SwapMove, radius: Length, tabu: bool) {
        let (best, moves) = if tabu {
            (&mut self.best_tabu, &mut self.tabu_moves)
        } else {
            (&mut self.best_free, &mut self.free_moves)
        };
        if radius < *best {
            *best = radius;
            moves.clear();
            moves.push(mv);
        } else if radius == *best {
            moves.push(mv);
        }
    }

    /// Aspiration rule.
    ///
    /// A tabu move is taken only when it beats both `best_known` and every
    /// non-tabu move, or when no non-tabu move exists. Ties are broken
    /// uniformly at random.
    pub fn select<R: Rng + ?Sized>(&self, best_known: Length, rng: &mut R) -> Option<SwapMove> {
        let aspirates = !self.tabu_moves.is_empty()
            && self.best_tabu < best_known
            && self.best_tabu < self.best_free;
        if aspirates || self.free_moves.is_empty() {
            self.tabu_moves.choose(rng).copied()
        } else {
            self.free_moves.choose(rng).copied()
        }
    }
}

impl Default for MoveEvaluation {
    fn default() -> Self {
        Self::new()
    }
}

/// Scratch buffers for one worker's neighborhood scans
#[derive(Debug, Clone)]
pub struct SwapNeighborhood {
    candidates: Vec<usize>,
    removal_radius: Vec<Length>,
    evaluation: MoveEvaluation,
}

impl SwapNeighborhood {
    pub fn new(node_count: usize) -> Self {
        SwapNeighborhood {
            candidates: Vec::new(),
            removal_radius: vec![0; node_count],
            evaluation: MoveEvaluation::new(),
        }
    }

    /// Score every (candidate, open facility) swap.
    ///
    /// The state is returned to its open set before this returns.
    pub fn evaluate<R: Rng + ?Sized>(
        &mut self,
        problem: &Problem,
        state: &mut Assignment,
        tabu: &TabuMemory,
        step: u64,
        rng: &mut R,
    ) -> &MoveEvaluation {
        self.evaluation.clear();
        collect_candidates(problem, state, rng, &mut self.candidates);

        for &c in &self.candidates {
            state.add_facility(c);
            state.fill_removal_radii(&mut self.removal_radius);
            let with_c = state.radius();
            for &f in state.open_facilities() {
                if f == c {
                    continue;
                }
                let radius = with_c.max(self.removal_radius[f]);
                self.evaluation
                    .record(SwapMove::new(c, f), radius, tabu.is_tabu(c, f, step));
            }
            state.remove_facility(c, rng);
        }
        &self.evaluation
    }

    /// Evaluate the neighborhood and pick the move to apply, if any
    pub fn find_move<R: Rng + ?Sized>(
        &mut self,
        problem: &Problem,
        state: &mut Assignment,
        tabu: &TabuMemory,
        step: u64,
        best_known: Length,
        rng: &mut R,
    ) -> Option<SwapMove> {
        self.evaluate(problem, state, tabu, step, rng);
        self.evaluation.select(best_known, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{random_geometric_problem, scenario_problem};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn opened<'p>(problem: &'p Problem, centers: &[usize]) -> Assignment<'p> {
        let mut state = Assignment::new(problem.distances());
        for &c in centers {
            state.add_facility(c);
        }
        state
    }

    #[test]
    fn test_candidates_are_closer_than_server() {
        let problem = scenario_problem(2);
        let state = opened(&problem, &[0, 1]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut out = Vec::new();

        // node 3 is the only bottleneck (served by 1 at distance 5)
        assert_eq!(bottleneck_node(&state, &mut rng), Some(3));
        collect_candidates(&problem, &state, &mut rng, &mut out);
        assert_eq!(out, vec![3, 2]);
    }

    #[test]
    fn test_no_candidates_at_radius_zero() {
        let problem = scenario_problem(3);
        let mut state = opened(&problem, &[0, 1, 2]);
        state.add_facility(3);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut out = vec![7];
        collect_candidates(&problem, &state, &mut rng, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_evaluation_matches_applied_swaps() {
        let problem = random_geometric_problem(30, 4, 21);
        let mut state = opened(&problem, &[0, 9, 18, 27]);
        let tabu = TabuMemory::new(problem.node_count());
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut neighborhood = SwapNeighborhood::new(problem.node_count());

        let before = state.snapshot();
        let evaluation = neighborhood.evaluate(&problem, &mut state, &tabu, 0, &mut rng).clone();
        assert_eq!(state.snapshot(), before);
        assert!(evaluation.tabu_moves.is_empty());
        assert!(!evaluation.free_moves.is_empty());

        for mv in &evaluation.free_moves {
            let centers: Vec<usize> = before
                .iter()
                .copied()
                .filter(|&f| f != mv.remove)
                .chain(std::iter::once(mv.add))
                .collect();
            assert_eq!(problem.cover_radius(&centers), evaluation.best_free);
        }
    }

    #[test]
    fn test_tabu_moves_are_split_out() {
        let problem = scenario_problem(2);
        let mut state = opened(&problem, &[0, 1]);
        let mut tabu = TabuMemory::new(4);
        tabu.forbid(2, 0, 100);
        tabu.forbid(2, 1, 100);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut neighborhood = SwapNeighborhood::new(4);

        let evaluation = neighborhood.evaluate(&problem, &mut state, &tabu, 5, &mut rng).clone();
        assert_eq!(evaluation.tabu_moves.len(), 2);
        assert!(evaluation.tabu_moves.iter().all(|mv| mv.add == 2));
        assert_eq!(evaluation.free_moves.len(), 2);
        assert!(evaluation.free_moves.iter().all(|mv| mv.add == 3));
        // every swap reaches radius 2
        assert_eq!(evaluation.best_tabu, 2);
        assert_eq!(evaluation.best_free, 2);
        // a tabu move that only ties the free moves is not taken
        assert_eq!(evaluation.select(5, &mut rng).map(|mv| mv.add), Some(3));
    }

    #[test]
    fn test_select_prefers_free_move_without_aspiration() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut evaluation = MoveEvaluation::new();
        evaluation.record(SwapMove::new(1, 2), 10, true);
        evaluation.record(SwapMove::new(3, 4), 12, false);

        // tabu move is not better than the best known radius
        assert_eq!(evaluation.select(10, &mut rng), Some(SwapMove::new(3, 4)));
        // tabu move beats both the best known radius and the free move
        assert_eq!(evaluation.select(11, &mut rng), Some(SwapMove::new(1, 2)));
    }

    #[test]
    fn test_select_rejects_tabu_move_tied_with_free_move() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut evaluation = MoveEvaluation::new();
        evaluation.record(SwapMove::new(1, 2), 8, true);
        evaluation.record(SwapMove::new(3, 4), 8, false);
        assert_eq!(evaluation.select(100, &mut rng), Some(SwapMove::new(3, 4)));
    }

    #[test]
    fn test_select_falls_back_to_tabu_move() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut evaluation = MoveEvaluation::new();
        evaluation.record(SwapMove::new(1, 2), 8, true);
        assert_eq!(evaluation.select(3, &mut rng), Some(SwapMove::new(1, 2)));

        assert_eq!(MoveEvaluation::new().select(3, &mut rng), None);
    }

    #[test]
    fn test_record_keeps_all_ties() {
        let mut evaluation = MoveEvaluation::new();
        evaluation.record(SwapMove::new(0, 1), 5, false);
        evaluation.record(SwapMove::new(0, 2), 5, false);
        evaluation.record(SwapMove::new(0, 3), 7, false);
        assert_eq!(evaluation.free_moves.len(), 2);
        evaluation.record(SwapMove::new(0, 4), 4, false);
        assert_eq!(evaluation.free_moves, vec![SwapMove::new(0, 4)]);
    }
}

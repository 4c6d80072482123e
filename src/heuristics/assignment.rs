//! Incremental nearest / second-nearest facility bookkeeping.
//!
//! For every node the state keeps the closest open facility (`nearest`) and the
//! closest one after it (`second`), together with their distances. Opening or
//! closing a facility updates both in O(N) (plus an O(P) rescan for the nodes
//! that lose their second facility), instead of re-evaluating O(N·P) pairs.

use crate::graph::{DistanceMatrix, Length, INFINITE_DISTANCE};
use rand::seq::SliceRandom;
use rand::Rng;

/// Marker for "no facility" in the nearest / second arrays
pub const NO_FACILITY: usize = usize::MAX;

/// Open facility set plus the derived nearest / second-nearest arrays
#[derive(Debug, Clone)]
pub struct Assignment<'p> {
    distances: &'p DistanceMatrix,
    open: Vec<usize>,
    /// Position of each node inside `open`, or `NO_FACILITY`
    slot: Vec<usize>,
    nearest: Vec<usize>,
    nearest_dist: Vec<Length>,
    second: Vec<usize>,
    second_dist: Vec<Length>,
    radius: Length,
    ties: Vec<usize>,
}

impl<'p> Assignment<'p> {
    /// Empty state: no facility open, every node infinitely far
    pub fn new(distances: &'p DistanceMatrix) -> Self {
        let n = distances.len();
        Assignment {
            distances,
            open: Vec::new(),
            slot: vec![NO_FACILITY; n],
            nearest: vec![NO_FACILITY; n],
            nearest_dist: vec![INFINITE_DISTANCE; n],
            second: vec![NO_FACILITY; n],
            second_dist: vec![INFINITE_DISTANCE; n],
            radius: INFINITE_DISTANCE,
            ties: Vec::new(),
        }
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.slot.len()
    }

    /// Number of open facilities
    #[inline]
    pub fn len(&self) -> usize {
        self.open.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    #[inline]
    pub fn is_open(&self, f: usize) -> bool {
        self.slot[f] != NO_FACILITY
    }

    /// Open facilities, in no particular order
    #[inline]
    pub fn open_facilities(&self) -> &[usize] {
        &self.open
    }

    /// Sorted copy of the open set
    pub fn snapshot(&self) -> Vec<usize> {
        let mut centers = self.open.clone();
        centers.sort_unstable();
        centers
    }

    /// Current coverage radius, `max_v nearest_dist[v]`
    #[inline]
    pub fn radius(&self) -> Length {
        self.radius
    }

    /// Closest open facility of `v` and its distance
    #[inline]
    pub fn nearest(&self, v: usize) -> (usize, Length) {
        (self.nearest[v], self.nearest_dist[v])
    }

    /// Second closest open facility of `v` and its distance
    #[inline]
    pub fn second(&self, v: usize) -> (usize, Length) {
        (self.second[v], self.second_dist[v])
    }

    #[inline]
    pub fn nearest_distances(&self) -> &[Length] {
        &self.nearest_dist
    }

    /// Open `f`. `f` must be closed.
    pub fn add_facility(&mut self, f: usize) {
        debug_assert!(!self.is_open(f), "facility {} is already open", f);
        self.slot[f] = self.open.len();
        self.open.push(f);

        let row = self.distances.row(f);
        for v in 0..self.nearest.len() {
            let d = row[v];
            if d < self.nearest_dist[v] {
                self.second_dist[v] = self.nearest_dist[v];
                self.second[v] = self.nearest[v];
                self.nearest_dist[v] = d;
                self.nearest[v] = f;
            } else if d < self.second_dist[v] {
                self.second_dist[v] = d;
                self.second[v] = f;
            }
        }
        self.refresh_radius();
    }

    /// Close `f`. `f` must be open.
    ///
    /// Nodes served by `f` fall back to their second facility; every node that
    /// loses its second facility gets a fresh one, chosen uniformly among the
    /// equally close candidates.
    pub fn remove_facility<R: Rng + ?Sized>(&mut self, f: usize, rng: &mut R) {
        debug_assert!(self.is_open(f), "facility {} is not open", f);
        let pos = self.slot[f];
        self.open.swap_remove(pos);
        if let Some(&moved) = self.open.get(pos) {
            self.slot[moved] = pos;
        }
        self.slot[f] = NO_FACILITY;

        for v in 0..self.nearest.len() {
            if self.nearest[v] == f {
                self.nearest[v] = self.second[v];
                self.nearest_dist[v] = self.second_dist[v];
                self.refresh_second(v, rng);
            } else if self.second[v] == f {
                self.refresh_second(v, rng);
            }
        }
        self.refresh_radius();
    }

    /// For every open facility `f`, the radius that nodes served by `f` would
    /// get if `f` were closed: the largest `second_dist` among them.
    ///
    /// Only the entries of open facilities are written.
    pub fn fill_removal_radii(&self, out: &mut [Length]) {
        for &f in &self.open {
            out[f] = 0;
        }
        for v in 0..self.nearest.len() {
            let f = self.nearest[v];
            if f != NO_FACILITY && self.second_dist[v] > out[f] {
                out[f] = self.second_dist[v];
            }
        }
    }

    fn refresh_second<R: Rng + ?Sized>(&mut self, v: usize, rng: &mut R) {
        let excluded = self.nearest[v];
        let row = self.distances.row(v);
        let mut best = INFINITE_DISTANCE;
        self.ties.clear();
        for &s in &self.open {
            if s == excluded {
                continue;
            }
            let d = row[s];
            if d < best {
                best = d;
                self.ties.clear();
                self.ties.push(s);
            } else if d == best {
                self.ties.push(s);
            }
        }
        self.second[v] = self.ties.choose(rng).copied().unwrap_or(NO_FACILITY);
        self.second_dist[v] = if self.second[v] == NO_FACILITY { INFINITE_DISTANCE } else { best };
    }

    fn refresh_radius(&mut self) {
        self.radius = if self.open.is_empty() {
            INFINITE_DISTANCE
        } else {
            self.nearest_dist.iter().copied().max().unwrap_or(0)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{distinct_distance_problem, random_geometric_problem, scenario_problem};
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    /// Nearest and second-nearest distances recomputed from the open set
    fn recomputed(state: &Assignment, matrix: &DistanceMatrix) -> (Vec<Length>, Vec<Length>) {
        let n = matrix.len();
        let mut first = vec![INFINITE_DISTANCE; n];
        let mut second = vec![INFINITE_DISTANCE; n];
        for v in 0..n {
            let mut d: Vec<Length> = state.open_facilities().iter().map(|&f| matrix.get(f, v)).collect();
            d.sort_unstable();
            if let Some(&x) = d.first() {
                first[v] = x;
            }
            if let Some(&x) = d.get(1) {
                second[v] = x;
            }
        }
        (first, second)
    }

    fn assert_consistent(state: &Assignment, matrix: &DistanceMatrix) {
        let (first, second) = recomputed(state, matrix);
        for v in 0..matrix.len() {
            let (f0, d0) = state.nearest(v);
            let (f1, d1) = state.second(v);
            assert!(d0 <= d1, "node {}: nearest {} > second {}", v, d0, d1);
            assert_eq!(d0, first[v], "nearest distance of node {}", v);
            assert_eq!(d1, second[v], "second distance of node {}", v);
            assert!(state.is_open(f0));
            assert_eq!(matrix.get(f0, v), d0);
            if state.len() >= 2 {
                assert!(state.is_open(f1));
                assert_ne!(f0, f1);
                assert_eq!(matrix.get(f1, v), d1);
            }
        }
        assert_eq!(state.radius(), first.iter().copied().max().unwrap());
    }

    #[test]
    fn test_add_updates_nearest_and_second() {
        let problem = scenario_problem(2);
        let mut state = Assignment::new(problem.distances());

        state.add_facility(1);
        assert_eq!(state.nearest(3), (1, 5));
        assert_eq!(state.second(3), (NO_FACILITY, INFINITE_DISTANCE));
        assert_eq!(state.radius(), 5);

        state.add_facility(2);
        assert_eq!(state.nearest(3), (2, 2));
        assert_eq!(state.second(3), (1, 5));
        assert_eq!(state.nearest(0), (1, 1));
        assert_eq!(state.second(0), (2, 4));
        assert_eq!(state.radius(), 2);
        assert_eq!(state.snapshot(), vec![1, 2]);
    }

    #[test]
    fn test_incremental_matches_recomputation() {
        let problem = random_geometric_problem(40, 6, 7);
        let matrix = problem.distances();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut state = Assignment::new(matrix);

        for f in [3, 17, 25, 8, 31, 12] {
            state.add_facility(f);
            assert_consistent(&state, matrix);
        }

        for _ in 0..200 {
            let closed: Vec<usize> = (0..matrix.len()).filter(|&v| !state.is_open(v)).collect();
            let add = *closed.choose(&mut rng).unwrap();
            let remove = *state.open_facilities().choose(&mut rng).unwrap();
            state.add_facility(add);
            assert_consistent(&state, matrix);
            state.remove_facility(remove, &mut rng);
            assert_consistent(&state, matrix);
            assert_eq!(state.len(), 6);
        }
    }

    #[test]
    fn test_add_then_remove_restores_state() {
        let problem = distinct_distance_problem(10, 3);
        let matrix = problem.distances();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut state = Assignment::new(matrix);
        for f in [0, 4, 9] {
            state.add_facility(f);
        }

        for c in (0..10).filter(|&c| !state.is_open(c)).collect::<Vec<_>>() {
            let before = state.clone();
            state.add_facility(c);
            state.remove_facility(c, &mut rng);

            assert_eq!(state.snapshot(), before.snapshot());
            assert_eq!(state.radius(), before.radius());
            for v in 0..matrix.len() {
                assert_eq!(state.nearest(v), before.nearest(v));
                assert_eq!(state.second(v), before.second(v));
            }
        }
    }

    #[test]
    fn test_remove_leaves_unaffected_nodes_alone() {
        let problem = distinct_distance_problem(8, 3);
        let matrix = problem.distances();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut state = Assignment::new(matrix);
        for f in [0, 1, 7] {
            state.add_facility(f);
        }

        // node 0 is served by 0 then 1; closing 7 touches neither
        assert_eq!(state.nearest(0).0, 0);
        assert_eq!(state.second(0).0, 1);
        state.remove_facility(7, &mut rng);
        assert_eq!(state.nearest(0), (0, 0));
        assert_eq!(state.second(0), (1, 1));
    }

    #[test]
    fn test_removal_radii() {
        let problem = scenario_problem(2);
        let mut state = Assignment::new(problem.distances());
        state.add_facility(0);
        state.add_facility(3);

        let mut radii = vec![0; 4];
        state.fill_removal_radii(&mut radii);
        // nodes 0, 1 use facility 0 and fall back to 3 at distances 6 and 5
        assert_eq!(radii[0], 6);
        // nodes 2, 3 use facility 3 and fall back to 0 at distances 4 and 6
        assert_eq!(radii[3], 6);
    }

    #[test]
    fn test_second_nearest_ties_pick_an_open_facility() {
        let problem = scenario_problem(3);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut state = Assignment::new(problem.distances());
        for f in [0, 2, 1] {
            state.add_facility(f);
        }
        state.remove_facility(2, &mut rng);
        assert_consistent(&state, problem.distances());
        assert_eq!(state.len(), 2);
    }
}

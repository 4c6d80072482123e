//! Dense distance matrix and sorted neighbor index.
//!
//! Both structures are built once per instance and are read-only afterwards,
//! so every search worker can borrow them without synchronization.

use crate::error::{Error, Result};
use crate::instance::{Edge, Node};
use rayon::prelude::*;

/// Integral distance used throughout the solver
pub type Length = u32;

/// Distance between nodes that are not (yet) connected
pub const INFINITE_DISTANCE: Length = Length::MAX;

/// Objective scale for edge-list instances
pub const TOPOLOGICAL_OBJECTIVE_SCALE: f64 = 1.0;

/// Euclidean distances are multiplied by this factor and rounded
pub const GEOMETRIC_OBJECTIVE_SCALE: f64 = 100.0;

/// Dense symmetric all-pairs distance matrix stored row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<Length>,
}

impl DistanceMatrix {
    /// Build a matrix from explicit rows.
    ///
    /// Rows must form a square matrix with a zero diagonal and symmetric entries.
    pub fn from_rows(rows: Vec<Vec<Length>>) -> Result<Self> {
        let n = rows.len();
        let mut data = Vec::with_capacity(n * n);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n {
                return Err(Error::invalid_instance(format!(
                    "row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            data.extend(row);
        }

        let matrix = DistanceMatrix { n, data };
        for i in 0..n {
            if matrix.get(i, i) != 0 {
                return Err(Error::invalid_instance(format!("non-zero diagonal at node {}", i)));
            }
            for j in i + 1..n {
                if matrix.get(i, j) != matrix.get(j, i) {
                    return Err(Error::invalid_instance(format!(
                        "asymmetric distance between {} and {}",
                        i, j
                    )));
                }
            }
        }
        Ok(matrix)
    }

    /// Shortest-path distances over an undirected edge list.
    ///
    /// Duplicate edges keep the last length seen.
    pub fn from_edges(n: usize, edges: &[Edge]) -> Self {
        let mut matrix = DistanceMatrix {
            n,
            data: vec![INFINITE_DISTANCE; n * n],
        };
        for i in 0..n {
            matrix.data[i * n + i] = 0;
        }
        for e in edges {
            if e.source == e.target {
                continue;
            }
            matrix.data[e.source * n + e.target] = e.length;
            matrix.data[e.target * n + e.source] = e.length;
        }
        matrix.relax_all_pairs();
        matrix
    }

    /// Euclidean distances scaled by `scale` and rounded to the nearest integer
    pub fn from_coordinates(nodes: &[Node], scale: f64) -> Self {
        let n = nodes.len();
        let mut data = vec![0; n * n];
        if n > 0 {
            data.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
                let a = nodes[i];
                for (j, slot) in row.iter_mut().enumerate() {
                    if i != j {
                        let b = nodes[j];
                        *slot = (scale * (a.x - b.x).hypot(a.y - b.y)).round() as Length;
                    }
                }
            });
        }
        DistanceMatrix { n, data }
    }

    /// Floyd-Warshall relaxation, parallel over rows.
    ///
    /// Row `k` does not change during pass `k`, so it is copied once per pass
    /// and every other row can be relaxed independently.
    fn relax_all_pairs(&mut self) {
        let n = self.n;
        if n == 0 {
            return;
        }
        let mut k_row = vec![0; n];
        for k in 0..n {
            k_row.copy_from_slice(&self.data[k * n..(k + 1) * n]);
            let through_k = &k_row;
            self.data.par_chunks_mut(n).for_each(|row| {
                let to_k = row[k];
                if to_k == INFINITE_DISTANCE {
                    return;
                }
                for (d, &from_k) in row.iter_mut().zip(through_k.iter()) {
                    let via = to_k.saturating_add(from_k);
                    if via < *d {
                        *d = via;
                    }
                }
            });
        }
    }

    /// Number of nodes
    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Get the distance between two nodes
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Length {
        self.data[i * self.n + j]
    }

    /// All distances from node `i`
    #[inline]
    pub fn row(&self, i: usize) -> &[Length] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    /// True when every pair of nodes is at a finite distance
    pub fn is_connected(&self) -> bool {
        !self.data.contains(&INFINITE_DISTANCE)
    }

    /// Largest finite distance in the matrix
    pub fn diameter(&self) -> Length {
        self.data
            .iter()
            .copied()
            .filter(|&d| d != INFINITE_DISTANCE)
            .max()
            .unwrap_or(0)
    }
}

/// For every node, all nodes ordered by ascending distance (ties by node id)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborIndex {
    n: usize,
    order: Vec<u32>,
}

impl NeighborIndex {
    pub fn new(matrix: &DistanceMatrix) -> Self {
        let n = matrix.len();
        let mut order = vec![0u32; n * n];
        if n > 0 {
            order.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
                for (j, slot) in row.iter_mut().enumerate() {
                    *slot = j as u32;
                }
                let distances = matrix.row(i);
                row.sort_unstable_by_key(|&j| (distances[j as usize], j));
            });
        }
        NeighborIndex { n, order }
    }

    /// Nodes sorted by distance from `i`, starting with `i` itself
    #[inline]
    pub fn row(&self, i: usize) -> &[u32] {
        &self.order[i * self.n..(i + 1) * self.n]
    }

    /// Nodes strictly closer to `v` than `radius`, nearest first
    pub fn within<'a>(
        &'a self,
        matrix: &'a DistanceMatrix,
        v: usize,
        radius: Length,
    ) -> impl Iterator<Item = usize> + 'a {
        let distances = matrix.row(v);
        self.row(v)
            .iter()
            .map(|&u| u as usize)
            .take_while(move |&u| distances[u] < radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortest_paths_on_chain() {
        let edges = vec![Edge::new(0, 1, 2), Edge::new(1, 2, 3), Edge::new(2, 3, 4)];
        let matrix = DistanceMatrix::from_edges(4, &edges);

        assert_eq!(matrix.get(0, 3), 9);
        assert_eq!(matrix.get(3, 0), 9);
        assert_eq!(matrix.get(1, 3), 7);
        assert_eq!(matrix.get(2, 2), 0);
        assert!(matrix.is_connected());
        assert_eq!(matrix.diameter(), 9);
    }

    #[test]
    fn test_shortcut_is_found() {
        let edges = vec![Edge::new(0, 1, 10), Edge::new(0, 2, 1), Edge::new(2, 1, 2)];
        let matrix = DistanceMatrix::from_edges(3, &edges);
        assert_eq!(matrix.get(0, 1), 3);
    }

    #[test]
    fn test_duplicate_edge_keeps_last_length() {
        let edges = vec![Edge::new(0, 1, 1), Edge::new(1, 0, 6)];
        let matrix = DistanceMatrix::from_edges(2, &edges);
        assert_eq!(matrix.get(0, 1), 6);
    }

    #[test]
    fn test_disconnected_graph() {
        let edges = vec![Edge::new(0, 1, 1)];
        let matrix = DistanceMatrix::from_edges(3, &edges);
        assert!(!matrix.is_connected());
        assert_eq!(matrix.get(0, 2), INFINITE_DISTANCE);
    }

    #[test]
    fn test_scaled_euclidean() {
        let nodes = vec![Node::new(0, 0.0, 0.0), Node::new(1, 3.0, 4.0), Node::new(2, 1.0, 1.0)];
        let matrix = DistanceMatrix::from_coordinates(&nodes, GEOMETRIC_OBJECTIVE_SCALE);

        assert_eq!(matrix.get(0, 1), 500);
        assert_eq!(matrix.get(1, 0), 500);
        // sqrt(2) * 100 = 141.42...
        assert_eq!(matrix.get(0, 2), 141);
        assert_eq!(matrix.get(2, 2), 0);
    }

    #[test]
    fn test_from_rows_validation() {
        assert!(DistanceMatrix::from_rows(vec![vec![0, 1], vec![1, 0]]).is_ok());
        assert!(DistanceMatrix::from_rows(vec![vec![0, 1], vec![2, 0]]).is_err());
        assert!(DistanceMatrix::from_rows(vec![vec![1, 1], vec![1, 0]]).is_err());
        assert!(DistanceMatrix::from_rows(vec![vec![0, 1, 2], vec![1, 0]]).is_err());
    }

    #[test]
    fn test_neighbor_order_breaks_ties_by_id() {
        let matrix = DistanceMatrix::from_rows(vec![
            vec![0, 5, 2, 2],
            vec![5, 0, 1, 3],
            vec![2, 1, 0, 4],
            vec![2, 3, 4, 0],
        ])
        .unwrap();
        let index = NeighborIndex::new(&matrix);

        assert_eq!(index.row(0), &[0, 2, 3, 1]);
        assert_eq!(index.row(1), &[1, 2, 3, 0]);

        let close: Vec<usize> = index.within(&matrix, 0, 5).collect();
        assert_eq!(close, vec![0, 2, 3]);
        let closer: Vec<usize> = index.within(&matrix, 0, 2).collect();
        assert_eq!(closer, vec![0]);
    }
}

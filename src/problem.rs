//! Immutable solver input built from a parsed instance.

use crate::error::{Error, Result};
use crate::graph::{
    DistanceMatrix, Length, NeighborIndex, GEOMETRIC_OBJECTIVE_SCALE, INFINITE_DISTANCE,
    TOPOLOGICAL_OBJECTIVE_SCALE,
};
use crate::instance::{PCenterInstance, Topology};
use std::time::Instant;

/// Distance matrix, neighbor index and facility budget of one instance
#[derive(Debug, Clone)]
pub struct Problem {
    /// Name of the instance
    pub name: String,
    /// Number of facilities to open (P)
    pub center_count: usize,
    /// Factor between integral distances and the reported objective
    pub objective_scale: f64,
    distances: DistanceMatrix,
    neighbors: NeighborIndex,
}

impl Problem {
    /// Validate an instance and run the preprocessing it needs
    pub fn from_instance(instance: &PCenterInstance) -> Result<Self> {
        instance.validate()?;

        let start = Instant::now();
        let (distances, scale) = match &instance.topology {
            Topology::Edges(edges) => (
                DistanceMatrix::from_edges(instance.node_count, edges),
                TOPOLOGICAL_OBJECTIVE_SCALE,
            ),
            Topology::Coordinates(nodes) => (
                DistanceMatrix::from_coordinates(nodes, GEOMETRIC_OBJECTIVE_SCALE),
                GEOMETRIC_OBJECTIVE_SCALE,
            ),
        };
        log::info!(
            "{}: distance matrix for {} nodes built in {:.3}s",
            instance.name,
            instance.node_count,
            start.elapsed().as_secs_f64()
        );

        let mut problem = Self::from_matrix(&instance.name, distances, instance.center_count)?;
        problem.objective_scale = scale;
        Ok(problem)
    }

    /// Wrap an already computed distance matrix
    pub fn from_matrix(name: &str, distances: DistanceMatrix, center_count: usize) -> Result<Self> {
        let n = distances.len();
        if n == 0 {
            return Err(Error::invalid_instance("instance has no nodes"));
        }
        if center_count == 0 || center_count >= n {
            return Err(Error::InfeasibleConfiguration { centers: center_count, nodes: n });
        }
        if !distances.is_connected() {
            return Err(Error::invalid_instance("graph is not connected"));
        }

        let neighbors = NeighborIndex::new(&distances);
        Ok(Problem {
            name: name.to_string(),
            center_count,
            objective_scale: TOPOLOGICAL_OBJECTIVE_SCALE,
            distances,
            neighbors,
        })
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.distances.len()
    }

    #[inline]
    pub fn distances(&self) -> &DistanceMatrix {
        &self.distances
    }

    #[inline]
    pub fn neighbors(&self) -> &NeighborIndex {
        &self.neighbors
    }

    /// Objective value in instance units
    pub fn scaled(&self, radius: Length) -> f64 {
        radius as f64 / self.objective_scale
    }

    /// Coverage radius of a center set computed from scratch
    pub fn cover_radius(&self, centers: &[usize]) -> Length {
        if centers.is_empty() {
            return INFINITE_DISTANCE;
        }
        (0..self.node_count())
            .map(|v| {
                centers
                    .iter()
                    .map(|&c| self.distances.get(c, v))
                    .min()
                    .unwrap_or(INFINITE_DISTANCE)
            })
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{Edge, Node};
    use crate::test_support::scenario_matrix;

    #[test]
    fn test_cover_radius_from_scratch() {
        let problem = Problem::from_matrix("a", scenario_matrix(), 2).unwrap();
        assert_eq!(problem.cover_radius(&[1, 2]), 2);
        assert_eq!(problem.cover_radius(&[0, 3]), 2);
        assert_eq!(problem.cover_radius(&[0, 1]), 5);
        assert_eq!(problem.cover_radius(&[]), INFINITE_DISTANCE);
    }

    #[test]
    fn test_rejects_bad_center_count() {
        assert!(matches!(
            Problem::from_matrix("a", scenario_matrix(), 4),
            Err(Error::InfeasibleConfiguration { centers: 4, nodes: 4 })
        ));
        assert!(Problem::from_matrix("a", scenario_matrix(), 0).is_err());
    }

    #[test]
    fn test_rejects_disconnected_graph() {
        let instance = PCenterInstance {
            name: "split".to_string(),
            comment: String::new(),
            node_count: 4,
            center_count: 1,
            topology: Topology::Edges(vec![Edge::new(0, 1, 1), Edge::new(2, 3, 1)]),
        };
        assert!(matches!(
            Problem::from_instance(&instance),
            Err(Error::InvalidInstance(_))
        ));
    }

    #[test]
    fn test_geometric_scale() {
        let instance = PCenterInstance {
            name: "geo".to_string(),
            comment: String::new(),
            node_count: 3,
            center_count: 1,
            topology: Topology::Coordinates(vec![
                Node::new(0, 0.0, 0.0),
                Node::new(1, 1.5, 0.0),
                Node::new(2, 3.0, 0.0),
            ]),
        };
        let problem = Problem::from_instance(&instance).unwrap();

        assert_eq!(problem.objective_scale, GEOMETRIC_OBJECTIVE_SCALE);
        assert_eq!(problem.cover_radius(&[1]), 150);
        assert!((problem.scaled(150) - 1.5).abs() < 1e-12);
    }
}

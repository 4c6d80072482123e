//! Tabu memory over (added, removed) facility pairs.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tabu tenure parameters.
///
/// A worker draws its base tenure once:
/// `floor(node_factor * N) + rand[0, max(1, floor(center_factor * P)))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenureConfig {
    pub node_factor: f64,
    pub center_factor: f64,
}

impl TenureConfig {
    pub fn new(node_factor: f64, center_factor: f64) -> Self {
        TenureConfig { node_factor, center_factor }
    }

    /// Draw the base tenure for an instance with `node_count` nodes and `center_count` centers
    pub fn draw<R: Rng + ?Sized>(&self, node_count: usize, center_count: usize, rng: &mut R) -> u64 {
        let base = (self.node_factor.max(0.0) * node_count as f64).floor() as u64;
        let span = ((self.center_factor.max(0.0) * center_count as f64).floor() as u64).max(1);
        base + rng.gen_range(0..span)
    }
}

impl Default for TenureConfig {
    fn default() -> Self {
        Self::new(2.0, 1.0)
    }
}

/// Step until which swapping `add` in and `remove` out is forbidden.
///
/// Stored as a dense N x N table; a move is tabu while `step < until[add][remove]`.
#[derive(Debug, Clone)]
pub struct TabuMemory {
    n: usize,
    until: Vec<u64>,
}

impl TabuMemory {
    pub fn new(n: usize) -> Self {
        TabuMemory {
            n,
            until: vec![0; n * n],
        }
    }

    #[inline]
    pub fn is_tabu(&self, add: usize, remove: usize, step: u64) -> bool {
        step < self.until[add * self.n + remove]
    }

    /// Forbid the pair in both directions until `until`
    pub fn forbid(&mut self, a: usize, b: usize, until: u64) {
        self.until[a * self.n + b] = until;
        self.until[b * self.n + a] = until;
    }
}

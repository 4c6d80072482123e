//! Solver configuration, loadable from and savable to JSON.

use crate::error::Result;
use crate::heuristics::tabu_search::TabuSearchConfig;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Parameters of one multi-worker solve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Wall-clock budget in seconds, shared by all workers
    pub time_limit: f64,
    /// Number of worker threads (0 = available parallelism)
    pub workers: usize,
    /// Worker `i` is seeded with `seed + i`
    pub seed: u64,
    #[serde(flatten)]
    pub search: TabuSearchConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            time_limit: 60.0,
            workers: 0,
            seed: 0,
            search: TabuSearchConfig::default(),
        }
    }
}

impl SolverConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Worker count with 0 resolved to the machine's parallelism
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }

    /// Seed of worker `worker`
    pub fn worker_seed(&self, worker: usize) -> u64 {
        self.seed.wrapping_add(worker as u64)
    }
}

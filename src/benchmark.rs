//! Benchmarking and experimentation module for the p-center solver.
//!
//! Runs the parallel tabu search several times per instance, collects
//! per-run results and per-instance statistics, and exports both.

use crate::config::SolverConfig;
use crate::error::{Error, Result};
use crate::graph::Length;
use crate::heuristics::parallel::ParallelTabuSearch;
use crate::instance::PCenterInstance;
use crate::problem::Problem;
use crate::references::{gap_percent, reaches_reference, NoTargets, TargetLookup};

use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Result of one solver run on an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Instance name
    pub instance: String,
    /// Run index, also the base seed of the run
    pub run: usize,
    /// Local time at which the run finished
    pub timestamp: String,
    pub node_count: usize,
    pub center_count: usize,
    /// Coverage radius in integral units (absent if every worker failed)
    pub cover_radius: Option<Length>,
    /// Coverage radius in instance units
    pub objective: Option<f64>,
    /// Whether solution is feasible
    pub feasible: bool,
    /// Computation time in seconds
    pub time: f64,
    /// Iterations of the winning worker
    pub iterations: Option<u64>,
    /// Reference objective (if available)
    pub reference: Option<f64>,
    /// Gap to the reference in percent
    pub gap: Option<f64>,
    /// Radius reaches the reference, up to its rounding
    pub hit: bool,
}

/// Aggregated statistics for one instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkStatistics {
    pub instance: String,
    pub center_count: usize,
    /// Number of runs
    pub runs: usize,
    /// Number of runs with a feasible solution
    pub num_feasible: usize,
    pub best: f64,
    pub worst: f64,
    pub mean: f64,
    /// Population standard deviation of the objective
    pub std_dev: f64,
    pub avg_time: f64,
    pub reference: Option<f64>,
    /// Gap of the best run to the reference, in percent
    pub best_gap: Option<f64>,
    /// Runs reaching the reference
    pub hits: usize,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of runs per instance
    pub num_runs: usize,
    /// Solver parameters; the seed is replaced by the run index
    pub solver: SolverConfig,
    /// Stop a run as soon as it reaches the reference value
    pub use_targets: bool,
    /// Show a progress bar
    pub progress: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            num_runs: 5,
            solver: SolverConfig::default(),
            use_targets: false,
            progress: true,
        }
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<RunResult>,
    references: Box<dyn TargetLookup + Send + Sync>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
            references: Box::new(NoTargets),
        }
    }

    /// Use `references` for gaps and (optionally) early-stop targets
    pub fn with_references<T: TargetLookup + Send + Sync + 'static>(mut self, references: T) -> Self {
        self.references = Box::new(references);
        self
    }

    /// Run every configured run on one instance
    pub fn run_instance(&mut self, instance: &PCenterInstance) -> Result<()> {
        let problem = Problem::from_instance(instance)?;
        let progress = self.progress_bar(self.config.num_runs as u64);
        self.run_problem(&problem, &progress)?;
        progress.finish_and_clear();
        Ok(())
    }

    /// Run benchmark on multiple instances
    pub fn run_on_instances(&mut self, instances: &[PCenterInstance]) -> Result<()> {
        let progress = self.progress_bar((instances.len() * self.config.num_runs) as u64);
        for instance in instances {
            match Problem::from_instance(instance) {
                Ok(problem) => self.run_problem(&problem, &progress)?,
                Err(e) => {
                    log::warn!("skipping {}: {}", instance.name, e);
                    progress.inc(self.config.num_runs as u64);
                }
            }
        }
        progress.finish_with_message("done");
        Ok(())
    }

    fn run_problem(&mut self, problem: &Problem, progress: &ProgressBar) -> Result<()> {
        log::info!("Running benchmark on instance: {}", problem.name);
        let reference = self.references.reference(&problem.name, problem.center_count);

        for run in 0..self.config.num_runs {
            progress.set_message(format!("{} run {}", problem.name, run));
            let mut config = self.config.solver.clone();
            config.seed = run as u64;
            if self.config.use_targets {
                config.search.target_from(&*self.references, problem);
            }

            let solver = ParallelTabuSearch::new(problem, config);
            let result = match solver.solve() {
                Ok(solution) => RunResult {
                    instance: problem.name.clone(),
                    run,
                    timestamp: Local::now().to_rfc3339(),
                    node_count: problem.node_count(),
                    center_count: problem.center_count,
                    cover_radius: Some(solution.cover_radius),
                    objective: Some(solution.objective),
                    feasible: solution.feasible,
                    time: solution.computation_time,
                    iterations: solution.iterations,
                    reference,
                    gap: reference.and_then(|r| gap_percent(solution.objective, r)),
                    hit: solution.feasible
                        && reference.map_or(false, |r| {
                            reaches_reference(solution.cover_radius, r, problem.objective_scale)
                        }),
                },
                Err(Error::NoFeasibleSolution) => {
                    log::warn!("{} run {}: no feasible solution", problem.name, run);
                    RunResult {
                        instance: problem.name.clone(),
                        run,
                        timestamp: Local::now().to_rfc3339(),
                        node_count: problem.node_count(),
                        center_count: problem.center_count,
                        cover_radius: None,
                        objective: None,
                        feasible: false,
                        time: self.config.solver.time_limit,
                        iterations: None,
                        reference,
                        gap: None,
                        hit: false,
                    }
                }
                Err(e) => return Err(e),
            };
            self.results.push(result);
            progress.inc(1);
        }
        Ok(())
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.config.progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        if let Ok(style) =
            ProgressStyle::with_template("{bar:40} {pos}/{len} [{elapsed_precise}] {msg}")
        {
            bar.set_style(style);
        }
        bar
    }

    /// Compute statistics for each instance, in order of first appearance
    pub fn compute_statistics(&self) -> Vec<BenchmarkStatistics> {
        let mut order: Vec<&str> = Vec::new();
        let mut by_instance: HashMap<&str, Vec<&RunResult>> = HashMap::new();
        for result in &self.results {
            by_instance
                .entry(result.instance.as_str())
                .or_insert_with(|| {
                    order.push(result.instance.as_str());
                    Vec::new()
                })
                .push(result);
        }

        let mut statistics = Vec::new();
        for name in order {
            let results = &by_instance[name];
            let objectives: Vec<f64> = results
                .iter()
                .filter(|r| r.feasible)
                .filter_map(|r| r.objective)
                .collect();
            if objectives.is_empty() {
                continue;
            }
            let times: Vec<f64> = results.iter().map(|r| r.time).collect();

            let best = objectives.iter().copied().map(OrderedFloat).min().map_or(f64::NAN, |o| o.0);
            let worst = objectives.iter().copied().map(OrderedFloat).max().map_or(f64::NAN, |o| o.0);
            let reference = results[0].reference;
            let hits = results.iter().filter(|r| r.hit).count();

            statistics.push(BenchmarkStatistics {
                instance: name.to_string(),
                center_count: results[0].center_count,
                runs: results.len(),
                num_feasible: objectives.len(),
                best,
                worst,
                mean: statrs::statistics::Statistics::mean(objectives.iter()),
                std_dev: statrs::statistics::Statistics::population_std_dev(objectives.iter()),
                avg_time: statrs::statistics::Statistics::mean(times.iter()),
                reference,
                best_gap: reference.and_then(|r| gap_percent(best, r)),
                hits,
            });
        }

        statistics
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for result in &self.results {
            writer.serialize(result)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for stat in self.compute_statistics() {
            writer.serialize(stat)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("       p-center Benchmark Report\n");
        report.push_str("========================================\n\n");

        let stats = self.compute_statistics();

        report.push_str("Instance Summary:\n");
        report.push_str("-".repeat(96).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<20} {:>5} {:>9} {:>10} {:>10} {:>10} {:>8} {:>10} {:>9}\n",
            "Instance", "P", "Feasible", "Best", "Mean", "Std", "Hits", "Gap%", "Avg Time"
        ));
        report.push_str("-".repeat(96).as_str());
        report.push('\n');

        for stat in &stats {
            let gap_str = stat
                .best_gap
                .map(|g| format!("{:.2}%", g))
                .unwrap_or_else(|| "-".to_string());
            let hits_str = if stat.reference.is_some() {
                format!("{}/{}", stat.hits, stat.runs)
            } else {
                "-".to_string()
            };

            report.push_str(&format!(
                "{:<20} {:>5} {:>9} {:>10.2} {:>10.2} {:>10.2} {:>8} {:>10} {:>9.3}\n",
                stat.instance,
                stat.center_count,
                format!("{}/{}", stat.num_feasible, stat.runs),
                stat.best,
                stat.mean,
                stat.std_dev,
                hits_str,
                gap_str,
                stat.avg_time
            ));
        }

        report.push_str("-".repeat(96).as_str());
        report.push('\n');

        let mut hardest: Vec<&BenchmarkStatistics> =
            stats.iter().filter(|s| s.best_gap.is_some()).collect();
        hardest.sort_by_key(|s| std::cmp::Reverse(OrderedFloat(s.best_gap.unwrap_or(0.0))));
        if !hardest.is_empty() {
            report.push_str("\nLargest gaps to reference:\n");
            for stat in hardest.iter().take(5) {
                report.push_str(&format!(
                    "  {}: {:.2} vs {:.2} ({:.2}%)\n",
                    stat.instance,
                    stat.best,
                    stat.reference.unwrap_or(f64::NAN),
                    stat.best_gap.unwrap_or(0.0)
                ));
            }
        }

        report
    }

    /// Get all results
    pub fn results(&self) -> &[RunResult] {
        &self.results
    }
}

/// Load every instance file (`.txt`, `.tsp`, `.json`) of a directory.
///
/// Files that fail to parse are skipped with a warning. Instances are sorted
/// by node count, then name.
pub fn load_instances_from_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<PCenterInstance>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map(|e| e == "txt" || e == "tsp" || e == "json")
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut instances = Vec::new();
    for path in paths {
        match PCenterInstance::from_file(&path) {
            Ok(instance) => instances.push(instance),
            Err(e) => log::warn!("skipping {}: {}", path.display(), e),
        }
    }

    instances.sort_by(|a, b| a.node_count.cmp(&b.node_count).then_with(|| a.name.cmp(&b.name)));
    Ok(instances)
}

/// One instance per requested center count, named `name.pP`.
///
/// Instances are returned unchanged when `center_counts` is empty.
pub fn expand_center_counts(instances: Vec<PCenterInstance>, center_counts: &[usize]) -> Vec<PCenterInstance> {
    if center_counts.is_empty() {
        return instances;
    }
    instances
        .into_iter()
        .flat_map(|instance| {
            center_counts.iter().map(move |&p| {
                let mut copy = instance.clone().with_centers(p);
                copy.name = format!("{}.p{}", instance.name, p);
                copy
            })
        })
        .collect()
}

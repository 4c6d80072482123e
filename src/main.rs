//! p-center Solver - Command Line Interface
//!
//! Tabu search for the p-center facility location problem.

use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use p_center_solver::benchmark::{expand_center_counts, load_instances_from_dir, Benchmark, BenchmarkConfig};
use p_center_solver::heuristics::construction::ConstructionStrategy;
use p_center_solver::heuristics::parallel::ParallelTabuSearch;
use p_center_solver::instance::PCenterInstance;
use p_center_solver::problem::Problem;
use p_center_solver::references::{gap_percent, target_radius, ReferenceValues, TargetLookup};
use p_center_solver::solution::Solution;
use p_center_solver::visualization::Visualizer;
use p_center_solver::SolverConfig;

use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "p-center-solver")]
#[command(version = "1.0")]
#[command(about = "A parallel tabu search solver for the p-center problem")]
struct Cli {
    /// Debug logging (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve one instance
    Solve {
        #[arg(short, long)]
        instance: PathBuf,

        /// Number of centers (overrides the instance file)
        #[arg(short = 'p', long)]
        centers: Option<usize>,

        /// JSON solver configuration; explicit options below override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Time limit in seconds
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Number of workers (0 = one per core)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Base random seed; worker i uses seed + i
        #[arg(short, long)]
        seed: Option<u64>,

        /// Iteration cap per worker
        #[arg(long)]
        max_iterations: Option<u64>,

        /// Stop once the radius reaches this value (instance units)
        #[arg(long)]
        target: Option<f64>,

        #[arg(long, value_enum)]
        construction: Option<Construction>,

        /// CSV of reference values (instance,value)
        #[arg(long)]
        references: Option<PathBuf>,

        /// Use the reference value of the instance as target
        #[arg(long, requires = "references")]
        use_target: bool,

        /// Output solution to file (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the effective configuration to this file
        #[arg(long)]
        save_config: Option<PathBuf>,

        /// Generate SVG visualization (geometric instances only)
        #[arg(long)]
        visualize: Option<PathBuf>,

        /// Also render the visualization as PNG
        #[arg(long, requires = "visualize")]
        png: bool,

        /// Export node / center data for external plotting
        #[arg(long)]
        plot_data: Option<PathBuf>,
    },

    /// Run benchmarks on a directory of instances
    Benchmark {
        /// Directory containing instance files
        #[arg(short, long)]
        dir: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Number of runs per instance
        #[arg(short, long, default_value = "5")]
        runs: usize,

        /// Center counts to solve coordinate instances with (comma separated)
        #[arg(short = 'p', long, value_delimiter = ',')]
        centers: Vec<usize>,

        /// JSON solver configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Time limit per run
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Number of workers per run
        #[arg(short, long)]
        workers: Option<usize>,

        /// CSV of reference values (instance,value)
        #[arg(long)]
        references: Option<PathBuf>,

        /// Stop runs early once they reach the reference value
        #[arg(long, requires = "references")]
        use_targets: bool,

        /// Maximum instance size
        #[arg(long)]
        max_size: Option<usize>,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance file
        #[arg(short, long)]
        instance: PathBuf,
    },

    /// Check a solution file against its instance
    Check {
        #[arg(short, long)]
        instance: PathBuf,

        /// Solution JSON written by `solve --output`
        #[arg(short, long)]
        solution: PathBuf,

        /// Number of centers (overrides the instance file)
        #[arg(short = 'p', long)]
        centers: Option<usize>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum Construction {
    /// Best-improvement opening around the bottleneck node
    Greedy,
    /// Random candidate around the bottleneck node
    Random,
}

impl From<Construction> for ConstructionStrategy {
    fn from(c: Construction) -> Self {
        match c {
            Construction::Greedy => ConstructionStrategy::Greedy,
            Construction::Random => ConstructionStrategy::Random,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    match cli.command {
        Commands::Solve {
            instance,
            centers,
            config,
            time_limit,
            workers,
            seed,
            max_iterations,
            target,
            construction,
            references,
            use_target,
            output,
            save_config,
            visualize,
            png,
            plot_data,
        } => {
            let mut solver_config = load_config(config.as_deref());
            if let Some(t) = time_limit {
                solver_config.time_limit = t;
            }
            if let Some(w) = workers {
                solver_config.workers = w;
            }
            if let Some(s) = seed {
                solver_config.seed = s;
            }
            if max_iterations.is_some() {
                solver_config.search.max_iterations = max_iterations;
            }
            if let Some(c) = construction {
                solver_config.search.construction = c.into();
            }

            let options = SolveOptions {
                centers,
                target,
                references,
                use_target,
                output,
                save_config,
                visualize,
                png,
                plot_data,
            };
            solve_instance(&instance, solver_config, options);
        }

        Commands::Benchmark {
            dir,
            output,
            runs,
            centers,
            config,
            time_limit,
            workers,
            references,
            use_targets,
            max_size,
        } => {
            let mut solver_config = load_config(config.as_deref());
            if let Some(t) = time_limit {
                solver_config.time_limit = t;
            }
            if let Some(w) = workers {
                solver_config.workers = w;
            }
            let benchmark_config = BenchmarkConfig {
                num_runs: runs,
                solver: solver_config,
                use_targets,
                progress: true,
            };
            run_benchmark(&dir, &output, benchmark_config, &centers, references.as_deref(), max_size);
        }

        Commands::Analyze { instance } => {
            analyze_instance(&instance);
        }

        Commands::Check { instance, solution, centers } => {
            check_solution(&instance, &solution, centers);
        }
    }
}

struct SolveOptions {
    centers: Option<usize>,
    target: Option<f64>,
    references: Option<PathBuf>,
    use_target: bool,
    output: Option<PathBuf>,
    save_config: Option<PathBuf>,
    visualize: Option<PathBuf>,
    png: bool,
    plot_data: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> SolverConfig {
    let Some(path) = path else {
        return SolverConfig::default();
    };
    match SolverConfig::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration {:?}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn load_instance(path: &Path, centers: Option<usize>) -> (PCenterInstance, Problem) {
    let mut instance = match PCenterInstance::from_file(path) {
        Ok(inst) => inst,
        Err(e) => {
            eprintln!("Error loading instance: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(p) = centers {
        instance = instance.with_centers(p);
    }

    match Problem::from_instance(&instance) {
        Ok(problem) => (instance, problem),
        Err(e) => {
            eprintln!("Invalid instance {}: {}", instance.name, e);
            std::process::exit(1);
        }
    }
}

fn load_references(path: &Path) -> ReferenceValues {
    match ReferenceValues::from_csv_path(path) {
        Ok(references) => references,
        Err(e) => {
            eprintln!("Error loading reference values {:?}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn solve_instance(path: &Path, mut config: SolverConfig, options: SolveOptions) {
    println!("Loading instance from {:?}...", path);
    let (instance, problem) = load_instance(path, options.centers);
    log::debug!("\n{}", instance.statistics());

    let references = options.references.as_deref().map(load_references);
    let reference = references
        .as_ref()
        .and_then(|r| r.reference(&problem.name, problem.center_count));

    if let Some(target) = options.target {
        config.search.target = Some(target_radius(target, problem.objective_scale));
    } else if options.use_target {
        let resolved = references
            .as_ref()
            .and_then(|r| config.search.target_from(r, &problem));
        if resolved.is_none() {
            log::warn!("no reference value for {}, running without target", problem.name);
        }
    }

    if let Some(save_path) = &options.save_config {
        if let Err(e) = config.save(save_path) {
            eprintln!("Error saving configuration: {}", e);
        } else {
            println!("Configuration saved to {:?}", save_path);
        }
    }

    println!(
        "Solving {} (N = {}, P = {}) with {} workers for {}s...",
        problem.name,
        problem.node_count(),
        problem.center_count,
        config.effective_workers(),
        config.time_limit
    );
    let start = Instant::now();

    let solution = match ParallelTabuSearch::new(&problem, config).solve() {
        Ok(solution) => solution,
        Err(e) => {
            eprintln!("Solver failed: {}", e);
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed().as_secs_f64();

    println!("\n{}", solution);
    println!("Total time: {:.4}s", elapsed);
    if let Some(value) = reference {
        if let Some(gap) = gap_percent(solution.objective, value) {
            println!("Reference: {} (gap {:.2}%)", value, gap);
        }
    }

    if let Some(out_path) = &options.output {
        match solution.save_json(out_path) {
            Ok(_) => println!("Solution saved to {:?}", out_path),
            Err(e) => eprintln!("Error saving solution: {}", e),
        }
    }

    if options.visualize.is_none() && options.plot_data.is_none() {
        return;
    }
    let Some(nodes) = instance.nodes() else {
        eprintln!("Visualization needs node coordinates; {} is topological", instance.name);
        return;
    };
    let visualizer = Visualizer::new();

    if let Some(data_path) = &options.plot_data {
        let data = visualizer.export_plot_data(nodes, &problem, &solution);
        match std::fs::write(data_path, data) {
            Ok(_) => println!("Plot data exported to {:?}", data_path),
            Err(e) => eprintln!("Error exporting plot data: {}", e),
        }
    }

    if let Some(svg_path) = &options.visualize {
        let svg = visualizer.generate_svg(nodes, &problem, &solution);
        match visualizer.save_svg(&svg, svg_path) {
            Ok(_) => println!("Visualization saved to {:?}", svg_path),
            Err(e) => eprintln!("Error saving visualization: {}", e),
        }

        if options.png {
            let png_path = svg_path.with_extension("png");
            match visualizer.save_png(&svg, &png_path) {
                Ok(_) => println!("PNG saved to {:?}", png_path),
                Err(e) => eprintln!("Error rendering PNG: {}", e),
            }
        }
    }
}

fn run_benchmark(
    dir: &Path,
    output: &Path,
    config: BenchmarkConfig,
    centers: &[usize],
    references: Option<&Path>,
    max_size: Option<usize>,
) {
    println!("Loading instances from {:?}...", dir);

    let instances = match load_instances_from_dir(dir) {
        Ok(instances) => instances,
        Err(e) => {
            eprintln!("Error loading instances: {}", e);
            std::process::exit(1);
        }
    };
    let instances: Vec<_> = expand_center_counts(instances, centers)
        .into_iter()
        .filter(|inst| max_size.map_or(true, |max| inst.node_count <= max))
        .collect();

    if instances.is_empty() {
        eprintln!("No instances found in {:?}", dir);
        std::process::exit(1);
    }
    println!("Found {} instances", instances.len());

    if let Err(e) = std::fs::create_dir_all(output) {
        eprintln!("Error creating output directory: {}", e);
        std::process::exit(1);
    }

    let mut benchmark = Benchmark::new(config);
    if let Some(path) = references {
        benchmark = benchmark.with_references(load_references(path));
    }

    if let Err(e) = benchmark.run_on_instances(&instances) {
        eprintln!("Benchmark failed: {}", e);
        std::process::exit(1);
    }

    let results_path = output.join("results.csv");
    match benchmark.export_to_csv(&results_path) {
        Ok(_) => println!("Results exported to {:?}", results_path),
        Err(e) => eprintln!("Error exporting results: {}", e),
    }

    let stats_path = output.join("statistics.csv");
    match benchmark.export_statistics_csv(&stats_path) {
        Ok(_) => println!("Statistics exported to {:?}", stats_path),
        Err(e) => eprintln!("Error exporting statistics: {}", e),
    }

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = output.join("report.txt");
    if let Err(e) = std::fs::write(&report_path, &report) {
        eprintln!("Error writing report: {}", e);
    }
}

fn analyze_instance(path: &Path) {
    let instance = match PCenterInstance::from_file(path) {
        Ok(inst) => inst,
        Err(e) => {
            eprintln!("Error loading instance: {}", e);
            std::process::exit(1);
        }
    };

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    // Coordinate files may leave P to the command line
    let instance = if instance.center_count == 0 {
        instance.with_centers(1)
    } else {
        instance
    };
    let problem = match Problem::from_instance(&instance) {
        Ok(problem) => problem,
        Err(e) => {
            println!("Instance is not solvable as given: {}", e);
            return;
        }
    };

    let distances = problem.distances();
    let diameter = distances.diameter();
    // Radius of the best single center, an upper bound for any P
    let one_center = (0..problem.node_count())
        .map(|v| distances.row(v).iter().copied().max().unwrap_or(0))
        .min()
        .unwrap_or(0);

    println!("Distance Statistics:");
    println!("  Objective scale: {}", problem.objective_scale);
    println!("  Diameter: {}", problem.scaled(diameter));
    println!("  1-center radius: {}", problem.scaled(one_center));
}

fn check_solution(instance_path: &Path, solution_path: &Path, centers: Option<usize>) {
    let solution = match Solution::from_json_file(solution_path) {
        Ok(solution) => solution,
        Err(e) => {
            eprintln!("Error loading solution: {}", e);
            std::process::exit(1);
        }
    };
    let (_, problem) = load_instance(instance_path, centers.or_else(|| {
        // Coordinate files without a CENTERS header take P from the solution
        match PCenterInstance::from_file(instance_path) {
            Ok(inst) if inst.center_count == 0 => Some(solution.centers.len()),
            _ => None,
        }
    }));

    if solution.instance != problem.name {
        log::warn!(
            "solution belongs to {}, checking against {}",
            solution.instance,
            problem.name
        );
    }

    match solution.check(&problem) {
        Ok(radius) => {
            println!(
                "OK: {} centers, radius {} (objective {})",
                solution.centers.len(),
                radius,
                problem.scaled(radius)
            );
        }
        Err(e) => {
            eprintln!("INFEASIBLE: {}", e);
            std::process::exit(2);
        }
    }
}

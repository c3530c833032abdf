//! ACO TSP Solver - Command Line Interface
//!
//! Console front end for the ant colony engine.

use aco_tsp_solver::benchmark::{Benchmark, BenchmarkConfig};
use aco_tsp_solver::config::RunParameters;
use aco_tsp_solver::engine::{AntColony, RunOutcome};
use aco_tsp_solver::error::AcoResult;
use aco_tsp_solver::events::ColonyEvent;
use aco_tsp_solver::instance::DistanceMatrix;

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "aco-tsp-solver")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "Ant Colony Optimization for the Traveling Salesman Problem")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a graph and optimize a tour over it
    Solve {
        #[command(flatten)]
        params: ParamArgs,

        /// Write the run outcome as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the improvement history as CSV
        #[arg(long)]
        history: Option<PathBuf>,

        /// Print the initial ant trails
        #[arg(long)]
        show_ants: bool,

        /// Print the final pheromone matrix
        #[arg(long)]
        show_pheromones: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Repeat the optimization over several seeds
    Benchmark {
        #[command(flatten)]
        params: ParamArgs,

        /// Number of seeded runs
        #[arg(short, long, default_value = "5")]
        runs: usize,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Print statistics of a generated graph
    Analyze {
        /// Number of cities
        #[arg(short = 'n', long, default_value = "60")]
        cities: usize,

        /// Lower bound (inclusive) of distances
        #[arg(long, default_value = "1")]
        scatter_start: u32,

        /// Upper bound (exclusive) of distances
        #[arg(long, default_value = "9")]
        scatter_end: u32,

        /// Random seed
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// Print the full distance matrix
        #[arg(long)]
        show_matrix: bool,
    },
}

#[derive(Args, Debug, Clone)]
struct ParamArgs {
    /// Pheromone influence
    #[arg(long, default_value = "3")]
    alpha: f64,

    /// Distance influence
    #[arg(long, default_value = "2")]
    beta: f64,

    /// Pheromone evaporation rate
    #[arg(long, default_value = "0.01")]
    rho: f64,

    /// Pheromone deposit factor
    #[arg(short, long, default_value = "2.0")]
    q: f64,

    /// Number of cities
    #[arg(short = 'n', long, default_value = "60")]
    cities: usize,

    /// Number of ants
    #[arg(short, long, default_value = "20")]
    ants: usize,

    /// Number of iterations
    #[arg(short, long, default_value = "300")]
    iterations: usize,

    /// Lower bound (inclusive) of distances
    #[arg(long, default_value = "1")]
    scatter_start: u32,

    /// Upper bound (exclusive) of distances
    #[arg(long, default_value = "9")]
    scatter_end: u32,

    /// Random seed
    #[arg(short, long, default_value = "0")]
    seed: u64,

    /// Build ant trails on a single thread
    #[arg(long)]
    sequential: bool,
}

impl ParamArgs {
    fn to_parameters(&self) -> RunParameters {
        RunParameters {
            alpha: self.alpha,
            beta: self.beta,
            rho: self.rho,
            q: self.q,
            num_cities: self.cities,
            num_ants: self.ants,
            max_iterations: self.iterations,
            scatter_start: self.scatter_start,
            scatter_end: self.scatter_end,
            seed: self.seed,
            parallel: !self.sequential,
        }
    }
}

/// One row of the improvement history CSV
#[derive(Serialize)]
struct HistoryRow {
    iteration: Option<usize>,
    length: f64,
    elapsed_ms: u64,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Solve { params, output, history, show_ants, show_pheromones, verbose } => {
            solve(&params.to_parameters(), output, history, show_ants, show_pheromones, verbose)
        }

        Commands::Benchmark { params, runs, output } => {
            run_benchmark(&params.to_parameters(), runs, &output)
        }

        Commands::Analyze { cities, scatter_start, scatter_end, seed, show_matrix } => {
            analyze_graph(cities, scatter_start, scatter_end, seed, show_matrix)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn solve(
    params: &RunParameters,
    output: Option<PathBuf>,
    history: Option<PathBuf>,
    show_ants: bool,
    show_pheromones: bool,
    verbose: bool,
) -> AcoResult<()> {
    println!("\nAnt Colony Optimization for TSP\n");
    println!("Number of cities = {}", params.num_cities);
    println!("Number of ants = {}", params.num_ants);
    println!("Iterations = {}", params.max_iterations);
    println!("\nAlpha (pheromone influence) = {}", params.alpha);
    println!("Beta (distance influence) = {}", params.beta);
    println!("Rho (evaporation rate) = {:.2}", params.rho);
    println!("Q (deposit factor) = {:.2}", params.q);

    let mut colony = AntColony::new();
    let progress = colony.subscribe();

    let init = colony.initialize(params.clone())?;
    // The initialization result already carries what the event does
    progress.drain();

    if verbose {
        println!("\n{}", init.distances.statistics());
    }

    if show_ants {
        println!("\nInitial ant trails:");
        for (k, ant) in init.initial_ants.iter().enumerate() {
            println!("{}: {}", k, ant.summary(&init.distances));
        }
    }

    println!("\nBest initial trail length: {:.1}", init.initial_best_length);
    println!("{}", init.initial_best_tour);

    // Events only arrive on improvements, so the bar shows activity, not position
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.set_message(format!(
        "best {:.1} of {} iterations",
        init.initial_best_length, params.max_iterations
    ));

    colony.start()?;

    while let Some(event) = progress.recv() {
        if let Some(status) = progress_message(&event) {
            if matches!(event, ColonyEvent::NewBest { .. }) {
                bar.println(&status);
            }
            bar.set_message(status);
        }
        if event.is_terminal() {
            bar.finish();
            break;
        }
    }

    let outcome = colony.wait()?;
    print_outcome(&outcome, verbose);

    if show_pheromones {
        println!("\nFinal pheromone matrix:");
        print!("{}", outcome.pheromones);
    }

    if let Some(out_path) = output {
        let json = serde_json::to_string_pretty(&outcome)?;
        std::fs::write(&out_path, json)?;
        println!("\nOutcome saved to {:?}", out_path);
    }

    if let Some(history_path) = history {
        export_history(&outcome, &history_path)?;
        println!("History saved to {:?}", history_path);
    }

    Ok(())
}

/// One-line status for an event; `None` for events with nothing to report.
fn progress_message(event: &ColonyEvent) -> Option<String> {
    match event {
        ColonyEvent::NewBest { length, iteration, elapsed_ms, .. } => Some(format!(
            "New best length {:.1} found at iteration {} after {} ms",
            length, iteration, elapsed_ms
        )),
        ColonyEvent::Completed { length, elapsed_ms, .. } => Some(format!(
            "completed in {} ms, best {:.1}",
            elapsed_ms, length
        )),
        ColonyEvent::Stopped { length, iterations, .. } => Some(format!(
            "stopped after {} iterations, best {:.1}",
            iterations, length
        )),
        ColonyEvent::Aborted { message } => Some(format!("aborted: {}", message)),
        ColonyEvent::Initialized { .. } => None,
    }
}

fn print_outcome(outcome: &RunOutcome, verbose: bool) {
    println!("\n========== Results ==========");
    println!("State: {}", outcome.state);
    println!("Iterations: {}", outcome.iterations);
    println!("Time: {} ms", outcome.elapsed_ms);
    println!("Initial best length: {:.1}", outcome.initial_best_length);
    println!("Best length: {:.1}", outcome.best.length);
    if let Some(iteration) = outcome.best.iteration {
        println!("Found at iteration {} after {} ms", iteration, outcome.best.elapsed_ms);
    }
    println!("Improvements: {}", outcome.improvements.len());
    println!("\nBest trail found:");
    println!("{}", outcome.best.tour);

    if verbose {
        println!("\n{}", outcome.best.tour.summary(&outcome.distances));
    }
}

fn export_history(outcome: &RunOutcome, path: &Path) -> AcoResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.serialize(HistoryRow {
        iteration: None,
        length: outcome.initial_best_length,
        elapsed_ms: 0,
    })?;
    for record in &outcome.improvements {
        writer.serialize(HistoryRow {
            iteration: record.iteration,
            length: record.length,
            elapsed_ms: record.elapsed_ms,
        })?;
    }
    writer.flush()?;
    Ok(())
}

fn run_benchmark(params: &RunParameters, runs: usize, output: &Path) -> AcoResult<()> {
    params.validate()?;
    std::fs::create_dir_all(output)?;

    let config = BenchmarkConfig {
        num_runs: runs,
        base_seed: params.seed,
        parameters: params.clone(),
    };

    println!(
        "Benchmarking {} runs on {} cities ({} ants, {} iterations)...",
        runs, params.num_cities, params.num_ants, params.max_iterations
    );

    let bar = ProgressBar::new(runs as u64);
    let mut benchmark = Benchmark::new(config);
    benchmark.run_all(|result| {
        bar.set_message(format!("seed {} -> {:.1}", result.seed, result.best_length));
        bar.inc(1);
    })?;
    bar.finish();

    let results_path = output.join("results.csv");
    benchmark.export_to_csv(&results_path)?;
    println!("\nResults exported to {:?}", results_path);

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = output.join("report.txt");
    std::fs::write(&report_path, &report)?;
    println!("Report saved to {:?}", report_path);

    Ok(())
}

fn analyze_graph(
    cities: usize,
    scatter_start: u32,
    scatter_end: u32,
    seed: u64,
    show_matrix: bool,
) -> AcoResult<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let distances = DistanceMatrix::generate(cities, scatter_start, scatter_end, &mut rng)?;

    println!("========== Graph Analysis ==========\n");
    print!("{}", distances.statistics());

    if show_matrix {
        println!("\nDistance matrix:");
        for (i, row) in distances.rows().iter().enumerate() {
            let cells: Vec<String> = row.iter().map(|d| format!("{:>3}", d)).collect();
            println!("{:>3}: {}", i, cells.join(" "));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aco_tsp_solver::solution::Tour;

    #[test]
    fn test_progress_message_for_new_best() {
        let event = ColonyEvent::NewBest {
            length: 42.0,
            tour: Tour::new(vec![0, 1, 2]),
            iteration: 7,
            elapsed_ms: 3,
        };
        assert_eq!(
            progress_message(&event).unwrap(),
            "New best length 42.0 found at iteration 7 after 3 ms"
        );
    }

    #[test]
    fn test_progress_message_for_terminal_events() {
        let stopped = ColonyEvent::Stopped {
            length: 10.0,
            tour: Tour::new(vec![1, 0]),
            iterations: 12,
            elapsed_ms: 9,
        };
        assert_eq!(
            progress_message(&stopped).unwrap(),
            "stopped after 12 iterations, best 10.0"
        );

        let aborted = ColonyEvent::Aborted {
            message: "bad mass".to_string(),
        };
        assert_eq!(progress_message(&aborted).unwrap(), "aborted: bad mass");
    }
}

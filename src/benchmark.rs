//! Benchmarking and experimentation module.
//!
//! Runs the engine over a range of seeds, collects per-run results and
//! aggregates them into summary statistics.

use crate::config::RunParameters;
use crate::engine::{AntColony, EngineState};
use crate::error::AcoResult;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fs::File;
use std::path::Path;

/// Result of a single seeded run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Run index
    pub run: usize,
    /// Seed used for the run
    pub seed: u64,
    /// Number of cities
    pub num_cities: usize,
    /// Best length among the initial random ants
    pub initial_length: f64,
    /// Best length at the end of the run
    pub best_length: f64,
    /// Iteration at which the best tour was found (empty if never improved)
    pub best_iteration: Option<usize>,
    /// Number of strict improvements
    pub improvements: usize,
    /// Iterations actually executed
    pub iterations: usize,
    /// Wall time in milliseconds
    pub time_ms: u64,
}

/// Aggregated statistics over all runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkStatistics {
    pub num_runs: usize,
    pub mean_length: f64,
    pub std_length: f64,
    pub best_length: f64,
    pub worst_length: f64,
    /// Mean relative improvement over the initial random ants, in percent
    pub mean_improvement: f64,
    pub mean_time_ms: f64,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of seeded runs
    pub num_runs: usize,
    /// Seed of the first run; run `k` uses `base_seed + k`, wrapping at `u64::MAX`
    pub base_seed: u64,
    /// Parameters shared by every run (their seed is overridden)
    pub parameters: RunParameters,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            num_runs: 5,
            base_seed: 0,
            parameters: RunParameters::default(),
        }
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<RunResult>,
    started_at: DateTime<Utc>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Run a single seeded optimization to completion
    pub fn run_once(&self, run: usize) -> AcoResult<RunResult> {
        let seed = self.config.base_seed.wrapping_add(run as u64);
        let params = RunParameters {
            seed,
            ..self.config.parameters.clone()
        };

        let mut colony = AntColony::new();
        colony.initialize(params)?;
        let outcome = colony.run_to_completion()?;
        debug_assert_eq!(outcome.state, EngineState::Completed);

        Ok(RunResult {
            run,
            seed,
            num_cities: outcome.parameters.num_cities,
            initial_length: outcome.initial_best_length,
            best_length: outcome.best.length,
            best_iteration: outcome.best.iteration,
            improvements: outcome.improvements.len(),
            iterations: outcome.iterations,
            time_ms: outcome.elapsed_ms,
        })
    }

    /// Run every configured seed, calling `on_run` after each one
    pub fn run_all<F: FnMut(&RunResult)>(&mut self, mut on_run: F) -> AcoResult<()> {
        self.started_at = Utc::now();
        for run in 0..self.config.num_runs {
            let result = self.run_once(run)?;
            log::info!(
                "Run {} (seed {}): best {:.1} after {} iterations",
                result.run,
                result.seed,
                result.best_length,
                result.iterations
            );
            on_run(&result);
            self.results.push(result);
        }
        Ok(())
    }

    /// Compute statistics over the recorded runs
    pub fn compute_statistics(&self) -> Option<BenchmarkStatistics> {
        if self.results.is_empty() {
            return None;
        }

        let lengths: Vec<f64> = self.results.iter().map(|r| r.best_length).collect();
        let times: Vec<f64> = self.results.iter().map(|r| r.time_ms as f64).collect();
        let gains: Vec<f64> = self
            .results
            .iter()
            .map(|r| (r.initial_length - r.best_length) / r.initial_length * 100.0)
            .collect();

        let std_length = if lengths.len() > 1 {
            lengths.iter().std_dev()
        } else {
            0.0
        };

        Some(BenchmarkStatistics {
            num_runs: self.results.len(),
            mean_length: lengths.iter().mean(),
            std_length,
            best_length: lengths.iter().cloned().fold(f64::INFINITY, f64::min),
            worst_length: lengths.iter().cloned().fold(0.0, f64::max),
            mean_improvement: gains.iter().mean(),
            mean_time_ms: times.iter().mean(),
        })
    }

    /// Export per-run results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> AcoResult<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for result in &self.results {
            writer.serialize(result)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let params = &self.config.parameters;
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("        ACO TSP Benchmark Report\n");
        report.push_str("========================================\n\n");
        report.push_str(&format!("Started: {}\n", self.started_at.to_rfc3339()));
        report.push_str(&format!(
            "Cities: {}  Ants: {}  Iterations: {}\n",
            params.num_cities, params.num_ants, params.max_iterations
        ));
        report.push_str(&format!(
            "alpha={} beta={} rho={} q={} distances=[{}, {})\n\n",
            params.alpha, params.beta, params.rho, params.q, params.scatter_start, params.scatter_end
        ));

        report.push_str(&format!(
            "{:<6} {:>8} {:>12} {:>12} {:>10} {:>10}\n",
            "Run", "Seed", "Initial", "Best", "Found at", "Time ms"
        ));
        report.push_str("-".repeat(64).as_str());
        report.push('\n');
        for r in &self.results {
            let found = r
                .best_iteration
                .map(|i| i.to_string())
                .unwrap_or_else(|| "-".to_string());
            report.push_str(&format!(
                "{:<6} {:>8} {:>12.1} {:>12.1} {:>10} {:>10}\n",
                r.run, r.seed, r.initial_length, r.best_length, found, r.time_ms
            ));
        }
        report.push_str("-".repeat(64).as_str());
        report.push('\n');

        if let Some(stats) = self.compute_statistics() {
            report.push_str(&format!(
                "\nBest: {:.1}  Worst: {:.1}  Mean: {:.2} (std {:.2})\n",
                stats.best_length, stats.worst_length, stats.mean_length, stats.std_length
            ));
            report.push_str(&format!(
                "Mean improvement over initial ants: {:.2}%\n",
                stats.mean_improvement
            ));
            report.push_str(&format!("Mean time: {:.1} ms\n", stats.mean_time_ms));
        }

        report
    }

    /// Get all results
    pub fn results(&self) -> &[RunResult] {
        &self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> BenchmarkConfig {
        BenchmarkConfig {
            num_runs: 3,
            base_seed: 10,
            parameters: RunParameters {
                num_cities: 10,
                num_ants: 5,
                max_iterations: 15,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_benchmark_config() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.num_runs, 5);
        assert!(config.parameters.validate().is_ok());
    }

    #[test]
    fn test_run_all_records_each_seed() {
        let mut benchmark = Benchmark::new(quick());
        let mut seen = Vec::new();
        benchmark.run_all(|r| seen.push(r.seed)).unwrap();

        assert_eq!(seen, vec![10, 11, 12]);
        for r in benchmark.results() {
            assert!(r.best_length <= r.initial_length);
            assert_eq!(r.iterations, 15);
        }

        let stats = benchmark.compute_statistics().unwrap();
        assert_eq!(stats.num_runs, 3);
        assert!(stats.best_length <= stats.mean_length);
        assert!(stats.mean_length <= stats.worst_length);
        assert!(stats.mean_improvement >= 0.0);

        let report = benchmark.generate_report();
        assert!(report.contains("ACO TSP Benchmark Report"));
        assert!(report.contains("Mean improvement"));
    }

    #[test]
    fn test_seeds_wrap_past_u64_max() {
        let mut benchmark = Benchmark::new(BenchmarkConfig {
            num_runs: 2,
            base_seed: u64::MAX,
            ..quick()
        });
        let mut seen = Vec::new();
        benchmark.run_all(|r| seen.push(r.seed)).unwrap();
        assert_eq!(seen, vec![u64::MAX, 0]);
    }

    #[test]
    fn test_statistics_empty() {
        let benchmark = Benchmark::new(quick());
        assert!(benchmark.compute_statistics().is_none());
    }

    #[test]
    fn test_export_to_csv() {
        let mut benchmark = Benchmark::new(BenchmarkConfig {
            num_runs: 1,
            ..quick()
        });
        benchmark.run_all(|_| {}).unwrap();

        let path = std::env::temp_dir().join(format!("aco-bench-{}.csv", std::process::id()));
        benchmark.export_to_csv(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("run,seed,num_cities"));
        assert_eq!(lines.count(), 1);
    }
}

//! ACO TSP Solver Library
//!
//! Ant Colony Optimization for the Traveling Salesman Problem on randomly
//! generated complete graphs.
//!
//! # Features
//!
//! - Seeded, reproducible graph generation
//! - Probabilistic tour construction biased by pheromone and proximity
//! - Evaporation and reinforcement with clamped pheromone bounds
//! - Background optimization loop with cooperative cancellation
//! - Progress events delivered over channels
//! - Multi-seed benchmarking with CSV export
//!
//! # Example
//!
//! ```no_run
//! use aco_tsp_solver::config::RunParameters;
//! use aco_tsp_solver::engine::AntColony;
//! use aco_tsp_solver::events::ColonyEvent;
//!
//! let mut colony = AntColony::new();
//! let progress = colony.subscribe();
//!
//! let params = RunParameters { num_cities: 30, max_iterations: 100, ..Default::default() };
//! let init = colony.initialize(params).unwrap();
//! println!("Initial best length: {:.1}", init.initial_best_length);
//!
//! colony.start().unwrap();
//! while let Some(event) = progress.recv() {
//!     if let ColonyEvent::NewBest { length, iteration, .. } = &event {
//!         println!("New best {:.1} at iteration {}", length, iteration);
//!     }
//!     if event.is_terminal() {
//!         break;
//!     }
//! }
//!
//! let outcome = colony.wait().unwrap();
//! println!("Best tour: {}", outcome.best.tour);
//! ```

pub mod error;
pub mod config;
pub mod instance;
pub mod solution;
pub mod colony;
pub mod events;
pub mod engine;
pub mod benchmark;

pub use config::RunParameters;
pub use engine::AntColony;
pub use error::{AcoError, AcoResult};
pub use instance::DistanceMatrix;
pub use solution::Tour;

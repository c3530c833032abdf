//! Ant colony building blocks.
//!
//! This module exports the pheromone matrix, the probabilistic tour
//! constructor and the ant population that ties them together.

pub mod pheromone;
pub mod construction;
pub mod population;

pub use pheromone::*;
pub use construction::*;
pub use population::*;

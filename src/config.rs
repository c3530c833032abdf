//! Run parameters for the ant colony engine.

use crate::error::{AcoError, AcoResult};
use serde::{Deserialize, Serialize};

/// ACO run parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParameters {
    /// Pheromone importance (alpha)
    pub alpha: f64,
    /// Distance importance (beta)
    pub beta: f64,
    /// Evaporation rate (rho)
    pub rho: f64,
    /// Pheromone deposit factor
    pub q: f64,
    /// Number of cities in the generated graph
    pub num_cities: usize,
    /// Number of ants
    pub num_ants: usize,
    /// Number of iterations
    pub max_iterations: usize,
    /// Lower bound (inclusive) of generated distances
    pub scatter_start: u32,
    /// Upper bound (exclusive) of generated distances
    pub scatter_end: u32,
    /// Random seed
    pub seed: u64,
    /// Build ant trails on the rayon pool
    pub parallel: bool,
}

impl Default for RunParameters {
    fn default() -> Self {
        RunParameters {
            alpha: 3.0,
            beta: 2.0,
            rho: 0.01,
            q: 2.0,
            num_cities: 60,
            num_ants: 20,
            max_iterations: 300,
            scatter_start: 1,
            scatter_end: 9,
            seed: 0,
            parallel: true,
        }
    }
}

impl RunParameters {
    /// Check every parameter, reporting the first violation found.
    pub fn validate(&self) -> AcoResult<()> {
        for (name, value) in [("alpha", self.alpha), ("beta", self.beta), ("q", self.q)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(AcoError::config(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !(self.rho > 0.0 && self.rho < 1.0) {
            return Err(AcoError::config(format!(
                "rho must lie in (0, 1), got {}",
                self.rho
            )));
        }
        if self.num_cities < 2 {
            return Err(AcoError::config(format!(
                "num_cities must be at least 2, got {}",
                self.num_cities
            )));
        }
        if self.num_ants == 0 {
            return Err(AcoError::config("num_ants must be positive"));
        }
        if self.max_iterations == 0 {
            return Err(AcoError::config("max_iterations must be positive"));
        }
        if self.scatter_start == 0 {
            return Err(AcoError::config("scatter_start must be positive"));
        }
        if self.scatter_start >= self.scatter_end {
            return Err(AcoError::config(format!(
                "scatter range [{}, {}) is empty",
                self.scatter_start, self.scatter_end
            )));
        }
        Ok(())
    }
}

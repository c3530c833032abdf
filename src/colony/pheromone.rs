//! Pheromone matrix and its per-iteration update.

use crate::instance::DistanceMatrix;
use crate::solution::Tour;
use rayon::prelude::*;

/// Value of every entry before the first update
pub const INITIAL_PHEROMONE: f64 = 0.01;
/// Lower clamp applied after each update
pub const MIN_PHEROMONE: f64 = 0.0001;
/// Upper clamp applied after each update
pub const MAX_PHEROMONE: f64 = 100000.0;

/// Symmetric pheromone intensities, one entry per city pair
#[derive(Debug, Clone, PartialEq)]
pub struct PheromoneMatrix {
    dimension: usize,
    values: Vec<Vec<f64>>,
}

impl PheromoneMatrix {
    /// Uniform matrix at [`INITIAL_PHEROMONE`]. A non-zero floor keeps the
    /// first construction pass from dividing by a zero probability mass.
    pub fn new(num_cities: usize) -> Self {
        PheromoneMatrix {
            dimension: num_cities,
            values: vec![vec![INITIAL_PHEROMONE; num_cities]; num_cities],
        }
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i][j]
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Evaporate and reinforce every unordered pair from the current ants.
    ///
    /// For `i < j` the new value is `(1 - rho) * tau + sum(q / L_k)` over the
    /// ants whose cycle uses edge `(i, j)`, clamped to
    /// `[MIN_PHEROMONE, MAX_PHEROMONE]` and mirrored to `(j, i)`.
    /// All rows are computed from the old matrix before anything is written.
    pub fn update(
        &mut self,
        ants: &[Tour],
        distances: &DistanceMatrix,
        rho: f64,
        q: f64,
        parallel: bool,
    ) {
        let n = self.dimension;
        let lengths: Vec<f64> = ants.iter().map(|t| t.length(distances)).collect();
        let positions: Vec<Vec<usize>> = ants.iter().map(|t| t.positions()).collect();

        let values = &self.values;
        let compute_row = |i: usize| -> Vec<f64> {
            (i + 1..n)
                .map(|j| {
                    let decrease = (1.0 - rho) * values[i][j];
                    let increase: f64 = ants
                        .iter()
                        .zip(&positions)
                        .zip(&lengths)
                        .filter(|((tour, pos), _)| tour.contains_edge_with(pos, i, j))
                        .map(|(_, &length)| q / length)
                        .sum();
                    (decrease + increase).clamp(MIN_PHEROMONE, MAX_PHEROMONE)
                })
                .collect()
        };

        let upper: Vec<Vec<f64>> = if parallel {
            (0..n).into_par_iter().map(compute_row).collect()
        } else {
            (0..n).map(compute_row).collect()
        };

        for (i, row) in upper.into_iter().enumerate() {
            for (offset, value) in row.into_iter().enumerate() {
                let j = i + 1 + offset;
                self.values[i][j] = value;
                self.values[j][i] = value;
            }
        }
    }
}

/// One row per city, four decimals, fixed width
impl std::fmt::Display for PheromoneMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, row) in self.values.iter().enumerate() {
            write!(f, "{}: ", i)?;
            for value in row {
                write!(f, "{:>8.4} ", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

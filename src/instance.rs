//! Module for generating and representing TSP distance matrices.
//!
//! Every city is connected to every other city. Distances are symmetric
//! integers drawn uniformly from a configured range; the diagonal is never read.

use crate::error::{AcoError, AcoResult};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Symmetric integer distance matrix over `dimension` cities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    /// Number of cities
    pub dimension: usize,
    rows: Vec<Vec<u32>>,
}

impl DistanceMatrix {
    /// Draw a random complete graph.
    ///
    /// Pairs are visited row-major over `i < j`, one draw from
    /// `[scatter_start, scatter_end)` per pair, assigned to both halves.
    pub fn generate<R: Rng + ?Sized>(
        num_cities: usize,
        scatter_start: u32,
        scatter_end: u32,
        rng: &mut R,
    ) -> AcoResult<Self> {
        if num_cities < 2 {
            return Err(AcoError::config(format!(
                "at least 2 cities are required, got {}",
                num_cities
            )));
        }
        if scatter_start >= scatter_end {
            return Err(AcoError::config(format!(
                "scatter range [{}, {}) is empty",
                scatter_start, scatter_end
            )));
        }

        let mut rows = vec![vec![0u32; num_cities]; num_cities];
        for i in 0..num_cities {
            for j in i + 1..num_cities {
                let d = rng.gen_range(scatter_start..scatter_end);
                rows[i][j] = d;
                rows[j][i] = d;
            }
        }

        Ok(DistanceMatrix {
            dimension: num_cities,
            rows,
        })
    }

    /// Build a matrix from explicit rows. The rows must form a symmetric square matrix.
    pub fn from_rows(rows: Vec<Vec<u32>>) -> AcoResult<Self> {
        let n = rows.len();
        if n < 2 {
            return Err(AcoError::config(format!(
                "at least 2 cities are required, got {}",
                n
            )));
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(AcoError::config(format!(
                    "row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
        }
        for i in 0..n {
            for j in i + 1..n {
                if rows[i][j] != rows[j][i] {
                    return Err(AcoError::config(format!(
                        "distance ({}, {}) is not symmetric",
                        i, j
                    )));
                }
            }
        }
        Ok(DistanceMatrix { dimension: n, rows })
    }

    /// Get the distance between two cities
    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> u32 {
        self.rows[i][j]
    }

    /// Raw rows, handed to collaborators that draw the graph.
    pub fn rows(&self) -> &[Vec<u32>] {
        &self.rows
    }

    /// Get statistics about the generated graph
    pub fn statistics(&self) -> InstanceStatistics {
        let mut distances: Vec<u32> = Vec::new();
        for i in 0..self.dimension {
            for j in i + 1..self.dimension {
                distances.push(self.distance(i, j));
            }
        }
        let total: u64 = distances.iter().map(|&d| d as u64).sum();
        let avg_distance = total as f64 / distances.len() as f64;

        InstanceStatistics {
            dimension: self.dimension,
            num_edges: distances.len(),
            min_distance: distances.iter().copied().min().unwrap_or(0),
            max_distance: distances.iter().copied().max().unwrap_or(0),
            avg_distance,
        }
    }
}

/// Statistics about a generated graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub dimension: usize,
    pub num_edges: usize,
    pub min_distance: u32,
    pub max_distance: u32,
    pub avg_distance: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Graph: {} cities, {} edges", self.dimension, self.num_edges)?;
        writeln!(f, "  Min distance: {}", self.min_distance)?;
        writeln!(f, "  Max distance: {}", self.max_distance)?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_generation_is_reproducible() {
        let mut a = ChaCha8Rng::seed_from_u64(7);
        let mut b = ChaCha8Rng::seed_from_u64(7);
        let first = DistanceMatrix::generate(4, 1, 9, &mut a).unwrap();
        let second = DistanceMatrix::generate(4, 1, 9, &mut b).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.dimension, 4);
    }

    #[test]
    fn test_generation_matches_recorded_matrix() {
        // Row-major over i < j, one gen_range(1..9) per pair
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let m = DistanceMatrix::generate(4, 1, 9, &mut rng).unwrap();
        assert_eq!(
            m.rows().to_vec(),
            vec![
                vec![0u32, 6, 5, 5],
                vec![6, 0, 1, 8],
                vec![5, 1, 0, 5],
                vec![5, 8, 5, 0],
            ]
        );
    }

    #[test]
    fn test_generation_rejects_bad_input() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(matches!(
            DistanceMatrix::generate(1, 1, 9, &mut rng),
            Err(AcoError::Configuration { .. })
        ));
        assert!(matches!(
            DistanceMatrix::generate(5, 9, 1, &mut rng),
            Err(AcoError::Configuration { .. })
        ));
    }

    #[test]
    fn test_from_rows_checks_shape_and_symmetry() {
        assert!(DistanceMatrix::from_rows(vec![vec![0, 1], vec![1, 0]]).is_ok());
        assert!(DistanceMatrix::from_rows(vec![vec![0, 1], vec![2, 0]]).is_err());
        assert!(DistanceMatrix::from_rows(vec![vec![0, 1, 2], vec![1, 0]]).is_err());
    }

    #[test]
    fn test_statistics() {
        let m = DistanceMatrix::from_rows(vec![
            vec![0, 2, 4],
            vec![2, 0, 6],
            vec![4, 6, 0],
        ])
        .unwrap();
        let stats = m.statistics();
        assert_eq!(stats.num_edges, 3);
        assert_eq!(stats.min_distance, 2);
        assert_eq!(stats.max_distance, 6);
        assert!((stats.avg_distance - 4.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_symmetric_and_in_range(seed in any::<u64>(), n in 2usize..20, start in 1u32..50, width in 1u32..50) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let m = DistanceMatrix::generate(n, start, start + width, &mut rng).unwrap();
            for i in 0..n {
                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    prop_assert_eq!(m.distance(i, j), m.distance(j, i));
                    prop_assert!(m.distance(i, j) >= start && m.distance(i, j) < start + width);
                }
            }
        }
    }
}

//! Tour representation and evaluation.
//!
//! A tour is a permutation of city indices visited as a closed cycle: the
//! edge from the last city back to the first counts both for the length and
//! for edge adjacency.

use crate::instance::DistanceMatrix;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A closed tour over all cities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tour {
    cities: Vec<usize>,
}

impl Tour {
    pub fn new(cities: Vec<usize>) -> Self {
        Tour { cities }
    }

    /// Uniformly random permutation of `0..num_cities` with `start` moved to position 0.
    ///
    /// Consumes exactly `num_cities` draws (one Fisher-Yates step per slot).
    pub fn random<R: Rng + ?Sized>(start: usize, num_cities: usize, rng: &mut R) -> Self {
        debug_assert!(start < num_cities, "start city {} out of range", start);
        let mut cities: Vec<usize> = (0..num_cities).collect();
        for i in 0..num_cities {
            let r = rng.gen_range(i..num_cities);
            cities.swap(r, i);
        }
        if let Some(idx) = cities.iter().position(|&c| c == start) {
            cities.swap(0, idx);
        }
        Tour { cities }
    }

    pub fn cities(&self) -> &[usize] {
        &self.cities
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// Total cycle length, closing edge included
    pub fn length(&self, distances: &DistanceMatrix) -> f64 {
        let n = self.cities.len();
        if n < 2 {
            return 0.0;
        }

        let mut length = 0.0;
        for i in 0..n - 1 {
            length += distances.distance(self.cities[i], self.cities[i + 1]) as f64;
        }

        length += distances.distance(self.cities[n - 1], self.cities[0]) as f64;

        length
    }

    /// Position of every city in the tour, indexed by city
    pub fn positions(&self) -> Vec<usize> {
        let mut positions = vec![0; self.cities.len()];
        for (pos, &city) in self.cities.iter().enumerate() {
            positions[city] = pos;
        }
        positions
    }

    /// Whether `a` and `b` are neighbours on the cycle
    pub fn contains_edge(&self, a: usize, b: usize) -> bool {
        match self.cities.iter().position(|&c| c == a) {
            Some(idx) => self.neighbours_at(idx, b),
            None => false,
        }
    }

    /// Same as [`Tour::contains_edge`] with a precomputed position table
    #[inline]
    pub fn contains_edge_with(&self, positions: &[usize], a: usize, b: usize) -> bool {
        self.neighbours_at(positions[a], b)
    }

    #[inline]
    fn neighbours_at(&self, idx: usize, b: usize) -> bool {
        let n = self.cities.len();
        if n < 2 {
            return false;
        }
        self.cities[(idx + 1) % n] == b || self.cities[(idx + n - 1) % n] == b
    }

    /// Check that every city of `0..num_cities` appears exactly once
    pub fn is_permutation(&self, num_cities: usize) -> bool {
        if self.cities.len() != num_cities {
            return false;
        }
        let mut seen = vec![false; num_cities];
        for &city in &self.cities {
            if city >= num_cities || seen[city] {
                return false;
            }
            seen[city] = true;
        }
        true
    }

    /// One-line abbreviation: first and last four cities plus the length
    pub fn summary(&self, distances: &DistanceMatrix) -> String {
        let n = self.cities.len();
        let join = |slice: &[usize]| {
            slice
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        };
        let body = if n <= 8 {
            join(&self.cities)
        } else {
            format!("{} . . . {}", join(&self.cities[..4]), join(&self.cities[n - 4..]))
        };
        format!("[ {} ] len = {:.1}", body, self.length(distances))
    }
}

impl From<Vec<usize>> for Tour {
    fn from(cities: Vec<usize>) -> Self {
        Tour::new(cities)
    }
}

/// Cities separated by spaces, wrapped every 20 entries
impl std::fmt::Display for Tour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, city) in self.cities.iter().enumerate() {
            write!(f, "{} ", city)?;
            if i > 0 && i % 20 == 0 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn square() -> DistanceMatrix {
        DistanceMatrix::from_rows(vec![
            vec![0, 1, 5, 2],
            vec![1, 0, 3, 7],
            vec![5, 3, 0, 4],
            vec![2, 7, 4, 0],
        ])
        .unwrap()
    }

    #[test]
    fn test_length_closes_the_cycle() {
        let tour = Tour::new(vec![0, 1, 2, 3]);
        // 1 + 3 + 4 + 2
        assert_eq!(tour.length(&square()), 10.0);
        assert_eq!(Tour::new(vec![2]).length(&square()), 0.0);
    }

    #[test]
    fn test_contains_edge_wraps_around() {
        let tour = Tour::new(vec![2, 0, 3, 1]);
        assert!(tour.contains_edge(2, 0));
        assert!(tour.contains_edge(0, 3));
        assert!(tour.contains_edge(1, 2));
        assert!(tour.contains_edge(2, 1));
        assert!(!tour.contains_edge(2, 3));
        assert!(!tour.contains_edge(0, 1));

        let positions = tour.positions();
        for a in 0..4 {
            for b in 0..4 {
                assert_eq!(tour.contains_edge(a, b), tour.contains_edge_with(&positions, a, b));
            }
        }
    }

    #[test]
    fn test_is_permutation() {
        assert!(Tour::new(vec![3, 1, 0, 2]).is_permutation(4));
        assert!(!Tour::new(vec![3, 1, 1, 2]).is_permutation(4));
        assert!(!Tour::new(vec![0, 1, 2]).is_permutation(4));
        assert!(!Tour::new(vec![0, 1, 2, 4]).is_permutation(4));
    }

    #[test]
    fn test_summary_abbreviates_long_tours() {
        let m = DistanceMatrix::from_rows(vec![vec![1; 10]; 10]).unwrap();
        let tour = Tour::new((0..10).collect());
        assert_eq!(tour.summary(&m), "[ 0 1 2 3 . . . 6 7 8 9 ] len = 10.0");
    }

    #[test]
    fn test_random_matches_recorded_tour() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let tour = Tour::random(3, 10, &mut rng);
        assert_eq!(tour.cities(), &[3, 2, 4, 8, 9, 6, 1, 0, 7, 5]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "out of range")]
    fn test_random_rejects_unknown_start() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        Tour::random(10, 10, &mut rng);
    }

    proptest! {
        #[test]
        fn prop_random_tour_is_permutation_starting_at_start(seed in any::<u64>(), n in 1usize..40, start_frac in 0.0f64..1.0) {
            let start = ((n as f64) * start_frac) as usize % n;
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let tour = Tour::random(start, n, &mut rng);
            prop_assert!(tour.is_permutation(n));
            prop_assert_eq!(tour.cities()[0], start);
        }
    }
}

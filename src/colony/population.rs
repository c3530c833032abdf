//! The ant population: one tour per ant, rebuilt every iteration.

use crate::colony::construction::TourConstructor;
use crate::error::AcoResult;
use crate::instance::DistanceMatrix;
use crate::solution::Tour;
use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// Fixed-size collection of ant tours
#[derive(Debug, Clone, PartialEq)]
pub struct AntPopulation {
    ants: Vec<Tour>,
}

impl AntPopulation {
    /// Seed every ant with a random start city and a shuffled trail.
    /// No pheromone signal is used at this stage.
    pub fn init<R: Rng + ?Sized>(num_ants: usize, num_cities: usize, rng: &mut R) -> Self {
        let ants = (0..num_ants)
            .map(|_| {
                let start = rng.gen_range(0..num_cities);
                Tour::random(start, num_cities, &mut *rng)
            })
            .collect();
        AntPopulation { ants }
    }

    pub fn from_tours(ants: Vec<Tour>) -> Self {
        AntPopulation { ants }
    }

    pub fn ants(&self) -> &[Tour] {
        &self.ants
    }

    pub fn len(&self) -> usize {
        self.ants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ants.is_empty()
    }

    /// Rebuild every ant's trail from the current pheromone snapshot.
    ///
    /// The master generator draws, in ant order, a start city and a sub-seed
    /// per ant. Each ant then walks with its own stream, so the result does not
    /// depend on whether the walks run on the rayon pool or in sequence.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        constructor: &TourConstructor<'_>,
        num_cities: usize,
        rng: &mut R,
        parallel: bool,
    ) -> AcoResult<()> {
        let seeds: Vec<(usize, u64)> = (0..self.ants.len())
            .map(|_| (rng.gen_range(0..num_cities), rng.gen::<u64>()))
            .collect();

        let build = |(k, &(start, seed)): (usize, &(usize, u64))| {
            let mut ant_rng = ChaCha8Rng::seed_from_u64(seed);
            constructor.build_trail(k, start, &mut ant_rng)
        };

        let ants: Vec<Tour> = if parallel {
            seeds.par_iter().enumerate().map(build).collect::<AcoResult<Vec<Tour>>>()?
        } else {
            seeds.iter().enumerate().map(build).collect::<AcoResult<Vec<Tour>>>()?
        };

        self.ants = ants;
        Ok(())
    }

    /// Index and length of the shortest tour; ties go to the lowest index.
    pub fn best_index(&self, distances: &DistanceMatrix) -> Option<(usize, f64)> {
        self.ants
            .iter()
            .map(|tour| tour.length(distances))
            .enumerate()
            .min_by_key(|&(_, length)| OrderedFloat(length))
    }

    /// Copy of the shortest tour, detached from the population.
    pub fn best_trail(&self, distances: &DistanceMatrix) -> Option<(Tour, f64)> {
        self.best_index(distances)
            .map(|(k, length)| (self.ants[k].clone(), length))
    }
}

//! Survivor selection: elitism plus probabilistic tournaments.

use crate::{Error, Sequence};
use rand::seq::index;
use rand::Rng;

/// Configuration for [select].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionConfig {
    /// Number of contestants drawn for each tournament.
    pub tournament_size: usize,
    /// Number of best individuals carried over unchanged; at least one.
    pub elite_count: usize,
    /// Probability that a tournament is won by a contestant other than its best.
    ///
    /// This bounds how often a less fit individual is preferred over a fitter one.
    pub upset_pb: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            tournament_size: 3,
            elite_count: 1,
            upset_pb: 0.1,
        }
    }
}

impl SelectionConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.tournament_size < 1 {
            return Err(Error::Config("tournament size must be at least 1"));
        }

        if self.elite_count < 1 {
            return Err(Error::Config("at least one elite individual must survive"));
        }

        if !(0.0..=1.0).contains(&self.upset_pb) {
            return Err(Error::Config("upset probability must lie in [0, 1]"));
        }

        Ok(())
    }
}

/// The outcome of [select]: indices into the evaluated population.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Selection {
    /// The best individuals, best first, to be carried over unchanged.
    pub elite: Vec<usize>,
    /// Tournament winners, to be varied into offspring.
    pub parents: Vec<usize>,
}

/// Picks the elite and `parents` tournament winners out of an evaluated population.
///
/// Individuals that never reached the target only take part in tournaments when nobody did.
pub fn select<R: Rng>(
    population: &[Sequence],
    parents: usize,
    config: &SelectionConfig,
    rng: &mut R,
) -> Selection {
    let mut ranked: Vec<usize> = (0..population.len()).collect();
    ranked.sort_by(|&a, &b| Sequence::ranking(&population[a], &population[b]));

    let elite = ranked
        .iter()
        .copied()
        .take(config.elite_count.min(population.len()))
        .collect();

    let correct = ranked
        .iter()
        .take_while(|&&i| population[i].fitness().is_some_and(|f| f.is_correct()))
        .count();

    let pool = if correct > 0 { &ranked[..correct] } else { &ranked[..] };

    let parents = if pool.is_empty() {
        Vec::new()
    } else {
        (0..parents)
            .map(|_| tournament(pool, config, rng))
            .collect()
    };

    Selection { elite, parents }
}

/// Runs one tournament between distinct members of `pool`, which is sorted best first.
fn tournament<R: Rng>(pool: &[usize], config: &SelectionConfig, rng: &mut R) -> usize {
    let k = config.tournament_size.clamp(1, pool.len());
    let mut contestants = index::sample(rng, pool.len(), k).into_vec();
    contestants.sort_unstable();

    if k > 1 && rng.gen_bool(config.upset_pb) {
        pool[contestants[rng.gen_range(1..k)]]
    } else {
        pool[contestants[0]]
    }
}

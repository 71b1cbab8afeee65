//! The generational search loop.
//!
//! ```text
//! initialize ──▶ evaluate ──▶ select ──▶ vary ──┐
//!                   ▲                          │
//!                   └──────────────────────────┘──▶ terminate
//! ```
//!
//! The population starts out as the baseline plus mutated copies of it. Every generation is
//! evaluated in parallel on a dedicated worker pool; selection waits for the whole generation.

use crate::{
    baseline, crossover, mutate, select, DocumentCache, Error, Fitness, MutationConfig,
    SelectionConfig, Sequence, Tree,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::cmp::Ordering;
use std::iter::once;
use std::sync::Arc;
use tracing::{debug, info};

/// Configuration for a [Search].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    /// Number of individuals per generation, the baseline included.
    pub population_size: usize,
    /// Maximum number of generations to evaluate.
    pub generations: usize,
    /// Stop as soon as a correct sequence this short is found.
    pub target_length: Option<usize>,
    /// Probability that a pair of parents is crossed over.
    pub crossover_pb: f64,
    /// Probability that an offspring is mutated.
    pub mutation_pb: f64,
    /// Mutation operators.
    pub mutation: MutationConfig,
    /// Survivor selection.
    pub selection: SelectionConfig,
    /// Size of the evaluation worker pool; defaults to one worker per CPU.
    pub workers: Option<usize>,
    /// Seed for the random number generator, making runs reproducible.
    pub seed: u64,
    /// How many of the best fitness values every [GenerationStats] reports.
    pub report_top: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            population_size: 300,
            generations: 50,
            target_length: None,
            crossover_pb: 0.5,
            mutation_pb: 0.1,
            mutation: MutationConfig::default(),
            selection: SelectionConfig::default(),
            workers: None,
            seed: 42,
            report_top: 2,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.population_size < 1 {
            return Err(Error::Config("population size must be at least 1"));
        }

        if !(0.0..=1.0).contains(&self.crossover_pb) || !(0.0..=1.0).contains(&self.mutation_pb) {
            return Err(Error::Config("variation probabilities must lie in [0, 1]"));
        }

        if self.workers == Some(0) {
            return Err(Error::Config("the worker pool needs at least one worker"));
        }

        self.mutation.validate()?;
        self.selection.validate()?;

        if self.selection.elite_count > self.population_size {
            return Err(Error::Config("elite count exceeds the population size"));
        }

        Ok(())
    }
}

/// Summary of an evaluated generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationStats {
    pub generation: usize,
    /// Highest fitness in the generation.
    pub best: Fitness,
    /// Fitness of the best few individuals, best first.
    pub top: Vec<Fitness>,
    /// Mean fitness of the generation.
    pub mean: f64,
    /// Number of individuals that reach the target.
    pub correct: usize,
    /// Length of the shortest individual that reaches the target.
    pub shortest: Option<usize>,
}

impl GenerationStats {
    fn of(generation: usize, population: &[Sequence], top: usize) -> Self {
        let mut ranked: Vec<&Sequence> = population.iter().collect();
        ranked.sort_by(|a, b| Sequence::ranking(a, b));

        let fitness: Vec<Fitness> = population
            .iter()
            .map(|s| s.fitness().unwrap_or_default())
            .collect();

        let best = fitness
            .iter()
            .copied()
            .max_by(|a, b| a.value().total_cmp(&b.value()))
            .unwrap_or_default();

        let mean = if fitness.is_empty() {
            0.0
        } else {
            fitness.iter().map(|f| f.value()).sum::<f64>() / fitness.len() as f64
        };

        let correct = population.iter().zip(&fitness).filter(|(_, f)| f.is_correct());

        GenerationStats {
            generation,
            best,
            top: ranked
                .iter()
                .take(top)
                .map(|s| s.fitness().unwrap_or_default())
                .collect(),
            mean,
            correct: correct.clone().count(),
            shortest: correct.map(|(s, _)| s.len()).min(),
        }
    }
}

/// What a finished [Search] found.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// The best sequence seen in any generation: highest fitness, then fewest steps.
    pub best: Sequence,
    /// The length of the baseline sequence.
    pub baseline_len: usize,
    /// One entry per evaluated generation.
    pub generations: Vec<GenerationStats>,
}

/// A population-based search for short edit sequences between two trees.
#[derive(Debug)]
pub struct Search {
    config: SearchConfig,
    source: Arc<Tree>,
    target: Arc<Tree>,
    baseline: Sequence,
    pool: ThreadPool,
}

impl Search {
    /// Prepares a search from `source` to `target`.
    ///
    /// The configuration is checked before anything else happens.
    pub fn new(config: SearchConfig, source: Arc<Tree>, target: Arc<Tree>) -> Result<Self, Error> {
        config.validate()?;

        let baseline = baseline(&source, &target)?;

        let mut pool = ThreadPoolBuilder::new().thread_name(|i| format!("evaluate-{i}"));
        if let Some(n) = config.workers {
            pool = pool.num_threads(n);
        }

        info!(
            source = source.len(),
            target = target.len(),
            baseline = baseline.len(),
            population = config.population_size,
            "preparing search"
        );

        Ok(Search {
            config,
            source,
            target,
            baseline,
            pool: pool.build()?,
        })
    }

    /// Like [new][Search::new], but for raw markup, which is parsed through `cache`.
    pub fn from_markup(
        config: SearchConfig,
        cache: &DocumentCache,
        source: &str,
        target: &str,
    ) -> Result<Self, Error> {
        config.validate()?;
        Self::new(config, cache.tree(source), cache.tree(target))
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The delete-everything-then-append-everything sequence.
    pub fn baseline(&self) -> &Sequence {
        &self.baseline
    }

    pub fn source(&self) -> &Tree {
        &self.source
    }

    pub fn target(&self) -> &Tree {
        &self.target
    }

    /// The baseline followed by `population_size - 1` independently mutated copies of it.
    pub fn initial_population<R: Rng>(&self, rng: &mut R) -> Result<Vec<Sequence>, Error> {
        let mut population = Vec::with_capacity(self.config.population_size);
        population.push(self.baseline.clone());

        for _ in 1..self.config.population_size {
            let mut s = self.baseline.clone();
            mutate(&mut s, &self.config.mutation, rng)?;
            population.push(s);
        }

        Ok(population)
    }

    /// Scores every individual on the worker pool; already scored individuals are skipped.
    pub fn evaluate(&self, population: &mut [Sequence]) {
        let (source, target) = (&*self.source, &*self.target);
        let baseline = Some(self.baseline.len());

        self.pool.install(|| {
            population.par_iter_mut().for_each(|s| {
                s.evaluate(source, target, baseline);
            });
        });
    }

    /// Runs the search to completion.
    pub fn run(&self) -> Result<Outcome, Error> {
        let mut rng = SmallRng::seed_from_u64(self.config.seed);
        let mut population = self.initial_population(&mut rng)?;

        let mut best = self.baseline.clone();
        best.evaluate(&self.source, &self.target, Some(self.baseline.len()));

        let mut generations = Vec::with_capacity(self.config.generations);
        for generation in 0..self.config.generations {
            self.evaluate(&mut population);

            let stats = GenerationStats::of(generation, &population, self.config.report_top);
            debug!(
                generation,
                best = %stats.best,
                top = ?stats.top,
                mean = stats.mean,
                correct = stats.correct,
                shortest = ?stats.shortest,
                "evaluated generation"
            );

            generations.push(stats);

            if let Some(champion) = population.iter().min_by(|a, b| Sequence::ranking(a, b)) {
                if Sequence::ranking(champion, &best) == Ordering::Less {
                    best = champion.clone();
                }
            }

            if self.is_done(&best) || generation + 1 == self.config.generations {
                break;
            }

            population = self.breed(&population, &mut rng)?;
        }

        info!(
            generations = generations.len(),
            fitness = %best.fitness().unwrap_or_default(),
            steps = best.len(),
            baseline = self.baseline.len(),
            "search finished"
        );

        Ok(Outcome {
            best,
            baseline_len: self.baseline.len(),
            generations,
        })
    }

    fn is_done(&self, best: &Sequence) -> bool {
        let correct = best.fitness().is_some_and(Fitness::is_correct);
        matches!(self.config.target_length, Some(len) if correct && best.len() <= len)
    }

    /// Builds the next generation: the elite unchanged, then varied offspring of tournament
    /// winners.
    fn breed<R: Rng>(&self, population: &[Sequence], rng: &mut R) -> Result<Vec<Sequence>, Error> {
        let size = self.config.population_size;
        let offspring = size.saturating_sub(self.config.selection.elite_count.min(population.len()));
        let selection = select(population, offspring, &self.config.selection, rng);

        let mut next: Vec<Sequence> = selection
            .elite
            .iter()
            .map(|&i| population[i].clone())
            .collect();

        for parents in selection.parents.chunks(2) {
            let mut a = population[parents[0]].clone();
            let mut b = parents.get(1).map(|&i| population[i].clone());

            if let Some(b) = b.as_mut() {
                if rng.gen_bool(self.config.crossover_pb) {
                    crossover(&mut a, b, rng);
                }
            }

            for mut child in once(a).chain(b) {
                if rng.gen_bool(self.config.mutation_pb) {
                    mutate(&mut child, &self.config.mutation, rng)?;
                }

                next.push(child);
            }
        }

        next.truncate(size);
        Ok(next)
    }
}

//! Variation operators for edit sequences.
//!
//! Mutation runs in a fixed order: payloads are shuffled between steps, kinds are reassigned
//! (which also repairs steps whose shuffled payload no longer suits their kind), targets are
//! perturbed, and finally some steps may be dropped. Only the last stage changes the length of a
//! sequence.

use crate::{Error, Payload, Sequence, Step, StepKind};
use arrayvec::ArrayVec;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Configuration for [mutate].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationConfig {
    /// Probability that a step takes part in the payload shuffle.
    pub feature_mutation_pb: f64,
    /// Probability that a step is offered a different kind.
    pub type_mutation_pb: f64,
    /// Mean of the normal distribution targets are shifted by.
    pub mu: f64,
    /// Standard deviation of the normal distribution targets are shifted by.
    pub sigma: f64,
    /// Probability that a step is dropped.
    pub shrink_mutation_pb: f64,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            feature_mutation_pb: 0.05,
            type_mutation_pb: 0.05,
            mu: 0.0,
            sigma: 1.0,
            shrink_mutation_pb: 0.05,
        }
    }
}

impl MutationConfig {
    pub fn validate(&self) -> Result<(), Error> {
        let probabilities = [
            self.feature_mutation_pb,
            self.type_mutation_pb,
            self.shrink_mutation_pb,
        ];

        if !probabilities.iter().all(|p| (0.0..=1.0).contains(p)) {
            return Err(Error::Config("mutation probabilities must lie in [0, 1]"));
        }

        if !self.mu.is_finite() || !self.sigma.is_finite() || self.sigma < 0.0 {
            return Err(Error::Config("mu must be finite and sigma finite and non-negative"));
        }

        Ok(())
    }
}

type Gene = (StepKind, i64, Payload);

/// Mutates a sequence in place.
///
/// Every step that comes out of here went through [Step::new], so mutation never smuggles an
/// invalid step into a sequence.
pub fn mutate<R: Rng>(sequence: &mut Sequence, config: &MutationConfig, rng: &mut R) -> Result<(), Error> {
    config.validate()?;
    let normal = Normal::new(config.mu, config.sigma)
        .map_err(|_| Error::Config("invalid target distribution"))?;

    let mut genes: Vec<Gene> = sequence
        .replace_steps(Vec::new())
        .into_iter()
        .map(Step::into_parts)
        .collect();

    mutate_features(&mut genes, config.feature_mutation_pb, rng);

    let mut steps = mutate_types(genes, config.type_mutation_pb, rng)?;
    mutate_targets(&mut steps, &normal, rng);
    shrink(&mut steps, config.shrink_mutation_pb, rng);

    sequence.replace_steps(steps);
    Ok(())
}

/// Shuffles payloads among a random subset of the steps, regardless of their kinds.
fn mutate_features<R: Rng>(genes: &mut [Gene], pb: f64, rng: &mut R) {
    let picked: Vec<usize> = (0..genes.len()).filter(|_| rng.gen_bool(pb)).collect();

    let mut payloads: Vec<Payload> = picked
        .iter()
        .map(|&i| std::mem::take(&mut genes[i].2))
        .collect();

    payloads.shuffle(rng);

    for (&i, payload) in picked.iter().zip(payloads) {
        genes[i].2 = payload;
    }
}

/// Offers steps a different kind, accepting the first candidate their payload suits.
///
/// Steps whose payload doesn't suit their current kind are always reassigned.
fn mutate_types<R: Rng>(genes: Vec<Gene>, pb: f64, rng: &mut R) -> Result<Vec<Step>, Error> {
    genes
        .into_iter()
        .map(|(mut kind, target, payload)| {
            if rng.gen_bool(pb) || !payload.admits(kind) {
                let mut candidates: ArrayVec<StepKind, 3> =
                    StepKind::ALL.into_iter().filter(|&k| k != kind).collect();

                candidates.shuffle(rng);
                if let Some(k) = candidates.into_iter().find(|&k| payload.admits(k)) {
                    kind = k;
                }
            }

            Step::new(kind, target, payload)
        })
        .collect()
}

/// Shifts every target by a normally distributed amount, truncated towards zero.
fn mutate_targets<R: Rng>(steps: &mut [Step], normal: &Normal<f64>, rng: &mut R) {
    for step in steps {
        let shifted = (step.target() as f64 + normal.sample(rng)).trunc();
        step.retarget(shifted as i64);
    }
}

/// Drops each step with probability `pb`, but never empties a sequence.
fn shrink<R: Rng>(steps: &mut Vec<Step>, pb: f64, rng: &mut R) {
    if steps.len() < 2 {
        return;
    }

    let keep = rng.gen_range(0..steps.len());
    let mut i = 0;
    steps.retain(|_| {
        let kept = i == keep || !rng.gen_bool(pb);
        i += 1;
        kept
    });
}

/// One-point crossover: swaps the suffixes of two sequences after a random cut.
///
/// The cut lies in `1..min(a.len(), b.len())`, so both children keep at least one step of each
/// parent; sequences with fewer than two steps are left alone.
pub fn crossover<R: Rng>(a: &mut Sequence, b: &mut Sequence, rng: &mut R) {
    let len = a.len().min(b.len());
    if len < 2 {
        return;
    }

    let cut = rng.gen_range(1..len);
    let tail_a = a.split_off(cut);
    let tail_b = b.split_off(cut);
    a.extend(tail_b);
    b.extend(tail_a);
}

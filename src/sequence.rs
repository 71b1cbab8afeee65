use crate::{Applied, DocumentCache, Step, Tree};
use derive_more::{Deref, From};
use itertools::Itertools;
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};

/// How good a [Sequence] is at rewriting the source tree into the target tree.
///
/// Zero means the sequence does not reach the target. Correct sequences score
/// `baseline / length`, so shorter ones score higher.
#[derive(Debug, Default, Copy, Clone, PartialEq, PartialOrd, From)]
pub struct Fitness(f64);

impl Fitness {
    pub const ZERO: Fitness = Fitness(0.0);

    /// The fitness of a sequence with `len` steps, relative to a baseline of `baseline` steps.
    ///
    /// Both lengths are floored at one, so an empty correct sequence scores like a single step.
    pub fn of(correct: bool, len: usize, baseline: Option<usize>) -> Self {
        if !correct {
            return Fitness::ZERO;
        }

        match baseline {
            Some(b) => Fitness(b.max(1) as f64 / len.max(1) as f64),
            None => Fitness(1.0),
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Whether the sequence reached the target tree.
    pub fn is_correct(self) -> bool {
        self.0 > 0.0
    }
}

impl Display for Fitness {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

/// An ordered list of [Step]s with a memoized [Fitness].
///
/// Any change to the steps forgets the fitness.
#[derive(Debug, Default, Clone, Deref)]
pub struct Sequence {
    #[deref(forward)]
    steps: Vec<Step>,
    fitness: Option<Fitness>,
}

impl From<Vec<Step>> for Sequence {
    fn from(steps: Vec<Step>) -> Self {
        Sequence {
            steps,
            fitness: None,
        }
    }
}

impl FromIterator<Step> for Sequence {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.steps == other.steps
    }
}

impl Eq for Sequence {}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fitness computed by the last [evaluate][Sequence::evaluate], unless the steps changed.
    pub fn fitness(&self) -> Option<Fitness> {
        self.fitness
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn push(&mut self, step: Step) {
        self.fitness = None;
        self.steps.push(step);
    }

    pub fn pop(&mut self) -> Option<Step> {
        self.fitness = None;
        self.steps.pop()
    }

    pub fn insert(&mut self, index: usize, step: Step) {
        self.fitness = None;
        self.steps.insert(index, step);
    }

    pub fn remove(&mut self, index: usize) -> Step {
        self.fitness = None;
        self.steps.remove(index)
    }

    /// Replaces the step at `index`, returning the old one.
    pub fn set(&mut self, index: usize, step: Step) -> Step {
        self.fitness = None;
        std::mem::replace(&mut self.steps[index], step)
    }

    pub fn truncate(&mut self, len: usize) {
        self.fitness = None;
        self.steps.truncate(len);
    }

    pub fn split_off(&mut self, at: usize) -> Vec<Step> {
        self.fitness = None;
        self.steps.split_off(at)
    }

    /// Swaps out every step at once.
    pub fn replace_steps(&mut self, steps: Vec<Step>) -> Vec<Step> {
        self.fitness = None;
        std::mem::replace(&mut self.steps, steps)
    }

    /// Replays every step against a clone of `source`.
    pub fn replay(&self, source: &Tree) -> Tree {
        let mut tree = source.clone();
        for step in &self.steps {
            tree.replay(step);
        }

        tree
    }

    /// Like [replay][Sequence::replay], but also records what every step touched.
    pub fn journal(&self, source: &Tree) -> (Tree, Vec<Applied>) {
        let mut tree = source.clone();
        let applied = self.steps.iter().map(|s| tree.apply(s)).collect();
        (tree, applied)
    }

    /// Scores this sequence, reusing the memoized value if the steps haven't changed.
    ///
    /// The memoized value only depends on the steps, so a sequence must always be scored against
    /// the same `source`, `target` and `baseline`; scoring it in another setting requires a clone
    /// of its steps. `source` and `target` are never modified; the steps are replayed on a clone.
    pub fn evaluate(&mut self, source: &Tree, target: &Tree, baseline: Option<usize>) -> Fitness {
        if let Some(f) = self.fitness {
            return f;
        }

        let correct = self.replay(source) == *target;
        let fitness = Fitness::of(correct, self.len(), baseline);
        self.fitness = Some(fitness);
        fitness
    }

    /// Like [evaluate][Sequence::evaluate], but for raw markup, which is parsed through `cache`.
    pub fn evaluate_markup(
        &mut self,
        cache: &DocumentCache,
        source: &str,
        target: &str,
        baseline: Option<usize>,
    ) -> Fitness {
        if let Some(f) = self.fitness {
            return f;
        }

        let (source, target) = (cache.tree(source), cache.tree(target));
        self.evaluate(&source, &target, baseline)
    }

    #[cfg(test)]
    pub(crate) fn with_fitness(mut self, fitness: Fitness) -> Self {
        self.fitness = Some(fitness);
        self
    }

    /// One human-readable line per step.
    pub fn describe(&self) -> Vec<String> {
        self.steps.iter().map(Step::to_string).collect()
    }

    /// Orders sequences from best to worst: higher fitness first, then fewer steps.
    ///
    /// Unevaluated sequences rank as zero fitness.
    pub fn ranking(a: &Self, b: &Self) -> Ordering {
        let fa = a.fitness.unwrap_or_default().value();
        let fb = b.fitness.unwrap_or_default().value();
        fb.total_cmp(&fa).then(a.len().cmp(&b.len()))
    }
}

impl Extend<Step> for Sequence {
    fn extend<I: IntoIterator<Item = Step>>(&mut self, iter: I) {
        self.fitness = None;
        self.steps.extend(iter);
    }
}

impl Display for Sequence {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.steps.iter().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{markup::parse, Payload};
    use assert_matches::assert_matches;

    fn append(target: i64, payload: Payload) -> Step {
        Step::append(target, payload).expect("valid step")
    }

    #[test]
    fn a_single_append_rewrites_an_empty_div() {
        let (source, target) = (parse("<div></div>"), parse("<div><span>x</span></div>"));
        let mut s = Sequence::from(vec![append(0, Payload::named("span").with_content("x"))]);

        assert_eq!(s.evaluate(&source, &target, Some(4)), Fitness::from(4.0));
        assert_eq!(s.fitness(), Some(Fitness::from(4.0)));
    }

    #[test]
    fn a_single_delete_unwraps_a_list_item() {
        let (source, target) = (parse("<ul><li>a</li></ul>"), parse("<ul></ul>"));
        let mut s = Sequence::from(vec![Step::delete(1)]);

        assert_eq!(s.evaluate(&source, &target, Some(4)), Fitness::ZERO);
        assert_eq!(s.replay(&source).to_string(), "<ul>a</ul>");
    }

    #[test]
    fn deleting_the_text_then_the_item_empties_a_list() {
        let (source, target) = (parse("<ul><li>a</li></ul>"), parse("<ul></ul>"));
        let mut s = Sequence::from(vec![Step::delete(2), Step::delete(1)]);

        assert_eq!(s.evaluate(&source, &target, Some(4)), Fitness::from(2.0));
        let result = s.replay(&source);
        assert_eq!(result.children(result.index()[0]).count(), 0);
    }

    #[test]
    fn markup_is_evaluated_through_the_cache() {
        let cache = DocumentCache::new();
        let (source, target) = ("<div></div>", "<div><span>x</span></div>");
        let mut s = Sequence::from(vec![append(0, Payload::named("span").with_content("x"))]);

        assert_eq!(s.evaluate_markup(&cache, source, target, Some(4)), Fitness::from(4.0));
        assert_eq!(cache.len(), 2);
        assert_eq!(*cache.tree(source), parse(source));
        assert_eq!(*cache.tree(target), parse(target));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn the_memoized_fitness_ignores_a_different_baseline() {
        let (source, target) = (parse("<p>a</p>"), parse("<p>a</p>"));
        let mut s = Sequence::from(vec![Step::delete(1), append(0, Payload::text("a"))]);

        assert_eq!(s.evaluate(&source, &target, None), Fitness::from(1.0));
        assert_eq!(s.evaluate(&source, &target, Some(4)), Fitness::from(1.0));

        let mut fresh = Sequence::from(s.steps().to_vec());
        assert_eq!(fresh.evaluate(&source, &target, Some(4)), Fitness::from(2.0));
    }

    #[test]
    fn incorrect_sequences_score_zero() {
        let (source, target) = (parse("<p>a</p>"), parse("<p>b</p>"));
        let mut s = Sequence::from(vec![Step::delete(0)]);
        assert_eq!(s.evaluate(&source, &target, Some(4)), Fitness::ZERO);
        assert!(!Fitness::ZERO.is_correct());
    }

    #[test]
    fn evaluation_is_idempotent_and_leaves_inputs_alone() {
        let (source, target) = (parse("<p>a</p>"), parse("<p>a<b></b></p>"));
        let pristine = source.clone();
        let mut s = Sequence::from(vec![append(0, Payload::named("b"))]);

        let first = s.evaluate(&source, &target, Some(6));
        s.fitness = None;
        let second = s.evaluate(&source, &target, Some(6));

        assert_eq!(first, second);
        assert_eq!(first, Fitness::from(6.0));
        assert_eq!(source, pristine);
        assert_eq!(source.len(), 2);
    }

    #[test]
    fn changes_forget_the_fitness() {
        let (source, target) = (parse("<p>a</p>"), parse("<p>a</p>"));
        let mut s = Sequence::new();

        s.evaluate(&source, &target, None);
        s.push(Step::delete(0));
        assert_eq!(s.fitness(), None);

        s.evaluate(&source, &target, None);
        s.pop();
        assert_eq!(s.fitness(), None);

        s.evaluate(&source, &target, None);
        s.extend([Step::delete(1)]);
        assert_eq!(s.fitness(), None);

        s.evaluate(&source, &target, None);
        s.set(0, Step::delete(2));
        assert_eq!(s.fitness(), None);
    }

    #[test]
    fn degenerate_lengths_are_floored_at_one() {
        assert_eq!(Fitness::of(true, 0, Some(4)), Fitness::from(4.0));
        assert_eq!(Fitness::of(true, 2, Some(0)), Fitness::from(0.5));
        assert_eq!(Fitness::of(true, 0, None), Fitness::from(1.0));
        assert_eq!(Fitness::of(false, 0, Some(4)), Fitness::ZERO);
    }

    #[test]
    fn the_journal_records_previous_nodes() {
        let source = parse("<ul><li>a</li></ul>");
        let s = Sequence::from(vec![Step::delete(2), Step::delete(9), Step::delete(0)]);
        let (tree, applied) = s.journal(&source);

        assert!(tree.is_empty());
        assert_matches!(&applied[..], [Applied::Changed(_), Applied::Changed(_), Applied::Changed(_)]);
        assert_eq!(tree, s.replay(&source));
    }

    #[test]
    fn ranks_by_fitness_then_length() {
        let mut long = Sequence::from(vec![Step::delete(0), Step::delete(0)]);
        let mut short = Sequence::from(vec![Step::delete(0)]);
        long.fitness = Some(Fitness::from(1.0));
        short.fitness = Some(Fitness::from(1.0));

        assert_eq!(Sequence::ranking(&short, &long), Ordering::Less);

        long.fitness = Some(Fitness::from(2.0));
        assert_eq!(Sequence::ranking(&short, &long), Ordering::Greater);
    }

    #[test]
    fn renders_one_line_per_step() {
        let s = Sequence::from(vec![Step::delete(1), append(0, Payload::text("x"))]);
        assert_eq!(s.describe(), ["D1", r#"A0[,"x",{}]"#]);
        assert_eq!(s.to_string(), r#"[D1, A0[,"x",{}]]"#);
    }
}

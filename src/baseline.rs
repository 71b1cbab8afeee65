use crate::{tree::NodeData, Error, Payload, Sequence, Step, Tree};
use std::collections::HashMap;

/// Builds the trivially correct sequence that rewrites `source` into `target`.
///
/// Every node of `source` is deleted in reverse document order, so each deletion hits the current
/// last node, which is always a leaf. Then every node of `target` is appended in document order
/// under its parent's position in `target`'s flattened index; nodes directly under the root are
/// appended to the root. Since the nodes replayed so far always form a pre-order prefix of
/// `target`, those positions are valid at the time each step runs.
///
/// The length of this sequence is the yardstick [Fitness][crate::Fitness] is measured against.
pub fn baseline(source: &Tree, target: &Tree) -> Result<Sequence, Error> {
    let index = target.index();
    let positions: HashMap<_, _> = index.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    let mut steps = Vec::with_capacity(source.len() + index.len());
    steps.extend((0..source.len() as i64).rev().map(Step::delete));

    for &id in index {
        let parent = target
            .parent(id)
            .and_then(|p| positions.get(&p))
            .map_or(Step::ROOT, |&p| p as i64);

        let payload = match target.data(id) {
            NodeData::Element { name, attributes } => Payload {
                name: Some(name.clone()),
                content: None,
                attributes: Some(attributes.clone()).filter(|a| !a.is_empty()),
            },

            NodeData::Text(t) => Payload::text(t.clone()),
        };

        steps.push(Step::append(parent, payload)?);
    }

    Ok(steps.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{markup::parse, Fitness, Node, StepKind};
    use assert_matches::assert_matches;
    use proptest::collection::size_range;
    use test_strategy::proptest;

    #[test]
    fn deletes_then_appends() {
        let (source, target) = (parse("<p>hi</p>"), parse("<ul><li>a</li></ul><br>"));
        let b = baseline(&source, &target).expect("valid trees");

        assert_eq!(
            b.describe(),
            [
                "D1",
                "D0",
                r#"A-1[ul,"",{}]"#,
                r#"A0[li,"",{}]"#,
                r#"A1[,"a",{}]"#,
                r#"A-1[br,"",{}]"#,
            ]
        );
    }

    #[test]
    fn the_baseline_of_identical_trees_is_correct() {
        let t = parse("<p>hi</p>");
        let mut b = baseline(&t, &t).expect("valid trees");

        assert_eq!(b.len(), 4);
        assert_eq!(b.evaluate(&t, &t, Some(4)), Fitness::from(1.0));
    }

    #[test]
    fn empty_text_cannot_be_appended() {
        let target = Tree::from_nodes([Node::text("")]);
        assert_matches!(
            baseline(&Tree::new(), &target),
            Err(Error::InvalidStep {
                kind: StepKind::Append
            })
        );
    }

    #[test]
    fn attributes_are_carried_over() {
        let target = parse(r#"<a href="x">y</a>"#);
        let b = baseline(&Tree::new(), &target).expect("valid tree");
        assert_eq!(b.describe(), [r#"A-1[a,"",{href="x"}]"#, r#"A0[,"y",{}]"#]);
    }

    #[proptest]
    fn the_baseline_always_reaches_the_target(
        #[any(size_range(0..4).lift())] a: Vec<Node>,
        #[any(size_range(0..4).lift())] b: Vec<Node>,
    ) {
        let (source, target) = (Tree::from_nodes(a), Tree::from_nodes(b));
        let s = baseline(&source, &target).expect("non-empty text");

        assert_eq!(s.len(), source.len() + target.len());
        assert_eq!(s.replay(&source), target);
    }

    #[proptest]
    fn every_deletion_removes_a_single_leaf(#[any(size_range(0..4).lift())] a: Vec<Node>) {
        let source = Tree::from_nodes(a);
        let s = baseline(&source, &Tree::new()).expect("empty target");
        let mut t = source.clone();

        for (i, step) in s.iter().enumerate() {
            let before = t.len();
            t.apply(step);
            assert_eq!(t.len(), before - 1, "step {i}");
        }

        assert!(t.is_empty());
    }
}

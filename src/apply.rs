use crate::{tree::NodeData, Node, Step, StepKind, Tree};
use indextree::NodeId;
use tracing::trace;

/// The outcome of applying a [Step] to a [Tree].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Applied {
    /// Nothing was addressable, or the step had no effect on its target.
    NoOp,

    /// The tree changed; holds a deep copy of the target as it was before the change.
    Changed(Node),
}

impl Tree {
    /// Applies `step`, returning a snapshot of the node it touched.
    ///
    /// Targets are resolved against the current flattened index (see [Tree::resolve]), so a step
    /// never fails: out-of-range targets are clamped and steps with nothing to act upon are
    /// no-ops. There is no undo; replaying from a fresh clone is the only way back.
    pub fn apply(&mut self, step: &Step) -> Applied {
        let Some(id) = self.target_of(step) else {
            return Applied::NoOp;
        };

        let previous = self.snapshot(id);
        if self.edit(id, step) {
            Applied::Changed(previous)
        } else {
            Applied::NoOp
        }
    }

    /// Applies `step` without taking a snapshot.
    pub(crate) fn replay(&mut self, step: &Step) -> bool {
        self.target_of(step).is_some_and(|id| self.edit(id, step))
    }

    /// Only Append reaches the root: explicitly through [Step::ROOT], or on an empty tree.
    fn target_of(&self, step: &Step) -> Option<NodeId> {
        match step.kind() {
            StepKind::Append if step.target() == Step::ROOT => Some(self.root),
            StepKind::Append => Some(self.resolve(step.target())),
            _ if self.is_empty() => {
                trace!(%step, "nothing to address");
                None
            }
            _ => Some(self.resolve(step.target())),
        }
    }

    fn edit(&mut self, id: NodeId, step: &Step) -> bool {
        trace!(%step, "applying");
        let changed = match step.kind() {
            StepKind::Wrap => self.wrap(id, step),
            StepKind::Append => self.append(id, step),
            StepKind::Modify => self.modify(id, step),
            StepKind::Delete => self.delete(id),
        };

        if changed {
            self.invalidate();
        }

        changed
    }

    fn wrap(&mut self, id: NodeId, step: &Step) -> bool {
        let Some(name) = step.payload().name() else {
            return false;
        };

        let wrapper = self.arena.new_node(NodeData::Element {
            name: name.to_owned(),
            attributes: step.payload().attributes().cloned().unwrap_or_default(),
        });

        id.insert_before(wrapper, &mut self.arena);
        id.detach(&mut self.arena);
        wrapper.append(id, &mut self.arena);
        true
    }

    fn append(&mut self, id: NodeId, step: &Step) -> bool {
        let Some(node) = step.payload().build() else {
            return false;
        };

        let new = self.graft(&node);
        if self.data(id).is_text() {
            id.insert_after(new, &mut self.arena);
        } else {
            id.append(new, &mut self.arena);
        }

        true
    }

    fn modify(&mut self, id: NodeId, step: &Step) -> bool {
        let payload = step.payload();

        if self.has_children(id) {
            return match self.arena[id].get_mut() {
                NodeData::Element { name, attributes } => match payload.name() {
                    Some(n) => {
                        *name = n.to_owned();
                        *attributes = payload.attributes().cloned().unwrap_or_default();
                        true
                    }

                    None => payload.attributes().map_or(false, |a| {
                        *attributes = a.clone();
                        true
                    }),
                },

                NodeData::Text(_) => false,
            };
        }

        match payload.build() {
            Some(node) => {
                let new = self.graft(&node);
                id.insert_before(new, &mut self.arena);
                id.remove_subtree(&mut self.arena);
                true
            }

            None => match (self.arena[id].get_mut(), payload.attributes()) {
                (NodeData::Element { attributes, .. }, Some(a)) => {
                    *attributes = a.clone();
                    true
                }

                _ => false,
            },
        }
    }

    fn delete(&mut self, id: NodeId) -> bool {
        if self.has_children(id) {
            id.remove(&mut self.arena);
        } else {
            id.remove_subtree(&mut self.arena);
        }

        true
    }
}

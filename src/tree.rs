use crate::{node::write_open_tag, Attributes, Element, Fold, Node};
use indextree::{Arena, NodeId};
use itertools::{EitherOrBoth, Itertools};
use std::fmt::{self, Display, Formatter};
use std::sync::OnceLock;

/// The name of the synthetic element at the root of every [Tree].
pub const DOCUMENT: &str = "[document]";

/// What an arena slot of a [Tree] holds.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NodeData {
    /// An element; its children live in the arena.
    Element { name: String, attributes: Attributes },

    /// A text leaf.
    Text(String),
}

impl NodeData {
    pub fn is_text(&self) -> bool {
        matches!(self, NodeData::Text(_))
    }
}

/// An ordered markup tree whose nodes live in an arena.
///
/// Nodes are addressed by [NodeId] handles; every node records its parent and its ordered
/// children, so there are no ownership cycles. Besides handles, nodes are addressable by their
/// position in the pre-order _flattened index_, which excludes the synthetic root. The index is
/// computed on first use and dropped whenever the tree changes, so positions are only meaningful
/// between mutations.
#[derive(Debug, Clone)]
pub struct Tree {
    pub(crate) arena: Arena<NodeData>,
    pub(crate) root: NodeId,
    index: OnceLock<Box<[NodeId]>>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// A document with nothing but its root.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(NodeData::Element {
            name: DOCUMENT.to_owned(),
            attributes: Attributes::new(),
        });

        Tree {
            arena,
            root,
            index: OnceLock::new(),
        }
    }

    /// A document whose root holds the given nodes, in order.
    pub fn from_nodes<I: IntoIterator<Item = Node>>(nodes: I) -> Self {
        let mut tree = Self::new();
        let nodes: Vec<_> = nodes.into_iter().collect();
        for n in &nodes {
            let id = tree.graft(n);
            tree.root.append(id, &mut tree.arena);
        }

        debug_assert_eq!(tree.len(), nodes.count());
        tree
    }

    /// Builds a detached copy of `node` inside the arena and returns its handle.
    pub(crate) fn graft(&mut self, node: &Node) -> NodeId {
        match node {
            Node::Text(t) => self.arena.new_node(NodeData::Text(t.clone())),
            Node::Element(e) => {
                let id = self.arena.new_node(NodeData::Element {
                    name: e.name.clone(),
                    attributes: e.attributes.clone(),
                });

                for c in &e.children {
                    let child = self.graft(c);
                    id.append(child, &mut self.arena);
                }

                id
            }
        }
    }

    /// Drops the flattened index; must follow every structural change.
    pub(crate) fn invalidate(&mut self) {
        self.index.take();
    }

    /// The synthetic root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The pre-order flattened index of every node but the root.
    pub fn index(&self) -> &[NodeId] {
        self.index
            .get_or_init(|| self.root.descendants(&self.arena).skip(1).collect())
    }

    /// The number of nodes, not counting the root.
    pub fn len(&self) -> usize {
        self.index().len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena[self.root].first_child().is_none()
    }

    /// The node at `position` in the flattened index.
    pub fn get(&self, position: usize) -> Option<NodeId> {
        self.index().get(position).copied()
    }

    /// The position of `id` in the flattened index.
    pub fn position_of(&self, id: NodeId) -> Option<usize> {
        self.index().iter().position(|&n| n == id)
    }

    /// Resolves a step target to a node.
    ///
    /// Targets are clamped into the index: negative ones to the first node, those past the end to
    /// the last. An empty tree resolves everything to the root.
    pub fn resolve(&self, target: i64) -> NodeId {
        let index = self.index();
        let position = usize::try_from(target).unwrap_or(0);
        match index.last() {
            Some(&last) => index.get(position).copied().unwrap_or(last),
            None => self.root,
        }
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        self.arena[id].get()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    /// Whether `id` is an element with at least one child.
    pub fn has_children(&self, id: NodeId) -> bool {
        self.arena[id].first_child().is_some()
    }

    /// A deep owned copy of the subtree rooted at `id`.
    pub fn snapshot(&self, id: NodeId) -> Node {
        match self.data(id) {
            NodeData::Text(t) => Node::Text(t.clone()),
            NodeData::Element { name, attributes } => Element {
                name: name.clone(),
                attributes: attributes.clone(),
                children: self.children(id).map(|c| self.snapshot(c)).collect(),
            }
            .into(),
        }
    }

    /// Deep owned copies of the root's children.
    pub fn to_nodes(&self) -> Vec<Node> {
        self.children(self.root).map(|c| self.snapshot(c)).collect()
    }

    fn same(&self, a: NodeId, other: &Tree, b: NodeId) -> bool {
        self.data(a) == other.data(b)
            && self
                .children(a)
                .zip_longest(other.children(b))
                .all(|pair| match pair {
                    EitherOrBoth::Both(x, y) => self.same(x, other, y),
                    _ => false,
                })
    }

    fn write(&self, f: &mut Formatter<'_>, id: NodeId) -> fmt::Result {
        match self.data(id) {
            NodeData::Text(t) => f.write_str(t),
            NodeData::Element { name, attributes } => {
                write_open_tag(f, name, attributes)?;
                for c in self.children(id) {
                    self.write(f, c)?;
                }
                write!(f, "</{name}>")
            }
        }
    }
}

/// Structural equality: same names, attributes, text and ordering at every position.
impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        self.same(self.root, other, other.root)
    }
}

impl Eq for Tree {}

impl Display for Tree {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.children(self.root).try_for_each(|c| self.write(f, c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::size_range;
    use test_strategy::proptest;

    fn list() -> Tree {
        Tree::from_nodes([Node::element("ul")
            .with_child(Node::element("li").with_child("a"))
            .with_child(Node::element("li").with_child("b"))])
    }

    #[test]
    fn index_is_pre_order_without_the_root() {
        let t = list();
        let names: Vec<_> = t
            .index()
            .iter()
            .map(|&id| match t.data(id) {
                NodeData::Element { name, .. } => name.clone(),
                NodeData::Text(s) => s.clone(),
            })
            .collect();

        assert_eq!(names, ["ul", "li", "a", "li", "b"]);
    }

    #[test]
    fn resolve_clamps_past_the_end() {
        let t = list();
        assert_eq!(t.resolve(4), t.index()[4]);
        assert_eq!(t.resolve(1000), t.index()[4]);
    }

    #[test]
    fn resolve_clamps_negative_targets_to_the_first_node() {
        let t = list();
        assert_eq!(t.resolve(-1), t.index()[0]);
        assert_eq!(t.resolve(i64::MIN), t.index()[0]);
    }

    #[test]
    fn an_empty_tree_resolves_to_the_root() {
        let t = Tree::new();
        assert!(t.is_empty());
        assert_eq!(t.len(), 0);
        assert_eq!(t.resolve(0), t.root());
        assert_eq!(t.resolve(7), t.root());
        assert_eq!(t.resolve(-3), t.root());
    }

    #[test]
    fn renders_the_children_of_the_root() {
        assert_eq!(list().to_string(), "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn attribute_order_does_not_matter() {
        let a = Tree::from_nodes([Node::element("a")
            .with_attribute("x", "1")
            .with_attribute("y", "2")]);
        let b = Tree::from_nodes([Node::element("a")
            .with_attribute("y", "2")
            .with_attribute("x", "1")]);

        assert_eq!(a, b);
    }

    #[test]
    fn trees_with_different_shapes_are_not_equal() {
        let flat = Tree::from_nodes([Node::element("li"), Node::element("li")]);
        let nested = Tree::from_nodes([Node::element("li").with_child(Node::element("li"))]);

        assert_ne!(flat, nested);
        assert_eq!(flat.len(), nested.len());
    }

    #[proptest]
    fn nodes_survive_a_round_trip(#[any(size_range(0..4).lift())] nodes: Vec<Node>) {
        let t = Tree::from_nodes(nodes.clone());
        assert_eq!(t.to_nodes(), nodes);
        assert_eq!(t.len(), nodes.count());
    }

    #[proptest]
    fn positions_match_the_index(#[any(size_range(1..4).lift())] nodes: Vec<Node>) {
        let t = Tree::from_nodes(nodes);
        for (i, &id) in t.index().iter().enumerate() {
            assert_eq!(t.position_of(id), Some(i));
            assert_eq!(t.get(i), Some(id));
        }
    }

    #[proptest]
    fn clones_are_equal(#[any(size_range(0..4).lift())] nodes: Vec<Node>) {
        let t = Tree::from_nodes(nodes);
        assert_eq!(t.clone(), t);
    }
}

use derive_more::From;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// The attributes of an element, keyed by name.
pub type Attributes = BTreeMap<String, String>;

/// An owned element together with its subtree.
#[derive(Debug, Default, Clone, Eq, PartialEq, Hash)]
pub struct Element {
    /// The element's tag name.
    pub name: String,

    /// The element's attributes.
    pub attributes: Attributes,

    /// The element's children, in document order.
    pub children: Vec<Node>,
}

/// An owned node of a markup tree.
///
/// [Node]s are how subtrees travel in and out of a [Tree][crate::Tree]: they seed trees built by
/// hand and they are the deep snapshots returned by [Tree::apply][crate::Tree::apply].
#[derive(Debug, Clone, Eq, PartialEq, Hash, From)]
pub enum Node {
    /// An element with a name, attributes and children.
    Element(Element),

    /// A text leaf.
    Text(String),
}

impl Node {
    /// An element without attributes or children.
    pub fn element(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            ..Element::default()
        }
        .into()
    }

    /// A text leaf.
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(content.into())
    }

    /// Adds an attribute; does nothing on text nodes.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let Node::Element(e) = &mut self {
            e.attributes.insert(key.into(), value.into());
        }
        self
    }

    /// Appends a child; does nothing on text nodes.
    #[must_use]
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        if let Node::Element(e) = &mut self {
            e.children.push(child.into());
        }
        self
    }

    /// Appends several children at once; does nothing on text nodes.
    #[must_use]
    pub fn with_children<I: IntoIterator<Item = Node>>(mut self, children: I) -> Self {
        if let Node::Element(e) = &mut self {
            e.children.extend(children);
        }
        self
    }

    /// This node's children, which is always empty for text.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(e) => &e.children,
            Node::Text(_) => &[],
        }
    }
}

impl From<&str> for Node {
    fn from(content: &str) -> Self {
        Node::text(content)
    }
}

pub(crate) fn write_open_tag(f: &mut Formatter<'_>, name: &str, attrs: &Attributes) -> fmt::Result {
    write!(f, "<{name}")?;
    for (k, v) in attrs {
        write!(f, " {k}=\"{}\"", v.replace('"', "&quot;"))?;
    }
    write!(f, ">")
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(t) => f.write_str(t),
            Node::Element(e) => {
                write_open_tag(f, &e.name, &e.attributes)?;
                for c in &e.children {
                    write!(f, "{c}")?;
                }
                write!(f, "</{}>", e.name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Fold;
    use proptest::collection::{btree_map, vec};
    use proptest::prelude::*;
    use test_strategy::proptest;

    fn name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("div".to_owned()),
            Just("p".to_owned()),
            Just("span".to_owned()),
            Just("ul".to_owned()),
            Just("li".to_owned()),
            Just("em".to_owned()),
        ]
    }

    fn attributes() -> impl Strategy<Value = Attributes> {
        btree_map("[a-z]{1,3}", "[a-z0-9]{0,3}", 0..2)
    }

    fn node() -> impl Strategy<Value = Node> {
        let leaf = prop_oneof![
            "[a-z ]{1,6}".prop_map(Node::Text),
            (name(), attributes()).prop_map(|(name, attributes)| Element {
                name,
                attributes,
                children: Vec::new(),
            }
            .into()),
        ];

        leaf.prop_recursive(4, 32, 4, |inner| {
            (name(), attributes(), vec(inner, 0..=4)).prop_map(|(name, attributes, children)| {
                Element {
                    name,
                    attributes,
                    children,
                }
                .into()
            })
        })
    }

    impl Arbitrary for Node {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_: ()) -> Self::Strategy {
            node().boxed()
        }
    }

    #[test]
    fn builders_ignore_children_and_attributes_on_text() {
        let t = Node::text("x").with_attribute("a", "b").with_child("y");
        assert_eq!(t, Node::text("x"));
    }

    #[test]
    fn renders_markup() {
        let n = Node::element("p")
            .with_attribute("class", "a\"b")
            .with_child("hi")
            .with_child(Node::element("br"));

        assert_eq!(n.to_string(), r#"<p class="a&quot;b">hi<br></br></p>"#);
    }

    #[proptest]
    fn text_nodes_have_no_children(#[strategy("[a-z]*")] content: String) {
        assert!(Node::text(content).children().is_empty());
    }

    #[proptest]
    fn count_equals_one_plus_count_of_children(n: Node) {
        assert_eq!(n.count(), 1 + n.children().count());
    }
}

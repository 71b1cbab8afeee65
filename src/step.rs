use crate::{Attributes, Element, Error, Node};
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// The four primitive edit operations.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StepKind {
    /// Replace a node by a new element that holds it as its only child.
    Wrap,

    /// Add a node as the last child of an element, or right after a text node.
    Append,

    /// Rename an element in place, or replace a childless node.
    Modify,

    /// Unwrap an element with children, or remove a childless node.
    Delete,
}

impl StepKind {
    pub const ALL: [StepKind; 4] = [
        StepKind::Wrap,
        StepKind::Append,
        StepKind::Modify,
        StepKind::Delete,
    ];

    /// The one-letter symbol used when rendering steps.
    pub fn symbol(self) -> char {
        match self {
            StepKind::Wrap => 'W',
            StepKind::Append => 'A',
            StepKind::Modify => 'M',
            StepKind::Delete => 'D',
        }
    }

    pub(crate) fn requirement(self) -> &'static str {
        match self {
            StepKind::Wrap => "a name",
            StepKind::Append => "a name or some content",
            StepKind::Modify => "a name, some content or attributes",
            StepKind::Delete => "an empty payload",
        }
    }
}

impl Display for StepKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepKind::Wrap => "wrap",
            StepKind::Append => "append",
            StepKind::Modify => "modify",
            StepKind::Delete => "delete",
        };

        f.write_str(name)
    }
}

impl FromStr for StepKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepKind::ALL
            .into_iter()
            .find(|k| {
                s.eq_ignore_ascii_case(&k.to_string())
                    || s.eq_ignore_ascii_case(k.symbol().encode_utf8(&mut [0; 4]))
            })
            .ok_or_else(|| Error::UnknownKind(s.to_owned()))
    }
}

/// What a step carries besides its kind and target.
///
/// Empty strings and empty attribute maps count as absent.
#[derive(Debug, Default, Clone, Eq, PartialEq, Hash)]
pub struct Payload {
    pub name: Option<String>,
    pub content: Option<String>,
    pub attributes: Option<Attributes>,
}

impl Payload {
    /// A payload naming an element.
    pub fn named(name: impl Into<String>) -> Self {
        Payload {
            name: Some(name.into()),
            ..Payload::default()
        }
    }

    /// A payload holding text.
    pub fn text(content: impl Into<String>) -> Self {
        Payload {
            content: Some(content.into()),
            ..Payload::default()
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.is_empty())
    }

    pub fn attributes(&self) -> Option<&Attributes> {
        self.attributes.as_ref().filter(|a| !a.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.name().is_none() && self.content().is_none() && self.attributes().is_none()
    }

    /// Whether a step of `kind` may carry this payload.
    pub fn admits(&self, kind: StepKind) -> bool {
        match kind {
            StepKind::Wrap => self.name().is_some(),
            StepKind::Append => self.name().is_some() || self.content().is_some(),
            StepKind::Modify => !self.is_empty(),
            StepKind::Delete => self.is_empty(),
        }
    }

    /// The node that Append and Modify insert: an element, with the content as its only child if
    /// any, or a bare text node when there is no name.
    pub(crate) fn build(&self) -> Option<Node> {
        match (self.name(), self.content()) {
            (Some(name), content) => Some(
                Element {
                    name: name.to_owned(),
                    attributes: self.attributes().cloned().unwrap_or_default(),
                    children: content.map(Node::text).into_iter().collect(),
                }
                .into(),
            ),

            (None, Some(content)) => Some(Node::text(content)),
            (None, None) => None,
        }
    }
}

/// A validated primitive edit operation.
///
/// Two [Step]s are equal if they have the same kind and, unless they are both deletions, the same
/// target and payload.
#[derive(Debug, Clone)]
pub struct Step {
    kind: StepKind,
    target: i64,
    payload: Payload,
}

impl Step {
    /// The target through which Append reaches the document root; any other negative target
    /// clamps to the first node.
    pub const ROOT: i64 = -1;

    /// Builds a step, checking that `payload` suits `kind`.
    pub fn new(kind: StepKind, target: i64, payload: Payload) -> Result<Self, Error> {
        if !payload.admits(kind) {
            return Err(Error::InvalidStep { kind });
        }

        Ok(Step {
            kind,
            target,
            payload,
        })
    }

    pub fn wrap(target: i64, payload: Payload) -> Result<Self, Error> {
        Self::new(StepKind::Wrap, target, payload)
    }

    pub fn append(target: i64, payload: Payload) -> Result<Self, Error> {
        Self::new(StepKind::Append, target, payload)
    }

    pub fn modify(target: i64, payload: Payload) -> Result<Self, Error> {
        Self::new(StepKind::Modify, target, payload)
    }

    pub fn delete(target: i64) -> Self {
        Step {
            kind: StepKind::Delete,
            target,
            payload: Payload::default(),
        }
    }

    pub fn kind(&self) -> StepKind {
        self.kind
    }

    pub fn target(&self) -> i64 {
        self.target
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Points the step elsewhere; the target is not validated until the step is applied.
    pub(crate) fn retarget(&mut self, target: i64) {
        self.target = target;
    }

    /// Breaks the step back into the values it was built from.
    pub fn into_parts(self) -> (StepKind, i64, Payload) {
        (self.kind, self.target, self.payload)
    }
}

impl PartialEq for Step {
    fn eq(&self, other: &Self) -> bool {
        match (self.kind, other.kind) {
            (StepKind::Delete, StepKind::Delete) => true,
            (a, b) => a == b && self.target == other.target && self.payload == other.payload,
        }
    }
}

impl Eq for Step {}

impl Hash for Step {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        if self.kind != StepKind::Delete {
            self.target.hash(state);
            self.payload.hash(state);
        }
    }
}

impl Display for Step {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.symbol(), self.target)?;
        if self.kind == StepKind::Delete {
            return Ok(());
        }

        let name = self.payload.name().unwrap_or("");
        let content = self.payload.content().unwrap_or("");
        let mut truncated: String = content.chars().take(10).collect();
        if truncated.len() < content.len() {
            truncated.push_str("..");
        }

        write!(f, "[{name},{truncated:?},{{")?;
        for (i, (k, v)) in self.payload.attributes().into_iter().flatten().enumerate() {
            let sep = if i == 0 { "" } else { "," };
            write!(f, "{sep}{k}={v:?}")?;
        }

        write!(f, "}}]")
    }
}

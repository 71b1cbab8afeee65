//! Markup parsing.
//!
//! Documents are tokenized with html5ever's tokenizer and assembled by hand, without HTML5 tree
//! construction: no `html`/`head`/`body` elements are synthesized and the resulting [Tree] mirrors
//! the literal nesting of the input.

use crate::{tree::NodeData, Attributes, Tree};
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
    TokenizerResult,
};
use indextree::NodeId;
use tracing::trace;

/// Elements that never have content.
const VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

struct Builder {
    tree: Tree,
    open: Vec<(NodeId, String)>,
}

impl Builder {
    fn current(&self) -> NodeId {
        self.open.last().map_or(self.tree.root, |&(id, _)| id)
    }

    fn start(&mut self, tag: Tag) -> TokenSinkResult<()> {
        let name = tag.name.to_string();
        let mut attributes = Attributes::new();
        for attr in tag.attrs {
            attributes
                .entry(attr.name.local.to_string())
                .or_insert_with(|| attr.value.to_string());
        }

        let parent = self.current();
        let id = self.tree.arena.new_node(NodeData::Element {
            name: name.clone(),
            attributes,
        });
        parent.append(id, &mut self.tree.arena);

        if tag.self_closing || VOID.contains(&name.as_str()) {
            return TokenSinkResult::Continue;
        }

        let raw = match name.as_str() {
            "script" => Some(RawKind::ScriptData),
            "style" | "xmp" | "iframe" | "noembed" | "noframes" => Some(RawKind::Rawtext),
            "title" | "textarea" => Some(RawKind::Rcdata),
            _ => None,
        };

        self.open.push((id, name));
        raw.map_or(TokenSinkResult::Continue, TokenSinkResult::RawData)
    }

    fn end(&mut self, tag: &Tag) {
        if let Some(i) = self.open.iter().rposition(|(_, n)| **n == *tag.name) {
            self.open.truncate(i);
        } else {
            trace!(name = %tag.name, "ignoring unmatched end tag");
        }
    }

    fn characters(&mut self, text: &str) {
        let parent = self.current();
        if let Some(last) = self.tree.arena[parent].last_child() {
            if let NodeData::Text(t) = self.tree.arena[last].get_mut() {
                t.push_str(text);
                return;
            }
        }

        let id = self.tree.arena.new_node(NodeData::Text(text.to_owned()));
        parent.append(id, &mut self.tree.arena);
    }
}

impl TokenSink for Builder {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => match tag.kind {
                TagKind::StartTag => return self.start(tag),
                TagKind::EndTag => self.end(&tag),
            },
            Token::CharacterTokens(text) => self.characters(&text),
            Token::ParseError(e) => trace!(%e, "markup parse error"),
            Token::DoctypeToken(_)
            | Token::CommentToken(_)
            | Token::NullCharacterToken
            | Token::EOFToken => {}
        }

        TokenSinkResult::Continue
    }
}

/// Parses markup into a cleaned [Tree].
pub fn parse(markup: &str) -> Tree {
    let builder = Builder {
        tree: Tree::new(),
        open: Vec::new(),
    };

    let mut input = BufferQueue::new();
    input.push_back(StrTendril::from_slice(markup));

    let mut tokenizer = Tokenizer::new(builder, TokenizerOpts::default());
    // The sink never pauses for scripts, so a single feed consumes the whole input.
    while let TokenizerResult::Script(()) = tokenizer.feed(&mut input) {}
    tokenizer.end();

    let mut tree = tokenizer.sink.tree;
    clean(&mut tree);
    tree
}

/// Strips everything but elements from the top level of the document.
///
/// Doctypes and comments are never materialized by [parse]; what remains to remove is text
/// sitting directly under the root, such as the whitespace around `<html>`.
pub fn clean(tree: &mut Tree) {
    let stray: Vec<_> = tree
        .children(tree.root)
        .filter(|&id| tree.data(id).is_text())
        .collect();

    for id in stray {
        id.remove_subtree(&mut tree.arena);
    }

    tree.invalidate();
}

use crate::{markup, Tree};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Parsed canonical trees, keyed by their raw markup.
///
/// Meant to live for a single search run. The lock is never held while parsing: concurrent misses
/// on the same document parse it redundantly and the last writer wins, which is harmless since
/// markup is immutable and equal inputs parse to equal trees.
#[derive(Debug, Default)]
pub struct DocumentCache {
    trees: RwLock<HashMap<String, Arc<Tree>>>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical tree for `markup`, parsing it on a miss.
    ///
    /// Callers get a shared, read-only tree; replays must work on clones of it.
    pub fn tree(&self, markup: &str) -> Arc<Tree> {
        if let Some(tree) = self.trees.read().ok().and_then(|m| m.get(markup).cloned()) {
            return tree;
        }

        debug!(bytes = markup.len(), "parsing uncached document");
        let tree = Arc::new(markup::parse(markup));
        if let Ok(mut trees) = self.trees.write() {
            trees.insert(markup.to_owned(), tree.clone());
        }

        tree
    }

    /// The number of cached documents.
    pub fn len(&self) -> usize {
        self.trees.read().map_or(0, |m| m.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets every cached tree.
    pub fn clear(&self) {
        if let Ok(mut trees) = self.trees.write() {
            trees.clear();
        }
    }
}

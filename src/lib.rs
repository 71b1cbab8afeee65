//! # Overview
//!
//! This crate searches for short _edit scripts_ between two markup documents: sequences of
//! primitive [Step]s (wrap, append, modify and delete) that rewrite a source tree into a target
//! tree. Steps address nodes by their position in the pre-order flattening of the tree as it
//! stands when they run, which makes any sequence of them a valid, if not necessarily useful,
//! edit script.
//!
//! A trivially correct script always exists, the [baseline]: delete everything, then append the
//! target node by node. Starting from it, a [genetic algorithm][ga] evolves a population of
//! sequences, scoring each by whether it reaches the target and how much shorter than the
//! baseline it is.
//!
//! [ga]: https://en.wikipedia.org/wiki/Genetic_algorithm
//!
//! # Example
//!
//! ```rust
//! use tree_edit_search::*;
//!
//! let config = SearchConfig {
//!     population_size: 16,
//!     generations: 4,
//!     workers: Some(1),
//!     ..SearchConfig::default()
//! };
//!
//! let cache = DocumentCache::new();
//! let search = Search::from_markup(
//!     config,
//!     &cache,
//!     "<ul><li>a</li></ul>",
//!     "<ol><li>a</li></ol>",
//! )?;
//!
//! assert_eq!(search.baseline().len(), 6);
//!
//! let outcome = search.run()?;
//!
//! assert!(outcome.best.len() <= outcome.baseline_len);
//! assert_eq!(outcome.best.replay(search.source()), *search.target());
//!
//! for line in outcome.best.describe() {
//!     println!("{line}");
//! }
//! # Ok::<(), Error>(())
//! ```

pub mod markup;

mod apply;
mod baseline;
mod cache;
mod error;
mod mutate;
mod node;
mod search;
mod select;
mod sequence;
mod step;
mod tree;

pub use apply::*;
pub use baseline::*;
pub use cache::*;
pub use error::*;
pub use mutate::*;
pub use node::*;
pub use search::*;
pub use select::*;
pub use sequence::*;
pub use step::*;
pub use tree::*;

mod fold;

pub(crate) use fold::*;

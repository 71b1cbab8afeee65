use crate::StepKind;
use thiserror::Error;

/// Everything that can go wrong while building steps or setting up a [Search][crate::Search].
///
/// Replaying a [Sequence][crate::Sequence] never fails: out-of-range targets are clamped and
/// sequences that miss the target tree simply score zero.
#[derive(Debug, Error)]
pub enum Error {
    /// The payload does not satisfy the validity rule of the requested [StepKind].
    #[error("{kind} step requires {}", .kind.requirement())]
    InvalidStep { kind: StepKind },

    /// A step kind could not be recognized.
    #[error("unrecognized step kind `{0}`")]
    UnknownKind(String),

    /// A [SearchConfig][crate::SearchConfig] was rejected before any evaluation.
    #[error("invalid search configuration: {0}")]
    Config(&'static str),

    /// The evaluation worker pool could not be started.
    #[error(transparent)]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

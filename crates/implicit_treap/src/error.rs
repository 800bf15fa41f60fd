use thiserror::Error;

use crate::combinator::CombinatorKind;

/// Errors reported by [`ImplicitTreap`](crate::ImplicitTreap) operations.
///
/// Every failing call is rejected before the tree is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreapError {
    #[error("index {index} out of bounds for sequence of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Half-open `start..end` that is inverted or reaches past `len`.
    #[error("range {start}..{end} out of bounds for sequence of length {len}")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },

    /// The combinator cannot spread one update value over a subtree.
    #[error("range update needs an idempotent or additive combinator, got a {kind} one")]
    AggregationContract { kind: CombinatorKind },
}

pub type Result<T, E = TreapError> = std::result::Result<T, E>;

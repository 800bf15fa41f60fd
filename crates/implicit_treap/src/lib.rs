mod arena;
mod combinator;
mod error;
mod treap;

pub use combinator::{Combinator, CombinatorKind, Max, Min, Primitive, Sum, Xor};
pub use error::{Result, TreapError};
pub use treap::{ImplicitTreap, TreapConfig, UpdateMode};

use std::fmt;
use std::marker::PhantomData;
use std::ops::Add;

/// How a single pending update value spreads over a subtree of `n` elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CombinatorKind {
    /// `x ⊕ x = x` (max, min). A batch update affects the aggregate exactly as
    /// it affects one element, so the value is applied unchanged.
    Idempotent,
    /// `x ⊕ x = 2x` (sum). A batch update over `n` elements contributes the
    /// `n`-fold combination of the value.
    Additive,
    /// Anything else. Folds, point writes and reversal work, range updates
    /// are rejected.
    General,
}

impl fmt::Display for CombinatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idempotent => "idempotent",
            Self::Additive => "additive",
            Self::General => "general",
        };
        f.write_str(name)
    }
}

/// An associative fold over sequence values, with an explicitly declared kind.
///
/// `identity()` must be neutral for `combine`. `Value`'s `Add` is the
/// accumulation used by [`UpdateMode::Accumulate`](crate::UpdateMode), which is
/// independent of the fold itself (accumulating into a max-tree still adds).
///
/// The `Add` bound holds for every kind, `General` included. Pending tags are
/// resolved inside `split` and `merge`, which every operation shares, so the
/// bound cannot be confined to the update path. A `General` combinator never
/// gets a pending tag and its `Add` is never called.
pub trait Combinator {
    type Value: Clone + Add<Output = Self::Value>;

    const KIND: CombinatorKind;

    fn identity() -> Self::Value;

    fn combine(left: &Self::Value, right: &Self::Value) -> Self::Value;

    /// `value ⊕ value ⊕ ... ⊕ value` (`count` times).
    ///
    /// The default is binary doubling over `combine`; additive combinators over
    /// numbers should override it with a multiplication.
    fn scale(value: &Self::Value, count: usize) -> Self::Value {
        let mut result = Self::identity();
        let mut base = value.clone();
        let mut count = count;
        while count > 0 {
            if count & 1 == 1 {
                result = Self::combine(&result, &base);
            }
            count >>= 1;
            if count > 0 {
                base = Self::combine(&base, &base);
            }
        }
        result
    }

    /// Contribution of one pending update to the aggregate of `count` elements.
    ///
    /// `None` for [`CombinatorKind::General`].
    fn spread(value: &Self::Value, count: usize) -> Option<Self::Value> {
        match Self::KIND {
            CombinatorKind::Idempotent => Some(value.clone()),
            CombinatorKind::Additive => Some(Self::scale(value, count)),
            CombinatorKind::General => None,
        }
    }
}

/// Primitive integers usable with the provided combinators.
pub trait Primitive: Copy + Ord + Add<Output = Self> + Default + fmt::Debug {
    const ZERO: Self;
    const MIN: Self;
    const MAX: Self;

    fn mul_count(self, count: usize) -> Self;
    fn xor(self, other: Self) -> Self;
}

/// `value + value + ... + value` (`count` times) without ever forming `count`
/// as a `T`, so it only overflows when the true result does.
fn add_doubling<T: Primitive>(value: T, mut count: usize) -> T {
    let mut result = T::ZERO;
    let mut base = value;
    while count > 0 {
        if count & 1 == 1 {
            result = result + base;
        }
        count >>= 1;
        if count > 0 {
            base = base + base;
        }
    }
    result
}

macro_rules! impl_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const ZERO: Self = 0;
                const MIN: Self = <$ty>::MIN;
                const MAX: Self = <$ty>::MAX;

                #[inline]
                fn mul_count(self, count: usize) -> Self {
                    match <$ty>::try_from(count) {
                        Ok(count) => self * count,
                        Err(_) => add_doubling(self, count),
                    }
                }

                #[inline]
                fn xor(self, other: Self) -> Self {
                    self ^ other
                }
            }
        )*
    };
}

impl_primitive!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

/// Range sum.
pub struct Sum<T>(PhantomData<T>);

impl<T: Primitive> Combinator for Sum<T> {
    type Value = T;

    const KIND: CombinatorKind = CombinatorKind::Additive;

    fn identity() -> T {
        T::ZERO
    }

    fn combine(left: &T, right: &T) -> T {
        *left + *right
    }

    fn scale(value: &T, count: usize) -> T {
        value.mul_count(count)
    }
}

/// Range maximum.
pub struct Max<T>(PhantomData<T>);

impl<T: Primitive> Combinator for Max<T> {
    type Value = T;

    const KIND: CombinatorKind = CombinatorKind::Idempotent;

    fn identity() -> T {
        T::MIN
    }

    fn combine(left: &T, right: &T) -> T {
        *left.max(right)
    }
}

/// Range minimum.
pub struct Min<T>(PhantomData<T>);

impl<T: Primitive> Combinator for Min<T> {
    type Value = T;

    const KIND: CombinatorKind = CombinatorKind::Idempotent;

    fn identity() -> T {
        T::MAX
    }

    fn combine(left: &T, right: &T) -> T {
        *left.min(right)
    }
}

/// Range xor. Supports folds but not range updates.
pub struct Xor<T>(PhantomData<T>);

impl<T: Primitive> Combinator for Xor<T> {
    type Value = T;

    const KIND: CombinatorKind = CombinatorKind::General;

    fn identity() -> T {
        T::ZERO
    }

    fn combine(left: &T, right: &T) -> T {
        left.xor(*right)
    }
}

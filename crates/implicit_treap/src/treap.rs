use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::arena::{Arena, Id, NIL};
use crate::combinator::{Combinator, CombinatorKind};
use crate::error::{Result, TreapError};

const FALLBACK_SEED: u64 = 0x5EED_BB57;

/// How a range update combines with the values it lands on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum UpdateMode {
    /// Every element in the range becomes the update value.
    #[default]
    Overwrite,
    /// The update value is added to every element in the range.
    Accumulate,
}

/// Construction options for [`ImplicitTreap`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreapConfig {
    /// Priority seed. `None` seeds from the system clock.
    pub seed: Option<u64>,
    pub mode: UpdateMode,
}

/// Sequence with positional access, range folds, range updates and range
/// reversal, all in expected `O(log n)`.
///
/// Positions are 0-based ranks into the current sequence. Range operations
/// take any `RangeBounds<usize>`; `l..=r` addresses the inclusive `[l, r]`.
///
/// Tags follow the usual convention: a tag on a node is already reflected in
/// that node's value and aggregates and is owed only to its children.
pub struct ImplicitTreap<C: Combinator> {
    arena: Arena<C>,
    root: Id,
    mode: UpdateMode,
    rng: StdRng,
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(FALLBACK_SEED)
}

impl<C: Combinator> ImplicitTreap<C> {
    pub fn new() -> Self {
        Self::with_config(TreapConfig::default())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_config(TreapConfig {
            seed: Some(seed),
            ..TreapConfig::default()
        })
    }

    pub fn with_config(config: TreapConfig) -> Self {
        let seed = config.seed.unwrap_or_else(clock_seed);
        log::trace!("implicit treap seeded with {seed:#x}, {:?} mode", config.mode);
        Self {
            arena: Arena::new(),
            root: NIL,
            mode: config.mode,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// `len` default values.
    pub fn with_len(len: usize) -> Self
    where
        C::Value: Default,
    {
        Self::from_values(std::iter::repeat_with(C::Value::default).take(len))
    }

    pub fn from_values<I: IntoIterator<Item = C::Value>>(values: I) -> Self {
        let mut treap = Self::new();
        treap.extend(values);
        treap
    }

    pub fn from_values_with_seed<I: IntoIterator<Item = C::Value>>(values: I, seed: u64) -> Self {
        let mut treap = Self::with_seed(seed);
        treap.extend(values);
        treap
    }

    pub fn len(&self) -> usize {
        self.arena.size(self.root) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.root == NIL
    }

    pub fn mode(&self) -> UpdateMode {
        self.mode
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = NIL;
    }

    pub fn push_back(&mut self, value: C::Value) {
        let node = self.new_node(value);
        self.root = self.merge(self.root, node);
    }

    /// Inserts `value` so that it ends up at `index`. `index == len()` appends.
    pub fn insert(&mut self, index: usize, value: C::Value) -> Result<()> {
        let len = self.len();
        if index > len {
            return Err(Self::index_error(index, len));
        }
        let node = self.new_node(value);
        let (left, right) = self.split(self.root, index);
        let left = self.merge(left, node);
        self.root = self.merge(left, right);
        Ok(())
    }

    /// Removes the element at `index` and returns it.
    pub fn erase(&mut self, index: usize) -> Result<C::Value> {
        self.check_index(index)?;
        let (left, rest) = self.split(self.root, index);
        let (target, right) = self.split(rest, 1);
        self.root = self.merge(left, right);
        Ok(self.arena.release(target))
    }

    pub fn get(&mut self, index: usize) -> Result<C::Value> {
        self.check_index(index)?;
        Ok(self.with_range(index, index + 1, |treap, mid| {
            treap.arena.node(mid).value.clone()
        }))
    }

    /// Overwrites the element at `index` directly, bypassing the update mode.
    pub fn set(&mut self, index: usize, value: C::Value) -> Result<()> {
        self.check_index(index)?;
        self.with_range(index, index + 1, |treap, mid| {
            treap.push(mid);
            treap.arena.node_mut(mid).value = value;
            treap.recalc(mid);
        });
        Ok(())
    }

    /// Combinator fold over `range`. An empty range folds to the identity.
    pub fn fold<R: RangeBounds<usize>>(&mut self, range: R) -> Result<C::Value> {
        let (start, end) = Self::normalize_range(range, self.len())?;
        if start == end {
            return Ok(C::identity());
        }
        Ok(self.with_range(start, end, |treap, mid| treap.arena.agg(mid)))
    }

    /// Applies `value` to every element of `range` under the current mode.
    ///
    /// Fails with [`TreapError::AggregationContract`] when the combinator is
    /// [`CombinatorKind::General`].
    pub fn update<R: RangeBounds<usize>>(&mut self, range: R, value: C::Value) -> Result<()> {
        if C::KIND == CombinatorKind::General {
            log::debug!("rejected range update on a {} combinator", C::KIND);
            return Err(TreapError::AggregationContract { kind: C::KIND });
        }
        let (start, end) = Self::normalize_range(range, self.len())?;
        if start == end {
            return Ok(());
        }
        self.with_range(start, end, |treap, mid| treap.apply_update(mid, &value));
        Ok(())
    }

    pub fn reverse<R: RangeBounds<usize>>(&mut self, range: R) -> Result<()> {
        let (start, end) = Self::normalize_range(range, self.len())?;
        if start == end {
            return Ok(());
        }
        self.with_range(start, end, |treap, mid| treap.apply_reverse(mid));
        Ok(())
    }

    /// Changes how future range updates combine.
    ///
    /// Pending updates were recorded under the old mode, so the whole tree is
    /// flushed first. `O(n)` unless `mode` is already active.
    pub fn set_mode(&mut self, mode: UpdateMode) {
        if mode == self.mode {
            return;
        }
        let flushed = self.flush();
        log::debug!(
            "switching update mode {:?} -> {mode:?} after flushing {flushed} nodes",
            self.mode
        );
        self.mode = mode;
    }

    pub fn switch_to_accumulate(&mut self) {
        self.set_mode(UpdateMode::Accumulate);
    }

    pub fn switch_to_overwrite(&mut self) {
        self.set_mode(UpdateMode::Overwrite);
    }

    /// The logical sequence in order. Pending tags are resolved on the fly;
    /// the tree is left as is.
    pub fn to_vec(&self) -> Vec<C::Value> {
        let mut out = Vec::with_capacity(self.len());
        self.collect(self.root, None, false, &mut out);
        out
    }

    fn collect(&self, x: Id, owed: Option<&C::Value>, flip: bool, out: &mut Vec<C::Value>) {
        if x == NIL {
            return;
        }
        let node = self.arena.node(x);
        let value = match owed {
            Some(act) => self.apply_to_value(&node.value, act),
            None => node.value.clone(),
        };
        let child_owed = self.compose(node.pending.as_ref(), owed);
        let child_flip = flip ^ node.rev;
        let (first, second) = if flip {
            (node.right, node.left)
        } else {
            (node.left, node.right)
        };
        self.collect(first, child_owed.as_ref(), child_flip, out);
        out.push(value);
        self.collect(second, child_owed.as_ref(), child_flip, out);
    }

    fn new_node(&mut self, value: C::Value) -> Id {
        let prio = self.rng.random::<u32>();
        self.arena.alloc(value, prio)
    }

    fn index_error(index: usize, len: usize) -> TreapError {
        log::debug!("rejected index {index} for length {len}");
        TreapError::IndexOutOfBounds { index, len }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let len = self.len();
        if index >= len {
            return Err(Self::index_error(index, len));
        }
        Ok(())
    }

    fn normalize_range<R: RangeBounds<usize>>(range: R, len: usize) -> Result<(usize, usize)> {
        let start = match range.start_bound() {
            Bound::Included(&start) => Some(start),
            Bound::Excluded(&start) => start.checked_add(1),
            Bound::Unbounded => Some(0),
        };
        let end = match range.end_bound() {
            Bound::Included(&end) => end.checked_add(1),
            Bound::Excluded(&end) => Some(end),
            Bound::Unbounded => Some(len),
        };

        match (start, end) {
            (Some(start), Some(end)) if start <= end && end <= len => Ok((start, end)),
            (start, end) => {
                let start = start.unwrap_or(usize::MAX);
                let end = end.unwrap_or(usize::MAX);
                log::debug!("rejected range {start}..{end} for length {len}");
                Err(TreapError::RangeOutOfBounds { start, end, len })
            }
        }
    }

    /// Splits out `[start, end)`, runs `f` on its root, and merges back.
    fn with_range<T>(&mut self, start: usize, end: usize, f: impl FnOnce(&mut Self, Id) -> T) -> T {
        debug_assert!(start < end && end <= self.len());
        let (left, rest) = self.split(self.root, start);
        let (mid, right) = self.split(rest, end - start);
        let out = f(self, mid);
        let rest = self.merge(mid, right);
        self.root = self.merge(left, rest);
        out
    }

    /// Order of application is `older` then `newer`.
    fn compose(&self, older: Option<&C::Value>, newer: Option<&C::Value>) -> Option<C::Value> {
        match (older, newer) {
            (None, None) => None,
            (Some(act), None) | (None, Some(act)) => Some(act.clone()),
            (Some(older), Some(newer)) => Some(match self.mode {
                UpdateMode::Overwrite => newer.clone(),
                UpdateMode::Accumulate => older.clone() + newer.clone(),
            }),
        }
    }

    fn apply_to_value(&self, value: &C::Value, act: &C::Value) -> C::Value {
        match self.mode {
            UpdateMode::Overwrite => act.clone(),
            UpdateMode::Accumulate => value.clone() + act.clone(),
        }
    }

    fn apply_update(&mut self, x: Id, act: &C::Value) {
        if x == NIL {
            return;
        }
        let mode = self.mode;
        let size = self.arena.size(x) as usize;
        let Some(spread) = C::spread(act, size) else {
            unreachable!("pending update on a {} combinator", C::KIND);
        };
        let value = self.apply_to_value(&self.arena.node(x).value, act);
        let pending = self.compose(self.arena.node(x).pending.as_ref(), Some(act));

        let node = self.arena.node_mut(x);
        node.value = value;
        node.pending = pending;
        match mode {
            UpdateMode::Overwrite => {
                node.agg = spread.clone();
                node.agg_rev = spread;
            }
            UpdateMode::Accumulate => {
                node.agg = node.agg.clone() + spread.clone();
                node.agg_rev = node.agg_rev.clone() + spread;
            }
        }
    }

    fn apply_reverse(&mut self, x: Id) {
        if x == NIL {
            return;
        }
        let node = self.arena.node_mut(x);
        node.rev ^= true;
        std::mem::swap(&mut node.left, &mut node.right);
        std::mem::swap(&mut node.agg, &mut node.agg_rev);
    }

    fn push(&mut self, x: Id) {
        let node = self.arena.node_mut(x);
        let rev = std::mem::take(&mut node.rev);
        let pending = node.pending.take();
        let (left, right) = (node.left, node.right);

        if rev {
            self.apply_reverse(left);
            self.apply_reverse(right);
        }
        if let Some(act) = pending {
            self.apply_update(left, &act);
            self.apply_update(right, &act);
        }
    }

    fn recalc(&mut self, x: Id) {
        let (left, right) = {
            let node = self.arena.node(x);
            (node.left, node.right)
        };
        let size = 1 + self.arena.size(left) + self.arena.size(right);
        let value = &self.arena.node(x).value;
        let agg = C::combine(&C::combine(&self.arena.agg(left), value), &self.arena.agg(right));
        let agg_rev = C::combine(
            &C::combine(&self.arena.agg_rev(right), value),
            &self.arena.agg_rev(left),
        );

        let node = self.arena.node_mut(x);
        node.size = size;
        node.agg = agg;
        node.agg_rev = agg_rev;
    }

    /// Resolves every tag in the tree, top-down.
    fn flush(&mut self) -> usize {
        if self.root == NIL {
            return 0;
        }
        let mut visited = 0;
        let mut stack = vec![self.root];
        while let Some(x) = stack.pop() {
            self.push(x);
            visited += 1;
            let node = self.arena.node(x);
            for child in [node.left, node.right] {
                if child != NIL {
                    stack.push(child);
                }
            }
        }
        visited
    }

    /// First `left_count` elements of `root`, and the rest.
    fn split(&mut self, root: Id, left_count: usize) -> (Id, Id) {
        if root == NIL {
            return (NIL, NIL);
        }
        self.push(root);
        if left_count == 0 {
            return (NIL, root);
        }
        if left_count >= self.arena.size(root) as usize {
            return (root, NIL);
        }

        let node = self.arena.node(root);
        let (left_child, right_child) = (node.left, node.right);
        let left_size = self.arena.size(left_child) as usize;
        if left_count <= left_size {
            let (left, right) = self.split(left_child, left_count);
            self.arena.node_mut(root).left = right;
            self.recalc(root);
            (left, root)
        } else {
            let (left, right) = self.split(right_child, left_count - left_size - 1);
            self.arena.node_mut(root).right = left;
            self.recalc(root);
            (root, right)
        }
    }

    /// Every element of `left` precedes every element of `right`.
    fn merge(&mut self, left: Id, right: Id) -> Id {
        if left == NIL {
            return right;
        }
        if right == NIL {
            return left;
        }
        self.push(left);
        self.push(right);
        if self.arena.node(left).prio > self.arena.node(right).prio {
            let child = self.arena.node(left).right;
            let merged = self.merge(child, right);
            self.arena.node_mut(left).right = merged;
            self.recalc(left);
            left
        } else {
            let child = self.arena.node(right).left;
            let merged = self.merge(left, child);
            self.arena.node_mut(right).left = merged;
            self.recalc(right);
            right
        }
    }
}

impl<C: Combinator> Default for ImplicitTreap<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Combinator> Clone for ImplicitTreap<C> {
    fn clone(&self) -> Self {
        Self {
            arena: self.arena.clone(),
            root: self.root,
            mode: self.mode,
            rng: self.rng.clone(),
        }
    }
}

impl<C: Combinator> Extend<C::Value> for ImplicitTreap<C> {
    fn extend<I: IntoIterator<Item = C::Value>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.arena.reserve(iter.size_hint().0);
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<C: Combinator> FromIterator<C::Value> for ImplicitTreap<C> {
    fn from_iter<I: IntoIterator<Item = C::Value>>(iter: I) -> Self {
        Self::from_values(iter)
    }
}

impl<C> fmt::Debug for ImplicitTreap<C>
where
    C: Combinator,
    C::Value: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.to_vec()).finish()
    }
}

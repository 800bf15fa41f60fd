use crate::combinator::Combinator;

pub(crate) type Id = u32;
pub(crate) const NIL: Id = Id::MAX;

#[inline(always)]
fn idx(x: Id) -> usize {
    x as usize
}

pub(crate) struct Node<C: Combinator> {
    pub(crate) value: C::Value,
    pub(crate) agg: C::Value,
    pub(crate) agg_rev: C::Value,
    /// Update already applied to this node, still owed to its children.
    pub(crate) pending: Option<C::Value>,
    pub(crate) rev: bool,
    pub(crate) size: u32,
    pub(crate) prio: u32,
    pub(crate) left: Id,
    pub(crate) right: Id,
}

impl<C: Combinator> Clone for Node<C> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            agg: self.agg.clone(),
            agg_rev: self.agg_rev.clone(),
            pending: self.pending.clone(),
            rev: self.rev,
            size: self.size,
            prio: self.prio,
            left: self.left,
            right: self.right,
        }
    }
}

impl<C: Combinator> Node<C> {
    fn new(value: C::Value, prio: u32) -> Self {
        Self {
            agg: value.clone(),
            agg_rev: value.clone(),
            value,
            pending: None,
            rev: false,
            size: 1,
            prio,
            left: NIL,
            right: NIL,
        }
    }
}

/// Node storage addressed by stable ids. Erased slots are recycled.
pub(crate) struct Arena<C: Combinator> {
    nodes: Vec<Option<Node<C>>>,
    free: Vec<Id>,
}

impl<C: Combinator> Clone for Arena<C> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            free: self.free.clone(),
        }
    }
}

impl<C: Combinator> Arena<C> {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
        }
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        self.nodes.reserve(additional.saturating_sub(self.free.len()));
    }

    /// Number of live nodes.
    pub(crate) fn live(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub(crate) fn alloc(&mut self, value: C::Value, prio: u32) -> Id {
        let node = Node::new(value, prio);
        if let Some(id) = self.free.pop() {
            self.nodes[idx(id)] = Some(node);
            return id;
        }
        debug_assert!(self.nodes.len() < NIL as usize);
        let id = self.nodes.len() as Id;
        self.nodes.push(Some(node));
        id
    }

    /// Destroys a single node and returns its value. Children are not touched.
    pub(crate) fn release(&mut self, id: Id) -> C::Value {
        let node = self.nodes[idx(id)].take();
        self.free.push(id);
        match node {
            Some(node) => node.value,
            None => unreachable!("released a vacant slot {id}"),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
    }

    #[inline(always)]
    pub(crate) fn node(&self, x: Id) -> &Node<C> {
        debug_assert!(x != NIL);
        match &self.nodes[idx(x)] {
            Some(node) => node,
            None => unreachable!("vacant slot {x}"),
        }
    }

    #[inline(always)]
    pub(crate) fn node_mut(&mut self, x: Id) -> &mut Node<C> {
        debug_assert!(x != NIL);
        match &mut self.nodes[idx(x)] {
            Some(node) => node,
            None => unreachable!("vacant slot {x}"),
        }
    }

    #[inline(always)]
    pub(crate) fn size(&self, x: Id) -> u32 {
        if x == NIL { 0 } else { self.node(x).size }
    }

    #[inline(always)]
    pub(crate) fn agg(&self, x: Id) -> C::Value {
        if x == NIL {
            C::identity()
        } else {
            self.node(x).agg.clone()
        }
    }

    #[inline(always)]
    pub(crate) fn agg_rev(&self, x: Id) -> C::Value {
        if x == NIL {
            C::identity()
        } else {
            self.node(x).agg_rev.clone()
        }
    }
}

//! Beachline: red-black tree of parabolic arcs stored in a slot arena.
//!
//! Arcs carry no static key. Their order is maintained purely by insertion
//! position; lookups compute breakpoints against the current sweep line (see
//! `FortuneEngine::locate_arc`). In-order neighbours are threaded through
//! `prev`/`next` links so adjacency is O(1).
//!
//! Released slots go to a free list and are reused by later allocations,
//! including allocations in later computations on the same engine.

use crate::diagram::{EdgeId, SiteId};

/// Index of an arc slot
pub(crate) type ArcId = usize;

/// Index of a circle event slot, see `EventQueue`
pub(crate) type CircleId = usize;

#[derive(Debug, Clone)]
pub(crate) struct Arc {
    pub site: SiteId,
    /// Edge traced by this arc's left breakpoint
    pub edge: Option<EdgeId>,
    /// Pending collapse of this arc, if any
    pub circle: Option<CircleId>,
    parent: Option<ArcId>,
    left: Option<ArcId>,
    right: Option<ArcId>,
    prev: Option<ArcId>,
    next: Option<ArcId>,
    red: bool,
}

impl Arc {
    fn new(site: SiteId) -> Self {
        Self {
            site,
            edge: None,
            circle: None,
            parent: None,
            left: None,
            right: None,
            prev: None,
            next: None,
            red: false,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Beachline {
    arcs: Vec<Arc>,
    free: Vec<ArcId>,
    root: Option<ArcId>,
}

impl Beachline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<ArcId> {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn arc(&self, id: ArcId) -> &Arc {
        &self.arcs[id]
    }

    pub fn arc_mut(&mut self, id: ArcId) -> &mut Arc {
        &mut self.arcs[id]
    }

    pub fn left(&self, id: ArcId) -> Option<ArcId> {
        self.arcs[id].left
    }

    pub fn right(&self, id: ArcId) -> Option<ArcId> {
        self.arcs[id].right
    }

    pub fn prev(&self, id: ArcId) -> Option<ArcId> {
        self.arcs[id].prev
    }

    pub fn next(&self, id: ArcId) -> Option<ArcId> {
        self.arcs[id].next
    }

    /// Number of slots ever allocated (live and free)
    pub fn capacity(&self) -> usize {
        self.arcs.len()
    }

    /// Take a slot from the free list or grow the arena.
    pub fn alloc(&mut self, site: SiteId) -> ArcId {
        match self.free.pop() {
            Some(id) => {
                self.arcs[id] = Arc::new(site);
                id
            }
            None => {
                self.arcs.push(Arc::new(site));
                self.arcs.len() - 1
            }
        }
    }

    /// Leftmost arc in the tree
    pub fn first(&self) -> Option<ArcId> {
        self.root.map(|r| self.leftmost(r))
    }

    fn leftmost(&self, mut id: ArcId) -> ArcId {
        while let Some(l) = self.arcs[id].left {
            id = l;
        }
        id
    }

    /// Insert `arc` immediately after `after`, or as the first arc when
    /// `after` is `None`.
    pub fn insert_after(&mut self, after: Option<ArcId>, arc: ArcId) {
        let parent;
        if let Some(node) = after {
            let next = self.arcs[node].next;
            self.arcs[arc].prev = Some(node);
            self.arcs[arc].next = next;
            if let Some(n) = next {
                self.arcs[n].prev = Some(arc);
            }
            self.arcs[node].next = Some(arc);
            if let Some(r) = self.arcs[node].right {
                let l = self.leftmost(r);
                self.arcs[l].left = Some(arc);
                parent = Some(l);
            } else {
                self.arcs[node].right = Some(arc);
                parent = Some(node);
            }
        } else if let Some(root) = self.root {
            let first = self.leftmost(root);
            self.arcs[arc].prev = None;
            self.arcs[arc].next = Some(first);
            self.arcs[first].prev = Some(arc);
            self.arcs[first].left = Some(arc);
            parent = Some(first);
        } else {
            self.arcs[arc].prev = None;
            self.arcs[arc].next = None;
            self.root = Some(arc);
            parent = None;
        }
        self.arcs[arc].left = None;
        self.arcs[arc].right = None;
        self.arcs[arc].parent = parent;
        self.arcs[arc].red = true;
        self.fix_insert(arc);
    }

    fn is_red(&self, id: Option<ArcId>) -> bool {
        id.is_some_and(|i| self.arcs[i].red)
    }

    fn fix_insert(&mut self, mut node: ArcId) {
        let mut parent = self.arcs[node].parent;
        while let Some(p) = parent {
            if !self.arcs[p].red {
                break;
            }
            // A red parent is never the root, so the grandparent exists.
            let Some(grandpa) = self.arcs[p].parent else {
                break;
            };
            if self.arcs[grandpa].left == Some(p) {
                let uncle = self.arcs[grandpa].right;
                if self.is_red(uncle) {
                    if let Some(u) = uncle {
                        self.arcs[u].red = false;
                    }
                    self.arcs[p].red = false;
                    self.arcs[grandpa].red = true;
                    node = grandpa;
                } else {
                    let mut p = p;
                    if self.arcs[p].right == Some(node) {
                        self.rotate_left(p);
                        node = p;
                        p = self.arcs[node].parent.unwrap_or(p);
                    }
                    self.arcs[p].red = false;
                    self.arcs[grandpa].red = true;
                    self.rotate_right(grandpa);
                }
            } else {
                let uncle = self.arcs[grandpa].left;
                if self.is_red(uncle) {
                    if let Some(u) = uncle {
                        self.arcs[u].red = false;
                    }
                    self.arcs[p].red = false;
                    self.arcs[grandpa].red = true;
                    node = grandpa;
                } else {
                    let mut p = p;
                    if self.arcs[p].left == Some(node) {
                        self.rotate_right(p);
                        node = p;
                        p = self.arcs[node].parent.unwrap_or(p);
                    }
                    self.arcs[p].red = false;
                    self.arcs[grandpa].red = true;
                    self.rotate_left(grandpa);
                }
            }
            parent = self.arcs[node].parent;
        }
        if let Some(r) = self.root {
            self.arcs[r].red = false;
        }
    }

    /// Unlink `arc` from the tree and return its slot to the free list.
    ///
    /// The slot's `site` and `edge` stay readable until the next `alloc`.
    pub fn remove(&mut self, arc: ArcId) {
        let (prev, next) = (self.arcs[arc].prev, self.arcs[arc].next);
        if let Some(n) = next {
            self.arcs[n].prev = prev;
        }
        if let Some(p) = prev {
            self.arcs[p].next = next;
        }
        self.arcs[arc].prev = None;
        self.arcs[arc].next = None;

        let mut parent = self.arcs[arc].parent;
        let left = self.arcs[arc].left;
        let right = self.arcs[arc].right;
        let successor = match (left, right) {
            (None, _) => right,
            (_, None) => left,
            (Some(_), Some(r)) => Some(self.leftmost(r)),
        };
        match parent {
            Some(p) if self.arcs[p].left == Some(arc) => self.arcs[p].left = successor,
            Some(p) => self.arcs[p].right = successor,
            None => self.root = successor,
        }

        let was_red;
        let node;
        if let (Some(l), Some(r), Some(s)) = (left, right, successor) {
            was_red = self.arcs[s].red;
            self.arcs[s].red = self.arcs[arc].red;
            self.arcs[s].left = Some(l);
            self.arcs[l].parent = Some(s);
            if s != r {
                parent = self.arcs[s].parent;
                self.arcs[s].parent = self.arcs[arc].parent;
                node = self.arcs[s].right;
                if let Some(p) = parent {
                    self.arcs[p].left = node;
                }
                self.arcs[s].right = Some(r);
                self.arcs[r].parent = Some(s);
            } else {
                self.arcs[s].parent = parent;
                parent = Some(s);
                node = self.arcs[s].right;
            }
        } else {
            was_red = self.arcs[arc].red;
            node = successor;
        }
        if let Some(n) = node {
            self.arcs[n].parent = parent;
        }

        self.free.push(arc);

        if was_red {
            return;
        }
        if let Some(n) = node {
            if self.arcs[n].red {
                self.arcs[n].red = false;
                return;
            }
        }
        self.fix_remove(node, parent);
    }

    fn fix_remove(&mut self, mut node: Option<ArcId>, mut parent: Option<ArcId>) {
        loop {
            if node == self.root {
                break;
            }
            let Some(p) = parent else {
                break;
            };
            if node == self.arcs[p].left {
                let Some(mut sibling) = self.arcs[p].right else {
                    break;
                };
                if self.arcs[sibling].red {
                    self.arcs[sibling].red = false;
                    self.arcs[p].red = true;
                    self.rotate_left(p);
                    match self.arcs[p].right {
                        Some(s) => sibling = s,
                        None => break,
                    }
                }
                let (sl, sr) = (self.arcs[sibling].left, self.arcs[sibling].right);
                if self.is_red(sl) || self.is_red(sr) {
                    if !self.is_red(sr) {
                        if let Some(l) = sl {
                            self.arcs[l].red = false;
                        }
                        self.arcs[sibling].red = true;
                        self.rotate_right(sibling);
                        match self.arcs[p].right {
                            Some(s) => sibling = s,
                            None => break,
                        }
                    }
                    self.arcs[sibling].red = self.arcs[p].red;
                    self.arcs[p].red = false;
                    if let Some(r) = self.arcs[sibling].right {
                        self.arcs[r].red = false;
                    }
                    self.rotate_left(p);
                    node = self.root;
                    break;
                }
                self.arcs[sibling].red = true;
            } else {
                let Some(mut sibling) = self.arcs[p].left else {
                    break;
                };
                if self.arcs[sibling].red {
                    self.arcs[sibling].red = false;
                    self.arcs[p].red = true;
                    self.rotate_right(p);
                    match self.arcs[p].left {
                        Some(s) => sibling = s,
                        None => break,
                    }
                }
                let (sl, sr) = (self.arcs[sibling].left, self.arcs[sibling].right);
                if self.is_red(sl) || self.is_red(sr) {
                    if !self.is_red(sl) {
                        if let Some(r) = sr {
                            self.arcs[r].red = false;
                        }
                        self.arcs[sibling].red = true;
                        self.rotate_left(sibling);
                        match self.arcs[p].left {
                            Some(s) => sibling = s,
                            None => break,
                        }
                    }
                    self.arcs[sibling].red = self.arcs[p].red;
                    self.arcs[p].red = false;
                    if let Some(l) = self.arcs[sibling].left {
                        self.arcs[l].red = false;
                    }
                    self.rotate_right(p);
                    node = self.root;
                    break;
                }
                self.arcs[sibling].red = true;
            }
            node = Some(p);
            parent = self.arcs[p].parent;
            if self.arcs[p].red {
                break;
            }
        }
        if let Some(n) = node {
            self.arcs[n].red = false;
        }
    }

    fn rotate_left(&mut self, p: ArcId) {
        let Some(q) = self.arcs[p].right else {
            return;
        };
        let parent = self.arcs[p].parent;
        match parent {
            Some(g) if self.arcs[g].left == Some(p) => self.arcs[g].left = Some(q),
            Some(g) => self.arcs[g].right = Some(q),
            None => self.root = Some(q),
        }
        self.arcs[q].parent = parent;
        self.arcs[p].parent = Some(q);
        self.arcs[p].right = self.arcs[q].left;
        if let Some(c) = self.arcs[p].right {
            self.arcs[c].parent = Some(p);
        }
        self.arcs[q].left = Some(p);
    }

    fn rotate_right(&mut self, p: ArcId) {
        let Some(q) = self.arcs[p].left else {
            return;
        };
        let parent = self.arcs[p].parent;
        match parent {
            Some(g) if self.arcs[g].left == Some(p) => self.arcs[g].left = Some(q),
            Some(g) => self.arcs[g].right = Some(q),
            None => self.root = Some(q),
        }
        self.arcs[q].parent = parent;
        self.arcs[p].parent = Some(q);
        self.arcs[p].left = self.arcs[q].right;
        if let Some(c) = self.arcs[p].left {
            self.arcs[c].parent = Some(p);
        }
        self.arcs[q].right = Some(p);
    }

    /// Release every live arc back to the free list.
    pub fn clear(&mut self) {
        let mut cursor = self.first();
        while let Some(id) = cursor {
            cursor = self.arcs[id].next;
            self.free.push(id);
        }
        self.root = None;
    }

    /// Sites of the live arcs, left to right
    #[cfg(test)]
    pub fn sites(&self) -> Vec<SiteId> {
        let mut out = Vec::new();
        let mut cursor = self.first();
        while let Some(id) = cursor {
            out.push(self.arcs[id].site);
            cursor = self.arcs[id].next;
        }
        out
    }

    /// Check parent links, red-red violations and black height.
    #[cfg(test)]
    fn check_invariants(&self) -> usize {
        fn walk(t: &Beachline, node: Option<ArcId>, parent: Option<ArcId>) -> usize {
            let Some(n) = node else {
                return 1;
            };
            let arc = &t.arcs[n];
            assert_eq!(arc.parent, parent, "bad parent link at {}", n);
            if arc.red {
                assert!(!t.is_red(arc.left) && !t.is_red(arc.right), "red-red at {}", n);
            }
            let lh = walk(t, arc.left, Some(n));
            let rh = walk(t, arc.right, Some(n));
            assert_eq!(lh, rh, "black height mismatch at {}", n);
            lh + usize::from(!arc.red)
        }
        assert!(!self.is_red(self.root));
        walk(self, self.root, None)
    }

    /// In-order traversal through child links
    #[cfg(test)]
    fn in_order(&self) -> Vec<ArcId> {
        fn walk(t: &Beachline, node: Option<ArcId>, out: &mut Vec<ArcId>) {
            if let Some(n) = node {
                walk(t, t.arcs[n].left, out);
                out.push(n);
                walk(t, t.arcs[n].right, out);
            }
        }
        let mut out = Vec::new();
        walk(self, self.root, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threaded(t: &Beachline) -> Vec<ArcId> {
        let mut out = Vec::new();
        let mut cursor = t.first();
        while let Some(id) = cursor {
            out.push(id);
            cursor = t.next(id);
        }
        out
    }

    #[test]
    fn test_insert_keeps_order_and_balance() {
        let mut t = Beachline::new();
        let mut last = None;
        for site in 0..100 {
            let id = t.alloc(site);
            t.insert_after(last, id);
            last = Some(id);
            t.check_invariants();
        }
        assert_eq!(t.sites(), (0..100).collect::<Vec<_>>());
        assert_eq!(t.in_order(), threaded(&t));
    }

    #[test]
    fn test_insert_front_and_middle() {
        let mut t = Beachline::new();
        let a = t.alloc(0);
        t.insert_after(None, a);
        let b = t.alloc(1);
        t.insert_after(None, b);
        let c = t.alloc(2);
        t.insert_after(Some(b), c);
        assert_eq!(t.sites(), vec![1, 2, 0]);
        assert_eq!(t.prev(c), Some(b));
        assert_eq!(t.next(c), Some(a));
        t.check_invariants();
    }

    #[test]
    fn test_remove_rebalances_and_reuses_slots() {
        let mut t = Beachline::new();
        let mut ids = Vec::new();
        let mut last = None;
        for site in 0..64 {
            let id = t.alloc(site);
            t.insert_after(last, id);
            ids.push(id);
            last = Some(id);
        }
        // Remove every third arc, mixing leaves and internal nodes
        for (i, &id) in ids.iter().enumerate() {
            if i % 3 == 0 {
                t.remove(id);
                t.check_invariants();
                assert_eq!(t.in_order(), threaded(&t));
            }
        }
        let expected: Vec<SiteId> = (0..64).filter(|i| i % 3 != 0).collect();
        assert_eq!(t.sites(), expected);

        let before = t.capacity();
        let id = t.alloc(99);
        assert_eq!(t.capacity(), before, "freed slot should be reused");
        t.insert_after(None, id);
        assert_eq!(t.sites()[0], 99);
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut t = Beachline::new();
        let mut last = None;
        for site in 0..10 {
            let id = t.alloc(site);
            t.insert_after(last, id);
            last = Some(id);
        }
        t.clear();
        assert!(t.is_empty());
        for site in 0..10 {
            t.alloc(site);
        }
        assert_eq!(t.capacity(), 10);
    }
}

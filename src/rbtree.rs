//! Red-black tree (component C), used by the indexed retire-list form to support O(log n)
//! membership tests during a reclamation scan.
//!
//! This is a left-leaning red-black tree (Sedgewick's formulation): insert is expressed as a
//! recursive function that rebuilds the path from the root and rebalances on the way back up,
//! which keeps the implementation entirely in safe Rust (no parent pointers, no unsafe).
//!
//! A retire index is private to exactly one thread and is never mutated concurrently, so no
//! synchronization is needed here. Entries leave the tree only via bulk teardown
//! ([`RbTree::walk_and_destroy`]) — a scan rebuilds a fresh tree from the survivors rather than
//! deleting individual keys — so single-key delete is intentionally not implemented.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Color {
    Red,
    Black,
}

struct Node<K, V> {
    key: K,
    value: V,
    color: Color,
    left: Link<K, V>,
    right: Link<K, V>,
}

type Link<K, V> = Option<Box<Node<K, V>>>;

/// An ordered map from `K` to `V`, supporting insert, search, and bulk teardown.
pub struct RbTree<K, V> {
    root: Link<K, V>,
    len: usize,
}

impl<K, V> Default for RbTree<K, V> {
    fn default() -> Self {
        Self { root: None, len: 0 }
    }
}

impl<K: Ord, V> RbTree<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts `key` with `value` if `key` is absent. Returns `false` without modifying the tree
    /// if `key` is already present; the caller is responsible for never retiring the same pointer
    /// twice, so this is a defensive check rather than the expected path.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let mut inserted = false;
        self.root = Self::insert_at(self.root.take(), key, value, &mut inserted);
        if let Some(root) = &mut self.root {
            root.color = Color::Black;
        }
        if inserted {
            self.len += 1;
        }
        inserted
    }

    fn insert_at(node: Link<K, V>, key: K, value: V, inserted: &mut bool) -> Link<K, V> {
        let mut node = match node {
            None => {
                *inserted = true;
                return Some(Box::new(Node {
                    key,
                    value,
                    color: Color::Red,
                    left: None,
                    right: None,
                }));
            }
            Some(node) => node,
        };

        match key.cmp(&node.key) {
            std::cmp::Ordering::Less => {
                node.left = Self::insert_at(node.left.take(), key, value, inserted);
            }
            std::cmp::Ordering::Greater => {
                node.right = Self::insert_at(node.right.take(), key, value, inserted);
            }
            std::cmp::Ordering::Equal => {
                // Duplicate key: leave the existing record untouched.
            }
        }

        Some(Self::fixup(node))
    }

    fn is_red(link: &Link<K, V>) -> bool {
        matches!(link, Some(n) if n.color == Color::Red)
    }

    fn rotate_left(mut n: Box<Node<K, V>>) -> Box<Node<K, V>> {
        let mut x = n.right.take().expect("rotate_left requires a red right child");
        n.right = x.left.take();
        x.color = n.color;
        n.color = Color::Red;
        x.left = Some(n);
        x
    }

    fn rotate_right(mut n: Box<Node<K, V>>) -> Box<Node<K, V>> {
        let mut x = n.left.take().expect("rotate_right requires a red left child");
        n.left = x.right.take();
        x.color = n.color;
        n.color = Color::Red;
        x.right = Some(n);
        x
    }

    fn flip_colors(n: &mut Node<K, V>) {
        n.color = match n.color {
            Color::Red => Color::Black,
            Color::Black => Color::Red,
        };
        if let Some(l) = &mut n.left {
            l.color = match l.color {
                Color::Red => Color::Black,
                Color::Black => Color::Red,
            };
        }
        if let Some(r) = &mut n.right {
            r.color = match r.color {
                Color::Red => Color::Black,
                Color::Black => Color::Red,
            };
        }
    }

    fn fixup(mut n: Box<Node<K, V>>) -> Box<Node<K, V>> {
        if Self::is_red(&n.right) && !Self::is_red(&n.left) {
            n = Self::rotate_left(n);
        }
        if Self::is_red(&n.left) && n.left.as_ref().map_or(false, |l| Self::is_red(&l.left)) {
            n = Self::rotate_right(n);
        }
        if Self::is_red(&n.left) && Self::is_red(&n.right) {
            Self::flip_colors(&mut n);
        }
        n
    }

    /// Returns the value stored for `key`, if present.
    pub fn search(&self, key: &K) -> Option<&V> {
        let mut cur = self.root.as_deref();
        while let Some(n) = cur {
            cur = match key.cmp(&n.key) {
                std::cmp::Ordering::Equal => return Some(&n.value),
                std::cmp::Ordering::Less => n.left.as_deref(),
                std::cmp::Ordering::Greater => n.right.as_deref(),
            };
        }
        None
    }

    /// Visits every `(key, value)` pair exactly once, in key order, applying `f` to each, then
    /// drops the tree's own storage (the recursion unwinding drops each `Box<Node>`).
    pub fn walk_and_destroy<F: FnMut(K, V)>(self, mut f: F) {
        fn visit<K, V, F: FnMut(K, V)>(node: Link<K, V>, f: &mut F) {
            if let Some(n) = node {
                visit(n.left, f);
                f(n.key, n.value);
                visit(n.right, f);
            }
        }
        visit(self.root, &mut f);
    }

    /// Consumes the tree into a sorted vector of its entries.
    pub fn into_sorted_vec(self) -> Vec<(K, V)> {
        let mut out = Vec::with_capacity(self.len);
        self.walk_and_destroy(|k, v| out.push((k, v)));
        out
    }
}

//! An intrusive, order-statistic weak AVL tree, or WAVL tree.
//!
//! [`WavlTree`] links caller-allocated nodes through an embedded [`Links`] value holding the
//! parent and child pointers, the node's rank and the size of the subtree rooted at it. Subtree
//! sizes make [`WavlTree::select`] and [`WavlTree::position`] logarithmic, and the tree caches its
//! minimum and maximum so that [`WavlTree::first`] and [`WavlTree::last`] are constant time.
//!
//! [`WavlMap`] is an owning ordered map built on top of the intrusive tree.
#![cfg_attr(not(any(test, feature = "model")), no_std)]

// Conventions used in comments are from Haeupler, Sen and Tarjan:
// - The rank of a node `x` is denoted `r(x)`.
// - The parent of a node `x` is denoted `p(x)`.
// - The rank difference of a node `x` is given by `r(p(x)) - r(x)`.
// - A node `x` is an `i`-child if its rank difference is `i`.
// - A node is `i,j` if one of its children is an `i`-child and the other is a `j`-child.
//
// Missing children are represented by `None` and have rank -1 and size 0. Every rank and size
// read goes through `rank` and `size` below so that they never need special casing.
//
// The fundamental invariants of a WAVL tree are:
// 1. All rank differences are either 1 or 2.
// 2. All leaves have rank 0.
//
// (2) is what rules out 2,2 leaves. 2,2 internal nodes are legal; they only appear after
// removals, so a tree built by insertions alone is an AVL tree.
//
// On top of these, every node stores the number of nodes in its subtree:
// 3. `size(x) = size(left(x)) + size(right(x)) + 1`.

extern crate alloc;

#[cfg(feature = "dot")]
mod debug;
mod error;
mod iter;
pub mod map;
#[cfg(any(test, feature = "model"))]
pub mod model;
mod rank;
#[cfg(test)]
mod tests;

use core::{
    borrow::Borrow, cell::UnsafeCell, cmp::Ordering, fmt, marker::PhantomPinned, mem, ops::Not,
    pin::Pin, ptr::NonNull,
};

use cordyceps::Linked;

pub use error::Error;
pub use iter::Iter;
pub use map::WavlMap;

use crate::rank::{InsertFix, RankDiffs, RemoveFix};

pub trait TreeNode<L>: Linked<L> {
    type Key: Ord;

    fn key(&self) -> &Self::Key;
}

/// An intrusive weak AVL tree, or WAVL tree, with subtree sizes.
///
/// Implementation based on the paper [Rank-Balanced Trees] by Haeupler, Sen and Tarjan.
///
/// [Rank-Balanced Trees]: http://arks.princeton.edu/ark:/88435/pr1nz5z
pub struct WavlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    root: Link<T>,
    min: Link<T>,
    max: Link<T>,
}

pub struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    rank: i8,
    size: usize,
    _unpin: PhantomPinned,
}

type Link<T> = Option<NonNull<T>>;

// Where `locate` ended its descent.
enum Slot<T: ?Sized> {
    Empty,
    Occupied(NonNull<T>),
    Vacant { parent: NonNull<T>, dir: Dir },
}

impl<T> WavlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a new empty tree.
    pub const fn new() -> WavlTree<T> {
        WavlTree {
            root: None,
            min: None,
            max: None,
        }
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of elements in the tree.
    ///
    /// This is the subtree size of the root and completes in _O(1)_ time.
    pub fn len(&self) -> usize {
        unsafe { size(self.root) }
    }

    #[doc(hidden)]
    #[track_caller]
    pub fn assert_invariants(&self)
    where
        T::Key: fmt::Debug,
    {
        unsafe {
            let Some(root) = self.root else {
                assert!(self.min.is_none(), "empty tree has a cached minimum");
                assert!(self.max.is_none(), "empty tree has a cached maximum");
                return;
            };

            assert_eq!(links(root).parent(), None, "root has a parent");
            self.assert_invariants_at(root, None, None);

            assert_eq!(
                self.min,
                Some(find_extreme(root, Dir::Left)),
                "cached minimum is stale"
            );
            assert_eq!(
                self.max,
                Some(find_extreme(root, Dir::Right)),
                "cached maximum is stale"
            );
        }
    }

    // Checks the subtree rooted at `node`, whose keys must lie strictly between `lower` and
    // `upper`. Returns the number of nodes in the subtree.
    #[allow(clippy::only_used_in_recursion)]
    #[track_caller]
    unsafe fn assert_invariants_at(
        &self,
        node: NonNull<T>,
        lower: Option<&T::Key>,
        upper: Option<&T::Key>,
    ) -> usize
    where
        T::Key: fmt::Debug,
    {
        unsafe {
            let key = node.as_ref().key();
            if let Some(lower) = lower {
                assert!(lower < key, "key {key:?} is not greater than {lower:?}");
            }
            if let Some(upper) = upper {
                assert!(key < upper, "key {key:?} is not less than {upper:?}");
            }

            let node_links = links(node);

            // All leaves have rank 0.
            if node_links.is_leaf() {
                assert_eq!(node_links.rank(), 0, "leaf {key:?} has a non-zero rank");
            }

            // All rank differences are 1 or 2, counting missing children as rank -1.
            let diffs = rank_diffs(node);
            assert!(diffs.is_valid(), "node {key:?} has rank differences {diffs:?}");

            let mut count = 1;
            for dir in [Dir::Left, Dir::Right] {
                if let Some(child) = node_links.child(dir) {
                    assert_eq!(
                        links(child).parent(),
                        Some(node),
                        "child of {key:?} does not point back at it"
                    );

                    let (lower, upper) = match dir {
                        Dir::Left => (lower, Some(key)),
                        Dir::Right => (Some(key), upper),
                    };
                    count += self.assert_invariants_at(child, lower, upper);
                }
            }

            assert_eq!(node_links.size(), count, "node {key:?} has a stale size");
            count
        }
    }

    /// Returns `true` if the tree contains an element with the given key.
    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_raw(key).is_some()
    }

    /// Returns a reference to the node corresponding to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    /// Returns a pinned mutable reference to the node corresponding to `key`.
    ///
    /// # Safety
    ///
    /// The caller must not modify the key of the node.
    pub unsafe fn get_mut<Q>(&mut self, key: &Q) -> Option<Pin<&mut T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_mut())) }
    }

    fn get_raw<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.locate(key) {
            Slot::Occupied(node) => Some(node),
            Slot::Empty | Slot::Vacant { .. } => None,
        }
    }

    // Descends from the root towards `key`, returning either the node holding it or the last
    // node visited together with the side on which `key` would be attached.
    fn locate<Q>(&self, key: &Q) -> Slot<T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let Some(mut cur) = self.root else {
            return Slot::Empty;
        };

        loop {
            let dir = match key.cmp(unsafe { cur.as_ref() }.key().borrow()) {
                Ordering::Less => Dir::Left,
                Ordering::Equal => return Slot::Occupied(cur),
                Ordering::Greater => Dir::Right,
            };

            match unsafe { links(cur).child(dir) } {
                Some(child) => cur = child,
                None => return Slot::Vacant { parent: cur, dir },
            }
        }
    }

    /// Returns the minimum element of the tree.
    ///
    /// The minimum is cached, so this completes in _O(1)_ time.
    pub fn first(&self) -> Option<Pin<&T>> {
        self.min
            .map(|first| unsafe { Pin::new_unchecked(first.as_ref()) })
    }

    /// Returns the maximum element of the tree.
    ///
    /// The maximum is cached, so this completes in _O(1)_ time.
    pub fn last(&self) -> Option<Pin<&T>> {
        self.max
            .map(|last| unsafe { Pin::new_unchecked(last.as_ref()) })
    }

    /// Returns the `index`-th smallest element of the tree, counting from 1.
    ///
    /// Returns `None` if `index` is zero or greater than [`len`](Self::len).
    ///
    /// This operation completes in _O(log(index))_ time: the search climbs from the cached minimum
    /// to the lowest ancestor whose subtree holds at least `index` elements and descends from
    /// there.
    pub fn select(&self, index: usize) -> Option<Pin<&T>> {
        let node = self.select_raw(index)?;
        unsafe { Some(Pin::new_unchecked(node.as_ref())) }
    }

    fn select_raw(&self, index: usize) -> Link<T> {
        if index == 0 || index > self.len() {
            return None;
        }

        unsafe {
            // Every ancestor of the minimum is on the left spine, so its subtree holds exactly the
            // `size` smallest elements.
            let mut cur = self.min?;
            while links(cur).size() < index {
                cur = links(cur).parent()?;
            }

            let mut index = index;
            loop {
                let here = size(links(cur).left()) + 1;

                cur = match index.cmp(&here) {
                    Ordering::Equal => return Some(cur),
                    Ordering::Less => links(cur).left()?,
                    Ordering::Greater => {
                        index -= here;
                        links(cur).right()?
                    }
                };
            }
        }
    }

    /// Returns the 1-based position of `key` in the sorted order of the tree.
    pub fn position<Q>(&self, key: &Q) -> Option<usize>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = self.root;
        let mut preceding = 0;

        while let Some(cur) = opt_cur {
            unsafe {
                let left = links(cur).left();

                match key.cmp(cur.as_ref().key().borrow()) {
                    Ordering::Less => opt_cur = left,
                    Ordering::Equal => return Some(preceding + size(left) + 1),
                    Ordering::Greater => {
                        preceding += size(left) + 1;
                        opt_cur = links(cur).right();
                    }
                }
            }
        }

        None
    }

    /// Returns an iterator over the elements of the tree in ascending key order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self)
    }

    unsafe fn maybe_set_parent(&mut self, opt_node: Link<T>, parent: Link<T>) {
        let Some(node) = opt_node else {
            return;
        };

        unsafe { links_mut(node).set_parent(parent) };
    }

    #[inline]
    unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        match parent {
            Some(parent) => unsafe { self.replace_child(parent, old_child, new_child) },
            None => self.root = new_child,
        }
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with `new_child`.
    //
    // `new_child`'s parent pointer is not updated.
    //
    // # Safety
    //
    // The caller must ensure that the following conditions hold:
    // - `old_child` is a child node of `parent`.
    // - `new_child` is not a child node of `parent`.
    unsafe fn replace_child(&mut self, parent: NonNull<T>, old_child: NonNull<T>, new_child: Link<T>) {
        unsafe {
            let dir = self.which_child(parent, old_child);

            debug_assert!(
                new_child.is_none() || links(parent).child(!dir) != new_child,
                "`new_child` must not be a child of `parent`"
            );

            links_mut(parent).set_child(dir, new_child);
        }
    }

    // Performs a rotation, moving `up` up and its parent `down` down.
    //
    // The ranks of affected nodes are not updated. The subtree sizes of `up` and `down` are; no
    // other subtree changes its contents.
    unsafe fn rotate_at(&mut self, down: NonNull<T>, up: NonNull<T>) {
        unsafe {
            debug_assert_eq!(links(up).parent(), Some(down), "`down` must be `up`'s parent");

            // - `down` becomes the `dir` child of `up`.
            // - `across` goes from the `dir` child of `up` to the `!dir` child of `down`.
            let dir = if links(down).right() == Some(up) {
                Dir::Left
            } else {
                Dir::Right
            };

            let across = links(up).child(dir);
            links_mut(down).set_child(!dir, across);
            self.maybe_set_parent(across, Some(down));

            links_mut(up).set_child(dir, Some(down));
            let parent = links_mut(down).set_parent(Some(up));
            links_mut(up).set_parent(parent);
            self.replace_child_or_set_root(parent, down, Some(up));

            // `up` now spans exactly what `down` used to.
            links_mut(up).set_size(links(down).size());
            self.update_size(down);
        }
    }

    /// Inserts an item into the tree.
    ///
    /// On success, returns the number of rebalancing operations performed: one per promotion,
    /// two for a single rotation and five for a double rotation. If an element with an equal key
    /// is already present, the tree is left untouched and `item` is handed back.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, item: T::Handle) -> Result<usize, T::Handle> {
        let ptr = T::into_ptr(item);
        unsafe { links_mut(ptr).reset() };

        match self.locate(unsafe { ptr.as_ref() }.key()) {
            Slot::Occupied(_) => Err(unsafe { T::from_ptr(ptr) }),

            Slot::Empty => {
                // Tree is empty. Set `item` as the root and return.
                self.root = Some(ptr);
                self.min = Some(ptr);
                self.max = Some(ptr);

                tracing::debug!(ops = 0, len = 1, "inserted root");
                Ok(0)
            }

            Slot::Vacant { parent, dir } => unsafe {
                links_mut(parent).set_child(dir, Some(ptr));
                links_mut(ptr).set_parent(Some(parent));

                // A new minimum can only be attached to the left of the old one, and likewise for
                // the maximum.
                match dir {
                    Dir::Left if self.min == Some(parent) => self.min = Some(ptr),
                    Dir::Right if self.max == Some(parent) => self.max = Some(ptr),
                    _ => {}
                }

                let mut opt_cur = Some(parent);
                while let Some(cur) = opt_cur {
                    let cur_links = links_mut(cur);
                    cur_links.set_size(cur_links.size() + 1);
                    opt_cur = cur_links.parent();
                }

                let ops = self.rebalance_inserted(ptr);
                tracing::debug!(ops, len = self.len(), "inserted");

                Ok(ops)
            },
        }
    }

    // Performs a bottom-up rebalance of the tree after the insertion of the leaf `node`, returning
    // the number of rebalancing operations.
    //
    // The only violation an insertion can introduce is a 0-child: `node` and its parent both have
    // rank 0. Promotions push the 0-child upwards until a rotation absorbs it or the root is
    // reached.
    unsafe fn rebalance_inserted(&mut self, node: NonNull<T>) -> usize {
        let mut ops = 0;
        let mut x = node;

        unsafe {
            while let Some(z) = links(x).parent() {
                if links(z).rank() != links(x).rank() {
                    break;
                }

                let dir = self.which_child(z, x);
                let fix = InsertFix::classify(dir, rank_diffs(z), rank_diffs(x));
                ops += fix.cost();

                match fix {
                    InsertFix::Promote => {
                        self.promote(z);
                        tracing::trace!(rank = links(z).rank(), ops, "promoted 0,1 node");

                        x = z;
                    }

                    InsertFix::Rotate => {
                        self.rotate_at(z, x);
                        self.demote(z);
                        tracing::trace!(ops, "single rotation after insertion");

                        break;
                    }

                    InsertFix::RotateTwice => {
                        // `x` is 1,2 with its outer child the 2-child, so its inner child has
                        // rank `r(x) - 1 >= 0`.
                        let y = links(x)
                            .child(!dir)
                            .expect("inner child of a rotated 0-child must exist");

                        self.rotate_at(x, y);
                        self.rotate_at(z, y);
                        self.promote(y);
                        self.demote(x);
                        self.demote(z);
                        tracing::trace!(ops, "double rotation after insertion");

                        break;
                    }
                }
            }
        }

        ops
    }

    /// Removes the element with the given key from the tree.
    ///
    /// Returns the removed element together with the number of rebalancing operations performed,
    /// or `None` if no element has the key.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<(T::Handle, usize)>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.get_raw(key)?;
        Some(unsafe { self.remove_at(node) })
    }

    /// Removes and returns the minimum element of the tree.
    pub fn pop_first(&mut self) -> Option<T::Handle> {
        let first = self.min?;
        Some(unsafe { self.remove_at(first).0 })
    }

    /// Removes and returns the maximum element of the tree.
    pub fn pop_last(&mut self) -> Option<T::Handle> {
        let last = self.max?;
        Some(unsafe { self.remove_at(last).0 })
    }

    /// Removes an arbitrary node from the tree.
    ///
    /// Returns the node's handle and the number of rebalancing operations performed.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element of `self`, and not any
    /// other tree.
    pub unsafe fn remove_at(&mut self, node: NonNull<T>) -> (T::Handle, usize) {
        // There are three possible cases:
        //
        // 1. `node` has two children.
        //
        //    `node` trades places with its successor[^1]: parent, children, rank and size are
        //    exchanged, keys stay where they are. Afterwards `node` occupies the successor's old
        //    slot and has no left child, so this reduces to case 2 or 3.
        //
        // 2. `node` has one child.
        //
        //    The child is elevated into `node`'s slot. `node` was unary and thus 1,2 with rank 1,
        //    so if it was a 2-child its child becomes a 3-child.
        //
        // 3. `node` is a leaf.
        //
        //    If `node`'s parent was unary it becomes a 2,2 leaf; if `node` was a 2-child, the
        //    now-missing child is a 3-child.
        //
        // [^1]: The successor of a node `a` is the least node in `a`'s right subtree.

        unsafe {
            // Keys never move between nodes, so the neighbours found here remain the correct
            // extremes after the structural changes below.
            if self.min == Some(node) {
                self.min = neighbor(node, Dir::Right);
            }
            if self.max == Some(node) {
                self.max = neighbor(node, Dir::Left);
            }

            if let (Some(_), Some(right)) = (links(node).left(), links(node).right()) {
                let successor = find_extreme(right, Dir::Left);
                self.swap_with_successor(node, successor);
            }

            let parent = links(node).parent();
            let child = links(node).left().or(links(node).right());

            self.replace_child_or_set_root(parent, node, child);
            self.maybe_set_parent(child, parent);

            let mut opt_cur = parent;
            while let Some(cur) = opt_cur {
                let cur_links = links_mut(cur);
                cur_links.set_size(cur_links.size() - 1);
                opt_cur = cur_links.parent();
            }

            let ops = match parent {
                Some(parent) => self.rebalance_removed(parent),
                None => 0,
            };

            links_mut(node).reset();
            tracing::debug!(ops, len = self.len(), "removed");

            (T::from_ptr(node), ops)
        }
    }

    // Exchanges the structural position of `node` with that of its successor `succ`, the minimum
    // of `node`'s right subtree: parent and child links, rank and size all trade places while keys
    // stay with their nodes.
    //
    // Afterwards `node` sits in `succ`'s former slot and has no left child.
    unsafe fn swap_with_successor(&mut self, node: NonNull<T>, succ: NonNull<T>) {
        unsafe {
            debug_assert!(links(succ).left().is_none(), "successor has a left child");

            let parent = links(node).parent();
            let left = links(node).left();
            let right = links(node).right();
            let succ_parent = links(succ).parent();
            let succ_right = links(succ).right();

            self.replace_child_or_set_root(parent, node, Some(succ));
            links_mut(succ).set_parent(parent);

            links_mut(succ).set_left(left);
            self.maybe_set_parent(left, Some(succ));

            match succ_parent {
                Some(succ_parent) if succ_parent != node => {
                    links_mut(succ).set_right(right);
                    self.maybe_set_parent(right, Some(succ));

                    links_mut(succ_parent).set_left(Some(node));
                    links_mut(node).set_parent(Some(succ_parent));
                }

                // `succ` is `node`'s right child.
                _ => {
                    links_mut(succ).set_right(Some(node));
                    links_mut(node).set_parent(Some(succ));
                }
            }

            links_mut(node).set_left(None);
            links_mut(node).set_right(succ_right);
            self.maybe_set_parent(succ_right, Some(node));

            let node_rank = links(node).rank();
            let node_size = links(node).size();
            links_mut(node).set_rank(links(succ).rank());
            links_mut(node).set_size(links(succ).size());
            links_mut(succ).set_rank(node_rank);
            links_mut(succ).set_size(node_size);
        }
    }

    // Performs a bottom-up rebalance after a node was spliced out from under `start`, returning the
    // number of rebalancing operations.
    //
    // Before the loop, exactly one of the following is true:
    //
    // 1. The rank rule holds.
    // 2. `start` is a 2,2 leaf.
    // 3. `start` has a 3-child.
    //
    // Demoting a 2,2 leaf may turn it into a 3-child, and demotions inside the loop may do the same
    // one level up; rotations always terminate.
    unsafe fn rebalance_removed(&mut self, start: NonNull<T>) -> usize {
        let mut ops = 0;

        unsafe {
            let mut z = start;

            if links(z).is_leaf() && links(z).rank() == 1 {
                self.demote(z);
                ops += 1;
                tracing::trace!(ops, "demoted 2,2 leaf");

                z = match links(z).parent() {
                    Some(parent) => parent,
                    None => return ops,
                };
            }

            loop {
                let diffs = rank_diffs(z);
                let Some(dir) = diffs.three_child() else {
                    break;
                };

                // Here we give up on descriptive names entirely and just use the names from the
                // paper. A 3-child has rank at least -1, so `r(z) >= 2` and its sibling `y` is a
                // real node.
                let y = links(z)
                    .child(!dir)
                    .expect("sibling of a 3-child must exist");

                let fix = RemoveFix::classify(dir, diffs, rank_diffs(y));
                ops += fix.cost();

                match fix {
                    RemoveFix::Demote => {
                        self.demote(z);
                        tracing::trace!(rank = links(z).rank(), ops, "demoted 3,2 node");
                    }

                    RemoveFix::DemoteBoth => {
                        self.demote(z);
                        self.demote(y);
                        tracing::trace!(
                            rank = links(z).rank(),
                            ops,
                            "demoted 3,1 node and 2,2 sibling"
                        );
                    }

                    RemoveFix::Rotate => {
                        self.rotate_at(z, y);
                        self.promote(y);
                        self.demote(z);

                        if links(z).is_leaf() {
                            // `z` came down as a 2,2 leaf.
                            self.demote(z);
                            ops += 1;
                        }

                        tracing::trace!(ops, "single rotation after removal");
                        break;
                    }

                    RemoveFix::RotateTwice => {
                        // `y`'s outer child is a 2-child and `y` is not 2,2, so its inner child `v`
                        // is a 1-child of rank `r(y) - 1 >= 0`.
                        let v = links(y)
                            .child(dir)
                            .expect("inner child of a 3-child's sibling must exist");

                        self.rotate_at(y, v);
                        self.rotate_at(z, v);
                        self.promote_twice(v);
                        self.demote(y);
                        self.demote_twice(z);

                        tracing::trace!(ops, "double rotation after removal");
                        break;
                    }
                }

                z = match links(z).parent() {
                    Some(parent) => parent,
                    None => break,
                };
            }
        }

        ops
    }

    /// Clears the tree, removing all elements.
    pub fn clear(&mut self) {
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node.
                let cur = find_extreme(cur, Dir::Left);
                let parent = links(cur).parent();
                let right = links(cur).right();

                // Elevate the node's right child (which may be None).
                self.replace_child_or_set_root(parent, cur, right);
                self.maybe_set_parent(right, parent);

                // Drop the node.
                drop(T::from_ptr(cur));

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        debug_assert!(self.root.is_none());
        self.min = None;
        self.max = None;
    }

    // Support methods ========================================================

    #[inline]
    unsafe fn promote(&mut self, node: NonNull<T>) {
        unsafe {
            let inner = links_mut(node).inner.get_mut();
            inner.rank = inner.rank.checked_add(1).expect("rank overflow");
        }
    }

    #[inline]
    unsafe fn promote_twice(&mut self, node: NonNull<T>) {
        unsafe {
            let inner = links_mut(node).inner.get_mut();
            inner.rank = inner.rank.checked_add(2).expect("rank overflow");
        }
    }

    #[inline]
    unsafe fn demote(&mut self, node: NonNull<T>) {
        unsafe {
            let inner = links_mut(node).inner.get_mut();
            inner.rank -= 1;
            debug_assert!(inner.rank >= 0, "demoted below rank 0");
        }
    }

    #[inline]
    unsafe fn demote_twice(&mut self, node: NonNull<T>) {
        unsafe {
            let inner = links_mut(node).inner.get_mut();
            inner.rank -= 2;
            debug_assert!(inner.rank >= 0, "demoted below rank 0");
        }
    }

    #[inline]
    unsafe fn update_size(&mut self, node: NonNull<T>) {
        unsafe {
            let size = size(links(node).left()) + size(links(node).right()) + 1;
            links_mut(node).set_size(size);
        }
    }

    unsafe fn which_child(&self, parent: NonNull<T>, child: NonNull<T>) -> Dir {
        unsafe {
            if links(parent).left() == Some(child) {
                Dir::Left
            } else {
                debug_assert_eq!(
                    links(parent).right(),
                    Some(child),
                    "`child` must be a child of `parent`"
                );
                Dir::Right
            }
        }
    }
}

impl<T> Default for WavlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for WavlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn drop(&mut self) {
        self.clear();
    }
}

unsafe impl<T> Send for WavlTree<T> where T: TreeNode<Links<T>> + Send + ?Sized {}
unsafe impl<T> Sync for WavlTree<T> where T: TreeNode<Links<T>> + Sync + ?Sized {}

// Rank and size of a possibly missing node.

#[inline]
unsafe fn rank<T>(node: Link<T>) -> i8
where
    T: TreeNode<Links<T>> + ?Sized,
{
    match node {
        Some(node) => unsafe { links(node).rank() },
        None => -1,
    }
}

#[inline]
unsafe fn size<T>(node: Link<T>) -> usize
where
    T: TreeNode<Links<T>> + ?Sized,
{
    match node {
        Some(node) => unsafe { links(node).size() },
        None => 0,
    }
}

#[inline]
unsafe fn rank_diffs<T>(node: NonNull<T>) -> RankDiffs
where
    T: TreeNode<Links<T>> + ?Sized,
{
    unsafe {
        let node_links = links(node);
        RankDiffs::new(
            node_links.rank(),
            rank(node_links.left()),
            rank(node_links.right()),
        )
    }
}

#[inline]
unsafe fn links<'a, T>(node: NonNull<T>) -> &'a Links<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    unsafe { T::links(node).as_ref() }
}

#[inline]
unsafe fn links_mut<'a, T>(node: NonNull<T>) -> &'a mut Links<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    unsafe { T::links(node).as_mut() }
}

// Returns the node reached by following `dir` links from `node` for as long as possible.
unsafe fn find_extreme<T>(mut node: NonNull<T>, dir: Dir) -> NonNull<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    while let Some(next) = unsafe { links(node).child(dir) } {
        node = next;
    }

    node
}

// Returns the in-order neighbor of `node` in direction `dir`: the successor for `Dir::Right`, the
// predecessor for `Dir::Left`.
pub(crate) unsafe fn neighbor<T>(node: NonNull<T>, dir: Dir) -> Link<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    unsafe {
        if let Some(child) = links(node).child(dir) {
            return Some(find_extreme(child, !dir));
        }

        // Ascend until we arrive from the `!dir` side.
        let mut cur = node;
        while let Some(parent) = links(cur).parent() {
            if links(parent).child(!dir) == Some(cur) {
                return Some(parent);
            }
            cur = parent;
        }

        None
    }
}

impl<T: ?Sized> Links<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                rank: 0,
                size: 1,
                _unpin: PhantomPinned,
            }),
        }
    }

    /// Returns the node's rank.
    #[inline]
    pub fn rank(&self) -> i8 {
        unsafe { (*self.inner.get()).rank }
    }

    /// Returns the number of nodes in the subtree rooted at this node, including itself.
    #[inline]
    pub fn size(&self) -> usize {
        unsafe { (*self.inner.get()).size }
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.left().is_none() && self.right().is_none()
    }

    #[inline]
    fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    #[inline]
    fn set_parent(&mut self, parent: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    fn set_child(&mut self, dir: Dir, child: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    fn set_left(&mut self, left: Link<T>) -> Link<T> {
        self.set_child(Dir::Left, left)
    }

    #[inline]
    fn set_right(&mut self, right: Link<T>) -> Link<T> {
        self.set_child(Dir::Right, right)
    }

    #[inline]
    fn set_rank(&mut self, rank: i8) {
        self.inner.get_mut().rank = rank;
    }

    #[inline]
    fn set_size(&mut self, size: usize) {
        self.inner.get_mut().size = size;
    }

    // Returns the links to the state of a freshly created, unlinked leaf.
    fn reset(&mut self) {
        let inner = self.inner.get_mut();
        inner.parent = None;
        inner.children = [None; 2];
        inner.rank = 0;
        inner.size = 1;
    }
}

impl<T: ?Sized> Default for Links<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("parent", &self.parent())
            .field("left", &self.left())
            .field("right", &self.right())
            .field("rank", &self.rank())
            .field("size", &self.size())
            .finish()
    }
}

unsafe impl<T: Send + ?Sized> Send for Links<T> {}
unsafe impl<T: Sync + ?Sized> Sync for Links<T> {}

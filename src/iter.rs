use core::{iter::FusedIterator, marker::PhantomData};

use crate::{neighbor, Dir, Link, Links, TreeNode, WavlTree};

/// An iterator over the elements of a [`WavlTree`] in ascending key order.
///
/// Both ends start at the tree's cached minimum and maximum and step through in-order neighbors,
/// so a full traversal visits every link at most twice.
pub struct Iter<'tree, T: TreeNode<Links<T>> + ?Sized> {
    front: Link<T>,
    back: Link<T>,
    len: usize,
    _tree: PhantomData<&'tree WavlTree<T>>,
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iter<'tree, T> {
    pub(crate) fn new(tree: &'tree WavlTree<T>) -> Self {
        Iter {
            front: tree.min,
            back: tree.max,
            len: tree.len(),
            _tree: PhantomData,
        }
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iterator for Iter<'tree, T> {
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let cur = self.front?;
        self.len -= 1;

        unsafe {
            self.front = neighbor(cur, Dir::Right);
            Some(cur.as_ref())
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> DoubleEndedIterator for Iter<'tree, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let cur = self.back?;
        self.len -= 1;

        unsafe {
            self.back = neighbor(cur, Dir::Left);
            Some(cur.as_ref())
        }
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> ExactSizeIterator for Iter<'tree, T> {}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> FusedIterator for Iter<'tree, T> {}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Clone for Iter<'tree, T> {
    fn clone(&self) -> Self {
        Iter {
            front: self.front,
            back: self.back,
            len: self.len,
            _tree: PhantomData,
        }
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> IntoIterator for &'tree WavlTree<T> {
    type Item = &'tree T;
    type IntoIter = Iter<'tree, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

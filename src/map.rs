//! An owning ordered map on top of [`WavlTree`].

use alloc::{boxed::Box, vec::Vec};
use core::{borrow::Borrow, fmt, iter::FusedIterator, marker::PhantomPinned, ptr::NonNull};

use cordyceps::Linked;

use crate::{Error, Links, TreeNode, WavlTree};

/// An ordered map based on a [WAVL tree], with order-statistic queries.
///
/// Keys are unique: [`insert`](WavlMap::insert) rejects a key that is already present instead of
/// replacing its value. Mutating operations report how many rebalancing operations (promotions,
/// demotions and rotations, weighted as described on [`WavlMap::insert`] and
/// [`WavlMap::remove`]) they performed.
///
/// [WAVL tree]: https://en.wikipedia.org/wiki/WAVL_tree
pub struct WavlMap<K: Ord, V> {
    pub(crate) tree: WavlTree<MapNode<K, V>>,
}

pub(crate) struct MapNode<K, V> {
    links: Links<MapNode<K, V>>,
    key: K,
    value: V,
    _unpin: PhantomPinned,
}

unsafe impl<K, V> Linked<Links<MapNode<K, V>>> for MapNode<K, V> {
    type Handle = Box<Self>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        Box::leak(r).into()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<MapNode<K, V>>> {
        let ptr = ptr.as_ptr();
        unsafe { NonNull::new_unchecked(core::ptr::addr_of_mut!((*ptr).links)) }
    }
}

impl<K: Ord, V> TreeNode<Links<MapNode<K, V>>> for MapNode<K, V> {
    type Key = K;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

impl<K: Ord, V> WavlMap<K, V> {
    /// Creates a new, empty `WavlMap`.
    pub const fn new() -> Self {
        Self {
            tree: WavlTree::new(),
        }
    }

    /// Returns `true` if the map contains no elements.
    pub const fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns `true` if the map contains a value associated with `key`.
    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.contains_key(key)
    }

    /// Returns a reference to the value associated with `key`.
    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.get(key).map(|node| &node.get_ref().value)
    }

    /// Returns a reference to the value associated with `key`, or [`Error::KeyNotFound`].
    ///
    /// # Examples
    ///
    /// ```
    /// use ordered_wavl::{Error, WavlMap};
    ///
    /// let mut map = WavlMap::new();
    /// map.insert(3, "three").unwrap();
    ///
    /// assert_eq!(map.search(&3), Ok(&"three"));
    /// assert_eq!(map.search(&4), Err(Error::KeyNotFound));
    /// ```
    #[inline]
    pub fn search<Q>(&self, key: &Q) -> Result<&V, Error>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).ok_or(Error::KeyNotFound)
    }

    /// Returns a mutable reference to the value associated with `key`.
    #[inline]
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        // SAFETY: Only the value is handed out; the key stays untouched.
        unsafe {
            self.tree
                .get_mut(key)
                // SAFETY: Pinning is not structural for `node.value`.
                .map(|node| &mut node.get_unchecked_mut().value)
        }
    }

    /// Inserts `value` under `key`.
    ///
    /// Returns the number of rebalancing operations performed: one for each promotion, two for a
    /// single rotation and its demotion, five for a double rotation and its three rank changes.
    /// If `key` is already present the map is left unchanged and [`Error::DuplicateKey`] is
    /// returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordered_wavl::{Error, WavlMap};
    ///
    /// let mut map = WavlMap::new();
    /// assert_eq!(map.insert(10, 'a'), Ok(0));
    /// assert_eq!(map.insert(20, 'b'), Ok(1));
    /// assert_eq!(map.insert(10, 'c'), Err(Error::DuplicateKey));
    /// assert_eq!(map.get(&10), Some(&'a'));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Result<usize, Error> {
        let node = Box::new(MapNode {
            links: Links::new(),
            key,
            value,
            _unpin: PhantomPinned,
        });

        self.tree.insert(node).map_err(|_| Error::DuplicateKey)
    }

    /// Removes the entry for `key`.
    ///
    /// Returns the number of rebalancing operations performed: one for each demotion, two for a
    /// double demotion, three (or four, if the demoted node ends up a leaf) for a single rotation
    /// and seven for a double rotation. If `key` is absent the map is left unchanged and
    /// [`Error::KeyNotFound`] is returned.
    pub fn remove<Q>(&mut self, key: &Q) -> Result<usize, Error>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree
            .remove(key)
            .map(|(_, ops)| ops)
            .ok_or(Error::KeyNotFound)
    }

    /// Removes the entry for `key` and returns it.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.remove(key).map(|(node, _)| {
            let MapNode { key, value, .. } = *node;
            (key, value)
        })
    }

    /// Returns the value associated with the minimum key, or [`Error::Empty`].
    pub fn min(&self) -> Result<&V, Error> {
        self.first_key_value()
            .map(|(_, value)| value)
            .ok_or(Error::Empty)
    }

    /// Returns the value associated with the maximum key, or [`Error::Empty`].
    pub fn max(&self) -> Result<&V, Error> {
        self.last_key_value()
            .map(|(_, value)| value)
            .ok_or(Error::Empty)
    }

    /// Returns the first key-value pair in the map.
    ///
    /// The returned key is the minimum key in the map.
    #[inline]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.tree.first().map(|node| {
            let node = node.get_ref();
            (&node.key, &node.value)
        })
    }

    /// Removes and returns the first key-value pair in the map.
    ///
    /// The returned key is the minimum key in the map.
    #[inline]
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.tree.pop_first().map(|node| {
            let MapNode { key, value, .. } = *node;
            (key, value)
        })
    }

    /// Returns the last key-value pair in the map.
    ///
    /// The returned key is the maximum key in the map.
    #[inline]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.tree.last().map(|node| {
            let node = node.get_ref();
            (&node.key, &node.value)
        })
    }

    /// Removes and returns the last key-value pair in the map.
    ///
    /// The returned key is the maximum key in the map.
    #[inline]
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.tree.pop_last().map(|node| {
            let MapNode { key, value, .. } = *node;
            (key, value)
        })
    }

    /// Returns the value associated with the `index`-th smallest key, counting from 1.
    ///
    /// Fails with [`Error::Empty`] on an empty map and with [`Error::IndexOutOfRange`] if `index`
    /// is not in `1..=len`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordered_wavl::{Error, WavlMap};
    ///
    /// let map: WavlMap<_, _> = [(30, 'c'), (10, 'a'), (20, 'b')].into_iter().collect();
    ///
    /// assert_eq!(map.select(1), Ok(&'a'));
    /// assert_eq!(map.select(3), Ok(&'c'));
    /// assert_eq!(map.select(4), Err(Error::IndexOutOfRange { index: 4, len: 3 }));
    /// ```
    pub fn select(&self, index: usize) -> Result<&V, Error> {
        if self.is_empty() {
            return Err(Error::Empty);
        }

        self.select_key_value(index)
            .map(|(_, value)| value)
            .ok_or(Error::IndexOutOfRange {
                index,
                len: self.len(),
            })
    }

    /// Returns the key-value pair with the `index`-th smallest key, counting from 1.
    pub fn select_key_value(&self, index: usize) -> Option<(&K, &V)> {
        self.tree.select(index).map(|node| {
            let node = node.get_ref();
            (&node.key, &node.value)
        })
    }

    /// Returns the 1-based position of `key` in ascending key order.
    ///
    /// This is the inverse of [`select`](Self::select).
    pub fn position<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.position(key)
    }

    /// Returns an iterator over the entries of the map, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.tree.iter(),
        }
    }

    /// Returns an iterator over the keys of the map, in ascending order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values of the map, sorted by key.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Collects the keys of the map in ascending order.
    pub fn to_sorted_keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.keys().cloned().collect()
    }

    /// Collects the values of the map, sorted by key.
    pub fn to_sorted_values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.values().cloned().collect()
    }

    /// Clears the map, removing all elements.
    #[inline]
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    #[doc(hidden)]
    #[track_caller]
    pub fn assert_invariants(&self)
    where
        K: fmt::Debug,
    {
        self.tree.assert_invariants();
    }
}

impl<K: Ord, V> Default for WavlMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + fmt::Debug, V: fmt::Debug> fmt::Debug for WavlMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Entries whose key is already present are dropped; the first occurrence wins.
impl<K: Ord, V> Extend<(K, V)> for WavlMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            let _ = self.insert(key, value);
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for WavlMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = WavlMap::new();
        map.extend(iter);
        map
    }
}

impl<'a, K: Ord, V> IntoIterator for &'a WavlMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An iterator over the entries of a [`WavlMap`], sorted by key.
pub struct Iter<'a, K: Ord, V> {
    inner: crate::Iter<'a, MapNode<K, V>>,
}

impl<'a, K: Ord, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|node| (&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Ord, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|node| (&node.key, &node.value))
    }
}

impl<K: Ord, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K: Ord, V> FusedIterator for Iter<'_, K, V> {}

/// An iterator over the keys of a [`WavlMap`], in ascending order.
pub struct Keys<'a, K: Ord, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K: Ord, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Ord, V> DoubleEndedIterator for Keys<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(key, _)| key)
    }
}

impl<K: Ord, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K: Ord, V> FusedIterator for Keys<'_, K, V> {}

/// An iterator over the values of a [`WavlMap`], sorted by key.
pub struct Values<'a, K: Ord, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K: Ord, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Ord, V> DoubleEndedIterator for Values<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, value)| value)
    }
}

impl<K: Ord, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K: Ord, V> FusedIterator for Values<'_, K, V> {}

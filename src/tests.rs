extern crate std;

use std::{ops::Range, prelude::v1::*, ptr::NonNull};

use proptest::prelude::*;

use crate::{
    model::{self, TestNode},
    Error, WavlMap,
};

use super::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn keys_of(tree: &WavlTree<TestNode>) -> Vec<u32> {
    tree.iter().map(|node| node.key).collect()
}

// Calls `f` on every node of the tree, in order.
fn for_each_node(tree: &WavlTree<TestNode>, mut f: impl FnMut(NonNull<TestNode>)) {
    let mut opt_cur = tree.min;
    while let Some(cur) = opt_cur {
        f(cur);
        opt_cur = unsafe { neighbor(cur, Dir::Right) };
    }
}

fn insert_find_all(keys: &[u32]) {
    let mut tree: WavlTree<TestNode> = WavlTree::new();

    for &key in keys {
        assert!(tree.insert(TestNode::new(key)).is_ok());
        tree.assert_invariants();
    }

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        assert_eq!(unsafe { node.as_ref().key() }, key);
    }

    let mut sorted = keys.to_vec();
    sorted.sort_unstable();
    assert_eq!(keys_of(&tree), sorted);
    assert_eq!(tree.len(), keys.len());
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn two_elems_find() {
    insert_find_all(&[0, 1]);
    insert_find_all(&[1, 0]);
}

#[test]
fn three_elems_find() {
    insert_find_all(&[0, 1, 2]);
    insert_find_all(&[0, 2, 1]);
    insert_find_all(&[1, 0, 2]);
    insert_find_all(&[1, 2, 0]);
    insert_find_all(&[2, 0, 1]);
    insert_find_all(&[2, 1, 0]);
}

// Calls `f` with every permutation of `0..n`.
fn permutations(n: u32, f: &mut impl FnMut(&[u32])) {
    fn go(prefix: &mut Vec<u32>, rest: &mut Vec<u32>, f: &mut impl FnMut(&[u32])) {
        if rest.is_empty() {
            f(prefix);
            return;
        }

        for i in 0..rest.len() {
            let key = rest.remove(i);
            prefix.push(key);
            go(prefix, rest, f);
            prefix.pop();
            rest.insert(i, key);
        }
    }

    go(&mut Vec::new(), &mut (0..n).collect(), f);
}

#[test]
fn six_elems_find() {
    permutations(6, &mut |keys| insert_find_all(keys));
}

fn insert_remove_all(keys: &[u32]) {
    let mut tree: WavlTree<TestNode> = WavlTree::new();

    for &key in keys {
        assert!(tree.insert(TestNode::new(key)).is_ok());
        tree.assert_invariants();
    }

    for key in keys {
        let (node, _) = tree.remove(key).expect("item not found");
        assert_eq!(node.key, *key);
        tree.assert_invariants();
    }

    assert!(tree.is_empty());

    for &key in keys {
        assert!(tree.insert(TestNode::new(key)).is_ok());
        tree.assert_invariants();
    }

    for key in keys.iter().rev() {
        let (node, _) = tree.remove(key).expect("item not found");
        assert_eq!(node.key, *key);
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
}

#[test]
fn remove_one() {
    insert_remove_all(&[0]);
}

#[test]
fn remove_two() {
    insert_remove_all(&[0, 1]);
    insert_remove_all(&[1, 0]);
}

#[test]
fn remove_three() {
    insert_remove_all(&[0, 1, 2]);
    insert_remove_all(&[0, 2, 1]);
    insert_remove_all(&[1, 0, 2]);
    insert_remove_all(&[1, 2, 0]);
    insert_remove_all(&[2, 0, 1]);
    insert_remove_all(&[2, 1, 0]);
}

#[test]
fn remove_six() {
    permutations(6, &mut |keys| insert_remove_all(keys));
}

// Removes keys in every order from a tree built from `0..n` in every order.
#[test]
fn remove_every_order_five() {
    permutations(5, &mut |inserts| {
        permutations(5, &mut |removes| {
            let mut tree: WavlTree<TestNode> = WavlTree::new();
            for &key in inserts {
                assert!(tree.insert(TestNode::new(key)).is_ok());
            }

            for (removed, key) in removes.iter().enumerate() {
                assert!(tree.remove(key).is_some());
                tree.assert_invariants();
                assert_eq!(tree.len(), removes.len() - removed - 1);
            }
        })
    });
}

#[test]
fn duplicate_insert_returns_item() {
    let mut tree: WavlTree<TestNode> = WavlTree::new();
    assert_eq!(tree.insert(TestNode::new(7)).ok(), Some(0));

    let rejected = tree.insert(TestNode::new(7)).expect_err("duplicate accepted");
    assert_eq!(rejected.key, 7);
    assert_eq!(tree.len(), 1);
    tree.assert_invariants();
}

#[test]
fn removed_node_is_unlinked() {
    let mut tree: WavlTree<TestNode> = WavlTree::new();
    for key in 0..15 {
        assert!(tree.insert(TestNode::new(key)).is_ok());
    }

    // 7 has two children.
    let (node, _) = tree.remove(&7).expect("item not found");
    assert!(node.links.parent().is_none());
    assert!(node.links.is_leaf());
    assert_eq!(node.links.rank(), 0);
    assert_eq!(node.links.size(), 1);

    // The node can be inserted again.
    assert!(tree.insert(node).is_ok());
    tree.assert_invariants();
    assert_eq!(keys_of(&tree), (0..15).collect::<Vec<_>>());
}

#[test]
fn insert_only_trees_have_no_2_2_nodes() {
    permutations(7, &mut |keys| {
        let mut tree: WavlTree<TestNode> = WavlTree::new();
        for &key in keys {
            assert!(tree.insert(TestNode::new(key)).is_ok());
        }

        for_each_node(&tree, |node| {
            let diffs = unsafe { rank_diffs(node) };
            assert!(!diffs.is_2_2(), "insert-only tree {keys:?} has a 2,2 node");
        });
    });
}

#[test]
fn ascending_insert_costs() {
    init_tracing();

    let mut map = WavlMap::new();
    let costs: Vec<_> = [10, 20, 30, 40, 50, 60, 70]
        .into_iter()
        .map(|key| map.insert(key, key * 10).expect("fresh key"))
        .collect();

    // Inserting 20 promotes the root; 30, 50 and 70 each promote their parent and then rotate.
    // 40 promotes twice, 60 promotes twice and rotates at the root.
    assert_eq!(costs, vec![0, 1, 3, 2, 3, 4, 3]);
    map.assert_invariants();
    assert_eq!(map.to_sorted_keys(), vec![10, 20, 30, 40, 50, 60, 70]);
    assert_eq!(map.len(), 7);

    // The result is a perfect tree rooted at 40.
    let root = map.tree.root.expect("tree is not empty");
    unsafe {
        assert_eq!(*root.as_ref().key(), 40);
        assert_eq!(links(root).rank(), 2);
        assert_eq!(links(root).size(), 7);
    }
}

#[test]
fn removal_costs() {
    init_tracing();

    let mut map: WavlMap<u32, u32> = (1..=3).map(|key| (key, key)).collect();

    // 1 is a leaf whose parent keeps a child: no repair.
    assert_eq!(map.remove(&1), Ok(0));
    // 3 is the only child of the root, which becomes a 2,2 leaf.
    assert_eq!(map.remove(&3), Ok(1));
    map.assert_invariants();

    let root = map.tree.root.expect("tree is not empty");
    unsafe { assert_eq!(links(root).rank(), 0) };
}

#[test]
fn removal_rotations() {
    init_tracing();

    // 2(2) with children 1(0) and 4(1); 4 has children 3 and 5.
    let mut map: WavlMap<u32, ()> = [2, 1, 4, 3, 5].into_iter().map(|key| (key, ())).collect();
    map.assert_invariants();

    // 1 becomes a missing 3-child; its sibling 4 is 1,1, so 4 rotates up.
    assert_eq!(map.remove(&1), Ok(3));
    map.assert_invariants();
    assert_eq!(map.to_sorted_keys(), vec![2, 3, 4, 5]);

    // 2(2) with children 1(0) and 4(1), where 4 only has the inner child 3.
    let mut map: WavlMap<u32, ()> = [2, 1, 4, 3].into_iter().map(|key| (key, ())).collect();
    map.assert_invariants();

    // The sibling's outer child is missing, so 3 is lifted by a double rotation.
    assert_eq!(map.remove(&1), Ok(7));
    map.assert_invariants();
    assert_eq!(map.to_sorted_keys(), vec![2, 3, 4]);
}

#[test]
fn insert_double_rotation_cost() {
    init_tracing();

    let mut map = WavlMap::new();
    let costs: Vec<_> = [10, 30, 20]
        .into_iter()
        .map(|key| map.insert(key, ()).expect("fresh key"))
        .collect();

    // 20 promotes 30 into a 0-child of 10 whose only child is on the inner side, so 20 is lifted
    // above both.
    assert_eq!(costs, vec![0, 1, 6]);
    map.assert_invariants();

    let root = map.tree.root.expect("tree is not empty");
    unsafe {
        assert_eq!(*root.as_ref().key(), 20);
        assert_eq!(links(root).rank(), 1);
    }
}

#[test]
fn removal_rotation_demotes_new_leaf() {
    init_tracing();

    // 2(2) with children 1(0) and 3(1); 3 only has the outer child 4.
    let mut map: WavlMap<u32, ()> = [2, 1, 3, 4].into_iter().map(|key| (key, ())).collect();
    map.assert_invariants();

    // 3 rotates up and 2 comes down as a 2,2 leaf, which is demoted once more.
    assert_eq!(map.remove(&1), Ok(4));
    map.assert_invariants();
    assert_eq!(map.to_sorted_keys(), vec![2, 3, 4]);

    let root = map.tree.root.expect("tree is not empty");
    unsafe {
        assert_eq!(*root.as_ref().key(), 3);
        let left = links(root).left().expect("2 is the left child");
        assert_eq!(links(left).rank(), 0);
    }
}

#[test]
fn delete_node_with_two_children() {
    let mut map: WavlMap<u32, u32> = (1..=15).map(|key| (key, key * 10)).collect();
    map.assert_invariants();

    assert_eq!(map.select(7), Ok(&70));

    assert!(map.remove(&8).is_ok());
    map.assert_invariants();

    let keys = map.to_sorted_keys();
    assert_eq!(keys.len(), 14);
    assert!(!keys.contains(&8));
    assert_eq!(map.min(), Ok(&10));
    assert_eq!(map.max(), Ok(&150));
}

#[test]
fn delete_sole_element() {
    let mut map = WavlMap::new();
    assert_eq!(map.insert(1, "one"), Ok(0));
    assert_eq!(map.remove(&1), Ok(0));

    assert!(map.is_empty());
    assert_eq!(map.len(), 0);
    assert_eq!(map.min(), Err(Error::Empty));
    assert_eq!(map.max(), Err(Error::Empty));
    assert_eq!(map.select(1), Err(Error::Empty));
    map.assert_invariants();
}

#[test]
fn insert_duplicate_key() {
    let mut map: WavlMap<u32, u32> = (1..=5).map(|key| (key, key)).collect();
    let before = map.to_sorted_values();

    assert_eq!(map.insert(3, 300), Err(Error::DuplicateKey));
    assert_eq!(map.len(), 5);
    assert_eq!(map.to_sorted_values(), before);
    map.assert_invariants();
}

#[test]
fn delete_absent_key() {
    let mut map: WavlMap<u32, u32> = (1..=5).map(|key| (key * 2, key)).collect();

    assert_eq!(map.remove(&3), Err(Error::KeyNotFound));
    assert_eq!(map.search(&3), Err(Error::KeyNotFound));
    assert_eq!(map.to_sorted_keys(), vec![2, 4, 6, 8, 10]);
    map.assert_invariants();
}

#[test]
fn delete_root_with_one_child() {
    for keys in [[1, 2], [2, 1]] {
        let mut map: WavlMap<u32, u32> = keys.into_iter().map(|key| (key, key)).collect();

        // The remaining rank-0 leaf becomes the root as is.
        assert_eq!(map.remove(&keys[0]), Ok(0));
        map.assert_invariants();
        let root = map.tree.root.expect("tree is not empty");
        unsafe { assert_eq!(links(root).rank(), 0) };
        assert_eq!(map.min(), Ok(&keys[1]));
        assert_eq!(map.max(), Ok(&keys[1]));
    }
}

#[test]
fn select_out_of_range() {
    let map: WavlMap<u32, u32> = (1..=4).map(|key| (key, key)).collect();

    assert_eq!(map.select(0), Err(Error::IndexOutOfRange { index: 0, len: 4 }));
    assert_eq!(map.select(5), Err(Error::IndexOutOfRange { index: 5, len: 4 }));
    assert_eq!(map.select(1), map.min());
    assert_eq!(map.select(4), map.max());
}

#[test]
fn iterators_meet_in_the_middle() {
    let map: WavlMap<u32, char> = [(3, 'c'), (1, 'a'), (4, 'd'), (2, 'b')].into_iter().collect();

    let mut iter = map.iter();
    assert_eq!(iter.len(), 4);
    assert_eq!(iter.next(), Some((&1, &'a')));
    assert_eq!(iter.next_back(), Some((&4, &'d')));
    assert_eq!(iter.next_back(), Some((&3, &'c')));
    assert_eq!(iter.next(), Some((&2, &'b')));
    assert_eq!(iter.next(), None);
    assert_eq!(iter.next_back(), None);

    assert_eq!(map.values().rev().collect::<String>(), "dcba");
    assert_eq!(std::format!("{map:?}"), "{1: 'a', 2: 'b', 3: 'c', 4: 'd'}");
}

#[test]
fn get_mut_and_pop() {
    let mut map: WavlMap<u32, u32> = (1..=6).map(|key| (key, key)).collect();

    *map.get_mut(&4).expect("key present") = 40;
    assert_eq!(map.search(&4), Ok(&40));

    assert_eq!(map.pop_first(), Some((1, 1)));
    assert_eq!(map.pop_last(), Some((6, 6)));
    assert_eq!(map.remove_entry(&4), Some((4, 40)));
    map.assert_invariants();
    assert_eq!(map.to_sorted_keys(), vec![2, 3, 5]);
    assert_eq!(map.position(&5), Some(3));
    assert_eq!(map.position(&4), None);

    map.clear();
    assert!(map.is_empty());
    map.assert_invariants();
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_btree_equivalence(ops);
    }

    #[test]
    fn select_matches_sorted_values(keys in proptest::collection::btree_set(0u32..10_000, 0..300)) {
        let map: WavlMap<u32, u32> = keys.iter().map(|&key| (key, key ^ 0x5a5a)).collect();
        let values = map.to_sorted_values();

        prop_assert_eq!(map.len(), keys.len());
        for (i, value) in values.iter().enumerate() {
            prop_assert_eq!(map.select(i + 1), Ok(value));
        }
        for (i, key) in keys.iter().enumerate() {
            prop_assert_eq!(map.position(key), Some(i + 1));
        }
    }

    #[test]
    fn insert_then_remove_round_trips(
        keys in proptest::collection::vec(0u32..500, 0..200),
        extra in 0u32..600,
    ) {
        let mut map: WavlMap<u32, ()> = keys.into_iter().map(|key| (key, ())).collect();
        let before = map.to_sorted_keys();

        if map.insert(extra, ()).is_ok() {
            map.assert_invariants();
            prop_assert!(map.remove(&extra).is_ok());
        }

        map.assert_invariants();
        prop_assert_eq!(map.to_sorted_keys(), before);
    }
}

//! Equivalence testing of [`WavlMap`] against [`BTreeMap`], shared by the unit tests and the fuzz
//! targets.

extern crate std;

use std::{collections::BTreeMap, prelude::v1::*, ptr::NonNull};

use arbitrary::Arbitrary;
use cordyceps::Linked;
use proptest::strategy::{Just, Strategy};

use crate::{Links, TreeNode, WavlMap};

#[derive(Debug)]
#[repr(C)]
pub struct TestNode {
    pub links: Links<TestNode>,
    pub key: u32,
}

impl TestNode {
    pub fn new(key: u32) -> Box<TestNode> {
        Box::new(TestNode {
            links: Links::new(),
            key,
        })
    }
}

unsafe impl Linked<Links<TestNode>> for TestNode {
    type Handle = Box<TestNode>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        NonNull::from(Box::leak(r))
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<TestNode>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

impl TreeNode<Links<TestNode>> for TestNode {
    type Key = u32;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

/// A key operand: either an index into the keys currently present (so that operations hit
/// existing entries often) or an arbitrary key.
#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum ItemValue {
    Index(usize),
    Random(u32),
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> ItemValue {
        ItemValue::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        random in 0u32..1000,
    ) -> ItemValue {
        ItemValue::Random(random)
    }
}

fn value_strategy() -> impl Strategy<Value = ItemValue> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Insert(ItemValue),
    Get(ItemValue),
    Remove(ItemValue),
    Position(ItemValue),
    Select(usize),
    First,
    PopFirst,
    Last,
    PopLast,
}

impl Op {
    fn finalize(self, btree: &BTreeMap<u32, u32>) -> FinalOp {
        fn get_value(btree: &BTreeMap<u32, u32>, i: ItemValue) -> u32 {
            match i {
                ItemValue::Index(idx) => btree
                    .keys()
                    .nth(idx % btree.len().max(1))
                    .copied()
                    .unwrap_or(idx as u32),
                ItemValue::Random(v) => v,
            }
        }

        match self {
            Op::Insert(item) => FinalOp::Insert(get_value(btree, item)),
            Op::Get(item) => FinalOp::Get(get_value(btree, item)),
            Op::Remove(item) => FinalOp::Remove(get_value(btree, item)),
            Op::Position(item) => FinalOp::Position(get_value(btree, item)),
            // Reach one past either end so out-of-range indices get exercised too.
            Op::Select(idx) => FinalOp::Select(idx % (btree.len() + 2)),
            Op::First => FinalOp::First,
            Op::PopFirst => FinalOp::PopFirst,
            Op::Last => FinalOp::Last,
            Op::PopLast => FinalOp::PopLast,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum FinalOp {
    Insert(u32),
    Get(u32),
    Remove(u32),
    Position(u32),
    Select(usize),
    First,
    PopFirst,
    Last,
    PopLast,
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    proptest::prop_oneof![
        value_strategy().prop_map(Op::Insert),
        value_strategy().prop_map(Op::Get),
        value_strategy().prop_map(Op::Remove),
        value_strategy().prop_map(Op::Position),
        (0usize..1000).prop_map(Op::Select),
        Just(Op::First),
        Just(Op::PopFirst),
        Just(Op::Last),
        Just(Op::PopLast),
    ]
}

/// Applies `ops` to both a [`WavlMap`] and a [`BTreeMap`], asserting after every step that they
/// agree and that the WAVL tree's invariants hold.
///
/// ```
/// use ordered_wavl::model::{run_btree_equivalence, ItemValue, Op};
///
/// run_btree_equivalence(vec![
///     Op::Insert(ItemValue::Random(3)),
///     Op::Insert(ItemValue::Random(1)),
///     Op::Insert(ItemValue::Random(2)),
///     Op::Select(2),
///     Op::Remove(ItemValue::Index(0)),
///     Op::PopLast,
/// ]);
/// ```
pub fn run_btree_equivalence(ops: Vec<Op>) {
    let mut btree = BTreeMap::new();
    let mut wavl: WavlMap<u32, u32> = WavlMap::new();

    for (op_id, op) in ops.into_iter().enumerate() {
        let final_op = op.finalize(&btree);

        // Values are derived from keys so that mismatched entries are detected too.
        let value_of = |key: u32| key.wrapping_mul(31);

        match final_op {
            FinalOp::Insert(key) => {
                let from_btree = if btree.contains_key(&key) {
                    false
                } else {
                    btree.insert(key, value_of(key));
                    true
                };
                let from_wavl = wavl.insert(key, value_of(key)).is_ok();

                assert_eq!(from_btree, from_wavl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Get(key) => {
                let from_btree = btree.get(&key);
                let from_wavl = wavl.get(&key);

                assert_eq!(from_btree, from_wavl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Remove(key) => {
                let from_btree = btree.remove(&key).is_some();
                let from_wavl = wavl.remove(&key).is_ok();

                assert_eq!(from_btree, from_wavl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Position(key) => {
                let from_btree = btree.contains_key(&key).then(|| btree.range(..=key).count());
                let from_wavl = wavl.position(&key);

                assert_eq!(from_btree, from_wavl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Select(index) => {
                let from_btree = index.checked_sub(1).and_then(|i| btree.iter().nth(i));
                let from_wavl = wavl.select_key_value(index);

                assert_eq!(from_btree, from_wavl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::First => {
                let from_btree = btree.first_key_value();
                let from_wavl = wavl.first_key_value();

                assert_eq!(from_btree, from_wavl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopFirst => {
                let from_btree = btree.pop_first();
                let from_wavl = wavl.pop_first();

                assert_eq!(from_btree, from_wavl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Last => {
                let from_btree = btree.last_key_value();
                let from_wavl = wavl.last_key_value();

                assert_eq!(from_btree, from_wavl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopLast => {
                let from_btree = btree.pop_last();
                let from_wavl = wavl.pop_last();

                assert_eq!(from_btree, from_wavl, "FinalOp #{op_id}: {final_op:?}");
            }
        }

        wavl.assert_invariants();
        assert_eq!(btree.len(), wavl.len());
        assert!(btree.iter().eq(wavl.iter()));
    }
}

use crate::Dir;

/// The rank differences of a node towards its two children, i.e. the pair
/// `(r(x) - r(left(x)), r(x) - r(right(x)))`.
///
/// Missing children count as rank -1, so a leaf of rank 0 is 1,1.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct RankDiffs {
    pub(crate) left: i8,
    pub(crate) right: i8,
}

impl RankDiffs {
    #[inline]
    pub(crate) fn new(rank: i8, left_rank: i8, right_rank: i8) -> RankDiffs {
        RankDiffs {
            left: rank - left_rank,
            right: rank - right_rank,
        }
    }

    #[inline]
    pub(crate) fn toward(self, dir: Dir) -> i8 {
        match dir {
            Dir::Left => self.left,
            Dir::Right => self.right,
        }
    }

    #[inline]
    pub(crate) fn is_2_2(self) -> bool {
        self.left == 2 && self.right == 2
    }

    /// Returns the side of the 3-child, if there is one.
    #[inline]
    pub(crate) fn three_child(self) -> Option<Dir> {
        if self.left == 3 {
            Some(Dir::Left)
        } else if self.right == 3 {
            Some(Dir::Right)
        } else {
            None
        }
    }

    /// Returns `true` if both rank differences are 1 or 2.
    #[inline]
    pub(crate) fn is_valid(self) -> bool {
        matches!(self.left, 1 | 2) && matches!(self.right, 1 | 2)
    }
}

/// The repair applied at a node `z` whose child `x` on side `dir` has reached `z`'s rank after an
/// insertion.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum InsertFix {
    /// `z` is 0,1. Promote `z` and continue at its parent.
    Promote,
    /// `z` is 0,2 and `x`'s outer child is a 1-child. Rotate `x` above `z` and demote `z`.
    Rotate,
    /// `z` is 0,2 and `x`'s outer child is a 2-child. Lift `x`'s inner child `y` above both `x`
    /// and `z`, promote `y` and demote `x` and `z`.
    RotateTwice,
}

impl InsertFix {
    /// Picks the repair for `z`, given its rank differences and those of its 0-child on side
    /// `dir`.
    pub(crate) fn classify(dir: Dir, z: RankDiffs, x: RankDiffs) -> InsertFix {
        debug_assert_eq!(z.toward(dir), 0, "insert repair requires a 0-child");

        match (z.toward(!dir), x.toward(dir)) {
            (1, _) => InsertFix::Promote,
            (2, 1) => InsertFix::Rotate,
            (2, 2) => InsertFix::RotateTwice,
            (sibling, outer) => {
                unreachable!("invalid shape after insertion: sibling {sibling}, outer {outer}")
            }
        }
    }

    /// Number of rebalancing operations this repair is charged.
    pub(crate) fn cost(self) -> usize {
        match self {
            InsertFix::Promote => 1,
            InsertFix::Rotate => 2,
            InsertFix::RotateTwice => 5,
        }
    }
}

/// The repair applied at a node `z` with a 3-child on side `dir` after a removal. `y` denotes the
/// sibling of that 3-child.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum RemoveFix {
    /// `z` is 3,2. Demote `z` and continue at its parent.
    Demote,
    /// `z` is 3,1 and `y` is 2,2. Demote both and continue at `z`'s parent.
    DemoteBoth,
    /// `z` is 3,1 and `y`'s outer child is a 1-child. Rotate `y` above `z`, promote `y` and
    /// demote `z` (twice if it ends up a leaf).
    Rotate,
    /// `z` is 3,1 and `y`'s outer child is a 2-child. Lift `y`'s inner child `v` above both `y`
    /// and `z`, promote `v` twice, demote `y` once and `z` twice.
    RotateTwice,
}

impl RemoveFix {
    pub(crate) fn classify(dir: Dir, z: RankDiffs, y: RankDiffs) -> RemoveFix {
        debug_assert_eq!(z.toward(dir), 3, "remove repair requires a 3-child");

        match (z.toward(!dir), y.toward(!dir)) {
            (2, _) => RemoveFix::Demote,
            (1, _) if y.is_2_2() => RemoveFix::DemoteBoth,
            (1, 1) => RemoveFix::Rotate,
            (1, 2) => RemoveFix::RotateTwice,
            (sibling, outer) => {
                unreachable!("invalid shape after removal: sibling {sibling}, outer {outer}")
            }
        }
    }

    pub(crate) fn cost(self) -> usize {
        match self {
            RemoveFix::Demote => 1,
            RemoveFix::DemoteBoth => 2,
            RemoveFix::Rotate => 3,
            RemoveFix::RotateTwice => 7,
        }
    }
}

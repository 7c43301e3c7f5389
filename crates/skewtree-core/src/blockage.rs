//! Rectilinear obstacle index.
//!
//! Stores the union of axis-aligned obstacle rectangles as an ordered
//! partition of the x-axis: disjoint x-intervals, each carrying the set of
//! disjoint y-intervals blocked within that vertical strip. Supports
//! incremental insertion and overlap-perimeter queries; there is no
//! deletion.
//!
//! Invariant: for any two stored x-intervals `[a, b]`, `[c, d]` with
//! `a <= c`, `b < c` holds strictly. The same holds within every strip's
//! y-interval set.
//!
//! All interval bounds are inclusive, so a run of lattice columns
//! `[x1, x2]` has length `x2 - x1 + 1`.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

/// An inclusive `[lo, hi]` interval.
type Interval = (i64, i64);

/// Ordered 2D interval index over obstacle rectangles.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BlockageIndex {
    strips: BTreeMap<Interval, BTreeSet<Interval>>,
}

impl BlockageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of x-intervals in the partition.
    pub fn strip_count(&self) -> usize {
        self.strips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strips.is_empty()
    }

    /// Insert the obstacle rectangle `[x1, x2] × [y1, y2]`.
    ///
    /// Existing strips overlapping `[x1, x2]` are split along the `x1`/`x2`
    /// boundaries: the slice inside the rectangle inherits the parent's
    /// y-set and absorbs `[y1, y2]`, the outside slices keep the parent's
    /// y-set unchanged. Portions of `[x1, x2]` covered by no strip (tracked
    /// with a `lim` cursor walking from `x2` down to `x1`) become fresh
    /// strips. All changes are staged and committed at the end, since a
    /// strip may be both removed and re-added.
    pub fn insert(&mut self, x1: i64, y1: i64, x2: i64, y2: i64) {
        assert!(x1 <= x2 && y1 <= y2, "degenerate blockage rectangle");

        let overlapping: Vec<(Interval, BTreeSet<Interval>)> = self
            .strips
            .range(..=(x2, i64::MAX))
            .rev()
            .take_while(|&(&(_, end), _)| end >= x1)
            .map(|(k, v)| (*k, v.clone()))
            .collect();

        let mut to_remove: Vec<Interval> = Vec::new();
        let mut to_add: BTreeMap<Interval, BTreeSet<Interval>> = BTreeMap::new();
        let mut lim = x2;

        for ((sx1, sx2), ys) in &overlapping {
            let (sx1, sx2) = (*sx1, *sx2);
            if sx1 <= x1 && sx2 >= x2 {
                // Strip covers the whole rectangle span.
                to_add.insert((x1, x2), absorb(ys, (y1, y2)));
                if sx1 < x1 {
                    to_add.insert((sx1, x1 - 1), ys.clone());
                }
                if sx2 > x2 {
                    to_add.insert((x2 + 1, sx2), ys.clone());
                }
            } else if sx2 >= x2 {
                // Strip covers the right end only.
                to_add.insert((sx1, x2), absorb(ys, (y1, y2)));
                if sx2 > x2 {
                    to_add.insert((x2 + 1, sx2), ys.clone());
                }
            } else if sx1 <= x1 {
                // Strip covers the left end only.
                to_add.insert((x1, sx2), absorb(ys, (y1, y2)));
                if lim >= sx2 + 1 {
                    to_add.insert((sx2 + 1, lim), BTreeSet::from([(y1, y2)]));
                }
                if sx1 < x1 {
                    to_add.insert((sx1, x1 - 1), ys.clone());
                }
            } else {
                // Strip lies strictly inside the rectangle span.
                to_add.insert((sx1, sx2), absorb(ys, (y1, y2)));
                if lim >= sx2 + 1 {
                    to_add.insert((sx2 + 1, lim), BTreeSet::from([(y1, y2)]));
                }
            }
            to_remove.push((sx1, sx2));
            lim = sx1 - 1;
        }

        // Leftmost uncovered gap, or the whole span when nothing overlapped.
        if lim >= x1 {
            to_add.insert((x1, lim), BTreeSet::from([(y1, y2)]));
        }

        for key in to_remove {
            self.strips.remove(&key);
        }
        for (key, ys) in to_add {
            self.strips.insert(key, ys);
        }
    }

    /// Total length of the boundary of `[x1, x2] × [y1, y2]` lying inside
    /// (or on the edge of) any stored obstacle.
    ///
    /// Per overlapping strip: the two horizontal sides contribute the run
    /// clipped to the strip when their y lies in a blocked y-interval; the
    /// two vertical sides contribute the blocked y-overlap with `[y1, y2]`
    /// when their x falls within the strip.
    pub fn overlap_perimeter(&self, x1: i64, y1: i64, x2: i64, y2: i64) -> i64 {
        assert!(x1 <= x2 && y1 <= y2, "degenerate query rectangle");

        // Start from the last strip beginning at or before x1: it may
        // straddle the query's left edge.
        let lo = self
            .strips
            .range(..=(x1, i64::MAX))
            .next_back()
            .map(|(k, _)| Bound::Included(*k))
            .unwrap_or(Bound::Unbounded);

        let mut total = 0;
        for (&(sx1, sx2), ys) in self.strips.range((lo, Bound::Included((x2, i64::MAX)))) {
            if sx2 < x1 {
                continue;
            }
            let run = x2.min(sx2) - x1.max(sx1) + 1;
            for y in [y1, y2] {
                if covers(ys, y) {
                    total += run;
                }
            }
            let side: i64 = ys
                .range(..=(y2, i64::MAX))
                .filter(|&&(_, hi)| hi >= y1)
                .map(|&(lo, hi)| hi.min(y2) - lo.max(y1) + 1)
                .sum();
            if sx1 <= x1 && sx2 >= x1 {
                total += side;
            }
            if sx1 <= x2 && sx2 >= x2 {
                total += side;
            }
        }
        total
    }
}

/// Parent y-set plus `[y1, y2]`, with overlapping intervals coalesced so
/// the disjointness invariant holds.
fn absorb(ys: &BTreeSet<Interval>, y: Interval) -> BTreeSet<Interval> {
    let (mut lo, mut hi) = y;
    let mut out = BTreeSet::new();
    for &(a, b) in ys {
        if b < lo || a > hi {
            out.insert((a, b));
        } else {
            lo = lo.min(a);
            hi = hi.max(b);
        }
    }
    out.insert((lo, hi));
    out
}

/// True iff `y` lies inside some interval of the set.
fn covers(ys: &BTreeSet<Interval>, y: i64) -> bool {
    ys.range(..=(y, i64::MAX))
        .next_back()
        .is_some_and(|&(lo, hi)| lo <= y && y <= hi)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn invariant_holds(index: &BlockageIndex) {
        let mut prev_end: Option<i64> = None;
        for (&(lo, hi), ys) in &index.strips {
            assert!(lo <= hi);
            if let Some(p) = prev_end {
                assert!(p < lo, "x-intervals must be strictly disjoint");
            }
            prev_end = Some(hi);
            let mut prev_y: Option<i64> = None;
            for &(ylo, yhi) in ys {
                assert!(ylo <= yhi);
                if let Some(p) = prev_y {
                    assert!(p < ylo, "y-intervals must be strictly disjoint");
                }
                prev_y = Some(yhi);
            }
        }
    }

    #[test]
    fn test_insert_idempotent() {
        let mut once = BlockageIndex::new();
        once.insert(10, 10, 50, 40);
        let mut twice = BlockageIndex::new();
        twice.insert(10, 10, 50, 40);
        twice.insert(10, 10, 50, 40);
        assert_eq!(once, twice);
        invariant_holds(&twice);
    }

    #[test]
    fn test_query_inside_single_blockage() {
        let mut index = BlockageIndex::new();
        index.insert(0, 0, 100, 100);
        // Query fully inside: the whole boundary is covered.
        let expected = 2 * (30 - 10 + 1) + 2 * (40 - 20 + 1);
        assert_eq!(index.overlap_perimeter(10, 20, 30, 40), expected);
    }

    #[test]
    fn test_query_partial_overlap() {
        let mut index = BlockageIndex::new();
        index.insert(0, 0, 10, 10);
        // Query hangs off the top-right corner: only the bottom side run
        // and the left side overlap are blocked.
        assert_eq!(index.overlap_perimeter(5, 5, 15, 15), 6 + 6);
    }

    #[test]
    fn test_query_outside() {
        let mut index = BlockageIndex::new();
        index.insert(0, 0, 10, 10);
        assert_eq!(index.overlap_perimeter(20, 20, 30, 30), 0);
    }

    #[test]
    fn test_disjoint_additivity() {
        let query = (5, 5, 25, 25);
        let mut a = BlockageIndex::new();
        a.insert(0, 0, 10, 10);
        let mut b = BlockageIndex::new();
        b.insert(20, 20, 30, 30);
        let mut both = BlockageIndex::new();
        both.insert(0, 0, 10, 10);
        both.insert(20, 20, 30, 30);
        invariant_holds(&both);
        assert_eq!(
            both.overlap_perimeter(query.0, query.1, query.2, query.3),
            a.overlap_perimeter(query.0, query.1, query.2, query.3)
                + b.overlap_perimeter(query.0, query.1, query.2, query.3)
        );
    }

    #[test]
    fn test_overlapping_inserts_split_strips() {
        let mut index = BlockageIndex::new();
        index.insert(0, 0, 10, 10);
        index.insert(5, 20, 15, 30);
        invariant_holds(&index);
        // Strips: [0,4] {[0,10]}, [5,10] {[0,10],[20,30]}, [11,15] {[20,30]}.
        assert_eq!(index.strip_count(), 3);
        // A probe through the overlap strip sees both bands on each vertical
        // side plus the three-column runs on the horizontal sides.
        assert_eq!(index.overlap_perimeter(6, 0, 8, 30), 2 * (11 + 11) + 2 * 3);
    }

    #[test]
    fn test_absorb_coalesces_overlapping_bands() {
        let mut index = BlockageIndex::new();
        index.insert(0, 0, 10, 10);
        index.insert(0, 5, 10, 20);
        invariant_holds(&index);
        assert_eq!(index.strip_count(), 1);
        // One band [0,20]: a right-side probe counts it exactly once.
        assert_eq!(index.overlap_perimeter(10, 0, 20, 20), 21 + 2);
    }

    #[test]
    fn test_one_unit_gap_is_filled() {
        let mut index = BlockageIndex::new();
        index.insert(0, 0, 2, 2);
        index.insert(4, 0, 6, 2);
        index.insert(0, 10, 6, 12);
        invariant_holds(&index);
        // The third insert must create the one-column strip [3,3].
        assert_eq!(index.overlap_perimeter(3, 11, 3, 11), 4);
    }

    #[test]
    fn test_insert_left_of_everything() {
        let mut index = BlockageIndex::new();
        index.insert(100, 0, 110, 10);
        index.insert(0, 0, 10, 10);
        invariant_holds(&index);
        assert_eq!(index.strip_count(), 2);
        assert_eq!(index.overlap_perimeter(0, 0, 10, 10), 4 * 11);
    }
}

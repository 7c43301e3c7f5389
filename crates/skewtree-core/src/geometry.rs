//! Manhattan (L1) geometry kernel.
//!
//! Everything the embedder needs to reason about rectilinear clock routing:
//! integer lattice points, slope-categorized segments, L1 distances, and
//! tilted rectilinear regions (TRRs): the Minkowski sum of a point or
//! ±1-slope segment with an L1 disk. TRR boundaries decompose into at most
//! four ±1-slope edges, so region intersection reduces to collinear
//! segment overlap.
//!
//! All arithmetic is exact integer arithmetic; collinearity is decided with
//! cross products rather than slope division.

use std::ops::{Add, Neg, Sub};

// ---------------------------------------------------------------------------
// Points
// ---------------------------------------------------------------------------

/// A lattice point in chip units.
///
/// Ordered lexicographically on `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// `|Δx| + |Δy|`.
    pub fn l1_distance(self, other: Point) -> i64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// 2D cross product of two displacement vectors. Zero iff parallel.
fn cross(a: Point, b: Point) -> i64 {
    a.x * b.y - a.y * b.x
}

// ---------------------------------------------------------------------------
// Segments
// ---------------------------------------------------------------------------

/// Slope category of a segment.
///
/// DME only ever produces `Pos`/`Neg` (the 45° Manhattan rotations), but the
/// kernel tolerates axis-aligned segments as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slope {
    /// dy/dx > 0 (+1 for unit-slope segments).
    Pos,
    /// dy/dx < 0 (−1 for unit-slope segments).
    Neg,
    /// dy = 0.
    Horizontal,
    /// dx = 0 (includes degenerate single-point segments).
    Vertical,
}

/// A closed segment between two lattice points, normalized so that
/// `p1 <= p2` lexicographically (in particular `p1.x <= p2.x`).
///
/// A degenerate segment with `p1 == p2` represents a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Segment {
    pub p1: Point,
    pub p2: Point,
}

impl Segment {
    pub fn new(a: Point, b: Point) -> Self {
        if b < a {
            Self { p1: b, p2: a }
        } else {
            Self { p1: a, p2: b }
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.p1 == self.p2
    }

    pub fn slope(&self) -> Slope {
        let dx = self.p2.x - self.p1.x;
        let dy = self.p2.y - self.p1.y;
        if dx == 0 {
            Slope::Vertical
        } else if dy == 0 {
            Slope::Horizontal
        } else if dy > 0 {
            Slope::Pos
        } else {
            Slope::Neg
        }
    }

    fn direction(&self) -> Point {
        self.p2 - self.p1
    }

    /// True iff `p` lies on this segment.
    pub fn contains_point(&self, p: Point) -> bool {
        if self.is_degenerate() {
            return self.p1 == p;
        }
        cross(self.direction(), p - self.p1) == 0
            && self.p1.x <= p.x
            && p.x <= self.p2.x
            && self.p1.y.min(self.p2.y) <= p.y
            && p.y <= self.p1.y.max(self.p2.y)
    }

    /// Position of `p` along the two diagonal axes of a unit-slope segment,
    /// measured from `p1`. Only ±1-slope segments are supported; anything
    /// else is outside the domain of this kernel.
    fn diagonal_params(&self, p: Point) -> (i64, i64) {
        let dx = self.p2.x - self.p1.x;
        let dy = self.p2.y - self.p1.y;
        assert!(
            dx.abs() == dy.abs(),
            "non-unit diagonal segment {self} has no closed-form L1 distance"
        );
        if dy > 0 {
            (p.x - self.p1.x, p.y - self.p1.y)
        } else {
            (p.x - self.p1.x, self.p1.y - p.y)
        }
    }

    /// Minimum L1 distance from `p` to any point of this segment.
    ///
    /// Closed form per slope category: along a unit-slope segment the
    /// distance `|t1 − t| + |t2 − t|` is piecewise linear in the segment
    /// parameter `t`, flat on `[min(t1,t2), max(t1,t2)]`, so the minimum
    /// over `t ∈ [0, span]` only needs the interval endpoints.
    pub fn distance_to_point(&self, p: Point) -> i64 {
        if self.is_degenerate() {
            return self.p1.l1_distance(p);
        }
        match self.slope() {
            Slope::Vertical => (p.x - self.p1.x).abs() + axis_gap(p.y, self.p1.y, self.p2.y),
            Slope::Horizontal => axis_gap(p.x, self.p1.x, self.p2.x) + (p.y - self.p1.y).abs(),
            Slope::Pos | Slope::Neg => {
                let (t1, t2) = self.diagonal_params(p);
                let span = self.p2.x - self.p1.x;
                let lo = t1.min(t2);
                let hi = t1.max(t2);
                if hi < 0 {
                    -lo - hi
                } else if lo > span {
                    lo + hi - 2 * span
                } else {
                    hi - lo
                }
            }
        }
    }

    /// Minimum L1 distance between two segments: the minimum over the four
    /// endpoint-to-segment queries.
    pub fn distance(&self, other: &Segment) -> i64 {
        other
            .distance_to_point(self.p1)
            .min(other.distance_to_point(self.p2))
            .min(self.distance_to_point(other.p1))
            .min(self.distance_to_point(other.p2))
    }

    /// The point of this segment closest (in L1) to `p`.
    ///
    /// For unit-slope segments the argmin is an interval; the midpoint of
    /// that interval (clamped to the segment) is returned, which keeps the
    /// choice deterministic.
    pub fn nearest_point(&self, p: Point) -> Point {
        if self.is_degenerate() {
            return self.p1;
        }
        match self.slope() {
            Slope::Vertical => Point::new(self.p1.x, p.y.clamp(self.p1.y, self.p2.y)),
            Slope::Horizontal => Point::new(p.x.clamp(self.p1.x, self.p2.x), self.p1.y),
            slope @ (Slope::Pos | Slope::Neg) => {
                let (t1, t2) = self.diagonal_params(p);
                let span = self.p2.x - self.p1.x;
                let t = ((t1 + t2) / 2).clamp(0, span);
                if matches!(slope, Slope::Pos) {
                    Point::new(self.p1.x + t, self.p1.y + t)
                } else {
                    Point::new(self.p1.x + t, self.p1.y - t)
                }
            }
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} .. {}]", self.p1, self.p2)
    }
}

/// Distance from `v` to the closed interval `[lo, hi]`.
fn axis_gap(v: i64, lo: i64, hi: i64) -> i64 {
    if v < lo {
        lo - v
    } else if v > hi {
        v - hi
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Merging-region cores
// ---------------------------------------------------------------------------

/// The core of a merging region: a single placement candidate (point) or a
/// ±1-slope locus of candidates (segment).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Core {
    Point(Point),
    Segment(Segment),
}

impl Core {
    /// Minimum L1 distance between two cores.
    pub fn distance(&self, other: &Core) -> i64 {
        match (self, other) {
            (Core::Point(a), Core::Point(b)) => a.l1_distance(*b),
            (Core::Point(a), Core::Segment(s)) => s.distance_to_point(*a),
            (Core::Segment(s), Core::Point(b)) => s.distance_to_point(*b),
            (Core::Segment(a), Core::Segment(b)) => a.distance(b),
        }
    }

    /// True iff `p` lies on the core.
    pub fn contains(&self, p: Point) -> bool {
        match self {
            Core::Point(q) => *q == p,
            Core::Segment(s) => s.contains_point(p),
        }
    }

    /// The core point closest (in L1) to `p`.
    pub fn nearest_point(&self, p: Point) -> Point {
        match self {
            Core::Point(q) => *q,
            Core::Segment(s) => s.nearest_point(p),
        }
    }
}

impl std::fmt::Display for Core {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Core::Point(p) => write!(f, "Core{{{p}}}"),
            Core::Segment(s) => write!(f, "Core{{{s}}}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tilted rectilinear regions
// ---------------------------------------------------------------------------

/// A tilted rectilinear region: all points within L1 distance `radius` of
/// the core. Represented by its four apex points.
///
/// Invariants: `left.x <= right.x`, `down.y <= up.y`, and the apices are
/// consistent with the core and radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiltedRegion {
    pub core: Core,
    pub radius: i64,
    pub left: Point,
    pub right: Point,
    pub up: Point,
    pub down: Point,
}

impl TiltedRegion {
    pub fn new(core: Core, radius: i64) -> Self {
        assert!(radius >= 0, "TRR radius must be non-negative");
        let move_x = Point::new(radius, 0);
        let move_y = Point::new(0, radius);
        let (left, right, up, down) = match core {
            Core::Point(p) => (p - move_x, p + move_x, p + move_y, p - move_y),
            Core::Segment(s) => {
                let (a, b) = (s.p1, s.p2);
                let up = if a.y > b.y { a } else { b } + move_y;
                let down = if a.y < b.y { a } else { b } - move_y;
                let right = if a.x > b.x { a } else { b } + move_x;
                let left = if a.x < b.x { a } else { b } - move_x;
                (left, right, up, down)
            }
        };
        Self {
            core,
            radius,
            left,
            right,
            up,
            down,
        }
    }

    /// The up-to-four ±1-slope boundary edges. Zero-radius regions
    /// degenerate to the core itself plus point edges.
    fn boundary_edges(&self) -> [Segment; 4] {
        [
            Segment::new(self.right, self.down),
            Segment::new(self.up, self.right),
            Segment::new(self.left, self.up),
            Segment::new(self.down, self.left),
        ]
    }

    /// Intersection of two TRR boundaries: `None`, a point, or a ±1-slope
    /// segment. Computed by pairwise overlap over the 16 edge combinations;
    /// when several pairs intersect (tangent regions sharing an edge), the
    /// first one found is returned.
    pub fn intersect(&self, other: &TiltedRegion) -> Option<Core> {
        for ea in self.boundary_edges() {
            for eb in other.boundary_edges() {
                if let Some(seg) = segment_overlap(&ea, &eb) {
                    return Some(if seg.is_degenerate() {
                        Core::Point(seg.p1)
                    } else {
                        Core::Segment(seg)
                    });
                }
            }
        }
        None
    }
}

/// Overlap of two segments. Non-empty only when both lie on the same line
/// (equal slope category and collinear), in which case the result is the
/// coordinate-wise overlap; degenerate segments reduce to a
/// point-on-segment test.
fn segment_overlap(l: &Segment, r: &Segment) -> Option<Segment> {
    if l.is_degenerate() && r.is_degenerate() {
        return (l.p1 == r.p1).then_some(*l);
    }
    if l.is_degenerate() {
        return r.contains_point(l.p1).then_some(*l);
    }
    if r.is_degenerate() {
        return l.contains_point(r.p1).then_some(*r);
    }
    if l.slope() != r.slope() {
        return None;
    }
    let dir = l.direction();
    if cross(dir, r.p1 - l.p1) != 0 || cross(dir, r.p2 - l.p1) != 0 {
        return None;
    }
    if matches!(l.slope(), Slope::Vertical) {
        let lo = l.p1.y.max(r.p1.y);
        let hi = l.p2.y.min(r.p2.y);
        return (lo <= hi)
            .then(|| Segment::new(Point::new(l.p1.x, lo), Point::new(l.p1.x, hi)));
    }
    let a = if l.p1.x >= r.p1.x { l.p1 } else { r.p1 };
    let b = if l.p2.x <= r.p2.x { l.p2 } else { r.p2 };
    (a.x <= b.x).then(|| Segment::new(a, b))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(x1: i64, y1: i64, x2: i64, y2: i64) -> Segment {
        Segment::new(Point::new(x1, y1), Point::new(x2, y2))
    }

    #[test]
    fn test_point_core_trr_apices() {
        let trr = TiltedRegion::new(Core::Point(Point::new(10, 50)), 20);
        assert_eq!(trr.up, Point::new(10, 70));
        assert_eq!(trr.down, Point::new(10, 30));
        assert_eq!(trr.left, Point::new(-10, 50));
        assert_eq!(trr.right, Point::new(30, 50));
    }

    #[test]
    fn test_trr_apex_l1_law() {
        let p = Point::new(-3, 7);
        for r in [0, 1, 5, 1000] {
            let trr = TiltedRegion::new(Core::Point(p), r);
            for apex in [trr.left, trr.right, trr.up, trr.down] {
                assert_eq!(apex.l1_distance(p), r);
            }
            assert_eq!(trr.right - p, Point::new(r, 0));
            assert_eq!(trr.up - p, Point::new(0, r));
        }
    }

    #[test]
    fn test_segment_distance() {
        let a = seg(0, 0, 5, 5);
        let b = seg(2, 3, 8, 3);
        assert_eq!(a.distance(&b), 1);
        assert_eq!(b.distance(&a), 1);
    }

    #[test]
    fn test_point_segment_distance_flat_region() {
        let s = seg(0, 0, 5, 5);
        // On the flat interval of the piecewise-linear distance.
        assert_eq!(s.distance_to_point(Point::new(2, 3)), 1);
        // Beyond both ends.
        assert_eq!(s.distance_to_point(Point::new(-2, -3)), 5);
        assert_eq!(s.distance_to_point(Point::new(7, 8)), 5);
        // On the segment itself.
        assert_eq!(s.distance_to_point(Point::new(3, 3)), 0);
    }

    #[test]
    fn test_axis_aligned_segment_distance() {
        let v = seg(4, 0, 4, 10);
        assert_eq!(v.distance_to_point(Point::new(1, 5)), 3);
        assert_eq!(v.distance_to_point(Point::new(1, 12)), 5);
        let h = seg(0, 4, 10, 4);
        assert_eq!(h.distance_to_point(Point::new(5, 1)), 3);
        assert_eq!(h.distance_to_point(Point::new(12, 1)), 5);
    }

    #[test]
    fn test_trr_intersection_segment_cores() {
        let a = TiltedRegion::new(Core::Segment(seg(0, 0, 5, 5)), 2);
        let b = TiltedRegion::new(Core::Segment(seg(5, 0, 15, 10)), 3);
        let got = a.intersect(&b);
        assert_eq!(got, Some(Core::Segment(seg(2, 0, 7, 5))));
    }

    #[test]
    fn test_trr_intersection_zero_radius_segment() {
        let a = TiltedRegion::new(Core::Segment(seg(0, 0, 5, 5)), 0);
        let b = TiltedRegion::new(Core::Segment(seg(5, 0, 15, 10)), 5);
        let got = a.intersect(&b);
        assert_eq!(got, Some(Core::Segment(seg(0, 0, 5, 5))));
    }

    #[test]
    fn test_trr_intersection_zero_radius_point() {
        let a = TiltedRegion::new(Core::Point(Point::new(0, 0)), 0);
        let b = TiltedRegion::new(Core::Segment(seg(5, 0, 15, 10)), 5);
        let got = a.intersect(&b);
        assert_eq!(got, Some(Core::Point(Point::new(0, 0))));
    }

    #[test]
    fn test_intersection_symmetry() {
        let cases = [
            (
                TiltedRegion::new(Core::Segment(seg(0, 0, 5, 5)), 2),
                TiltedRegion::new(Core::Segment(seg(5, 0, 15, 10)), 3),
            ),
            (
                TiltedRegion::new(Core::Point(Point::new(0, 0)), 4),
                TiltedRegion::new(Core::Point(Point::new(10, 0)), 6),
            ),
            (
                TiltedRegion::new(Core::Point(Point::new(0, 0)), 0),
                TiltedRegion::new(Core::Segment(seg(5, 0, 15, 10)), 5),
            ),
        ];
        for (a, b) in cases {
            assert_eq!(a.intersect(&b), b.intersect(&a));
        }
    }

    #[test]
    fn test_tangent_point_cores_meet_at_point_or_edge() {
        // Radii summing to the separation: the regions are tangent.
        let a = TiltedRegion::new(Core::Point(Point::new(0, 0)), 4);
        let b = TiltedRegion::new(Core::Point(Point::new(10, 0)), 6);
        let got = a.intersect(&b).expect("tangent regions must intersect");
        match got {
            Core::Point(p) => assert_eq!(p.l1_distance(Point::new(0, 0)), 4),
            Core::Segment(s) => {
                assert_eq!(s.distance_to_point(Point::new(0, 0)), 4);
                assert_eq!(s.distance_to_point(Point::new(10, 0)), 6);
            }
        }
    }

    #[test]
    fn test_collinear_disjoint_segments_do_not_intersect() {
        let l = seg(0, 0, 3, 3);
        let r = seg(5, 5, 9, 9);
        assert_eq!(segment_overlap(&l, &r), None);
        // Touching at one lattice point overlaps in exactly that point.
        let r2 = seg(3, 3, 9, 9);
        assert_eq!(segment_overlap(&l, &r2), Some(seg(3, 3, 3, 3)));
    }

    #[test]
    fn test_nearest_point_projection() {
        let s = seg(0, 0, 5, 5);
        let n = s.nearest_point(Point::new(2, 3));
        assert!(s.contains_point(n));
        assert_eq!(n.l1_distance(Point::new(2, 3)), s.distance_to_point(Point::new(2, 3)));
        // Clamped past the end.
        assert_eq!(s.nearest_point(Point::new(9, 9)), Point::new(5, 5));
        // Vertical segments clamp on y.
        let v = seg(4, 0, 4, 10);
        assert_eq!(v.nearest_point(Point::new(0, 12)), Point::new(4, 10));
    }

    #[test]
    #[should_panic(expected = "non-unit diagonal")]
    fn test_non_unit_diagonal_rejected() {
        seg(0, 0, 4, 2).distance_to_point(Point::new(1, 1));
    }
}

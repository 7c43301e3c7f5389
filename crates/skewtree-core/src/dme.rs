//! Deferred-merge embedding.
//!
//! Bottom-up pass over a binary topology that computes, per internal node,
//! a *merging region*: the locus of placements preserving equal Elmore
//! delay to every downstream sink. Each merge solves the zero-skew balance
//! point along the wire connecting two child regions, builds the two
//! tangent TRRs, and intersects them into the parent's region. A top-down
//! pass then picks concrete points inside the regions, nearest to each
//! parent's placement.
//!
//! The traversal is an explicit worklist rather than recursion, so deep
//! skewed topologies cannot exhaust the stack.

use std::collections::BTreeMap;

use crate::geometry::{Core, Point, TiltedRegion};
use crate::ispd::WireType;
use crate::topology::{NodeKind, TopologyResult};

// ---------------------------------------------------------------------------
// Wire selection
// ---------------------------------------------------------------------------

/// Which wire type drives the Elmore model.
///
/// `LastWire` reproduces the established behavior of embedding with the
/// final library entry; `Indexed` makes the choice explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WirePolicy {
    #[default]
    LastWire,
    Indexed(usize),
}

impl WirePolicy {
    /// Resolve the policy against a wire library.
    pub fn select<'a>(&self, wires: &'a [WireType]) -> Result<&'a WireType, EmbedError> {
        match self {
            WirePolicy::LastWire => wires.last().ok_or(EmbedError::EmptyWireLibrary),
            WirePolicy::Indexed(i) => wires.get(*i).ok_or(EmbedError::BadWireIndex(*i)),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Embedding failures. Geometry violations are fatal for the run: a tree
/// embedded past one would silently miss zero skew.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("structural error: {0}")]
    Structural(String),
    #[error("geometry invariant violated: {0}")]
    GeometryInvariant(String),
    #[error("wire library is empty")]
    EmptyWireLibrary,
    #[error("no wire type at index {0}")]
    BadWireIndex(usize),
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// A merging region with the accumulated downstream load and the common
/// sink delay below it. Built bottom-up, never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DmeNode {
    pub core: Core,
    pub ld_cap: f64,
    pub delay: f64,
}

impl DmeNode {
    /// Leaf region: the sink pin itself.
    pub fn leaf(point: Point, ld_cap: f64) -> Self {
        Self {
            core: Core::Point(point),
            ld_cap,
            delay: 0.0,
        }
    }
}

/// Outcome of a single zero-skew merge.
#[derive(Debug, Clone, Copy)]
pub struct Merged {
    pub node: DmeNode,
    /// Wire length assigned toward the left child.
    pub edge_left: i64,
    /// Wire length assigned toward the right child.
    pub edge_right: i64,
    /// True when the balance point fell outside `[0, d]` and was clamped.
    /// No detour wire is added; the skew on this branch is not closed.
    pub detoured: bool,
}

/// Elmore delay over `length` units of `wire` driving `downstream_cap`.
pub fn elmore(length: i64, downstream_cap: f64, wire: &WireType) -> f64 {
    let l = length as f64;
    wire.unit_res * l * (l * wire.unit_cap / 2.0 + downstream_cap)
}

/// Merge two child regions into the parent region.
///
/// Solves `delay_l + e·r·(e·c/2 + cap_l) = delay_r + (d−e)·r·((d−e)·c/2 + cap_r)`
/// for the balance point `e`, clamps it to `[0, d]`, and rounds to integer
/// radii that still sum to `d` so the two TRRs stay tangent. The parent
/// delay takes the `max` of the two recomputed sides, which absorbs the
/// rounding of `e`.
pub fn merge(left: &DmeNode, right: &DmeNode, wire: &WireType) -> Result<Merged, EmbedError> {
    let d = left.core.distance(&right.core);
    if d == 0 {
        return Err(EmbedError::GeometryInvariant(format!(
            "zero distance between merge cores {} and {}",
            left.core, right.core
        )));
    }

    let (c, r) = (wire.unit_cap, wire.unit_res);
    let df = d as f64;
    let denominator = r * (c * df + left.ld_cap + right.ld_cap);
    if !denominator.is_finite() || denominator <= 0.0 {
        return Err(EmbedError::GeometryInvariant(format!(
            "degenerate wire model (r={r}, c={c}) cannot balance a merge"
        )));
    }
    let balance =
        ((right.delay - left.delay) + df * df * r * c / 2.0 + df * r * right.ld_cap) / denominator;

    let detoured = !(0.0..=df).contains(&balance);
    if detoured {
        log::warn!(
            "merge of {} and {}: balance point {balance:.2} outside [0, {d}], clamping without detour wire",
            left.core,
            right.core
        );
    }

    let edge_left = (balance.clamp(0.0, df).round() as i64).clamp(0, d);
    let edge_right = d - edge_left;

    let region_left = TiltedRegion::new(left.core, edge_left);
    let region_right = TiltedRegion::new(right.core, edge_right);
    let core = region_left.intersect(&region_right).ok_or_else(|| {
        EmbedError::GeometryInvariant(format!(
            "empty intersection of {} (radius {edge_left}) and {} (radius {edge_right})",
            left.core, right.core
        ))
    })?;

    let delay_left = left.delay + elmore(edge_left, left.ld_cap, wire);
    let delay_right = right.delay + elmore(edge_right, right.ld_cap, wire);

    Ok(Merged {
        node: DmeNode {
            core,
            ld_cap: left.ld_cap + right.ld_cap + df * c,
            delay: delay_left.max(delay_right),
        },
        edge_left,
        edge_right,
        detoured,
    })
}

// ---------------------------------------------------------------------------
// Embedder
// ---------------------------------------------------------------------------

/// Merging regions for every node of an embedded topology.
#[derive(Debug, Clone)]
pub struct Embedding {
    pub nodes: BTreeMap<usize, DmeNode>,
    /// The unique child of the source: the tree root.
    pub root_idx: usize,
    /// Number of merges whose balance point was clamped.
    pub detours: u64,
}

impl Embedding {
    pub fn root(&self) -> Option<&DmeNode> {
        self.nodes.get(&self.root_idx)
    }

    /// Top-down placement: for each node, the concrete point of its
    /// merging region nearest its parent's placement; the root anchors to
    /// the source pin.
    pub fn placements(&self, topology: &TopologyResult, source: Point) -> BTreeMap<usize, Point> {
        let mut children: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for &(from, to) in &topology.edges {
            children.entry(from).or_default().push(to);
        }
        let mut placed = BTreeMap::new();
        let mut queue = vec![(self.root_idx, source)];
        while let Some((idx, anchor)) = queue.pop() {
            let Some(region) = self.nodes.get(&idx) else {
                continue;
            };
            let point = region.core.nearest_point(anchor);
            placed.insert(idx, point);
            if let Some(kids) = children.get(&idx) {
                for &kid in kids {
                    queue.push((kid, point));
                }
            }
        }
        placed
    }
}

/// Bottom-up embedder over a strictly binary topology.
pub struct Embedder<'a> {
    wire: &'a WireType,
}

impl<'a> Embedder<'a> {
    pub fn new(wire: &'a WireType) -> Self {
        Self { wire }
    }

    /// Compute merging regions for the subtree below the source.
    ///
    /// Post-order over an explicit worklist. Every internal node must have
    /// exactly two children; sinks must be leaves.
    pub fn embed(&self, topology: &TopologyResult) -> Result<Embedding, EmbedError> {
        let node_by_idx: BTreeMap<usize, _> =
            topology.nodes.iter().map(|n| (n.idx, n)).collect();
        let mut children: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for &(from, to) in &topology.edges {
            children.entry(from).or_default().push(to);
        }

        let subtrees = children.get(&0).map_or(0, |k| k.len());
        if subtrees != 1 {
            return Err(EmbedError::Structural(format!(
                "source must drive exactly one subtree, found {subtrees}"
            )));
        }
        let root_idx = children[&0][0];

        let mut done: BTreeMap<usize, DmeNode> = BTreeMap::new();
        let mut detours = 0u64;
        let mut stack: Vec<(usize, bool)> = vec![(root_idx, false)];

        while let Some((idx, expanded)) = stack.pop() {
            let node = node_by_idx.get(&idx).ok_or_else(|| {
                EmbedError::Structural(format!("edge references unknown node {idx}"))
            })?;
            let kids = children.get(&idx).map_or(&[][..], |k| k.as_slice());

            if kids.is_empty() {
                if node.kind != NodeKind::Sink {
                    return Err(EmbedError::Structural(format!(
                        "{:?} node {idx} has no children",
                        node.kind
                    )));
                }
                done.insert(idx, DmeNode::leaf(Point::new(node.x, node.y), node.ld_cap));
            } else if expanded {
                let left = self.finished(&done, kids[0])?;
                let right = self.finished(&done, kids[1])?;
                let merged = merge(&left, &right, self.wire)?;
                if merged.detoured {
                    detours += 1;
                }
                log::debug!(
                    "node {idx}: {} delay {:.6} load {:.4}",
                    merged.node.core,
                    merged.node.delay,
                    merged.node.ld_cap
                );
                done.insert(idx, merged.node);
            } else {
                if node.kind == NodeKind::Sink {
                    return Err(EmbedError::Structural(format!(
                        "sink node {idx} has children"
                    )));
                }
                if kids.len() != 2 {
                    return Err(EmbedError::Structural(format!(
                        "internal node {idx} must have exactly two children, found {}",
                        kids.len()
                    )));
                }
                stack.push((idx, true));
                for &kid in kids {
                    stack.push((kid, false));
                }
            }
        }

        Ok(Embedding {
            nodes: done,
            root_idx,
            detours,
        })
    }

    fn finished(
        &self,
        done: &BTreeMap<usize, DmeNode>,
        idx: usize,
    ) -> Result<DmeNode, EmbedError> {
        done.get(&idx).copied().ok_or_else(|| {
            EmbedError::Structural(format!("child {idx} missing from post-order"))
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

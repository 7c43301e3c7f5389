//! Clock tree topology generation.
//!
//! Pass-based nearest-neighbor agglomerative clustering over the sink set.
//! Two cost functions share the scaffold:
//!
//! - **NNA**: plain L1 distance; each pass merges at most a `delta`
//!   fraction of the active nodes.
//! - **DNNA**: distance scaled by blockage, load-balance, and total-load
//!   penalties; each pass merges pairs whose cost stays within a
//!   multiplicative `delta` band of the pass's cheapest pair.
//!
//! Every pass pops candidate pairs from a min-priority queue, skips pairs
//! touching already-merged nodes, materializes one internal node per picked
//! pair at the pair midpoint, and re-seeds the queue with pairs against the
//! surviving active set. The last merged node becomes the root and is wired
//! to the source.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};

use crate::blockage::BlockageIndex;
use crate::geometry::Point;
use crate::ispd::{InputRecord, OutputNode, OutputRecord, OutputSink, OutputWire};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Topology generation algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyAlgorithm {
    /// Nearest Neighbor: distance-only cost.
    Nna,
    /// Deferred Nearest Neighbor: blockage- and load-aware cost.
    Dnna,
}

impl std::fmt::Display for TopologyAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nna => write!(f, "nna"),
            Self::Dnna => write!(f, "dnna"),
        }
    }
}

/// Parameter settings for topology generation. NNA only consumes `delta`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthesisSettings {
    pub algorithm: TopologyAlgorithm,
    /// Blockage penalty divisor (DNNA).
    pub alpha: f64,
    /// Load-balance penalty divisor (DNNA).
    pub beta: f64,
    /// Total-load penalty divisor (DNNA).
    pub gamma: f64,
    /// Pass termination band.
    pub delta: f64,
}

impl SynthesisSettings {
    /// NNA with the given per-pass merge fraction.
    pub fn nna(delta: f64) -> Self {
        Self {
            algorithm: TopologyAlgorithm::Nna,
            alpha: 0.0,
            beta: 0.0,
            gamma: 0.0,
            delta,
        }
    }

    /// DNNA with explicit penalty divisors and cost band.
    pub fn dnna(alpha: f64, beta: f64, gamma: f64, delta: f64) -> Self {
        Self {
            algorithm: TopologyAlgorithm::Dnna,
            alpha,
            beta,
            gamma,
            delta,
        }
    }
}

// ---------------------------------------------------------------------------
// Nodes and pairs
// ---------------------------------------------------------------------------

/// Role of a node in the topology tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Sink,
    Internal,
    Source,
}

/// A topology tree node with preliminary coordinates and accumulated
/// downstream load. Source has idx 0, sinks `1..=N`, internal nodes
/// `N+1..=2N-1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeNode {
    pub kind: NodeKind,
    pub idx: usize,
    pub x: i64,
    pub y: i64,
    pub ld_cap: f64,
}

impl std::fmt::Display for TreeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Node({:?} idx={} x={} y={} cap={})",
            self.kind, self.idx, self.x, self.y, self.ld_cap
        )
    }
}

/// A merge candidate. Ordered by cost ascending, ties broken by the
/// `(min(idx), max(idx))` pair, which makes the queue order a stable total
/// order. Used behind [`Reverse`] in a max-heap, so the cheapest pair pops
/// first.
#[derive(Debug, Clone, Copy)]
pub struct NodePair {
    pub cost: f64,
    pub a: TreeNode,
    pub b: TreeNode,
}

impl NodePair {
    pub fn new(cost: f64, a: TreeNode, b: TreeNode) -> Self {
        Self { cost, a, b }
    }

    fn index_key(&self) -> (usize, usize) {
        (self.a.idx.min(self.b.idx), self.a.idx.max(self.b.idx))
    }

    /// Merge at the coordinate midpoint, summing the loads. Ratio-based
    /// merge points would track capacitance better; the midpoint matches
    /// the preliminary-coordinate role these nodes play.
    pub fn midpoint_merge(&self, idx: usize) -> TreeNode {
        TreeNode {
            kind: NodeKind::Internal,
            idx,
            x: (self.a.x + self.b.x) / 2,
            y: (self.a.y + self.b.y) / 2,
            ld_cap: self.a.ld_cap + self.b.ld_cap,
        }
    }
}

impl PartialEq for NodePair {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NodePair {}

impl PartialOrd for NodePair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodePair {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then_with(|| self.index_key().cmp(&other.index_key()))
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// The abstract rooted tree produced by topology synthesis.
#[derive(Debug, Clone)]
pub struct TopologyResult {
    /// Every sink, every created internal node, and the source (last).
    pub nodes: Vec<TreeNode>,
    /// Directed `(parent, child)` index pairs forming a tree rooted at the
    /// source (index 0).
    pub edges: Vec<(usize, usize)>,
    /// Node index to benchmark tag (source name, sink ids).
    pub tags: BTreeMap<usize, String>,
}

impl TopologyResult {
    pub fn sink_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Sink)
            .count()
    }

    pub fn internal_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Internal)
            .count()
    }

    /// Serialize into the contest output shape. `wire_type_id` is stamped
    /// on every wire record.
    pub fn to_output(&self, wire_type_id: u32) -> OutputRecord {
        let mut record = OutputRecord {
            source_idx: 0,
            source_name: self.tags.get(&0).cloned().unwrap_or_default(),
            ..Default::default()
        };
        for node in &self.nodes {
            match node.kind {
                NodeKind::Internal => record.nodes.push(OutputNode {
                    idx: node.idx,
                    point: Point::new(node.x, node.y),
                }),
                NodeKind::Sink => record.sinks.push(OutputSink {
                    idx: node.idx,
                    name: self.tags.get(&node.idx).cloned().unwrap_or_default(),
                }),
                NodeKind::Source => {}
            }
        }
        for &(from, to) in &self.edges {
            record.wires.push(OutputWire {
                from,
                to,
                type_id: wire_type_id,
            });
        }
        record
    }
}

// ---------------------------------------------------------------------------
// Synthesizer
// ---------------------------------------------------------------------------

/// Topology synthesis failures.
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Pass-based agglomerative topology synthesizer.
pub struct TopologySynthesizer<'a> {
    input: &'a InputRecord,
    settings: SynthesisSettings,
    blockages: &'a BlockageIndex,
}

impl<'a> TopologySynthesizer<'a> {
    pub fn new(
        input: &'a InputRecord,
        settings: SynthesisSettings,
        blockages: &'a BlockageIndex,
    ) -> Self {
        Self {
            input,
            settings,
            blockages,
        }
    }

    /// Run clustering to completion and return the rooted topology.
    pub fn synthesize(&self) -> Result<TopologyResult, TopologyError> {
        self.validate_settings()?;

        let n = self.input.sinks.len();
        let mut tags = BTreeMap::new();
        tags.insert(0, self.input.source.name.clone());

        let mut sinks = Vec::with_capacity(n);
        for (i, sink) in self.input.sinks.iter().enumerate() {
            if !sink.capacitance.is_finite() {
                return Err(TopologyError::InvalidInput(format!(
                    "sink {:?} has non-finite capacitance",
                    sink.id
                )));
            }
            let node = TreeNode {
                kind: NodeKind::Sink,
                idx: i + 1,
                x: sink.point.x,
                y: sink.point.y,
                ld_cap: sink.capacitance,
            };
            tags.insert(node.idx, sink.id.clone());
            sinks.push(node);
        }

        let source = TreeNode {
            kind: NodeKind::Source,
            idx: 0,
            x: self.input.source.point.x,
            y: self.input.source.point.y,
            ld_cap: 0.0,
        };

        if n == 0 {
            log::warn!("no sinks in input; producing a source-only tree");
            return Ok(TopologyResult {
                nodes: vec![source],
                edges: Vec::new(),
                tags,
            });
        }

        let mut nodes: Vec<TreeNode> = sinks.clone();
        let mut edges: Vec<(usize, usize)> = Vec::with_capacity(2 * n - 1);

        // Seed the queue with every sink pair.
        let mut heap: BinaryHeap<Reverse<NodePair>> = BinaryHeap::new();
        let mut active: BTreeMap<usize, TreeNode> = BTreeMap::new();
        for sink in &sinks {
            active.insert(sink.idx, *sink);
        }
        for i in 0..n {
            for j in 0..i {
                let cost = self.pair_cost(&sinks[i], &sinks[j]);
                heap.push(Reverse(NodePair::new(cost, sinks[i], sinks[j])));
            }
        }

        // Merged (or picked-this-pass) nodes never merge again.
        let mut visited = vec![false; 2 * n];
        let mut next_idx = n + 1;
        let mut root = sinks[0];
        let mut pass = 0usize;

        while !heap.is_empty() {
            let mut cur_cost = 0.0;
            let mut min_cost = f64::MAX;
            let mut picked: Vec<NodePair> = Vec::new();

            // Pop pairs until the termination predicate fires or the queue
            // drains. Pairs touching a visited node are skipped but still
            // count as a predicate check, like any other pop.
            loop {
                let Some(Reverse(top)) = heap.pop() else { break };
                if !(visited[top.a.idx] || visited[top.b.idx]) {
                    visited[top.a.idx] = true;
                    visited[top.b.idx] = true;
                    cur_cost = top.cost;
                    if picked.is_empty() {
                        min_cost = top.cost;
                    }
                    picked.push(top);
                }
                if self.end_pass(picked.len() * 2, active.len(), cur_cost, min_cost)
                    || heap.is_empty()
                {
                    break;
                }
            }

            pass += 1;
            log::debug!(
                "pass {pass}: picked {} pairs, cost {:.4}..{:.4}, {} active",
                picked.len(),
                min_cost,
                cur_cost,
                active.len()
            );

            let first_new = next_idx;
            for pair in &picked {
                let merged = pair.midpoint_merge(next_idx);
                next_idx += 1;
                root = merged;
                nodes.push(merged);
                edges.push((merged.idx, pair.a.idx));
                edges.push((merged.idx, pair.b.idx));
                active.remove(&pair.a.idx);
                active.remove(&pair.b.idx);
            }

            let new_nodes: Vec<TreeNode> = nodes[nodes.len() - picked.len()..].to_vec();
            for node in &new_nodes {
                active.insert(node.idx, *node);
            }

            // Queue pairs for the freshly created nodes against the whole
            // active set; pairs between two new nodes are queued once.
            for node in &new_nodes {
                for other in active.values() {
                    if other.idx == node.idx
                        || (other.idx >= first_new && other.idx < node.idx)
                    {
                        continue;
                    }
                    let cost = self.pair_cost(node, other);
                    heap.push(Reverse(NodePair::new(cost, *node, *other)));
                }
            }
        }

        nodes.push(source);
        edges.push((source.idx, root.idx));

        Ok(TopologyResult { nodes, edges, tags })
    }

    fn validate_settings(&self) -> Result<(), TopologyError> {
        let s = &self.settings;
        if !s.delta.is_finite() || s.delta <= 0.0 {
            return Err(TopologyError::InvalidInput(format!(
                "delta must be finite and positive, got {}",
                s.delta
            )));
        }
        if s.algorithm == TopologyAlgorithm::Dnna {
            for (name, v) in [("alpha", s.alpha), ("beta", s.beta), ("gamma", s.gamma)] {
                if !v.is_finite() || v <= 0.0 {
                    return Err(TopologyError::InvalidInput(format!(
                        "{name} must be finite and positive for DNNA, got {v}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Cost of merging two nodes under the selected algorithm.
    fn pair_cost(&self, a: &TreeNode, b: &TreeNode) -> f64 {
        let d = ((a.x - b.x).abs() + (a.y - b.y).abs()) as f64;
        match self.settings.algorithm {
            TopologyAlgorithm::Nna => d,
            TopologyAlgorithm::Dnna => {
                let blockage = self.corridor_blockage(a, b);
                let max_cap = a.ld_cap.max(b.ld_cap);
                let load_distance = if max_cap > 0.0 {
                    (a.ld_cap - b.ld_cap).abs() / max_cap
                } else {
                    0.0
                };
                let total_load = a.ld_cap + b.ld_cap;
                d * (1.0 + blockage / self.settings.alpha)
                    * (1.0 + load_distance / self.settings.beta)
                    * (1.0 + total_load / self.settings.gamma)
            }
        }
    }

    /// Fraction of the a–b bounding corridor's perimeter that crosses
    /// stored blockages. Dimensionless in `[0, 1]`.
    fn corridor_blockage(&self, a: &TreeNode, b: &TreeNode) -> f64 {
        if self.blockages.is_empty() {
            return 0.0;
        }
        let (x1, x2) = (a.x.min(b.x), a.x.max(b.x));
        let (y1, y2) = (a.y.min(b.y), a.y.max(b.y));
        let overlap = self.blockages.overlap_perimeter(x1, y1, x2, y2);
        let perimeter = 2 * (x2 - x1 + 1) + 2 * (y2 - y1 + 1);
        overlap as f64 / perimeter as f64
    }

    /// Pass termination predicate. `picked` counts nodes (two per pair).
    fn end_pass(&self, picked: usize, total: usize, cur_cost: f64, min_cost: f64) -> bool {
        match self.settings.algorithm {
            TopologyAlgorithm::Nna => (total as f64) * self.settings.delta < picked as f64,
            TopologyAlgorithm::Dnna => cur_cost > min_cost * self.settings.delta,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Synthesis flow orchestration.
//!
//! Wires the parsed benchmark into the pipeline: seed the blockage index,
//! run topology generation, optionally run the DME embedder and adopt its
//! placements, and serialize the result record plus a machine-readable run
//! report.

use serde::Serialize;

use crate::blockage::BlockageIndex;
use crate::dme::{EmbedError, Embedder, WirePolicy};
use crate::geometry::Point;
use crate::ispd::{InputRecord, OutputRecord};
use crate::topology::{
    NodeKind, SynthesisSettings, TopologyError, TopologyResult, TopologySynthesizer,
};

/// Flow-level configuration.
#[derive(Debug, Clone, Copy)]
pub struct FlowOptions {
    pub settings: SynthesisSettings,
    pub wire_policy: WirePolicy,
    /// Run DME and emit embedded internal-node coordinates instead of the
    /// preliminary midpoints.
    pub embed: bool,
}

/// Summary of one synthesis run.
#[derive(Debug, Clone, Serialize)]
pub struct FlowReport {
    pub algorithm: String,
    pub sinks: usize,
    pub internal_nodes: usize,
    pub edges: usize,
    pub blockages: usize,
    pub wire_type: u32,
    /// Sum of L1 edge lengths over the final coordinates.
    pub total_wirelength: i64,
    /// Elmore delay at the tree root; present when embedding ran.
    pub root_delay: Option<f64>,
    /// Clamped zero-skew merges; present when embedding ran.
    pub detours: Option<u64>,
}

/// The synthesized tree and its report.
#[derive(Debug, Clone)]
pub struct FlowOutcome {
    pub output: OutputRecord,
    pub report: FlowReport,
}

/// Flow failures wrap the failing stage's error.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    Embed(#[from] EmbedError),
}

/// Run the full synthesis flow over a parsed benchmark.
pub fn run_flow(input: &InputRecord, options: &FlowOptions) -> Result<FlowOutcome, FlowError> {
    let mut blockages = BlockageIndex::new();
    for rect in &input.blockages {
        blockages.insert(rect.x1, rect.y1, rect.x2, rect.y2);
    }
    log::info!(
        "synthesizing {} sinks with {} ({} blockages)",
        input.sinks.len(),
        options.settings.algorithm,
        input.blockages.len()
    );

    let synthesizer = TopologySynthesizer::new(input, options.settings, &blockages);
    let mut topology = synthesizer.synthesize()?;

    let wire = options.wire_policy.select(&input.wires)?;

    let mut root_delay = None;
    let mut detours = None;
    if options.embed {
        if topology.sink_count() == 0 {
            log::warn!("skipping embedding: degenerate source-only tree");
        } else {
            let embedding = Embedder::new(wire).embed(&topology)?;
            root_delay = embedding.root().map(|node| node.delay);
            detours = Some(embedding.detours);
            let placed = embedding.placements(&topology, input.source.point);
            for node in &mut topology.nodes {
                if node.kind == NodeKind::Internal {
                    if let Some(point) = placed.get(&node.idx) {
                        node.x = point.x;
                        node.y = point.y;
                    }
                }
            }
            log::info!(
                "embedded {} regions, root delay {:.6}, {} detours",
                embedding.nodes.len(),
                root_delay.unwrap_or(0.0),
                embedding.detours
            );
        }
    }

    let report = FlowReport {
        algorithm: options.settings.algorithm.to_string(),
        sinks: topology.sink_count(),
        internal_nodes: topology.internal_count(),
        edges: topology.edges.len(),
        blockages: input.blockages.len(),
        wire_type: wire.type_id,
        total_wirelength: total_wirelength(&topology),
        root_delay,
        detours,
    };

    Ok(FlowOutcome {
        output: topology.to_output(wire.type_id),
        report,
    })
}

/// Sum of L1 edge lengths over the topology's current coordinates.
fn total_wirelength(topology: &TopologyResult) -> i64 {
    let positions: std::collections::BTreeMap<usize, Point> = topology
        .nodes
        .iter()
        .map(|n| (n.idx, Point::new(n.x, n.y)))
        .collect();
    topology
        .edges
        .iter()
        .filter_map(|(from, to)| {
            Some(positions.get(from)?.l1_distance(*positions.get(to)?))
        })
        .sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ispd::{BlockageRect, Floorplan, SinkPin, SourcePin, WireType};

    fn test_input() -> InputRecord {
        InputRecord {
            floorplan: Floorplan {
                lower_left: Point::new(0, 0),
                upper_right: Point::new(1_000, 1_000),
            },
            source: SourcePin {
                point: Point::new(500, 990),
                name: "clk".into(),
                buffer_name: "BUF1".into(),
            },
            sinks: vec![
                SinkPin {
                    id: "s1".into(),
                    point: Point::new(100, 100),
                    capacitance: 20.0,
                },
                SinkPin {
                    id: "s2".into(),
                    point: Point::new(900, 120),
                    capacitance: 25.0,
                },
                SinkPin {
                    id: "s3".into(),
                    point: Point::new(400, 800),
                    capacitance: 30.0,
                },
                SinkPin {
                    id: "s4".into(),
                    point: Point::new(700, 600),
                    capacitance: 15.0,
                },
            ],
            wires: vec![
                WireType {
                    type_id: 0,
                    unit_cap: 0.0004,
                    unit_res: 0.0002,
                },
                WireType {
                    type_id: 1,
                    unit_cap: 0.0002,
                    unit_res: 0.0004,
                },
            ],
            buffers: Vec::new(),
            vdd: (1.0, 0.0),
            slew_limit: 100,
            cap_limit: 300,
            blockages: vec![BlockageRect {
                x1: 300,
                y1: 300,
                x2: 500,
                y2: 500,
            }],
        }
    }

    fn nna_options(embed: bool) -> FlowOptions {
        FlowOptions {
            settings: SynthesisSettings::nna(0.5),
            wire_policy: WirePolicy::LastWire,
            embed,
        }
    }

    #[test]
    fn test_flow_nna_end_to_end() {
        let input = test_input();
        let outcome = run_flow(&input, &nna_options(false)).unwrap();
        assert_eq!(outcome.report.sinks, 4);
        assert_eq!(outcome.report.internal_nodes, 3);
        assert_eq!(outcome.report.edges, 7);
        assert!(outcome.report.total_wirelength > 0);
        assert_eq!(outcome.report.wire_type, 1);
        assert!(outcome.report.root_delay.is_none());
        assert_eq!(outcome.output.sinks.len(), 4);
        assert_eq!(outcome.output.nodes.len(), 3);
        assert_eq!(outcome.output.wires.len(), 7);
        assert!(outcome.output.wires.iter().all(|w| w.type_id == 1));
    }

    #[test]
    fn test_flow_dnna_consults_blockages() {
        let input = test_input();
        let options = FlowOptions {
            settings: SynthesisSettings::dnna(0.2, 1.0, 0.5, 2.5),
            wire_policy: WirePolicy::LastWire,
            embed: false,
        };
        let outcome = run_flow(&input, &options).unwrap();
        assert_eq!(outcome.report.algorithm, "dnna");
        assert_eq!(outcome.report.blockages, 1);
        assert_eq!(outcome.report.sinks, 4);
    }

    #[test]
    fn test_flow_embed_places_internal_nodes() {
        let input = test_input();
        let plain = run_flow(&input, &nna_options(false)).unwrap();
        let embedded = run_flow(&input, &nna_options(true)).unwrap();
        assert!(embedded.report.root_delay.is_some());
        assert!(embedded.report.root_delay.unwrap() > 0.0);
        assert!(embedded.report.detours.is_some());
        // Same tree shape, possibly different internal placements.
        assert_eq!(plain.output.wires.len(), embedded.output.wires.len());
        assert_eq!(plain.output.sinks, embedded.output.sinks);
        assert_eq!(plain.output.nodes.len(), embedded.output.nodes.len());
    }

    #[test]
    fn test_flow_wire_override() {
        let input = test_input();
        let options = FlowOptions {
            settings: SynthesisSettings::nna(0.5),
            wire_policy: WirePolicy::Indexed(0),
            embed: false,
        };
        let outcome = run_flow(&input, &options).unwrap();
        assert_eq!(outcome.report.wire_type, 0);
    }

    #[test]
    fn test_flow_empty_wire_library_fails() {
        let mut input = test_input();
        input.wires.clear();
        let err = run_flow(&input, &nna_options(false)).unwrap_err();
        assert!(matches!(err, FlowError::Embed(EmbedError::EmptyWireLibrary)));
    }

    #[test]
    fn test_flow_no_sinks_skips_embedding() {
        let mut input = test_input();
        input.sinks.clear();
        let outcome = run_flow(&input, &nna_options(true)).unwrap();
        assert_eq!(outcome.report.sinks, 0);
        assert_eq!(outcome.report.edges, 0);
        assert!(outcome.report.root_delay.is_none());
        assert!(outcome.output.wires.is_empty());
    }

    #[test]
    fn test_flow_report_serializes() {
        let input = test_input();
        let outcome = run_flow(&input, &nna_options(true)).unwrap();
        let json = serde_json::to_string(&outcome.report).unwrap();
        assert!(json.contains("\"algorithm\":\"nna\""));
        assert!(json.contains("\"sinks\":4"));
    }
}

//! # skewtree-core
//!
//! **Zero-skew clock distribution tree synthesis.**
//!
//! `skewtree-core` builds a rooted binary clock tree over the sinks of an
//! ISPD 2009/2010 clock-network benchmark: a nearest-neighbor clustering
//! pass produces the abstract topology, and a deferred-merge embedding
//! (DME) pass computes per-node merging regions in Manhattan geometry so
//! that the Elmore delay to every sink is equal.
//!
//! ## Quick Start
//!
//! ```
//! use skewtree_core::dme::WirePolicy;
//! use skewtree_core::flow::{run_flow, FlowOptions};
//! use skewtree_core::ispd::parse_input_str;
//! use skewtree_core::topology::SynthesisSettings;
//!
//! let input = parse_input_str(
//!     "0 0 1000 1000\n\
//!      source clk 500 990 BUF1\n\
//!      num sink 2\n\
//!      s1 100 100 20\n\
//!      s2 900 120 25\n\
//!      num wire 1\n\
//!      0 0.0002 0.0004\n\
//!      num buffer 0\n\
//!      simulation vdd 1.0 0.1\n\
//!      slew limit 100\n\
//!      cap limit 300\n",
//! )
//! .unwrap();
//!
//! let options = FlowOptions {
//!     settings: SynthesisSettings::nna(0.5),
//!     wire_policy: WirePolicy::LastWire,
//!     embed: true,
//! };
//! let outcome = run_flow(&input, &options).unwrap();
//! assert_eq!(outcome.output.sinks.len(), 2);
//! assert!(outcome.report.root_delay.unwrap() > 0.0);
//! ```
//!
//! ## Architecture
//!
//! Input record → topology synthesizer → abstract tree → DME embedder →
//! embedded tree → output record.
//!
//! - [`geometry`]: L1 distances, ±1-slope segments, tilted rectilinear
//!   regions and their intersection.
//! - [`blockage`]: ordered 2D interval index over obstacle rectangles;
//!   consulted by the DNNA cost function.
//! - [`topology`]: pass-based NNA/DNNA agglomerative clustering.
//! - [`dme`]: bottom-up zero-skew merging regions plus top-down placement.
//! - [`ispd`]: benchmark parsing and result serialization.
//! - [`flow`]: orchestration and run reporting.
//!
//! The pipeline is single-threaded and synchronous; a run either completes
//! or fails terminally with the failing stage's error.

pub mod blockage;
pub mod dme;
pub mod flow;
pub mod geometry;
pub mod ispd;
pub mod topology;

pub use blockage::BlockageIndex;
pub use dme::{DmeNode, Embedder, Embedding, WirePolicy};
pub use flow::{run_flow, FlowOptions, FlowOutcome, FlowReport};
pub use geometry::{Core, Point, Segment, TiltedRegion};
pub use ispd::{parse_input, write_output, InputRecord, OutputRecord, ParseError};
pub use topology::{
    SynthesisSettings, TopologyAlgorithm, TopologyResult, TopologySynthesizer,
};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

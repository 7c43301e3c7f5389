//! CLI for skewtree: zero-skew clock tree synthesis on ISPD benchmarks.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use skewtree_core::dme::WirePolicy;
use skewtree_core::flow::{run_flow, FlowOptions};
use skewtree_core::ispd::{parse_input, write_output};
use skewtree_core::topology::SynthesisSettings;

#[derive(Parser)]
#[command(name = "skewtree")]
#[command(about = "skewtree — zero-skew clock distribution tree synthesis")]
#[command(version = skewtree_core::VERSION)]
struct Cli {
    /// Input file to read from, provided by ISPD 2009
    #[arg(long)]
    input: PathBuf,

    /// File to write the synthesized tree to
    #[arg(long)]
    output: PathBuf,

    /// Topology generation algorithm
    #[arg(long, default_value = "nna", value_parser = ["nna", "dnna"])]
    algorithm: String,

    /// Blockage penalty divisor (DNNA only)
    #[arg(long, default_value = "0.2")]
    alpha: f64,

    /// Load-balance penalty divisor (DNNA only)
    #[arg(long, default_value = "1.0")]
    beta: f64,

    /// Total-load penalty divisor (DNNA only)
    #[arg(long, default_value = "0.5")]
    gamma: f64,

    /// Pass termination band: merge fraction for NNA (default 0.5),
    /// cost band for DNNA (default 2.5)
    #[arg(long)]
    delta: Option<f64>,

    /// Run deferred-merge embedding and emit embedded node placements
    #[arg(long)]
    embed: bool,

    /// Wire library index for the delay model (default: last wire)
    #[arg(long)]
    wire: Option<usize>,

    /// Write a JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Cli {
    fn settings(&self) -> SynthesisSettings {
        match self.algorithm.as_str() {
            "dnna" => SynthesisSettings::dnna(
                self.alpha,
                self.beta,
                self.gamma,
                self.delta.unwrap_or(2.5),
            ),
            _ => SynthesisSettings::nna(self.delta.unwrap_or(0.5)),
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            eprint!("{err}");
            return ExitCode::FAILURE;
        }
        Err(err) => {
            // --help / --version land here.
            print!("{err}");
            return ExitCode::SUCCESS;
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let input = parse_input(&cli.input)
        .with_context(|| format!("failed to parse {}", cli.input.display()))?;

    let options = FlowOptions {
        settings: cli.settings(),
        wire_policy: cli.wire.map_or(WirePolicy::LastWire, WirePolicy::Indexed),
        embed: cli.embed,
    };
    let outcome = run_flow(&input, &options).context("synthesis failed")?;

    write_output(&cli.output, &outcome.output)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&outcome.report)
            .context("failed to serialize run report")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    println!(
        "{}: {} sinks, {} internal nodes, wirelength {}{}",
        outcome.report.algorithm,
        outcome.report.sinks,
        outcome.report.internal_nodes,
        outcome.report.total_wirelength,
        outcome
            .report
            .root_delay
            .map(|d| format!(", root delay {d:.6}"))
            .unwrap_or_default()
    );
    Ok(())
}

//! ISPD 2009/2010 clock-network benchmark I/O.
//!
//! Line-based, whitespace-tokenized records in a fixed section order:
//! floorplan, source, `num sink`, `num wire`, `num buffer`, the VDD /
//! slew-limit / cap-limit keyed records, and an optional trailing
//! `num blockage` section with obstacle rectangles. Parsed records are
//! immutable inputs to the synthesis flow.
//!
//! The output grammar mirrors the contest result format: the source node,
//! internal node placements, sink-tag mapping, and wire/buffer edge lists.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::geometry::Point;

// ---------------------------------------------------------------------------
// Input records
// ---------------------------------------------------------------------------

/// Chip floorplan bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Floorplan {
    pub lower_left: Point,
    pub upper_right: Point,
}

/// The clock driver pin.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePin {
    pub point: Point,
    pub name: String,
    pub buffer_name: String,
}

/// A clock-consuming pin with its capacitive load.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkPin {
    pub id: String,
    pub point: Point,
    pub capacitance: f64,
}

/// A wire segment type from the routing library.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WireType {
    pub type_id: u32,
    /// Capacitance per unit length.
    pub unit_cap: f64,
    /// Resistance per unit length.
    pub unit_res: f64,
}

/// A buffer cell type. Carried through for completeness; buffer insertion
/// is outside this flow.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferType {
    pub id: u32,
    pub name: String,
    pub inverted: bool,
    pub input_cap: f64,
    pub output_cap: f64,
    pub resistance: f64,
}

/// An obstacle rectangle `[x1, x2] × [y1, y2]` (inclusive bounds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockageRect {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

/// Everything a benchmark file describes. Immutable after parse.
#[derive(Debug, Clone)]
pub struct InputRecord {
    pub floorplan: Floorplan,
    pub source: SourcePin,
    pub sinks: Vec<SinkPin>,
    pub wires: Vec<WireType>,
    pub buffers: Vec<BufferType>,
    pub vdd: (f64, f64),
    pub slew_limit: i64,
    pub cap_limit: i64,
    pub blockages: Vec<BlockageRect>,
}

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

/// An internal (Steiner) node placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputNode {
    pub idx: usize,
    pub point: Point,
}

/// A sink node index and its benchmark tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSink {
    pub idx: usize,
    pub name: String,
}

/// A routed wire between two node indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputWire {
    pub from: usize,
    pub to: usize,
    pub type_id: u32,
}

/// A buffer instance between two node indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputBuffer {
    pub from: usize,
    pub to: usize,
    pub type_id: u32,
}

/// The synthesized tree in contest output shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputRecord {
    pub source_idx: usize,
    pub source_name: String,
    pub nodes: Vec<OutputNode>,
    pub sinks: Vec<OutputSink>,
    pub wires: Vec<OutputWire>,
    pub buffers: Vec<OutputBuffer>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Input-file failures: unreadable, malformed, or truncated.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {msg}")]
    Malformed { line: usize, msg: String },
    #[error("unexpected end of file in {section} section")]
    Truncated { section: &'static str },
}

impl ParseError {
    fn malformed(line: usize, msg: impl Into<String>) -> Self {
        ParseError::Malformed {
            line,
            msg: msg.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a benchmark file from disk.
pub fn parse_input(path: impl AsRef<Path>) -> Result<InputRecord, ParseError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_input_str(&text)
}

/// Parse benchmark text. Section order is fixed; blank lines are skipped.
pub fn parse_input_str(text: &str) -> Result<InputRecord, ParseError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l))
        .filter(|(_, l)| !l.trim().is_empty());

    let mut next = |section: &'static str| lines.next().ok_or(ParseError::Truncated { section });

    // Floorplan: x_ll y_ll x_ur y_ur.
    let (no, line) = next("floorplan")?;
    let mut toks = line.split_whitespace();
    let floorplan = Floorplan {
        lower_left: Point::new(num(&mut toks, no, "x_ll")?, num(&mut toks, no, "y_ll")?),
        upper_right: Point::new(num(&mut toks, no, "x_ur")?, num(&mut toks, no, "y_ur")?),
    };

    // Source: source <name> <x> <y> <default_buffer_name>.
    let (no, line) = next("source")?;
    let mut toks = line.split_whitespace();
    keyword(&mut toks, no, "source")?;
    let name = word(&mut toks, no, "source name")?.to_string();
    let x = num(&mut toks, no, "source x")?;
    let y = num(&mut toks, no, "source y")?;
    let buffer_name = word(&mut toks, no, "source buffer name")?.to_string();
    let source = SourcePin {
        point: Point::new(x, y),
        name,
        buffer_name,
    };

    // Sinks.
    let n_sinks = counted_header(&mut next, "sink")?;
    let mut sinks = Vec::with_capacity(n_sinks);
    for _ in 0..n_sinks {
        let (no, line) = next("sink")?;
        let mut toks = line.split_whitespace();
        sinks.push(SinkPin {
            id: word(&mut toks, no, "sink id")?.to_string(),
            point: Point::new(num(&mut toks, no, "sink x")?, num(&mut toks, no, "sink y")?),
            capacitance: num(&mut toks, no, "sink capacitance")?,
        });
    }

    // Wire library.
    let n_wires = counted_header(&mut next, "wire")?;
    let mut wires = Vec::with_capacity(n_wires);
    for _ in 0..n_wires {
        let (no, line) = next("wire")?;
        let mut toks = line.split_whitespace();
        wires.push(WireType {
            type_id: num(&mut toks, no, "wire type")?,
            unit_cap: num(&mut toks, no, "wire capacitance")?,
            unit_res: num(&mut toks, no, "wire resistance")?,
        });
    }

    // Buffer library.
    let n_buffers = counted_header(&mut next, "buffer")?;
    let mut buffers = Vec::with_capacity(n_buffers);
    for _ in 0..n_buffers {
        let (no, line) = next("buffer")?;
        let mut toks = line.split_whitespace();
        buffers.push(BufferType {
            id: num(&mut toks, no, "buffer id")?,
            name: word(&mut toks, no, "buffer name")?.to_string(),
            inverted: num::<i64>(&mut toks, no, "buffer inverted flag")? != 0,
            input_cap: num(&mut toks, no, "buffer input cap")?,
            output_cap: num(&mut toks, no, "buffer output cap")?,
            resistance: num(&mut toks, no, "buffer resistance")?,
        });
    }

    // VDD, slew limit, cap limit: one keyed record each.
    let (no, line) = next("vdd")?;
    let mut toks = line.split_whitespace();
    word(&mut toks, no, "vdd keyword")?;
    word(&mut toks, no, "vdd keyword")?;
    let vdd = (num(&mut toks, no, "vdd value")?, num(&mut toks, no, "vdd value")?);

    let (no, line) = next("slew limit")?;
    let mut toks = line.split_whitespace();
    word(&mut toks, no, "slew keyword")?;
    word(&mut toks, no, "slew keyword")?;
    let slew_limit = num(&mut toks, no, "slew limit")?;

    let (no, line) = next("cap limit")?;
    let mut toks = line.split_whitespace();
    word(&mut toks, no, "cap keyword")?;
    word(&mut toks, no, "cap keyword")?;
    let cap_limit = num(&mut toks, no, "cap limit")?;

    // Optional trailing blockage section.
    let mut blockages = Vec::new();
    if let Some((no, line)) = lines.next() {
        let mut toks = line.split_whitespace();
        keyword(&mut toks, no, "num")?;
        keyword(&mut toks, no, "blockage")?;
        let n_blockages: usize = num(&mut toks, no, "blockage count")?;
        for _ in 0..n_blockages {
            let (no, line) = lines.next().ok_or(ParseError::Truncated {
                section: "blockage",
            })?;
            let mut toks = line.split_whitespace();
            let rect = BlockageRect {
                x1: num(&mut toks, no, "blockage x1")?,
                y1: num(&mut toks, no, "blockage y1")?,
                x2: num(&mut toks, no, "blockage x2")?,
                y2: num(&mut toks, no, "blockage y2")?,
            };
            if rect.x1 > rect.x2 || rect.y1 > rect.y2 {
                return Err(ParseError::malformed(
                    no,
                    format!(
                        "blockage bounds out of order: [{}, {}] x [{}, {}]",
                        rect.x1, rect.x2, rect.y1, rect.y2
                    ),
                ));
            }
            blockages.push(rect);
        }
    }

    if let Some((no, line)) = lines.next() {
        return Err(ParseError::malformed(
            no,
            format!("unexpected trailing content: {:?}", line.trim()),
        ));
    }

    Ok(InputRecord {
        floorplan,
        source,
        sinks,
        wires,
        buffers,
        vdd,
        slew_limit,
        cap_limit,
        blockages,
    })
}

/// Parse a `num <section> <count>` header line.
fn counted_header<'a>(
    next: &mut impl FnMut(&'static str) -> Result<(usize, &'a str), ParseError>,
    section: &'static str,
) -> Result<usize, ParseError> {
    let (no, line) = next(section)?;
    let mut toks = line.split_whitespace();
    keyword(&mut toks, no, "num")?;
    keyword(&mut toks, no, section)?;
    num(&mut toks, no, "count")
}

fn word<'a>(
    toks: &mut impl Iterator<Item = &'a str>,
    line: usize,
    what: &str,
) -> Result<&'a str, ParseError> {
    toks.next()
        .ok_or_else(|| ParseError::malformed(line, format!("missing {what}")))
}

fn keyword<'a>(
    toks: &mut impl Iterator<Item = &'a str>,
    line: usize,
    expected: &str,
) -> Result<(), ParseError> {
    let got = word(toks, line, expected)?;
    if got != expected {
        return Err(ParseError::malformed(
            line,
            format!("expected {expected:?}, found {got:?}"),
        ));
    }
    Ok(())
}

fn num<'a, T: FromStr>(
    toks: &mut impl Iterator<Item = &'a str>,
    line: usize,
    what: &str,
) -> Result<T, ParseError> {
    let tok = word(toks, line, what)?;
    tok.parse()
        .map_err(|_| ParseError::malformed(line, format!("invalid {what}: {tok:?}")))
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Render an output record in the contest result grammar.
pub fn format_output(record: &OutputRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "sourcenode {} {}\n",
        record.source_idx, record.source_name
    ));
    out.push_str(&format!("num node {}\n", record.nodes.len()));
    for node in &record.nodes {
        out.push_str(&format!("{} {} {}\n", node.idx, node.point.x, node.point.y));
    }
    out.push_str(&format!("num sinknode {}\n", record.sinks.len()));
    for sink in &record.sinks {
        out.push_str(&format!("{} {}\n", sink.idx, sink.name));
    }
    out.push_str(&format!("num wire {}\n", record.wires.len()));
    for wire in &record.wires {
        out.push_str(&format!("{} {} {}\n", wire.from, wire.to, wire.type_id));
    }
    out.push_str(&format!("num buffer {}\n", record.buffers.len()));
    for buffer in &record.buffers {
        out.push_str(&format!(
            "{} {} {}\n",
            buffer.from, buffer.to, buffer.type_id
        ));
    }
    out
}

/// Write an output record to disk. Nothing is written if the file cannot
/// be created.
pub fn write_output(path: impl AsRef<Path>, record: &OutputRecord) -> std::io::Result<()> {
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(format_output(record).as_bytes())?;
    writer.flush()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "\
0 0 8000 8000
source clk 4000 7900 BUF1
num sink 3
s1 100 200 35
s2 1200 300 20
s3 700 1900 35
num wire 2
0 0.0002 0.0004
1 0.0004 0.0002
num buffer 1
1 BUF1 1 35 80 0.5
simulation vdd 1.0 0.1
slew limit 100
cap limit 300
num blockage 2
1000 1000 2000 2500
5000 5000 6000 5200
";

    #[test]
    fn test_parse_fixture() {
        let rec = parse_input_str(FIXTURE).unwrap();
        assert_eq!(rec.floorplan.lower_left, Point::new(0, 0));
        assert_eq!(rec.floorplan.upper_right, Point::new(8000, 8000));
        assert_eq!(rec.source.name, "clk");
        assert_eq!(rec.source.point, Point::new(4000, 7900));
        assert_eq!(rec.source.buffer_name, "BUF1");
        assert_eq!(rec.sinks.len(), 3);
        assert_eq!(rec.sinks[1].id, "s2");
        assert_eq!(rec.sinks[1].point, Point::new(1200, 300));
        assert_eq!(rec.sinks[1].capacitance, 20.0);
        assert_eq!(rec.wires.len(), 2);
        assert_eq!(rec.wires[1].type_id, 1);
        assert_eq!(rec.wires[1].unit_res, 0.0002);
        assert_eq!(rec.buffers.len(), 1);
        assert!(rec.buffers[0].inverted);
        assert_eq!(rec.vdd, (1.0, 0.1));
        assert_eq!(rec.slew_limit, 100);
        assert_eq!(rec.cap_limit, 300);
        assert_eq!(rec.blockages.len(), 2);
        assert_eq!(
            rec.blockages[0],
            BlockageRect {
                x1: 1000,
                y1: 1000,
                x2: 2000,
                y2: 2500
            }
        );
    }

    #[test]
    fn test_parse_without_blockages() {
        let text = FIXTURE
            .lines()
            .take_while(|l| !l.starts_with("num blockage"))
            .collect::<Vec<_>>()
            .join("\n");
        let rec = parse_input_str(&text).unwrap();
        assert!(rec.blockages.is_empty());
        assert_eq!(rec.sinks.len(), 3);
    }

    #[test]
    fn test_parse_malformed_sink_line() {
        let text = FIXTURE.replace("s2 1200 300 20", "s2 1200 oops 20");
        let err = parse_input_str(&text).unwrap_err();
        match err {
            ParseError::Malformed { line, .. } => assert_eq!(line, 5),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_truncated_input() {
        let text = "0 0 10 10\nsource clk 5 5 BUF1\nnum sink 2\ns1 1 1 10\n";
        let err = parse_input_str(text).unwrap_err();
        match err {
            ParseError::Truncated { section } => assert_eq!(section, "sink"),
            other => panic!("expected Truncated, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_inverted_blockage_rect() {
        let text = FIXTURE.replace("1000 1000 2000 2500", "500 500 300 300");
        let err = parse_input_str(&text).unwrap_err();
        match err {
            ParseError::Malformed { line, msg } => {
                assert_eq!(line, 16);
                assert!(msg.contains("blockage bounds"));
            }
            other => panic!("expected Malformed, got {other:?}"),
        }

        // Inverted on y only is rejected the same way.
        let text = FIXTURE.replace("5000 5000 6000 5200", "5000 5200 6000 5000");
        let err = parse_input_str(&text).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { line: 17, .. }));
    }

    #[test]
    fn test_parse_missing_file() {
        let err = parse_input(Path::new("/nonexistent/skewtree.input")).unwrap_err();
        assert!(matches!(err, ParseError::Io { .. }));
    }

    #[test]
    fn test_output_format() {
        let record = OutputRecord {
            source_idx: 0,
            source_name: "clk".into(),
            nodes: vec![OutputNode {
                idx: 4,
                point: Point::new(650, 1050),
            }],
            sinks: vec![
                OutputSink {
                    idx: 1,
                    name: "s1".into(),
                },
                OutputSink {
                    idx: 2,
                    name: "s2".into(),
                },
            ],
            wires: vec![
                OutputWire {
                    from: 0,
                    to: 4,
                    type_id: 1,
                },
                OutputWire {
                    from: 4,
                    to: 1,
                    type_id: 1,
                },
            ],
            buffers: Vec::new(),
        };
        let expected = "\
sourcenode 0 clk
num node 1
4 650 1050
num sinknode 2
1 s1
2 s2
num wire 2
0 4 1
4 1 1
num buffer 0
";
        assert_eq!(format_output(&record), expected);
    }

    #[test]
    fn test_write_output_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.txt");
        let record = OutputRecord {
            source_idx: 0,
            source_name: "clk".into(),
            ..Default::default()
        };
        write_output(&path, &record).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("sourcenode 0 clk\n"));
        assert!(text.contains("num buffer 0\n"));
    }
}

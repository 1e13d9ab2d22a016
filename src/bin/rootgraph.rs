//! rootgraph CLI
//!
//! Decodes a reference-compressed payload and prints a JSON summary of every
//! typed object in it, or builds a zero-value object of a known type.
//!
//! Usage:
//!   cargo run --features cli --bin rootgraph -- hpx.json
//!   cargo run --features cli --bin rootgraph -- hpx.json --reencode
//!   cargo run --features cli --bin rootgraph -- --create TH2F

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::{debug, info};

use rootgraph::{
    encode, parse, AxisKind, Capabilities, Factory, Histogram, ObjId, ObjectGraph, PointSeries,
    Profile, Settings, Value,
};

/// Inspect reference-compressed object payloads
#[derive(Parser, Debug)]
#[command(name = "rootgraph")]
#[command(about = "Decode $ref-compressed payloads and summarize histograms and graphs")]
struct Args {
    /// Payload file; `-` or nothing reads standard input
    path: Option<PathBuf>,

    /// Print the payload re-encoded with back-references instead of a summary
    #[arg(long)]
    reencode: bool,

    /// Build a zero-value object of this type and print it
    #[arg(long, conflicts_with = "path")]
    create: Option<String>,

    /// Settings file (YAML); defaults to `$ROOTGRAPH_CONFIG`
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::from_env()?,
    };
    let mut factory = Factory::new(settings);

    if let Some(type_name) = &args.create {
        let mut graph = ObjectGraph::new();
        let id = factory.construct(&mut graph, type_name, None);
        info!(type_name, "Constructed zero-value object");
        print_json(&encode(&graph, &Value::Object(id)))?;
        return Ok(());
    }

    let text = read_payload(args.path.as_ref())?;
    let Some(decoded) = parse(&text)? else {
        bail!("Payload is empty");
    };
    debug!(objects = decoded.graph.len(), "Decoded payload");

    if args.reencode {
        print_json(&encode(&decoded.graph, &decoded.root))?;
        return Ok(());
    }

    let summaries: Vec<serde_json::Value> = decoded
        .graph
        .ids()
        .filter_map(|id| summarize(&decoded.graph, id).transpose())
        .collect::<Result<_>>()?;
    print_json(&json!({
        "objects": decoded.graph.len(),
        "typed": summaries,
    }))
}

fn read_payload(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read standard input")?;
            Ok(text)
        }
    }
}

/// Summary of one object, if it has a typed model.
fn summarize(graph: &ObjectGraph, id: ObjId) -> Result<Option<serde_json::Value>> {
    let object = graph.get(id)?;
    let caps = object.capabilities();
    let type_name = object.type_name().unwrap_or_default();

    if caps.contains(Capabilities::PROFILE) {
        let profile: Profile = graph.view(id)?;
        return Ok(Some(json!({
            "id": id.index(),
            "type": type_name,
            "capabilities": format!("{caps:?}"),
            "name": &profile.name,
            "entries": profile.entries,
            "mean": [profile.mean(1), profile.mean(2)],
            "rms": [profile.rms(1), profile.rms(2)],
        })));
    }
    if caps.contains(Capabilities::HISTOGRAM) {
        let histogram: Histogram = graph.view(id)?;
        let axes: Vec<u32> = (1..=histogram.dimension() as u32).collect();
        let labels: Vec<&str> = [AxisKind::X, AxisKind::Y, AxisKind::Z]
            .iter()
            .take(histogram.dimension())
            .map(|kind| histogram.axis(*kind).name.as_str())
            .collect();
        return Ok(Some(json!({
            "id": id.index(),
            "type": type_name,
            "capabilities": format!("{caps:?}"),
            "name": &histogram.name,
            "axes": labels,
            "entries": histogram.entries,
            "integral": histogram.sum_of_weights(),
            "mean": axes.iter().map(|a| histogram.mean(*a)).collect::<Vec<_>>(),
            "rms": axes.iter().map(|a| histogram.rms(*a)).collect::<Vec<_>>(),
        })));
    }
    if caps.contains(Capabilities::GRAPH) {
        let series: PointSeries = graph.view(id)?;
        return Ok(Some(json!({
            "id": id.index(),
            "type": type_name,
            "capabilities": format!("{caps:?}"),
            "name": &series.name,
            "points": series.npoints,
            "range": series.compute_range(),
        })));
    }
    Ok(None)
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

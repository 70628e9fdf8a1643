//! Gramgen Inspect Binary
//!
//! Reports on saved grammar and derivation files.
//!
//! Run with: `gramgen-inspect [COMMAND] <FILE>`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use gramgen::graph::dot;
use gramgen::{Grammar, UNREACHABLE};

#[derive(Parser)]
#[command(name = "gramgen-inspect")]
#[command(about = "Inspect saved gramgen grammar and derivation files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show vertex, edge and node type counts
    Stats {
        /// Grammar file
        file: PathBuf,
    },

    /// List nodes by distance to an all-terminal derivation
    Distances {
        /// Grammar file
        file: PathBuf,

        /// Link references and recompute distances before reporting
        #[arg(short, long)]
        prepare: bool,

        /// Only show nodes that cannot terminate
        #[arg(short, long)]
        unreachable: bool,
    },

    /// Export the graph in Graphviz DOT format
    Dot {
        /// Grammar file
        file: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Label vertices with their type and content
        #[arg(short, long)]
        detailed: bool,
    },

    /// Print the terminal text reachable from a node
    Terminals {
        /// Grammar or derivation file
        file: PathBuf,

        /// Node to start from (default: the file's start symbol)
        #[arg(short, long)]
        start: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Stats { file } => cmd_stats(&file),
        Commands::Distances {
            file,
            prepare,
            unreachable,
        } => cmd_distances(&file, prepare, unreachable),
        Commands::Dot {
            file,
            output,
            detailed,
        } => cmd_dot(&file, output.as_deref(), detailed),
        Commands::Terminals { file, start } => cmd_terminals(&file, start.as_deref()),
    }
}

fn load(path: &Path) -> Result<Grammar> {
    info!("Loading {}", path.display());
    Grammar::load(path).with_context(|| format!("Failed to load grammar file: {}", path.display()))
}

fn cmd_stats(path: &Path) -> Result<()> {
    let grammar = load(path)?;
    print!("{}", stats_report(&grammar));
    Ok(())
}

fn stats_report(grammar: &Grammar) -> String {
    let graph = grammar.graph();
    let mut by_type: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut unreachable = 0;
    for (id, _) in graph.vertices() {
        if let Some(node) = grammar.node(id) {
            *by_type.entry(node.kind().as_str()).or_default() += 1;
            if node.distance() >= UNREACHABLE {
                unreachable += 1;
            }
        }
    }

    let mut out = String::new();
    out.push_str(&format!("Start symbol: {}\n", grammar.start_symbol().unwrap_or("-")));
    out.push_str(&format!("Vertices: {}\n", graph.vertex_count()));
    out.push_str(&format!("Edges: {}\n", graph.edge_count()));
    out.push_str(&format!("Metadata entries: {}\n", graph.all_metadata().len()));
    out.push_str(&format!("Unreachable: {}\n", unreachable));
    for (kind, count) in by_type {
        out.push_str(&format!("  {:<20} {}\n", kind, count));
    }
    out
}

fn cmd_distances(path: &Path, prepare: bool, only_unreachable: bool) -> Result<()> {
    let mut grammar = load(path)?;
    if prepare {
        let links = grammar.merge_production().context("Failed to link production references")?;
        let sweeps = grammar.build_shortest_notation();
        debug!(links, sweeps, "prepared grammar");
    }

    for (name, distance) in distance_rows(&grammar) {
        if distance >= UNREACHABLE {
            println!("{:<32} unreachable", name);
        } else if !only_unreachable {
            println!("{:<32} {}", name, distance);
        }
    }
    Ok(())
}

/// Node names with their distance, closest first.
fn distance_rows(grammar: &Grammar) -> Vec<(String, u32)> {
    let mut rows: Vec<_> = grammar
        .graph()
        .vertices()
        .filter_map(|(id, _)| grammar.node(id))
        .map(|node| (node.name().to_string(), node.distance()))
        .collect();
    rows.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    rows
}

fn cmd_dot(path: &Path, output: Option<&Path>, detailed: bool) -> Result<()> {
    let grammar = load(path)?;
    let detail = |v: &gramgen::graph::Vertex<gramgen::Node>| {
        let node = v.props();
        if node.content.is_empty() {
            format!("{}\n{}", v.id(), node.kind)
        } else {
            format!("{}\n{}\n{}", v.id(), node.kind, node.content)
        }
    };
    let label: Option<&dyn Fn(&gramgen::graph::Vertex<gramgen::Node>) -> String> =
        if detailed { Some(&detail) } else { None };

    match output {
        Some(out) => {
            dot::write_dot(out, grammar.graph(), label)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Wrote {}", out.display());
        }
        None => print!("{}", dot::to_dot(grammar.graph(), label)),
    }
    Ok(())
}

fn cmd_terminals(path: &Path, start: Option<&str>) -> Result<()> {
    let grammar = load(path)?;
    let start = match start {
        Some(s) => s.to_string(),
        None => grammar
            .start_symbol()
            .context("File has no start symbol; pass --start")?
            .to_string(),
    };
    if grammar.get_node(&start).is_none() {
        anyhow::bail!("Unknown node: {}", start);
    }
    println!("{}", grammar.terminals_from(&start));
    Ok(())
}

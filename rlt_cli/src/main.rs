//! # rlt - Rigid Load Transfer CLI
//!
//! Loads a load path document, aggregates it and prints the per-edge
//! results. Optionally writes the document back with results filled in.
//!
//! ```text
//! rlt run tower.json                       table of results
//! rlt run tower.json --format json         full report as JSON
//! rlt run tower.json -o solved.json        also save the solved document
//! rlt csv tower.json                       per-edge CSV
//! rlt check tower.json                     validate, print processing order
//! rlt demo wind_turbine                    run a built-in example
//! ```
//!
//! Logging goes to stderr and is controlled with `RUST_LOG` (or `-v`).

mod demos;
mod file_io;
mod output;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rlt_core::{aggregate, load_graph, to_document_string, topological_order, Graph, Gravity};
use tracing_subscriber::EnvFilter;

use output::OutputFormat;

#[derive(Parser)]
#[command(name = "rlt")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Rigid load transfer and load path aggregation")]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Ignore node masses
    #[arg(long, global = true, conflicts_with = "gravity")]
    no_gravity: bool,

    /// Gravitational acceleration (m/s²); enables gravity if the document has none
    #[arg(long, global = true, value_name = "VALUE")]
    gravity: Option<f64>,

    /// Log progress to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a document and print the results
    Run {
        /// Document to aggregate
        file: PathBuf,

        /// Write the document with results filled in
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Aggregate a document and print per-edge results as CSV
    Csv {
        /// Document to aggregate
        file: PathBuf,
    },

    /// Validate a document without aggregating it
    Check {
        /// Document to check
        file: PathBuf,
    },

    /// List the built-in demos, or run one
    Demo {
        /// Demo name
        name: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Command-line gravity settings take precedence over the document's
fn apply_gravity(graph: &mut Graph, options: &GlobalOptions) {
    if options.no_gravity {
        graph.set_gravity(None);
    } else if let Some(value) = options.gravity {
        let direction = graph.gravity().map(|g| g.direction).unwrap_or_else(Gravity::default_direction);
        graph.set_gravity(Some(Gravity::new(value, direction)));
    }
}

fn load(contents: &str, source: &str, options: &GlobalOptions) -> Result<Graph> {
    let mut graph = load_graph(contents).with_context(|| format!("Could not load '{}'", source))?;
    apply_gravity(&mut graph, options);
    log::info!(
        "Loaded '{}': {} nodes, {} edges",
        source,
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

fn load_file(path: &Path, options: &GlobalOptions) -> Result<Graph> {
    let contents = file_io::read_document(path)?;
    load(&contents, &path.display().to_string(), options)
}

fn run(graph: &Graph, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    let report = aggregate(graph)?;
    print!("{}", output::render(&report, format)?);

    if let Some(path) = output {
        let solved = report.apply_to(graph);
        file_io::save_document(&to_document_string(&solved)?, path)?;
        eprintln!("Saved results to {}", path.display());
    }
    Ok(())
}

fn check(graph: &Graph) -> Result<()> {
    let order = topological_order(graph)?;
    println!(
        "OK: {} nodes, {} edges, gravity {}",
        graph.node_count(),
        graph.edge_count(),
        match graph.gravity() {
            Some(g) if g.is_enabled() => format!("{} m/s²", g.value),
            _ => "off".to_string(),
        }
    );
    println!(
        "Order: {}",
        order.iter().map(|&n| graph.node(n).id.as_str()).collect::<Vec<_>>().join(" → ")
    );

    let mut incomplete = 0;
    for node in graph.nodes() {
        if let Err(e) = node.frame() {
            println!("  [WARN] {}", e);
            incomplete += 1;
        }
    }
    if incomplete > 0 {
        println!("{} node(s) lack frame data; their edges will be invalid", incomplete);
    }
    Ok(())
}

fn demo(name: Option<&str>, format: OutputFormat, options: &GlobalOptions) -> Result<()> {
    let Some(name) = name else {
        println!("Available demos:");
        for name in demos::names() {
            println!("  {}", name);
        }
        return Ok(());
    };
    let graph = load(&demos::get(name)?, name, options)?;
    run(&graph, format, None)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    match &cli.command {
        Commands::Run { file, output, format } => {
            let graph = load_file(file, &cli.global)?;
            run(&graph, *format, output.as_deref())
        }
        Commands::Csv { file } => {
            let graph = load_file(file, &cli.global)?;
            run(&graph, OutputFormat::Csv, None)
        }
        Commands::Check { file } => {
            let graph = load_file(file, &cli.global)?;
            check(&graph)
        }
        Commands::Demo { name, format } => demo(name.as_deref(), *format, &cli.global),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(no_gravity: bool, gravity: Option<f64>) -> GlobalOptions {
        GlobalOptions {
            no_gravity,
            gravity,
            verbose: false,
        }
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();

        let cli = Cli::try_parse_from(["rlt", "run", "a.json", "--format", "csv", "--gravity", "3.71"]).unwrap();
        assert_eq!(cli.global.gravity, Some(3.71));
        assert!(matches!(cli.command, Commands::Run { format: OutputFormat::Csv, .. }));

        assert!(Cli::try_parse_from(["rlt", "--no-gravity", "--gravity", "1", "check", "a.json"]).is_err());
    }

    #[test]
    fn test_gravity_overrides() {
        let doc = r#"{"nodes": [], "gravity": {"value": 9.81, "direction": [1, 0, 0]}}"#;

        let g = load(doc, "doc", &options(true, None)).unwrap();
        assert!(g.gravity().is_none());

        let g = load(doc, "doc", &options(false, Some(1.62))).unwrap();
        let gravity = g.gravity().unwrap();
        assert_eq!(gravity.value, 1.62);
        assert_eq!(gravity.direction, nalgebra::Vector3::new(1.0, 0.0, 0.0));

        let g = load(r#"{"nodes": []}"#, "doc", &options(false, Some(9.81))).unwrap();
        assert_eq!(g.gravity(), Some(&Gravity::default()));

        let g = load(doc, "doc", &options(false, None)).unwrap();
        assert_eq!(g.gravity().unwrap().direction, nalgebra::Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_load_error_has_context() {
        let err = load("{\"nodes\": [{}]}", "broken.json", &options(false, None)).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.json"));
        assert!(format!("{:#}", err).contains("nodes[0].id"));
    }
}

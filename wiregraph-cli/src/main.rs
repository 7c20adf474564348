//! WireGraph CLI - normalize schematic wiring documents and inspect their nets.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;
use wiregraph::{
    GeometryPolicy, NormalizeOptions, NormalizeResult, Ruleset, SchematicDocument, WireGraphCore,
};

#[derive(Parser)]
#[command(name = "wiregraph")]
#[command(about = "Schematic wire and PCB trace connectivity tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Log rule and transaction activity to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a segment document (merge, split, collapse, assign nets)
    Normalize {
        /// Path to a segment document (.json)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Write the normalized document here instead of stdout
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Strip net labels before normalizing
        #[arg(long)]
        drop_labels: bool,

        #[command(flatten)]
        geometry: GeometryArgs,
    },

    /// List the nets of a segment document
    Nets {
        /// Path to a segment document (.json)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        #[command(flatten)]
        geometry: GeometryArgs,
    },

    /// List the normalization rules in execution order
    Rules {
        /// Show detailed rule descriptions
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

/// Geometry overrides. Without any, the document's own geometry applies.
#[derive(Args, Clone, Default)]
struct GeometryArgs {
    /// Allow 45° edges
    #[arg(long)]
    octilinear: bool,

    /// Coincidence tolerance
    #[arg(long, value_name = "EPS")]
    epsilon: Option<f64>,

    /// Snap points to this grid pitch
    #[arg(long, value_name = "PITCH")]
    grid: Option<f64>,
}

impl GeometryArgs {
    fn policy(&self, document: &SchematicDocument) -> GeometryPolicy {
        let mut policy = document.geometry.unwrap_or_default();
        if self.octilinear {
            policy.mode = wiregraph::RoutingMode::Octilinear;
        }
        if let Some(epsilon) = self.epsilon {
            policy = policy.with_epsilon(epsilon);
        }
        if let Some(grid) = self.grid {
            policy = policy.with_grid(grid);
        }
        policy
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let exit_code = match cli.command {
        Commands::Normalize {
            file,
            output,
            format,
            drop_labels,
            geometry,
        } => handle_normalize(&file, output.as_deref(), format, drop_labels, &geometry),
        Commands::Nets {
            file,
            format,
            geometry,
        } => handle_nets(&file, format, &geometry),
        Commands::Rules { verbose } => {
            handle_rules(verbose);
            0
        }
    };

    process::exit(exit_code);
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn report(result: anyhow::Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn handle_normalize(
    file: &Path,
    output: Option<&Path>,
    format: OutputFormat,
    drop_labels: bool,
    geometry: &GeometryArgs,
) -> i32 {
    report(run_normalize(file, output, format, drop_labels, geometry))
}

fn run_normalize(
    file: &Path,
    output: Option<&Path>,
    format: OutputFormat,
    drop_labels: bool,
    geometry: &GeometryArgs,
) -> anyhow::Result<()> {
    let document = WireGraphCore::load_document(file)
        .with_context(|| format!("failed to load {}", file.display()))?;
    let options = NormalizeOptions {
        geometry: geometry.policy(&document),
        drop_labels,
    };
    tracing::debug!(
        "normalizing {} ({} geometry, epsilon {})",
        file.display(),
        options.geometry.mode,
        options.geometry.epsilon
    );
    let mut result = WireGraphCore::normalize_document(&document, &options)?;
    result.file = Some(file.to_path_buf());

    if let Some(out) = output {
        std::fs::write(out, result.document.to_json()?)
            .with_context(|| format!("failed to write {}", out.display()))?;
    }

    match format {
        OutputFormat::Human => output_human(&result, output),
        OutputFormat::Json if output.is_some() => {
            println!("{}", serde_json::to_string_pretty(&result.stats)?);
        }
        OutputFormat::Json => println!("{}", result.document.to_json()?),
    }
    Ok(())
}

fn output_human(result: &NormalizeResult, output: Option<&Path>) {
    if let Some(file) = &result.file {
        println!("\nFile: {}", file.display());
    }
    println!("{}", "─".repeat(60));
    println!("  Pins:     {}", result.stats.pins);
    println!("  Segments: {} -> {}", result.stats.segments_in, result.stats.segments_out);
    println!("  Vertices: {}", result.stats.vertices);
    println!("  Edges:    {}", result.stats.edges);
    println!("  Nets:     {}", result.stats.nets);
    if !result.changed() {
        println!("\n  Already normalized");
    }
    if let Some(out) = output {
        println!("\n  Written to {}", out.display());
    }
}

fn handle_nets(file: &Path, format: OutputFormat, geometry: &GeometryArgs) -> i32 {
    report(run_nets(file, format, geometry))
}

fn run_nets(file: &Path, format: OutputFormat, geometry: &GeometryArgs) -> anyhow::Result<()> {
    let document = WireGraphCore::load_document(file)
        .with_context(|| format!("failed to load {}", file.display()))?;
    let options = NormalizeOptions {
        geometry: geometry.policy(&document),
        drop_labels: false,
    };
    let wire = WireGraphCore::build_graph(&document, &options)?;
    let nets = wire.nets();

    match format {
        OutputFormat::Human => {
            println!("{} nets in {}\n", nets.len(), file.display());
            for net in &nets {
                let pins: Vec<String> =
                    wire.net_pins(net.id).iter().map(|p| p.to_string()).collect();
                println!("  {} ({})", net.name, net.id);
                println!("    {} vertices, {} edges", net.vertex_count, net.edge_count);
                if !pins.is_empty() {
                    println!("    Pins: {}", pins.join(", "));
                }
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "file": file.display().to_string(),
                "nets": nets.iter().map(|n| {
                    let pins: Vec<String> =
                        wire.net_pins(n.id).iter().map(|p| p.to_string()).collect();
                    serde_json::json!({
                        "id": n.id,
                        "name": n.name,
                        "vertex_count": n.vertex_count,
                        "edge_count": n.edge_count,
                        "pins": pins,
                    })
                }).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn rule_description(id: &str) -> &'static str {
    match id {
        "merge_coincident" => "Folds vertices sharing a point into one; pins win survivorship",
        "split_edges" => "Splits every edge at vertices lying strictly inside it",
        "collapse_collinear" => {
            "Removes free midpoints of straight runs; keeps junctions, pins and width/layer seams"
        }
        "remove_isolated" => "Drops vertices with no edges that are not component pins",
        "assign_clusters" => "Tags each connected component with one net id, keeping labelled ids",
        _ => "",
    }
}

fn handle_rules(verbose: bool) {
    println!("Normalization rules, in execution order:\n");

    for (i, rule) in Ruleset::default().rules().enumerate() {
        println!("  {}. {}", i + 1, rule.id());
        println!("     {}", rule.name());
        if verbose {
            println!("     {}", rule_description(rule.id()));
        }
        println!();
    }
}

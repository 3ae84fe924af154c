//! CLI binary for building, validating, and inspecting pipeline diagrams.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use pipestudio_engine::{DiagramBuilder, DiagramEngine, PipelineOutline, Severity};
use pipestudio_geometry::Point;
use pipestudio_model::{DiagramDocument, DiagramModel, Entity, EntityRef};
use pipestudio_types::EngineConfig;

#[derive(Parser)]
#[command(name = "pipestudio", version, about = "Pipeline diagram engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a diagram from a pipeline outline
    Build {
        /// Path to the outline .json file
        outline: PathBuf,

        /// Write the diagram document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a diagram document
    Validate {
        /// Path to the diagram .json file
        diagram: PathBuf,
    },

    /// Show information about a diagram
    Info {
        /// Path to the diagram .json file
        diagram: PathBuf,
    },

    /// Resolve a canvas point to the node or link under it
    Hit {
        /// Path to the diagram .json file
        diagram: PathBuf,
        x: f64,
        y: f64,
    },

    /// Print the renderer view of a diagram as JSON
    Render {
        /// Path to the diagram .json file
        diagram: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let engine = load_engine(cli.config.as_deref())?;

    match cli.command {
        Commands::Build { outline, output } => {
            cmd_build(&engine, &outline, output.as_deref())?;
        }
        Commands::Validate { diagram } => {
            cmd_validate(&diagram)?;
        }
        Commands::Info { diagram } => {
            cmd_info(&engine, &diagram)?;
        }
        Commands::Hit { diagram, x, y } => {
            cmd_hit(&engine, &diagram, Point::new(x, y))?;
        }
        Commands::Render { diagram } => {
            cmd_render(&engine, &diagram)?;
        }
    }

    Ok(())
}

fn load_engine(config: Option<&Path>) -> anyhow::Result<DiagramEngine> {
    let config = match config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    Ok(DiagramEngine::with_defaults(config))
}

fn load_diagram(engine: &DiagramEngine, path: &Path) -> anyhow::Result<DiagramModel> {
    Ok(engine.load_model(path)?)
}

fn cmd_build(engine: &DiagramEngine, outline_path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(outline_path)?;
    let outline: PipelineOutline = serde_json::from_str(&source)?;

    let mut model = engine.new_model();
    let summary = DiagramBuilder::new(engine).build(&mut model, &outline)?;
    tracing::info!(
        outline = %outline_path.display(),
        nodes = summary.nodes_added,
        links = summary.links_added,
        groups = summary.groups_added,
        "Outline built"
    );

    let document = engine.serialize_model(&model)?;
    match output {
        Some(path) => {
            document.save(path)?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", document.to_json()?),
    }
    Ok(())
}

fn cmd_validate(path: &Path) -> anyhow::Result<()> {
    let document = DiagramDocument::load(path)?;
    let diagnostics = pipestudio_engine::validate(&document);

    if diagnostics.is_empty() {
        println!("Diagram is valid");
        return Ok(());
    }

    let mut has_error = false;
    for diag in &diagnostics {
        let severity = match diag.severity {
            Severity::Error => {
                has_error = true;
                "ERROR"
            }
            Severity::Warning => "WARN",
            Severity::Info => "INFO",
        };
        println!("[{}] {}: {}", severity, diag.rule, diag.message);
        if let Some(fix) = &diag.fix {
            println!("    fix: {fix}");
        }
    }

    if has_error {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_info(engine: &DiagramEngine, path: &Path) -> anyhow::Result<()> {
    let model = load_diagram(engine, path)?;

    println!("Diagram: {}", model.id());
    println!("Nodes: {}", model.node_count());
    println!("Links: {}", model.link_count());
    println!("Groups: {}", model.grouping_layers().count());
    println!("Zoom: {}%", model.zoom());

    println!("\nNodes:");
    for node in model.nodes() {
        let p = node.position();
        println!(
            "  {} [{}] type={} at ({}, {}) ports in={} out={}",
            node.id(),
            node.name(),
            node.type_tag(),
            p.x,
            p.y,
            node.input_port_ids().len(),
            node.output_port_ids().len()
        );
    }

    let groups: Vec<_> = model.grouping_layers().collect();
    if !groups.is_empty() {
        println!("\nGroups:");
        for group in groups {
            let state = if group.is_collapsed() { "collapsed" } else { "expanded" };
            match model.group_bounds(group.id()) {
                Some(b) => println!(
                    "  {} [{}] depth={} {} members={} bounds=({}, {}) {}x{}",
                    group.id(),
                    group.label(),
                    group.depth(),
                    state,
                    group.len(),
                    b.min_x,
                    b.min_y,
                    b.width(),
                    b.height()
                ),
                None => println!(
                    "  {} [{}] depth={} {} (empty)",
                    group.id(),
                    group.label(),
                    group.depth(),
                    state
                ),
            }
        }
    }

    Ok(())
}

fn cmd_hit(engine: &DiagramEngine, path: &Path, point: Point) -> anyhow::Result<()> {
    let model = load_diagram(engine, path)?;
    match model.find_entity_at_position(point) {
        Some(EntityRef::Node(id)) => println!("node {id}"),
        Some(EntityRef::Link(id)) => println!("link {id}"),
        None => match model.link_at_segment(point) {
            Some(id) => println!("link {id} (segment)"),
            None => println!("nothing"),
        },
    }
    Ok(())
}

fn cmd_render(engine: &DiagramEngine, path: &Path) -> anyhow::Result<()> {
    let model = load_diagram(engine, path)?;
    let view = engine.render(&model)?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

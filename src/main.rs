//! Modelforge CLI
//!
//! Command-line front end for the model ingestion pipeline: load a
//! 3DS/PLY/OBJ file through the full pipeline and report what came out.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use modelforge_core::logging::{init_with_config, TracingConfig};
use modelforge_model::{load, Instruction, LoadSpecification};
use modelforge_parsers::ModelFormat;

/// Modelforge - model ingestion and geometry normalization pipeline
#[derive(Parser)]
#[command(name = "modelforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format for structured data
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load a model and show what the pipeline produced
    Info(InfoArgs),
}

#[derive(Args)]
struct InfoArgs {
    /// Path to the model file (.3ds, .ply, .obj)
    model: PathBuf,

    /// Full load specification as a JSON file; the model path above
    /// overrides the one inside
    #[arg(long)]
    spec: Option<PathBuf>,

    /// Preprocess program as a JSON file (array of instructions)
    #[arg(long)]
    preprocess: Option<PathBuf>,

    /// Uniform scale applied before preprocessing
    #[arg(long)]
    scale: Option<f32>,

    /// Discard all materials and substitute the default
    #[arg(long)]
    strip_materials: bool,

    /// Mesh merge budget for opaque materials
    #[arg(long)]
    merge_opaque: Option<f32>,

    /// Mesh merge budget for transmissive materials
    #[arg(long)]
    merge_transmissive: Option<f32>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn,modelforge=info",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    init_with_config(&TracingConfig {
        default_level: default_level.to_string(),
        ..TracingConfig::default()
    });

    match cli.command {
        Commands::Info(args) => cmd_info(&args, cli.format),
    }
}

fn cmd_info(args: &InfoArgs, format: OutputFormat) -> Result<()> {
    let mut spec = match &args.spec {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading load specification {}", path.display()))?;
            serde_json::from_str::<LoadSpecification>(&text)
                .with_context(|| format!("parsing load specification {}", path.display()))?
        }
        None => LoadSpecification::new(&args.model),
    };
    spec.path = args.model.clone();

    if let Some(path) = &args.preprocess {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading preprocess program {}", path.display()))?;
        spec.preprocess = serde_json::from_str::<Vec<Instruction>>(&text)
            .with_context(|| format!("parsing preprocess program {}", path.display()))?;
    }
    if let Some(scale) = args.scale {
        spec.scale = scale;
    }
    if args.strip_materials {
        spec.strip_materials = true;
    }
    if let Some(r) = args.merge_opaque {
        spec.mesh_merge_opaque_cluster_radius.0 = r;
    }
    if let Some(r) = args.merge_transmissive {
        spec.mesh_merge_transmissive_cluster_radius.0 = r;
    }

    let detected = ModelFormat::from_path(&args.model);
    let model = load(&spec).with_context(|| format!("loading {}", args.model.display()))?;

    match format {
        OutputFormat::Text => {
            println!("Model: {}", model.name);
            if let Some(detected) = detected {
                println!("  Format:     {:?}", detected);
            }
            println!("  Parts:      {}", model.parts.len());
            println!("  Geometries: {}", model.geometries.len());
            println!("  Meshes:     {}", model.meshes.len());
            println!("  Vertices:   {}", model.vertex_count());
            println!("  Triangles:  {}", model.triangle_count());
            println!(
                "  Bounds:     ({:.3}, {:.3}, {:.3}) .. ({:.3}, {:.3}, {:.3})",
                model.bounding_box.min.x,
                model.bounding_box.min.y,
                model.bounding_box.min.z,
                model.bounding_box.max.x,
                model.bounding_box.max.y,
                model.bounding_box.max.z,
            );
            println!("  Materials:");
            for name in model.materials.keys() {
                println!("    {}", name);
            }
            println!("  Mesh list:");
            for mesh in &model.meshes {
                println!(
                    "    {:<30} part={:<20} material={:<20} tris={}{}",
                    mesh.name,
                    model.parts[mesh.part].name,
                    mesh.material.name,
                    mesh.triangle_count(),
                    if mesh.two_sided { " two-sided" } else { "" },
                );
            }
        }
        OutputFormat::Json => {
            let meshes: Vec<serde_json::Value> = model
                .meshes
                .iter()
                .map(|mesh| {
                    serde_json::json!({
                        "name": mesh.name,
                        "part": model.parts[mesh.part].name,
                        "material": mesh.material.name,
                        "triangles": mesh.triangle_count(),
                        "twoSided": mesh.two_sided,
                    })
                })
                .collect();
            let summary = serde_json::json!({
                "name": model.name,
                "format": detected.map(|f| format!("{f:?}")),
                "parts": model.parts.len(),
                "geometries": model.geometries.len(),
                "vertices": model.vertex_count(),
                "triangles": model.triangle_count(),
                "boundingBox": model.bounding_box,
                "materials": model.materials.keys().collect::<Vec<_>>(),
                "meshes": meshes,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}

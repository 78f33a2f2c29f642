//! Voxel Mesher CLI
//!
//! Compile block worlds into chunked triangle meshes and report the result.

use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use voxel_mesher::{
    load_pack, scene_node, BlockKey, BlockPosition, CollectingSink, CompilerConfig, MapSchematic,
    MeshCompiler, MeshMode,
};

#[derive(Parser)]
#[command(name = "voxel-mesher")]
#[command(author, version, about = "Compile voxel block worlds into chunked triangle meshes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a JSON block list into chunk meshes and print a summary
    Compile {
        /// Input JSON file containing block data
        #[arg(short, long)]
        input: PathBuf,

        /// Path to resource pack (ZIP or directory)
        #[arg(short, long)]
        resource_pack: PathBuf,

        /// Chunk side length
        #[arg(long, default_value = "16", value_parser = ["8", "16", "32", "64"])]
        chunk_side: String,

        /// Mesh delivery mode
        #[arg(long, value_enum, default_value = "incremental")]
        mode: ModeArg,

        /// Merge coplanar same-material faces into larger quads
        #[arg(long)]
        greedy: bool,

        /// Worker count (0 = auto)
        #[arg(long, default_value = "0")]
        max_workers: usize,
    },

    /// Mesh a single block (useful for testing)
    Block {
        /// Block name (e.g., "minecraft:stone" or "stone")
        #[arg(short, long)]
        block: String,

        /// Block properties as key=value pairs (e.g., "facing=north")
        #[arg(short, long, value_parser = parse_property)]
        property: Vec<(String, String)>,

        /// Path to resource pack (ZIP or directory)
        #[arg(short, long)]
        resource_pack: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Incremental,
    Batched,
}

impl From<ModeArg> for MeshMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Incremental => MeshMode::Incremental,
            ModeArg::Batched => MeshMode::Batched,
        }
    }
}

/// Parse a key=value property pair.
fn parse_property(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("invalid property '{}', expected key=value", s))
}

/// One block entry in the input JSON.
#[derive(Deserialize)]
struct InputBlock {
    x: i32,
    y: i32,
    z: i32,
    name: String,
    #[serde(default)]
    properties: HashMap<String, String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            input,
            resource_pack,
            chunk_side,
            mode,
            greedy,
            max_workers,
        } => {
            let pack = load_pack(&resource_pack)?;
            let config = CompilerConfig {
                chunk_side: chunk_side.parse().expect("validated by clap"),
                mode: mode.into(),
                greedy_meshing: greedy,
                max_workers,
            };
            let mut compiler = MeshCompiler::new(Arc::from(pack), config)?;

            let text = std::fs::read_to_string(&input)?;
            let blocks: Vec<InputBlock> = serde_json::from_str(&text)?;
            let mut world = MapSchematic::new();
            for entry in blocks {
                let mut key = BlockKey::new(entry.name);
                for (k, v) in entry.properties {
                    key = key.with_property(k, v);
                }
                world.set_block(BlockPosition::new(entry.x, entry.y, entry.z), key);
            }

            let mut sink = CollectingSink::new();
            let report = compiler.build(&world, &mut sink)?;

            println!("build #{} complete", report.build_id);
            println!("  palette entries: {}", report.palette_size);
            println!("  materials:       {}", report.materials.len());
            println!(
                "  chunks:          {} meshed, {} failed (of {})",
                report.chunks_meshed, report.chunks_failed, report.chunk_count
            );
            println!("  vertices:        {}", sink.total_vertices());
            println!("  triangles:       {}", sink.total_triangles());
            println!("  errors:          {}", report.errors);

            for (chunk_id, category, mesh) in sink.meshes {
                let node = scene_node(mesh, category);
                println!(
                    "  chunk {:>4} {:<12} {:>7} verts  order {} at [{}, {}, {}]",
                    chunk_id,
                    category.to_string(),
                    node.mesh.vertex_count(),
                    node.render_order,
                    node.translation[0],
                    node.translation[1],
                    node.translation[2],
                );
            }
        }

        Commands::Block {
            block,
            property,
            resource_pack,
        } => {
            let pack = load_pack(&resource_pack)?;
            let mut compiler =
                MeshCompiler::new(Arc::from(pack), CompilerConfig::default())?;

            let name = if block.contains(':') {
                block
            } else {
                format!("minecraft:{}", block)
            };
            let mut key = BlockKey::new(name);
            for (k, v) in property {
                key = key.with_property(k, v);
            }

            let mut world = MapSchematic::new();
            world.set_block(BlockPosition::new(0, 0, 0), key);

            let mut sink = CollectingSink::new();
            let report = compiler.build(&world, &mut sink)?;

            println!(
                "{} vertices, {} triangles, {} materials, errors: {}",
                sink.total_vertices(),
                sink.total_triangles(),
                report.materials.len(),
                report.errors
            );
            for material in &report.materials {
                println!(
                    "  material: {} tint {:?} rotation {}",
                    material.key.texture, material.key.tint, material.key.rotation
                );
            }
        }
    }

    Ok(())
}

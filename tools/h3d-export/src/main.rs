//! h3d-export - scene document to H3D asset compiler
//!
//! Converts scene documents (JSON dumps of the loader's object model) into
//! `.geo`, `.anim`, `.scene.xml` and `.material.xml` files.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use h3d_export::batch::{run_batch, AssetKind, BatchSettings};
use h3d_export::{manifest, ConvertOptions};

#[derive(Parser)]
#[command(name = "h3d-export")]
#[command(about = "H3D asset compiler")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert models: geometry, scene graph and materials
    Model {
        /// Input document or directory of documents
        input: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Convert animations
    Anim {
        /// Input document or directory of documents
        input: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Build assets from a manifest file
    Build {
        /// Path to assets.toml manifest
        #[arg(default_value = "assets.toml")]
        manifest: PathBuf,

        /// Output directory (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate manifest without building
    Check {
        /// Path to assets.toml manifest
        #[arg(default_value = "assets.toml")]
        manifest: PathBuf,
    },
}

#[derive(Args)]
struct ModelArgs {
    /// Disable vertex cache optimization
    #[arg(long)]
    no_geo_opt: bool,

    /// Replace existing material files
    #[arg(long)]
    overwrite_mats: bool,

    /// Prefix material files with the model name
    #[arg(long)]
    add_model_name: bool,

    /// Distance for LOD1
    #[arg(long, default_value_t = 10.0)]
    lod_dist1: f32,

    /// Distance for LOD2
    #[arg(long, default_value_t = 20.0)]
    lod_dist2: f32,

    /// Distance for LOD3
    #[arg(long, default_value_t = 40.0)]
    lod_dist3: f32,

    /// Distance for LOD4
    #[arg(long, default_value_t = 80.0)]
    lod_dist4: f32,
}

impl ModelArgs {
    fn settings(&self) -> BatchSettings {
        BatchSettings {
            kind: AssetKind::Model,
            options: ConvertOptions {
                optimize: !self.no_geo_opt,
                lod_distances: [
                    self.lod_dist1,
                    self.lod_dist2,
                    self.lod_dist3,
                    self.lod_dist4,
                ],
                overwrite_materials: self.overwrite_mats,
                material_prefix: String::new(),
            },
            add_model_name: self.add_model_name,
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Model {
            input,
            output,
            model,
        } => {
            let summary = run_batch(&input, &output, &model.settings())?;
            if !summary.is_success() {
                anyhow::bail!("{} documents failed to convert", summary.failed.len());
            }
            tracing::info!("Done!");
        }

        Commands::Anim { input, output } => {
            let settings = BatchSettings {
                kind: AssetKind::Animation,
                options: ConvertOptions {
                    optimize: false,
                    ..Default::default()
                },
                add_model_name: false,
            };
            let summary = run_batch(&input, &output, &settings)?;
            if !summary.is_success() {
                anyhow::bail!("{} documents failed to convert", summary.failed.len());
            }
            tracing::info!("Done!");
        }

        Commands::Build {
            manifest,
            output,
            verbose,
        } => {
            if verbose {
                tracing::info!("Building assets from {:?}", manifest);
            }
            let config = manifest::load_manifest(&manifest)?;
            manifest::build_all(&config, output.as_deref())?;
            tracing::info!("Build complete!");
        }

        Commands::Check { manifest } => {
            tracing::info!("Checking manifest {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            manifest::validate(&config)?;
            tracing::info!("Manifest is valid!");
        }
    }

    Ok(())
}
